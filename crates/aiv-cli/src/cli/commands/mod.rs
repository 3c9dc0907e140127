//! CLI command handlers, one per file.

mod hash;
mod normalize;
pub(in crate::cli) mod verify;

pub use hash::run_hash;
pub use normalize::run_normalize;
pub use verify::run_verify;
