pub mod config;
pub mod logging;

pub mod algorithm;
pub mod cache;
pub mod hasher;
pub mod locator;
pub mod normalize;
pub mod parsers;
pub mod release;
pub mod report;
pub mod verify;

pub use algorithm::HashAlgorithm;
pub use normalize::{normalize, HashFormatError};
pub use report::{VerificationMethod, VerificationMethodResult, VerificationReport};
pub use verify::{Verifier, VerifyError};
