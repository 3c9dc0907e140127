pub mod release_fixture;
