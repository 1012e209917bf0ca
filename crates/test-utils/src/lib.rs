#[macro_use]
extern crate lazy_static;

pub mod chain;
pub mod fixtures;

pub use chain::MemoryChain;
pub use fixtures::write_fixture_artifacts;
