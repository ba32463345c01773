//! Common test utilities for clarity-dl integration tests

#[allow(dead_code)]
pub mod config;
#[allow(dead_code)]
pub mod server;

#[allow(unused_imports)]
pub use config::*;
#[allow(unused_imports)]
pub use server::*;
