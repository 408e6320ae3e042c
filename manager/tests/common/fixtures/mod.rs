//! This module provides reusable test utilities:
//! - Fake host resources, executors and policies
//! - A store harness on a pinned clock
//! - Test configuration builders
//! - In-memory test databases
//! - Common test data

// Allow unused code in test fixtures - not every test binary uses all of them
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fake_host;
pub mod harness;
pub mod test_config;
pub mod test_data;
pub mod test_database;

// Re-export commonly used items
pub use fake_host::{FakeDirectory, FakeExecutor, FakePolicy, FakeResource};
pub use harness::StoreHarness;
pub use test_config::TestConfigBuilder;
pub use test_data::*;
pub use test_database::TestDatabase;
