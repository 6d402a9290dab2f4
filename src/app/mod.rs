pub mod adb;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod state;
pub mod worker;

#[cfg(all(test, unix))]
pub mod test_support;
