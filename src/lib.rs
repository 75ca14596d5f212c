pub mod commands;
pub mod config;
pub mod connectivity;
pub mod context;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod questions;
pub mod store;
pub mod worker;

#[cfg(test)]
mod test_utils;
