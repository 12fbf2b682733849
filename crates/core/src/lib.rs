pub mod common;
pub mod config;
pub mod live;
pub mod settings;
pub mod strategy;
pub mod trade;

#[cfg(feature = "test-utils")]
pub mod test_utils;
