pub mod config;
pub mod engine;
pub mod error;
pub mod rewards;
pub mod tokens;
pub mod utils;
