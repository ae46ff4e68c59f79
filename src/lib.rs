pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod jobs;
pub mod llm;
pub mod logging;
pub mod memory;
pub mod server;
pub mod services;
pub mod testing;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use generator::workflow::launch;
