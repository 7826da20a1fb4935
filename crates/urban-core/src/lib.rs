pub mod config;
pub mod error;
pub mod prompt;
pub mod types;

pub use config::UrbanConfig;
pub use error::{Result, UrbanError};
pub use prompt::{FINAL_REPORT_SENTINEL, SYSTEM_PROMPT};
pub use types::*;
