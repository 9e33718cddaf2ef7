pub mod config;
pub mod error;
pub mod types;

pub use config::JrnlConfig;
pub use error::{JrnlError, JrnlResult};
