pub mod config;
mod error;
pub mod fetch;
pub mod http;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod probe;
pub mod rank;
pub mod scrape;
pub mod upload;
pub mod walk;

pub use error::{LookupError, Result};
