pub mod actions;
pub mod catalog;
pub mod error;
pub mod executor;
pub mod fallback;
pub mod llm_client;
pub mod logging;
pub mod pipeline;
pub mod response_log;
pub mod router;
pub mod settings;

#[cfg(test)]
mod test_support;

pub use error::ModelError;
pub use pipeline::Pipeline;
pub use settings::AppSettings;
