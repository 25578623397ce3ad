//! Create a token with metadata, mint a supply to alice, and transfer part
//! of it to bob.

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::DemoConfig;
pub use error::DemoError;
pub use pipeline::{run_pipeline, Identities, PipelineReport, Plan};
