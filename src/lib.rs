pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod execution;
pub mod execution_loop;
pub mod intent;
pub mod safety;
pub mod schema;
pub mod service;
pub mod synthesizer;

pub use api::{ExecuteRequest, ExecuteResponse, GenerateRequest, GenerateResponse};
pub use config::Settings;
pub use engine::{generate, plan, Generation};
pub use error::{AdminError, Result};
pub use intent::{classify, Intent, IntentKind};
pub use safety::{classify_safety, SafetyTier, SafetyVerdict};
pub use schema::{SchemaReport, SchemaSummary};
pub use service::AdminService;
pub use synthesizer::{synthesize, Synthesis};
