//! Core library for Encore — capture-and-replay desktop automation with
//! retrieval-augmented script synthesis.

pub mod capture;
pub mod config;
pub mod context;
pub mod corpus;
pub mod embedding;
pub mod enrich;
pub mod error;
pub mod llm;
pub mod model;
pub mod retrieval;
pub mod retry;
pub mod runner;
pub mod store;
pub mod synth;

pub use capture::{CaptureSession, StartOutcome, StopOutcome};
pub use config::EncoreConfig;
pub use corpus::ExampleCorpus;
pub use embedding::EmbeddingService;
pub use error::{EncoreError, Result};
pub use llm::LlmService;
pub use model::{CapturedEvent, EventKind, ExampleRecord, MouseButton};
pub use retry::RetryPolicy;
pub use runner::{CodeRunner, RunOutcome};
pub use store::EventStore;
pub use synth::ScriptSynthesizer;
