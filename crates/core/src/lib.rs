//! # sessiondigest core
//!
//! Domain types, traits, and error definitions for the session post-processing
//! pipeline. This crate has no runtime or HTTP dependencies; it defines the
//! model that the other crates implement against.
//!
//! ## Layout
//!
//! - [`session`]: input records and the validation pass that builds them
//! - [`record`]: processed output records and the batch run report
//! - [`provider`] / [`message`]: the narrow contract to LLM backends
//! - [`storage`]: the load/save boundary used by the batch runner
//! - [`error`]: the error taxonomy shared by every stage

pub mod error;
pub mod message;
pub mod provider;
pub mod record;
pub mod session;
pub mod storage;

// Re-export key types at crate root for ergonomics
pub use error::{AdapterError, Error, ErrorKind, IoError, ProcessingError, ProviderError, Result, ValidationError};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat};
pub use record::{
    AnalysisLogSummary, AssessmentSummary, BatchOutcome, CompletionResult, Enrichment,
    ProcessedRecord, RunReport, SourceRef,
};
pub use session::{ConversationTurn, SessionData, UserMetadata};
pub use storage::Storage;
