//! # sessiondigest pipeline
//!
//! The post-processing stage for recorded sessions:
//!
//! 1. **Discover** inputs (session records or raw export folders)
//! 2. **Validate** each into a `SessionData`
//! 3. **Format** the conversation, **summarize** assessment data and
//!    analysis logs
//! 4. **Enrich** with an LLM call when enabled (degrades on failure unless required)
//! 5. **Copy** raw artifacts and **write** the processed record
//!
//! [`BatchRunner`] drives steps 2–5 per item and isolates item failures.

pub mod analysis;
pub mod artifacts;
pub mod discovery;
pub mod enrichment;
pub mod formatter;
pub mod processor;
pub mod runner;
pub mod storage;
pub mod summarizer;

pub use analysis::summarize_log;
pub use artifacts::{CopyResult, copy_artifacts};
pub use discovery::{InputItem, InputKind, LoadedSession, discover};
pub use enrichment::{Enricher, PromptContext};
pub use formatter::format_conversation;
pub use processor::Processor;
pub use runner::{BatchError, BatchRunner};
pub use storage::FsStorage;
pub use summarizer::summarize;

#[cfg(test)]
pub(crate) mod test_helpers;
