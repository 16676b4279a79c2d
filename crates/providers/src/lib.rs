//! LLM provider implementations for sessiondigest.
//!
//! Every supported backend speaks the OpenAI chat-completions protocol;
//! [`build_from_config`] picks the endpoint and credentials.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
