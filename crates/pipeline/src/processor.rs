//! Per-session processing: format, summarize, optionally enrich, assemble.
//!
//! The processor keeps no state between sessions. Each call derives a new
//! [`ProcessedRecord`] from one validated [`SessionData`].

use chrono::Utc;
use sessiondigest_config::AppConfig;
use sessiondigest_core::error::ProcessingError;
use sessiondigest_core::record::{Enrichment, ProcessedRecord};
use sessiondigest_core::session::SessionData;
use tracing::{info, warn};

use crate::enrichment::{Enricher, PromptContext};
use crate::formatter::format_conversation;
use crate::summarizer::summarize;

/// Turns validated sessions into processed records.
pub struct Processor {
    enricher: Option<Enricher>,
    enrichment_required: bool,
}

impl Processor {
    /// A processor that never calls an LLM.
    pub fn new() -> Self {
        Self {
            enricher: None,
            enrichment_required: false,
        }
    }

    /// Enable enrichment through `enricher`.
    ///
    /// When `required` is true an enrichment failure fails the session
    /// instead of degrading it.
    pub fn with_enricher(mut self, enricher: Enricher, required: bool) -> Self {
        self.enricher = Some(enricher);
        self.enrichment_required = required;
        self
    }

    /// Build from configuration. `enricher` is only used when
    /// `enrichment_enabled` is set.
    pub fn from_config(config: &AppConfig, enricher: Option<Enricher>) -> Self {
        match enricher {
            Some(enricher) if config.enrichment_enabled => {
                Self::new().with_enricher(enricher, config.enrichment_required)
            }
            _ => Self::new(),
        }
    }

    pub fn enrichment_enabled(&self) -> bool {
        self.enricher.is_some()
    }

    /// Process one session.
    ///
    /// Never fails for a valid session unless enrichment is required and
    /// the enrichment call fails.
    pub async fn process_session(
        &self,
        session: &SessionData,
    ) -> Result<ProcessedRecord, ProcessingError> {
        let user = session.user();
        let formatted = format_conversation(session.conversation());
        let summary = summarize(session.metadata());

        let enrichment = match &self.enricher {
            None => Enrichment::Absent,
            Some(enricher) => {
                let ctx = PromptContext {
                    transcript: &formatted.transcript,
                    summary: summary.as_ref(),
                };
                match enricher.complete(&ctx).await {
                    Ok(result) => Enrichment::Present {
                        provider: enricher.provider_name().to_string(),
                        model: enricher.model().to_string(),
                        result,
                    },
                    Err(e) if self.enrichment_required => {
                        warn!(user_id = %user.user_id, session_id = %user.session_id, error = %e, "Required enrichment failed");
                        return Err(ProcessingError::EnrichmentRequired(e));
                    }
                    Err(e) => {
                        warn!(user_id = %user.user_id, session_id = %user.session_id, error = %e, "Enrichment unavailable, degrading");
                        Enrichment::Unavailable {
                            reason: e.to_string(),
                        }
                    }
                }
            }
        };

        info!(
            user_id = %user.user_id,
            session_id = %user.session_id,
            turns = formatted.stats.total_turns,
            summary = summary.is_some(),
            enrichment = ?enrichment.status(),
            "Session processed"
        );

        Ok(ProcessedRecord {
            user: user.clone(),
            processed_at: Utc::now(),
            formatted_conversation: formatted,
            summary,
            enrichment,
            source_refs: Vec::new(),
            analysis_logs: Vec::new(),
        })
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}
