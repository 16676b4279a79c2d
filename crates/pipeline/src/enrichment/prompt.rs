//! Enrichment prompt assembly.
//!
//! The prompt is a fixed instruction chain:
//!
//! 1. **Role**: the analyst persona and what the conversation is
//! 2. **Aspects**: the depressive-symptom indicators and the 0–3 scale
//! 3. **Task**: output format, the chronological transcript and, when
//!    present, the assessment summary
//!
//! Assembly is deterministic: identical inputs give identical messages.

use sessiondigest_config::EnrichmentMode;
use sessiondigest_core::message::Message;
use sessiondigest_core::record::AssessmentSummary;

/// A symptom indicator the model scores.
#[derive(Debug, Clone, Copy)]
pub struct Aspect {
    pub name: &'static str,
    pub description: &'static str,
}

/// The nine PHQ-9 indicators, in questionnaire order.
pub const ASPECTS: &[Aspect] = &[
    Aspect {
        name: "Anhedonia",
        description: "Loss of interest or pleasure in nearly all daily activities.",
    },
    Aspect {
        name: "Depressed mood",
        description: "Feeling down or hopeless for most of the day, nearly every day.",
    },
    Aspect {
        name: "Appetite or weight change",
        description: "Significant weight loss or gain, or a change in appetite.",
    },
    Aspect {
        name: "Sleep disturbance",
        description: "Insomnia or hypersomnia nearly every day.",
    },
    Aspect {
        name: "Psychomotor change",
        description: "Slowed movement or speech, or restlessness noticeable to others.",
    },
    Aspect {
        name: "Fatigue",
        description: "Tiredness or loss of energy nearly every day.",
    },
    Aspect {
        name: "Worthlessness or guilt",
        description: "Feelings of worthlessness or excessive, inappropriate guilt.",
    },
    Aspect {
        name: "Concentration difficulty",
        description: "Trouble concentrating or making decisions nearly every day.",
    },
    Aspect {
        name: "Thoughts of death",
        description: "Recurrent thoughts of death, suicidal ideation, or attempts.",
    },
];

/// The 0–3 scale applied to every indicator.
pub const SCALE: &[(u8, &str)] = &[
    (0, "Not at all: the symptom does not appear in the conversation."),
    (1, "Several times: the symptom appears occasionally or implicitly; mild impact."),
    (2, "Often: the symptom recurs and starts to interfere with activities."),
    (3, "Dominant: the symptom is persistent, explicit and impairs daily functioning."),
];

const ROLE_INSTRUCTION: &str = "You are a psychologist reviewing a conversation between a \
supportive listener and a friend who may or may not be showing symptoms of depression. \
Assess the friend's messages carefully: symptoms are often expressed indirectly.";

const ROLE_ACK: &str = "Understood. Which depression indicators should I analyse?";

const ASPECTS_ACK: &str = "Understood. I will score each indicator from the conversation.";

const STRUCTURED_FORMAT: &str = r#"Output ONLY valid JSON (no code fences, no other text) with this shape:
{
  "analysis": [
    {
      "indicator": "indicator name exactly as listed",
      "context": "specific reason with a short quote or paraphrase from the conversation",
      "score": { "phq": 0 }
    }
  ],
  "notes": "optional, at most 8 sentences on ambiguity, safety or clinical clarification"
}

Rules:
- Each indicator appears in "analysis" exactly once.
- "score.phq" is an integer from 0 to 3."#;

const TEXT_FORMAT: &str = "Answer in plain prose: one short paragraph per indicator with its \
0-3 score and the supporting evidence, then any overall notes.";

/// Inputs to a single enrichment call.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    /// Chronological `label: content` transcript
    pub transcript: &'a str,
    pub summary: Option<&'a AssessmentSummary>,
}

/// Render the aspects as `name: description` lines.
pub fn aspect_lines() -> String {
    ASPECTS
        .iter()
        .map(|a| format!("{}: {}", a.name, a.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the scale as `n: description` lines.
pub fn scale_lines() -> String {
    SCALE
        .iter()
        .map(|(n, d)| format!("{n}: {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the full message chain for one call.
pub fn build_messages(ctx: &PromptContext<'_>, mode: EnrichmentMode) -> Vec<Message> {
    let aspects = format!(
        "These are the depression indicators:\n{}\n\nFor each indicator, rate how strongly it \
         shows in the friend's messages using this PHQ-9 scale:\n{}",
        aspect_lines(),
        scale_lines()
    );

    let format = match mode {
        EnrichmentMode::Structured => STRUCTURED_FORMAT,
        EnrichmentMode::Text => TEXT_FORMAT,
    };

    let mut task = format!(
        "{format}\n\nConversation to analyse (chronological):\n{}",
        ctx.transcript
    );

    if let Some(summary) = ctx.summary {
        task.push_str("\n\nSelf-reported assessment scores:\n");
        task.push_str(&summary_lines(summary));
    }

    vec![
        Message::user(ROLE_INSTRUCTION),
        Message::assistant(ROLE_ACK),
        Message::user(aspects),
        Message::assistant(ASPECTS_ACK),
        Message::user(task),
    ]
}

fn summary_lines(summary: &AssessmentSummary) -> String {
    summary
        .scales
        .iter()
        .map(|s| {
            let severity = s.severity.as_deref().unwrap_or("unknown");
            format!(
                "{}: total {}/{} over {} item(s), severity {severity}",
                s.instrument, s.total_score, s.max_possible_score, s.answered
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
