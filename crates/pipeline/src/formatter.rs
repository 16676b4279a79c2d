//! Conversation formatter.
//!
//! Renders a validated conversation into labelled transcript lines plus a
//! few statistics. Pure: the same turns always render the same way.

use sessiondigest_core::message::Role;
use sessiondigest_core::record::{ConversationStats, FormattedConversation, FormattedLine};
use sessiondigest_core::session::ConversationTurn;

/// The display label for a role. Fixed; never derived from the input.
pub fn label_for(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

/// Render `turns` in their given order.
///
/// Turns whose content is blank after trimming are left out; the remaining
/// lines keep their 1-based position in `turns`.
pub fn format_conversation(turns: &[ConversationTurn]) -> FormattedConversation {
    let lines: Vec<FormattedLine> = turns
        .iter()
        .enumerate()
        .filter_map(|(i, turn)| {
            let content = turn.content.trim();
            (!content.is_empty()).then(|| FormattedLine {
                turn: i + 1,
                role: turn.role,
                label: label_for(turn.role).to_string(),
                content: content.to_string(),
            })
        })
        .collect();

    let transcript = lines
        .iter()
        .map(|line| format!("{}: {}", line.label, line.content))
        .collect::<Vec<_>>()
        .join("\n");

    let stats = stats_for(&lines);

    FormattedConversation {
        lines,
        transcript,
        stats,
    }
}

fn stats_for(lines: &[FormattedLine]) -> ConversationStats {
    let mut stats = ConversationStats {
        total_turns: lines.len(),
        ..ConversationStats::default()
    };

    for line in lines {
        match line.role {
            Role::User => stats.user_turns += 1,
            Role::Assistant => stats.assistant_turns += 1,
            Role::System => stats.system_turns += 1,
        }
        stats.total_chars += line.content.chars().count();
    }

    if stats.total_turns > 0 {
        stats.avg_length = round2(stats.total_chars as f64 / stats.total_turns as f64);
    }

    stats
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
