//! Turn model: the canonical in-memory conversation the rest of the
//! workspace scores and selects over.
//!
//! The core never reaches into [`RawRecord`]s directly — it only ever calls
//! [`text_of`]. [`RawRecord`]/[`RecordPart`] and the `build_turns` reference
//! adapter below exist so the property and scenario tests have a concrete,
//! host-independent way to construct [`Turn`] sequences; a real host (a CLI
//! reading its own session format) supplies its own adapter and never needs
//! these types.

use serde::{Deserialize, Serialize};

/// Role that produced a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A user-authored message.
    User,
    /// Anything produced by the assistant side: text, reasoning, tool calls,
    /// tool results.
    System,
}

/// One piece of content within a record, tagged the way
/// `codelet-common::types::ContentPart` tags its variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RecordPart {
    /// Plain text content.
    #[serde(rename = "text")]
    Text { text: String },
    /// Assistant reasoning/thinking content.
    #[serde(rename = "reasoning")]
    Reasoning { text: String },
    /// A tool invocation request.
    #[serde(rename = "tool_use")]
    ToolUse { name: String, input: serde_json::Value },
    /// A tool invocation result.
    #[serde(rename = "tool_result")]
    ToolResult { content: String, is_error: bool },
}

/// One raw record in the input stream, before turn grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// Who produced this record.
    pub role: Role,
    /// The record's content.
    pub part: RecordPart,
}

/// Which side of the conversation a turn belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnKind {
    /// One user message.
    User,
    /// An aggregated run of assistant-side records.
    System,
}

/// A turn: one user message, or one aggregated system response block.
///
/// Turns are the unit of scoring and selection, never individual records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Dense position in the conversation, starting at 0.
    pub index: usize,
    /// Which side of the conversation produced this turn.
    pub kind: TurnKind,
    /// The records aggregated into this turn, in original order.
    pub records: Vec<RawRecord>,
}

impl Turn {
    /// Truncation applied to each tool-call argument field when building
    /// turn text.
    const TOOL_ARG_TRUNCATE: usize = 500;

    /// Project this turn's records into the text used for tokenizing,
    /// scoring, and entity extraction.
    ///
    /// Concatenates, in record order: message text, reasoning text,
    /// tool-invocation name and arguments (each argument value truncated at
    /// [`Turn::TOOL_ARG_TRUNCATE`] chars), and tool-result content.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            match &record.part {
                RecordPart::Text { text } | RecordPart::Reasoning { text } => {
                    out.push_str(text);
                    out.push('\n');
                }
                RecordPart::ToolUse { name, input } => {
                    out.push_str(name);
                    out.push('(');
                    out.push_str(&truncate_json_args(input, Self::TOOL_ARG_TRUNCATE));
                    out.push_str(")\n");
                }
                RecordPart::ToolResult { content, .. } => {
                    out.push_str(content);
                    out.push('\n');
                }
            }
        }
        out
    }

    /// Whether this turn exceeds `short_threshold` tokens and is therefore
    /// subject to scoring rather than always kept.
    pub fn is_long_system(&self, tokens: usize, short_threshold: usize) -> bool {
        self.kind == TurnKind::System && tokens > short_threshold
    }
}

fn truncate_json_args(value: &serde_json::Value, limit: usize) -> String {
    match value {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let rendered = v.to_string();
                let truncated = if rendered.chars().count() > limit {
                    rendered.chars().take(limit).collect::<String>()
                } else {
                    rendered
                };
                format!("{k}={truncated}")
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => {
            let rendered = other.to_string();
            if rendered.chars().count() > limit {
                rendered.chars().take(limit).collect()
            } else {
                rendered
            }
        }
    }
}

/// Group a flat record stream into a dense, index-ordered [`Turn`] sequence.
///
/// Rule: every [`Role::User`] record starts a new user turn; every
/// [`Role::System`] record is appended to the current (or a freshly started)
/// system turn until the next user record. Indices are assigned densely in
/// the order turns close.
pub fn build_turns(records: Vec<RawRecord>) -> Vec<Turn> {
    let mut turns: Vec<Turn> = Vec::new();
    let mut current_system: Option<Vec<RawRecord>> = None;

    for record in records {
        match record.role {
            Role::User => {
                if let Some(records) = current_system.take() {
                    turns.push(Turn {
                        index: turns.len(),
                        kind: TurnKind::System,
                        records,
                    });
                }
                turns.push(Turn {
                    index: turns.len(),
                    kind: TurnKind::User,
                    records: vec![record],
                });
            }
            Role::System => current_system.get_or_insert_with(Vec::new).push(record),
        }
    }
    if let Some(records) = current_system.take() {
        turns.push(Turn {
            index: turns.len(),
            kind: TurnKind::System,
            records,
        });
    }
    turns
}

/// Re-index a slice of turns densely from 0, preserving relative order.
///
/// Used by the evaluator to split a conversation into a prefix with its own
/// dense index space, per the turn-reindexing note in the design notes.
pub fn reindex(turns: &[Turn]) -> Vec<Turn> {
    turns
        .iter()
        .enumerate()
        .map(|(index, turn)| Turn {
            index,
            kind: turn.kind,
            records: turn.records.clone(),
        })
        .collect()
}
