//! Conversation turns exchanged with the decision oracle under protocol A.
//!
//! Every part carries an explicit serde discriminant so that a reloaded
//! conversation is reconstructed without ambiguity between a text part and
//! a tool part.

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The operator side (directives, tool results)
    Operator,
    /// The decision oracle
    Oracle,
}

/// One part of a conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnPart {
    Text {
        text: String,
    },
    ToolCall {
        name: String,
        #[serde(rename = "arguments")]
        args: serde_json::Value,
    },
    ToolResult {
        name: String,
        #[serde(rename = "result")]
        payload: serde_json::Value,
    },
}

/// A single turn: a role plus its ordered parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub parts: Vec<TurnPart>,
}

impl ConversationTurn {
    /// An operator turn carrying plain text.
    pub fn operator_text(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Operator,
            parts: vec![TurnPart::Text { text: text.into() }],
        }
    }

    /// An operator turn carrying a tool result back to the oracle.
    pub fn tool_result(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            role: TurnRole::Operator,
            parts: vec![TurnPart::ToolResult { name: name.into(), payload }],
        }
    }

    /// An oracle turn carrying plain text.
    pub fn oracle_text(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Oracle,
            parts: vec![TurnPart::Text { text: text.into() }],
        }
    }

    /// An oracle turn requesting a tool call.
    pub fn oracle_tool_call(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            role: TurnRole::Oracle,
            parts: vec![TurnPart::ToolCall { name: name.into(), args }],
        }
    }

    /// The first tool-call request in this turn, if any.
    pub fn first_tool_call(&self) -> Option<(&str, &serde_json::Value)> {
        self.parts.iter().find_map(|p| match p {
            TurnPart::ToolCall { name, args } => Some((name.as_str(), args)),
            _ => None,
        })
    }

    /// Concatenated text parts of this turn.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                TurnPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
