//! The operator console: the human (or test harness) steering the loop.

use autoforge_core::SessionState;
use autoforge_session::Assessment;

/// What the operator wants after seeing an assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Keep iterating on the current directive
    Continue,
    /// Keep iterating, with a new feature request folded in
    AddFeature(String),
    /// Finalize the project and end the session
    Stop,
    /// Save and exit; the session can be resumed later
    Pause,
    /// Replace the directive entirely
    Directive(String),
}

/// Hook for operator interaction between iterations and for mid-task
/// clarifying questions.
pub trait OperatorConsole: Send + Sync {
    /// Called after each iteration's assessment.
    fn decide(&mut self, assessment: &Assessment, state: &SessionState) -> Decision;

    /// Called when the oracle asks the operator a question.
    fn clarify(&mut self, question: &str) -> String;
}

/// Map one line of operator input to a [`Decision`].
///
/// Accepts numbered menu choices as well as keywords; anything else
/// becomes a replacement directive.
pub fn parse_decision(input: &str) -> Decision {
    let input = input.trim();
    let lower = input.to_lowercase();

    match lower.as_str() {
        "" | "1" | "continue" => return Decision::Continue,
        "3" | "stop" | "quit" | "done" => return Decision::Stop,
        "4" | "pause" | "exit" => return Decision::Pause,
        _ => {}
    }

    if let Some(rest) = lower.strip_prefix("2 ").or_else(|| lower.strip_prefix("add ")) {
        let feature = rest.trim();
        if !feature.is_empty() {
            return Decision::AddFeature(feature.to_string());
        }
    }

    Decision::Directive(input.to_string())
}
