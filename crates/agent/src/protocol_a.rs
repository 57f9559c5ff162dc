//! Iterative tool-calling protocol.
//!
//! One iteration is a bounded exchange: the oracle is sent the directive,
//! the context digest, the action catalog, and the conversation so far,
//! and replies with either a tool call or free text. Tool calls are
//! validated, dispatched, and their results appended to the conversation
//! as operator turns; free text ends the exchange. The ceiling bounds how
//! many oracle replies one iteration may consume.

use autoforge_actions::{Dispatcher, validator};
use autoforge_core::{ConversationTurn, Error, SessionState};
use autoforge_oracle::{ExchangeRequest, Oracle};
use autoforge_session::ContextDigest;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::console::OperatorConsole;

/// How a bounded exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeEnd {
    /// The oracle replied with free text instead of a tool call
    FreeText(String),
    /// The reply ceiling was reached with the oracle still calling tools
    CeilingReached,
}

/// Run one bounded exchange with the oracle.
pub async fn run_exchange(
    oracle: &dyn Oracle,
    dispatcher: &Dispatcher,
    console: &mut dyn OperatorConsole,
    state: &mut SessionState,
    ceiling: u32,
) -> Result<ExchangeEnd, Error> {
    if state.conversation.is_empty() {
        state
            .conversation
            .push(ConversationTurn::operator_text(state.directive.clone()));
    }

    for round in 0..ceiling {
        let request = ExchangeRequest {
            directive: state.directive.clone(),
            digest: ContextDigest::to_value(state),
            catalog: dispatcher.catalog().advertisement(),
            turns: state.conversation.clone(),
        };

        let turn = oracle.exchange(request).await?;
        let call = turn.first_tool_call().map(|(n, a)| (n.to_string(), a.clone()));
        state.conversation.push(turn.clone());

        let Some((name, args)) = call else {
            let text = turn.text();
            info!(round, "Oracle finished with free text");
            return Ok(ExchangeEnd::FreeText(text));
        };

        debug!(round, action = %name, "Oracle requested a tool call");
        let args_map = args.as_object().cloned().unwrap_or_default();

        let payload = match validator::validate(dispatcher.catalog(), &name, &args_map) {
            Err(e) => {
                warn!(action = %name, error = %e, "Rejected oracle proposal");
                json!({ "success": false, "error": e.to_string() })
            }
            Ok(kind) => {
                let protocol = state.protocol;
                match dispatcher.dispatch(state, kind, &args_map, protocol).await {
                    Ok(outcome) => {
                        // ask_operator routes its question to the console and
                        // the answer back to the oracle
                        if let Some(question) = outcome
                            .data
                            .as_ref()
                            .and_then(|d| d.get("question"))
                            .and_then(|q| q.as_str())
                        {
                            let answer = console.clarify(question);
                            json!({ "success": true, "answer": answer })
                        } else {
                            json!({
                                "success": outcome.success,
                                "summary": outcome.summary,
                                "data": outcome.data,
                            })
                        }
                    }
                    Err(e) => json!({ "success": false, "error": e.to_string() }),
                }
            }
        };

        state.conversation.push(ConversationTurn::tool_result(name, payload));
    }

    warn!(ceiling, "Exchange ceiling reached");
    Ok(ExchangeEnd::CeilingReached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoforge_core::{Language, Protocol};
    use autoforge_oracle::ScriptedOracle;
    use autoforge_session::Assessment;
    use crate::console::Decision;

    struct SilentConsole {
        answers: Vec<String>,
    }

    impl OperatorConsole for SilentConsole {
        fn decide(&mut self, _: &Assessment, _: &SessionState) -> Decision {
            Decision::Stop
        }

        fn clarify(&mut self, _question: &str) -> String {
            self.answers.pop().unwrap_or_default()
        }
    }

    fn setup(dir: &std::path::Path) -> (ScriptedOracle, Dispatcher, SilentConsole, SessionState) {
        (
            ScriptedOracle::new(),
            Dispatcher::new(),
            SilentConsole { answers: vec![] },
            SessionState::new(
                dir.to_path_buf(),
                Language::Python,
                "build a web app",
                Protocol::ToolCalling,
            ),
        )
    }

    #[tokio::test]
    async fn tool_call_then_text_ends_exchange() {
        let dir = tempfile::tempdir().unwrap();
        let (oracle, dispatcher, mut console, mut state) = setup(dir.path());

        oracle.push_turn(ConversationTurn::oracle_tool_call(
            "create_file",
            json!({"path": "app.py", "content": "print(1)"}),
        ));
        oracle.push_turn(ConversationTurn::oracle_text("created the entry point"));

        let end = run_exchange(&oracle, &dispatcher, &mut console, &mut state, 5)
            .await
            .unwrap();

        assert_eq!(end, ExchangeEnd::FreeText("created the entry point".into()));
        assert!(dir.path().join("app.py").exists());
        assert_eq!(state.history.len(), 1);
        // directive, tool call, tool result, closing text
        assert_eq!(state.conversation.len(), 4);
    }

    #[tokio::test]
    async fn ceiling_bounds_tool_calls() {
        let dir = tempfile::tempdir().unwrap();
        let (oracle, dispatcher, mut console, mut state) = setup(dir.path());

        for i in 0..5 {
            oracle.push_turn(ConversationTurn::oracle_tool_call(
                "create_file",
                json!({"path": format!("f{i}.txt"), "content": "x"}),
            ));
        }

        let end = run_exchange(&oracle, &dispatcher, &mut console, &mut state, 2)
            .await
            .unwrap();

        assert_eq!(end, ExchangeEnd::CeilingReached);
        assert_eq!(state.history.len(), 2);
        assert_eq!(oracle.exchange_requests().len(), 2);
    }

    #[tokio::test]
    async fn invalid_proposal_gets_error_result_without_record() {
        let dir = tempfile::tempdir().unwrap();
        let (oracle, dispatcher, mut console, mut state) = setup(dir.path());

        oracle.push_turn(ConversationTurn::oracle_tool_call(
            "create_file",
            json!({"path": "a.txt"}),
        ));
        oracle.push_turn(ConversationTurn::oracle_text("giving up"));

        let end = run_exchange(&oracle, &dispatcher, &mut console, &mut state, 5)
            .await
            .unwrap();

        assert_eq!(end, ExchangeEnd::FreeText("giving up".into()));
        // rejected proposals leave no execution record
        assert!(state.history.is_empty());
        let result_turn = &state.conversation[2];
        let (_, payload) = match &result_turn.parts[0] {
            autoforge_core::TurnPart::ToolResult { name, payload } => (name, payload),
            other => panic!("expected tool result, got {other:?}"),
        };
        assert_eq!(payload["success"], false);
    }

    #[tokio::test]
    async fn clarifying_question_reaches_console() {
        let dir = tempfile::tempdir().unwrap();
        let (oracle, dispatcher, _, mut state) = setup(dir.path());
        let mut console = SilentConsole { answers: vec!["use sqlite".into()] };

        oracle.push_turn(ConversationTurn::oracle_tool_call(
            "ask_operator",
            json!({"question": "which database?"}),
        ));
        oracle.push_turn(ConversationTurn::oracle_text("ok"));

        run_exchange(&oracle, &dispatcher, &mut console, &mut state, 5)
            .await
            .unwrap();

        let result_turn = &state.conversation[2];
        match &result_turn.parts[0] {
            autoforge_core::TurnPart::ToolResult { payload, .. } => {
                assert_eq!(payload["answer"], "use sqlite");
            }
            other => panic!("expected tool result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oracle_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let (oracle, dispatcher, mut console, mut state) = setup(dir.path());
        // no queued replies: the scripted oracle reports an empty reply

        let err = run_exchange(&oracle, &dispatcher, &mut console, &mut state, 5).await;
        assert!(matches!(err, Err(Error::Oracle(_))));
    }
}
