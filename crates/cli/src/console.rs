//! Interactive operator console over stdin/stdout.

use std::io::Write;

use autoforge_agent::{Decision, OperatorConsole, parse_decision};
use autoforge_core::SessionState;
use autoforge_session::Assessment;

pub struct StdinConsole;

impl StdinConsole {
    fn read_line(&self) -> String {
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return String::new();
        }
        line
    }
}

impl OperatorConsole for StdinConsole {
    fn decide(&mut self, assessment: &Assessment, state: &SessionState) -> Decision {
        println!();
        println!("  Iteration {} — score {}/100", state.iteration, assessment.score);
        for issue in &assessment.issues {
            println!("    issue: {issue}");
        }
        if !assessment.missing_features.is_empty() {
            println!("    missing: {}", assessment.missing_features.join(", "));
        }
        println!();
        println!("  [1] continue  [2] add <feature>  [3] stop  [4] pause");
        println!("  (anything else becomes the new directive)");
        print!("  > ");
        let _ = std::io::stdout().flush();

        parse_decision(&self.read_line())
    }

    fn clarify(&mut self, question: &str) -> String {
        println!();
        println!("  The agent asks: {question}");
        print!("  > ");
        let _ = std::io::stdout().flush();
        self.read_line().trim().to_string()
    }
}
