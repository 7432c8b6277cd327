use cliclack::input;
use console::style;

use ralph::errors::{AgentError, AgentResult};
use ralph::interactive::Operator;

/// The console-bound operator: questions are echoed to the terminal and a
/// line of input is read synchronously, suspending the loop until the
/// human answers.
pub struct ConsoleOperator;

fn format_question(question: &str) -> String {
    format!("[AGENT ASKS]: {}", question)
}

impl Operator for ConsoleOperator {
    fn ask(&self, question: &str) -> AgentResult<String> {
        println!("{}", style(format_question(question)).cyan().bold());
        let answer: String = input("Answer:")
            .placeholder("")
            .interact()
            .map_err(|e| AgentError::ExecutionError(format!("Failed to read operator input: {}", e)))?;
        Ok(answer)
    }

    fn notify(&self, message: &str) {
        println!("{}", message);
    }
}
