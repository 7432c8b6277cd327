use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{AgentError, AgentResult};
use crate::instruction::InstructionDocument;
use crate::models::tool::Tool;
use crate::sandbox::str_arg;

/// Result string returned by a successful `update_instruction` call.
pub const UPDATE_INSTRUCTION_SUCCESS: &str = "Successfully updated instruction file.";

/// The human at the console. Implementations own the blocking terminal IO;
/// the loop itself never reads stdin.
pub trait Operator: Send + Sync {
    /// Display the question and block for one line of operator input.
    fn ask(&self, question: &str) -> AgentResult<String>;

    /// Surface a progress note to the operator.
    fn notify(&self, message: &str);
}

/// Human-in-the-loop tools layered on top of the sandboxed core set. Both
/// are ordinary tool calls from the step agent's perspective; the blocking
/// behavior lives entirely in here.
pub struct Interactive {
    operator: Box<dyn Operator>,
    instructions: Arc<InstructionDocument>,
}

impl Interactive {
    pub fn new(operator: Box<dyn Operator>, instructions: Arc<InstructionDocument>) -> Self {
        Self {
            operator,
            instructions,
        }
    }

    pub fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "ask_user",
                "Ask the human operator a question and wait for their answer.",
                json!({
                    "type": "object",
                    "required": ["question"],
                    "properties": {
                        "question": {
                            "type": "string",
                            "description": "The question to put to the operator."
                        }
                    }
                }),
            ),
            Tool::new(
                "update_instruction",
                "Replace the instruction file content in full. The next iteration sees the updated instruction.",
                json!({
                    "type": "object",
                    "required": ["new_instruction"],
                    "properties": {
                        "new_instruction": {
                            "type": "string",
                            "description": "The complete replacement instruction text."
                        }
                    }
                }),
            ),
        ]
    }

    pub(crate) fn call(&self, name: &str, args: &Value) -> AgentResult<String> {
        match name {
            "ask_user" => {
                let question = str_arg(args, "question")?;
                debug!(question, "suspending for operator input");
                self.operator.ask(question)
            }
            "update_instruction" => {
                let new_instruction = str_arg(args, "new_instruction")?;
                self.instructions.replace(new_instruction)?;
                self.operator.notify(UPDATE_INSTRUCTION_SUCCESS);
                Ok(UPDATE_INSTRUCTION_SUCCESS.to_string())
            }
            other => Err(AgentError::ToolNotFound(other.to_string())),
        }
    }
}
