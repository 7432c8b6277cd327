use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::instruction::InstructionDocument;
use crate::models::message::Message;
use crate::providers::base::Provider;
use crate::sandbox::ToolSet;

const SYSTEM_PROMPT: &str = "You are an autonomous software engineering agent operating inside a \
sandboxed working directory. Use the provided tools to inspect files, make changes, and run \
commands. Work in small, verifiable steps. When the instruction has been fully satisfied, call \
the `done` tool.";

/// One step of the loop: a single model call followed by at most one round
/// of tool executions. Constructed once per run and invoked repeatedly with
/// the accumulated history.
pub struct StepAgent {
    provider: Box<dyn Provider>,
    toolset: ToolSet,
    instructions: Arc<InstructionDocument>,
}

impl StepAgent {
    pub fn new(
        provider: Box<dyn Provider>,
        toolset: ToolSet,
        instructions: Arc<InstructionDocument>,
    ) -> Self {
        Self {
            provider,
            toolset,
            instructions,
        }
    }

    /// Re-rendered every step so a mid-run instruction rewrite is visible
    /// on the next iteration.
    fn system_prompt(&self) -> String {
        format!(
            "{}\n\nInstruction:\n{}",
            SYSTEM_PROMPT,
            self.instructions.current()
        )
    }

    /// Execute one step against the given history and return the extended
    /// history. The provider is invoked exactly once; if the response
    /// carries tool calls, each is executed in list order and answered by
    /// one tool message. Tool execution never triggers a second model call.
    pub async fn step(&self, mut messages: Vec<Message>) -> Result<Vec<Message>> {
        let system = self.system_prompt();
        let (response, usage) = self
            .provider
            .complete(&system, &messages, &self.toolset.tools())
            .await?;
        debug!(?usage, "model call complete");

        let tool_calls = response.tool_calls().to_vec();
        messages.push(response);

        for call in &tool_calls {
            let output = self.toolset.dispatch(call);
            messages.push(Message::tool(output, call.id.clone()));
        }

        Ok(messages)
    }
}
