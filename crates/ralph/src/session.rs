use anyhow::Result;
use tracing::{debug, info};

use crate::agent::StepAgent;
use crate::models::message::Message;
use crate::sandbox::DONE_SENTINEL;

/// The fixed message that seeds every run's history.
pub const KICKOFF_PROMPT: &str = "Please execute the instruction.";

/// How a run ended. Both outcomes are observational, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The agent signaled completion via the `done` tool.
    Done,
    /// The iteration limit was exhausted without a completion signal.
    LimitReached,
}

/// The outer orchestration loop. Owns the run-level state and the single
/// step agent constructed once per run; replays the entire accumulated
/// history into every step so the model retains full context.
pub struct Session {
    agent: StepAgent,
    limit: u32,
}

impl Session {
    pub fn new(agent: StepAgent, limit: u32) -> Self {
        Self { agent, limit }
    }

    pub async fn run(&self) -> Result<(SessionOutcome, Vec<Message>)> {
        let mut messages = vec![Message::human(KICKOFF_PROMPT)];
        let mut iteration = 0;

        while iteration < self.limit {
            messages = self.agent.step(messages).await?;
            iteration += 1;
            debug!(iteration, limit = self.limit, "iteration complete");

            if signaled_done(&messages) {
                info!(iteration, "completion signal detected");
                return Ok((SessionOutcome::Done, messages));
            }
        }

        info!(limit = self.limit, "iteration limit reached");
        Ok((SessionOutcome::LimitReached, messages))
    }
}

/// A done signal can only appear as a tool result of the most recent
/// assistant turn, so checking the two most recent messages is enough.
fn signaled_done(messages: &[Message]) -> bool {
    messages
        .iter()
        .rev()
        .take(2)
        .any(|message| matches!(message, Message::Tool { content, .. } if content == DONE_SENTINEL))
}
