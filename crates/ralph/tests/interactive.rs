use std::sync::{Arc, Mutex};

use serde_json::json;

use ralph::agent::StepAgent;
use ralph::errors::AgentResult;
use ralph::instruction::InstructionDocument;
use ralph::interactive::{Interactive, Operator, UPDATE_INSTRUCTION_SUCCESS};
use ralph::models::message::Message;
use ralph::models::tool::ToolCall;
use ralph::providers::mock::MockProvider;
use ralph::sandbox::{ToolSet, WorkContext};
use ralph::session::{Session, SessionOutcome};

struct ScriptedOperator {
    answer: String,
    asked: Arc<Mutex<Vec<String>>>,
    notices: Arc<Mutex<Vec<String>>>,
}

impl Operator for ScriptedOperator {
    fn ask(&self, question: &str) -> AgentResult<String> {
        self.asked.lock().unwrap().push(question.to_string());
        Ok(self.answer.clone())
    }

    fn notify(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }
}

/// The full interactive flow: the model asks the operator a question, then
/// rewrites the instruction file, then signals done -- all within a limit
/// of three iterations.
#[tokio::test]
async fn test_interactive_loop_flow() {
    let workdir = tempfile::tempdir().unwrap();

    let responses = vec![
        Message::ai_with_tool_calls(
            "Thinking...",
            vec![ToolCall::new(
                "call1",
                "ask_user",
                json!({"question": "Should I update?"}),
            )],
        ),
        Message::ai_with_tool_calls(
            "Updating...",
            vec![ToolCall::new(
                "call2",
                "update_instruction",
                json!({"new_instruction": "Updated Instruction"}),
            )],
        ),
        Message::ai_with_tool_calls(
            "Done.",
            vec![ToolCall::new("call3", "done", json!({}))],
        ),
    ];

    let provider = MockProvider::new(responses);
    let calls = provider.call_counter();

    let asked = Arc::new(Mutex::new(Vec::new()));
    let notices = Arc::new(Mutex::new(Vec::new()));
    let operator = ScriptedOperator {
        answer: "Yes".to_string(),
        asked: Arc::clone(&asked),
        notices: Arc::clone(&notices),
    };

    let context = WorkContext::new(workdir.path()).unwrap();
    let instructions = Arc::new(InstructionDocument::new(
        context.root(),
        "instructions.txt",
        "Original Instruction",
    ));
    let interactive = Interactive::new(Box::new(operator), Arc::clone(&instructions));
    let toolset = ToolSet::new(context).with_interactive(interactive);
    let agent = StepAgent::new(Box::new(provider), toolset, Arc::clone(&instructions));
    let session = Session::new(agent, 3);

    let (outcome, messages) = session.run().await.unwrap();

    assert_eq!(outcome, SessionOutcome::Done);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);

    // The operator was asked exactly the model's question
    assert_eq!(asked.lock().unwrap().as_slice(), ["Should I update?"]);
    assert_eq!(
        notices.lock().unwrap().as_slice(),
        [UPDATE_INSTRUCTION_SUCCESS]
    );

    // The answer is in history verbatim, correlated to the ask_user call
    assert!(messages
        .iter()
        .any(|m| matches!(m, Message::Tool { content, tool_call_id }
            if content == "Yes" && tool_call_id == "call1")));
    assert!(messages
        .iter()
        .any(|m| matches!(m, Message::Tool { content, tool_call_id }
            if content == UPDATE_INSTRUCTION_SUCCESS && tool_call_id == "call2")));

    // The rewrite landed at the fixed path with exactly the new content
    let target = workdir
        .path()
        .join("prompts")
        .join("instructions")
        .join("instructions.txt");
    let content = std::fs::read_to_string(target).unwrap();
    assert_eq!(content, "Updated Instruction");
}

/// A provider that never signals done exhausts the budget and reports the
/// limit, with the ask_user answer still visible in history.
#[tokio::test]
async fn test_interactive_loop_limit_reached() {
    let workdir = tempfile::tempdir().unwrap();

    let responses = vec![Message::ai_with_tool_calls(
        "Thinking...",
        vec![ToolCall::new(
            "call1",
            "ask_user",
            json!({"question": "Keep going?"}),
        )],
    )];

    let provider = MockProvider::new(responses);
    let asked = Arc::new(Mutex::new(Vec::new()));
    let operator = ScriptedOperator {
        answer: "No".to_string(),
        asked: Arc::clone(&asked),
        notices: Arc::new(Mutex::new(Vec::new())),
    };

    let context = WorkContext::new(workdir.path()).unwrap();
    let instructions = Arc::new(InstructionDocument::new(
        context.root(),
        "instructions.txt",
        "Original Instruction",
    ));
    let interactive = Interactive::new(Box::new(operator), Arc::clone(&instructions));
    let toolset = ToolSet::new(context).with_interactive(interactive);
    let agent = StepAgent::new(Box::new(provider), toolset, instructions);
    let session = Session::new(agent, 2);

    let (outcome, messages) = session.run().await.unwrap();

    assert_eq!(outcome, SessionOutcome::LimitReached);
    assert_eq!(asked.lock().unwrap().as_slice(), ["Keep going?"]);
    assert!(messages
        .iter()
        .any(|m| matches!(m, Message::Tool { content, .. } if content == "No")));
}
