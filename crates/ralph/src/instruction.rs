use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AgentError, AgentResult};

/// The task-defining text resource for a run. Seeded from the instruction
/// file given on the command line; rewritable mid-run at a fixed path under
/// the working directory. The rewrite path is computed internally from the
/// instruction filename, never from a model-supplied value.
#[derive(Debug)]
pub struct InstructionDocument {
    path: PathBuf,
    initial: String,
}

impl InstructionDocument {
    pub fn new<S: Into<String>>(workdir_root: &Path, filename: &str, initial: S) -> Self {
        Self {
            path: workdir_root
                .join("prompts")
                .join("instructions")
                .join(filename),
            initial: initial.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The instruction text as of now: the rewritten file if one exists,
    /// otherwise the initial text the run started with.
    pub fn current(&self) -> String {
        fs::read_to_string(&self.path).unwrap_or_else(|_| self.initial.clone())
    }

    /// Overwrite the persisted instruction in full.
    pub fn replace(&self, new_instruction: &str) -> AgentResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AgentError::ExecutionError(format!(
                    "Failed to create instructions directory: {}",
                    e
                ))
            })?;
        }
        fs::write(&self.path, new_instruction).map_err(|e| {
            AgentError::ExecutionError(format!("Failed to write instruction file: {}", e))
        })
    }
}
