use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{AgentError, AgentResult};
use crate::interactive::Interactive;
use crate::models::tool::{Tool, ToolCall};

/// Fixed string returned by the `done` tool and matched by the loop's
/// completion check.
pub const DONE_SENTINEL: &str = "RALPH_DONE";

/// The canonicalized working-directory root a run is confined to.
/// Established once when the run starts and passed explicitly into every
/// tool invocation; tools never look it up from ambient state.
#[derive(Debug, Clone)]
pub struct WorkContext {
    root: PathBuf,
}

impl WorkContext {
    pub fn new<P: AsRef<Path>>(root: P) -> AgentResult<Self> {
        let root = fs::canonicalize(root.as_ref()).map_err(|e| {
            AgentError::ExecutionError(format!(
                "Failed to resolve working directory '{}': {}",
                root.as_ref().display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a model-supplied path against the root, rejecting anything
    /// that escapes it. Candidates that already exist are additionally
    /// canonicalized so a symlink cannot point outside the root.
    fn resolve(&self, candidate: &str) -> AgentResult<PathBuf> {
        let path = Path::new(candidate);
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let normalized = normalize(&joined);
        if !normalized.starts_with(&self.root) {
            return Err(AgentError::PathTraversal(candidate.to_string()));
        }

        if normalized.exists() {
            let canonical = fs::canonicalize(&normalized).map_err(|e| {
                AgentError::ExecutionError(format!("Failed to resolve '{}': {}", candidate, e))
            })?;
            if !canonical.starts_with(&self.root) {
                return Err(AgentError::PathTraversal(candidate.to_string()));
            }
            return Ok(canonical);
        }

        Ok(normalized)
    }
}

/// Lexical normalization: drops `.` components and folds `..` into the
/// preceding component, without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

pub(crate) fn str_arg<'a>(args: &'a Value, name: &str) -> AgentResult<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| AgentError::InvalidParameters(format!("Missing '{}' parameter", name)))
}

fn require_workdir(ctx: Option<&WorkContext>) -> AgentResult<&WorkContext> {
    ctx.ok_or(AgentError::MissingWorkdir)
}

pub fn list_files(args: &Value, ctx: Option<&WorkContext>) -> AgentResult<String> {
    let ctx = require_workdir(ctx)?;
    let path = ctx.resolve(str_arg(args, "path")?)?;

    let entries = fs::read_dir(&path)
        .map_err(|e| AgentError::ExecutionError(format!("Failed to read directory: {}", e)))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            AgentError::ExecutionError(format!("Failed to read directory entry: {}", e))
        })?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names.join("\n"))
}

pub fn read_file(args: &Value, ctx: Option<&WorkContext>) -> AgentResult<String> {
    let ctx = require_workdir(ctx)?;
    let path = ctx.resolve(str_arg(args, "path")?)?;

    fs::read_to_string(&path)
        .map_err(|e| AgentError::ExecutionError(format!("Failed to read file: {}", e)))
}

pub fn write_file(args: &Value, ctx: Option<&WorkContext>) -> AgentResult<String> {
    let ctx = require_workdir(ctx)?;
    let path = ctx.resolve(str_arg(args, "path")?)?;
    let content = str_arg(args, "content")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AgentError::ExecutionError(format!("Failed to create parent directories: {}", e))
        })?;
    }
    fs::write(&path, content)
        .map_err(|e| AgentError::ExecutionError(format!("Failed to write file: {}", e)))?;

    Ok(format!("Successfully wrote to {}", path.display()))
}

/// Runs a shell command with the sandbox root as the working directory.
/// A non-zero exit is not an error; stdout and stderr are captured into the
/// result string so the model can observe the failure.
pub fn run_command(args: &Value, ctx: Option<&WorkContext>) -> AgentResult<String> {
    let ctx = require_workdir(ctx)?;
    let command = str_arg(args, "command")?;

    let output = Command::new("bash")
        .arg("-c")
        .arg(command)
        .current_dir(ctx.root())
        .output()
        .map_err(|e| AgentError::ExecutionError(format!("Failed to execute command: {}", e)))?;

    let mut result = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !result.is_empty() && !result.ends_with('\n') {
            result.push('\n');
        }
        result.push_str("stderr:\n");
        result.push_str(&stderr);
    }
    Ok(result)
}

fn core_tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "list_files",
            "List the contents of a directory inside the working directory.",
            json!({
                "type": "object",
                "required": ["path"],
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Directory to list, relative to the working directory."
                    }
                }
            }),
        ),
        Tool::new(
            "read_file",
            "Read the contents of a file inside the working directory.",
            json!({
                "type": "object",
                "required": ["path"],
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File to read, relative to the working directory."
                    }
                }
            }),
        ),
        Tool::new(
            "write_file",
            "Write content to a file inside the working directory, creating parent directories as needed.",
            json!({
                "type": "object",
                "required": ["path", "content"],
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File to write, relative to the working directory."
                    },
                    "content": {
                        "type": "string",
                        "description": "The full content to write."
                    }
                }
            }),
        ),
        Tool::new(
            "run_command",
            "Run a shell command with the working directory as the current directory.",
            json!({
                "type": "object",
                "required": ["command"],
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to run."
                    }
                }
            }),
        ),
        Tool::new(
            "done",
            "Signal that the instruction has been fully completed.",
            json!({
                "type": "object",
                "required": [],
                "properties": {}
            }),
        ),
    ]
}

/// The bound tool set for a run: the sandboxed core tools, optionally
/// extended with the interactive tools. Dispatch never fails; every error
/// is rendered into the returned result string.
pub struct ToolSet {
    workdir: Option<WorkContext>,
    interactive: Option<Interactive>,
}

impl ToolSet {
    pub fn new(workdir: WorkContext) -> Self {
        Self {
            workdir: Some(workdir),
            interactive: None,
        }
    }

    /// A tool set with no working directory bound; every file and command
    /// tool reports the missing workdir as its result.
    pub fn without_workdir() -> Self {
        Self {
            workdir: None,
            interactive: None,
        }
    }

    pub fn with_interactive(mut self, interactive: Interactive) -> Self {
        self.interactive = Some(interactive);
        self
    }

    /// Schemas for every bound tool, in the order they are advertised.
    pub fn tools(&self) -> Vec<Tool> {
        let mut tools = core_tools();
        if let Some(interactive) = &self.interactive {
            tools.extend(interactive.tools());
        }
        tools
    }

    pub fn dispatch(&self, call: &ToolCall) -> String {
        debug!(tool = %call.name, id = %call.id, "dispatching tool call");
        let ctx = self.workdir.as_ref();
        let result = match call.name.as_str() {
            "list_files" => list_files(&call.arguments, ctx),
            "read_file" => read_file(&call.arguments, ctx),
            "write_file" => write_file(&call.arguments, ctx),
            "run_command" => run_command(&call.arguments, ctx),
            "done" => Ok(DONE_SENTINEL.to_string()),
            name => match &self.interactive {
                Some(interactive) => interactive.call(name, &call.arguments),
                None => Err(AgentError::ToolNotFound(name.to_string())),
            },
        };

        match result {
            Ok(output) => output,
            Err(e) => e.to_string(),
        }
    }
}
