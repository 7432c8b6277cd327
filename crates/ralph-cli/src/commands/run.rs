use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ralph::agent::StepAgent;
use ralph::config::RalphConfig;
use ralph::instruction::InstructionDocument;
use ralph::interactive::Interactive;
use ralph::providers::factory::get_provider;
use ralph::sandbox::{ToolSet, WorkContext};
use ralph::session::{Session, SessionOutcome};

use crate::operator::ConsoleOperator;

pub async fn execute(
    config_path: &Path,
    secrets_dir: &Path,
    limit: u32,
    workdir: &Path,
    instructions_path: &Path,
) -> Result<()> {
    let config = RalphConfig::from_yaml_and_secrets(config_path, secrets_dir)?;
    init_logging(&config);

    let provider = get_provider(config.provider_config()?)?;

    let context = WorkContext::new(workdir)
        .with_context(|| format!("Invalid working directory {}", workdir.display()))?;
    let root = context.root().to_path_buf();

    let instruction_text = fs::read_to_string(instructions_path).with_context(|| {
        format!(
            "Failed to read instruction file {}",
            instructions_path.display()
        )
    })?;
    let filename = instructions_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("instructions.txt");
    let instructions = Arc::new(InstructionDocument::new(&root, filename, instruction_text));

    let interactive = Interactive::new(Box::new(ConsoleOperator), Arc::clone(&instructions));
    let toolset = ToolSet::new(context).with_interactive(interactive);
    let agent = StepAgent::new(provider, toolset, instructions);
    let session = Session::new(agent, limit);

    info!(provider = %config.provider.provider, limit, workdir = %root.display(), "starting loop");
    let (outcome, _messages) = session.run().await?;

    match outcome {
        SessionOutcome::Done => {
            println!(
                "{}",
                style("Objective met (agent signaled done).").green().bold()
            );
        }
        SessionOutcome::LimitReached => {
            println!(
                "{}",
                style("Objective not met (iteration limit reached).")
                    .yellow()
                    .bold()
            );
        }
    }
    Ok(())
}

fn init_logging(config: &RalphConfig) {
    let level = config.logging.level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (e.g. in tests) is fine to ignore
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
