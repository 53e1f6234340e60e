use crate::domain::ports::{CommandRunner, CommandSpec};
use crate::utils::error::{CassError, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// Runs commands as child processes with inherited stdio, so tool output
/// reaches the terminal unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<()> {
        tracing::info!("$ {}", spec);

        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let status = command.status().await.map_err(|e| CassError::CommandFailed {
            program: spec.program.clone(),
            status: format!("spawn error: {}", e),
        })?;

        if !status.success() {
            return Err(CassError::CommandFailed {
                program: spec.program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}
