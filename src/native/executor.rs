use std::{path::Path, time::Duration};

use tokio::process::Command;

use crate::{
    config::RunnerConfig,
    core::{
        domain::{ExecutionRequest, ExecutionResult, Language},
        traits::executor::{ExecuteError, Executor},
    },
    constants::INPUT_FILE_NAME,
    native::{
        process::{Outcome, SupervisedRun, run_supervised},
        toolchain::{Toolchain, toolchain},
        workspace::Workspace,
    },
};

/// Runs submissions as plain child processes of this service.
///
/// Isolation is limited to a private scratch directory and a wall-clock
/// timeout. There is no namespace, cgroup or seccomp confinement and
/// `max_memory_kb` is not enforced.
#[derive(Clone, Debug)]
pub struct NativeExecutor {
    config: RunnerConfig,
}

impl NativeExecutor {
    pub fn new(config: RunnerConfig) -> Self {
        NativeExecutor { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// String-typed entry point for callers holding a raw language tag.
    /// An unknown tag fails before anything touches the filesystem.
    pub async fn run_code(
        &self,
        language: &str,
        code: &str,
        input: &str,
        timeout: Duration,
        max_memory_kb: u64,
    ) -> Result<ExecutionResult, ExecuteError> {
        let language: Language = language.parse()?;
        let request = ExecutionRequest {
            max_memory_kb,
            ..ExecutionRequest::new(language, code, input, timeout)
        };

        self.execute(&request).await
    }

    async fn execute_in(
        &self,
        workspace: &Workspace,
        toolchain: &Toolchain,
        request: &ExecutionRequest,
    ) -> ExecutionResult {
        if let Err(e) = stage(workspace, toolchain, request).await {
            tracing::error!("Failed to stage files in {}: {}", workspace.path().display(), e);
            return ExecutionResult::infrastructure_failure(
                format!("Failed to stage source: {}", e),
                0,
            );
        }

        let mut command = Command::new((toolchain.executable)(&self.config));
        command.args(toolchain.args).current_dir(workspace.path());

        tracing::info!("Starting code execution for {}", request.language);
        let run = run_supervised(
            command,
            request.stdin.clone(),
            request.timeout,
            &self.config,
        )
        .await;

        match run {
            Ok(SupervisedRun {
                outcome:
                    Outcome::Exited {
                        exit_code,
                        stdout,
                        stderr,
                    },
                execution_time,
            }) => {
                let execution_time_ms = execution_time.as_millis() as u64;
                tracing::info!(
                    "Code execution completed in {}ms with exit code {}",
                    execution_time_ms,
                    exit_code
                );
                ExecutionResult::exited(exit_code, stdout, stderr, execution_time_ms)
            }
            Ok(SupervisedRun {
                outcome: Outcome::TimedOut,
                execution_time,
            }) => {
                tracing::warn!(
                    "Code execution timed out after {}ms",
                    request.timeout.as_millis()
                );
                ExecutionResult::timed_out(request.timeout, execution_time.as_millis() as u64)
            }
            Err(e) => {
                tracing::error!("Error during code execution: {}", e);
                ExecutionResult::infrastructure_failure(e.to_string(), 0)
            }
        }
    }
}

#[async_trait::async_trait]
impl Executor for NativeExecutor {
    #[tracing::instrument(
        skip_all,
        fields(
            language = %request.language,
            timeout_ms = request.timeout.as_millis() as u64,
        )
    )]
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, ExecuteError> {
        let toolchain = toolchain(request.language)
            .ok_or_else(|| ExecuteError::UnsupportedLanguage(request.language.to_string()))?;

        let workspace = Workspace::create(&self.config.scratch_root).await?;
        let result = self.execute_in(&workspace, toolchain, request).await;
        workspace.remove().await;

        tracing::debug!("Execution result: {:?}", result);
        Ok(result)
    }
}

async fn stage(
    workspace: &Workspace,
    toolchain: &Toolchain,
    request: &ExecutionRequest,
) -> std::io::Result<()> {
    for file in (toolchain.stage)(&request.source_code) {
        workspace.write_file(&file.path, &file.contents).await?;
    }
    workspace
        .write_file(Path::new(INPUT_FILE_NAME), &request.stdin)
        .await?;
    Ok(())
}
