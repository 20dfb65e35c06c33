use std::panic;

use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use codethinker_runner::config::RunnerConfig;
use codethinker_runner::constants::DEFAULT_MAX_MEMORY_KB;
use codethinker_runner::native::executor::NativeExecutor;

const USAGE: &str = "usage: codethinker-runner <language> <source-file> < input";

#[tokio::main]
#[tracing::instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();

    let mut args = std::env::args().skip(1);
    let (Some(language), Some(source_path)) = (args.next(), args.next()) else {
        return Err(USAGE.into());
    };

    let config = RunnerConfig::from_env()?;
    tracing::debug!("Runner config: {:?}", config);

    let code = tokio::fs::read_to_string(&source_path).await?;
    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;

    let timeout = config.default_timeout;
    let executor = NativeExecutor::new(config);
    let result = executor
        .run_code(&language, &code, &input, timeout, DEFAULT_MAX_MEMORY_KB)
        .await?;

    print!("{}", result.output());
    eprint!("{}", result.error());
    tracing::info!(
        success = result.success,
        exit_code = ?result.exit_code,
        timed_out = result.timed_out,
        execution_time_ms = result.execution_time_ms,
        "Execution finished"
    );

    Ok(())
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
