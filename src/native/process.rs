use std::{process::Stdio, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::{Child, ChildStdin, Command},
    sync::Mutex,
    task::JoinHandle,
    time::{Instant, timeout},
};

use crate::config::RunnerConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Exited {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
    TimedOut,
}

#[derive(Clone, Debug)]
pub struct SupervisedRun {
    pub outcome: Outcome,
    /// Wall clock from spawn until exit or timeout detection.
    pub execution_time: Duration,
}

/// Spawns `command`, feeds it `stdin` and waits for it to exit within
/// `time_limit`.
///
/// The child leads its own process group. On timeout the whole group is
/// killed; after a normal exit any descendants still in the group are killed
/// too, so nothing started by the submission outlives this call.
pub async fn run_supervised(
    mut command: Command,
    stdin: String,
    time_limit: Duration,
    config: &RunnerConfig,
) -> std::io::Result<SupervisedRun> {
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let start_time = Instant::now();
    let mut child = command.spawn()?;
    let pid = child.id();
    tracing::debug!("Spawned process {:?}", pid);

    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());
    let stdin_writer = spawn_writer(child.stdin.take(), stdin);

    let wait_result = timeout(time_limit, child.wait()).await;
    let execution_time = start_time.elapsed();

    match wait_result {
        Ok(Ok(status)) => {
            reap_process_group(pid);
            stdin_writer.abort();

            let (stdout, stderr) = tokio::join!(
                collect_output(stdout_reader, config.output_drain_timeout),
                collect_output(stderr_reader, config.output_drain_timeout),
            );

            Ok(SupervisedRun {
                outcome: Outcome::Exited {
                    exit_code: status.code().unwrap_or(-1),
                    stdout,
                    stderr,
                },
                execution_time,
            })
        }
        Ok(Err(e)) => {
            terminate(&mut child, pid, config.kill_grace_period).await;
            stdout_reader.abort();
            stderr_reader.abort();
            stdin_writer.abort();
            Err(e)
        }
        Err(_) => {
            tracing::warn!(
                "Process {:?} timed out after {}ms",
                pid,
                time_limit.as_millis()
            );
            terminate(&mut child, pid, config.kill_grace_period).await;
            stdout_reader.abort();
            stderr_reader.abort();
            stdin_writer.abort();

            Ok(SupervisedRun {
                outcome: Outcome::TimedOut,
                execution_time,
            })
        }
    }
}

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Drains one output pipe into a buffer shared with the supervisor, so bytes
/// read so far survive the reader being aborted.
struct OutputReader {
    task: JoinHandle<()>,
    buf: Arc<Mutex<Vec<u8>>>,
}

impl OutputReader {
    fn abort(&self) {
        self.task.abort();
    }
}

fn spawn_reader<R>(pipe: Option<R>) -> OutputReader
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buf);

    let task = tokio::spawn(async move {
        let Some(mut pipe) = pipe else {
            return;
        };
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => sink.lock().await.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    tracing::debug!("Output pipe closed with error: {}", e);
                    break;
                }
            }
        }
    });

    OutputReader { task, buf }
}

/// Writes the whole input and closes the pipe so a reader sees EOF.
fn spawn_writer(pipe: Option<ChildStdin>, input: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(mut pipe) = pipe else {
            return;
        };
        if let Err(e) = pipe.write_all(input.as_bytes()).await {
            // The child may exit without reading its input
            tracing::debug!("Failed to write to stdin: {}", e);
            return;
        }
        if let Err(e) = pipe.shutdown().await {
            tracing::debug!("Failed to close stdin: {}", e);
        }
    })
}

/// Waits for the pipe to reach EOF, bounded by `drain_timeout`. A pipe still
/// held open by an escaped descendant yields whatever was read until then.
async fn collect_output(mut reader: OutputReader, drain_timeout: Duration) -> String {
    match timeout(drain_timeout, &mut reader.task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Output reader failed: {}", e),
        Err(_) => {
            tracing::warn!("Output pipe still open {}ms after exit", drain_timeout.as_millis());
            reader.task.abort();
            let _ = reader.task.await;
        }
    }

    let buf = reader.buf.lock().await;
    String::from_utf8_lossy(&buf).into_owned()
}

async fn terminate(child: &mut Child, pid: Option<u32>, grace_period: Duration) {
    #[cfg(unix)]
    if let Err(e) = kill_process_group(pid) {
        tracing::error!("Failed to kill process group {:?}: {}", pid, e);
    }

    if let Err(e) = child.start_kill() {
        tracing::debug!("Failed to kill process {:?}: {}", pid, e);
    }

    match timeout(grace_period, child.wait()).await {
        Ok(Ok(status)) => tracing::debug!("Killed process {:?}: {}", pid, status),
        Ok(Err(e)) => tracing::error!("Failed to reap process {:?}: {}", pid, e),
        Err(_) => tracing::warn!(
            "Process {:?} not reaped within {}ms",
            pid,
            grace_period.as_millis()
        ),
    }
}

fn reap_process_group(pid: Option<u32>) {
    #[cfg(unix)]
    if let Err(e) = kill_process_group(pid) {
        tracing::warn!("Failed to kill leftover processes of group {:?}: {}", pid, e);
    }
    #[cfg(not(unix))]
    let _ = pid;
}

/// Sends SIGKILL to every process in the group led by `pid`. A group that
/// no longer exists is not an error.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) -> nix::Result<()> {
    use nix::{
        errno::Errno,
        sys::signal::{Signal, killpg},
        unistd::Pid,
    };

    let Some(pid) = pid else {
        return Ok(());
    };

    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e),
    }
}
