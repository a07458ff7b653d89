use std::io;
use std::process::Stdio;

use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::time::{Duration, timeout};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Captured {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Finished {
    Completed(Captured),
    TimedOut,
}

/// Spawns `cmd` in its own process group, feeds `stdin` (or `/dev/null` when
/// `None`) and collects both output streams within `limit`.
///
/// The process group is killed and the child reaped on every path.
pub(crate) async fn run_with_timeout(
    mut cmd: Command,
    stdin: Option<&str>,
    limit: Duration,
) -> io::Result<Finished> {
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .process_group(0)
    .kill_on_drop(true);

    let mut child = cmd.spawn()?;
    let pid = child.id();

    let collected = timeout(limit, collect(&mut child, stdin)).await;
    terminate(&mut child, pid).await;

    match collected {
        Ok(captured) => captured.map(Finished::Completed),
        Err(_) => {
            tracing::debug!("Process {:?} exceeded {:?}", pid, limit);
            Ok(Finished::TimedOut)
        }
    }
}

async fn collect(child: &mut Child, stdin: Option<&str>) -> io::Result<Captured> {
    let stdin_pipe = child.stdin.take();
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("stdout is not captured"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("stderr is not captured"))?;

    let feed = async move {
        if let (Some(mut pipe), Some(data)) = (stdin_pipe, stdin) {
            match pipe.write_all(data.as_bytes()).await {
                // The program may exit without reading its input.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                other => other?,
            }
            // Dropping the pipe closes stdin.
        }
        Ok::<(), io::Error>(())
    };

    let mut out = Vec::new();
    let mut err = Vec::new();
    let (fed, read_out, read_err) = tokio::join!(
        feed,
        stdout.read_to_end(&mut out),
        stderr.read_to_end(&mut err)
    );
    fed?;
    read_out?;
    read_err?;
    child.wait().await?;

    Ok(Captured {
        stdout: decode(out)?,
        stderr: decode(err)?,
    })
}

/// Undecodable output is a communication failure, not a result.
fn decode(bytes: Vec<u8>) -> io::Result<String> {
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

async fn terminate(child: &mut Child, pid: Option<u32>) {
    if let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) {
        if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            tracing::trace!("killpg({}) skipped: {}", pid, e);
        }
    }
    if let Err(e) = child.start_kill() {
        tracing::trace!("kill skipped: {}", e);
    }
    if let Err(e) = child.wait().await {
        tracing::warn!("Failed to reap child process: {}", e);
    }
}
