use std::{ffi::OsString, process::ExitStatus, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{Child, Command},
    task::JoinHandle,
    time::timeout,
};

use crate::DriverError;

pub(crate) fn command(program: &str, args: &[OsString]) -> Command {
    let mut command = Command::new(program);
    command.args(args);
    command
}

pub(crate) fn spawn(command: &mut Command, program: &str) -> Result<Child, DriverError> {
    let child = command.spawn().map_err(|source| DriverError::Spawn {
        program: program.to_string(),
        source,
    })?;

    match child.id() {
        Some(pid) => tracing::info!("{program} started with process id {pid}"),
        None => tracing::info!("{program} started"),
    }

    Ok(child)
}

/// Takes the child's piped stdout and stderr and forwards each line into the
/// log. The returned tasks finish once the child closes its pipes.
pub(crate) fn forward_output(child: &mut Child, name: &str) -> Vec<JoinHandle<()>> {
    let mut forwarders = Vec::with_capacity(2);

    if let Some(stdout) = child.stdout.take() {
        forwarders.push(forward_lines(stdout, name.to_string(), false));
    }

    if let Some(stderr) = child.stderr.take() {
        forwarders.push(forward_lines(stderr, name.to_string(), true));
    }

    forwarders
}

fn forward_lines<R>(stream: R, name: String, is_stderr: bool) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if is_stderr {
                tracing::warn!("{name} stderr: {line}");
            } else {
                tracing::debug!("{name} stdout: {line}");
            }
        }
    })
}

/// Waits for the child to exit. When `limit` elapses first the child is
/// killed and reaped before the timeout error is returned.
pub(crate) async fn wait_for_exit(
    child: &mut Child,
    program: &str,
    limit: Option<Duration>,
) -> Result<ExitStatus, DriverError> {
    let wait_error = |source| DriverError::Wait {
        program: program.to_string(),
        source,
    };

    let Some(limit) = limit else {
        return child.wait().await.map_err(wait_error);
    };

    match timeout(limit, child.wait()).await {
        Ok(status) => status.map_err(wait_error),
        Err(_) => {
            tracing::error!("{program} did not exit within {limit:?}, killing it");
            child.kill().await.map_err(wait_error)?;
            Err(DriverError::Timeout {
                program: program.to_string(),
                timeout: limit,
            })
        }
    }
}

/// Waits for the forwarders to log everything the child wrote. A forwarder
/// still running after `grace` is aborted, since a grandchild may hold the
/// pipe open long after the child itself is gone.
pub(crate) async fn join_forwarders(forwarders: Vec<JoinHandle<()>>, grace: Duration) {
    for mut forwarder in forwarders {
        if timeout(grace, &mut forwarder).await.is_err() {
            forwarder.abort();
        }
    }
}
