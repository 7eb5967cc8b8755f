use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use tokio::{process::Child, task::JoinHandle};

use crate::{
    command::{resolve_playbook, ExtraVars, PlaybookCommand, Tags, Verbosity},
    subprocess, AnsibleDriver, DriverError,
};

const FORWARDER_GRACE: Duration = Duration::from_secs(2);

/// Result of [`AnsibleDriver::call_playbook`].
#[derive(Debug)]
pub enum PlaybookRun {
    /// The caller waited and the runner has exited.
    Finished(PlaybookExit),
    /// The runner is still going. Dropping the handle leaves it running.
    Detached(PlaybookHandle),
}

impl PlaybookRun {
    /// Waits for a detached run, or returns the exit of a finished one.
    pub async fn wait(self) -> Result<PlaybookExit, DriverError> {
        match self {
            Self::Finished(exit) => Ok(exit),
            Self::Detached(handle) => handle.wait().await,
        }
    }
}

#[derive(Debug)]
pub struct PlaybookExit {
    playbook: PathBuf,
    status: ExitStatus,
}

impl PlaybookExit {
    pub fn playbook(&self) -> &Path {
        &self.playbook
    }

    pub fn status(&self) -> ExitStatus {
        self.status
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Turns a non-zero exit into an error for callers that cannot continue
    /// after a failed play.
    pub fn ensure_success(self) -> Result<Self, DriverError> {
        if self.success() {
            Ok(self)
        } else {
            Err(DriverError::PlaybookFailed {
                playbook: self.playbook,
                status: self.status,
            })
        }
    }
}

/// An in-flight playbook run started with `wait == false`.
///
/// A background task owns the child and reaps it when it exits, so the
/// process never outlives its bookkeeping even if this handle is dropped.
#[derive(Debug)]
pub struct PlaybookHandle {
    playbook: PathBuf,
    pid: Option<u32>,
    monitor: JoinHandle<Result<ExitStatus, DriverError>>,
}

impl PlaybookHandle {
    pub fn playbook(&self) -> &Path {
        &self.playbook
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_finished(&self) -> bool {
        self.monitor.is_finished()
    }

    pub async fn wait(self) -> Result<PlaybookExit, DriverError> {
        let status = self
            .monitor
            .await
            .map_err(|_| DriverError::MonitorJoin {
                playbook: self.playbook.clone(),
            })??;

        Ok(PlaybookExit {
            playbook: self.playbook,
            status,
        })
    }
}

impl<C> AnsibleDriver<C> {
    /// Run a playbook.
    ///
    /// - `playbook`: path of the playbook relative to the playbooks directory
    /// - `extra_vars`: variables passed to the play, logged in full
    /// - `wait`: wait for the play to finish before returning
    /// - `tags`: control tags for the play, usually [`Tags::default`]
    ///
    /// A play that exits non-zero is reported in the log only. Use
    /// [`PlaybookExit::ensure_success`] to treat it as an error.
    pub async fn call_playbook(
        &self,
        playbook: impl AsRef<Path>,
        extra_vars: &ExtraVars,
        wait: bool,
        tags: &Tags,
    ) -> Result<PlaybookRun, DriverError> {
        let playbook = resolve_playbook(&self.config.playbooks, playbook);
        let command = PlaybookCommand::new(
            &self.config.runner,
            playbook,
            Verbosity::current(),
            tags,
            extra_vars,
        );

        tracing::info!("Executing Ansible call `{command}`");

        let mut process = subprocess::command(&command.program, &command.args);
        if self.config.forward_output {
            process.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let mut child = subprocess::spawn(&mut process, &command.program)?;
        let forwarders = if self.config.forward_output {
            subprocess::forward_output(&mut child, &command.program)
        } else {
            Vec::new()
        };

        let PlaybookCommand {
            program, playbook, ..
        } = command;
        let timeout = self.config.timeout();

        if wait {
            let status =
                monitor_playbook(child, forwarders, program, playbook.clone(), timeout).await?;

            Ok(PlaybookRun::Finished(PlaybookExit { playbook, status }))
        } else {
            let pid = child.id();
            let monitor = tokio::spawn(monitor_playbook(
                child,
                forwarders,
                program,
                playbook.clone(),
                timeout,
            ));

            Ok(PlaybookRun::Detached(PlaybookHandle {
                playbook,
                pid,
                monitor,
            }))
        }
    }
}

async fn monitor_playbook(
    mut child: Child,
    forwarders: Vec<JoinHandle<()>>,
    program: String,
    playbook: PathBuf,
    timeout: Option<Duration>,
) -> Result<ExitStatus, DriverError> {
    let status = subprocess::wait_for_exit(&mut child, &program, timeout).await;
    subprocess::join_forwarders(forwarders, FORWARDER_GRACE).await;
    let status = status?;

    if !status.success() {
        tracing::error!(
            "Ansible reported an error when executing playbook {}",
            playbook.display()
        );
    }

    Ok(status)
}
