use std::{io, path::PathBuf, process::ExitStatus, time::Duration};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Invalid extra var key '{0}', keys must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidExtraVarKey(String),
    #[error("Extra var '{key}' has a value containing whitespace")]
    InvalidExtraVarValue { key: String },
    #[error("At least one tag is required")]
    NoTags,
    #[error("Invalid tag '{0}', tags must be non-empty and contain no commas or whitespace")]
    InvalidTag(String),
    #[error("Cluster name must not be empty")]
    EmptyClusterName,
    #[error("Invalid inventory script '{0}', expected a bare file name")]
    InvalidInventoryScript(String),
    #[error("No inventory script configured for this provisioner")]
    InventoryScriptNotConfigured,
    #[error("Failed to launch '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed waiting on '{program}'")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("'{program}' did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
    #[error("Monitor task for playbook {playbook:?} failed to join")]
    MonitorJoin { playbook: PathBuf },
    #[error("Playbook {playbook:?} exited with {status}")]
    PlaybookFailed {
        playbook: PathBuf,
        status: ExitStatus,
    },
    #[error("Inventory script {script:?} exited with {status}: {stderr}")]
    InventoryFailed {
        script: PathBuf,
        status: ExitStatus,
        stderr: String,
    },
    #[error("Inventory script {script:?} did not produce valid JSON")]
    InventoryDecode {
        script: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Inventory script {script:?} output is not a list of node objects")]
    InventoryShape { script: PathBuf },
    #[error("One or more missing dependencies found: {}", .0.join(", "))]
    MissingDependencies(Vec<String>),
}
