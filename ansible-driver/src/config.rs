use std::{
    fmt::{self, Display},
    ops::Deref,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use clap::Args;

use crate::DriverError;

pub const DEFAULT_RUNNER: &str = "ansible-playbook";
pub const DEFAULT_INTERPRETER: &str = "python";
pub const DEFAULT_CONTRIB_DIR: &str = "contrib";

/// Dynamic inventory script used by the Azure provisioner.
pub const AZURE_RM_INVENTORY: &str = "azure_rm.py";

/// Configuration for an [`AnsibleDriver`](crate::AnsibleDriver).
///
/// Every value can come from the command line of a host binary (flatten this
/// struct into its `clap` parser) or from the environment.
#[derive(Args, Clone, Debug)]
pub struct DriverConfig {
    /// Directory that playbook names are resolved against
    #[clap(long = "ansible-playbooks-dir", env = "ANSIBLE_PLAYBOOKS_DIR")]
    pub playbooks: PathBuf,
    /// Directory holding the dynamic inventory scripts.
    /// A relative path resolves against the current working directory.
    #[clap(
        long = "ansible-contrib-dir",
        env = "ANSIBLE_CONTRIB_DIR",
        default_value = DEFAULT_CONTRIB_DIR
    )]
    pub contrib: PathBuf,
    /// Playbook runner executable
    #[clap(
        long = "ansible-playbook-bin",
        env = "ANSIBLE_PLAYBOOK_BIN",
        default_value = DEFAULT_RUNNER
    )]
    pub runner: String,
    /// Interpreter used to run the inventory script
    #[clap(
        long = "ansible-inventory-interpreter",
        env = "ANSIBLE_INVENTORY_INTERPRETER",
        default_value = DEFAULT_INTERPRETER
    )]
    pub interpreter: String,
    /// File name of the inventory script inside the contrib directory
    #[clap(long = "ansible-inventory-script", env = "ANSIBLE_INVENTORY_SCRIPT")]
    pub inventory_script: Option<InventoryScript>,
    /// Kill runner and inventory processes that run longer than this many seconds.
    /// Waits forever when unset.
    #[clap(
        long = "ansible-timeout-secs",
        env = "ANSIBLE_TIMEOUT_SECS",
        value_parser = parse_timeout_secs
    )]
    pub timeout: Option<Duration>,
    /// Forward playbook output into the log instead of the terminal
    #[clap(long = "ansible-forward-output", env = "ANSIBLE_FORWARD_OUTPUT")]
    pub forward_output: bool,
}

impl DriverConfig {
    pub fn new(playbooks: impl Into<PathBuf>) -> Self {
        Self {
            playbooks: playbooks.into(),
            contrib: PathBuf::from(DEFAULT_CONTRIB_DIR),
            runner: DEFAULT_RUNNER.to_string(),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            inventory_script: None,
            timeout: None,
            forward_output: false,
        }
    }

    pub fn with_contrib(mut self, contrib: impl Into<PathBuf>) -> Self {
        self.contrib = contrib.into();
        self
    }

    pub fn with_runner(mut self, runner: impl Into<String>) -> Self {
        self.runner = runner.into();
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_inventory_script(mut self, script: InventoryScript) -> Self {
        self.inventory_script = Some(script);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_forward_output(mut self, forward_output: bool) -> Self {
        self.forward_output = forward_output;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

fn parse_timeout_secs(s: &str) -> Result<Duration, String> {
    let secs = s
        .parse::<u64>()
        .map_err(|e| format!("'{s}' is not a number of seconds: {e}"))?;

    if secs == 0 {
        return Err("timeout must be at least one second".to_string());
    }

    Ok(Duration::from_secs(secs))
}

/// Bare file name of a dynamic inventory script, resolved against the
/// contrib directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryScript(String);

impl InventoryScript {
    pub fn new(name: &str) -> Result<Self, DriverError> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
            || name.contains(char::is_whitespace)
        {
            return Err(DriverError::InvalidInventoryScript(name.into()));
        }

        Ok(Self(name.to_owned()))
    }

    pub fn azure() -> Self {
        Self(AZURE_RM_INVENTORY.to_owned())
    }

    pub fn resolve(&self, contrib: &Path) -> PathBuf {
        contrib.join(&self.0)
    }
}

impl Display for InventoryScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Deref for InventoryScript {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for InventoryScript {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InventoryScript::new(s)
    }
}
