//! Argument lists for the playbook runner and the inventory script.
//!
//! Commands are kept as discrete argv tokens and handed straight to the
//! process spawner, nothing goes through a shell.

use std::{
    ffi::OsString,
    fmt::{self, Display},
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use tracing::Level;

use crate::DriverError;

pub const WILDCARD_TAG: &str = "all";

/// Runner verbosity, chosen from the current log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verbosity {
    Minimal,
    Debug,
}

impl Verbosity {
    /// `Debug` when debug events from this crate would be recorded by the
    /// active subscriber.
    pub fn current() -> Self {
        if tracing::enabled!(Level::DEBUG) {
            Self::Debug
        } else {
            Self::Minimal
        }
    }

    pub fn as_flag(&self) -> &'static str {
        match self {
            Self::Minimal => "-v",
            Self::Debug => "-vvvvv",
        }
    }
}

/// Variables injected into a playbook run with `--extra-vars`.
///
/// Entries keep insertion order. Inserting an existing key replaces its value
/// in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtraVars(IndexMap<String, String>);

impl ExtraVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DriverError> {
        let key = key.into();
        let value = value.into();

        let mut chars = key.chars();
        let valid_key = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid_key {
            return Err(DriverError::InvalidExtraVarKey(key));
        }

        // The runner splits the rendered token on whitespace
        if value.contains(char::is_whitespace) {
            return Err(DriverError::InvalidExtraVarValue { key });
        }

        self.0.insert(key, value);
        Ok(())
    }

    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, DriverError> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `k1=v1 k2=v2 ...`
    pub fn render(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<K, V> TryFrom<Vec<(K, V)>> for ExtraVars
where
    K: Into<String>,
    V: Into<String>,
{
    type Error = DriverError;

    fn try_from(pairs: Vec<(K, V)>) -> Result<Self, Self::Error> {
        pairs
            .into_iter()
            .try_fold(ExtraVars::new(), |vars, (k, v)| vars.with(k, v))
    }
}

/// Tags selecting which steps of a playbook run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new<I, S>(tags: I) -> Result<Self, DriverError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = tags.into_iter().map(Into::into).collect::<Vec<String>>();

        if tags.is_empty() {
            return Err(DriverError::NoTags);
        }

        if let Some(bad) = tags
            .iter()
            .find(|tag| tag.is_empty() || tag.contains(',') || tag.contains(char::is_whitespace))
        {
            return Err(DriverError::InvalidTag(bad.clone()));
        }

        Ok(Self(tags))
    }

    pub fn render(&self) -> String {
        self.0.join(",")
    }
}

impl Default for Tags {
    fn default() -> Self {
        Self(vec![WILDCARD_TAG.to_string()])
    }
}

/// A fully resolved `ansible-playbook` invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybookCommand {
    pub program: String,
    pub playbook: PathBuf,
    pub args: Vec<OsString>,
}

impl PlaybookCommand {
    pub fn new(
        runner: &str,
        playbook: PathBuf,
        verbosity: Verbosity,
        tags: &Tags,
        extra_vars: &ExtraVars,
    ) -> Self {
        let args = vec![
            OsString::from(verbosity.as_flag()),
            OsString::from("--tags"),
            OsString::from(tags.render()),
            OsString::from("--extra-vars"),
            OsString::from(extra_vars.render()),
            playbook.clone().into_os_string(),
        ];

        Self {
            program: runner.to_string(),
            playbook,
            args,
        }
    }
}

impl Display for PlaybookCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_command(f, &self.program, &self.args)
    }
}

/// A fully resolved inventory script invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryCommand {
    pub program: String,
    pub script: PathBuf,
    pub args: Vec<OsString>,
}

impl InventoryCommand {
    pub fn new(
        interpreter: &str,
        script: PathBuf,
        cluster_name: &str,
    ) -> Result<Self, DriverError> {
        if cluster_name.is_empty() {
            return Err(DriverError::EmptyClusterName);
        }

        let args = vec![
            script.clone().into_os_string(),
            OsString::from("--resource-groups"),
            OsString::from(cluster_name),
        ];

        Ok(Self {
            program: interpreter.to_string(),
            script,
            args,
        })
    }
}

impl Display for InventoryCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_command(f, &self.program, &self.args)
    }
}

// Arguments containing whitespace are quoted so the logged line reads like
// the command that actually ran.
fn display_command(f: &mut fmt::Formatter<'_>, program: &str, args: &[OsString]) -> fmt::Result {
    write!(f, "{program}")?;

    for arg in args {
        let arg = arg.to_string_lossy();
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            write!(f, " \"{arg}\"")?;
        } else {
            write!(f, " {arg}")?;
        }
    }

    Ok(())
}

pub(crate) fn resolve_playbook(playbooks: &Path, playbook: impl AsRef<Path>) -> PathBuf {
    playbooks.join(playbook)
}
