use tokio::process::Command;

use crate::{AnsibleDriver, DriverError};

#[derive(Debug, PartialEq, Eq)]
pub struct ExternalDependency<'a> {
    pub binary: &'a str,
    pub install_advice: &'static str,
}

impl<'a> ExternalDependency<'a> {
    pub const fn new(binary: &'a str, install_advice: &'static str) -> Self {
        Self {
            binary,
            install_advice,
        }
    }
}

const RUNNER_ADVICE: &str =
    "Follow instructions on: https://docs.ansible.com/ansible/latest/installation_guide/";

const INTERPRETER_ADVICE: &str =
    "Install a Python interpreter with the cloud SDK required by the inventory script";

impl<C> AnsibleDriver<C> {
    pub fn external_dependencies(&self) -> Vec<ExternalDependency<'_>> {
        let mut dependencies = vec![ExternalDependency::new(&self.config.runner, RUNNER_ADVICE)];

        if self.config.inventory_script.is_some() {
            dependencies.push(ExternalDependency::new(
                &self.config.interpreter,
                INTERPRETER_ADVICE,
            ));
        }

        dependencies
    }

    /// Checks that the runner, the interpreter and the inventory script are
    /// available before any play is started.
    pub async fn preflight_check(&self) -> Result<(), DriverError> {
        let mut missing = Vec::new();

        for dep in self.external_dependencies() {
            // `command -v` is a POSIX builtin, unlike `which`
            let found = Command::new("sh")
                .arg("-c")
                .arg("command -v \"$1\"")
                .arg("sh")
                .arg(dep.binary)
                .output()
                .await
                .map(|output| output.status.success())
                .map_err(|source| DriverError::Spawn {
                    program: "sh".to_string(),
                    source,
                })?;

            if !found {
                tracing::error!(
                    "Binary '{}' not found or not executable. {}",
                    dep.binary,
                    dep.install_advice
                );
                missing.push(dep.binary.to_string());
            }
        }

        if let Some(script) = self.inventory_script_path() {
            if !script.is_file() {
                tracing::error!("Inventory script {} does not exist", script.display());
                missing.push(script.display().to_string());
            }
        }

        if !missing.is_empty() {
            return Err(DriverError::MissingDependencies(missing));
        }

        tracing::debug!("All external dependencies found");
        Ok(())
    }
}
