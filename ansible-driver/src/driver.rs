use std::path::{Path, PathBuf};

use crate::{config::DriverConfig, InventoryScript};

/// Runs Ansible playbooks and dynamic inventory scripts on behalf of a
/// cluster provisioner.
///
/// `C` is the provisioner's own configuration. The driver only carries it.
#[derive(Clone, Debug)]
pub struct AnsibleDriver<C = ()> {
    pub(crate) config: DriverConfig,
    provisioner_config: Option<C>,
}

impl AnsibleDriver<()> {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            provisioner_config: None,
        }
    }
}

impl<C> AnsibleDriver<C> {
    pub fn with_provisioner_config(config: DriverConfig, provisioner_config: C) -> Self {
        Self {
            config,
            provisioner_config: Some(provisioner_config),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn provisioner_config(&self) -> Option<&C> {
        self.provisioner_config.as_ref()
    }

    pub fn playbooks(&self) -> &Path {
        &self.config.playbooks
    }

    pub fn inventory_script(&self) -> Option<&InventoryScript> {
        self.config.inventory_script.as_ref()
    }

    /// Location of the configured inventory script, if any.
    pub fn inventory_script_path(&self) -> Option<PathBuf> {
        self.inventory_script()
            .map(|script| script.resolve(&self.config.contrib))
    }
}
