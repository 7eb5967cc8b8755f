//! The `ansible-driver` crate wraps the two external programs a cluster
//! provisioner leans on: `ansible-playbook`, which does the actual
//! provisioning, and a cloud specific dynamic inventory script, which lists
//! the nodes of a cluster.
//!
//! ```no_run
//! # async fn run() -> Result<(), ansible_driver::DriverError> {
//! use ansible_driver::{AnsibleDriver, DriverConfig, ExtraVars, InventoryScript, Tags};
//!
//! let driver = AnsibleDriver::new(
//!     DriverConfig::new("/srv/playbooks").with_inventory_script(InventoryScript::azure()),
//! );
//!
//! let vars = ExtraVars::new().with("clustername", "toil")?;
//! driver
//!     .call_playbook("create-cluster.yml", &vars, true, &Tags::default())
//!     .await?;
//!
//! let nodes = driver.get_inventory_nodes("toil").await?;
//! # Ok(())
//! # }
//! ```

mod command;
mod config;
mod driver;
mod error;
mod external_dependencies;
mod inventory;
mod playbook;
mod subprocess;
pub mod tracing;

#[cfg(test)]
mod test_utils;

pub use command::{ExtraVars, InventoryCommand, PlaybookCommand, Tags, Verbosity, WILDCARD_TAG};
pub use config::{
    DriverConfig, InventoryScript, AZURE_RM_INVENTORY, DEFAULT_CONTRIB_DIR, DEFAULT_INTERPRETER,
    DEFAULT_RUNNER,
};
pub use driver::AnsibleDriver;
pub use error::DriverError;
pub use external_dependencies::ExternalDependency;
pub use inventory::InventoryRecord;
pub use playbook::{PlaybookExit, PlaybookHandle, PlaybookRun};
