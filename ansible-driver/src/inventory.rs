//! Dynamic inventory lookups.
//!
//! Data model info: https://docs.ansible.com/ansible/latest/inventory_guide/intro_dynamic_inventory.html

use std::{io, process::Stdio};

use serde_json::{Map, Value};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    task::JoinHandle,
};

use crate::{command::InventoryCommand, subprocess, AnsibleDriver, DriverError};

/// Properties of one cluster node as reported by the inventory script.
pub type InventoryRecord = Map<String, Value>;

impl<C> AnsibleDriver<C> {
    /// List all nodes in the cluster.
    ///
    /// `cluster_name` identifies the cluster by the name of its resource group.
    /// Returns the script's JSON output as-is.
    pub async fn get_inventory(&self, cluster_name: &str) -> Result<Value, DriverError> {
        let script = self
            .inventory_script_path()
            .ok_or(DriverError::InventoryScriptNotConfigured)?;
        let command = InventoryCommand::new(&self.config.interpreter, script, cluster_name)?;

        tracing::debug!("Fetching inventory with `{command}`");

        let mut process = subprocess::command(&command.program, &command.args);
        process
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = subprocess::spawn(&mut process, &command.program)?;

        // Drain both pipes while waiting so a chatty script cannot block on a full pipe
        let stdout = read_pipe(child.stdout.take());
        let stderr = read_pipe(child.stderr.take());

        let status =
            subprocess::wait_for_exit(&mut child, &command.program, self.config.timeout()).await?;
        let stdout = collect_pipe(stdout, &command.program).await?;
        let stderr = collect_pipe(stderr, &command.program).await?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
            for line in stderr.lines() {
                tracing::error!("{}", line);
            }

            return Err(DriverError::InventoryFailed {
                script: command.script,
                status,
                stderr,
            });
        }

        serde_json::from_slice(&stdout).map_err(|source| DriverError::InventoryDecode {
            script: command.script,
            source,
        })
    }

    /// Like [`get_inventory`](Self::get_inventory) but requires the output to
    /// be a list of node objects.
    pub async fn get_inventory_nodes(
        &self,
        cluster_name: &str,
    ) -> Result<Vec<InventoryRecord>, DriverError> {
        let inventory = self.get_inventory(cluster_name).await?;

        let shape_error = || DriverError::InventoryShape {
            script: self.inventory_script_path().unwrap_or_default(),
        };

        let Value::Array(nodes) = inventory else {
            return Err(shape_error());
        };

        nodes
            .into_iter()
            .map(|node| match node {
                Value::Object(record) => Ok(record),
                _ => Err(shape_error()),
            })
            .collect()
    }
}

fn read_pipe<R>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok(buf)
    })
}

/// A failed read is an error, never a truncated buffer.
async fn collect_pipe(
    reader: JoinHandle<io::Result<Vec<u8>>>,
    program: &str,
) -> Result<Vec<u8>, DriverError> {
    let wait_error = |source| DriverError::Wait {
        program: program.to_string(),
        source,
    };

    reader
        .await
        .map_err(|e| wait_error(io::Error::new(io::ErrorKind::Other, e)))?
        .map_err(wait_error)
}

#[cfg(all(test, unix))]
mod tests {
    use std::{
        fs,
        path::Path,
        pin::Pin,
        task::{Context, Poll},
        time::Duration,
    };

    use tokio::io::ReadBuf;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::{DriverConfig, InventoryScript};

    // The script is read by `sh` rather than executed, so no exec bit is needed
    fn driver_with_script(contrib: &Path, body: &str) -> AnsibleDriver {
        fs::write(contrib.join("inventory.sh"), body).unwrap();

        AnsibleDriver::new(
            DriverConfig::new(contrib)
                .with_contrib(contrib)
                .with_interpreter("sh")
                .with_inventory_script(InventoryScript::new("inventory.sh").unwrap()),
        )
    }

    #[tokio::test]
    async fn returns_decoded_json() {
        let contrib = TempDir::new().unwrap();
        let driver = driver_with_script(
            contrib.path(),
            r#"echo '[{"name": "node1"}, {"name": "node2"}]'"#,
        );

        let inventory = driver.get_inventory("toil-cluster").await.unwrap();
        assert_eq!(inventory, json!([{"name": "node1"}, {"name": "node2"}]));

        let nodes = driver.get_inventory_nodes("toil-cluster").await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0]["name"], "node1");
        assert_eq!(nodes[1]["name"], "node2");
    }

    #[tokio::test]
    async fn passes_cluster_name_as_resource_group() {
        let contrib = TempDir::new().unwrap();
        let driver = driver_with_script(
            contrib.path(),
            r#"printf '{"flag": "%s", "group": "%s"}' "$1" "$2""#,
        );

        let inventory = driver.get_inventory("toil; rm -rf /").await.unwrap();
        assert_eq!(
            inventory,
            json!({"flag": "--resource-groups", "group": "toil; rm -rf /"})
        );
    }

    #[tokio::test]
    async fn standard_dynamic_inventory_document_passes_through() {
        let contrib = TempDir::new().unwrap();
        let driver = driver_with_script(
            contrib.path(),
            r#"echo '{"toil": {"hosts": ["10.0.0.4"]}, "_meta": {"hostvars": {"10.0.0.4": {"name": "leader"}}}}'"#,
        );

        let inventory = driver.get_inventory("toil").await.unwrap();
        assert_eq!(inventory["_meta"]["hostvars"]["10.0.0.4"]["name"], "leader");

        assert!(matches!(
            driver.get_inventory_nodes("toil").await,
            Err(DriverError::InventoryShape { .. })
        ));
    }

    #[tokio::test]
    async fn when_output_truncated_then_decode_error() {
        let contrib = TempDir::new().unwrap();
        let driver = driver_with_script(contrib.path(), r#"printf '[{"name": "node1"}, {"na'"#);

        assert!(matches!(
            driver.get_inventory("toil").await,
            Err(DriverError::InventoryDecode { .. })
        ));
    }

    // Yields some bytes, then fails the way a broken pipe would
    struct BrokenPipe {
        sent: bool,
    }

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")))
            } else {
                self.sent = true;
                buf.put_slice(br#"[{"name": "#);
                Poll::Ready(Ok(()))
            }
        }
    }

    #[tokio::test]
    async fn when_pipe_read_fails_then_wait_error_not_partial_data() {
        let reader = read_pipe(Some(BrokenPipe { sent: false }));

        match collect_pipe(reader, "python").await {
            Err(DriverError::Wait { program, source }) => {
                assert_eq!(program, "python");
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
            }
            other => panic!("expected Wait error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn when_reader_task_aborted_then_wait_error() {
        let reader: JoinHandle<io::Result<Vec<u8>>> =
            tokio::spawn(std::future::pending::<io::Result<Vec<u8>>>());
        reader.abort();

        assert!(matches!(
            collect_pipe(reader, "python").await,
            Err(DriverError::Wait { .. })
        ));
    }

    #[tokio::test]
    async fn sub_second_timeout_lets_quick_script_finish() {
        let contrib = TempDir::new().unwrap();
        fs::write(
            contrib.path().join("inventory.sh"),
            "sleep 0.1\necho '[{\"name\": \"node1\"}]'",
        )
        .unwrap();
        let driver = AnsibleDriver::new(
            DriverConfig::new(contrib.path())
                .with_contrib(contrib.path())
                .with_interpreter("sh")
                .with_inventory_script(InventoryScript::new("inventory.sh").unwrap())
                .with_timeout(Duration::from_millis(900)),
        );

        let inventory = driver.get_inventory("toil").await.unwrap();
        assert_eq!(inventory, json!([{"name": "node1"}]));
    }

    #[tokio::test]
    async fn when_script_exits_non_zero_then_process_error() {
        let contrib = TempDir::new().unwrap();
        let driver = driver_with_script(
            contrib.path(),
            "echo '[]'\necho 'resource group not found' >&2\nexit 3",
        );

        match driver.get_inventory("missing").await {
            Err(DriverError::InventoryFailed { status, stderr, .. }) => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "resource group not found");
            }
            other => panic!("expected InventoryFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn when_no_script_configured_then_config_error() {
        let contrib = TempDir::new().unwrap();
        let driver = AnsibleDriver::new(DriverConfig::new(contrib.path()));

        assert!(matches!(
            driver.get_inventory("toil").await,
            Err(DriverError::InventoryScriptNotConfigured)
        ));
    }

    #[tokio::test]
    async fn when_cluster_name_empty_then_reject() {
        let contrib = TempDir::new().unwrap();
        let driver = driver_with_script(contrib.path(), "echo '[]'");

        assert!(matches!(
            driver.get_inventory("").await,
            Err(DriverError::EmptyClusterName)
        ));
    }

    #[tokio::test]
    async fn when_interpreter_missing_then_spawn_error() {
        let contrib = TempDir::new().unwrap();
        let driver = AnsibleDriver::new(
            DriverConfig::new(contrib.path())
                .with_contrib(contrib.path())
                .with_interpreter("/nonexistent/python")
                .with_inventory_script(InventoryScript::azure()),
        );

        assert!(matches!(
            driver.get_inventory("toil").await,
            Err(DriverError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn when_script_hangs_then_timeout() {
        let contrib = TempDir::new().unwrap();
        fs::write(contrib.path().join("inventory.sh"), "sleep 30").unwrap();
        let driver = AnsibleDriver::new(
            DriverConfig::new(contrib.path())
                .with_contrib(contrib.path())
                .with_interpreter("sh")
                .with_inventory_script(InventoryScript::new("inventory.sh").unwrap())
                .with_timeout(Duration::from_secs(1)),
        );

        assert!(matches!(
            driver.get_inventory("toil").await,
            Err(DriverError::Timeout { .. })
        ));
    }
}
