//! Docker-backed isolated executor using the bollard crate.
//!
//! Each invocation allocates a fresh, globally-unique container name so
//! concurrent unrelated pipeline runs never collide in the Docker daemon.
//! The container mounts the run's workspace at the well-known data path,
//! runs the task image to completion under a bounded wait, and is always
//! removed afterwards.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use futures::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ExecutionError;
use crate::registry::TaskDescriptor;
use crate::workspace::CONTAINER_DATA_DIR;

use super::{ExecutionResult, IsolatedExecutor};

/// Environment variable name under which the worker credential is injected.
pub const SECRET_ENV_VAR: &str = "LLM_API_KEY";

/// Runs tasks as one-shot Docker containers.
pub struct DockerExecutor {
    docker: Docker,
    /// Worker credential, read once at startup. Never logged.
    secret: Option<String>,
    step_timeout: Duration,
}

impl DockerExecutor {
    /// Connects to the local Docker daemon.
    ///
    /// The connection is lazy; daemon availability is verified with a ping
    /// at the start of each run.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::RuntimeUnavailable` if no connection method
    /// is configured on this host.
    pub fn new(secret: Option<String>, step_timeout: Duration) -> Result<Self, ExecutionError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| ExecutionError::RuntimeUnavailable(e.to_string()))?;

        Ok(Self {
            docker,
            secret,
            step_timeout,
        })
    }

    fn instance_name(image: &str) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", image, &suffix[..8])
    }

    async fn ensure_image(&self, image: &str) -> Result<(), ExecutionError> {
        if self.docker.inspect_image(image).await.is_ok() {
            return Ok(());
        }

        info!(image, "Pulling task image");
        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| {
                ExecutionError::LaunchFailed(format!("Failed to pull image '{image}': {e}"))
            })?;
        }

        Ok(())
    }

    /// Collects container logs with stdout and stderr separated.
    async fn collect_logs(&self, name: &str) -> (String, String) {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: false,
            timestamps: false,
            ..Default::default()
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut logs = self.docker.logs(name, Some(options));

        while let Some(chunk) = logs.next().await {
            match chunk {
                Ok(LogOutput::StdOut { message }) => {
                    stdout.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(LogOutput::StdErr { message }) => {
                    stderr.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(container = name, error = %e, "Error reading container logs");
                    break;
                }
            }
        }

        (stdout, stderr)
    }

    /// Force-removes the container; failures are logged, not raised, so they
    /// never mask the run's outcome.
    async fn remove_container(&self, name: &str) {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };

        if let Err(e) = self.docker.remove_container(name, Some(options)).await {
            warn!(container = name, error = %e, "Failed to remove container");
        }
    }

    async fn wait_for_exit(&self, name: &str) -> Result<i64, ExecutionError> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };

        let mut stream = self.docker.wait_container(name, Some(options));
        match stream.next().await {
            // The daemon reports a non-zero exit both as a response error and
            // via the status code; keep the status code either way.
            Some(Ok(response)) => Ok(response.status_code),
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(ExecutionError::LaunchFailed(format!(
                "Error waiting for container: {e}"
            ))),
            None => Err(ExecutionError::LaunchFailed(
                "Container wait stream ended unexpectedly".to_string(),
            )),
        }
    }
}

#[async_trait]
impl IsolatedExecutor for DockerExecutor {
    async fn run(
        &self,
        task: &TaskDescriptor,
        workspace_dir: &Path,
        env: &[(String, String)],
    ) -> Result<ExecutionResult, ExecutionError> {
        // The credential check happens before any launch attempt, not as a
        // runtime failure inside the container.
        let secret = if task.needs_secret {
            match &self.secret {
                Some(secret) => Some(secret.clone()),
                None => {
                    return Err(ExecutionError::MissingCredential {
                        task: task.id.clone(),
                    })
                }
            }
        } else {
            None
        };

        self.docker
            .ping()
            .await
            .map_err(|e| ExecutionError::RuntimeUnavailable(e.to_string()))?;

        self.ensure_image(&task.image).await?;

        let name = Self::instance_name(&task.image);
        let mut container_env: Vec<String> =
            env.iter().map(|(k, v)| format!("{k}={v}")).collect();
        if let Some(secret) = secret {
            container_env.push(format!("{SECRET_ENV_VAR}={secret}"));
        }

        let host_config = HostConfig {
            binds: Some(vec![format!(
                "{}:{}",
                workspace_dir.display(),
                CONTAINER_DATA_DIR
            )]),
            network_mode: Some("bridge".to_string()),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(task.image.clone()),
            env: if container_env.is_empty() {
                None
            } else {
                Some(container_env)
            },
            host_config: Some(host_config),
            attach_stdin: Some(false),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: name.clone(),
            platform: None,
        };

        self.docker
            .create_container(Some(options), container_config)
            .await
            .map_err(|e| ExecutionError::LaunchFailed(format!("Failed to create container: {e}")))?;

        debug!(container = %name, task = %task.id, "Starting task container");

        if let Err(e) = self
            .docker
            .start_container(&name, None::<StartContainerOptions<String>>)
            .await
        {
            self.remove_container(&name).await;
            return Err(ExecutionError::LaunchFailed(format!(
                "Failed to start container: {e}"
            )));
        }

        let exit_code = match tokio::time::timeout(self.step_timeout, self.wait_for_exit(&name))
            .await
        {
            Ok(Ok(code)) => code,
            Ok(Err(e)) => {
                self.remove_container(&name).await;
                return Err(e);
            }
            Err(_) => {
                warn!(container = %name, task = %task.id, "Task timed out; removing container");
                self.remove_container(&name).await;
                return Err(ExecutionError::Timeout {
                    seconds: self.step_timeout.as_secs(),
                });
            }
        };

        let (stdout, stderr) = self.collect_logs(&name).await;
        self.remove_container(&name).await;

        if exit_code != 0 {
            return Err(ExecutionError::NonZeroExit {
                code: exit_code,
                stderr,
            });
        }

        debug!(container = %name, task = %task.id, "Task completed successfully");

        Ok(ExecutionResult {
            exit_code,
            stdout,
            stderr,
        })
    }
}
