use std::{
    fs,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ssv_automate_primitives::OperatorInfo;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::{
    config::DkgOpts,
    files::{self, CeremonyOutputs, FileError},
};

/// Mount point of the host output folder inside the DKG container.
pub const CONTAINER_DATA_DIR: &str = "/data";
/// Slack applied to the ceremony start time when looking for freshly written files.
const MTIME_SLACK: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum DkgError {
    #[error("Operator {0} has no DKG endpoint")]
    MissingEndpoint(u64),
    #[error("Failed to prepare output folder {path}: {source}")]
    OutputFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("DKG command exited with {status}:\n{log}")]
    Exit { status: ExitStatus, log: String },
    #[error("DKG tool reported an error: {0}")]
    Reported(String),
    #[error("DKG command did not finish within {0:?}")]
    Timeout(Duration),
    #[error("Ceremony finished without producing deposit and keyshares files")]
    MissingOutputs,
    #[error("Failed to encode operators info: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Files(#[from] FileError),
}

/// Input of one `ssv-dkg init` ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CeremonyRequest {
    pub owner: String,
    pub nonce: u64,
    pub withdraw_address: String,
    pub operators: Vec<OperatorInfo>,
    pub validators: u32,
}

/// Launches ceremonies and connectivity checks against DKG operators.
#[async_trait]
pub trait DkgRunner: Send + Sync {
    async fn run_ceremony(&self, request: &CeremonyRequest) -> eyre::Result<CeremonyOutputs>;

    async fn ping(&self, addresses: &[String]) -> eyre::Result<()>;
}

#[derive(Debug, Serialize)]
struct OperatorEndpoint<'a> {
    id: u64,
    public_key: &'a str,
    ip: &'a str,
}

/// Explicit output protocol: the last stdout line of a ceremony may name its output files.
#[derive(Debug, Deserialize)]
struct OutputManifest {
    deposit: PathBuf,
    keyshares: PathBuf,
}

/// Runs the ssv-dkg container image through the docker cli.
#[derive(Debug, Clone)]
pub struct DockerDkg {
    docker_bin: String,
    image: String,
    network: String,
    output_folder: PathBuf,
    timeout: Duration,
}

impl DockerDkg {
    pub fn new(opts: &DkgOpts) -> Self {
        Self {
            docker_bin: opts.docker_bin.clone(),
            image: opts.dkg_image.clone(),
            network: opts.network.clone(),
            output_folder: opts.output_folder.clone(),
            timeout: Duration::from_secs(opts.ceremony_timeout),
        }
    }

    /// Name given to the container of one invocation, so it can be removed if it outlives us.
    pub fn container_name(&self, label: &str) -> String {
        format!("ssv-dkg-{label}-{}", std::process::id())
    }

    /// Argument vector of an `init` ceremony writing into `host_dir`.
    pub fn init_args(
        &self,
        request: &CeremonyRequest,
        container: &str,
        host_dir: &Path,
    ) -> Result<Vec<String>, DkgError> {
        let mut endpoints = Vec::with_capacity(request.operators.len());
        for operator in &request.operators {
            let ip = operator.dkg_endpoint().ok_or(DkgError::MissingEndpoint(operator.id))?;
            endpoints.push(OperatorEndpoint {
                id: operator.id,
                public_key: &operator.public_key,
                ip,
            });
        }
        let operator_ids: Vec<String> =
            request.operators.iter().map(|operator| operator.id.to_string()).collect();

        Ok(vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            container.to_string(),
            "-v".to_string(),
            format!("{}:{CONTAINER_DATA_DIR}", host_dir.display()),
            self.image.clone(),
            "init".to_string(),
            "--owner".to_string(),
            request.owner.clone(),
            "--nonce".to_string(),
            request.nonce.to_string(),
            "--withdrawAddress".to_string(),
            request.withdraw_address.clone(),
            "--operatorIDs".to_string(),
            operator_ids.join(","),
            "--operatorsInfo".to_string(),
            serde_json::to_string(&endpoints)?,
            "--network".to_string(),
            self.network.clone(),
            "--validators".to_string(),
            request.validators.to_string(),
            "--logFilePath".to_string(),
            format!("{CONTAINER_DATA_DIR}/debug.log"),
            "--outputPath".to_string(),
            CONTAINER_DATA_DIR.to_string(),
        ])
    }

    /// Argument vector of a `ping` against the given DKG endpoints.
    pub fn ping_args(&self, container: &str, addresses: &[String]) -> Vec<String> {
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            container.to_string(),
            self.image.clone(),
            "ping".to_string(),
            "--ip".to_string(),
            addresses.join(","),
        ]
    }

    /// Force-removes a container left behind by a client that was killed.
    async fn remove_container(&self, container: &str) {
        let status = Command::new(&self.docker_bin)
            .args(["rm", "-f", container])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(status) if status.success() => warn!(container, "removed timed out DKG container"),
            Ok(status) => warn!(container, %status, "could not remove timed out DKG container"),
            Err(err) => warn!(container, %err, "could not remove timed out DKG container"),
        }
    }

    /// Runs one containerized invocation named `container`.
    async fn execute(&self, container: &str, args: &[String]) -> Result<String, DkgError> {
        debug!(program = self.docker_bin, ?args, "running DKG command");
        let child = Command::new(&self.docker_bin)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DkgError::Spawn { program: self.docker_bin.clone(), source })?;

        // killing the cli client on drop leaves the container itself running
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output
                .map_err(|source| DkgError::Spawn { program: self.docker_bin.clone(), source })?,
            Err(_) => {
                self.remove_container(container).await;
                return Err(DkgError::Timeout(self.timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        for line in stdout.lines().filter(|line| !line.trim().is_empty()) {
            info!(target: "ssv_dkg", "{line}");
        }
        for line in stderr.lines().filter(|line| !line.trim().is_empty()) {
            warn!(target: "ssv_dkg", "{line}");
        }

        if !output.status.success() {
            let log = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(DkgError::Exit { status: output.status, log });
        }
        check_reported_error(&stdout)?;
        Ok(stdout)
    }

    pub async fn init(&self, request: &CeremonyRequest) -> Result<CeremonyOutputs, DkgError> {
        fs::create_dir_all(&self.output_folder).map_err(|source| DkgError::OutputFolder {
            path: self.output_folder.clone(),
            source,
        })?;
        let host_dir = fs::canonicalize(&self.output_folder).map_err(|source| {
            DkgError::OutputFolder { path: self.output_folder.clone(), source }
        })?;

        let started = SystemTime::now() - MTIME_SLACK;
        let container = self.container_name(&request.nonce.to_string());
        let args = self.init_args(request, &container, &host_dir)?;
        let stdout = self.execute(&container, &args).await?;

        if let Some(outputs) = outputs_from_stdout(&stdout, &host_dir) {
            debug!(?outputs, "ceremony reported its outputs");
            return Ok(outputs);
        }
        files::latest_outputs(&host_dir, started)?.ok_or(DkgError::MissingOutputs)
    }

    pub async fn ping_endpoints(&self, addresses: &[String]) -> Result<(), DkgError> {
        let container = self.container_name("ping");
        self.execute(&container, &self.ping_args(&container, addresses)).await.map(|_| ())
    }
}

#[async_trait]
impl DkgRunner for DockerDkg {
    async fn run_ceremony(&self, request: &CeremonyRequest) -> eyre::Result<CeremonyOutputs> {
        Ok(self.init(request).await?)
    }

    async fn ping(&self, addresses: &[String]) -> eyre::Result<()> {
        Ok(self.ping_endpoints(addresses).await?)
    }
}

/// ssv-dkg exits with status 0 on some failures and only reports them on its last log line.
fn check_reported_error(stdout: &str) -> Result<(), DkgError> {
    match stdout.lines().rev().find(|line| !line.trim().is_empty()) {
        Some(line) if line.contains("ERROR") => Err(DkgError::Reported(line.trim().to_string())),
        _ => Ok(()),
    }
}

/// Map a path reported from inside the container back onto the host folder.
fn host_path(path: &Path, host_dir: &Path) -> PathBuf {
    match path.strip_prefix(CONTAINER_DATA_DIR) {
        Ok(relative) => host_dir.join(relative),
        Err(_) if path.is_relative() => host_dir.join(path),
        Err(_) => path.to_path_buf(),
    }
}

fn outputs_from_stdout(stdout: &str, host_dir: &Path) -> Option<CeremonyOutputs> {
    let last = stdout.lines().rev().find(|line| !line.trim().is_empty())?;
    let manifest: OutputManifest = serde_json::from_str(last.trim()).ok()?;
    Some(CeremonyOutputs {
        deposit: host_path(&manifest.deposit, host_dir),
        keyshares: host_path(&manifest.keyshares, host_dir),
    })
}
