use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::models::Table;
use crate::pipeline::{Operator, PipelineContext};

fn default_download_timeout() -> u64 {
    300
}

fn default_process_timeout() -> u64 {
    600
}

fn artifact_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Hidden sibling that output is written to before being renamed into place.
fn temp_path(path: &Path) -> PathBuf {
    path.with_file_name(format!(".{}.tmp", artifact_name(path)))
}

/// Removes a leftover temporary file or directory, if any.
async fn discard(path: &Path) {
    let removed = if path.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    if let Err(e) = removed {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

/// Runs a child process to completion, killing it when the timeout elapses.
async fn run_process(mut command: Command, what: &str, timeout_secs: u64) -> Result<()> {
    command.kill_on_drop(true);
    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), command.output())
        .await
        .map_err(|_| {
            tracing::error!("{} did not finish within {}s", what, timeout_secs);
            Error::Timeout {
                what: what.to_string(),
                seconds: timeout_secs,
            }
        })?
        .map_err(|e| Error::Acquisition(format!("failed to start {}: {}", what, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Acquisition(format!(
            "{} exited with {}: {}",
            what,
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

/// Downloads a URL to a file. Skipped when the file exists unless `force`.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadFile {
    pub url: String,
    pub destination: PathBuf,
    #[serde(default)]
    pub force: bool,
    #[serde(default = "default_download_timeout")]
    pub timeout_secs: u64,
}

#[async_trait]
impl Operator for DownloadFile {
    fn kind(&self) -> &'static str {
        "DownloadFile"
    }

    async fn execute(
        &self,
        _data: Option<&Table>,
        context: &mut PipelineContext,
    ) -> Result<Option<Table>> {
        let destination = context.resolve(&self.destination);
        if destination.exists() && !self.force {
            tracing::info!("{} exists. Set force to download again.", destination.display());
            context.record_artifact(artifact_name(&destination), destination);
            return Ok(None);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        tracing::info!("Downloading {}", self.url);
        let response = client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    what: self.url.clone(),
                    seconds: self.timeout_secs,
                }
            } else {
                Error::Network(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Acquisition(format!(
                "download of {} failed: {}",
                self.url, status
            )));
        }

        let bytes = response.bytes().await?;
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = temp_path(&destination);
        if let Err(e) = tokio::fs::write(&temp, &bytes).await {
            discard(&temp).await;
            return Err(e.into());
        }
        tokio::fs::rename(&temp, &destination).await?;

        tracing::info!("Wrote {} bytes to {}", bytes.len(), destination.display());
        context.record_metric("bytes_downloaded", bytes.len() as f64);
        context.record_artifact(artifact_name(&destination), destination);
        Ok(None)
    }
}

/// Runs a program directly, without a shell.
///
/// When `creates` is set and that path exists, the command is skipped unless `force`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShellCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub creates: Option<PathBuf>,
    #[serde(default)]
    pub force: bool,
    #[serde(default = "default_process_timeout")]
    pub timeout_secs: u64,
}

#[async_trait]
impl Operator for ShellCommand {
    fn kind(&self) -> &'static str {
        "ShellCommand"
    }

    async fn execute(
        &self,
        _data: Option<&Table>,
        context: &mut PipelineContext,
    ) -> Result<Option<Table>> {
        if let Some(creates) = &self.creates {
            let creates = context.resolve(creates);
            if creates.exists() && !self.force {
                tracing::info!("{} exists. Set force to run {} again.", creates.display(), self.program);
                return Ok(None);
            }
        }

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(context.resolve(dir));
        }

        tracing::info!("Running {} {}", self.program, self.args.join(" "));
        run_process(command, &self.program, self.timeout_secs).await?;

        if let Some(creates) = &self.creates {
            let creates = context.resolve(creates);
            context.record_artifact(artifact_name(&creates), creates);
        }
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    fn of(path: &Path) -> Result<Self> {
        let name = path.to_string_lossy().to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(ArchiveFormat::TarGz)
        } else if name.ends_with(".zip") {
            Ok(ArchiveFormat::Zip)
        } else {
            tracing::error!("Cannot extract {}: unknown archive format", path.display());
            Err(Error::UnsupportedFormat(name))
        }
    }
}

/// Unpacks entry by entry into an existing directory, stopping once `cancel` is set.
fn unpack_tar_gz(source: &Path, destination: &Path, cancel: &AtomicBool) -> Result<()> {
    let file = std::fs::File::open(source)?;
    let gz = flate2::read::GzDecoder::new(std::io::BufReader::new(file));
    let mut archive = tar::Archive::new(gz);
    for entry in archive.entries()? {
        if cancel.load(Ordering::SeqCst) {
            return Err(Error::Acquisition(format!(
                "extraction of {} was cancelled",
                source.display()
            )));
        }
        entry?.unpack_in(destination)?;
    }
    Ok(())
}

/// Unpacks a `.tar.gz`/`.tgz` or `.zip` archive into a directory.
///
/// Skipped when the destination exists unless `force`, which replaces it. The archive is
/// unpacked into a hidden sibling directory first, so a failed or timed out extraction leaves
/// no destination behind.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractArchive {
    pub source: PathBuf,
    pub destination: PathBuf,
    #[serde(default)]
    pub force: bool,
    #[serde(default = "default_process_timeout")]
    pub timeout_secs: u64,
}

#[async_trait]
impl Operator for ExtractArchive {
    fn kind(&self) -> &'static str {
        "ExtractArchive"
    }

    async fn execute(
        &self,
        _data: Option<&Table>,
        context: &mut PipelineContext,
    ) -> Result<Option<Table>> {
        let source = context.resolve(&self.source);
        let destination = context.resolve(&self.destination);

        if destination.exists() && !self.force {
            tracing::info!("{} exists. Set force to extract again.", destination.display());
            return Ok(None);
        }
        let format = ArchiveFormat::of(&source)?;
        if !source.exists() {
            return Err(Error::Acquisition(format!(
                "archive {} does not exist",
                source.display()
            )));
        }
        let temp = temp_path(&destination);
        discard(&temp).await;
        tokio::fs::create_dir_all(&temp).await?;

        tracing::info!("Extracting {} to {}", source.display(), destination.display());
        if let Err(e) = self.unpack(format, &source, &temp).await {
            discard(&temp).await;
            return Err(e);
        }
        if destination.exists() {
            tokio::fs::remove_dir_all(&destination).await?;
        }
        tokio::fs::rename(&temp, &destination).await?;

        context.record_artifact(artifact_name(&destination), destination);
        Ok(None)
    }
}

impl ExtractArchive {
    async fn unpack(&self, format: ArchiveFormat, source: &Path, target: &Path) -> Result<()> {
        let timeout = Duration::from_secs(self.timeout_secs);
        match format {
            ArchiveFormat::TarGz => {
                let cancel = Arc::new(AtomicBool::new(false));
                let (src, dst, flag) = (source.to_path_buf(), target.to_path_buf(), cancel.clone());
                let mut handle =
                    tokio::task::spawn_blocking(move || unpack_tar_gz(&src, &dst, &flag));

                match tokio::time::timeout(timeout, &mut handle).await {
                    Ok(joined) => joined
                        .map_err(|e| Error::Acquisition(format!("extraction task failed: {}", e)))?,
                    Err(_) => {
                        tracing::error!(
                            "Extracting {} did not finish within {}s",
                            source.display(),
                            self.timeout_secs
                        );
                        cancel.store(true, Ordering::SeqCst);
                        // the task stops at the next entry
                        let _ = handle.await;
                        Err(Error::Timeout {
                            what: format!("extracting {}", source.display()),
                            seconds: self.timeout_secs,
                        })
                    }
                }
            }
            ArchiveFormat::Zip => {
                let mut command = Command::new("unzip");
                command.arg("-o").arg("-q").arg(source).arg("-d").arg(target);
                run_process(command, "unzip", self.timeout_secs).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnConfig;

    fn context(dir: &Path) -> PipelineContext {
        PipelineContext::new(ColumnConfig::default(), dir)
    }

    fn write_tar_gz(path: &Path, name: &str, contents: &[u8]) {
        let file = std::fs::File::create(path).unwrap();
        let gz = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(gz);

        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, contents).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[tokio::test]
    async fn test_extract_tar_gz() {
        let dir = tempfile::tempdir().unwrap();
        write_tar_gz(&dir.path().join("raw.tar.gz"), "train.csv", b"discourse_id,discourse_text\n1,Hi\n");
        let mut ctx = context(dir.path());

        let op = ExtractArchive {
            source: "raw.tar.gz".into(),
            destination: "raw".into(),
            force: false,
            timeout_secs: 30,
        };
        op.execute(None, &mut ctx).await.unwrap();

        let extracted = std::fs::read_to_string(dir.path().join("raw/train.csv")).unwrap();
        assert!(extracted.starts_with("discourse_id"));
        assert_eq!(ctx.artifacts["raw"], dir.path().join("raw"));
    }

    #[tokio::test]
    async fn test_failed_extraction_leaves_no_destination() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("raw.tar.gz"), b"not a gzip stream").unwrap();
        let mut ctx = context(dir.path());

        let op = ExtractArchive {
            source: "raw.tar.gz".into(),
            destination: "raw".into(),
            force: false,
            timeout_secs: 30,
        };
        assert!(op.execute(None, &mut ctx).await.is_err());
        assert!(op.execute(None, &mut ctx).await.is_err());

        assert!(!dir.path().join("raw").exists());
        assert!(!dir.path().join(".raw.tmp").exists());
        assert!(ctx.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_forced_extraction_replaces_destination() {
        let dir = tempfile::tempdir().unwrap();
        write_tar_gz(&dir.path().join("raw.tar.gz"), "train.csv", b"discourse_id\n1\n");
        std::fs::create_dir_all(dir.path().join("raw")).unwrap();
        std::fs::write(dir.path().join("raw/stale.csv"), "x").unwrap();
        std::fs::create_dir_all(dir.path().join(".raw.tmp")).unwrap();
        std::fs::write(dir.path().join(".raw.tmp/leftover.csv"), "x").unwrap();

        let op = ExtractArchive {
            source: "raw.tar.gz".into(),
            destination: "raw".into(),
            force: true,
            timeout_secs: 30,
        };
        op.execute(None, &mut context(dir.path())).await.unwrap();

        assert!(dir.path().join("raw/train.csv").exists());
        assert!(!dir.path().join("raw/stale.csv").exists());
        assert!(!dir.path().join("raw/leftover.csv").exists());
        assert!(!dir.path().join(".raw.tmp").exists());
    }

    #[test]
    fn test_cancelled_unpack_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("raw.tar.gz");
        write_tar_gz(&source, "train.csv", b"discourse_id\n1\n");
        let target = dir.path().join("out");
        std::fs::create_dir(&target).unwrap();

        let err = unpack_tar_gz(&source, &target, &AtomicBool::new(true)).unwrap_err();
        assert!(matches!(err, Error::Acquisition(_)));
        assert!(!target.join("train.csv").exists());

        unpack_tar_gz(&source, &target, &AtomicBool::new(false)).unwrap();
        assert!(target.join("train.csv").exists());
    }

    #[tokio::test]
    async fn test_extract_skips_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("raw")).unwrap();

        let op = ExtractArchive {
            source: "missing.zip".into(),
            destination: "raw".into(),
            force: false,
            timeout_secs: 30,
        };
        assert!(op.execute(None, &mut context(dir.path())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_archive_format() {
        let dir = tempfile::tempdir().unwrap();
        let op = ExtractArchive {
            source: "data.rar".into(),
            destination: "out".into(),
            force: false,
            timeout_secs: 30,
        };
        let err = op.execute(None, &mut context(dir.path())).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_download_skipped_when_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("train.csv"), "x").unwrap();
        let mut ctx = context(dir.path());

        let op: DownloadFile =
            toml::from_str("url = \"http://localhost:9/train.csv\"\ndestination = \"train.csv\"").unwrap();
        assert_eq!(op.timeout_secs, 300);
        op.execute(None, &mut ctx).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("train.csv")).unwrap(), "x");
        assert!(ctx.artifacts.contains_key("train.csv"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_command_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());

        let ok = ShellCommand {
            program: "sh".into(),
            args: vec!["-c".into(), "echo hi > out.txt".into()],
            working_dir: Some(".".into()),
            creates: Some("out.txt".into()),
            force: false,
            timeout_secs: 30,
        };
        ok.execute(None, &mut ctx).await.unwrap();
        assert!(dir.path().join("out.txt").exists());

        let failing = ShellCommand {
            program: "sh".into(),
            args: vec!["-c".into(), "exit 3".into()],
            working_dir: None,
            creates: None,
            force: false,
            timeout_secs: 30,
        };
        let err = failing.execute(None, &mut ctx).await.unwrap_err();
        assert!(matches!(err, Error::Acquisition(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_command_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let slow = ShellCommand {
            program: "sleep".into(),
            args: vec!["10".into()],
            working_dir: None,
            creates: None,
            force: false,
            timeout_secs: 1,
        };
        let err = slow.execute(None, &mut context(dir.path())).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { seconds: 1, .. }));
    }
}
