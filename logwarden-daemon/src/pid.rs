//! PID file guard.
//!
//! [`PidFile::create`] claims the path exclusively so a second daemon instance
//! pointed at the same file refuses to start. The file is removed when the
//! guard is dropped, including on the error paths of [`crate::orchestrator::Orchestrator::run`].

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;

/// An exclusively created PID file, removed on drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Create `path` and write the current process id into it.
    ///
    /// Missing parent directories are created (mode 0o700 on unix); the file
    /// itself is opened with `create_new` and mode 0o600.
    ///
    /// # Errors
    ///
    /// Returns an error if the file already exists (another instance is
    /// probably running) or cannot be written.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_private_dir(parent)?;
        }

        let mut file = match private_file_options().open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path)
                    .ok()
                    .and_then(|s| s.trim().parse::<u32>().ok());
                return Err(match holder {
                    Some(pid) => anyhow::anyhow!(
                        "PID file {} already exists (held by pid {pid})",
                        path.display()
                    ),
                    None => anyhow::anyhow!(
                        "PID file {} already exists with unreadable contents",
                        path.display()
                    ),
                });
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to create PID file {}: {}",
                    path.display(),
                    e
                ));
            }
        };

        // The guard owns the path from here on, so a failed write still cleans up.
        let guard = Self { path };
        let pid = std::process::id();
        writeln!(file, "{pid}")
            .map_err(|e| anyhow::anyhow!("failed to write PID file: {}", e))?;
        tracing::info!(pid, path = %guard.path.display(), "PID file written");
        Ok(guard)
    }

    /// Path of the claimed file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::info!(path = %self.path.display(), "PID file removed"),
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove PID file"
            ),
        }
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .mode(0o700)
        .recursive(true)
        .create(dir)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {}", dir.display(), e))
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {}", dir.display(), e))
}

fn private_file_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}
