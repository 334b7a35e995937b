//! Single-instance guard backed by a PID file.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::DaemonError;

/// Held PID file. Removed when released or dropped.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    held: bool,
}

impl PidFile {
    /// Claim `path` for the current process.
    ///
    /// Fails with [`DaemonError::AlreadyRunning`] when the file names a live
    /// process. A file left behind by a dead process is replaced.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, DaemonError> {
        Self::acquire_for(path, std::process::id())
    }

    fn acquire_for(path: impl AsRef<Path>, pid: u32) -> Result<Self, DaemonError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DaemonError::PidFileCreation {
                path: path.clone(),
                reason: format!("Failed to create parent directory: {}", e),
            })?;
        }

        // A stale file is removed once; a second collision means another
        // instance won the race.
        for attempt in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    write!(file, "{}", pid).map_err(|e| DaemonError::PidFileCreation {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                    info!("PID file created: {} (PID: {})", path.display(), pid);
                    return Ok(Self { path, held: true });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt == 0 => {
                    match read_pid(&path)? {
                        Some(existing) if is_process_running(existing) => {
                            return Err(DaemonError::AlreadyRunning {
                                path,
                                pid: existing,
                            });
                        }
                        existing => {
                            warn!(
                                "Removing stale PID file {} (PID {:?} not running)",
                                path.display(),
                                existing
                            );
                            remove(&path)?;
                        }
                    }
                }
                Err(e) => {
                    return Err(DaemonError::PidFileCreation {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(DaemonError::PidFileCreation {
            path,
            reason: "file reappeared after stale removal".to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now.
    pub fn release(mut self) -> Result<(), DaemonError> {
        self.held = false;
        remove(&self.path)
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if self.held {
            if let Err(e) = remove(&self.path) {
                warn!("Failed to remove PID file on drop: {}", e);
            }
        }
    }
}

/// PID recorded in `path`, or `None` when the file is missing or unparsable.
pub fn read_pid(path: &Path) -> Result<Option<u32>, DaemonError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents.trim().parse::<u32>().ok()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DaemonError::PidFileRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

fn remove(path: &Path) -> Result<(), DaemonError> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("PID file removed: {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DaemonError::PidFileRemoval {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// Whether a process with `pid` exists.
#[cfg(unix)]
pub fn is_process_running(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    // Signal 0 only probes; EPERM still means the process exists.
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn is_process_running(_pid: u32) -> bool {
    // No cheap probe here; treat any recorded PID as live.
    true
}

#[cfg(test)]
#[path = "pid_tests.rs"]
mod tests;
