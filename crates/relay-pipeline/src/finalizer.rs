//! Moves an exported report into place, optionally wrapping it in a zip archive.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::FinalizeError;

/// Suffix of the archive staging file.
const STAGING_SUFFIX: &str = ".part";

/// Turns the temporary report into the final artifact.
pub struct Finalizer;

impl Finalizer {
    /// Promote `temp` to `final_path`.
    ///
    /// Uncompressed reports are renamed over any existing file. Compressed
    /// reports are archived into a staging file that replaces `final_path`
    /// only once complete; `temp` is then deleted. On failure `temp` is left
    /// intact and `final_path` keeps its previous contents.
    pub fn finalize(temp: &Path, final_path: &Path, compressed: bool) -> Result<(), FinalizeError> {
        if !compressed {
            fs::rename(temp, final_path).map_err(|source| FinalizeError::Rename {
                from: temp.to_path_buf(),
                to: final_path.to_path_buf(),
                source,
            })?;
            debug!("Moved {} to {}", temp.display(), final_path.display());
            return Ok(());
        }

        let entry = entry_name(final_path)?;
        let staging = staging_path(final_path);

        let promoted = write_archive(temp, &staging, &entry).and_then(|()| {
            fs::rename(&staging, final_path).map_err(|source| FinalizeError::Rename {
                from: staging.clone(),
                to: final_path.to_path_buf(),
                source,
            })
        });
        if let Err(e) = promoted {
            if staging.exists() {
                if let Err(rm) = fs::remove_file(&staging) {
                    warn!("Cannot remove staging file {}: {}", staging.display(), rm);
                }
            }
            return Err(e);
        }

        if let Err(e) = fs::remove_file(temp) {
            warn!("Cannot remove temporary report {}: {}", temp.display(), e);
        }
        debug!("Archived {} into {} as '{}'", temp.display(), final_path.display(), entry);
        Ok(())
    }
}

/// Name of the single archive entry: the final file name without `.zip`.
pub fn entry_name(final_path: &Path) -> Result<String, FinalizeError> {
    let name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| FinalizeError::InvalidPath(final_path.to_path_buf()))?;

    let stem_len = name.len().saturating_sub(4);
    let stripped = match name.get(stem_len..) {
        Some(ext) if stem_len > 0 && ext.eq_ignore_ascii_case(".zip") => &name[..stem_len],
        _ => name.as_str(),
    };
    Ok(stripped.to_string())
}

fn staging_path(final_path: &Path) -> PathBuf {
    let mut staging = OsString::from(final_path.as_os_str());
    staging.push(STAGING_SUFFIX);
    PathBuf::from(staging)
}

fn write_archive(temp: &Path, staging: &Path, entry: &str) -> Result<(), FinalizeError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| FinalizeError::Io { path, source }
    };
    let zip_err = |source: zip::result::ZipError| FinalizeError::Archive {
        path: staging.to_path_buf(),
        source,
    };

    let mut source = File::open(temp).map_err(io_err(temp))?;
    let size = source.metadata().map_err(io_err(temp))?.len();

    let file = File::create(staging).map_err(io_err(staging))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9))
        .large_file(size > u64::from(u32::MAX));

    zip.start_file(entry, options).map_err(zip_err)?;
    io::copy(&mut source, &mut zip).map_err(io_err(staging))?;
    let mut out = zip.finish().map_err(zip_err)?;
    out.flush().map_err(io_err(staging))?;
    out.get_ref().sync_all().map_err(io_err(staging))?;
    Ok(())
}

#[cfg(test)]
#[path = "finalizer_tests.rs"]
mod tests;
