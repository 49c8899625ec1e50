// staging.rs — Throwaway checkout used to apply a patch before it touches
// the live tree.
//
// Lifecycle: copy-in, mutate, copy-back, discard. The checkout is a private
// temp directory under the staging root; nothing outside this module holds
// a path into it while it is being mutated.
//
// Symlinks are recreated as links in the checkout and are never followed:
// the applier refuses paths that go through one, and copy-back never writes
// or removes through a link in the live tree.
//
// Copy-back is file-by-file and not crash-atomic: a crash halfway leaves the
// live tree with a mix of old and new files.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dt_changeset::ApplyDetails;
use tempfile::TempDir;

use crate::apply::{resolve_target, through_symlink};
use crate::error::WorkspaceError;

/// What copy-back changed in the live tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyBackReport {
    /// Relative paths written (new or changed bytes).
    pub written: Vec<PathBuf>,
    /// Relative paths removed.
    pub removed: Vec<PathBuf>,
}

/// A temporary copy of a source tree.
pub struct StagingCheckout {
    dir: TempDir,
    checkout: PathBuf,
    source_root: PathBuf,
    skip: Skip,
}

impl StagingCheckout {
    /// Copy `source_root` into a fresh temp directory under `staging_root`.
    ///
    /// Entries whose name is in `excludes` are skipped at any depth, as are
    /// the staging root itself and every path in `skip_paths` (the archive
    /// and journal when they live inside the source tree). The same entries
    /// are left alone on copy-back.
    pub fn create(
        source_root: &Path,
        staging_root: &Path,
        excludes: &[String],
        skip_paths: &[PathBuf],
    ) -> Result<Self, WorkspaceError> {
        fs::create_dir_all(staging_root).map_err(|e| WorkspaceError::io(staging_root, e))?;
        let source_root = source_root
            .canonicalize()
            .map_err(|e| WorkspaceError::io(source_root, e))?;
        let staging_root = staging_root
            .canonicalize()
            .map_err(|e| WorkspaceError::io(staging_root, e))?;

        let dir = tempfile::Builder::new()
            .prefix("checkout-")
            .tempdir_in(&staging_root)
            .map_err(|e| WorkspaceError::io(&staging_root, e))?;
        let checkout = dir.path().join("checkout");
        fs::create_dir(&checkout).map_err(|e| WorkspaceError::io(&checkout, e))?;

        let mut paths: Vec<PathBuf> = skip_paths.iter().map(|p| canonical(p)).collect();
        paths.push(staging_root);
        let skip = Skip {
            names: excludes.to_vec(),
            paths,
        };
        copy_dir_recursive(&source_root, &checkout, &skip)?;
        tracing::debug!(
            source = %source_root.display(),
            checkout = %checkout.display(),
            "staging checkout created"
        );

        Ok(Self {
            dir,
            checkout,
            source_root,
            skip,
        })
    }

    /// Root of the checkout; apply patches here.
    pub fn path(&self) -> &Path {
        &self.checkout
    }

    /// Copy the mutated checkout back onto the source tree.
    ///
    /// Only files that are new or whose bytes differ are written. Paths the
    /// apply step removed are removed from the source tree as well.
    pub fn copy_back(&self, details: &ApplyDetails) -> Result<CopyBackReport, WorkspaceError> {
        let mut report = CopyBackReport::default();
        self.sync_changed(Path::new(""), &mut report)?;

        for path in details.removed_paths() {
            let Some(dest) = resolve_target(&self.source_root, path) else {
                continue;
            };
            let rel = Path::new(path);
            if self.skip.covers(&self.source_root, rel) || through_symlink(&self.source_root, rel) {
                tracing::warn!(path, "not removing protected or linked path");
                continue;
            }
            match fs::remove_file(&dest) {
                Ok(()) => report.removed.push(PathBuf::from(path)),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(WorkspaceError::io(dest, e)),
            }
        }

        tracing::debug!(
            written = report.written.len(),
            removed = report.removed.len(),
            "copy-back complete"
        );
        Ok(report)
    }

    /// Delete the checkout.
    pub fn discard(self) -> Result<(), WorkspaceError> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| WorkspaceError::io(path, e))
    }

    /// Write every regular file under `checkout/rel` that is missing or
    /// different under `source_root/rel`.
    fn sync_changed(&self, rel: &Path, report: &mut CopyBackReport) -> Result<(), WorkspaceError> {
        let dir = self.checkout.join(rel);
        let entries = fs::read_dir(&dir).map_err(|e| WorkspaceError::io(&dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| WorkspaceError::io(&dir, e))?;
            let name = entry.file_name();
            let rel_path = rel.join(&name);
            let dest = self.source_root.join(&rel_path);
            if self.skip.should_skip(&name.to_string_lossy(), &dest) {
                continue;
            }
            let file_type = entry
                .file_type()
                .map_err(|e| WorkspaceError::io(entry.path(), e))?;

            if file_type.is_dir() {
                self.sync_changed(&rel_path, report)?;
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            let staged = fs::read(entry.path()).map_err(|e| WorkspaceError::io(entry.path(), e))?;
            let unchanged = match fs::symlink_metadata(&dest) {
                Ok(meta) if meta.is_file() => {
                    fs::read(&dest).map_err(|e| WorkspaceError::io(&dest, e))? == staged
                }
                Ok(_) => false,
                Err(e) if e.kind() == ErrorKind::NotFound => false,
                Err(e) => return Err(WorkspaceError::io(dest, e)),
            };
            if unchanged {
                continue;
            }
            if through_symlink(&self.source_root, &rel_path) {
                tracing::warn!(path = %rel_path.display(), "not writing through a symlink");
                continue;
            }

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| WorkspaceError::io(parent, e))?;
            }
            fs::write(&dest, &staged).map_err(|e| WorkspaceError::io(&dest, e))?;
            report.written.push(rel_path);
        }

        Ok(())
    }
}

/// Entries kept out of the checkout and out of copy-back.
struct Skip {
    names: Vec<String>,
    /// Canonical absolute paths.
    paths: Vec<PathBuf>,
}

impl Skip {
    fn should_skip(&self, name: &str, path: &Path) -> bool {
        self.names.iter().any(|n| n == name) || self.paths.iter().any(|p| p.as_path() == path)
    }

    /// Whether `root/rel` is, or lies under, a skipped entry.
    fn covers(&self, root: &Path, rel: &Path) -> bool {
        let named = rel
            .components()
            .any(|c| self.names.iter().any(|n| c.as_os_str() == n.as_str()));
        let full = root.join(rel);
        named || self.paths.iter().any(|p| full.starts_with(p))
    }
}

/// Canonical form of `path`, resolving the parent when the path itself does
/// not exist yet.
fn canonical(path: &Path) -> PathBuf {
    if let Ok(path) = path.canonicalize() {
        return path;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path, skip: &Skip) -> Result<(), WorkspaceError> {
    let entries = fs::read_dir(src).map_err(|e| WorkspaceError::io(src, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| WorkspaceError::io(src, e))?;
        let file_name = entry.file_name();
        let src_path = entry.path();
        if skip.should_skip(&file_name.to_string_lossy(), &src_path) {
            continue;
        }

        let dst_path = dst.join(&file_name);
        let file_type = entry
            .file_type()
            .map_err(|e| WorkspaceError::io(&src_path, e))?;

        if file_type.is_dir() {
            fs::create_dir_all(&dst_path).map_err(|e| WorkspaceError::io(&dst_path, e))?;
            copy_dir_recursive(&src_path, &dst_path, skip)?;
        } else if file_type.is_file() {
            fs::copy(&src_path, &dst_path).map_err(|e| WorkspaceError::io(&dst_path, e))?;
        } else if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        } else {
            tracing::debug!(path = %src_path.display(), "skipping special file");
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<(), WorkspaceError> {
    let target = fs::read_link(src).map_err(|e| WorkspaceError::io(src, e))?;
    std::os::unix::fs::symlink(target, dst).map_err(|e| WorkspaceError::io(dst, e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, _dst: &Path) -> Result<(), WorkspaceError> {
    tracing::debug!(path = %src.display(), "skipping symlink");
    Ok(())
}
