//! Local tree upload

use crate::fs::BlobFileSystem;
use crate::{FsError, Result};
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, trace};
use walkdir::WalkDir;

impl BlobFileSystem {
    /// Upload a local file or directory to `remote_dst`
    ///
    /// A directory is walked without descending into symlinked directories;
    /// its files, including symlinks to files, keep their relative layout
    /// under `remote_dst` and empty directories become marker objects. A single file lands inside `remote_dst` when that is a
    /// directory, otherwise at `remote_dst` itself.
    pub fn copy_from_local(&self, local_src: &Path, remote_dst: &str) -> Result<()> {
        let remote_dst = if self.is_root(remote_dst) {
            remote_dst
        } else {
            remote_dst.trim_end_matches('/')
        };

        if local_src.is_dir() {
            return self.upload_tree(local_src, remote_dst);
        }

        let target = if self.is_dir(remote_dst)? {
            let file_name = local_src
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    FsError::InvalidArgument(format!(
                        "'{}' has no file name",
                        local_src.display()
                    ))
                })?;
            self.join([remote_dst, file_name.as_str()])
        } else {
            remote_dst.to_string()
        };
        self.upload_file(local_src, &target)
    }

    fn upload_tree(&self, local_src: &Path, remote_dst: &str) -> Result<()> {
        let mut uploaded = 0usize;
        for entry in WalkDir::new(local_src).follow_links(false) {
            let entry = entry.map_err(std::io::Error::from)?;
            let relative = entry.path().strip_prefix(local_src).map_err(|_| {
                FsError::Invariant(format!(
                    "'{}' is outside '{}'",
                    entry.path().display(),
                    local_src.display()
                ))
            })?;

            let mut remote = remote_dst.to_string();
            for component in relative.iter() {
                remote.push('/');
                remote.push_str(&component.to_string_lossy());
            }

            let file_type = entry.file_type();
            if file_type.is_dir() {
                if fs::read_dir(entry.path())?.next().is_none() {
                    self.mkdir(&remote)?;
                }
            } else if file_type.is_file() || points_to_file(entry.path()) {
                self.upload_file(entry.path(), &remote)?;
                uploaded += 1;
            } else {
                debug!(path = %entry.path().display(), "skipping link to directory");
            }
        }

        debug!(src = %local_src.display(), dst = remote_dst, uploaded, "uploaded local tree");
        Ok(())
    }

    fn upload_file(&self, local: &Path, remote: &str) -> Result<()> {
        let address = self.parse(remote)?;
        if address.is_bucket_root() {
            return Err(FsError::InvalidArgument(format!(
                "Cannot upload '{}' onto bucket root '{}'",
                local.display(),
                remote
            )));
        }
        let bucket = self.bucket(address.bucket())?;

        let mut file = File::open(local)?;
        trace!(src = %local.display(), dst = remote, "uploading file");
        self.store()
            .upload_reader(&bucket.name, address.key(), &mut file)?;
        Ok(())
    }
}

/// Whether `path` is a symlink that resolves to a regular file
fn points_to_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.is_file())
}
