//! MAC address to workload resolution by scanning descriptor directories.
//!
//! Descriptor directories hold one `<id>.conf` file per workload, e.g.
//! `/etc/pve/local/qemu-server/100.conf`. Files are re-read on every lookup;
//! nothing is cached.
//!
//! Match precedence: every `.conf` file in every root is scanned, in root
//! order and then filename order within a root, and the last file that
//! contains the MAC wins. A MAC that appears in several descriptors is a
//! misconfiguration on the host; this policy makes the outcome deterministic.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::magic::MacAddress;
use crate::target::ResolvedTarget;

/// Descriptor file extension.
const DESCRIPTOR_EXT: &str = ".conf";

/// Line prefixes that carry the workload name (`qm` and `pct` respectively).
const NAME_PREFIXES: [&str; 2] = ["name: ", "hostname: "];

/// Errors produced while resolving a MAC address.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A descriptor root could not be listed; resolution stops immediately.
    #[error("failed to list descriptor directory {}: {source}", path.display())]
    ListDir {
        /// Root directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// No descriptor matched and at least one descriptor could not be read.
    #[error("failed to read descriptor {}: {source}", path.display())]
    Read {
        /// Last descriptor that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A descriptor matched but carries no `name:`/`hostname:` line.
    #[error("name not found in descriptor {}", path.display())]
    NameNotFound {
        /// Matching descriptor.
        path: PathBuf,
    },
}

/// Resolves MAC addresses against a fixed, ordered list of descriptor roots.
#[derive(Debug, Clone)]
pub struct DescriptorResolver {
    roots: Vec<PathBuf>,
}

impl DescriptorResolver {
    /// Create a resolver over `roots`, searched in order.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Descriptor roots in search order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Find the workload whose descriptor mentions `mac`.
    ///
    /// Returns an empty [`ResolvedTarget`] when no descriptor matches and
    /// every descriptor was readable; the caller's validation rejects it.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::ListDir`] if any root cannot be listed.
    /// - [`ResolveError::NameNotFound`] if a matching descriptor has no name.
    /// - [`ResolveError::Read`] if, after a root is exhausted, nothing has
    ///   matched yet and some descriptor in that root could not be read.
    pub fn resolve(&self, mac: &MacAddress) -> Result<ResolvedTarget, ResolveError> {
        let needle = mac.to_string();
        let mut found: Option<ResolvedTarget> = None;

        for root in &self.roots {
            let mut read_error: Option<(PathBuf, io::Error)> = None;

            for path in list_descriptors(root, &mut read_error)? {
                // Descriptors are not guaranteed to be UTF-8; match on a lossy view.
                let contents = match std::fs::read(&path) {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "failed to read descriptor");
                        read_error = Some((path, e));
                        continue;
                    }
                };

                if !contents.to_uppercase().contains(&needle) {
                    continue;
                }

                let name = find_name(&contents)
                    .ok_or_else(|| ResolveError::NameNotFound { path: path.clone() })?;

                debug!(path = %path.display(), mac = %needle, "descriptor matched");
                found = Some(ResolvedTarget {
                    id: descriptor_id(&path),
                    kind: descriptor_kind(&path),
                    name: name.to_owned(),
                });
            }

            if found.is_none() {
                if let Some((path, source)) = read_error {
                    return Err(ResolveError::Read { path, source });
                }
            }
        }

        Ok(found.unwrap_or_default())
    }
}

/// List the `.conf` files directly under `root`, sorted by filename.
///
/// Entries whose type cannot be determined are recorded in `read_error`
/// and skipped.
fn list_descriptors(
    root: &Path,
    read_error: &mut Option<(PathBuf, io::Error)>,
) -> Result<Vec<PathBuf>, ResolveError> {
    let list_err = |source| ResolveError::ListDir {
        path: root.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(root).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        let path = entry.path();

        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => continue,
            Ok(_) => {}
            Err(e) => {
                *read_error = Some((path, e));
                continue;
            }
        }

        if entry
            .file_name()
            .to_string_lossy()
            .ends_with(DESCRIPTOR_EXT)
        {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

/// First `name: ` or `hostname: ` value in the descriptor, trimmed.
fn find_name(contents: &str) -> Option<&str> {
    contents.lines().find_map(|line| {
        let line = line.trim_start();
        NAME_PREFIXES
            .iter()
            .find_map(|prefix| line.strip_prefix(prefix))
            .map(str::trim)
    })
}

/// Descriptor filename without the `.conf` suffix.
fn descriptor_id(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    file_name
        .strip_suffix(DESCRIPTOR_EXT)
        .unwrap_or(&file_name)
        .to_owned()
}

/// Basename of the descriptor's parent directory.
fn descriptor_kind(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
