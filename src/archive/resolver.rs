//! Mapping stored file references onto the configured archive root.
//!
//! Paths recorded in the store were written by an ingestion container and
//! may carry its mount prefix (`/app/...`) and Windows separators. The
//! archive itself can be relocated, so every stored path is rewritten
//! relative to the current archive root before use.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Resolves stored paths against an archive root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    /// Sorted longest first so nested prefixes win.
    stale_prefixes: Vec<String>,
}

impl PathResolver {
    /// Create a resolver for `root` stripping any of `stale_prefixes`.
    pub fn new(root: impl Into<PathBuf>, stale_prefixes: &[String]) -> Self {
        let mut prefixes: Vec<String> = stale_prefixes
            .iter()
            .map(|p| unify_separators(p).trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        prefixes.sort_by_key(|p| std::cmp::Reverse(p.len()));
        prefixes.dedup();

        Self {
            root: root.into(),
            stale_prefixes: prefixes,
        }
    }

    /// Path a stored reference maps to, without touching the filesystem.
    pub fn candidate(&self, stored: &str) -> PathBuf {
        self.root
            .join(relative_archive_path(stored, &self.stale_prefixes))
    }

    /// Resolve a stored reference to an existing file under the archive root.
    pub fn resolve(&self, stored: &str) -> Result<PathBuf> {
        let resolved = self.candidate(stored);
        if resolved.is_file() {
            Ok(resolved)
        } else {
            Err(Error::PathResolution {
                stored: stored.to_string(),
                resolved,
            })
        }
    }
}

/// Normalize a stored path into a path relative to the archive root.
///
/// Separators are unified, the first matching stale prefix is removed at a
/// component boundary, drive letters and leading separators are dropped,
/// and `.`/`..` components are collapsed without ever climbing above the
/// archive root.
pub fn relative_archive_path(stored: &str, stale_prefixes: &[String]) -> PathBuf {
    let unified = unify_separators(stored.trim());

    let stripped = stale_prefixes
        .iter()
        .find_map(|prefix| strip_component_prefix(&unified, prefix))
        .unwrap_or(unified.as_str());

    let mut parts: Vec<&str> = Vec::new();
    for (index, part) in stripped.split('/').enumerate() {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            drive if index == 0 && is_drive_letter(drive) => {}
            other => parts.push(other),
        }
    }

    parts.iter().collect()
}

fn unify_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Strip `prefix` only when it ends at a component boundary.
fn strip_component_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

fn is_drive_letter(part: &str) -> bool {
    let bytes = part.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
