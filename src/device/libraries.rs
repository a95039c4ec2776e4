//! Runtime library detection for accelerator backends.
//!
//! ONNX Runtime can report an execution provider as compiled in while the
//! vendor runtime it needs is missing, in which case session creation
//! fails late. Looking for the runtime libraries up front lets the device
//! selector fall through to the next backend instead.
//!
//! Search order: the platform loader variable (`LD_LIBRARY_PATH`,
//! `DYLD_LIBRARY_PATH` or `PATH`), then the standard system directories.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable the dynamic loader consults on this platform.
const fn loader_env_var() -> &'static str {
    if cfg!(target_os = "windows") {
        "PATH"
    } else if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    }
}

/// Standard library directories searched after the loader variable.
fn system_library_dirs() -> Vec<PathBuf> {
    let dirs: &[&str] = if cfg!(target_os = "linux") {
        &[
            "/usr/lib",
            "/usr/local/lib",
            "/usr/lib/x86_64-linux-gnu",
            "/usr/lib64",
            "/usr/local/cuda/lib64",
            "/opt/rocm/lib",
        ]
    } else if cfg!(target_os = "macos") {
        &["/usr/lib", "/usr/local/lib"]
    } else {
        &[]
    };
    dirs.iter().map(PathBuf::from).collect()
}

/// Directories searched for accelerator runtime libraries.
pub fn library_search_paths() -> Vec<PathBuf> {
    let var = loader_env_var();
    let mut paths: Vec<PathBuf> = std::env::var_os(var)
        .map(|value| {
            std::env::split_paths(&value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default();

    if paths.is_empty() {
        debug!("{var} not set or empty");
    }

    paths.extend(system_library_dirs());
    paths
}

/// Library file patterns for the CUDA runtime.
pub const fn cuda_library_patterns() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &["cudart64_*.dll"]
    } else if cfg!(target_os = "macos") {
        &["libcudart.*.dylib"]
    } else {
        &["libcudart.so.*"]
    }
}

/// Library file patterns for the ROCm HIP runtime.
pub const fn rocm_library_patterns() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &["amdhip64*.dll"]
    } else {
        &["libamdhip64.so*"]
    }
}

/// Find the first file in `dirs` whose name matches one of `patterns`.
pub fn find_library(dirs: &[PathBuf], patterns: &[&str]) -> Option<PathBuf> {
    dirs.iter()
        .filter(|dir| dir.is_dir())
        .find_map(|dir| find_in_dir(dir, patterns))
}

fn find_in_dir(dir: &Path, patterns: &[&str]) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read {}: {e}", dir.display());
            return None;
        }
    };

    entries.filter_map(std::result::Result::ok).find_map(|entry| {
        let path = entry.path();
        let name = path.file_name()?.to_str()?;
        let matched = path.is_file() && patterns.iter().any(|p| glob_match(p, name));
        if matched {
            debug!("Found runtime library: {}", path.display());
            Some(path)
        } else {
            None
        }
    })
}

/// Match `name` against a glob with `*` and `?` wildcards.
fn glob_match(pattern: &str, name: &str) -> bool {
    let (p, n) = (pattern.as_bytes(), name.as_bytes());
    let (mut pi, mut ni) = (0, 0);
    // Position of the last `*` and the name index it was tried at.
    let mut star: Option<(usize, usize)> = None;

    while ni < n.len() {
        match p.get(pi) {
            Some(b'*') => {
                star = Some((pi, ni));
                pi += 1;
            }
            Some(&c) if c == b'?' || c == n[ni] => {
                pi += 1;
                ni += 1;
            }
            _ => match star {
                Some((sp, sn)) => {
                    pi = sp + 1;
                    ni = sn + 1;
                    star = Some((sp, sn + 1));
                }
                None => return false,
            },
        }
    }

    p[pi..].iter().all(|&c| c == b'*')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs::File;

    #[test]
    fn test_glob_match_literal() {
        assert!(glob_match("libcudart.so.12", "libcudart.so.12"));
        assert!(!glob_match("libcudart.so.12", "libcudart.so.11"));
    }

    #[test]
    fn test_glob_match_star() {
        assert!(glob_match("libcudart.so.*", "libcudart.so.12.0.140"));
        assert!(glob_match("cudart64_*.dll", "cudart64_12.dll"));
        assert!(glob_match("libamdhip64.so*", "libamdhip64.so"));
        assert!(!glob_match("cudart64_*.dll", "cudnn64_8.dll"));
    }

    #[test]
    fn test_glob_match_question_mark() {
        assert!(glob_match("cudart64_??.dll", "cudart64_11.dll"));
        assert!(!glob_match("cudart64_??.dll", "cudart64_8.dll"));
        assert!(!glob_match("cudart64_??.dll", "cudart64_123.dll"));
    }

    #[test]
    fn test_find_library_in_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("libcudart.so.12")).unwrap();

        let dirs = vec![PathBuf::from("/nonexistent/lib"), dir.path().to_path_buf()];
        let found = find_library(&dirs, &["libcudart.so.*"]).unwrap();
        assert_eq!(found, dir.path().join("libcudart.so.12"));
        assert!(find_library(&dirs, &["libamdhip64.so*"]).is_none());
    }

    #[test]
    #[serial]
    fn test_search_paths_include_system_dirs() {
        let paths = library_search_paths();
        #[cfg(target_os = "linux")]
        assert!(paths.contains(&PathBuf::from("/usr/lib")));
        let _ = paths;
    }

    #[test]
    #[serial]
    fn test_loader_variable_is_searched_first() {
        let dir = tempfile::tempdir().unwrap();
        let var = loader_env_var();
        let original = std::env::var_os(var);

        unsafe {
            std::env::set_var(var, dir.path());
        }
        let paths = library_search_paths();
        unsafe {
            match original {
                Some(value) => std::env::set_var(var, value),
                None => std::env::remove_var(var),
            }
        }

        assert_eq!(paths.first(), Some(&dir.path().to_path_buf()));
    }
}
