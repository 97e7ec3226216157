//! Cache keys for the CI setup step.
//!
//! Each cache is keyed on a digest of its key files, computed the way the CI
//! platform's `hashFiles` does: SHA-256 over the concatenated SHA-256 digests
//! of every matched file, in sorted path order.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::io;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSpec {
    pub name: String,
    /// Glob patterns relative to the repository root.
    pub key_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKey {
    pub name: String,
    pub key: String,
    pub files: Vec<String>,
}

/// Compute `{os}-{name}-{runtime}-{hash}` for every spec.
pub fn cache_keys(
    root: &Path,
    runtime: &str,
    os: &str,
    specs: &[CacheSpec],
) -> Result<Vec<CacheKey>> {
    if runtime.trim().is_empty() {
        return Err(Error::validation_missing_argument(vec!["runtime".to_string()]));
    }

    specs
        .iter()
        .map(|spec| {
            let files = matched_files(root, &spec.key_files)?;
            let hash = hash_files(&files)?;
            Ok(CacheKey {
                name: spec.name.clone(),
                key: format!("{}-{}-{}-{}", os, spec.name, runtime, hash),
                files: files
                    .iter()
                    .map(|f| {
                        f.strip_prefix(root)
                            .unwrap_or(f)
                            .to_string_lossy()
                            .to_string()
                    })
                    .collect(),
            })
        })
        .collect()
}

/// Files matched by any of `patterns`, deduplicated and sorted.
pub fn matched_files(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    // The root is literal; only the key file patterns are globs.
    let root_prefix = PathBuf::from(glob::Pattern::escape(&root.to_string_lossy()));
    let mut files = Vec::new();
    for pattern in patterns {
        let full = root_prefix.join(pattern);
        let entries = glob::glob(&full.to_string_lossy()).map_err(|e| {
            Error::config_invalid_value("key_files", Some(pattern.clone()), e.to_string())
        })?;
        for entry in entries.flatten() {
            if entry.is_file() {
                files.push(entry);
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Digest of digests. Empty string when there are no files.
pub fn hash_files(files: &[PathBuf]) -> Result<String> {
    if files.is_empty() {
        return Ok(String::new());
    }

    let mut outer = Sha256::new();
    for file in files {
        let content = io::read_bytes(file, &format!("hash {}", file.display()))?;
        outer.update(Sha256::digest(&content));
    }
    Ok(hex(&outer.finalize()))
}

/// Runner OS label for the current platform.
pub fn current_os() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "macOS",
        "windows" => "Windows",
        other => other,
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn specs() -> Vec<CacheSpec> {
        vec![
            CacheSpec {
                name: "pip".to_string(),
                key_files: vec!["setup.cfg".to_string(), "requirements*.txt".to_string()],
            },
            CacheSpec {
                name: "conda".to_string(),
                key_files: vec!["environment.yml".to_string()],
            },
        ]
    }

    #[test]
    fn keys_have_expected_shape() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("setup.cfg"), "[metadata]\n").unwrap();
        fs::write(dir.path().join("requirements-dev.txt"), "pytest\n").unwrap();

        let keys = cache_keys(dir.path(), "3.9", "Linux", &specs()).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys[0].key.starts_with("Linux-pip-3.9-"));
        assert_eq!(keys[0].key.len(), "Linux-pip-3.9-".len() + 64);
        assert_eq!(keys[0].files, vec!["requirements-dev.txt", "setup.cfg"]);
        assert_eq!(keys[1].key, "Linux-conda-3.9-");
        assert!(keys[1].files.is_empty());
    }

    #[test]
    fn key_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let env = dir.path().join("environment.yml");
        fs::write(&env, "name: a\n").unwrap();
        let before = cache_keys(dir.path(), "3.9", "Linux", &specs()).unwrap();

        fs::write(&env, "name: b\n").unwrap();
        let after = cache_keys(dir.path(), "3.9", "Linux", &specs()).unwrap();

        assert_eq!(before[0].key, after[0].key);
        assert_ne!(before[1].key, after[1].key);
    }

    #[test]
    fn key_is_stable_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("setup.cfg"), "x").unwrap();
        let a = cache_keys(dir.path(), "3.10", "Linux", &specs()).unwrap();
        let b = cache_keys(dir.path(), "3.10", "Linux", &specs()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hash_of_single_file_is_digest_of_digest() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("setup.cfg");
        fs::write(&file, "abc").unwrap();

        let inner = Sha256::digest(b"abc");
        let expected = hex(&Sha256::digest(inner));
        assert_eq!(hash_files(&[file]).unwrap(), expected);
    }

    #[test]
    fn overlapping_patterns_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("requirements.txt"), "x").unwrap();
        let files = matched_files(
            dir.path(),
            &["requirements.txt".to_string(), "requirements*.txt".to_string()],
        )
        .unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn root_with_glob_characters_still_matches() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("proj[1]");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("setup.cfg"), "[metadata]\n").unwrap();
        fs::write(root.join("environment.yml"), "name: a\n").unwrap();

        let keys = cache_keys(&root, "3.9", "Linux", &specs()).unwrap();
        assert_eq!(keys[0].files, vec!["setup.cfg"]);
        assert_eq!(keys[1].files, vec!["environment.yml"]);
        assert_eq!(keys[0].key.len(), "Linux-pip-3.9-".len() + 64);

        fs::write(root.join("environment.yml"), "name: b\n").unwrap();
        let changed = cache_keys(&root, "3.9", "Linux", &specs()).unwrap();
        assert_ne!(keys[1].key, changed[1].key);
    }

    #[test]
    fn empty_runtime_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = cache_keys(dir.path(), " ", "Linux", &specs()).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.missing_argument");
    }
}
