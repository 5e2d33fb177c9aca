use crate::utils::error::{BootstrapError, Result};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const UNIT_FILE_EXTENSION: &str = "toml";

/// An absolute path to one loadable unit module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile(PathBuf);

impl SourceFile {
    /// Accepts only paths carrying the unit file extension.
    pub fn new(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        is_unit_file(&path).then_some(Self(path))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn stem(&self) -> &str {
        self.0
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unit")
    }

    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.display().to_string())
    }

    pub fn dir(&self) -> Option<&Path> {
        self.0.parent()
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

pub fn is_unit_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(UNIT_FILE_EXTENSION)
}

/// 展開使用者提供的路徑：目錄展開為其中的 unit 檔（不遞迴、依檔名排序），檔案直接通過
pub fn resolve<S: AsRef<str>>(paths: &[S]) -> Result<Vec<SourceFile>> {
    let mut result = Vec::new();
    let mut seen = HashSet::new();

    for raw in paths {
        let raw = raw.as_ref();
        let target = canonical(raw)?;

        let files = if target.is_dir() {
            let files = list_unit_files(&target)?;
            if files.is_empty() {
                tracing::warn!("⚠️ no .{} files in directory: {}", UNIT_FILE_EXTENSION, raw);
            }
            files
        } else if target.is_file() {
            match SourceFile::new(target) {
                Some(file) => vec![file],
                None => {
                    return Err(BootstrapError::UnsupportedPath {
                        path: raw.to_string(),
                    })
                }
            }
        } else {
            return Err(BootstrapError::PathNotFound {
                path: raw.to_string(),
            });
        };

        // 以實際檔案比對：`..`、符號連結等別名都視為同一檔案
        for file in files {
            if seen.insert(fs::canonicalize(file.path())?) {
                result.push(file);
            } else {
                tracing::debug!("Skipping duplicate path: {}", file);
            }
        }
    }

    Ok(result)
}

fn list_unit_files(dir: &Path) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(file) = SourceFile::new(path) {
            files.push(file);
        }
    }
    files.sort_by(|a, b| a.path().file_name().cmp(&b.path().file_name()));
    Ok(files)
}

/// Absolute form of `raw` with `..` and symlinks resolved.
fn canonical(raw: &str) -> Result<PathBuf> {
    let path = Path::new(raw);
    if !path.exists() {
        return Err(BootstrapError::PathNotFound {
            path: raw.to_string(),
        });
    }
    Ok(fs::canonicalize(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "").unwrap();
        path
    }

    fn path_str(path: &Path) -> String {
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_directory_expands_sorted_and_non_recursive() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "b_team.toml");
        touch(temp_dir.path(), "a_agent.toml");
        touch(temp_dir.path(), "notes.md");
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        touch(&temp_dir.path().join("nested"), "c_flow.toml");

        let files = resolve(&[path_str(temp_dir.path())]).unwrap();

        let names: Vec<String> = files.iter().map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["a_agent.toml", "b_team.toml"]);
        assert!(files.iter().all(|f| f.path().is_absolute()));
    }

    #[test]
    fn test_empty_directory_contributes_nothing() {
        let empty = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let file = touch(other.path(), "writer.toml");

        let files = resolve(&[path_str(empty.path()), path_str(&file)]).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].stem(), "writer");
    }

    #[test]
    fn test_missing_path_is_fatal_and_named() {
        let temp_dir = TempDir::new().unwrap();
        let good = touch(temp_dir.path(), "good.toml");
        let missing = temp_dir.path().join("missing.toml");

        let err = resolve(&[path_str(&missing), path_str(&good)]).unwrap_err();

        match err {
            BootstrapError::PathNotFound { path } => assert_eq!(path, path_str(&missing)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_unit_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let readme = touch(temp_dir.path(), "README.md");

        let err = resolve(&[path_str(&readme)]).unwrap_err();
        assert!(matches!(err, BootstrapError::UnsupportedPath { .. }));
    }

    #[test]
    fn test_duplicates_keep_first_position() {
        let temp_dir = TempDir::new().unwrap();
        let a = touch(temp_dir.path(), "a.toml");
        touch(temp_dir.path(), "b.toml");

        let files = resolve(&[path_str(&a), path_str(temp_dir.path())]).unwrap();

        let names: Vec<String> = files.iter().map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["a.toml", "b.toml"]);
    }

    #[test]
    fn test_dot_dot_alias_is_same_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("d");
        fs::create_dir(&dir).unwrap();
        touch(&dir, "a.toml");
        let alias = dir.join("..").join("d").join("a.toml");

        let files = resolve(&[path_str(&dir), path_str(&alias)]).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name(), "a.toml");
        assert!(!files[0].path().components().any(|c| c == std::path::Component::ParentDir));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_is_same_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("agents");
        fs::create_dir(&dir).unwrap();
        touch(&dir, "a.toml");
        touch(&dir, "b.toml");
        let link = temp_dir.path().join("linked");
        std::os::unix::fs::symlink(&dir, &link).unwrap();

        let files = resolve(&[path_str(&dir), path_str(&link)]).unwrap();

        let names: Vec<String> = files.iter().map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["a.toml", "b.toml"]);
    }

    #[test]
    fn test_relative_path_resolves_against_cwd() {
        let files = resolve(&["Cargo.toml"]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path().is_absolute());
        assert_eq!(files[0].file_name(), "Cargo.toml");
    }
}
