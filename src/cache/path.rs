//! Cache path identity
//!
//! Two spellings of one directory (`apps/viewer/../extscache`, a symlink to
//! it, a relative path) must compare equal wherever cache paths are matched.

use std::path::{Component, Path, PathBuf};

/// Resolve `path` to a stable identity for comparison.
///
/// The longest existing prefix is canonicalized (symlinks resolved); any
/// missing tail is appended with `.` and `..` folded lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let lexical = fold_dots(&absolute);

    let mut existing = lexical.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(mut resolved) = std::fs::canonicalize(existing) {
            resolved.extend(missing.iter().rev());
            return resolved;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return lexical,
        }
    }
}

fn fold_dots(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            // `..` at the root stays at the root
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parent_segments_fold_away() {
        let temp = TempDir::new().unwrap();
        let direct = temp.path().join("extscache");
        let detour = temp.path().join("viewer").join("..").join("extscache");

        assert_eq!(normalize_path(&detour), normalize_path(&direct));
    }

    #[test]
    fn current_dir_segments_fold_away() {
        let temp = TempDir::new().unwrap();
        let dotted = temp.path().join(".").join("apps").join(".").join("cache");

        assert_eq!(
            normalize_path(&dotted),
            normalize_path(&temp.path().join("apps/cache"))
        );
    }

    #[test]
    fn existing_and_missing_spellings_agree() {
        let temp = TempDir::new().unwrap();
        let cache = temp.path().join("extscache");
        let before = normalize_path(&cache);

        std::fs::create_dir(&cache).unwrap();
        assert_eq!(normalize_path(&cache), before);
        assert_eq!(normalize_path(&temp.path().join("x/../extscache")), before);
    }

    #[test]
    fn distinct_directories_stay_distinct() {
        let temp = TempDir::new().unwrap();
        assert_ne!(
            normalize_path(&temp.path().join("apps/viewer/extscache")),
            normalize_path(&temp.path().join("extscache"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_resolve_to_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("extscache");
        std::fs::create_dir(&target).unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_eq!(normalize_path(&link), normalize_path(&target));
        assert_eq!(
            normalize_path(&link.join("omni.ui")),
            normalize_path(&target.join("omni.ui"))
        );
    }
}
