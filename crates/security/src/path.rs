//! Path validation: filesystem sandboxing to the project root.
//!
//! Resolution is purely lexical (no filesystem access), so it is
//! deterministic and idempotent: resolving the same argument against the
//! same root always yields the same absolute path.

use std::path::{Component, Path, PathBuf};

/// A rejected path argument.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathViolation {
    #[error("Path '{path}' contains a parent-traversal segment")]
    Traversal { path: String },

    #[error("Path '{path}' contains illegal characters")]
    IllegalChars { path: String },

    #[error("Path '{path}' resolves outside the project root")]
    Escape { path: String },
}

/// Characters never allowed in a path argument, besides ASCII controls.
const ILLEGAL: &[char] = &['<', '>', '"', '|', '?', '*'];

/// Cheap string-level checks run by the validator before dispatch.
///
/// Rejects parent-traversal segments and control/illegal characters in the
/// raw argument. Does not touch the filesystem.
pub fn check_raw(raw: &str) -> Result<(), PathViolation> {
    if raw.chars().any(|c| c.is_control() || ILLEGAL.contains(&c)) {
        return Err(PathViolation::IllegalChars { path: raw.into() });
    }
    let normalized = raw.replace('\\', "/");
    if normalized == ".." || normalized.split('/').any(|seg| seg == "..") {
        return Err(PathViolation::Traversal { path: raw.into() });
    }
    Ok(())
}

/// Resolve a path argument against the project root.
///
/// Relative paths resolve under `root`. Absolute paths are accepted only if
/// their lexically-normalized form still lies under `root`; anything else
/// fails with [`PathViolation::Escape`].
pub fn resolve_in_root(root: &Path, raw: &str) -> Result<PathBuf, PathViolation> {
    let candidate = Path::new(raw);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };

    let resolved = normalize(&joined, raw)?;
    let root = normalize(root, raw)?;

    if !resolved.starts_with(&root) {
        return Err(PathViolation::Escape { path: raw.into() });
    }
    Ok(resolved)
}

/// Lexically normalize a path: drop `.` segments, fold `..` into its parent.
/// Popping past the start of the path is an escape.
fn normalize(path: &Path, raw: &str) -> Result<PathBuf, PathViolation> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return Err(PathViolation::Escape { path: raw.into() });
                }
            }
            Component::Normal(seg) => out.push(seg),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_resolves_under_root() {
        let resolved = resolve_in_root(Path::new("/proj"), "src/app.py").unwrap();
        assert_eq!(resolved, PathBuf::from("/proj/src/app.py"));
    }

    #[test]
    fn resolution_is_idempotent() {
        let root = Path::new("/proj");
        let first = resolve_in_root(root, "src/./lib/util.py").unwrap();
        let second = resolve_in_root(root, "src/./lib/util.py").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, PathBuf::from("/proj/src/lib/util.py"));
    }

    #[test]
    fn absolute_path_inside_root_accepted() {
        let resolved = resolve_in_root(Path::new("/proj"), "/proj/docs/README.md").unwrap();
        assert_eq!(resolved, PathBuf::from("/proj/docs/README.md"));
    }

    #[test]
    fn absolute_path_outside_root_escapes() {
        let err = resolve_in_root(Path::new("/proj"), "/etc/passwd").unwrap_err();
        assert!(matches!(err, PathViolation::Escape { .. }));
    }

    #[test]
    fn traversal_out_of_root_escapes() {
        let err = resolve_in_root(Path::new("/proj"), "sub/../../etc/passwd").unwrap_err();
        assert!(matches!(err, PathViolation::Escape { .. }));
    }

    #[test]
    fn traversal_that_stays_inside_still_resolves() {
        // resolve_in_root is lexical; the validator's check_raw is what
        // rejects any ".." segment outright
        let resolved = resolve_in_root(Path::new("/proj"), "src/../app.py").unwrap();
        assert_eq!(resolved, PathBuf::from("/proj/app.py"));
    }

    #[test]
    fn check_raw_rejects_parent_segments() {
        assert!(matches!(
            check_raw("../secrets.txt"),
            Err(PathViolation::Traversal { .. })
        ));
        assert!(matches!(
            check_raw("a/../b"),
            Err(PathViolation::Traversal { .. })
        ));
        assert!(matches!(
            check_raw("..\\windows\\style"),
            Err(PathViolation::Traversal { .. })
        ));
        assert!(check_raw("src/app.py").is_ok());
    }

    #[test]
    fn check_raw_rejects_control_and_illegal_chars() {
        assert!(matches!(
            check_raw("file\x00name"),
            Err(PathViolation::IllegalChars { .. })
        ));
        assert!(matches!(
            check_raw("what?.txt"),
            Err(PathViolation::IllegalChars { .. })
        ));
        assert!(check_raw("notes-2026_08.md").is_ok());
    }

    #[test]
    fn dotted_filenames_are_not_traversal() {
        assert!(check_raw("..hidden").is_ok());
        assert!(check_raw("archive..tar").is_ok());
    }
}
