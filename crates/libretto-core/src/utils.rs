//! Utility functions shared across modules.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Build the CSV file name for a library title.
///
/// Characters that are invalid in file names (`/`, `\`, `:`, `*`, `?`, `"`,
/// `<`, `>`, `|`) become underscores and spaces become hyphens.
///
/// # Examples
///
/// ```
/// use libretto_core::utils::export_file_name;
///
/// assert_eq!(export_file_name("Movies"), "Movies.csv");
/// assert_eq!(export_file_name("TV Shows"), "TV-Shows.csv");
/// assert_eq!(export_file_name("Kids: 4K"), "Kids_-4K.csv");
/// ```
pub fn export_file_name(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ' ' => '-',
            _ => c,
        })
        .collect();

    if stem.is_empty() {
        "library.csv".to_string()
    } else {
        format!("{}.csv", stem)
    }
}

/// Resolve a path against the current directory without touching the filesystem.
///
/// `.` components are dropped and `..` removes the preceding component.
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    Ok(resolved)
}

/// One spelling per output file: the parent directory is canonicalized when it
/// exists (resolving symlinks), otherwise the lexical [`absolute_path`] is used.
pub fn canonical_target(path: &Path) -> io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    if let (Some(parent), Some(name)) = (joined.parent(), joined.file_name()) {
        match fs::canonicalize(parent) {
            Ok(parent) => return Ok(parent.join(name)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    absolute_path(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_file_name() {
        // Basic cases
        assert_eq!(export_file_name("Movies"), "Movies.csv");
        assert_eq!(export_file_name("TV Shows"), "TV-Shows.csv");
        assert_eq!(export_file_name("  Music  "), "Music.csv");

        // Path separators
        assert_eq!(export_file_name("Films/4K"), "Films_4K.csv");
        assert_eq!(export_file_name("a\\b"), "a_b.csv");

        // Special characters
        assert_eq!(export_file_name("What?*"), "What__.csv");
        assert_eq!(export_file_name("\"Docs\""), "_Docs_.csv");

        // Nothing left
        assert_eq!(export_file_name("   "), "library.csv");
    }

    #[test]
    fn test_absolute_path() {
        let abs = absolute_path(Path::new("exports/Movies.csv")).unwrap();
        assert!(abs.is_absolute());
        assert!(abs.ends_with("exports/Movies.csv"));

        let already = std::env::temp_dir().join("x.csv");
        assert_eq!(absolute_path(&already).unwrap(), already);
    }

    #[test]
    fn test_absolute_path_drops_dot_components() {
        let base = std::env::temp_dir();
        assert_eq!(
            absolute_path(&base.join(".").join("Movies.csv")).unwrap(),
            absolute_path(&base.join("Movies.csv")).unwrap()
        );
        assert_eq!(
            absolute_path(&base.join("sub").join("..").join("Movies.csv")).unwrap(),
            absolute_path(&base.join("Movies.csv")).unwrap()
        );
    }

    #[test]
    fn test_canonical_target_aliases() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let plain = canonical_target(&dir.path().join("Movies.csv")).unwrap();

        assert_eq!(canonical_target(&dir.path().join(".").join("Movies.csv")).unwrap(), plain);
        assert_eq!(
            canonical_target(&dir.path().join("sub").join("..").join("Movies.csv")).unwrap(),
            plain
        );
        // Missing parents fall back to the lexical form
        let missing = dir.path().join("nope").join(".").join("Movies.csv");
        assert!(canonical_target(&missing).unwrap().ends_with("nope/Movies.csv"));
    }
}
