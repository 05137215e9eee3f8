//! Project-relative path handling.
//!
//! Install paths are stored relative to the project root so a deployment
//! can be moved without rewriting rows. They are resolved to absolute
//! paths only at the point of use.

use std::path::{Component, Path, PathBuf};

/// Converts between stored project-relative paths and absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    /// Creates a resolver anchored at `root`.
    ///
    /// A relative root is anchored at the current working directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = if root.as_os_str().is_empty() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(root)
        };
        Self {
            root: normalize(&root),
        }
    }

    /// Returns the absolute project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins path parts onto the project root.
    pub fn project_path<I, P>(&self, parts: I) -> PathBuf
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut path = self.root.clone();
        for part in parts {
            path.push(part);
        }
        path
    }

    /// Converts a path into its project-relative, forward-slash form.
    ///
    /// Relative inputs are taken as already relative to the root and only
    /// normalized. Paths outside the root climb with `..` segments.
    pub fn to_relative(&self, path: impl AsRef<Path>) -> String {
        let path = path.as_ref();
        if !path.is_absolute() {
            return to_slash(&normalize(path));
        }

        let target = normalize(path);
        let base: Vec<Component<'_>> = self.root.components().collect();
        let target_parts: Vec<Component<'_>> = target.components().collect();

        let common = base
            .iter()
            .zip(target_parts.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut relative = PathBuf::new();
        for _ in common..base.len() {
            relative.push("..");
        }
        for part in &target_parts[common..] {
            relative.push(part.as_os_str());
        }

        if relative.as_os_str().is_empty() {
            ".".to_string()
        } else {
            to_slash(&relative)
        }
    }

    /// Resolves a stored path into an absolute one.
    ///
    /// Absolute values (legacy rows) are normalized and returned as-is.
    pub fn to_absolute(&self, stored: &str) -> PathBuf {
        let path = Path::new(stored);
        if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&self.root.join(path))
        }
    }
}

/// Lexically normalizes a path, dropping `.` and folding `..`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_under_root() {
        let paths = ProjectPaths::new("/srv/noteblog");
        assert_eq!(
            paths.to_relative("/srv/noteblog/plugins/friend_links"),
            "plugins/friend_links"
        );
        assert_eq!(paths.to_relative("/srv/noteblog"), ".");
    }

    #[test]
    fn test_relative_outside_root() {
        let paths = ProjectPaths::new("/srv/noteblog");
        assert_eq!(paths.to_relative("/opt/themes/aurora"), "../../opt/themes/aurora");
    }

    #[test]
    fn test_relative_input_is_normalized() {
        let paths = ProjectPaths::new("/srv/noteblog");
        assert_eq!(paths.to_relative("themes/./aurora/../serenity"), "themes/serenity");
    }

    #[test]
    fn test_absolute_resolution() {
        let paths = ProjectPaths::new("/srv/noteblog");
        assert_eq!(
            paths.to_absolute("plugins/ai_summary"),
            PathBuf::from("/srv/noteblog/plugins/ai_summary")
        );
        assert_eq!(
            paths.to_absolute("/legacy/abs/path"),
            PathBuf::from("/legacy/abs/path")
        );
    }

    #[test]
    fn test_round_trip() {
        let paths = ProjectPaths::new("/srv/noteblog");
        let abs = paths.project_path(["themes", "hoshizora"]);
        let rel = paths.to_relative(&abs);
        assert_eq!(rel, "themes/hoshizora");
        assert_eq!(paths.to_absolute(&rel), abs);
    }
}
