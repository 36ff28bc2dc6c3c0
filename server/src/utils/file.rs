//! File utility functions

use std::path::PathBuf;

/// Expand a path string to an absolute path.
///
/// Handles `~` / `~/path` (home directory) and relative paths, which are
/// resolved against the current working directory. Absolute paths pass
/// through unchanged.
///
/// ```text
/// expand_path("~/.factlens/factlens.json") // -> /home/user/.factlens/factlens.json
/// expand_path("./factlens.json")           // -> /current/dir/./factlens.json
/// expand_path("/etc/factlens.json")        // -> /etc/factlens.json
/// ```
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let expanded = if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(path))
    } else if let Some(rest) = path.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        }
    } else {
        PathBuf::from(path)
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_expand_path_absolute_unix() {
        assert_eq!(
            expand_path("/etc/factlens.json"),
            PathBuf::from("/etc/factlens.json")
        );
    }

    #[test]
    fn test_expand_path_bare_name() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path("factlens.json"), cwd.join("factlens.json"));
    }

    #[test]
    fn test_expand_path_empty_is_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path("   "), cwd);
    }

    #[test]
    fn test_expand_path_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~"), home);
            assert_eq!(
                expand_path("~/.factlens/factlens.json"),
                home.join(".factlens/factlens.json")
            );
        }
    }
}
