//! Data directory discovery

use std::path::{Path, PathBuf};

/// File whose presence marks a directory as holding the corpus.
const CORPUS_MARKER: &str = "uthmani.txt";

fn has_corpus(dir: &Path) -> bool {
    dir.join(CORPUS_MARKER).exists()
}

/// Get the directory holding the corpus text files.
///
/// Debug builds look in the usual development locations first. Release builds
/// use Application Support on macOS and a portable `data` folder next to the
/// executable elsewhere.
pub fn get_data_dir() -> PathBuf {
    #[cfg(debug_assertions)]
    {
        let dev_paths = [
            PathBuf::from("data"),
            PathBuf::from("../data"),    // api/ -> workspace root
            PathBuf::from("../../data"), // target/debug -> workspace root
        ];
        for path in &dev_paths {
            if has_corpus(path) {
                return path.canonicalize().unwrap_or_else(|_| path.clone());
            }
        }

        // Walk up from target/debug to find the workspace root
        if let Ok(exe_path) = std::env::current_exe() {
            let mut current = exe_path.parent();
            for _ in 0..5 {
                let Some(dir) = current else { break };
                let data_path = dir.join("data");
                if has_corpus(&data_path) {
                    return data_path;
                }
                current = dir.parent();
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(data_dir) = dirs::data_dir() {
            return data_dir.join("QuranSearch");
        }
    }

    #[cfg(not(target_os = "macos"))]
    {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let data_path = exe_dir.join("data");
                if has_corpus(&data_path) {
                    return data_path;
                }
            }
        }
    }

    PathBuf::from("data")
}

/// Settings database, stored alongside the corpus files.
pub fn get_settings_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_db_lives_in_data_dir() {
        let dir = PathBuf::from("/srv/quran");
        assert_eq!(get_settings_db_path(&dir), dir.join("settings.db"));
    }

    #[test]
    fn test_marker_detection() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!has_corpus(dir.path()));
        std::fs::write(dir.path().join(CORPUS_MARKER), "").unwrap();
        assert!(has_corpus(dir.path()));
    }
}
