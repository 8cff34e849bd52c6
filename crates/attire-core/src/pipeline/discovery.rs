//! Finding garment images to classify.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;

/// Discovers image files by extension.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

impl FileDiscovery {
    /// Create a discovery walker for the configured formats.
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// All supported image files at a path, sorted.
    ///
    /// A file path is returned as-is when its extension is supported. A
    /// directory is walked recursively; unreadable entries are skipped.
    pub fn discover(&self, path: &Path) -> Vec<PathBuf> {
        if path.is_file() {
            return if self.is_supported(path) {
                vec![path.to_path_buf()]
            } else {
                tracing::debug!("Skipping unsupported file {:?}", path);
                vec![]
            };
        }

        let mut files: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.is_supported(entry.path()))
            .map(|entry| entry.into_path())
            .collect();

        files.sort();
        files
    }

    /// Case-insensitive extension check against `processing.supported_formats`.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported() {
        let discovery = FileDiscovery::new(ProcessingConfig::default());

        assert!(discovery.is_supported(Path::new("shirt.jpg")));
        assert!(discovery.is_supported(Path::new("shirt.JPG")));
        assert!(discovery.is_supported(Path::new("shirt.webp")));
        assert!(!discovery.is_supported(Path::new("shirt.txt")));
        assert!(!discovery.is_supported(Path::new("shirt")));
    }

    #[test]
    fn test_discover_recursive_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("tops")).unwrap();
        for name in ["b.png", "a.jpg", "notes.txt", "tops/c.png"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let files = FileDiscovery::new(ProcessingConfig::default()).discover(dir.path());
        let names: Vec<PathBuf> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.jpg"),
                PathBuf::from("b.png"),
                PathBuf::from("tops/c.png")
            ]
        );
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dress.png");
        std::fs::write(&path, b"x").unwrap();
        let discovery = FileDiscovery::new(ProcessingConfig::default());
        assert_eq!(discovery.discover(&path), vec![path]);
        assert!(discovery.discover(&dir.path().join("missing.png")).is_empty());
    }
}
