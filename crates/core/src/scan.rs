use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "bmp", "tif", "tiff", "heic", "heif", "gif", "avif", "jfif",
];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("folder does not exist or is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("failed to read folder {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub scanned_files: usize,
    pub image_files: usize,
    pub skipped_non_image: usize,
    pub skipped_non_utf8: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DirListing {
    pub images: Vec<String>,
    // files, folders and links alike
    pub entries: HashSet<String>,
    pub stats: ScanStats,
}

impl DirListing {
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }
}

pub fn scan_directory(dir: &Path) -> Result<DirListing, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let mut listing = DirListing::default();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ScanError::Read {
            path: dir.to_path_buf(),
            source,
        })?;

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
            listing.stats.skipped_non_utf8 += 1;
            continue;
        };

        let is_file = entry.file_type().is_file();
        if is_file {
            listing.stats.scanned_files += 1;
            if is_image(Path::new(&name)) {
                listing.stats.image_files += 1;
                listing.images.push(name.clone());
            } else {
                listing.stats.skipped_non_image += 1;
            }
        }
        listing.entries.insert(name);
    }

    Ok(listing)
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scan_filters_images_case_insensitively() {
        let temp = tempdir().expect("tempdir");
        for name in ["a.JPG", "b.heic", "c.txt", "d.Jfif", "noext"] {
            fs::write(temp.path().join(name), b"x").expect("write file");
        }
        fs::create_dir(temp.path().join("nested.png")).expect("create dir");
        fs::write(temp.path().join("nested.png").join("inner.jpg"), b"x").expect("write inner");

        let listing = scan_directory(temp.path()).expect("scan should succeed");
        assert_eq!(listing.images, vec!["a.JPG", "b.heic", "d.Jfif"]);
        assert!(listing.contains("c.txt"));
        assert!(listing.contains("nested.png"));
        assert!(!listing.contains("inner.jpg"));
        assert_eq!(
            listing.stats,
            ScanStats {
                scanned_files: 5,
                image_files: 3,
                skipped_non_image: 2,
                skipped_non_utf8: 0,
            }
        );
    }

    #[test]
    fn scan_rejects_missing_folder() {
        let temp = tempdir().expect("tempdir");
        let err = scan_directory(&temp.path().join("missing")).expect_err("must fail");
        assert!(matches!(err, ScanError::NotADirectory(_)));
    }
}
