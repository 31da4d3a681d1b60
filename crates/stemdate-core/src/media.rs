use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::warn;

/// Extensions (lowercase, no dot) the backfill considers.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "heic", "heif", "tiff", "tif", "mp4", "mov", "arw", "cr2", "nef", "orf",
    "raf", "rw2", "srw",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    /// Full path on disk
    pub path: PathBuf,
    /// Just the filename
    pub filename: String,
    /// Filename without extension
    pub stem: String,
}

impl Media {
    pub fn new(path: PathBuf) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            filename,
            stem,
        }
    }
}

fn extension_lower(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

pub fn is_supported(path: &Path) -> bool {
    extension_lower(path).map_or(false, |e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}

pub fn is_jpeg(path: &Path) -> bool {
    matches!(extension_lower(path).as_deref(), Some("jpg" | "jpeg"))
}

/// Collect files accepted by `filter` from the given files and directories.
///
/// Directories are listed one level deep unless `recursive`. Results are
/// sorted by path so reports are stable across runs. The given paths must
/// exist and be readable; anything unreadable below them is skipped with a
/// warning.
pub fn collect_media(
    paths: &[PathBuf],
    recursive: bool,
    filter: fn(&Path) -> bool,
) -> anyhow::Result<Vec<Media>> {
    let mut media = Vec::new();
    for path in paths {
        let meta = fs::metadata(path).with_context(|| format!("cannot access {}", path.display()))?;
        if meta.is_dir() {
            collect_dir(path, recursive, filter, &mut media)
                .with_context(|| format!("cannot list {}", path.display()))?;
        } else if filter(path) {
            media.push(Media::new(path.clone()));
        }
    }
    media.sort_by(|a, b| a.path.cmp(&b.path));
    media.dedup_by(|a, b| a.path == b.path);
    Ok(media)
}

fn collect_dir(
    dir: &Path,
    recursive: bool,
    filter: fn(&Path) -> bool,
    media: &mut Vec<Media>,
) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if file_type.is_dir() {
            if recursive {
                if let Err(e) = collect_dir(&path, recursive, filter, media) {
                    warn!("Skipping directory {}: {}", path.display(), e);
                }
            }
        } else if filter(&path) {
            media.push(Media::new(path));
        }
    }
    Ok(())
}
