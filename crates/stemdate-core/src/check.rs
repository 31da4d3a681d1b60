use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use serde::Serialize;

use crate::date::exif::{read_capture_tags, CaptureTags, CAPTURE_TAGS};
use crate::media;
use crate::{ProgressCallback, ThrottledProgress};

#[derive(Debug, Clone, Serialize)]
pub struct TagReport {
    pub path: PathBuf,
    pub filename: String,
    #[serde(flatten)]
    pub tags: CaptureTags,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckSummary {
    pub files: Vec<TagReport>,
    /// `histogram[n]` = files carrying exactly `n` capture tags
    pub histogram: Vec<usize>,
    pub errors: usize,
}

/// Report which capture-date tags each JPEG under `paths` carries.
pub fn check_capture_tags(
    paths: &[PathBuf],
    recursive: bool,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<CheckSummary> {
    let tp = ThrottledProgress::new(progress_callback);
    let media = media::collect_media(paths, recursive, media::is_jpeg)?;
    let total = media.len() as u64;
    let counter = AtomicU64::new(0);

    let files: Vec<TagReport> = media
        .par_iter()
        .map(|m| {
            let result = File::open(&m.path)
                .map_err(|e| e.to_string())
                .and_then(|file| {
                    read_capture_tags(&mut BufReader::new(file)).map_err(|e| e.to_string())
                });
            let current = counter.fetch_add(1, Ordering::Relaxed);
            tp.report("check", current, total, &m.filename);
            let (tags, error) = match result {
                Ok(tags) => (tags, None),
                Err(e) => (CaptureTags::all_missing(), Some(e)),
            };
            TagReport {
                path: m.path.clone(),
                filename: m.filename.clone(),
                tags,
                error,
            }
        })
        .collect();

    let mut histogram = vec![0; CAPTURE_TAGS.len() + 1];
    let mut errors = 0;
    for f in &files {
        if f.error.is_some() {
            errors += 1;
        } else {
            histogram[f.tags.found_count()] += 1;
        }
    }

    Ok(CheckSummary {
        files,
        histogram,
        errors,
    })
}
