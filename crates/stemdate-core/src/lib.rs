pub mod check;
pub mod date;
pub mod error;
pub mod exiftool;
pub mod media;
pub mod rename;
pub mod templates;

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::{NaiveDateTime, NaiveTime};
use log::{error, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub use date::catalog::{Catalog, CatalogBuild, Template};
pub use date::guess::{DateGuesser, DEFAULT_TIME_OF_DAY};
pub use date::normalize::NormalizedTimestamp;
pub use error::{CatalogError, CompileError};

use date::DateResult;
use media::Media;

fn default_time() -> String {
    DEFAULT_TIME_OF_DAY.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Files and directories to scan
    pub paths: Vec<PathBuf>,
    /// Candidate template files; the first existing one wins. Empty = embedded list.
    #[serde(default)]
    pub templates: Vec<PathBuf>,
    /// Time of day (HH:MM:SS) for templates that carry only a date
    #[serde(default = "default_time")]
    pub default_time: String,
    /// Report files that already carry an EXIF capture date instead of guessing
    #[serde(default)]
    pub skip_dated: bool,
    #[serde(default)]
    pub recursive: bool,
    /// Fail instead of continuing when no date pattern is available
    #[serde(default)]
    pub strict: bool,
}

impl ScanOptions {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            templates: Vec::new(),
            default_time: default_time(),
            skip_dated: false,
            recursive: false,
            strict: false,
        }
    }
}

/// Outcome for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Matched { timestamp: NormalizedTimestamp },
    AlreadyDated { date: NaiveDateTime },
    NoMatch,
    Unreadable { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub filename: String,
    #[serde(flatten)]
    pub status: FileStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub files: Vec<FileReport>,
    /// False when the catalog was empty and nothing could have matched
    pub patterns_available: bool,
}

impl ScanResult {
    /// Matched files with their timestamps, in scan order.
    pub fn matched(&self) -> impl Iterator<Item = (&FileReport, &NormalizedTimestamp)> {
        self.files.iter().filter_map(|f| match &f.status {
            FileStatus::Matched { timestamp } => Some((f, timestamp)),
            _ => None,
        })
    }

    pub fn count(&self, pred: fn(&FileStatus) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.status)).count()
    }
}

/// What a metadata writer and a renamer would need to apply a scan.
#[derive(Debug, Clone, Serialize)]
pub struct BackfillPlan {
    pub batches: Vec<exiftool::Batch>,
    pub renames: Vec<rename::RenamePlan>,
}

/// Type alias for progress callback; may borrow from the caller's frame.
pub type ProgressCallback<'a> = dyn Fn(&str, u64, u64, &str) + Send + Sync + 'a;

/// Throttled progress reporter - emits at most every 200ms or on completion.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback<'a>,
    last_emit: Mutex<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback<'a>) -> Self {
        Self {
            inner,
            last_emit: Mutex::new(Instant::now() - Duration::from_secs(1)),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            let Ok(mut last) = self.last_emit.lock() else {
                return;
            };
            if last.elapsed().as_millis() < 200 {
                return;
            }
            *last = Instant::now();
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Parse an `HH:MM:SS` time of day.
pub fn parse_time_of_day(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .with_context(|| format!("invalid default time '{}', expected HH:MM:SS", s))
}

/// Build the guesser described by `options`.
///
/// A missing or fully rejected template source leaves an empty catalog and
/// is logged as an error, unless `strict` turns it into a failure.
pub fn load_guesser(options: &ScanOptions) -> anyhow::Result<DateGuesser> {
    let default_time = parse_time_of_day(&options.default_time)?;
    let catalog = match templates::load_catalog(&options.templates) {
        Ok(catalog) => catalog,
        Err(CatalogError::Empty) if !options.strict => {
            error!("No date patterns loaded. Filenames cannot be matched.");
            Catalog::default()
        }
        Err(e) => return Err(e.into()),
    };
    Ok(DateGuesser::new(catalog).with_default_time(default_time))
}

/// Run the scan described by `options` with progress reporting.
pub fn scan(options: &ScanOptions, progress_callback: &ProgressCallback<'_>) -> anyhow::Result<ScanResult> {
    let guesser = load_guesser(options)?;
    scan_with(options, &guesser, progress_callback)
}

/// Scan with a prepared guesser. Files are processed in parallel; the
/// report keeps the sorted discovery order.
pub fn scan_with(
    options: &ScanOptions,
    guesser: &DateGuesser,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<ScanResult> {
    let tp = ThrottledProgress::new(progress_callback);
    let media = media::collect_media(&options.paths, options.recursive, media::is_supported)?;
    let total = media.len() as u64;
    info!("Found {} supported media files", total);

    let counter = AtomicU64::new(0);
    let files: Vec<FileReport> = media
        .par_iter()
        .map(|m| {
            let status = classify(m, guesser, options.skip_dated);
            let current = counter.fetch_add(1, Ordering::Relaxed);
            tp.report("scan", current, total, &m.filename);
            FileReport {
                path: m.path.clone(),
                filename: m.filename.clone(),
                status,
            }
        })
        .collect();

    Ok(ScanResult {
        files,
        patterns_available: !guesser.catalog().is_empty(),
    })
}

fn classify(m: &Media, guesser: &DateGuesser, skip_dated: bool) -> FileStatus {
    // Only the container header is read, whatever the file size.
    let mut reader = if skip_dated {
        match File::open(&m.path) {
            Ok(file) => Some(BufReader::new(file)),
            Err(e) => return FileStatus::Unreadable { error: e.to_string() },
        }
    } else {
        None
    };

    match date::extract_date(reader.as_mut(), &m.stem, guesser) {
        Some(DateResult::Exif(date)) => FileStatus::AlreadyDated { date },
        Some(DateResult::Filename(timestamp)) => FileStatus::Matched { timestamp },
        None => FileStatus::NoMatch,
    }
}

/// Derive exiftool batches and rename targets for every matched file.
///
/// `taken` lists names already present at the rename destination.
pub fn plan(result: &ScanResult, taken: &HashSet<String>) -> BackfillPlan {
    let batches = exiftool::group_batches(
        result
            .matched()
            .map(|(f, ts)| (f.path.clone(), exiftool::write_args(ts))),
    );
    let renames = rename::plan_renames(result.matched().map(|(f, ts)| (f.path.as_path(), ts)), taken);
    BackfillPlan { batches, renames }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::exif::jpeg_with_modify_date;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    fn quiet(_: &str, _: u64, _: u64, _: &str) {}

    #[test]
    fn test_throttled_progress_always_emits_last() {
        let calls = Mutex::new(Vec::new());
        let cb = |_: &str, current: u64, _: u64, _: &str| calls.lock().unwrap().push(current);
        let tp = ThrottledProgress::new(&cb);
        tp.report("scan", 0, 3, "a");
        tp.report("scan", 1, 3, "b");
        tp.report("scan", 2, 3, "c");
        let calls = calls.into_inner().unwrap();
        assert_eq!(calls.first(), Some(&0));
        assert_eq!(calls.last(), Some(&2));
        assert!(!calls.contains(&1));
    }

    #[test]
    fn test_scan_classifies_files() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("IMG_20230714_153045.jpg"), b"not really a jpeg").unwrap();
        fs::write(root.join("IMG_9981.jpg"), b"").unwrap();
        fs::write(root.join("photo_2024-02-30.png"), b"").unwrap();
        fs::write(root.join("VID_20230714_101010.mp4"), b"").unwrap();
        fs::write(root.join("2023-07-14.txt"), b"").unwrap();

        let mut options = ScanOptions::new(vec![root.to_path_buf()]);
        options.skip_dated = true;
        let result = scan(&options, &quiet).unwrap();

        assert!(result.patterns_available);
        let names: Vec<&str> = result.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "IMG_20230714_153045.jpg",
                "IMG_9981.jpg",
                "VID_20230714_101010.mp4",
                "photo_2024-02-30.png"
            ]
        );
        assert_eq!(result.count(|s| matches!(s, FileStatus::Matched { .. })), 2);
        assert_eq!(result.count(|s| matches!(s, FileStatus::NoMatch)), 2);

        let matched: Vec<String> = result.matched().map(|(_, ts)| ts.exif_value()).collect();
        assert_eq!(matched, vec!["2023:07:14 15:30:45", "2023:07:14 10:10:10"]);
    }

    #[test]
    fn test_scan_without_patterns() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("IMG_20230714_153045.jpg"), b"").unwrap();

        let mut options = ScanOptions::new(vec![dir.path().to_path_buf()]);
        options.templates = vec![dir.path().join("missing.json")];
        let result = scan(&options, &quiet).unwrap();
        assert!(!result.patterns_available);
        assert!(matches!(result.files[0].status, FileStatus::NoMatch));

        options.strict = true;
        assert!(scan(&options, &quiet).is_err());
    }

    #[test]
    fn test_skip_dated_reports_existing_exif() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let jpeg = jpeg_with_modify_date("2020:01:02 03:04:05");
        fs::write(root.join("a_20230714.jpg"), &jpeg).unwrap();

        // Same image padded well past any whole-file read limit
        let mut big = File::create(root.join("b_20230714.jpg")).unwrap();
        big.write_all(&jpeg).unwrap();
        big.set_len(33 * 1024 * 1024).unwrap();
        drop(big);

        let mut options = ScanOptions::new(vec![root.to_path_buf()]);
        options.skip_dated = true;
        let result = scan(&options, &quiet).unwrap();
        let expected = chrono::NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        for f in &result.files {
            assert_eq!(f.status, FileStatus::AlreadyDated { date: expected }, "{}", f.filename);
        }
        assert_eq!(result.files.len(), 2);
        assert_eq!(plan(&result, &HashSet::new()).batches.len(), 0);

        // Without skip_dated the filename decides
        options.skip_dated = false;
        let result = scan(&options, &quiet).unwrap();
        assert_eq!(result.matched().count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_unopenable_file_is_unreadable() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("ok_20230714.jpg"), b"").unwrap();
        std::os::unix::fs::symlink(root.join("gone.jpg"), root.join("link_20230714.jpg")).unwrap();

        let mut options = ScanOptions::new(vec![root.to_path_buf()]);
        options.skip_dated = true;
        let result = scan(&options, &quiet).unwrap();

        assert_eq!(result.files.len(), 2);
        assert_eq!(result.files[0].filename, "link_20230714.jpg");
        assert!(matches!(result.files[0].status, FileStatus::Unreadable { .. }));
        assert!(matches!(result.files[1].status, FileStatus::Matched { .. }));
    }

    #[test]
    fn test_invalid_default_time() {
        let mut options = ScanOptions::new(vec![]);
        options.default_time = "25:00".to_string();
        assert!(load_guesser(&options).is_err());
        options.default_time = "07:30:00".to_string();
        let guesser = load_guesser(&options).unwrap();
        assert_eq!(guesser.default_time(), NaiveTime::from_hms_opt(7, 30, 0).unwrap());
    }

    #[test]
    fn test_plan() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a_20230714.jpg"), b"").unwrap();
        fs::write(root.join("b_20230714.jpg"), b"").unwrap();
        fs::write(root.join("c_20230715.jpg"), b"").unwrap();

        let result = scan(&ScanOptions::new(vec![root.to_path_buf()]), &quiet).unwrap();
        let plan = plan(&result, &HashSet::new());

        assert_eq!(plan.batches.len(), 2);
        assert_eq!(plan.batches[0].files.len(), 2);
        let names: Vec<&str> = plan.renames.iter().map(|r| r.target_name.as_str()).collect();
        assert_eq!(names, vec!["20230714.jpg", "20230714_1.jpg", "20230715.jpg"]);
    }

    #[test]
    fn test_options_defaults_from_json() {
        let options: ScanOptions = serde_json::from_str(r#"{"paths": ["/photos"]}"#).unwrap();
        assert_eq!(options.default_time, "20:00:00");
        assert!(options.templates.is_empty());
        assert!(!options.skip_dated && !options.recursive && !options.strict);
    }
}
