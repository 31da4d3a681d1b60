//! Input and output contract of the exiftool metadata writer.
//!
//! Nothing here runs exiftool; these helpers only build the arguments a
//! caller would pass and read back the report it prints.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::date::normalize::NormalizedTimestamp;

/// Tags assigned the backfilled value.
pub const DATE_TAGS: [&str; 3] = ["DateTimeOriginal", "CreateDate", "ModifyDate"];

static UPDATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+(?:(?:image|video|media|file)s?(?:\s+files?)?|files?)\s+updated").unwrap()
});

/// Tag assignments for one file.
pub fn write_args(ts: &NormalizedTimestamp) -> Vec<String> {
    let value = ts.exif_value();
    let mut args: Vec<String> = DATE_TAGS
        .iter()
        .map(|tag| format!("-{}={}", tag, value))
        .collect();
    args.push("-overwrite_original".to_string());
    args
}

/// Files sharing one argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Batch {
    pub args: Vec<String>,
    pub files: Vec<PathBuf>,
}

impl Batch {
    /// Full command line, with the file list passed through an argfile.
    pub fn command_line(&self, exiftool: &str, arg_file: &Path) -> Vec<String> {
        let mut cmd = vec![
            exiftool.to_string(),
            "-S".to_string(),
            "-@".to_string(),
            arg_file.display().to_string(),
        ];
        cmd.extend(self.args.iter().cloned());
        cmd
    }

    /// Contents of the argfile: one path per line.
    pub fn arg_file_contents(&self) -> String {
        self.files
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Group files with identical arguments, in first-seen order.
pub fn group_batches<I>(operations: I) -> Vec<Batch>
where
    I: IntoIterator<Item = (PathBuf, Vec<String>)>,
{
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut batches: Vec<Batch> = Vec::new();

    for (path, args) in operations {
        match index.get(&args) {
            Some(&i) => batches[i].files.push(path),
            None => {
                index.insert(args.clone(), batches.len());
                batches.push(Batch {
                    args,
                    files: vec![path],
                });
            }
        }
    }

    batches
}

/// Number of files exiftool reports as updated.
///
/// Returns `Some(0)` for explicit "unchanged" reports or empty output and
/// `None` when the output carries no recognizable count.
pub fn parse_updated_count(stdout: &str) -> Option<u64> {
    let lower = stdout.to_lowercase();
    if let Some(caps) = UPDATED_RE.captures(&lower) {
        return caps[1].parse().ok();
    }
    if lower.trim().is_empty() || lower.contains("files unchanged") {
        return Some(0);
    }
    None
}
