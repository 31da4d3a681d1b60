use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::date::normalize::NormalizedTimestamp;

/// Target name for one matched file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePlan {
    pub source: PathBuf,
    pub target_name: String,
}

/// `YYYYMMDD`, the date part of a backfilled file's new name.
pub fn base_name(ts: &NormalizedTimestamp) -> String {
    ts.datetime().format("%Y%m%d").to_string()
}

/// Assign collision-free `YYYYMMDD[_n].ext` names in input order.
///
/// `taken` holds names already present at the destination; nothing is
/// checked on disk.
pub fn plan_renames<'a, I>(items: I, taken: &HashSet<String>) -> Vec<RenamePlan>
where
    I: IntoIterator<Item = (&'a Path, &'a NormalizedTimestamp)>,
{
    // Counters per base name keep repeated dates linear.
    let mut name_counters: HashMap<String, u32> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut plans = Vec::new();

    for (source, ts) in items {
        let base = base_name(ts);
        let ext = source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut name = format!("{}{}", base, ext);
        if used.contains(&name) || taken.contains(&name) {
            let counter = name_counters.entry(format!("{}{}", base, ext)).or_insert(0);
            loop {
                *counter += 1;
                name = format!("{}_{}{}", base, counter, ext);
                if !used.contains(&name) && !taken.contains(&name) {
                    break;
                }
            }
        }

        used.insert(name.clone());
        plans.push(RenamePlan {
            source: source.to_path_buf(),
            target_name: name,
        });
    }

    plans
}
