//! One-time migration of translation tables.
//!
//! Tables collected from several sources can repeat a key. The first
//! occurrence wins; later ones are dropped and reported so the operator can
//! check nothing meaningful was lost.

use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupReport {
    pub entries: Vec<TranslationEntry>,
    /// Dropped duplicates, in input order.
    pub dropped: Vec<TranslationEntry>,
}

impl DedupReport {
    /// Dropped entries whose value differs from the one that was kept.
    pub fn conflicts(&self) -> Vec<&TranslationEntry> {
        self.dropped
            .iter()
            .filter(|dropped| {
                self.entries
                    .iter()
                    .any(|kept| kept.key == dropped.key && kept.value != dropped.value)
            })
            .collect()
    }
}

pub fn dedupe_first_wins(entries: impl IntoIterator<Item = TranslationEntry>) -> DedupReport {
    let mut report = DedupReport::default();
    let mut seen = std::collections::HashSet::new();

    for entry in entries {
        if seen.insert(entry.key.clone()) {
            report.entries.push(entry);
        } else {
            report.dropped.push(entry);
        }
    }

    let conflicts = report.conflicts().len();
    if conflicts > 0 {
        warn!("{} duplicate translation keys had differing values", conflicts);
    }
    info!(
        "Translation table: {} kept, {} duplicates dropped",
        report.entries.len(),
        report.dropped.len()
    );
    report
}
