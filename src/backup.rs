// 📦 Backup - human-readable JSON export/import
//
// {
//   "subscriptions": [ {id, name, amount, date, frequency}, ... ],
//   "selectedTheme": "system" | "light" | "dark"
// }
//
// Import never deletes: records are matched by id, overwritten in place when
// known and appended when new.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BackupError;
use crate::settings::{Settings, Theme};
use crate::subscription::Subscription;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub subscriptions: Vec<Subscription>,

    /// Absent in hand-written backups; the current theme is then kept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_theme: Option<Theme>,
}

impl BackupDocument {
    pub fn new(subscriptions: Vec<Subscription>, settings: &Settings) -> Self {
        BackupDocument {
            subscriptions,
            selected_theme: Some(settings.selected_theme),
        }
    }

    pub fn empty() -> Self {
        BackupDocument {
            subscriptions: Vec::new(),
            selected_theme: None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to encode backup")
    }

    pub fn from_json(raw: &str) -> Result<Self, BackupError> {
        serde_json::from_str(raw).map_err(|e| BackupError::Decode {
            message: e.to_string(),
        })
    }

    /// Decode leniently: undecodable content is an empty backup
    pub fn from_json_or_empty(raw: &str) -> Self {
        match Self::from_json(raw) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring undecodable backup");
                Self::empty()
            }
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write backup to {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            count = self.subscriptions.len(),
            "exported backup"
        );
        Ok(())
    }

    /// Read a backup file. I/O errors are reported; undecodable content is not.
    pub fn read_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read backup from {}", path.display()))?;
        Ok(Self::from_json_or_empty(&raw))
    }
}

/// Default export file name, e.g. `subtracker-backup-2025-01-15.json`
pub fn default_backup_file_name(today: NaiveDate) -> PathBuf {
    PathBuf::from(format!("subtracker-backup-{}.json", today.format("%Y-%m-%d")))
}

// ============================================================================
// MERGE
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Existing records overwritten by imported values
    pub updated: usize,
    /// Imported records appended because their id was new
    pub added: usize,
}

/// Merge `imported` into `existing` by id.
///
/// Overwritten records keep their position, new ones are appended in import
/// order. If the import repeats an id, the later entry wins.
pub fn merge_by_id(
    existing: &[Subscription],
    imported: &[Subscription],
) -> (Vec<Subscription>, MergeReport) {
    let mut merged = existing.to_vec();
    let mut positions: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, sub)| (sub.id.clone(), i))
        .collect();
    let existing_count = merged.len();
    let mut report = MergeReport::default();
    let mut touched = vec![false; existing_count];

    for incoming in imported {
        match positions.get(&incoming.id) {
            Some(&i) => {
                if i < existing_count && !touched[i] {
                    touched[i] = true;
                    report.updated += 1;
                }
                merged[i] = incoming.clone();
            }
            None => {
                positions.insert(incoming.id.clone(), merged.len());
                merged.push(incoming.clone());
                report.added += 1;
            }
        }
    }

    (merged, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::Frequency;
    use tempfile::tempdir;

    fn sub(id: &str, amount: f64) -> Subscription {
        Subscription::with_id(
            id.to_string(),
            format!("Sub {}", id),
            amount,
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            Frequency::Monthly,
        )
    }

    fn amounts(subs: &[Subscription]) -> Vec<(String, f64)> {
        subs.iter().map(|s| (s.id.clone(), s.amount)).collect()
    }

    #[test]
    fn test_merge_overwrites_existing_and_appends_new() {
        let existing = vec![sub("1", 10.0)];
        let imported = vec![sub("1", 20.0), sub("2", 5.0)];

        let (merged, report) = merge_by_id(&existing, &imported);

        assert_eq!(
            amounts(&merged),
            vec![("1".to_string(), 20.0), ("2".to_string(), 5.0)]
        );
        assert_eq!(report, MergeReport { updated: 1, added: 1 });
    }

    #[test]
    fn test_merge_preserves_existing_positions_and_never_deletes() {
        let existing = vec![sub("a", 1.0), sub("b", 2.0), sub("c", 3.0)];
        let imported = vec![sub("d", 4.0), sub("b", 22.0)];

        let (merged, report) = merge_by_id(&existing, &imported);

        assert_eq!(
            amounts(&merged),
            vec![
                ("a".to_string(), 1.0),
                ("b".to_string(), 22.0),
                ("c".to_string(), 3.0),
                ("d".to_string(), 4.0),
            ]
        );
        assert_eq!(report, MergeReport { updated: 1, added: 1 });
    }

    #[test]
    fn test_merge_duplicate_import_ids_later_wins() {
        let imported = [sub("2", 5.0), sub("2", 6.0), sub("1", 7.0), sub("1", 8.0)];
        let (merged, report) = merge_by_id(&[sub("1", 1.0)], &imported);

        assert_eq!(
            amounts(&merged),
            vec![("1".to_string(), 8.0), ("2".to_string(), 6.0)]
        );
        assert_eq!(report, MergeReport { updated: 1, added: 1 });
    }

    #[test]
    fn test_merge_empty_import_is_identity() {
        let existing = vec![sub("1", 10.0)];
        let (merged, report) = merge_by_id(&existing, &[]);
        assert_eq!(merged, existing);
        assert_eq!(report, MergeReport::default());
    }

    #[test]
    fn test_document_json_shape() {
        let doc = BackupDocument::new(vec![sub("1", 9.5)], &Settings::with_theme(Theme::Dark));
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();

        assert_eq!(value["selectedTheme"], "dark");
        assert_eq!(value["subscriptions"][0]["id"], "1");
        assert_eq!(value["subscriptions"][0]["amount"], 9.5);
        assert_eq!(value["subscriptions"][0]["date"], "2025-01-15");
        assert_eq!(value["subscriptions"][0]["frequency"], "Monthly");
    }

    #[test]
    fn test_theme_is_optional_on_import() {
        let doc = BackupDocument::from_json(r#"{"subscriptions": []}"#).unwrap();
        assert_eq!(doc.selected_theme, None);
    }

    #[test]
    fn test_undecodable_backup_is_empty() {
        assert!(BackupDocument::from_json("not json at all").is_err());
        assert_eq!(BackupDocument::from_json_or_empty("not json"), BackupDocument::empty());
        assert_eq!(
            BackupDocument::from_json_or_empty(r#"{"subscriptions": 3}"#),
            BackupDocument::empty()
        );
    }

    #[test]
    fn test_negative_amount_import_changes_nothing() {
        let existing = vec![sub("1", 10.0)];
        let raw = r#"{"subscriptions": [
            {"id": "1", "name": "One", "amount": -5, "date": "2025-01-15", "frequency": "Monthly"},
            {"id": "2", "name": "Two", "amount": 3, "date": "2025-01-15", "frequency": "Monthly"}
        ]}"#;

        assert!(BackupDocument::from_json(raw).is_err());
        let document = BackupDocument::from_json_or_empty(raw);
        let (merged, report) = merge_by_id(&existing, &document.subscriptions);

        assert_eq!(merged, existing);
        assert_eq!(report, MergeReport::default());
        assert_eq!(crate::aggregator::monthly_total(&merged), 10.0);
    }

    #[test]
    fn test_write_and_read_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let doc = BackupDocument::new(vec![sub("1", 3.0), sub("2", 4.0)], &Settings::default());

        doc.write_to(&path).unwrap();
        assert_eq!(BackupDocument::read_from(&path).unwrap(), doc);
    }

    #[test]
    fn test_read_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(BackupDocument::read_from(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_default_file_name() {
        let name = default_backup_file_name(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
        assert_eq!(name, PathBuf::from("subtracker-backup-2025-03-07.json"));
    }
}
