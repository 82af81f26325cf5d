// Per-minute fee rates, loaded once at startup

use crate::record::VisitKind;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_CONSULTATION_RATE: i64 = 500;
pub const DEFAULT_FOLLOW_UP_RATE: i64 = 300;
pub const DEFAULT_EMERGENCY_RATE: i64 = 1000;

/// Largest per-minute rate a rate file may set
pub const MAX_RATE: i64 = 1_000_000;

/// Rate per minute for each visit kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    pub consultation: i64,
    pub follow_up: i64,
    pub emergency: i64,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            consultation: DEFAULT_CONSULTATION_RATE,
            follow_up: DEFAULT_FOLLOW_UP_RATE,
            emergency: DEFAULT_EMERGENCY_RATE,
        }
    }
}

impl RateTable {
    pub fn rate(&self, kind: VisitKind) -> i64 {
        match kind {
            VisitKind::Consultation => self.consultation,
            VisitKind::FollowUp => self.follow_up,
            VisitKind::Emergency => self.emergency,
        }
    }

    /// Default location: `<config dir>/visitstore/rates.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("visitstore").join("rates.json"))
    }

    /// Load a rate table from a JSON or YAML file (chosen by extension)
    ///
    /// The file is a flat map from kind name to rate, e.g.
    /// `{"Consultation": 500, "Follow-up": 300, "Emergency": 1000}`.
    /// A missing file yields the defaults; kinds missing from the file keep
    /// their default rate.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(file = ?path, "Rate file not found, using default rates");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read rate file")?;

        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        );
        let entries: BTreeMap<String, i64> = if is_yaml {
            serde_yaml::from_str(&content).context("Failed to parse YAML rate file")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON rate file")?
        };

        let table = Self::from_entries(&entries)?;
        info!(file = ?path, ?table, "Loaded rate table");
        Ok(table)
    }

    fn from_entries(entries: &BTreeMap<String, i64>) -> Result<Self> {
        let mut table = Self::default();

        for (name, &rate) in entries {
            if rate < 0 {
                return Err(eyre!("Negative rate for {}: {}", name, rate));
            }
            if rate > MAX_RATE {
                return Err(eyre!("Rate for {} above {}: {}", name, MAX_RATE, rate));
            }

            // "Follow-up" is the spelling used by older rate files
            let kind = match name.as_str() {
                "Follow-up" => VisitKind::FollowUp,
                other => match other.parse::<VisitKind>() {
                    Ok(kind) => kind,
                    Err(_) => {
                        warn!(key = name, "Unknown visit kind in rate file, ignoring");
                        continue;
                    }
                },
            };

            debug!(%kind, rate, "Rate override");
            match kind {
                VisitKind::Consultation => table.consultation = rate,
                VisitKind::FollowUp => table.follow_up = rate,
                VisitKind::Emergency => table.emergency = rate,
            }
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_rates() {
        let table = RateTable::default();
        assert_eq!(table.rate(VisitKind::Consultation), 500);
        assert_eq!(table.rate(VisitKind::FollowUp), 300);
        assert_eq!(table.rate(VisitKind::Emergency), 1000);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let table = RateTable::load(&temp.path().join("rates.json")).unwrap();
        assert_eq!(table, RateTable::default());
    }

    #[test]
    fn test_load_json_with_legacy_follow_up_key() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rates.json");
        fs::write(&path, r#"{"Consultation": 600, "Follow-up": 250, "Emergency": 1200}"#).unwrap();

        let table = RateTable::load(&path).unwrap();
        assert_eq!(table.consultation, 600);
        assert_eq!(table.follow_up, 250);
        assert_eq!(table.emergency, 1200);
    }

    #[test]
    fn test_load_yaml_partial_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rates.yaml");
        fs::write(&path, "FollowUp: 350\nDental: 90\n").unwrap();

        let table = RateTable::load(&path).unwrap();
        assert_eq!(table.consultation, DEFAULT_CONSULTATION_RATE);
        assert_eq!(table.follow_up, 350);
        assert_eq!(table.emergency, DEFAULT_EMERGENCY_RATE);
    }

    #[test]
    fn test_load_rejects_negative_rate() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rates.json");
        fs::write(&path, r#"{"Emergency": -5}"#).unwrap();

        assert!(RateTable::load(&path).is_err());
    }

    #[test]
    fn test_load_rejects_rate_above_maximum() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rates.json");
        fs::write(&path, format!(r#"{{"Consultation": {}}}"#, MAX_RATE + 1)).unwrap();
        assert!(RateTable::load(&path).is_err());

        fs::write(&path, format!(r#"{{"Consultation": {}}}"#, MAX_RATE)).unwrap();
        assert_eq!(RateTable::load(&path).unwrap().consultation, MAX_RATE);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rates.json");
        fs::write(&path, "{not json").unwrap();

        assert!(RateTable::load(&path).is_err());
    }
}
