// Startup configuration, resolved once from command-line options

use crate::activity::Role;
use crate::rates::RateTable;
use eyre::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_DATA_FILE: &str = "patient_visits.csv";
pub const DEFAULT_ACTIVITY_LOG: &str = "activity_log.txt";
pub const DEFAULT_RATES_FILE: &str = "rates.json";

/// Raw options as given by the user; unset paths fall back to defaults
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub store_path: PathBuf,
    pub data_file: Option<PathBuf>,
    pub rates_file: Option<PathBuf>,
    pub activity_log: Option<PathBuf>,
    pub role: Option<Role>,
    pub sample_count: usize,
    pub interactive: bool,
}

/// Immutable settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_file: PathBuf,
    pub activity_log: PathBuf,
    pub rates: RateTable,
    pub role: Role,
    /// Sample visits to generate when the data file does not exist yet
    pub sample_count: usize,
    pub interactive: bool,
}

impl Config {
    /// Resolve paths relative to the store directory (created if missing) and
    /// load the rate table
    ///
    /// Rates come from the explicit file if given, else `rates.json` in the
    /// store directory, else the per-user config location, else the built-in
    /// defaults.
    pub fn resolve(options: Options) -> Result<Self> {
        let store_path = options.store_path;
        fs::create_dir_all(&store_path).context("Failed to create store directory")?;

        let data_file = options
            .data_file
            .unwrap_or_else(|| store_path.join(DEFAULT_DATA_FILE));
        let activity_log = options
            .activity_log
            .unwrap_or_else(|| store_path.join(DEFAULT_ACTIVITY_LOG));

        let rates = match rates_path(&store_path, options.rates_file) {
            Some(path) => RateTable::load(&path).with_context(|| format!("Failed to load rates from {:?}", path))?,
            None => RateTable::default(),
        };

        let config = Self {
            data_file,
            activity_log,
            rates,
            role: options.role.unwrap_or(Role::Admin),
            sample_count: options.sample_count,
            interactive: options.interactive,
        };
        debug!(?config, "Resolved configuration");
        Ok(config)
    }
}

fn rates_path(store_path: &Path, explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }

    let local = store_path.join(DEFAULT_RATES_FILE);
    if local.exists() {
        return Some(local);
    }

    RateTable::default_path()
}
