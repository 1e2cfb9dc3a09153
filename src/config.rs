// Runtime configuration, read from the environment once at startup.
//
//   SUBTRACKER_DB    database file      (default: ~/.subtracker/subtracker.db)
//   SUBTRACKER_LOG   TUI log file       (default: next to the database)
//   SUBTRACKER_ADDR  API listen address (default: 127.0.0.1:3000)
//   LOG_FORMAT       pretty | json

use std::collections::HashMap;
use std::path::PathBuf;

use crate::logging::LogFormat;

pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:3000";
const DATA_DIR: &str = ".subtracker";
const DB_FILE: &str = "subtracker.db";
const LOG_FILE: &str = "subtracker.log";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub log_format: LogFormat,
    pub server_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build from an explicit variable map (testable without touching the process env)
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let lookup = |key: &str| {
            vars.get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = lookup("SUBTRACKER_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir(lookup("HOME")).join(DB_FILE));

        let log_path = lookup("SUBTRACKER_LOG")
            .map(PathBuf::from)
            .unwrap_or_else(|| db_path.with_file_name(LOG_FILE));

        AppConfig {
            db_path,
            log_path,
            log_format: lookup("LOG_FORMAT")
                .map(|raw| LogFormat::parse(&raw))
                .unwrap_or_default(),
            server_addr: lookup("SUBTRACKER_ADDR")
                .unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
        }
    }

    /// Command-line `--db` wins over the environment
    pub fn with_db_path(mut self, db_path: PathBuf) -> Self {
        self.log_path = db_path.with_file_name(LOG_FILE);
        self.db_path = db_path;
        self
    }
}

fn default_data_dir(home: Option<String>) -> PathBuf {
    match home {
        Some(home) => PathBuf::from(home).join(DATA_DIR),
        None => PathBuf::from(DATA_DIR),
    }
}
