// Subtracker - Core Library
// Shared by the CLI, the terminal UI and the API server

pub mod aggregator;
pub mod backup;
pub mod book;
pub mod config;
pub mod error;
pub mod logging;
pub mod settings;
pub mod storage;
pub mod subscription;

// Re-export commonly used types
pub use aggregator::{
    count_label, format_amount, monthly_total, next_due_date, yearly_total, Summary,
};
pub use backup::{default_backup_file_name, merge_by_id, BackupDocument, MergeReport};
pub use book::{Change, Observer, SubscriptionBook};
pub use config::AppConfig;
pub use error::{BackupError, BookError, FormError};
pub use logging::{init_logging, LogFormat, LogTarget};
pub use settings::{Settings, Theme};
pub use storage::{MemoryStore, SqliteStore, SubscriptionStore};
pub use subscription::{Frequency, Subscription, SubscriptionForm, ValidatedForm, DATE_FORMAT};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
