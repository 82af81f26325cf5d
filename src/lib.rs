// VisitStore - Patient visit records with undo/redo and CSV persistence

pub mod activity;
pub mod config;
pub mod csv;
pub mod error;
pub mod filter;
pub mod history;
pub mod notify;
pub mod rates;
pub mod record;
pub mod report;
pub mod repository;
pub mod sample;
pub mod session;
pub mod store;

// Re-export main types for convenience
pub use activity::{ActivityLog, FileActivityLog, Role};
pub use config::{Config, Options};
pub use error::{StoreError, ValidationError};
pub use filter::{Filter, SortField};
pub use notify::{ConsoleNotifier, Notifier};
pub use rates::RateTable;
pub use record::{Visit, VisitDraft, VisitKind};
pub use repository::{CsvRepository, Repository};
pub use session::{Command, ReportKind, Session, VisitChanges};
pub use store::Store;
