pub mod engine;
pub mod error;
pub mod executor;
pub mod mapper;
pub mod reconciler;
pub mod scanner;
pub mod tree;

pub use engine::{SyncEngine, SyncReport, SyncStatus};
pub use error::{Result, SyncError};
pub use executor::{PassOutcome, PassStats, PlanExecutor, UploadOutcome};
pub use mapper::PathMapper;
pub use reconciler::{PlanSummary, Reconciler, SyncPlan};
pub use scanner::{FileScanner, ScanConfig};
pub use tree::{clean_path, join_path, normalize_path, Entry, Timestamp, Tree};
