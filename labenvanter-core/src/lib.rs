//! Lab Envanter Core Library
//!
//! This library provides the core functionality for the laboratory equipment
//! inventory manager: the device repository, change tracking, derived views,
//! the admin authorization gate, and durable key/value state storage.

pub mod analysis;
pub mod auth;
pub mod changelog;
pub mod device;
pub mod import_export;
pub mod platform;
pub mod query;
pub mod repository;
pub mod store;

pub use analysis::{CertificateAnalysisResult, CertificateAnalyzer, CertificateStatus};
pub use auth::{AuthGate, Authorization, Challenge, Resolution};
pub use changelog::{diff_devices, ChangeLogEntry};
pub use device::{ActiveFlag, ArchivedDevice, Device, DeviceDraft, DeviceField, Note};
pub use platform::{ensure_data_dir, get_data_dir, get_default_state_path};
pub use query::{
    calibration_status, filter_and_sort, filter_notes, CalibrationStatus, DeviceFilter,
    SortDirection, SortState,
};
pub use repository::InventoryRepository;
pub use store::{MemoryStore, SqliteStore, StateStore, StoreKey, Theme};

use thiserror::Error;

/// Result type for inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;

/// General error type for inventory operations
///
/// Expected domain conditions (a missing device, a wrong password) are never
/// errors; they are reported as boolean results by the operations themselves.
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File error: {0}")]
    FileIo(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("AI API key is not configured")]
    MissingApiKey,

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
