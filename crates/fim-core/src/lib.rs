//! File integrity monitoring core
//!
//! Establishes a content-hash baseline of a directory tree and later detects
//! additions, modifications and deletions by re-scanning and comparing.
//!
//! ```text
//! Scanner --(Hasher per file)--> Snapshot --> BaselineStore (save / load)
//!                                   |
//!                    baseline + current --> diff() --> DiffReport
//! ```
//!
//! [`Monitor`] ties the pieces together for the `scan` / `verify` commands.

pub mod diff;
pub mod error;
pub mod hasher;
pub mod models;
pub mod monitor;
pub mod paths;
pub mod scanner;
pub mod settings;
pub mod store;

pub use diff::{diff, ChangeKind, DiffReport};
pub use error::{FimError, HashError, PathError, Result, ScanError, StoreError};
pub use hasher::Hasher;
pub use models::{FilePath, Fingerprint, HashAlgorithm, Snapshot};
pub use monitor::{BaselineInfo, Monitor, MonitorState, ScanSummary, VerifyOutcome};
pub use scanner::{ScanOutcome, ScanStats, Scanner};
pub use settings::Settings;
pub use store::BaselineStore;
