//! Grandfather-father-son retention for backup filenames.
//!
//! This crate decides which backups a retention policy keeps and which ones
//! it discards. Backups are identified purely by their filenames; the
//! timestamp is recovered from the name and no filesystem access happens.
//!
//! ## Architecture
//!
//! - `policy`: Parses `"7d 4w 12m latest"` style policies into quotas
//! - `lattice`: Builds the per-unit time slots anchored at a fixed "now"
//! - `collector`: Feeds backups into the slots and classifies filenames
//! - `classification`: The closed set of retention verdicts
//! - `extract`: Recovers timestamps from backup filenames
//!
//! ## Usage
//!
//! ```
//! use chrono::NaiveDate;
//! use retention::{BackupCollector, Classification, RetentionPolicy};
//!
//! let now = NaiveDate::from_ymd_opt(2024, 3, 15)
//!     .and_then(|d| d.and_hms_opt(12, 0, 0))
//!     .unwrap();
//! let policy = RetentionPolicy::parse("2d latest");
//! let mut collector = BackupCollector::new(policy, now);
//! collector.collect(["backup-20240314-0000.tar", "backup-20240315-0000.tar"]);
//!
//! assert_eq!(collector.classify("backup-20240315-0000.tar"), Classification::Latest);
//! assert_eq!(collector.classify("backup-20240314-0000.tar"), Classification::Day);
//! assert_eq!(collector.classify("readme.txt"), Classification::Unknown);
//! ```

pub mod classification;
pub mod collector;
pub mod extract;
pub mod lattice;
pub mod policy;

// Re-export commonly used types
pub use classification::Classification;
pub use collector::{Backup, BackupCollector, Verdict};
pub use extract::{DateExtractor, FilenameDateExtractor};
pub use lattice::{Slot, SlotLattice, Unit};
pub use policy::{DEFAULT_WEEK_ANCHOR, RetentionPolicy, UNBOUNDED};
