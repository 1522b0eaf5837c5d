//! Retention verdicts assigned to filenames.

use serde::Serialize;
use std::fmt;

/// Final category assigned to a filename.
///
/// Variants are listed in their declaration order; the precedence used by
/// [`crate::BackupCollector::classify`] is documented there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// The name carries no recognizable timestamp (or was never fed).
    Unknown,
    /// Recognized, but no rule keeps it.
    Discard,
    /// The policy says `no`: discard everything.
    None,
    /// The policy says `all`: keep everything.
    All,
    /// The single most recent backup.
    Latest,
    /// First backup of an hourly slot.
    Hour,
    /// First backup of a daily slot.
    Day,
    /// First backup of a weekly slot.
    Week,
    /// First backup of a monthly slot.
    Month,
    /// First backup of a yearly slot.
    Year,
}

impl Classification {
    /// Whether several filenames can carry this label across different slots.
    pub fn is_multi(&self) -> bool {
        matches!(
            self,
            Classification::Hour
                | Classification::Day
                | Classification::Week
                | Classification::Month
                | Classification::Year
        )
    }

    /// The file should be kept.
    pub fn is_keep(&self) -> bool {
        !matches!(
            self,
            Classification::Unknown | Classification::Discard | Classification::None
        )
    }

    /// The file should be deleted.
    ///
    /// Unknown files are neither kept nor discarded.
    pub fn is_discard(&self) -> bool {
        matches!(self, Classification::Discard | Classification::None)
    }

    /// Upper-case name, e.g. `DAY`.
    pub fn name(&self) -> &'static str {
        match self {
            Classification::Unknown => "UNKNOWN",
            Classification::Discard => "DISCARD",
            Classification::None => "NONE",
            Classification::All => "ALL",
            Classification::Latest => "LATEST",
            Classification::Hour => "HOUR",
            Classification::Day => "DAY",
            Classification::Week => "WEEK",
            Classification::Month => "MONTH",
            Classification::Year => "YEAR",
        }
    }

    /// Display text with the `first of` prefix for multi-valued categories.
    pub fn label(&self) -> String {
        if self.is_multi() {
            format!("first of {}", self.name())
        } else {
            self.name().to_string()
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
