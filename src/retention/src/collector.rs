//! Backup ingestion, slot election and classification.

use chrono::NaiveDateTime;
use once_cell::unsync::OnceCell;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::classification::Classification;
use crate::extract::{DateExtractor, FilenameDateExtractor};
use crate::lattice::{SlotLattice, Unit};
use crate::policy::RetentionPolicy;

/// A filename with its resolved timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub name: String,
    pub timestamp: NaiveDateTime,
}

impl Backup {
    pub fn new(name: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            name: name.into(),
            timestamp,
        }
    }
}

/// Classification of one filename, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub name: String,
    pub classification: Classification,
    /// Resolved timestamp, absent for unrecognized names.
    pub timestamp: Option<NaiveDateTime>,
}

/// Sorts backups into the slots of a retention policy.
///
/// Feed every filename first, then classify. Classification reflects the
/// slots as they stand after the last [`feed`](Self::feed).
pub struct BackupCollector<E = FilenameDateExtractor> {
    policy: RetentionPolicy,
    lattice: SlotLattice,
    extractor: E,
    recognized: HashMap<String, NaiveDateTime>,
    latest: Option<Backup>,
    /// Name to highest precedence unit, rebuilt after feeding.
    membership: OnceCell<HashMap<String, Unit>>,
}

impl BackupCollector<FilenameDateExtractor> {
    /// Create a collector using timestamps embedded in filenames.
    pub fn new(policy: RetentionPolicy, now: NaiveDateTime) -> Self {
        Self::with_extractor(policy, now, FilenameDateExtractor)
    }
}

impl<E: DateExtractor> BackupCollector<E> {
    /// Create a collector with a custom timestamp source.
    pub fn with_extractor(policy: RetentionPolicy, now: NaiveDateTime, extractor: E) -> Self {
        let lattice = SlotLattice::build(&policy, now);
        Self {
            policy,
            lattice,
            extractor,
            recognized: HashMap::new(),
            latest: None,
            membership: OnceCell::new(),
        }
    }

    /// Ingest one filename.
    ///
    /// Returns false if no timestamp could be resolved; the name is then
    /// left out of every slot and classifies as unknown.
    pub fn feed(&mut self, name: &str) -> bool {
        let Some(timestamp) = self.extractor.extract(name) else {
            log::debug!("Not a recognized backup: {name}");
            return false;
        };

        let backup = Backup::new(name, timestamp);
        self.recognized.insert(backup.name.clone(), timestamp);

        let newer = match &self.latest {
            Some(latest) => timestamp > latest.timestamp,
            None => true,
        };
        if newer {
            self.latest = Some(backup.clone());
        }

        let adopted = self.lattice.elect(&backup);
        log::debug!("Fed backup {name} ({timestamp}), adopted by {adopted} slots");

        self.membership.take();
        true
    }

    /// Ingest a batch of filenames, returning how many were recognized.
    pub fn collect<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter(|name| self.feed(name.as_ref()))
            .count()
    }

    /// Retention verdict for `name`.
    ///
    /// Precedence, first match wins: unknown, `all`, `no`, latest, then the
    /// hour, day, week, month and year slots, otherwise discard.
    pub fn classify(&self, name: &str) -> Classification {
        if !self.recognized.contains_key(name) {
            return Classification::Unknown;
        }
        if self.policy.all {
            return Classification::All;
        }
        if self.policy.none {
            return Classification::None;
        }
        if self.latest.as_ref().is_some_and(|b| b.name == name) {
            return Classification::Latest;
        }
        match self.membership().get(name) {
            Some(unit) => unit.classification(),
            None => Classification::Discard,
        }
    }

    fn membership(&self) -> &HashMap<String, Unit> {
        self.membership.get_or_init(|| {
            let mut index = HashMap::new();
            // precedence order: the first unit seen for a name wins
            for (unit, name) in self.lattice.elected() {
                index.entry(name.to_string()).or_insert(unit);
            }
            index
        })
    }

    /// Verdicts for `names`, sorted by name. A name given more than once is
    /// reported once.
    pub fn report<I, S>(&self, names: I) -> Vec<Verdict>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        sorted_unique(names)
            .into_iter()
            .map(|name| Verdict {
                classification: self.classify(&name),
                timestamp: self.recognized.get(&name).copied(),
                name,
            })
            .collect()
    }

    /// Sorted, deduplicated names the policy keeps.
    pub fn keep<I, S>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        sorted_unique(names)
            .into_iter()
            .filter(|name| self.classify(name).is_keep())
            .collect()
    }

    /// Sorted, deduplicated names the policy discards.
    pub fn discard<I, S>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        sorted_unique(names)
            .into_iter()
            .filter(|name| self.classify(name).is_discard())
            .collect()
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    pub fn lattice(&self) -> &SlotLattice {
        &self.lattice
    }

    /// The backup with the greatest timestamp; the first one fed wins ties.
    pub fn latest(&self) -> Option<&Backup> {
        self.latest.as_ref()
    }

    /// Number of distinct recognized names.
    pub fn len(&self) -> usize {
        self.recognized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recognized.is_empty()
    }
}

fn sorted_unique<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut names: Vec<String> = names
        .into_iter()
        .map(|n| n.as_ref().to_string())
        .filter(|n| seen.insert(n.clone()))
        .collect();
    names.sort();
    names
}
