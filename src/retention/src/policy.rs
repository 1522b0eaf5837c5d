//! Retention policy parsing and canonical serialization.
//!
//! Policy syntax: whitespace separated words, each starting with one of
//! `<count>{y|m|w|d|h}`, `latest`, `all` or `no`, where `<count>` is a
//! decimal number or `*` for an unbounded quota. Only the start of a word
//! is matched, so `none` means `no` and `7days` means `7d`. Words matching
//! none of these are ignored.

use chrono::Weekday;
use once_cell::sync::Lazy;
use regex::Regex;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::lattice::Unit;

/// Quota used for `*`, standing in for "keep every slot of this unit".
pub const UNBOUNDED: u32 = 9999;

/// Weekly slots start on this day unless configured otherwise.
pub const DEFAULT_WEEK_ANCHOR: Weekday = Weekday::Sun;

/// Alternatives tried in order against the start of each word.
static POLICY_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:([0-9]+|\*)([ymwdh])|(latest)|(all)|(no))")
        .expect("policy word pattern is valid")
});

/// Parsed retention configuration: quotas per unit plus override flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// `no`: discard every recognized backup.
    pub none: bool,
    /// `all`: keep every recognized backup.
    pub all: bool,
    /// `latest`: keep the most recent backup.
    pub latest: bool,
    pub yearly: u32,
    pub monthly: u32,
    pub weekly: u32,
    pub daily: u32,
    pub hourly: u32,
    /// First day of a weekly slot.
    pub week_anchor: Weekday,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            none: false,
            all: false,
            latest: false,
            yearly: 0,
            monthly: 0,
            weekly: 0,
            daily: 0,
            hourly: 0,
            week_anchor: DEFAULT_WEEK_ANCHOR,
        }
    }
}

impl RetentionPolicy {
    /// Parse a policy string. Never fails; unrecognized words are dropped.
    ///
    /// A unit that appears more than once keeps its last value.
    pub fn parse(text: &str) -> Self {
        let mut policy = Self::default();
        let mut words = text.split_whitespace().peekable();

        while let Some(word) = words.next() {
            if let Some(caps) = POLICY_WORD.captures(word) {
                if let (Some(count), Some(unit)) = (caps.get(1), caps.get(2)) {
                    if let (Some(count), Some(unit)) =
                        (parse_count(count.as_str()), unit_word(unit.as_str()))
                    {
                        policy.set_quota(unit, count);
                    }
                } else if caps.get(3).is_some() {
                    policy.latest = true;
                } else if caps.get(4).is_some() {
                    policy.all = true;
                } else {
                    policy.none = true;
                }
            } else if let Some(count) = parse_count(word) {
                // "3 d" and "* y": a bare count followed by a bare unit letter
                match words.peek().and_then(|next| unit_word(next)) {
                    Some(unit) => {
                        words.next();
                        policy.set_quota(unit, count);
                    }
                    None => log::debug!("Ignoring retention count without unit: {word}"),
                }
            } else {
                log::debug!("Ignoring unknown retention word: {word}");
            }
        }

        policy
    }

    /// Use a different first day for weekly slots.
    pub fn with_week_anchor(mut self, anchor: Weekday) -> Self {
        self.week_anchor = anchor;
        self
    }

    /// Requested number of slots for a unit.
    pub fn quota(&self, unit: Unit) -> u32 {
        match unit {
            Unit::Hour => self.hourly,
            Unit::Day => self.daily,
            Unit::Week => self.weekly,
            Unit::Month => self.monthly,
            Unit::Year => self.yearly,
        }
    }

    fn set_quota(&mut self, unit: Unit, count: u32) {
        match unit {
            Unit::Hour => self.hourly = count,
            Unit::Day => self.daily = count,
            Unit::Week => self.weekly = count,
            Unit::Month => self.monthly = count,
            Unit::Year => self.yearly = count,
        }
    }

    /// True when no word of the policy was recognized.
    ///
    /// An empty policy and one made only of unknown words look the same.
    pub fn is_empty(&self) -> bool {
        !self.none && !self.all && !self.latest && Unit::ALL.iter().all(|u| self.quota(*u) == 0)
    }
}

impl FromStr for RetentionPolicy {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Canonical form: `all latest <h> <d> <w> <m> <y> no`, defaults omitted.
impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut words: Vec<String> = Vec::new();
        if self.all {
            words.push("all".to_string());
        }
        if self.latest {
            words.push("latest".to_string());
        }
        for unit in Unit::ALL {
            let quota = self.quota(unit);
            if quota > 0 {
                words.push(format!("{quota}{}", unit.suffix()));
            }
        }
        if self.none {
            words.push("no".to_string());
        }
        f.write_str(&words.join(" "))
    }
}

fn unit_word(word: &str) -> Option<Unit> {
    let mut chars = word.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Unit::from_suffix(c),
        _ => None,
    }
}

/// `*` or a decimal number, clamped to [`UNBOUNDED`].
fn parse_count(word: &str) -> Option<u32> {
    if word == "*" {
        return Some(UNBOUNDED);
    }
    if word.is_empty() || !word.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let count = word.parse::<u32>().unwrap_or(UNBOUNDED);
    Some(count.min(UNBOUNDED))
}
