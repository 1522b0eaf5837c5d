//! Time slots per retention unit, anchored at a fixed reference instant.
//!
//! Every unit owns an ordered list of slots. Slot 0 starts at the boundary of
//! the current period (top of the hour, midnight, week anchor day, first of
//! the month, January 1st) and each following slot starts one period earlier.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use std::fmt;

use crate::classification::Classification;
use crate::collector::Backup;
use crate::policy::RetentionPolicy;

/// Retention unit, in classification precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Unit {
    /// All units, hour first.
    pub const ALL: [Unit; 5] = [Unit::Hour, Unit::Day, Unit::Week, Unit::Month, Unit::Year];

    /// Letter used in policy words, e.g. `d` in `7d`.
    pub fn suffix(&self) -> char {
        match self {
            Unit::Hour => 'h',
            Unit::Day => 'd',
            Unit::Week => 'w',
            Unit::Month => 'm',
            Unit::Year => 'y',
        }
    }

    pub fn from_suffix(c: char) -> Option<Self> {
        match c {
            'h' => Some(Unit::Hour),
            'd' => Some(Unit::Day),
            'w' => Some(Unit::Week),
            'm' => Some(Unit::Month),
            'y' => Some(Unit::Year),
            _ => None,
        }
    }

    /// Verdict for a backup elected in a slot of this unit.
    pub fn classification(&self) -> Classification {
        match self {
            Unit::Hour => Classification::Hour,
            Unit::Day => Classification::Day,
            Unit::Week => Classification::Week,
            Unit::Month => Classification::Month,
            Unit::Year => Classification::Year,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Unit::Hour => "hour",
            Unit::Day => "day",
            Unit::Week => "week",
            Unit::Month => "month",
            Unit::Year => "year",
        };
        f.write_str(name)
    }
}

/// A time bucket starting at `lower_bound` and its elected backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub lower_bound: NaiveDateTime,
    pub elected: Option<Backup>,
}

impl Slot {
    fn new(lower_bound: NaiveDateTime) -> Self {
        Self {
            lower_bound,
            elected: None,
        }
    }

    /// Offer a candidate; the earliest backup at or after the bound wins.
    ///
    /// Returns true if the candidate was adopted.
    pub fn offer(&mut self, candidate: &Backup) -> bool {
        if candidate.timestamp < self.lower_bound {
            return false;
        }
        let adopt = match &self.elected {
            Some(current) => candidate.timestamp < current.timestamp,
            None => true,
        };
        if adopt {
            self.elected = Some(candidate.clone());
        }
        adopt
    }

    pub fn elected_name(&self) -> Option<&str> {
        self.elected.as_ref().map(|b| b.name.as_str())
    }
}

/// Slot lists for all units, built once for a reference instant.
#[derive(Debug, Clone)]
pub struct SlotLattice {
    now: NaiveDateTime,
    hours: Vec<Slot>,
    days: Vec<Slot>,
    weeks: Vec<Slot>,
    months: Vec<Slot>,
    years: Vec<Slot>,
}

impl SlotLattice {
    /// Build the slot lists for `policy` relative to `now`.
    ///
    /// Hour, day, week and month lists hold `quota + 1` slots and are empty
    /// for a zero quota. The year list always holds `yearly + 1` slots.
    pub fn build(policy: &RetentionPolicy, now: NaiveDateTime) -> Self {
        let midnight = now.date().and_time(NaiveTime::MIN);

        let hours = if policy.hourly > 0 {
            let top_of_hour =
                NaiveTime::from_hms_opt(now.hour(), 0, 0).map(|t| now.date().and_time(t));
            generate(Unit::Hour, top_of_hour, policy.hourly, |b| {
                b.checked_sub_signed(TimeDelta::hours(1))
            })
        } else {
            Vec::new()
        };

        let days = if policy.daily > 0 {
            generate(Unit::Day, Some(midnight), policy.daily, |b| {
                b.checked_sub_signed(TimeDelta::days(1))
            })
        } else {
            Vec::new()
        };

        let weeks = if policy.weekly > 0 {
            let today = i64::from(now.weekday().num_days_from_monday());
            let anchor = i64::from(policy.week_anchor.num_days_from_monday());
            let mut shift = anchor - today;
            if anchor > today {
                // never start in the future
                shift -= 7;
            }
            let first = midnight.checked_add_signed(TimeDelta::days(shift));
            generate(Unit::Week, first, policy.weekly, |b| {
                b.checked_sub_signed(TimeDelta::days(7))
            })
        } else {
            Vec::new()
        };

        let months = if policy.monthly > 0 {
            let first = now.date().with_day(1).map(|d| d.and_time(NaiveTime::MIN));
            generate(Unit::Month, first, policy.monthly, |b| {
                b.date()
                    .checked_sub_months(Months::new(1))
                    .map(|d| d.and_time(NaiveTime::MIN))
            })
        } else {
            Vec::new()
        };

        let new_year =
            |year: i32| NaiveDate::from_ymd_opt(year, 1, 1).map(|d| d.and_time(NaiveTime::MIN));
        let years = generate(Unit::Year, new_year(now.year()), policy.yearly, |b| {
            new_year(b.year() - 1)
        });

        log::debug!(
            "Built slot lattice at {now}: {} hour, {} day, {} week, {} month, {} year slots",
            hours.len(),
            days.len(),
            weeks.len(),
            months.len(),
            years.len()
        );

        Self {
            now,
            hours,
            days,
            weeks,
            months,
            years,
        }
    }

    /// Reference instant the lattice was built for.
    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn slots(&self, unit: Unit) -> &[Slot] {
        match unit {
            Unit::Hour => &self.hours,
            Unit::Day => &self.days,
            Unit::Week => &self.weeks,
            Unit::Month => &self.months,
            Unit::Year => &self.years,
        }
    }

    fn slots_mut(&mut self, unit: Unit) -> &mut Vec<Slot> {
        match unit {
            Unit::Hour => &mut self.hours,
            Unit::Day => &mut self.days,
            Unit::Week => &mut self.weeks,
            Unit::Month => &mut self.months,
            Unit::Year => &mut self.years,
        }
    }

    pub fn total_slots(&self) -> usize {
        Unit::ALL.iter().map(|u| self.slots(*u).len()).sum()
    }

    /// Offer a backup to every slot of every unit.
    ///
    /// Returns the number of slots that adopted it.
    pub fn elect(&mut self, candidate: &Backup) -> usize {
        let mut adopted = 0;
        for unit in Unit::ALL {
            for slot in self.slots_mut(unit).iter_mut() {
                if slot.offer(candidate) {
                    adopted += 1;
                }
            }
        }
        adopted
    }

    /// Elected backup names with their unit, in precedence order.
    pub fn elected(&self) -> impl Iterator<Item = (Unit, &str)> + '_ {
        Unit::ALL.into_iter().flat_map(move |unit| {
            self.slots(unit)
                .iter()
                .filter_map(move |slot| slot.elected_name().map(|name| (unit, name)))
        })
    }
}

/// Walk `quota + 1` boundaries backwards from `first`.
///
/// Stops early when a boundary leaves the representable calendar range.
fn generate(
    unit: Unit,
    first: Option<NaiveDateTime>,
    quota: u32,
    step: impl Fn(NaiveDateTime) -> Option<NaiveDateTime>,
) -> Vec<Slot> {
    let count = quota as usize + 1;
    let slots: Vec<Slot> = std::iter::successors(first, |bound| step(*bound))
        .take(count)
        .map(Slot::new)
        .collect();
    if slots.len() < count {
        log::debug!(
            "Truncated {unit} slots to {} of {count}: calendar range exhausted",
            slots.len()
        );
    }
    slots
}
