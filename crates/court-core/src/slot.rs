//! Slot calendar: the fixed daily grid of bookable hours.
//!
//! The court is bookable on the hour from 05:00 to 22:00. Each label marks
//! the start of a one-hour unit, and a booking covers the half-open range
//! `[start, end)`, so 22:00 is only ever valid as an end.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Hour of the first mark on the grid.
pub const FIRST_HOUR: u8 = 5;

/// Hour of the last mark on the grid.
pub const LAST_HOUR: u8 = 22;

/// Number of marks on the daily grid.
pub const SLOT_COUNT: usize = (LAST_HOUR - FIRST_HOUR + 1) as usize;

/// One hourly mark on the daily grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slot(u8);

impl Slot {
    /// Returns the slot for a whole hour, if it lies on the grid.
    pub const fn from_hour(hour: u8) -> Option<Self> {
        if hour >= FIRST_HOUR && hour <= LAST_HOUR {
            Some(Self(hour))
        } else {
            None
        }
    }

    pub const fn hour(self) -> u8 {
        self.0
    }

    /// The following mark, or `None` at the end of the grid.
    pub const fn next(self) -> Option<Self> {
        Self::from_hour(self.0 + 1)
    }

    /// Wall-clock time of this mark.
    pub fn time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.0), 0, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", self.0)
    }
}

impl FromStr for Slot {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        let invalid = || EngineError::invalid_range(format!("{label:?} is not a bookable slot"));

        let (hour, minute) = label.split_once(':').ok_or_else(invalid)?;
        if minute != "00" || hour.is_empty() || hour.len() > 2 {
            return Err(invalid());
        }
        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        Self::from_hour(hour).ok_or_else(invalid)
    }
}

impl TryFrom<String> for Slot {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Slot> for String {
    fn from(slot: Slot) -> Self {
        slot.to_string()
    }
}

/// Returns the fixed, ordered sequence of marks.
pub fn slots() -> impl ExactSizeIterator<Item = Slot> + DoubleEndedIterator {
    (FIRST_HOUR..=LAST_HOUR).map(Slot)
}

/// Returns true if `label` names a mark on the grid.
pub fn is_valid_slot(label: &str) -> bool {
    label.parse::<Slot>().is_ok()
}

/// Whole hours between two labels.
pub fn duration_hours(start: &str, end: &str) -> Result<u32, EngineError> {
    Ok(SlotRange::parse(start, end)?.duration_hours())
}

/// Unit slots covered by `[start, end)`.
pub fn enumerate(start: &str, end: &str) -> Result<impl Iterator<Item = Slot>, EngineError> {
    Ok(SlotRange::parse(start, end)?.iter())
}

/// A half-open range of marks, `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRange {
    start: Slot,
    end: Slot,
}

impl SlotRange {
    pub fn new(start: Slot, end: Slot) -> Result<Self, EngineError> {
        if end <= start {
            return Err(EngineError::invalid_range(format!(
                "end {end} must be after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parses both labels and validates the range.
    pub fn parse(start: &str, end: &str) -> Result<Self, EngineError> {
        Self::new(start.parse()?, end.parse()?)
    }

    /// The one-hour range of a legacy booking stored without an end.
    pub fn single(start: Slot) -> Result<Self, EngineError> {
        let end = start
            .next()
            .ok_or_else(|| EngineError::invalid_range(format!("{start} is the last mark")))?;
        Ok(Self { start, end })
    }

    pub const fn start(&self) -> Slot {
        self.start
    }

    pub const fn end(&self) -> Slot {
        self.end
    }

    pub const fn duration_hours(&self) -> u32 {
        (self.end.0 - self.start.0) as u32
    }

    /// Returns true if the unit slot starting at `slot` lies inside the range.
    pub fn contains(&self, slot: Slot) -> bool {
        self.start <= slot && slot < self.end
    }

    /// Two half-open ranges overlap iff each starts before the other ends.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Lazily yields each unit slot covered, excluding `end`.
    pub fn iter(&self) -> impl Iterator<Item = Slot> + use<> {
        (self.start.0..self.end.0).map(Slot)
    }
}

impl fmt::Display for SlotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
