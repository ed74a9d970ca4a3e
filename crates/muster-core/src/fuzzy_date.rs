//! Partial historical dates.
//!
//! Edit screens submit dates as `"{year}-{month}-{day}"` where a zero month or
//! day means "unknown". Storage wants a real calendar date so records can be
//! sorted and range-queried, so each partial date is normalized towards the
//! side of the range it anchors and two precision flags remember which parts
//! were actually known.
//!
//! `"0-0-0"` is the "no date supplied" sentinel.

use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The raw value meaning "no date supplied".
pub const NO_DATE: &str = "0-0-0";

// ─── Anchor ──────────────────────────────────────────────────────────────────

/// Which end of a date range a partial date belongs to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Anchor {
  /// Unknown parts are filled with the earliest possible value.
  Start,
  /// Unknown parts are filled with the latest possible value.
  End,
}

// ─── Components ──────────────────────────────────────────────────────────────

/// Split a raw date into exactly three unsigned integer components.
fn components(raw: &str) -> Result<(u32, u32, u32)> {
  let parts: Vec<&str> = raw.trim().split('-').collect();
  let [y, m, d] = parts.as_slice() else {
    return Err(Error::MalformedDate(raw.to_owned()));
  };
  let parse = |s: &str| {
    s.trim()
      .parse::<u32>()
      .map_err(|_| Error::MalformedDate(raw.to_owned()))
  };
  Ok((parse(y)?, parse(m)?, parse(d)?))
}

fn year_of(raw: &str, year: u32) -> Result<i32> {
  i32::try_from(year).map_err(|_| Error::InvalidDate(raw.to_owned()))
}

/// The last calendar day of `month` in `year`, leap years included.
pub fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
  let first = NaiveDate::from_ymd_opt(year, month, 1)?;
  let next = first.checked_add_months(Months::new(1))?;
  Some(next.pred_opt()?.day())
}

// ─── FuzzyDate ───────────────────────────────────────────────────────────────

/// A date whose month and/or day may be unknown (zero).
///
/// The year is always known, and an unknown month implies an unknown day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyDate {
  pub year:  i32,
  pub month: u32,
  pub day:   u32,
}

/// Which components of a date were supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Precision {
  pub month_known: bool,
  pub day_known:   bool,
}

impl FuzzyDate {
  /// Parse a raw form value. `"0-0-0"` yields `None`.
  ///
  /// A day given alongside an unknown month is discarded.
  pub fn parse(raw: &str) -> Result<Option<Self>> {
    let (y, m, d) = components(raw)?;
    if y == 0 && m == 0 && d == 0 {
      return Ok(None);
    }
    if y == 0 || m > 12 {
      return Err(Error::InvalidDate(raw.to_owned()));
    }
    let year = year_of(raw, y)?;
    let day = if m == 0 { 0 } else { d };

    let valid = match (m, day) {
      (0, _) => NaiveDate::from_ymd_opt(year, 1, 1).is_some(),
      (m, 0) => NaiveDate::from_ymd_opt(year, m, 1).is_some(),
      (m, d) => NaiveDate::from_ymd_opt(year, m, d).is_some(),
    };
    if !valid {
      return Err(Error::InvalidDate(raw.to_owned()));
    }

    Ok(Some(Self { year, month: m, day }))
  }

  /// Rebuild the partial date from a stored date and its precision flags.
  pub fn from_stored(date: NaiveDate, month_known: bool, day_known: bool) -> Self {
    let month = if month_known { date.month() } else { 0 };
    let day = if month_known && day_known { date.day() } else { 0 };
    Self { year: date.year(), month, day }
  }

  pub fn month_known(&self) -> bool { self.month != 0 }

  pub fn day_known(&self) -> bool { self.month != 0 && self.day != 0 }

  pub fn precision(&self) -> Precision {
    Precision {
      month_known: self.month_known(),
      day_known:   self.day_known(),
    }
  }

  /// Fill unknown components towards `anchor` and produce a calendar date.
  pub fn normalize(&self, anchor: Anchor) -> Result<NaiveDate> {
    let (month, day) = match (self.month, self.day, anchor) {
      (0, _, Anchor::Start) => (1, 1),
      (0, _, Anchor::End) => (12, 31),
      (m, 0, Anchor::Start) => (m, 1),
      (m, 0, Anchor::End) => (
        m,
        last_day_of_month(self.year, m)
          .ok_or_else(|| Error::InvalidDate(self.to_string()))?,
      ),
      (m, d, _) => (m, d),
    };
    NaiveDate::from_ymd_opt(self.year, month, day)
      .ok_or_else(|| Error::InvalidDate(self.to_string()))
  }
}

impl fmt::Display for FuzzyDate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}-{}", self.year, self.month, self.day)
  }
}

// ─── Operations on raw strings ───────────────────────────────────────────────

/// Which parts of `raw` are known. The anchor never affects precision.
pub fn parse_precision(raw: &str, _anchor: Anchor) -> Result<Precision> {
  Ok(FuzzyDate::parse(raw)?.map(|d| d.precision()).unwrap_or_default())
}

/// Normalize `raw` to a storable calendar date.
///
/// The `"0-0-0"` sentinel has no calendar date and is rejected as malformed.
pub fn normalize(raw: &str, anchor: Anchor) -> Result<NaiveDate> {
  FuzzyDate::parse(raw)?
    .ok_or_else(|| Error::MalformedDate(raw.to_owned()))?
    .normalize(anchor)
}

/// Inverse of [`normalize`]: zero out whatever was not known.
pub fn decode_for_display(
  date: NaiveDate,
  month_known: bool,
  day_known: bool,
) -> String {
  let month = if month_known { date.month() } else { 0 };
  let day = if day_known { date.day() } else { 0 };
  format!("{}-{}-{}", date.year(), month, day)
}

/// Validate a date that must be either complete or the `"0-0-0"` sentinel.
pub fn parse_exact(raw: &str) -> Result<Option<NaiveDate>> {
  let (y, m, d) = components(raw)?;
  if y == 0 && m == 0 && d == 0 {
    return Ok(None);
  }
  if y == 0 || m == 0 || d == 0 {
    return Err(Error::InvalidDate(raw.to_owned()));
  }
  NaiveDate::from_ymd_opt(year_of(raw, y)?, m, d)
    .map(Some)
    .ok_or_else(|| Error::InvalidDate(raw.to_owned()))
}

/// Raw form value for an optional complete date.
pub fn display_exact(date: Option<NaiveDate>) -> String {
  match date {
    Some(d) => format!("{}-{}-{}", d.year(), d.month(), d.day()),
    None => NO_DATE.to_owned(),
  }
}

// ─── PrecisionDate ───────────────────────────────────────────────────────────

/// The persisted form of a partial date: a normalized calendar date plus the
/// two precision flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecisionDate {
  pub date:        NaiveDate,
  pub month_known: bool,
  pub day_known:   bool,
}

impl PrecisionDate {
  pub fn from_fuzzy(fuzzy: FuzzyDate, anchor: Anchor) -> Result<Self> {
    Ok(Self {
      date:        fuzzy.normalize(anchor)?,
      month_known: fuzzy.month_known(),
      day_known:   fuzzy.day_known(),
    })
  }

  /// Encode a raw form value; `"0-0-0"` yields `None`.
  pub fn encode(raw: &str, anchor: Anchor) -> Result<Option<Self>> {
    FuzzyDate::parse(raw)?
      .map(|fuzzy| Self::from_fuzzy(fuzzy, anchor))
      .transpose()
  }

  pub fn to_fuzzy(&self) -> FuzzyDate {
    FuzzyDate::from_stored(self.date, self.month_known, self.day_known)
  }

  /// The raw form value that re-populates an edit screen.
  pub fn to_raw(&self) -> String {
    decode_for_display(self.date, self.month_known, self.day_known)
  }
}

/// Raw form value for an optional partial date.
pub fn display_fuzzy(date: Option<&PrecisionDate>) -> String {
  date.map_or_else(|| NO_DATE.to_owned(), PrecisionDate::to_raw)
}
