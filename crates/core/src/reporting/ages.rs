//! Patient ages and their distribution.

use crate::{BridgeError, BridgeResult};
use chrono::{Datelike, NaiveDate};
use std::fmt::Write as _;

/// Width of one histogram bin in years.
pub const BIN_WIDTH: i32 = 5;

/// Upper bound of the charted range; the last bin includes it.
pub const MAX_CHARTED_AGE: i32 = 100;

const BIN_COUNT: usize = (MAX_CHARTED_AGE / BIN_WIDTH) as usize;

pub const HISTOGRAM_TITLE: &str = "Age Distribution of Patients";

/// Whole years between `birth_date` (`YYYY-MM-DD`) and `today`.
///
/// One year is taken off when `today` falls before the birthday in its year. A birth
/// date after `today` gives a negative age.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidInput`] if `birth_date` is not an ISO calendar date.
pub fn calculate_age(birth_date: &str, today: NaiveDate) -> BridgeResult<i32> {
    let birth = NaiveDate::parse_from_str(birth_date.trim(), "%Y-%m-%d").map_err(|e| {
        BridgeError::InvalidInput(format!("invalid birth date '{birth_date}': {e}"))
    })?;

    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    Ok(age)
}

/// Counts of patient ages in 5-year bins over `0..=100`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgeHistogram {
    bins: [usize; BIN_COUNT],
    out_of_range: usize,
    unknown: usize,
}

impl AgeHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ages(ages: impl IntoIterator<Item = i32>) -> Self {
        let mut histogram = Self::new();
        for age in ages {
            histogram.record(age);
        }
        histogram
    }

    pub fn record(&mut self, age: i32) {
        match bin_index(age) {
            Some(index) => self.bins[index] += 1,
            None => self.out_of_range += 1,
        }
    }

    /// Count a patient whose age could not be determined.
    pub fn record_unknown(&mut self) {
        self.unknown += 1;
    }

    /// `(lowest age, highest age, count)` per bin.
    pub fn bins(&self) -> impl Iterator<Item = (i32, i32, usize)> + '_ {
        self.bins.iter().enumerate().map(|(index, count)| {
            let low = index as i32 * BIN_WIDTH;
            let high = if index + 1 == BIN_COUNT {
                MAX_CHARTED_AGE
            } else {
                low + BIN_WIDTH - 1
            };
            (low, high, *count)
        })
    }

    pub fn charted(&self) -> usize {
        self.bins.iter().sum()
    }

    pub fn out_of_range(&self) -> usize {
        self.out_of_range
    }

    pub fn unknown(&self) -> usize {
        self.unknown
    }

    /// Text bar chart, with the longest bar `width` characters wide.
    pub fn render(&self, width: usize) -> String {
        let peak = self.bins.iter().copied().max().unwrap_or(0);
        let mut out = String::new();
        let _ = writeln!(out, "{HISTOGRAM_TITLE}");
        let _ = writeln!(out, "{:>7} | Frequency", "Age");

        for (low, high, count) in self.bins() {
            let bar_len = if peak == 0 { 0 } else { count * width / peak };
            let bar = "#".repeat(bar_len.max(usize::from(count > 0)));
            let _ = writeln!(out, "{:>7} | {bar} {count}", format!("{low}-{high}"));
        }

        let _ = write!(out, "{} charted", self.charted());
        if self.out_of_range > 0 {
            let _ = write!(out, ", {} outside 0-{MAX_CHARTED_AGE}", self.out_of_range);
        }
        if self.unknown > 0 {
            let _ = write!(out, ", {} without a usable birth date", self.unknown);
        }
        out.push('\n');
        out
    }
}

fn bin_index(age: i32) -> Option<usize> {
    if !(0..=MAX_CHARTED_AGE).contains(&age) {
        return None;
    }
    let index = (age / BIN_WIDTH) as usize;
    Some(index.min(BIN_COUNT - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn age_changes_on_birthday() {
        assert_eq!(calculate_age("2000-06-15", date(2024, 6, 14)).expect("age"), 23);
        assert_eq!(calculate_age("2000-06-15", date(2024, 6, 15)).expect("age"), 24);
        assert_eq!(calculate_age("2000-06-15", date(2024, 12, 31)).expect("age"), 24);
    }

    #[test]
    fn leap_day_birthdays() {
        assert_eq!(calculate_age("2004-02-29", date(2023, 2, 28)).expect("age"), 18);
        assert_eq!(calculate_age("2004-02-29", date(2023, 3, 1)).expect("age"), 19);
    }

    #[test]
    fn invalid_birth_date() {
        assert!(matches!(
            calculate_age("15/06/2000", date(2024, 1, 1)),
            Err(BridgeError::InvalidInput(_))
        ));
        assert!(calculate_age("2000-02-30", date(2024, 1, 1)).is_err());
    }

    #[test]
    fn bins_cover_zero_to_one_hundred() {
        let histogram = AgeHistogram::from_ages([0, 4, 5, 99, 100, 101, -1]);
        let bins: Vec<_> = histogram.bins().collect();

        assert_eq!(bins.len(), 20);
        assert_eq!(bins[0], (0, 4, 2));
        assert_eq!(bins[1], (5, 9, 1));
        assert_eq!(bins[19], (95, 100, 2));
        assert_eq!(histogram.charted(), 5);
        assert_eq!(histogram.out_of_range(), 2);
    }

    #[test]
    fn render_scales_bars() {
        let mut histogram = AgeHistogram::from_ages([30, 31, 32, 33, 70]);
        histogram.record_unknown();
        let text = histogram.render(8);

        assert!(text.starts_with("Age Distribution of Patients\n"));
        assert!(text.contains("  30-34 | ######## 4\n"));
        assert!(text.contains("  70-74 | ## 1\n"));
        assert!(text.contains("    0-4 |  0\n"));
        assert!(text.ends_with("5 charted, 1 without a usable birth date\n"));
    }
}
