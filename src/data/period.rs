use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

// ---------------------------------------------------------------------------
// Granularity – how coarse a time bucket is
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Day,
        Granularity::Week,
        Granularity::Month,
        Granularity::Year,
    ];

    /// Label shown in the grouping selector.
    pub fn label(self) -> &'static str {
        match self {
            Granularity::Day => "Dia",
            Granularity::Week => "Semana",
            Granularity::Month => "Mês",
            Granularity::Year => "Ano",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Bucketing
// ---------------------------------------------------------------------------

/// Start date of the bucket containing `timestamp`.
///
/// Weeks start on Monday (ISO). A null timestamp maps to the null key so the
/// caller can group those records together instead of dropping them.
pub fn bucket(timestamp: Option<NaiveDateTime>, granularity: Granularity) -> Option<NaiveDate> {
    timestamp.map(|t| bucket_date(t.date(), granularity))
}

pub fn bucket_date(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Day => date,
        Granularity::Week => {
            date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
        }
        Granularity::Month => date.with_day(1).unwrap_or(date),
        Granularity::Year => date.with_ordinal(1).unwrap_or(date),
    }
}
