use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use super::model::{columns, Dataset};
use super::period::{bucket, Granularity};

// ---------------------------------------------------------------------------
// Bounded Top-N parameter
// ---------------------------------------------------------------------------

/// Slider range and default for a Top-N control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TopNBounds {
    pub min: usize,
    pub max: usize,
    pub default: usize,
}

impl TopNBounds {
    pub const RANKING: TopNBounds = TopNBounds {
        min: 5,
        max: 100,
        default: 20,
    };
    pub const DISTRIBUTION: TopNBounds = TopNBounds {
        min: 5,
        max: 50,
        default: 20,
    };

    pub fn clamp(&self, n: usize) -> usize {
        n.clamp(self.min, self.max.max(self.min))
    }
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub total_value: f64,
    pub quantity: f64,
}

/// Sum of `Valor Total` and `Quantidade`; `None` unless both columns exist.
pub fn totals(dataset: &Dataset, view: &[usize]) -> Option<Totals> {
    if !dataset.has_column(columns::TOTAL_VALUE) || !dataset.has_column(columns::QUANTITY) {
        return None;
    }
    let mut sums = Totals::default();
    for &i in view {
        let rec = &dataset.records[i];
        sums.total_value += rec.number(columns::TOTAL_VALUE).unwrap_or(0.0);
        sums.quantity += rec.number(columns::QUANTITY).unwrap_or(0.0);
    }
    Some(sums)
}

// ---------------------------------------------------------------------------
// Top-N frequency
// ---------------------------------------------------------------------------

/// Most frequent keys of `column`, descending by count.
///
/// Ties keep first-appearance order. Null cells are not ranked.
pub fn top_n(dataset: &Dataset, view: &[usize], column: &str, n: usize) -> Option<Vec<(String, usize)>> {
    if !dataset.has_column(column) {
        return None;
    }
    let mut slot: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for &i in view {
        let cell = dataset.records[i].get(column);
        if cell.is_null() {
            continue;
        }
        let key = cell.key();
        match slot.get(&key) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                slot.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }
    // `sort_by` is stable, so equal counts stay in first-appearance order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    Some(counts)
}

// ---------------------------------------------------------------------------
// Grouped time count
// ---------------------------------------------------------------------------

/// `(bucket, count)` pairs ascending by bucket; the null bucket sorts first.
pub type TimeSeries = Vec<(Option<NaiveDate>, usize)>;

pub fn time_counts(
    dataset: &Dataset,
    view: &[usize],
    column: &str,
    granularity: Granularity,
) -> Option<TimeSeries> {
    if !dataset.has_column(column) {
        return None;
    }
    let mut groups: BTreeMap<Option<NaiveDate>, usize> = BTreeMap::new();
    for &i in view {
        let key = bucket(dataset.records[i].datetime(column), granularity);
        *groups.entry(key).or_default() += 1;
    }
    Some(groups.into_iter().collect())
}

// ---------------------------------------------------------------------------
// Value distribution
// ---------------------------------------------------------------------------

/// One record's contribution to a distribution group.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionPoint {
    pub value: f64,
    pub authorization: Option<String>,
    pub request_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionGroup {
    pub procedure: String,
    pub points: Vec<DistributionPoint>,
}

/// `Valor Total` of each record among the `n` most frequent procedures,
/// grouped by procedure in rank order.
pub fn value_distribution(dataset: &Dataset, view: &[usize], n: usize) -> Option<Vec<DistributionGroup>> {
    if !dataset.has_column(columns::TOTAL_VALUE) {
        return None;
    }
    let ranking = top_n(dataset, view, columns::PROCEDURE_NAME, n)?;

    let rank: HashMap<&str, usize> = ranking
        .iter()
        .enumerate()
        .map(|(pos, (name, _))| (name.as_str(), pos))
        .collect();
    let mut groups: Vec<DistributionGroup> = ranking
        .iter()
        .map(|(name, _)| DistributionGroup {
            procedure: name.clone(),
            points: Vec::new(),
        })
        .collect();

    for &i in view {
        let rec = &dataset.records[i];
        let Some(&pos) = rank.get(rec.get(columns::PROCEDURE_NAME).key().as_str()) else {
            continue;
        };
        let Some(value) = rec.number(columns::TOTAL_VALUE) else {
            continue;
        };
        let authorization = rec.get(columns::AUTHORIZATION_NUMBER);
        groups[pos].points.push(DistributionPoint {
            value,
            authorization: (!authorization.is_null()).then(|| authorization.key()),
            request_date: rec.datetime(columns::REQUEST_DATE),
        });
    }
    Some(groups)
}
