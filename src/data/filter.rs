use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::model::{columns, Dataset, Record};

// ---------------------------------------------------------------------------
// Selection: which values of a categorical column are kept
// ---------------------------------------------------------------------------

/// Label of the "no filter" option in every categorical control.
pub const ALL_LABEL: &str = "Todos";

/// Applied selection for one categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Universal sentinel: the filter is a no-op.
    #[default]
    All,
    /// Keep only records whose key is in the set. An empty set keeps nothing.
    Only(BTreeSet<String>),
}

impl Selection {
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(keys) => keys.contains(key),
        }
    }
}

/// Multi-select control state. `include_all` wins over any picked values,
/// so picking "Todos" next to specific values still means "no filter".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSelect {
    pub include_all: bool,
    pub picked: BTreeSet<String>,
}

impl Default for MultiSelect {
    fn default() -> Self {
        MultiSelect {
            include_all: true,
            picked: BTreeSet::new(),
        }
    }
}

impl MultiSelect {
    pub fn selection(&self) -> Selection {
        if self.include_all {
            Selection::All
        } else {
            Selection::Only(self.picked.clone())
        }
    }

    pub fn toggle(&mut self, key: &str) {
        if !self.picked.remove(key) {
            self.picked.insert(key.to_string());
        }
    }

    /// Drop picks that are no longer offered. A control left with no picks
    /// falls back to "Todos". Returns whether anything changed.
    pub fn retain_offered(&mut self, offered: &[String]) -> bool {
        let before = self.picked.len();
        self.picked.retain(|key| offered.contains(key));
        if self.picked.len() == before {
            return false;
        }
        if self.picked.is_empty() {
            self.include_all = true;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Date range over the request date
// ---------------------------------------------------------------------------

/// Inclusive calendar range. Only applied when both endpoints are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Ordered endpoints, or `None` when the range is incomplete.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start, self.end) {
            (Some(a), Some(b)) if a <= b => Some((a, b)),
            (Some(a), Some(b)) => Some((b, a)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Filter registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    DateRange,
    Categorical,
}

/// One declared filter: the column it reads and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSpec {
    pub column: &'static str,
    pub kind: FilterKind,
    /// Options are listed in text order instead of value order.
    pub sort_as_text: bool,
}

/// Every filter the dashboard knows about, in chain order.
pub const REGISTRY: [FilterSpec; 7] = [
    FilterSpec {
        column: columns::REQUEST_DATE,
        kind: FilterKind::DateRange,
        sort_as_text: false,
    },
    FilterSpec {
        column: columns::AUTHORIZATION_NUMBER,
        kind: FilterKind::Categorical,
        sort_as_text: false,
    },
    FilterSpec {
        column: columns::PROVIDER,
        kind: FilterKind::Categorical,
        sort_as_text: false,
    },
    FilterSpec {
        column: columns::USER_NAME,
        kind: FilterKind::Categorical,
        sort_as_text: false,
    },
    FilterSpec {
        column: columns::ORIGIN_UNIT,
        kind: FilterKind::Categorical,
        sort_as_text: false,
    },
    FilterSpec {
        column: columns::CRITICALITY,
        kind: FilterKind::Categorical,
        sort_as_text: false,
    },
    FilterSpec {
        column: columns::PROCEDURE_CODE,
        kind: FilterKind::Categorical,
        sort_as_text: true,
    },
];

/// Registry entries whose column exists in `dataset`.
pub fn active_filters(dataset: &Dataset) -> Vec<FilterSpec> {
    REGISTRY
        .iter()
        .filter(|spec| dataset.has_column(spec.column))
        .copied()
        .collect()
}

// ---------------------------------------------------------------------------
// Filter state and application
// ---------------------------------------------------------------------------

/// Current value of every filter control.
/// A categorical column absent from `categorical` behaves as `Todos`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub date_range: DateRange,
    pub categorical: BTreeMap<String, MultiSelect>,
}

impl FilterState {
    /// Fresh state for a newly loaded dataset: every categorical control on
    /// "Todos", date range spanning the full request-date extent.
    pub fn for_dataset(dataset: &Dataset) -> Self {
        let mut state = FilterState::default();
        for spec in active_filters(dataset) {
            match spec.kind {
                FilterKind::DateRange => {
                    if let Some((lo, hi)) = dataset.date_bounds(spec.column) {
                        state.date_range = DateRange::new(lo, hi);
                    }
                }
                FilterKind::Categorical => {
                    state
                        .categorical
                        .insert(spec.column.to_string(), MultiSelect::default());
                }
            }
        }
        state
    }

    pub fn selection(&self, column: &str) -> Selection {
        self.categorical
            .get(column)
            .map(MultiSelect::selection)
            .unwrap_or_default()
    }
}

/// Whether `record` passes the single filter `spec`.
pub fn record_passes(record: &Record, spec: &FilterSpec, state: &FilterState) -> bool {
    match spec.kind {
        FilterKind::DateRange => match state.date_range.bounds() {
            None => true,
            Some((start, end)) => record
                .datetime(spec.column)
                .map(|t| (start..=end).contains(&t.date()))
                .unwrap_or(false),
        },
        FilterKind::Categorical => state
            .selection(spec.column)
            .matches(&record.get(spec.column).key()),
    }
}

/// Narrow `view` by one filter.
pub fn apply_filter(
    dataset: &Dataset,
    view: &[usize],
    spec: &FilterSpec,
    state: &FilterState,
) -> Vec<usize> {
    view.iter()
        .copied()
        .filter(|&i| record_passes(&dataset.records[i], spec, state))
        .collect()
}

/// Result of running the chain: surviving indices plus, per categorical
/// filter, the options offered by its control.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainResult {
    pub indices: Vec<usize>,
    pub options: BTreeMap<String, Vec<String>>,
}

/// Run `filters` in order. Each categorical control's options are the
/// distinct keys left by the filters before it.
pub fn run_chain(dataset: &Dataset, filters: &[FilterSpec], state: &FilterState) -> ChainResult {
    let mut view = dataset.all_indices();
    let mut options = BTreeMap::new();

    for spec in filters {
        if spec.kind == FilterKind::Categorical {
            options.insert(spec.column.to_string(), offered_options(dataset, spec, &view));
        }
        view = apply_filter(dataset, &view, spec, state);
        log::debug!("filter '{}': {} records remain", spec.column, view.len());
    }

    ChainResult {
        indices: view,
        options,
    }
}

fn offered_options(dataset: &Dataset, spec: &FilterSpec, view: &[usize]) -> Vec<String> {
    if spec.sort_as_text {
        dataset.distinct_text_keys(spec.column, view)
    } else {
        dataset.distinct_keys(spec.column, view)
    }
}

/// Walk the chain and drop every categorical pick that its control no
/// longer offers, so hidden picks never filter. Returns whether the state
/// changed.
pub fn reconcile_picks(dataset: &Dataset, filters: &[FilterSpec], state: &mut FilterState) -> bool {
    let mut view = dataset.all_indices();
    let mut changed = false;

    for spec in filters {
        if spec.kind == FilterKind::Categorical {
            if let Some(select) = state.categorical.get_mut(spec.column) {
                if !select.picked.is_empty() {
                    let offered = offered_options(dataset, spec, &view);
                    if select.retain_offered(&offered) {
                        log::debug!("filter '{}': dropped picks no longer offered", spec.column);
                        changed = true;
                    }
                }
            }
        }
        view = apply_filter(dataset, &view, spec, state);
    }
    changed
}

/// Return indices of records that pass all active filters.
pub fn filtered_indices(dataset: &Dataset, state: &FilterState) -> Vec<usize> {
    run_chain(dataset, &active_filters(dataset), state).indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::test_support::*;
    use crate::data::model::CellValue;

    fn sample() -> Dataset {
        Dataset::from_records(vec![
            record(&[
                (columns::REQUEST_DATE, date(2024, 1, 10)),
                (columns::PROVIDER, text("Lab A")),
                (columns::PROCEDURE_CODE, CellValue::Integer(40304361)),
            ]),
            record(&[
                (columns::REQUEST_DATE, date(2024, 2, 15)),
                (columns::PROVIDER, text("Lab B")),
                (columns::PROCEDURE_CODE, CellValue::Float(40302040.0)),
            ]),
            record(&[
                (columns::REQUEST_DATE, CellValue::Null),
                (columns::PROVIDER, text("Lab A")),
                (columns::PROCEDURE_CODE, CellValue::Integer(40302040)),
            ]),
            record(&[
                (columns::REQUEST_DATE, date(2024, 3, 1)),
                (columns::PROVIDER, text("Lab C")),
                (columns::PROCEDURE_CODE, CellValue::String("40304361".into())),
            ]),
        ])
    }

    fn only(keys: &[&str]) -> MultiSelect {
        MultiSelect {
            include_all: false,
            picked: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn absent_columns_are_not_declared() {
        let cols: Vec<_> = active_filters(&sample()).iter().map(|f| f.column).collect();
        assert_eq!(
            cols,
            vec![columns::REQUEST_DATE, columns::PROVIDER, columns::PROCEDURE_CODE]
        );
    }

    #[test]
    fn fresh_state_passes_records_with_request_date() {
        let ds = sample();
        let state = FilterState::for_dataset(&ds);
        // The default range covers every dated record but not the null one.
        assert_eq!(filtered_indices(&ds, &state), vec![0, 1, 3]);
    }

    #[test]
    fn categorical_selection_keeps_matching_rows() {
        let ds = sample();
        let mut state = FilterState::default();
        state
            .categorical
            .insert(columns::PROVIDER.to_string(), only(&["Lab A"]));
        assert_eq!(filtered_indices(&ds, &state), vec![0, 2]);
    }

    #[test]
    fn sentinel_with_specific_values_is_a_noop() {
        let ds = sample();
        let mut state = FilterState::default();
        let mut select = only(&["Lab B"]);
        select.include_all = true;
        state
            .categorical
            .insert(columns::PROVIDER.to_string(), select);
        assert_eq!(filtered_indices(&ds, &state), vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_selection_keeps_nothing() {
        let ds = sample();
        let mut state = FilterState::default();
        state
            .categorical
            .insert(columns::PROVIDER.to_string(), only(&[]));
        assert!(filtered_indices(&ds, &state).is_empty());
    }

    #[test]
    fn procedure_code_compares_by_string_form() {
        let ds = sample();
        let mut state = FilterState::default();
        state
            .categorical
            .insert(columns::PROCEDURE_CODE.to_string(), only(&["40302040"]));
        assert_eq!(filtered_indices(&ds, &state), vec![1, 2]);
    }

    #[test]
    fn date_range_is_inclusive() {
        let ds = sample();
        let state = FilterState {
            date_range: DateRange::new(
                NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            ),
            ..FilterState::default()
        };
        assert_eq!(filtered_indices(&ds, &state), vec![1, 3]);
    }

    #[test]
    fn single_endpoint_range_is_not_applied() {
        let ds = sample();
        let state = FilterState {
            date_range: DateRange {
                start: NaiveDate::from_ymd_opt(2024, 3, 1),
                end: None,
            },
            ..FilterState::default()
        };
        assert_eq!(filtered_indices(&ds, &state), vec![0, 1, 2, 3]);
    }

    #[test]
    fn reversed_range_is_swapped() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        let (a, b) = range.bounds().unwrap();
        assert!(a < b);
    }

    #[test]
    fn options_cascade_from_earlier_filters() {
        let ds = sample();
        let mut state = FilterState::default();
        state
            .categorical
            .insert(columns::PROVIDER.to_string(), only(&["Lab C"]));
        let result = run_chain(&ds, &active_filters(&ds), &state);
        assert_eq!(
            result.options[columns::PROVIDER],
            vec!["Lab A", "Lab B", "Lab C"]
        );
        assert_eq!(result.options[columns::PROCEDURE_CODE], vec!["40304361"]);
    }

    #[test]
    fn picks_outside_the_cascaded_options_are_dropped() {
        let ds = Dataset::from_records(vec![
            record(&[
                (columns::PROVIDER, text("Lab A")),
                (columns::USER_NAME, text("Ana")),
            ]),
            record(&[
                (columns::PROVIDER, text("Lab B")),
                (columns::USER_NAME, text("Bia")),
            ]),
        ]);
        let filters = active_filters(&ds);
        let mut state = FilterState::default();
        state
            .categorical
            .insert(columns::PROVIDER.to_string(), only(&["Lab A"]));
        state
            .categorical
            .insert(columns::USER_NAME.to_string(), only(&["Ana"]));
        assert!(!reconcile_picks(&ds, &filters, &mut state));
        assert_eq!(filtered_indices(&ds, &state), vec![0]);

        state
            .categorical
            .insert(columns::PROVIDER.to_string(), only(&["Lab B"]));
        assert!(reconcile_picks(&ds, &filters, &mut state));
        let user = &state.categorical[columns::USER_NAME];
        assert!(user.include_all);
        assert!(user.picked.is_empty());

        let result = run_chain(&ds, &filters, &state);
        assert_eq!(result.options[columns::USER_NAME], vec!["Bia"]);
        assert_eq!(result.indices, vec![1]);
    }

    #[test]
    fn retain_offered_keeps_remaining_picks() {
        let mut select = only(&["a", "b"]);
        assert!(select.retain_offered(&["b".to_string(), "c".to_string()]));
        assert!(!select.include_all);
        assert_eq!(select.picked.len(), 1);
        assert!(select.picked.contains("b"));
        assert!(!select.retain_offered(&["b".to_string()]));
    }

    #[test]
    fn multiselect_toggle_round_trips() {
        let mut select = MultiSelect::default();
        select.toggle("x");
        assert!(select.picked.contains("x"));
        select.toggle("x");
        assert!(select.picked.is_empty());
        assert_eq!(select.selection(), Selection::All);
    }
}
