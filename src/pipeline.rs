use std::collections::BTreeMap;

use crate::data::aggregate::{self, DistributionGroup, TimeSeries, TopNBounds, Totals};
use crate::data::filter::{self, FilterSpec, FilterState};
use crate::data::model::{columns, Dataset};
use crate::data::period::Granularity;

// ---------------------------------------------------------------------------
// Inputs read from the widgets on every recompute
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardInputs {
    pub filters: FilterState,
    pub ranking_top_n: usize,
    pub distribution_top_n: usize,
    pub request_granularity: Granularity,
    pub execution_granularity: Granularity,
    /// Columns shown in the table; aggregations ignore this.
    pub visible_columns: Vec<String>,
}

impl DashboardInputs {
    /// Defaults for a freshly loaded dataset.
    pub fn for_dataset(dataset: &Dataset, ranking: TopNBounds, distribution: TopNBounds) -> Self {
        DashboardInputs {
            filters: FilterState::for_dataset(dataset),
            ranking_top_n: ranking.clamp(ranking.default),
            distribution_top_n: distribution.clamp(distribution.default),
            request_granularity: Granularity::Day,
            execution_granularity: Granularity::Day,
            visible_columns: dataset.column_names.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Everything the display layer draws
// ---------------------------------------------------------------------------

/// Output of one recompute. `None` means the section is not shown because a
/// required column is missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardOutput {
    pub active_filters: Vec<FilterSpec>,
    /// Options of each categorical control, after the filters before it.
    pub options: BTreeMap<String, Vec<String>>,
    pub visible: Vec<usize>,
    pub totals: Option<Totals>,
    pub ranking: Option<Vec<(String, usize)>>,
    pub request_trend: Option<TimeSeries>,
    pub execution_trend: Option<TimeSeries>,
    pub distribution: Option<Vec<DistributionGroup>>,
}

/// Run the filter chain and every aggregation over `dataset`.
pub fn recompute(dataset: &Dataset, inputs: &DashboardInputs) -> DashboardOutput {
    let active_filters = filter::active_filters(dataset);
    let chain = filter::run_chain(dataset, &active_filters, &inputs.filters);
    let view = &chain.indices;

    let output = DashboardOutput {
        totals: aggregate::totals(dataset, view),
        ranking: aggregate::top_n(
            dataset,
            view,
            columns::PROCEDURE_NAME,
            inputs.ranking_top_n,
        ),
        request_trend: aggregate::time_counts(
            dataset,
            view,
            columns::REQUEST_DATE,
            inputs.request_granularity,
        ),
        execution_trend: aggregate::time_counts(
            dataset,
            view,
            columns::EXECUTION_DATE,
            inputs.execution_granularity,
        ),
        distribution: aggregate::value_distribution(dataset, view, inputs.distribution_top_n),
        active_filters,
        options: chain.options,
        visible: chain.indices,
    };
    log::debug!(
        "recompute: {} of {} records visible",
        output.visible.len(),
        dataset.len()
    );
    output
}
