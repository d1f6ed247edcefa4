use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::cache::{DatasetCache, SourceKey};
use crate::data::filter;
use crate::data::loader::load_source;
use crate::data::model::Dataset;
use crate::data::projection::{project, write_csv, Table};
use crate::pipeline::{recompute, DashboardInputs, DashboardOutput};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Datasets loaded so far, keyed by (path, sheet).
    pub cache: DatasetCache,

    /// Source currently shown.
    pub source: Option<SourceKey>,

    /// Loaded dataset (None until a source loads with at least one record).
    pub dataset: Option<Arc<Dataset>>,

    /// Widget values fed to the pipeline.
    pub inputs: Option<DashboardInputs>,

    /// Result of the last recompute.
    pub output: DashboardOutput,

    /// Colours of the procedures in the distribution chart.
    pub color_map: Option<ColorMap>,

    /// Set by widgets; cleared by the next recompute.
    pub dirty: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            cache: DatasetCache::new(),
            source: None,
            dataset: None,
            inputs: None,
            output: DashboardOutput::default(),
            color_map: None,
            dirty: false,
            status_message: None,
        }
    }

    /// Load `path` through the cache and make it the current dataset.
    /// A load error and an empty table both leave the dashboard without data.
    pub fn open(&mut self, path: &Path) {
        let key = SourceKey::new(path, &self.config.sheet);
        match self
            .cache
            .get_or_load(key.clone(), |k| load_source(&k.path, &k.sheet))
        {
            Ok(dataset) if dataset.is_empty() => {
                log::warn!("{} has no records", path.display());
                self.clear_dataset();
                self.status_message =
                    Some("Nenhum dado foi carregado. Verifique o arquivo de entrada.".to_string());
            }
            Ok(dataset) => {
                log::info!(
                    "showing {} records with columns {:?}",
                    dataset.len(),
                    dataset.column_names
                );
                self.source = Some(key);
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("failed to load {}: {e}", path.display());
                self.clear_dataset();
                self.status_message = Some(format!("Erro ao carregar os dados: {e}"));
            }
        }
    }

    /// Drop the cached copy of the current source and read it again.
    pub fn reload(&mut self) {
        if let Some(key) = self.source.clone() {
            self.cache.invalidate(&key);
            self.open(&key.path);
        }
    }

    /// Ingest a newly loaded dataset and reset every control.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.inputs = Some(DashboardInputs::for_dataset(
            &dataset,
            self.config.ranking_top_n,
            self.config.distribution_top_n,
        ));
        self.dataset = Some(dataset);
        self.status_message = None;
        self.refresh();
    }

    fn clear_dataset(&mut self) {
        self.source = None;
        self.dataset = None;
        self.inputs = None;
        self.output = DashboardOutput::default();
        self.color_map = None;
        self.dirty = false;
    }

    /// Rerun the pipeline if a widget changed since the last frame.
    pub fn refresh_if_dirty(&mut self) {
        if self.dirty {
            self.refresh();
        }
    }

    /// Recompute the filtered view and all aggregations.
    pub fn refresh(&mut self) {
        self.dirty = false;
        let (Some(ds), Some(inputs)) = (&self.dataset, &mut self.inputs) else {
            return;
        };
        filter::reconcile_picks(ds, &filter::active_filters(ds), &mut inputs.filters);
        self.output = recompute(ds, inputs);
        self.color_map = self
            .output
            .distribution
            .as_ref()
            .map(|groups| ColorMap::new(groups.iter().map(|g| g.procedure.as_str())));
    }

    /// Visible records projected onto the selected columns.
    pub fn table(&self) -> Option<Table> {
        let ds = self.dataset.as_ref()?;
        let inputs = self.inputs.as_ref()?;
        Some(project(ds, &self.output.visible, &inputs.visible_columns))
    }

    /// First `limit` visible records, for the on-screen table.
    pub fn table_preview(&self, limit: usize) -> Option<Table> {
        let ds = self.dataset.as_ref()?;
        let inputs = self.inputs.as_ref()?;
        let shown = &self.output.visible[..self.output.visible.len().min(limit)];
        Some(project(ds, shown, &inputs.visible_columns))
    }

    /// Write the projected view to `path` as CSV. Returns the row count.
    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        let table = self.table().context("no dataset loaded")?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        write_csv(&table, file).context("writing CSV")?;
        log::info!("exported {} rows to {}", table.rows.len(), path.display());
        Ok(table.rows.len())
    }
}
