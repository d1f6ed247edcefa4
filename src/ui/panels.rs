use chrono::NaiveDate;
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::filter::{DateRange, FilterKind, MultiSelect, ALL_LABEL};
use crate::data::loader::{CSV_EXTENSIONS, PARQUET_EXTENSIONS, SPREADSHEET_EXTENSIONS};
use crate::data::model::Dataset;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filtros Interativos");
    ui.separator();

    let Some(dataset) = state.dataset.clone() else {
        ui.label("Nenhum dado carregado.");
        return;
    };
    let AppState {
        inputs: Some(inputs),
        output,
        dirty,
        ..
    } = state
    else {
        return;
    };

    let mut changed = false;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for spec in &output.active_filters {
                match spec.kind {
                    FilterKind::DateRange => {
                        changed |= date_range_filter(
                            ui,
                            &dataset,
                            spec.column,
                            &mut inputs.filters.date_range,
                        );
                    }
                    FilterKind::Categorical => {
                        let options = output
                            .options
                            .get(spec.column)
                            .map(Vec::as_slice)
                            .unwrap_or(&[]);
                        let select = inputs
                            .filters
                            .categorical
                            .entry(spec.column.to_string())
                            .or_default();
                        changed |= categorical_filter(ui, spec.column, options, select);
                    }
                }
            }

            ui.separator();
            changed |= column_selector(ui, &dataset.column_names, &mut inputs.visible_columns);
        });

    if changed {
        *dirty = true;
    }
}

/// Start / end pickers over the request date. Clearing one endpoint
/// switches the filter off.
fn date_range_filter(ui: &mut Ui, dataset: &Dataset, column: &str, range: &mut DateRange) -> bool {
    ui.strong("Selecione o período");
    let Some((min, max)) = dataset.date_bounds(column) else {
        ui.label("Sem datas válidas.");
        return false;
    };

    let before = *range;
    ui.horizontal(|ui: &mut Ui| {
        date_endpoint(ui, "Início", "period_start", &mut range.start, min);
    });
    ui.horizontal(|ui: &mut Ui| {
        date_endpoint(ui, "Fim", "period_end", &mut range.end, max);
    });
    if range.bounds().is_none() {
        ui.label(RichText::new("Período incompleto: filtro desativado").weak());
    }
    if ui.small_button("Período completo").clicked() {
        *range = DateRange::new(min, max);
    }
    ui.separator();
    *range != before
}

fn date_endpoint(
    ui: &mut Ui,
    label: &str,
    id: &str,
    value: &mut Option<NaiveDate>,
    fallback: NaiveDate,
) {
    ui.label(label);
    let mut clear = false;
    if let Some(date) = value.as_mut() {
        ui.add(DatePickerButton::new(date).id_salt(id));
        clear = ui.small_button("✕").on_hover_text("Limpar").clicked();
    } else if ui.small_button("definir").clicked() {
        *value = Some(fallback);
    }
    if clear {
        *value = None;
    }
}

/// Multi-select with the "Todos" sentinel on top.
fn categorical_filter(ui: &mut Ui, column: &str, options: &[String], select: &mut MultiSelect) -> bool {
    let before = select.clone();

    let summary = if select.include_all {
        ALL_LABEL.to_string()
    } else {
        format!("{}/{}", select.picked.len(), options.len())
    };
    let header_text = format!("Filtrar por {column}  ({summary})");

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(column)
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.checkbox(&mut select.include_all, ALL_LABEL);
            ScrollArea::vertical()
                .id_salt(column)
                .max_height(220.0)
                .show(ui, |ui: &mut Ui| {
                    for opt in options {
                        let mut checked = select.picked.contains(opt);
                        let label = if opt.is_empty() { "(vazio)" } else { opt.as_str() };
                        if ui.checkbox(&mut checked, label).changed() {
                            select.toggle(opt);
                        }
                    }
                });
        });

    *select != before
}

/// Which columns the table shows. Does not affect the charts.
fn column_selector(ui: &mut Ui, columns: &[String], visible: &mut Vec<String>) -> bool {
    let mut changed = false;
    egui::CollapsingHeader::new(RichText::new("Colunas exibidas na tabela").strong())
        .id_salt("visible_columns")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("Todas").clicked() {
                    *visible = columns.to_vec();
                    changed = true;
                }
                if ui.small_button("Nenhuma").clicked() {
                    visible.clear();
                    changed = true;
                }
            });
            for col in columns {
                let mut checked = visible.contains(col);
                if ui.checkbox(&mut checked, col).changed() {
                    if checked {
                        visible.push(col.clone());
                    } else {
                        visible.retain(|c| c != col);
                    }
                    changed = true;
                }
            }
        });
    changed
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("Arquivo", |ui: &mut Ui| {
            if ui.button("Abrir…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.source.is_some(), egui::Button::new("Recarregar"))
                .clicked()
            {
                state.reload();
                ui.close_menu();
            }
            if ui
                .add_enabled(state.dataset.is_some(), egui::Button::new("Exportar CSV…"))
                .clicked()
            {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} registros carregados, {} visíveis",
                ds.len(),
                state.output.visible.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let supported: Vec<&str> = SPREADSHEET_EXTENSIONS
        .iter()
        .chain(&CSV_EXTENSIONS)
        .chain(&PARQUET_EXTENSIONS)
        .copied()
        .collect();
    let file = rfd::FileDialog::new()
        .set_title("Abrir dados laboratoriais")
        .add_filter("Arquivos suportados", &supported[..])
        .add_filter("Planilhas", &SPREADSHEET_EXTENSIONS)
        .add_filter("CSV", &CSV_EXTENSIONS)
        .add_filter("Parquet", &PARQUET_EXTENSIONS)
        .pick_file();

    if let Some(path) = file {
        state.open(&path);
    }
}

fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Exportar dados filtrados")
        .set_file_name("dados_filtrados.csv")
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        match state.export_csv(&path) {
            Ok(rows) => {
                state.status_message = None;
                log::info!("export finished: {rows} rows");
            }
            Err(e) => {
                log::error!("export failed: {e:#}");
                state.status_message = Some(format!("Erro ao exportar: {e:#}"));
            }
        }
    }
}
