use eframe::egui::{RichText, ScrollArea, Ui};

use crate::state::AppState;
use crate::ui::{charts, table};

// ---------------------------------------------------------------------------
// Central page: table, metrics and charts
// ---------------------------------------------------------------------------

/// Render every dashboard section whose columns are present.
/// Controls write to `inputs` and mark the state dirty; charts read the
/// output of the previous recompute.
pub fn central_page(ui: &mut Ui, state: &mut AppState) {
    if state.dataset.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Nenhum dado foi carregado. Abra um arquivo (Arquivo → Abrir…)");
        });
        return;
    }

    let preview = state.table_preview(state.config.table_row_limit);
    let AppState {
        config,
        inputs: Some(inputs),
        output,
        color_map,
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
            ui.heading("📊 Dashboard Laboratorial");
            ui.label("Visualizações interativas dos dados laboratoriais");
            ui.separator();

            if let Some(preview) = &preview {
                table::data_table(ui, preview, output.visible.len());
                ui.separator();
            }

            if let Some(totals) = &output.totals {
                charts::summary(ui, totals);
                ui.separator();
            }

            if let Some(ranking) = &output.ranking {
                ui.heading("Top Procedimentos");
                changed |= charts::top_n_slider(
                    ui,
                    "Selecione quantos procedimentos mostrar",
                    &mut inputs.ranking_top_n,
                    config.ranking_top_n,
                );
                charts::ranking_chart(ui, ranking, inputs.ranking_top_n);
                ui.separator();
            }

            if let Some(series) = &output.execution_trend {
                ui.heading("Tendência por Data de Execução");
                changed |= charts::granularity_selector(
                    ui,
                    "Agrupar Execuções por:",
                    &mut inputs.execution_granularity,
                );
                charts::trend_chart(
                    ui,
                    "execution_trend",
                    &format!("Execuções por {}", inputs.execution_granularity),
                    series,
                    "Número de Execuções",
                );
                ui.separator();
            }

            if let Some(series) = &output.request_trend {
                ui.heading("Evolução Temporal");
                changed |= charts::granularity_selector(
                    ui,
                    "Agrupar por:",
                    &mut inputs.request_granularity,
                );
                charts::trend_chart(
                    ui,
                    "request_trend",
                    &format!("Requisição por {}", inputs.request_granularity),
                    series,
                    "Número de Procedimentos",
                );
                ui.separator();
            }

            if let Some(groups) = &output.distribution {
                ui.heading("Distribuição de Valores por Procedimento");
                changed |= charts::top_n_slider(
                    ui,
                    "Selecione quantos procedimentos analisar",
                    &mut inputs.distribution_top_n,
                    config.distribution_top_n,
                );
                charts::distribution_chart(ui, groups, color_map.as_ref());
                ui.separator();
            }

            ui.label(RichText::new("Dashboard laboratorial desenvolvido com egui").weak());
        });

    if changed {
        *dirty = true;
    }
}
