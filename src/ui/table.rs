use eframe::egui::{RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::projection::Table;

/// Striped, scrollable preview of the projected view.
pub fn data_table(ui: &mut Ui, table: &Table, total_rows: usize) {
    if table.headers.is_empty() {
        ui.label("Nenhuma coluna selecionada.");
        return;
    }
    if table.rows.len() < total_rows {
        ui.label(
            RichText::new(format!(
                "Mostrando {} de {} registros (exporte para ver todos)",
                table.rows.len(),
                total_rows
            ))
            .weak(),
        );
    }

    ui.push_id("data_table", |ui: &mut Ui| {
        ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .max_scroll_height(360.0)
                .columns(Column::auto().at_least(80.0).clip(true), table.headers.len())
                .header(22.0, |mut header| {
                    for h in &table.headers {
                        header.col(|ui: &mut Ui| {
                            ui.strong(h);
                        });
                    }
                })
                .body(|body| {
                    body.rows(18.0, table.rows.len(), |mut row| {
                        let cells = &table.rows[row.index()];
                        for cell in cells {
                            row.col(|ui: &mut Ui| {
                                ui.label(cell);
                            });
                        }
                    });
                });
        });
    });
}
