use chrono::{Datelike, NaiveDate};
use eframe::egui::{self, Color32, RichText, Stroke, Ui};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Line, Plot, PlotPoints, Points};

use crate::color::{magnitude_color, ColorMap};
use crate::data::aggregate::{DistributionGroup, DistributionPoint, TimeSeries, TopNBounds, Totals};
use crate::data::period::Granularity;

// ---------------------------------------------------------------------------
// Summary metrics
// ---------------------------------------------------------------------------

pub fn summary(ui: &mut Ui, totals: &Totals) {
    ui.heading("Resumo de Valores");
    ui.columns(2, |cols| {
        metric(&mut cols[0], "Valor Total (R$)", &group_thousands(totals.total_value, 2));
        let quantity = if totals.quantity.fract() == 0.0 {
            group_thousands(totals.quantity, 0)
        } else {
            group_thousands(totals.quantity, 2)
        };
        metric(&mut cols[1], "Procedimentos Realizados", &quantity);
    });
}

fn metric(ui: &mut Ui, label: &str, value: &str) {
    ui.label(RichText::new(label).weak());
    ui.label(RichText::new(value).size(28.0).strong());
}

/// `1234567.891` with 2 decimals → `1,234,567.89`.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

// ---------------------------------------------------------------------------
// Top-N ranking (horizontal bars)
// ---------------------------------------------------------------------------

pub fn top_n_slider(ui: &mut Ui, label: &str, value: &mut usize, bounds: TopNBounds) -> bool {
    ui.add(egui::Slider::new(value, bounds.min..=bounds.max).text(label))
        .changed()
}

pub fn ranking_chart(ui: &mut Ui, ranking: &[(String, usize)], n: usize) {
    ui.label(RichText::new(format!("Top {n} Procedimentos Mais Realizados")).strong());
    if ranking.is_empty() {
        ui.label("Nenhum procedimento no filtro atual.");
        return;
    }

    let max = ranking.iter().map(|(_, c)| *c).max().unwrap_or(1).max(1) as f64;
    let len = ranking.len();
    // Highest count at the top of the chart.
    let bars: Vec<Bar> = ranking
        .iter()
        .enumerate()
        .map(|(i, (name, count))| {
            Bar::new((len - 1 - i) as f64, *count as f64)
                .name(name)
                .fill(magnitude_color(*count as f64 / max))
                .width(0.8)
        })
        .collect();

    let labels: Vec<String> = ranking.iter().map(|(name, _)| shorten(name, 40)).collect();
    Plot::new("ranking_chart")
        .height(600.0)
        .allow_drag(false)
        .allow_scroll(false)
        .x_axis_label("Quantidade")
        .y_axis_min_width(180.0)
        .y_axis_formatter(move |mark, _range| {
            index_label(&labels, mark.value, true)
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal().name("Quantidade"));
        });
}

/// Label of the bar at axis position `value`; `reversed` when the first
/// entry is drawn at the highest position.
fn index_label(labels: &[String], value: f64, reversed: bool) -> String {
    if value < 0.0 || value.fract() != 0.0 {
        return String::new();
    }
    let pos = value as usize;
    if pos >= labels.len() {
        return String::new();
    }
    let idx = if reversed { labels.len() - 1 - pos } else { pos };
    labels[idx].clone()
}

fn shorten(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

// ---------------------------------------------------------------------------
// Time trends
// ---------------------------------------------------------------------------

pub fn granularity_selector(ui: &mut Ui, label: &str, value: &mut Granularity) -> bool {
    let before = *value;
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        for g in Granularity::ALL {
            ui.radio_value(value, g, g.label());
        }
    });
    *value != before
}

fn day_number(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

fn date_from_day_number(value: f64) -> Option<NaiveDate> {
    if value.fract() != 0.0 || value < 1.0 || value > f64::from(i32::MAX) {
        return None;
    }
    NaiveDate::from_num_days_from_ce_opt(value as i32)
}

/// Line chart of record counts per period. The null bucket is reported as
/// text since it has no position on a date axis.
pub fn trend_chart(ui: &mut Ui, id: &str, title: &str, series: &TimeSeries, y_label: &str) {
    ui.label(RichText::new(title).strong());
    let undated: usize = series
        .iter()
        .filter(|(bucket, _)| bucket.is_none())
        .map(|(_, count)| *count)
        .sum();
    if undated > 0 {
        ui.label(RichText::new(format!("Sem data: {undated} registros")).weak());
    }

    let points: Vec<[f64; 2]> = series
        .iter()
        .filter_map(|(bucket, count)| bucket.map(|d| [day_number(d), *count as f64]))
        .collect();
    if points.is_empty() {
        ui.label("Sem dados para o período.");
        return;
    }

    let y_label = y_label.to_string();
    Plot::new(id)
        .height(320.0)
        .y_axis_label(y_label.clone())
        .x_axis_formatter(|mark, _range| {
            date_from_day_number(mark.value)
                .map(|d| d.format("%d/%m/%Y").to_string())
                .unwrap_or_default()
        })
        .label_formatter(move |_name, value| {
            match date_from_day_number(value.x.round()) {
                Some(d) => format!("{}\n{y_label}: {:.0}", d.format("%d/%m/%Y"), value.y),
                None => String::new(),
            }
        })
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(PlotPoints::from(points.clone()))
                    .name(title)
                    .width(2.5),
            );
            plot_ui.points(Points::new(PlotPoints::from(points)).radius(3.5));
        });
}

// ---------------------------------------------------------------------------
// Value distribution (box plot)
// ---------------------------------------------------------------------------

/// Five-number summary drawn by a box: whiskers at the most extreme values
/// within 1.5 IQR of the quartiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiveNumbers {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
}

/// Linear-interpolated quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn five_numbers(values: &[f64]) -> Option<FiveNumbers> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q1 = quantile(&sorted, 0.25);
    let median = quantile(&sorted, 0.5);
    let q3 = quantile(&sorted, 0.75);
    let fence = 1.5 * (q3 - q1);
    let lower_whisker = sorted
        .iter()
        .copied()
        .find(|v| *v >= q1 - fence)
        .unwrap_or(q1);
    let upper_whisker = sorted
        .iter()
        .rev()
        .copied()
        .find(|v| *v <= q3 + fence)
        .unwrap_or(q3);
    Some(FiveNumbers {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
    })
}

/// Scatter positions of a group's values beside its box at `x`, spread to
/// reduce overlap.
fn scatter_positions(x: f64, values: &[f64]) -> Vec<[f64; 2]> {
    let n = values.len().max(1) as f64;
    values
        .iter()
        .enumerate()
        .map(|(j, v)| [x - 0.45 + 0.1 * (j as f64 / n), *v])
        .collect()
}

/// Index of the position closest to `target`.
fn nearest(positions: &[[f64; 2]], target: [f64; 2]) -> Option<usize> {
    positions
        .iter()
        .map(|p| (p[0] - target[0]).powi(2) + (p[1] - target[1]).powi(2))
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

fn hover_text(procedure: &str, point: &DistributionPoint) -> String {
    let authorization = point.authorization.as_deref().unwrap_or("-");
    let requested = point
        .request_date
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{procedure}\nValor Total: {}\nNúmero Autorização: {authorization}\nData Requisição: {requested}",
        group_thousands(point.value, 2)
    )
}

pub fn distribution_chart(ui: &mut Ui, groups: &[DistributionGroup], colors: Option<&ColorMap>) {
    ui.label(RichText::new("Distribuição de Valores por Procedimento").strong());
    if groups.iter().all(|g| g.points.is_empty()) {
        ui.label("Nenhum valor no filtro atual.");
        return;
    }

    let color_of = |name: &str| {
        colors
            .map(|c| c.color_for(name))
            .unwrap_or(Color32::LIGHT_BLUE)
    };

    // Per group: name, scatter positions and the hover text of each record.
    let layout: Vec<(String, Vec<[f64; 2]>, Vec<String>)> = groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let values: Vec<f64> = group.points.iter().map(|p| p.value).collect();
            let texts = group
                .points
                .iter()
                .map(|p| hover_text(&group.procedure, p))
                .collect();
            (group.procedure.clone(), scatter_positions(i as f64, &values), texts)
        })
        .collect();
    let hover = layout.clone();

    let labels: Vec<String> = groups.iter().map(|g| shorten(&g.procedure, 24)).collect();
    Plot::new("distribution_chart")
        .height(600.0)
        .x_axis_label("Procedimento")
        .y_axis_label("Valor Total")
        .x_axis_formatter(move |mark, _range| index_label(&labels, mark.value, false))
        .label_formatter(move |name, value| {
            hover
                .iter()
                .find(|(procedure, _, _)| procedure == name)
                .and_then(|(_, positions, texts)| {
                    nearest(positions, [value.x, value.y]).map(|i| texts[i].clone())
                })
                .unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            for (i, (group, (_, positions, _))) in groups.iter().zip(&layout).enumerate() {
                let values: Vec<f64> = group.points.iter().map(|p| p.value).collect();
                let Some(stats) = five_numbers(&values) else {
                    continue;
                };
                let color = color_of(&group.procedure);
                let elem = BoxElem::new(
                    i as f64,
                    BoxSpread::new(
                        stats.lower_whisker,
                        stats.q1,
                        stats.median,
                        stats.q3,
                        stats.upper_whisker,
                    ),
                )
                .name(&group.procedure)
                .box_width(0.6)
                .fill(color.gamma_multiply(0.4))
                .stroke(Stroke::new(1.5, color));
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(&group.procedure));

                plot_ui.points(
                    Points::new(PlotPoints::from(positions.clone()))
                        .name(&group.procedure)
                        .color(color)
                        .radius(2.0),
                );
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0.0, 2), "0.00");
        assert_eq!(group_thousands(0.0, 0), "0");
        assert_eq!(group_thousands(1234567.891, 2), "1,234,567.89");
        assert_eq!(group_thousands(999.0, 0), "999");
        assert_eq!(group_thousands(-1500.5, 2), "-1,500.50");
    }

    #[test]
    fn five_numbers_match_linear_quartiles() {
        let stats = five_numbers(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.q3, 4.0);
        assert_eq!(stats.lower_whisker, 1.0);
        // 100 is an outlier beyond q3 + 1.5 * IQR = 7.
        assert_eq!(stats.upper_whisker, 4.0);
        assert!(five_numbers(&[]).is_none());
    }

    #[test]
    fn single_value_collapses_the_box() {
        let stats = five_numbers(&[7.5]).unwrap();
        assert_eq!(stats.q1, 7.5);
        assert_eq!(stats.upper_whisker, 7.5);
    }

    #[test]
    fn axis_labels_only_on_integral_positions() {
        let labels = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(index_label(&labels, 0.0, true), "C");
        assert_eq!(index_label(&labels, 2.0, true), "A");
        assert_eq!(index_label(&labels, 1.0, false), "B");
        assert_eq!(index_label(&labels, 0.5, false), "");
        assert_eq!(index_label(&labels, 3.0, false), "");
    }

    #[test]
    fn day_numbers_round_trip_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_eq!(date_from_day_number(day_number(d)), Some(d));
        assert_eq!(date_from_day_number(10.5), None);
    }

    #[test]
    fn hover_shows_authorization_and_request_date() {
        let point = DistributionPoint {
            value: 1234.5,
            authorization: Some("900123".to_string()),
            request_date: NaiveDate::from_ymd_opt(2024, 3, 5).and_then(|d| d.and_hms_opt(8, 30, 0)),
        };
        assert_eq!(
            hover_text("Glicose", &point),
            "Glicose\nValor Total: 1,234.50\nNúmero Autorização: 900123\nData Requisição: 05/03/2024"
        );
        let bare = DistributionPoint {
            value: 4.0,
            authorization: None,
            request_date: None,
        };
        assert!(hover_text("Glicose", &bare).ends_with("Número Autorização: -\nData Requisição: -"));
    }

    #[test]
    fn hover_picks_the_nearest_record() {
        let positions = scatter_positions(1.0, &[10.0, 50.0, 12.0]);
        assert_eq!(positions.len(), 3);
        assert!(positions.iter().all(|p| p[0] < 1.0 && p[0] >= 0.55));
        assert_eq!(nearest(&positions, [0.6, 49.0]), Some(1));
        assert_eq!(nearest(&positions, [0.6, 11.9]), Some(2));
        assert_eq!(nearest(&[], [0.0, 0.0]), None);
    }

    #[test]
    fn shorten_keeps_short_names() {
        assert_eq!(shorten("Hemograma", 40), "Hemograma");
        assert_eq!(shorten("abcdef", 4), "abc…");
    }
}
