use std::io::Write;

use super::model::Dataset;

/// Visible records rendered as strings, restricted to the chosen columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Project `view` onto `selected`, keeping source column order.
/// Names that are not dataset columns are ignored.
pub fn project(dataset: &Dataset, view: &[usize], selected: &[String]) -> Table {
    let headers: Vec<String> = dataset
        .column_names
        .iter()
        .filter(|c| selected.contains(c))
        .cloned()
        .collect();
    let rows = view
        .iter()
        .map(|&i| {
            let rec = &dataset.records[i];
            headers
                .iter()
                .map(|h| {
                    let cell = rec.get(h);
                    if cell.is_null() {
                        String::new()
                    } else {
                        cell.to_string()
                    }
                })
                .collect()
        })
        .collect();
    Table { headers, rows }
}

/// Write `table` as CSV with a header row.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> csv::Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(&table.headers)?;
    for row in &table.rows {
        out.write_record(row)?;
    }
    out.flush()?;
    Ok(())
}
