use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int32Type, Int64Type, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use calamine::{open_workbook_auto, Data, DataType as _, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::error::LoadError;
use super::model::{columns, CellValue, Dataset, Record};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

pub const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];
pub const CSV_EXTENSIONS: [&str; 1] = ["csv"];
pub const PARQUET_EXTENSIONS: [&str; 2] = ["parquet", "pq"];

/// Load a dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – the sheet named `sheet`, first row is the header
/// * `.csv`     – header row, `,` or `;` separated
/// * `.parquet` / `.pq` – every column becomes a record attribute
///
/// The request and execution date columns are coerced to timestamps;
/// cells that do not parse become `Null`.
pub fn load_source(path: &Path, sheet: &str) -> Result<Dataset, LoadError> {
    let started = Instant::now();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let ext = ext.as_str();
    let mut dataset = if SPREADSHEET_EXTENSIONS.contains(&ext) {
        load_spreadsheet(path, sheet)?
    } else if CSV_EXTENSIONS.contains(&ext) {
        load_csv(path)?
    } else if PARQUET_EXTENSIONS.contains(&ext) {
        load_parquet(path)?
    } else {
        return Err(LoadError::UnsupportedExtension(ext.to_string()));
    };
    coerce_date_columns(&mut dataset);

    log::info!(
        "loaded {} records with {} columns from {} in {:?}",
        dataset.len(),
        dataset.column_names.len(),
        path.display(),
        started.elapsed()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Header handling
// ---------------------------------------------------------------------------

/// Blank headers get a positional name; repeated ones get a `.N` suffix.
fn header_names<I: IntoIterator<Item = String>>(raw: I) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, name)| {
            let name = name.trim().to_string();
            let name = if name.is_empty() {
                format!("Coluna {}", i + 1)
            } else {
                name
            };
            let count = seen.entry(name.clone()).or_default();
            *count += 1;
            if *count == 1 {
                name
            } else {
                format!("{name}.{}", *count - 1)
            }
        })
        .collect()
}

fn build_record(headers: &[String], cells: impl IntoIterator<Item = CellValue>) -> Record {
    let mut values: BTreeMap<String, CellValue> = headers
        .iter()
        .map(|h| (h.clone(), CellValue::Null))
        .collect();
    for (name, value) in headers.iter().zip(cells) {
        values.insert(name.clone(), value);
    }
    Record::new(values)
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

fn load_spreadsheet(path: &Path, sheet: &str) -> Result<Dataset, LoadError> {
    // calamine auto-detects the format: xls, xlsx, xlsb, ods
    let mut workbook = open_workbook_auto(path)?;

    let available = workbook.sheet_names().to_vec();
    if !available.iter().any(|name| name == sheet) {
        return Err(LoadError::SheetNotFound {
            sheet: sheet.to_string(),
            available,
        });
    }

    let range = workbook.worksheet_range(sheet)?;
    let mut rows = range.rows();

    let headers = header_names(
        rows.next()
            .ok_or(LoadError::MissingHeader)?
            .iter()
            .map(|cell| match cell {
                Data::String(s) => s.clone(),
                Data::Empty => String::new(),
                other => other.to_string(),
            }),
    );

    let records = rows
        .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|row| build_record(&headers, row.iter().map(spreadsheet_cell)))
        .collect();

    Ok(Dataset::new(headers, records))
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::String(s) if s.trim().is_empty() => CellValue::Null,
        Data::String(s) => CellValue::String(s.clone()),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => {
            cell.as_datetime().map(CellValue::Date).unwrap_or(CellValue::Null)
        }
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names. The delimiter is `;` when the
/// header line has semicolons but no commas, otherwise `,`.
fn load_csv(path: &Path) -> Result<Dataset, LoadError> {
    let text = std::fs::read_to_string(path)?;
    let first_line = text.lines().next().ok_or(LoadError::MissingHeader)?;
    let delimiter = if first_line.contains(';') && !first_line.contains(',') {
        b';'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = header_names(reader.headers()?.iter().map(|h| h.to_string()));

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        records.push(build_record(&headers, row.iter().map(guess_cell_type)));
    }

    Ok(Dataset::new(headers, records))
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file; every column of the schema becomes an attribute.
/// Works with files written by Pandas (`df.to_parquet()`) and Polars.
fn load_parquet(path: &Path) -> Result<Dataset, LoadError> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let headers = header_names(
        builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone()),
    );
    let reader = builder.build()?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| extract_cell_value(col, row));
            records.push(build_record(&headers, cells));
        }
    }

    Ok(Dataset::new(headers, records))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell_value(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let datetime = match col.data_type() {
        DataType::Utf8 => return CellValue::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => {
            return CellValue::String(col.as_string::<i64>().value(row).to_string())
        }
        DataType::Int32 => {
            return CellValue::Integer(i64::from(col.as_primitive::<Int32Type>().value(row)))
        }
        DataType::Int64 => return CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => {
            return CellValue::Float(f64::from(col.as_primitive::<Float32Type>().value(row)))
        }
        DataType::Float64 => return CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => return CellValue::Bool(col.as_boolean().value(row)),
        DataType::Date32 => col.as_primitive::<Date32Type>().value_as_datetime(row),
        DataType::Date64 => col.as_primitive::<Date64Type>().value_as_datetime(row),
        DataType::Timestamp(TimeUnit::Second, _) => {
            col.as_primitive::<TimestampSecondType>().value_as_datetime(row)
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            col.as_primitive::<TimestampMillisecondType>().value_as_datetime(row)
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            col.as_primitive::<TimestampMicrosecondType>().value_as_datetime(row)
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            col.as_primitive::<TimestampNanosecondType>().value_as_datetime(row)
        }
        other => return CellValue::String(format!("{other:?}")),
    };
    datetime.map(CellValue::Date).unwrap_or(CellValue::Null)
}

// ---------------------------------------------------------------------------
// Date coercion
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S%.f",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Parse a timestamp written as text. Slash dates are read day-first.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn coerce_datetime(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::String(s) => parse_datetime(s),
        _ => None,
    }
}

/// Replace every cell of the date columns by a `Date` or `Null`.
fn coerce_date_columns(dataset: &mut Dataset) {
    for column in columns::DATE_COLUMNS {
        if !dataset.has_column(column) {
            continue;
        }
        let mut unparsed = 0usize;
        for rec in &mut dataset.records {
            if let Some(cell) = rec.cells.get_mut(column) {
                let coerced = coerce_datetime(cell);
                if coerced.is_none() && !cell.is_null() {
                    unparsed += 1;
                }
                *cell = coerced.map(CellValue::Date).unwrap_or(CellValue::Null);
            }
        }
        if unparsed > 0 {
            log::warn!("{unparsed} values in '{column}' are not dates; treated as empty");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parses_iso_and_brazilian_dates() {
        assert_eq!(parse_datetime("2024-03-05"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_datetime("05/03/2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(
            parse_datetime("2024-03-05 14:20:00"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(14, 20, 0)
        );
        assert_eq!(
            parse_datetime("2024-03-05T14:20:00.250").map(|d| d.date()),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(parse_datetime("amanhã"), None);
    }

    #[test]
    fn header_names_fill_blanks_and_dedupe() {
        let names = header_names(vec![
            "Prestador".to_string(),
            " ".to_string(),
            "Prestador".to_string(),
        ]);
        assert_eq!(names, vec!["Prestador", "Coluna 2", "Prestador.1"]);
    }

    #[test]
    fn csv_with_bad_dates_loads_with_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "lab.csv",
            "Data Requisição;NomeProcedimento;Valor Total\n\
             2024-01-02;Hemograma;12.5\n\
             sem data;Glicose;4\n",
        );
        let ds = load_source(&path, "Planilha").unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(
            ds.column_names,
            vec![columns::REQUEST_DATE, columns::PROCEDURE_NAME, columns::TOTAL_VALUE]
        );
        assert_eq!(
            ds.records[0].datetime(columns::REQUEST_DATE),
            Some(ymd(2024, 1, 2))
        );
        assert!(ds.records[1].get(columns::REQUEST_DATE).is_null());
        assert_eq!(ds.records[1].number(columns::TOTAL_VALUE), Some(4.0));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_source(&dir.path().join("nope.csv"), "Planilha").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_source(Path::new("dados.txt"), "Planilha").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedExtension(ext) if ext == "txt"));
    }

    #[test]
    fn every_listed_extension_is_dispatched() {
        let dir = tempfile::tempdir().unwrap();
        let listed = SPREADSHEET_EXTENSIONS
            .iter()
            .chain(&CSV_EXTENSIONS)
            .chain(&PARQUET_EXTENSIONS);
        for ext in listed {
            let err = load_source(&dir.path().join(format!("ausente.{ext}")), "Planilha").unwrap_err();
            assert!(
                !matches!(err, LoadError::UnsupportedExtension(_)),
                ".{ext} should reach a reader"
            );
        }
    }

    #[test]
    fn empty_csv_has_no_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "empty.csv", "");
        assert!(matches!(
            load_source(&path, "Planilha"),
            Err(LoadError::MissingHeader)
        ));
    }

    fn write_workbook(path: &Path, sheet: &str) {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet).unwrap();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        for (col, name) in [
            columns::REQUEST_DATE,
            columns::EXECUTION_DATE,
            columns::PROCEDURE_CODE,
            columns::PROCEDURE_NAME,
            columns::TOTAL_VALUE,
        ]
        .iter()
        .enumerate()
        {
            worksheet.write_string(0, col as u16, *name).unwrap();
        }

        let requested = ExcelDateTime::from_ymd(2024, 4, 8).unwrap();
        worksheet
            .write_datetime_with_format(1, 0, &requested, &date_format)
            .unwrap();
        worksheet.write_string(1, 1, "09/04/2024").unwrap();
        worksheet.write_number(1, 2, 40304361.0).unwrap();
        worksheet.write_string(1, 3, "Hemograma").unwrap();
        worksheet.write_number(1, 4, 15.75).unwrap();

        worksheet.write_string(2, 0, "???").unwrap();
        worksheet.write_number(2, 2, 40302040.0).unwrap();
        worksheet.write_string(2, 3, "Glicose").unwrap();
        worksheet.write_number(2, 4, 4.2).unwrap();

        workbook.save(path).unwrap();
    }

    #[test]
    fn xlsx_sheet_loads_and_coerces_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0012.xlsx");
        write_workbook(&path, "Planilha");

        let ds = load_source(&path, "Planilha").unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.column_names.len(), 5);
        let first = &ds.records[0];
        assert_eq!(first.datetime(columns::REQUEST_DATE), Some(ymd(2024, 4, 8)));
        assert_eq!(first.datetime(columns::EXECUTION_DATE), Some(ymd(2024, 4, 9)));
        assert_eq!(first.get(columns::PROCEDURE_CODE).key(), "40304361");
        assert_eq!(first.number(columns::TOTAL_VALUE), Some(15.75));

        let second = &ds.records[1];
        assert!(second.get(columns::REQUEST_DATE).is_null());
        assert!(second.get(columns::EXECUTION_DATE).is_null());
    }

    #[test]
    fn missing_sheet_lists_available_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outra.xlsx");
        write_workbook(&path, "Dados");

        match load_source(&path, "Planilha") {
            Err(LoadError::SheetNotFound { sheet, available }) => {
                assert_eq!(sheet, "Planilha");
                assert_eq!(available, vec!["Dados".to_string()]);
            }
            other => panic!("expected SheetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn parquet_columns_become_attributes() {
        use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray};
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![
            Field::new(
                columns::EXECUTION_DATE,
                DataType::Timestamp(TimeUnit::Millisecond, None),
                true,
            ),
            Field::new(columns::PROVIDER, DataType::Utf8, true),
            Field::new(columns::QUANTITY, DataType::Float64, true),
        ]));
        let millis = ymd(2024, 6, 1).and_utc().timestamp_millis();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(TimestampMillisecondArray::from(vec![Some(millis), None])) as ArrayRef,
                Arc::new(StringArray::from(vec![Some("Lab A"), None])),
                Arc::new(Float64Array::from(vec![1.0, 3.0])),
            ],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.parquet");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_source(&path, "Planilha").unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records[0].datetime(columns::EXECUTION_DATE), Some(ymd(2024, 6, 1)));
        assert!(ds.records[1].get(columns::EXECUTION_DATE).is_null());
        assert!(ds.records[1].get(columns::PROVIDER).is_null());
        assert_eq!(ds.records[1].number(columns::QUANTITY), Some(3.0));
    }
}
