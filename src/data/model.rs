use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

// ---------------------------------------------------------------------------
// Column names of the laboratory export
// ---------------------------------------------------------------------------

/// Header labels used by the laboratory billing spreadsheet.
pub mod columns {
    pub const REQUEST_DATE: &str = "Data Requisição";
    pub const EXECUTION_DATE: &str = "Data Execução";
    pub const AUTHORIZATION_NUMBER: &str = "Número Autorização";
    pub const PROVIDER: &str = "Prestador";
    pub const USER_NAME: &str = "Nome Usuário";
    pub const ORIGIN_UNIT: &str = "Unidade Origem";
    pub const CRITICALITY: &str = "Crítica";
    pub const PROCEDURE_CODE: &str = "Código Procedimento";
    pub const PROCEDURE_NAME: &str = "NomeProcedimento";
    pub const TOTAL_VALUE: &str = "Valor Total";
    pub const QUANTITY: &str = "Quantidade";

    /// Columns coerced to timestamps at load time.
    pub const DATE_COLUMNS: [&str; 2] = [REQUEST_DATE, EXECUTION_DATE];
}

// ---------------------------------------------------------------------------
// CellValue – a single cell of the source table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Filter options are collected in a `BTreeSet`, so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDateTime),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) | Float(_) => 2,
                String(_) => 3,
                Date(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            // Mixed numbers compare by value; an equal integer sorts first.
            (Integer(a), Float(b)) => (*a as f64)
                .total_cmp(b)
                .then(std::cmp::Ordering::Less),
            (Float(a), Integer(b)) => a
                .total_cmp(&(*b as f64))
                .then(std::cmp::Ordering::Greater),
            (String(a), String(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{}", format_float(*v)),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => {
                if d.hour() == 0 && d.minute() == 0 && d.second() == 0 {
                    write!(f, "{}", d.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S"))
                }
            }
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

/// Integral floats print without a fractional part so `123.0` and `123`
/// share a categorical key.
fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64` for sums and distributions.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Canonical string form used by categorical filters and rankings.
    /// `Null` maps to the empty key.
    pub fn key(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            other => other.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the source table
// ---------------------------------------------------------------------------

/// A single row: column_name → value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub cells: BTreeMap<String, CellValue>,
}

static NULL_CELL: CellValue = CellValue::Null;

impl Record {
    pub fn new(cells: BTreeMap<String, CellValue>) -> Self {
        Record { cells }
    }

    /// Cell for `column`; a missing column reads as `Null`.
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&NULL_CELL)
    }

    pub fn datetime(&self, column: &str) -> Option<NaiveDateTime> {
        self.get(column).as_datetime()
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).as_f64()
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed table. Immutable once loaded; filters produce index views.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// All records (rows) in source order.
    pub records: Vec<Record>,
    /// Column names in source header order.
    pub column_names: Vec<String>,
}

impl Dataset {
    pub fn new(column_names: Vec<String>, records: Vec<Record>) -> Self {
        Dataset {
            records,
            column_names,
        }
    }

    /// Build a dataset whose columns are the union of the record keys.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut names: BTreeSet<String> = BTreeSet::new();
        for rec in &records {
            names.extend(rec.cells.keys().cloned());
        }
        Dataset {
            records,
            column_names: names.into_iter().collect(),
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    pub fn all_indices(&self) -> Vec<usize> {
        (0..self.records.len()).collect()
    }

    /// Distinct keys of `column` over the records in `view`, ordered by
    /// value (numbers numerically, then text, then dates).
    pub fn distinct_keys(&self, column: &str, view: &[usize]) -> Vec<String> {
        let values: BTreeSet<&CellValue> = view.iter().map(|&i| self.records[i].get(column)).collect();
        // `Integer(5)` and `Float(5.0)` share a key.
        let mut seen: HashSet<String> = HashSet::with_capacity(values.len());
        values
            .into_iter()
            .map(CellValue::key)
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }

    /// Distinct keys of `column` over `view`, sorted as text.
    pub fn distinct_text_keys(&self, column: &str, view: &[usize]) -> Vec<String> {
        view.iter()
            .map(|&i| self.records[i].get(column).key())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Earliest and latest calendar date of `column` over the whole dataset.
    pub fn date_bounds(&self, column: &str) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self
            .records
            .iter()
            .filter_map(|r| r.datetime(column))
            .map(|d| d.date());
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}
