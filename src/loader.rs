// Ledger loading.
//
// The pipeline only sees typed `RawHistoricalEntry`/`RawCurrentEntry`
// sequences; where they come from (the compiled-in snapshot, CSV files,
// JSON payloads) is hidden behind `LedgerSource`.
use crate::error::LoadError;
use crate::types::{CurrentCsvRow, HistoricalCsvRow, RawCurrentEntry, RawHistoricalEntry};
use crate::util::{clean_text, parse_amount, parse_i64_safe};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const HISTORICAL_SNAPSHOT: &str = include_str!("../data/historical.csv");
const CURRENT_SNAPSHOT: &str = include_str!("../data/current.csv");

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
}

#[derive(Debug, Clone)]
pub struct LedgerLoad<T> {
    pub entries: Vec<T>,
    pub report: LoadReport,
}

/// Both ledgers, ready for the pipeline.
#[derive(Debug, Clone)]
pub struct Ledgers {
    pub historical: LedgerLoad<RawHistoricalEntry>,
    pub current: LedgerLoad<RawCurrentEntry>,
}

/// Provider of the two input snapshots.
pub trait LedgerSource {
    fn describe(&self) -> String;
    fn historical_entries(&self) -> Result<LedgerLoad<RawHistoricalEntry>, LoadError>;
    fn current_entries(&self) -> Result<LedgerLoad<RawCurrentEntry>, LoadError>;
}

/// The snapshot shipped with the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedLedgers;

impl LedgerSource for EmbeddedLedgers {
    fn describe(&self) -> String {
        "embedded snapshot".to_string()
    }

    fn historical_entries(&self) -> Result<LedgerLoad<RawHistoricalEntry>, LoadError> {
        read_historical_csv(HISTORICAL_SNAPSHOT.as_bytes(), "embedded historical ledger")
    }

    fn current_entries(&self) -> Result<LedgerLoad<RawCurrentEntry>, LoadError> {
        read_current_csv(CURRENT_SNAPSHOT.as_bytes(), "embedded current ledger")
    }
}

/// Two ledger files. A `.json` extension selects the JSON reader, anything
/// else is read as CSV with a header row.
#[derive(Debug, Clone)]
pub struct FileLedgers {
    pub historical: PathBuf,
    pub current: PathBuf,
}

impl LedgerSource for FileLedgers {
    fn describe(&self) -> String {
        format!(
            "historical={} current={}",
            self.historical.display(),
            self.current.display()
        )
    }

    fn historical_entries(&self) -> Result<LedgerLoad<RawHistoricalEntry>, LoadError> {
        let file = open(&self.historical)?;
        let origin = self.historical.display().to_string();
        if is_json(&self.historical) {
            read_historical_json(file, &origin)
        } else {
            read_historical_csv(file, &origin)
        }
    }

    fn current_entries(&self) -> Result<LedgerLoad<RawCurrentEntry>, LoadError> {
        let file = open(&self.current)?;
        let origin = self.current.display().to_string();
        if is_json(&self.current) {
            read_current_json(file, &origin)
        } else {
            read_current_csv(file, &origin)
        }
    }
}

/// Pull both ledgers from `source`. Two empty ledgers are reported as
/// `LoadError::NoData`.
pub fn load_ledgers(source: &dyn LedgerSource) -> Result<Ledgers, LoadError> {
    let historical = source.historical_entries()?;
    let current = source.current_entries()?;
    for (name, report) in [("historical", &historical.report), ("current", &current.report)] {
        tracing::info!(
            ledger = name,
            total_rows = report.total_rows,
            loaded_rows = report.loaded_rows,
            parse_errors = report.parse_errors,
            "ledger loaded"
        );
        if report.parse_errors > 0 {
            tracing::warn!(ledger = name, skipped = report.parse_errors, "rows skipped");
        }
    }
    if historical.entries.is_empty() && current.entries.is_empty() {
        return Err(LoadError::NoData);
    }
    Ok(Ledgers { historical, current })
}

pub fn read_historical_csv<R: Read>(
    reader: R,
    origin: &str,
) -> Result<LedgerLoad<RawHistoricalEntry>, LoadError> {
    read_csv(reader, origin, |row: HistoricalCsvRow| {
        Some(RawHistoricalEntry {
            account_id: parse_i64_safe(row.id.as_deref())?,
            city: clean_text(row.city.as_deref()).unwrap_or_default(),
            customer_name: clean_text(row.customer_name.as_deref()).unwrap_or_default(),
            month1_amount: parse_amount(row.month1.as_deref())?,
            month2_amount: parse_amount(row.month2.as_deref())?,
            month3_amount: parse_amount(row.month3.as_deref())?,
        })
    })
}

pub fn read_current_csv<R: Read>(
    reader: R,
    origin: &str,
) -> Result<LedgerLoad<RawCurrentEntry>, LoadError> {
    read_csv(reader, origin, |row: CurrentCsvRow| {
        Some(RawCurrentEntry {
            account_id: parse_i64_safe(row.id.as_deref())?,
            city: clean_text(row.city.as_deref()).unwrap_or_default(),
            customer_name: clean_text(row.customer_name.as_deref()).unwrap_or_default(),
            current_amount: parse_amount(row.amount.as_deref())?,
            salesperson: clean_text(row.salesperson.as_deref()),
        })
    })
}

pub fn read_historical_json<R: Read>(
    reader: R,
    origin: &str,
) -> Result<LedgerLoad<RawHistoricalEntry>, LoadError> {
    read_json(reader, origin, |entry: RawHistoricalEntry| {
        let amounts = [entry.month1_amount, entry.month2_amount, entry.month3_amount];
        if !amounts.iter().all(|v| v.is_finite() && *v >= 0.0) {
            return None;
        }
        Some(RawHistoricalEntry {
            city: entry.city.trim().to_string(),
            customer_name: entry.customer_name.trim().to_string(),
            ..entry
        })
    })
}

pub fn read_current_json<R: Read>(
    reader: R,
    origin: &str,
) -> Result<LedgerLoad<RawCurrentEntry>, LoadError> {
    read_json(reader, origin, |entry: RawCurrentEntry| {
        if !(entry.current_amount.is_finite() && entry.current_amount >= 0.0) {
            return None;
        }
        Some(RawCurrentEntry {
            city: entry.city.trim().to_string(),
            customer_name: entry.customer_name.trim().to_string(),
            salesperson: clean_text(entry.salesperson.as_deref()),
            ..entry
        })
    })
}

fn read_csv<R, Row, Entry, F>(reader: R, origin: &str, convert: F) -> Result<LedgerLoad<Entry>, LoadError>
where
    R: Read,
    Row: DeserializeOwned,
    F: Fn(Row) -> Option<Entry>,
{
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    rdr.headers().map_err(|source| LoadError::Csv {
        origin: origin.to_string(),
        source,
    })?;

    let mut report = LoadReport::default();
    let mut entries = Vec::new();
    for result in rdr.deserialize::<Row>() {
        report.total_rows += 1;
        match result.ok().and_then(&convert) {
            Some(entry) => entries.push(entry),
            None => report.parse_errors += 1,
        }
    }
    report.loaded_rows = entries.len();
    Ok(LedgerLoad { entries, report })
}

fn read_json<R, Entry, F>(reader: R, origin: &str, validate: F) -> Result<LedgerLoad<Entry>, LoadError>
where
    R: Read,
    Entry: DeserializeOwned,
    F: Fn(Entry) -> Option<Entry>,
{
    let raw: Vec<Entry> = serde_json::from_reader(reader).map_err(|source| LoadError::Json {
        origin: origin.to_string(),
        source,
    })?;
    let total_rows = raw.len();
    let entries: Vec<Entry> = raw.into_iter().filter_map(validate).collect();
    let report = LoadReport {
        total_rows,
        loaded_rows: entries.len(),
        parse_errors: total_rows - entries.len(),
    };
    Ok(LedgerLoad { entries, report })
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
