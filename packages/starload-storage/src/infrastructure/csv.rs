//! Delimited-file sales source
//!
//! Reads a header-carrying CSV file with the `sales` columns. Columns are matched by
//! header name (case-insensitive), so their order in the file does not matter.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{RawRecord, RawRecordSet, SalesSource, REQUIRED_COLUMNS};
use crate::error::{Result, StorageError};

const BOM: char = '\u{feff}';

#[derive(Debug, Clone)]
pub struct CsvSalesSource {
    path: PathBuf,
}

impl CsvSalesSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|err| {
            StorageError::connectivity(format!(
                "Cannot read source file {}: {}",
                self.path.display(),
                err
            ))
            .with_source(err)
        })
    }
}

#[async_trait]
impl SalesSource for CsvSalesSource {
    async fn fetch_by_date(&self, period: NaiveDate) -> Result<RawRecordSet> {
        let content = self.read()?;
        let mut records = parse_records(content.trim_start_matches(BOM))?.into_iter();

        let header = match records.next() {
            Some(header) => header,
            None => return Ok(RawRecordSet::default()),
        };
        let columns: Vec<String> = header.iter().map(|c| c.trim().to_string()).collect();

        let set = RawRecordSet::new(columns.clone(), Vec::new());
        if !set.missing_columns().is_empty() {
            return Ok(set);
        }

        let index: HashMap<String, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.to_ascii_lowercase(), i))
            .collect();
        let pos = |name: &str| index[name];
        let [date_at, category_at, product_at, quantity_at, price_at] =
            REQUIRED_COLUMNS.map(pos);

        let mut rows = Vec::new();
        for (line, fields) in records.enumerate() {
            // Blank trailing lines
            if fields.len() == 1 && fields[0].trim().is_empty() {
                continue;
            }
            let field = |at: usize| field_at(&fields, at, line, columns.len());

            let date = parse_field::<NaiveDate>(field(date_at)?, "date", line)?;
            if date != period {
                continue;
            }
            rows.push(RawRecord::new(
                date,
                field(category_at)?,
                field(product_at)?,
                parse_field::<i64>(field(quantity_at)?, "quantity", line)?,
                parse_field::<f64>(field(price_at)?, "price", line)?,
            ));
        }

        debug!(
            path = %self.path.display(),
            period = %period,
            rows = rows.len(),
            "Read sales rows from CSV"
        );
        Ok(RawRecordSet::new(columns, rows))
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

fn field_at(fields: &[String], at: usize, line: usize, expected: usize) -> Result<&str> {
    fields.get(at).map(|f| f.trim()).ok_or_else(|| {
        StorageError::serialization(format!(
            "Record {} has {} fields, expected {}",
            line + 2,
            fields.len(),
            expected
        ))
    })
}

fn parse_field<T: std::str::FromStr>(raw: &str, column: &str, line: usize) -> Result<T> {
    raw.parse::<T>().map_err(|_| {
        StorageError::serialization(format!(
            "Invalid {} value {:?} in record {}",
            column,
            raw,
            line + 2
        ))
    })
}

/// Split CSV content into records, honouring quoted fields (RFC 4180)
pub fn parse_records(content: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(StorageError::serialization("Unterminated quoted field"));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

/// Quote a field when it contains a delimiter, quote or line break
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// One CSV line (without terminator)
pub fn format_record<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| escape_field(f.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}
