// Delimited text file operations

use crate::record::{DATE_FORMAT, Visit, VisitKind};
use chrono::NaiveDateTime;
use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const HEADER: &str = "Id,PatientName,VisitDate,VisitType,Description,DoctorName,VisitDuration,Fee";

const FIELD_COUNT: usize = 8;

/// Why a data line could not be turned into a visit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("expected 8 fields, found {0}")]
    FieldCount(usize),

    #[error("unterminated quoted field")]
    UnterminatedQuote,

    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// Encode one visit as a data line (no trailing newline)
pub fn encode_line(visit: &Visit) -> String {
    let date = visit.visit_date.format(DATE_FORMAT).to_string();
    let fields = [
        visit.id.to_string(),
        escape(&visit.patient_name),
        date,
        visit.kind.to_string(),
        escape(&visit.description),
        escape(&visit.doctor_name),
        visit.duration_minutes.to_string(),
        visit.fee.to_string(),
    ];
    fields.join(",")
}

/// Decode one data line
pub fn decode_line(line: &str) -> Result<Visit, LineError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let fields: [String; FIELD_COUNT] = split_fields(line)?
        .try_into()
        .map_err(|fields: Vec<String>| LineError::FieldCount(fields.len()))?;
    let [id, patient_name, date, kind, description, doctor_name, duration, fee] = fields;

    let id: u32 = parse_field("id", &id)?;
    if id == 0 {
        return Err(LineError::InvalidField {
            field: "id",
            value: id.to_string(),
        });
    }

    let visit_date = NaiveDateTime::parse_from_str(&date, DATE_FORMAT).map_err(|_| LineError::InvalidField {
        field: "visit date",
        value: date.clone(),
    })?;

    let kind: VisitKind = parse_field("visit type", &kind)?;
    let duration_minutes: u32 = parse_field("duration", &duration)?;
    let fee: i64 = parse_field("fee", &fee)?;

    Ok(Visit {
        id,
        patient_name,
        visit_date,
        kind,
        description,
        doctor_name,
        duration_minutes,
        fee,
    })
}

/// Read all visits from a data file
///
/// A missing file yields an empty list. Lines that are not UTF-8 or cannot be
/// decoded are logged and skipped; they never abort the load.
pub fn read_csv(path: &Path) -> io::Result<Vec<Visit>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let bytes = fs::read(path)?;
    let mut visits = Vec::new();

    for (line_num, raw) in bytes.split(|b| *b == b'\n').enumerate() {
        let line = match std::str::from_utf8(raw) {
            Ok(l) => l,
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to read line, skipping"
                );
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        if line_num == 0 && line.trim() == HEADER {
            continue;
        }

        match decode_line(line) {
            Ok(visit) => visits.push(visit),
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = %e,
                    "Failed to parse visit, skipping"
                );
            }
        }
    }

    info!(file = ?path, count = visits.len(), "Loaded visits from CSV");

    Ok(visits)
}

/// Rewrite the whole data file: header, then one line per visit in order
pub fn write_csv(path: &Path, visits: &[Visit]) -> io::Result<()> {
    let file = OpenOptions::new().create(true).write(true).truncate(false).open(path)?;

    // Truncate only once the lock is held
    file.lock_exclusive()?;
    file.set_len(0)?;

    let mut writer = BufWriter::new(&file);
    writeln!(writer, "{}", HEADER)?;
    for visit in visits {
        writeln!(writer, "{}", encode_line(visit))?;
    }
    writer.flush()?;
    drop(writer);

    file.sync_all()?;
    debug!(file = ?path, count = visits.len(), "Wrote visits to CSV");

    // Lock is released when file is dropped
    Ok(())
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, LineError> {
    value.parse().map_err(|_| LineError::InvalidField {
        field,
        value: value.to_string(),
    })
}

fn escape(value: &str) -> String {
    if value.contains([',', '"']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn split_fields(line: &str) -> Result<Vec<String>, LineError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    current.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => current.push(c),
            }
        } else {
            match c {
                ',' => fields.push(std::mem::take(&mut current)),
                '"' if current.is_empty() => in_quotes = true,
                _ => current.push(c),
            }
        }
    }

    if in_quotes {
        return Err(LineError::UnterminatedQuote);
    }
    fields.push(current);

    Ok(fields)
}
