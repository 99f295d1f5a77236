//! `COPY ... FROM STDIN` statement building and text-format row encoding.

use bulkgraph_core::{BatchColumn, ColumnBatch, TableName, Value, quote_ident};
use std::fmt::Write;

/// Build the `COPY` statement for a batch's columns, in batch order.
pub fn copy_statement(table: &TableName, columns: &[BatchColumn]) -> String {
    let columns = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("COPY {} ({}) FROM STDIN", table.quoted(), columns)
}

/// Append one row in COPY text format (tab separated, newline terminated).
pub fn encode_row(row: &[Value], out: &mut Vec<u8>) {
    for (i, value) in row.iter().enumerate() {
        if i > 0 {
            out.push(b'\t');
        }
        encode_value(value, out);
    }
    out.push(b'\n');
}

fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.extend_from_slice(b"\\N"),
        Value::Bool(b) => out.push(if *b { b't' } else { b'f' }),
        Value::Int(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::BigInt(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::Uuid(_) => out.extend_from_slice(value.to_string().as_bytes()),
        Value::Text(s) | Value::Decimal(s) | Value::Other(s) => escape_text(s, out),
        Value::Timestamp(micros) => out.extend_from_slice(format_timestamp(*micros).as_bytes()),
        Value::Bytes(bytes) => {
            // bytea hex input, with the backslash itself escaped for COPY
            let mut hex = String::with_capacity(3 + bytes.len() * 2);
            hex.push_str("\\\\x");
            for b in bytes {
                let _ = write!(hex, "{b:02x}");
            }
            out.extend_from_slice(hex.as_bytes());
        }
    }
}

fn escape_text(s: &str, out: &mut Vec<u8>) {
    for &b in s.as_bytes() {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\t' => out.extend_from_slice(b"\\t"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(b),
        }
    }
}

/// Render microseconds since the Unix epoch as a UTC `timestamptz` literal.
fn format_timestamp(micros: i64) -> String {
    let secs = micros.div_euclid(1_000_000);
    let frac = micros.rem_euclid(1_000_000);
    let days = secs.div_euclid(86_400);
    let sod = secs.rem_euclid(86_400);
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02} {:02}:{:02}:{:02}.{frac:06}+00",
        sod / 3600,
        (sod % 3600) / 60,
        sod % 60
    )
}

// Proleptic Gregorian date for a day count relative to 1970-01-01.
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Iterator over the `CopyData` payloads for a batch.
///
/// Buffered mode yields the whole batch as one payload. Streaming mode yields
/// one payload per row, encoding each only when it is pulled.
pub struct CopyFrames<'a> {
    rows: std::slice::Iter<'a, Vec<Value>>,
    streaming: bool,
}

/// Frame a batch for sending.
pub fn copy_frames(batch: &ColumnBatch, streaming: bool) -> CopyFrames<'_> {
    CopyFrames {
        rows: batch.rows().iter(),
        streaming,
    }
}

impl Iterator for CopyFrames<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        let mut frame = Vec::new();
        if self.streaming {
            encode_row(self.rows.next()?, &mut frame);
            return Some(frame);
        }
        for row in self.rows.by_ref() {
            encode_row(row, &mut frame);
        }
        (!frame.is_empty()).then_some(frame)
    }
}
