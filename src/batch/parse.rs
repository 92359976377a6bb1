use serde::Serialize;

use super::LINE_END;
use super::field::slice_line;
use super::layout::{HEADER_TYPE, TRAILER_TYPE, layout_for};
use crate::error::FormatError;

/// One line of a batch cut back into its named fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedLine {
    pub line: usize,
    pub record_type: String,
    pub fields: Vec<(&'static str, String)>,
}

impl ParsedLine {
    /// Raw field value, padding included.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Field value with trailing padding removed.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.raw(name).map(str::trim_end)
    }

    pub fn number(&self, name: &str) -> Option<i64> {
        self.raw(name)?.trim().parse().ok()
    }

    fn require_number(&self, name: &'static str) -> Result<i64, FormatError> {
        self.number(name).ok_or_else(|| FormatError::MalformedLine {
            line: self.line,
            reason: format!("{name} is not numeric"),
        })
    }
}

/// Split a CRLF batch into parsed lines. Every line must end in CRLF and
/// match the width of its record type.
pub fn parse_batch(text: &str) -> Result<Vec<ParsedLine>, FormatError> {
    let body = text.strip_suffix(LINE_END).ok_or(FormatError::MalformedLine {
        line: 0,
        reason: "batch does not end with CRLF".to_string(),
    })?;

    body.split(LINE_END)
        .enumerate()
        .map(|(index, raw)| {
            let line = index + 1;
            let record_type: String = raw.chars().take(2).collect();
            let specs = layout_for(&record_type).ok_or_else(|| FormatError::MalformedLine {
                line,
                reason: format!("unknown record type {record_type:?}"),
            })?;
            let fields = slice_line(specs, raw).ok_or_else(|| FormatError::MalformedLine {
                line,
                reason: format!("record {record_type} is {} characters", raw.chars().count()),
            })?;
            Ok(ParsedLine {
                line,
                record_type,
                fields,
            })
        })
        .collect()
}

/// Totals recovered from a verified batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub practitioner_number: i64,
    pub record_count: i64,
    pub service_count: i64,
    pub total_fee_cents: i64,
}

/// Re-read a batch and check its structure against the trailer checksums.
pub fn verify_batch(text: &str) -> Result<BatchSummary, FormatError> {
    let lines = parse_batch(text)?;
    let malformed = |line: usize, reason: &str| FormatError::MalformedLine {
        line,
        reason: reason.to_string(),
    };

    let (header, rest) = lines.split_first().ok_or_else(|| malformed(0, "empty batch"))?;
    if header.record_type != HEADER_TYPE {
        return Err(malformed(header.line, "first record is not a header"));
    }
    let (trailer, services) = rest
        .split_last()
        .ok_or_else(|| malformed(header.line, "batch has no trailer"))?;
    if trailer.record_type != TRAILER_TYPE {
        return Err(malformed(trailer.line, "last record is not a trailer"));
    }
    if let Some(stray) = services
        .iter()
        .find(|l| l.record_type == HEADER_TYPE || l.record_type == TRAILER_TYPE)
    {
        return Err(malformed(stray.line, "header or trailer in the middle of the batch"));
    }

    let mut total_fee_cents = 0;
    for service in services {
        total_fee_cents += service.require_number("fee_cents")?;
    }

    let checks = [
        ("record_count", lines.len() as i64),
        ("service_count", services.len() as i64),
        ("total_fee_cents", total_fee_cents),
    ];
    for (field, expected) in checks {
        let found = trailer.require_number(field)?;
        if found != expected {
            return Err(FormatError::ChecksumMismatch {
                field,
                expected,
                found,
            });
        }
    }

    Ok(BatchSummary {
        practitioner_number: header.require_number("practitioner_number")?,
        record_count: lines.len() as i64,
        service_count: services.len() as i64,
        total_fee_cents,
    })
}
