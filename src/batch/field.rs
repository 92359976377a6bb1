use serde::Serialize;

/// Which side of a fixed-width field the value sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justify {
    Left,
    Right,
}

/// One positional field of a payer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub width: usize,
    pub justify: Justify,
    pub pad: char,
}

impl FieldSpec {
    /// Left-aligned, space padded. Overflow keeps the leading characters.
    pub const fn text(name: &'static str, width: usize) -> Self {
        Self {
            name,
            width,
            justify: Justify::Left,
            pad: ' ',
        }
    }

    /// Right-aligned, zero padded. Overflow keeps the trailing digits.
    pub const fn numeric(name: &'static str, width: usize) -> Self {
        Self {
            name,
            width,
            justify: Justify::Right,
            pad: '0',
        }
    }

    /// Fit `value` to the field. The second element is set when the value
    /// had to be cut.
    pub fn encode(&self, value: &str) -> (String, bool) {
        let chars: Vec<char> = value.chars().collect();
        let len = chars.len();
        if len > self.width {
            let kept: String = match self.justify {
                Justify::Left => chars[..self.width].iter().collect(),
                Justify::Right => chars[len - self.width..].iter().collect(),
            };
            return (kept, true);
        }

        let padding: String = std::iter::repeat_n(self.pad, self.width - len).collect();
        let encoded = match self.justify {
            Justify::Left => format!("{value}{padding}"),
            Justify::Right => format!("{padding}{value}"),
        };
        (encoded, false)
    }
}

/// A value that did not fit its field and was truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOverflow {
    pub line: usize,
    pub record_type: String,
    pub field: &'static str,
    pub width: usize,
    pub value: String,
}

/// Total characters of a record layout.
pub fn line_width(specs: &[FieldSpec]) -> usize {
    specs.iter().map(|s| s.width).sum()
}

/// Concatenate `values` into one record line, positionally matched to
/// `specs`. Overflows are logged and returned; encoding carries on.
pub fn encode_line(
    specs: &[FieldSpec],
    values: &[String],
    line: usize,
    record_type: &str,
) -> (String, Vec<FieldOverflow>) {
    debug_assert_eq!(specs.len(), values.len(), "record {record_type} field count");

    let mut out = String::with_capacity(line_width(specs));
    let mut overflows = Vec::new();
    for (spec, value) in specs.iter().zip(values) {
        let (encoded, truncated) = spec.encode(value);
        if truncated {
            log::warn!(
                target: "batch",
                "line {line} record {record_type}: {} {:?} exceeds {} characters, truncated to {:?}",
                spec.name,
                value,
                spec.width,
                encoded
            );
            overflows.push(FieldOverflow {
                line,
                record_type: record_type.to_string(),
                field: spec.name,
                width: spec.width,
                value: value.clone(),
            });
        }
        out.push_str(&encoded);
    }
    (out, overflows)
}

/// Cut a line back into its raw (still padded) field values.
pub fn slice_line(specs: &[FieldSpec], line: &str) -> Option<Vec<(&'static str, String)>> {
    let chars: Vec<char> = line.chars().collect();
    if chars.len() != line_width(specs) {
        return None;
    }
    let mut offset = 0;
    let fields = specs
        .iter()
        .map(|spec| {
            let value: String = chars[offset..offset + spec.width].iter().collect();
            offset += spec.width;
            (spec.name, value)
        })
        .collect();
    Some(fields)
}
