//! Field provider interface and the built-in punctuation/format fields.
//!
//! Providers are consulted in a fixed order: external providers in
//! registration order, then the punctuation fields, then the `strip` and
//! `format` fields. The first provider that claims a field wins; a claim with
//! no values (`Some(vec![])`) is distinct from not claiming at all (`None`).

use camino::Utf8Path;

use crate::error::{MtlError, Result};

/// One element of a provider's help: either a markdown paragraph or a
/// two-column table whose first row is the header.
#[derive(Debug, Clone)]
pub enum HelpEntry {
    Markdown(String),
    Table(Vec<Vec<String>>),
}

/// Contract every field provider must satisfy.
///
/// `resolve` returns `Ok(None)` when the provider does not claim the field,
/// `Ok(Some(values))` when it does; `None` entries inside the list are
/// dropped by the evaluator before further processing. Providers must be
/// reentrant and free of evaluator-visible side effects; any I/O is their
/// own responsibility.
pub trait FieldProvider: Send + Sync {
    fn resolve(
        &self,
        filepath: &Utf8Path,
        field: &str,
        subfield: Option<&str>,
        field_arg: Option<&str>,
        default: &[String],
    ) -> Result<Option<Vec<Option<String>>>>;

    fn help(&self) -> Vec<HelpEntry>;
}

/// Ordered chain of external field providers.
#[derive(Default)]
pub struct FieldRegistry {
    providers: Vec<Box<dyn FieldProvider>>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to the end of the chain. Registered providers are
    /// consulted before the built-in punctuation and format fields.
    pub fn register(&mut self, provider: Box<dyn FieldProvider>) {
        self.providers.push(provider);
    }

    /// Ask each registered provider in order; first claim wins.
    pub fn resolve(
        &self,
        filepath: &Utf8Path,
        field: &str,
        subfield: Option<&str>,
        field_arg: Option<&str>,
        default: &[String],
    ) -> Result<Option<Vec<Option<String>>>> {
        for provider in &self.providers {
            if let Some(values) = provider.resolve(filepath, field, subfield, field_arg, default)? {
                return Ok(Some(values));
            }
        }
        Ok(None)
    }

    /// Help entries from every registered provider, in chain order.
    pub fn help(&self) -> Vec<HelpEntry> {
        self.providers.iter().flat_map(|p| p.help()).collect()
    }

    /// Help for the built-in punctuation and format fields.
    pub fn builtin_help() -> Vec<HelpEntry> {
        let mut table = vec![vec!["Field".to_string(), "Description".to_string()]];
        table.extend(
            PUNCTUATION_FIELDS
                .iter()
                .map(|(name, description, _)| vec![format!("{{{name}}}"), description.to_string()]),
        );
        vec![
            HelpEntry::Markdown("**Punctuation Fields**".to_string()),
            HelpEntry::Table(table),
            HelpEntry::Markdown("**Format Fields**".to_string()),
            HelpEntry::Table(vec![
                vec!["Field".to_string(), "Description".to_string()],
                vec![
                    "{strip}".to_string(),
                    "Use in form '{strip,TEMPLATE}'; strips whitespace from beginning and end \
                     of the rendered TEMPLATE value(s)."
                        .to_string(),
                ],
                vec![
                    "{format}".to_string(),
                    "Use in form '{format:TYPE:FORMAT,TEMPLATE}'; converts TEMPLATE value to \
                     TYPE ('int', 'float', or 'str') then formats it with the FORMAT code \
                     (e.g. '02d', '.2f')."
                        .to_string(),
                ],
            ]),
        ]
    }
}

/// The built-in punctuation fields: name, help text, literal value.
pub const PUNCTUATION_FIELDS: &[(&str, &str, &str)] = &[
    ("comma", "A comma: ','", ","),
    ("semicolon", "A semicolon: ';'", ";"),
    ("questionmark", "A question mark: '?'", "?"),
    ("pipe", "A vertical pipe: '|'", "|"),
    ("percent", "A percent sign: '%'", "%"),
    ("ampersand", "An ampersand symbol: '&'", "&"),
    ("openbrace", "An open brace: '{'", "{"),
    ("closebrace", "A close brace: '}'", "}"),
    ("openparens", "An open parentheses: '('", "("),
    ("closeparens", "A close parentheses: ')'", ")"),
    ("openbracket", "An open bracket: '['", "["),
    ("closebracket", "A close bracket: ']'", "]"),
    ("newline", "A newline: '\\n'", "\n"),
    ("lf", "A line feed: '\\n', alias for {newline}", "\n"),
    ("cr", "A carriage return: '\\r'", "\r"),
    ("crlf", "A carriage return + line feed: '\\r\\n'", "\r\n"),
];

/// Literal value of a punctuation field, if `field` names one.
pub fn punctuation_value(field: &str) -> Option<&'static str> {
    PUNCTUATION_FIELDS
        .iter()
        .find(|(name, _, _)| *name == field)
        .map(|(_, _, value)| *value)
}

/// Convert `value` to `type_name` and render it with a format code.
///
/// Codes follow `[0][width][.precision][kind]` with kinds `d x X o b` for
/// int, `f e` for float, and `s` (or none) for str. Int conversion goes
/// through floating point first so numeric-looking strings like `"2.0"`
/// convert cleanly.
pub fn format_typed(type_name: &str, value: &str, code: &str) -> Result<String> {
    match type_name {
        "int" => {
            let number = parse_number(value)?;
            format_int(number as i64, code)
        }
        "float" => format_float(parse_number(value)?, code),
        "str" => format_str(value, code),
        other => Err(MtlError::Syntax(format!(
            "'{other}' is not a valid type for format: must be one of 'int', 'float', 'str'"
        ))),
    }
}

fn parse_number(value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| MtlError::Syntax(format!("cannot convert '{value}' to a number")))
}

struct FormatSpec {
    zero: bool,
    width: usize,
    precision: Option<usize>,
    kind: Option<char>,
}

fn parse_format_spec(code: &str) -> Result<FormatSpec> {
    let chars: Vec<char> = code.chars().collect();
    let mut i = 0;

    let zero = chars.first() == Some(&'0') && chars.len() > 1;
    if zero {
        i = 1;
    }

    let mut width = 0usize;
    while i < chars.len() && chars[i].is_ascii_digit() {
        width = width * 10 + (chars[i] as usize - '0' as usize);
        i += 1;
    }

    let mut precision = None;
    if chars.get(i) == Some(&'.') {
        i += 1;
        let mut digits = 0usize;
        let mut any = false;
        while i < chars.len() && chars[i].is_ascii_digit() {
            digits = digits * 10 + (chars[i] as usize - '0' as usize);
            any = true;
            i += 1;
        }
        if !any {
            return Err(MtlError::Syntax(format!("invalid format code: {code}")));
        }
        precision = Some(digits);
    }

    let kind = if i < chars.len() {
        let k = chars[i];
        i += 1;
        Some(k)
    } else {
        None
    };

    if i != chars.len() || kind.is_some_and(|k| !k.is_ascii_alphabetic()) {
        return Err(MtlError::Syntax(format!("invalid format code: {code}")));
    }

    Ok(FormatSpec {
        zero,
        width,
        precision,
        kind,
    })
}

fn format_int(value: i64, code: &str) -> Result<String> {
    if code.is_empty() {
        return Ok(value.to_string());
    }
    let spec = parse_format_spec(code)?;
    if spec.precision.is_some() {
        return Err(MtlError::Syntax(format!(
            "precision not allowed in integer format code: {code}"
        )));
    }
    let magnitude = value.unsigned_abs();
    let body = match spec.kind {
        None | Some('d') => magnitude.to_string(),
        Some('x') => format!("{magnitude:x}"),
        Some('X') => format!("{magnitude:X}"),
        Some('o') => format!("{magnitude:o}"),
        Some('b') => format!("{magnitude:b}"),
        Some(other) => {
            return Err(MtlError::Syntax(format!(
                "unknown integer format type '{other}' in code: {code}"
            )));
        }
    };
    let signed = if value < 0 { format!("-{body}") } else { body };
    Ok(pad_number(signed, &spec))
}

fn format_float(value: f64, code: &str) -> Result<String> {
    if code.is_empty() {
        return Ok(value.to_string());
    }
    let spec = parse_format_spec(code)?;
    let body = match spec.kind {
        Some('f') => format!("{value:.prec$}", prec = spec.precision.unwrap_or(6)),
        Some('e') => format!("{value:.prec$e}", prec = spec.precision.unwrap_or(6)),
        None => match spec.precision {
            Some(precision) => format!("{value:.precision$}"),
            None => value.to_string(),
        },
        Some(other) => {
            return Err(MtlError::Syntax(format!(
                "unknown float format type '{other}' in code: {code}"
            )));
        }
    };
    Ok(pad_number(body, &spec))
}

fn format_str(value: &str, code: &str) -> Result<String> {
    if code.is_empty() {
        return Ok(value.to_string());
    }
    let spec = parse_format_spec(code)?;
    if spec.kind.is_some_and(|k| k != 's') {
        return Err(MtlError::Syntax(format!(
            "unknown string format type in code: {code}"
        )));
    }
    let truncated: String = match spec.precision {
        Some(precision) => value.chars().take(precision).collect(),
        None => value.to_string(),
    };
    // Strings left-align into the field width.
    Ok(format!("{truncated:<width$}", width = spec.width))
}

/// Right-align into the field width, zero-filling after the sign when the
/// code carried a leading zero.
fn pad_number(value: String, spec: &FormatSpec) -> String {
    if value.len() >= spec.width {
        return value;
    }
    if spec.zero {
        let (sign, digits) = match value.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", value.as_str()),
        };
        format!("{sign}{digits:0>width$}", width = spec.width - sign.len())
    } else {
        format!("{value:>width$}", width = spec.width)
    }
}
