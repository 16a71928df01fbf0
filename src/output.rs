//! Emitters: plain print, CSV, and JSON output for rendered templates.
//!
//! Renders always run with a process-unique sentinel as the `none_str`
//! placeholder; each emitter then substitutes its own "undefined"
//! representation, so plain text and CSV default to an empty string while
//! JSON gets real `null`s.

use std::io::Write;
use std::sync::OnceLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde_json::Value;

use crate::error::Result;
use crate::fields::FieldRegistry;
use crate::mtl::{RenderOptions, Renderer, parse_template};

/// Options shared by the emitters.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    /// Suppress the filename header/column/key.
    pub no_filename: bool,
    /// Use the full path instead of the file name.
    pub path: bool,
    /// Separate rendered values with NUL instead of a space (print mode).
    pub null_separator: bool,
    /// Suppress the CSV header row.
    pub no_header: bool,
    /// Emit one JSON array instead of an object per file.
    pub array: bool,
    /// CSV field delimiter; `\t` or `tab` select a tab.
    pub delimiter: Option<String>,
    /// Replacement for unresolved values.
    pub undefined: Option<String>,
}

/// Unique placeholder for unresolved values, replaced by the emitters.
pub fn none_str_sentinel() -> &'static str {
    static SENTINEL: OnceLock<String> = OnceLock::new();
    SENTINEL.get_or_init(|| {
        format!(
            "__XYZZY_METAPRINT_{}_TEMPLATE_NONE_XYZZY__",
            std::process::id()
        )
    })
}

/// Split a `name:TEMPLATE` or `name=TEMPLATE` label off a template, falling
/// back to the first field (as `field` or `field:subfield`), then to the
/// literal template text. Returns `(name, template)`.
pub fn field_name_for_template(template: &str) -> (String, String) {
    for re in [prefix_colon(), prefix_equals()] {
        if let Some(caps) = re.captures(template) {
            let whole = caps.get(0).unwrap();
            let name = caps.get(1).unwrap().as_str().to_string();
            return (name, template[whole.end()..].to_string());
        }
    }
    if let Ok(parsed) = parse_template(template)
        && let Some(expr) = parsed.first_expression()
    {
        let name = match &expr.subfield {
            Some(subfield) => format!("{}:{}", expr.field, subfield),
            None => expr.field.clone(),
        };
        return (name, template.to_string());
    }
    (template.to_string(), template.to_string())
}

fn prefix_colon() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([^:{}]+):\s*").expect("static regex"))
}

fn prefix_equals() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([^={}]+)=\s*").expect("static regex"))
}

fn render_with_sentinel(
    filepath: &Utf8Path,
    registry: &FieldRegistry,
    template: &str,
) -> Result<Vec<String>> {
    let options = RenderOptions {
        none_str: none_str_sentinel().to_string(),
        ..Default::default()
    };
    Renderer::new(filepath, registry)
        .with_options(options)
        .render(template)
}

fn display_name(filepath: &Utf8Path, full_path: bool) -> &str {
    if full_path {
        filepath.as_str()
    } else {
        filepath.file_name().unwrap_or(filepath.as_str())
    }
}

/// Print mode: one line per file, `HEADER value value ...`.
pub fn print_templates<W: Write>(
    writer: &mut W,
    filepaths: &[Utf8PathBuf],
    templates: &[String],
    registry: &FieldRegistry,
    options: &OutputOptions,
) -> Result<()> {
    let undefined = options.undefined.as_deref().unwrap_or("");
    let separator = if options.null_separator { "\0" } else { " " };

    for filepath in filepaths {
        let mut rendered = Vec::new();
        for template in templates {
            rendered.extend(render_with_sentinel(filepath, registry, template)?);
        }
        let rendered: Vec<String> = rendered
            .iter()
            .map(|v| v.replace(none_str_sentinel(), undefined))
            .collect();
        let header = if options.no_filename {
            String::new()
        } else {
            format!("{}: ", display_name(filepath, options.path))
        };
        writeln!(writer, "{}{}", header, rendered.join(separator))?;
    }
    Ok(())
}

/// CSV mode: one row per file, one column per template (multi-value renders
/// join with a space), preceded by a header row of column names.
pub fn print_templates_to_csv<W: Write>(
    writer: W,
    filepaths: &[Utf8PathBuf],
    templates: &[String],
    registry: &FieldRegistry,
    options: &OutputOptions,
) -> Result<()> {
    let delimiter = csv_delimiter(options.delimiter.as_deref())?;
    let undefined = options.undefined.as_deref().unwrap_or("");

    let named: Vec<(String, String)> = templates
        .iter()
        .map(|t| field_name_for_template(t))
        .collect();
    let mut columns: Vec<String> = named.iter().map(|(name, _)| name.clone()).collect();
    let mut render_templates: Vec<String> =
        named.into_iter().map(|(_, template)| template).collect();
    if !options.no_filename {
        columns.insert(0, "filename".to_string());
        let filename_template = if options.path {
            "{filepath}"
        } else {
            "{filepath.name}"
        };
        render_templates.insert(0, filename_template.to_string());
    }

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    if !options.no_header {
        csv_writer.write_record(&columns)?;
    }
    for filepath in filepaths {
        let mut row = Vec::with_capacity(render_templates.len());
        for template in &render_templates {
            let rendered = render_with_sentinel(filepath, registry, template)?;
            row.push(rendered.join(" ").replace(none_str_sentinel(), undefined));
        }
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// JSON mode: an object per file (sorted keys, pretty-printed), or one array
/// of objects with `array`.
pub fn print_templates_to_json<W: Write>(
    writer: &mut W,
    filepaths: &[Utf8PathBuf],
    templates: &[String],
    registry: &FieldRegistry,
    options: &OutputOptions,
) -> Result<()> {
    let named: Vec<(String, String)> = templates
        .iter()
        .map(|t| field_name_for_template(t))
        .collect();

    let mut objects = Vec::with_capacity(filepaths.len());
    for filepath in filepaths {
        let mut data = serde_json::Map::new();
        for (name, template) in &named {
            let rendered = render_with_sentinel(filepath, registry, template)?;
            let value = if rendered.len() == 1 {
                json_value(&rendered[0], options)
            } else {
                Value::Array(rendered.iter().map(|v| json_value(v, options)).collect())
            };
            data.insert(name.clone(), value);
        }
        if !options.no_filename {
            data.insert(
                "filename".to_string(),
                Value::String(display_name(filepath, options.path).to_string()),
            );
        }
        objects.push(Value::Object(data));
    }

    if options.array {
        writeln!(writer, "{}", serde_json::to_string_pretty(&Value::Array(objects))?)?;
    } else {
        for object in &objects {
            writeln!(writer, "{}", serde_json::to_string_pretty(object)?)?;
        }
    }
    Ok(())
}

fn json_value(raw: &str, options: &OutputOptions) -> Value {
    match &options.undefined {
        Some(undefined) => Value::String(raw.replace(none_str_sentinel(), undefined)),
        None if raw == none_str_sentinel() => Value::Null,
        None => Value::String(raw.replace(none_str_sentinel(), "null")),
    }
}

fn csv_delimiter(option: Option<&str>) -> Result<u8> {
    let delimiter = option.unwrap_or(",");
    // Passing a literal tab on the command line is awkward, so accept the
    // escaped form and the word "tab".
    let delimiter = if delimiter == "\\t" || delimiter.eq_ignore_ascii_case("tab") {
        "\t"
    } else {
        delimiter
    };
    let bytes = delimiter.as_bytes();
    if bytes.len() != 1 {
        return Err(crate::error::MtlError::Syntax(format!(
            "CSV delimiter must be a single character: '{delimiter}'"
        )));
    }
    Ok(bytes[0])
}
