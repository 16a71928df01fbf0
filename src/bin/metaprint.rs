// metaprint - print file metadata rendered from MTL templates

use clap::{Arg, ArgAction, Command};
use std::io;

use camino::Utf8PathBuf;
use metaprint::{FieldRegistry, HelpEntry, MtlError, OutputOptions, default_registry};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let registry = default_registry();

    let matches = Command::new("metaprint")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Print metadata info for files using metadata templates")
        .disable_help_flag(true)
        .arg(
            Arg::new("help")
                .long("help")
                .action(ArgAction::Help)
                .help("Show this message and exit"),
        )
        .arg(
            Arg::new("print")
                .short('p')
                .long("print")
                .value_name("TEMPLATE")
                .action(ArgAction::Append)
                .required(true)
                .help(
                    "Template to use for printing metadata to stdout. \
                     May be repeated to print multiple templates.",
                ),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .action(ArgAction::SetTrue)
                .conflicts_with("csv")
                .help(
                    "Print metadata as JSON. The JSON key is the template name; name a \
                     template with 'name:TEMPLATE' or 'name=TEMPLATE'.",
                ),
        )
        .arg(
            Arg::new("csv")
                .short('c')
                .long("csv")
                .action(ArgAction::SetTrue)
                .help(
                    "Print metadata as CSV. The column name is the template name; name a \
                     template with 'name:TEMPLATE' or 'name=TEMPLATE'.",
                ),
        )
        .arg(
            Arg::new("array")
                .short('a')
                .long("array")
                .action(ArgAction::SetTrue)
                .requires("json")
                .help("With --json, output a JSON array of objects instead of single objects"),
        )
        .arg(
            Arg::new("delimiter")
                .short('d')
                .long("delimiter")
                .value_name("DELIMITER")
                .requires("csv")
                .help(
                    "Field delimiter for CSV output; default is comma. \
                     Use '\\t' or 'tab' for tab.",
                ),
        )
        .arg(
            Arg::new("no-header")
                .short('h')
                .long("no-header")
                .action(ArgAction::SetTrue)
                .requires("csv")
                .help("Do not print headers with CSV output"),
        )
        .arg(
            Arg::new("no-filename")
                .short('f')
                .long("no-filename")
                .action(ArgAction::SetTrue)
                .help(
                    "Do not print the filename: with -p, omits the filename header; \
                     with -c, omits the filename column; with -j, omits the 'filename' key",
                ),
        )
        .arg(
            Arg::new("path")
                .short('P')
                .long("path")
                .action(ArgAction::SetTrue)
                .conflicts_with("no-filename")
                .help("Print the full file path instead of the filename"),
        )
        .arg(
            Arg::new("null-separator")
                .short('0')
                .long("null-separator")
                .action(ArgAction::SetTrue)
                .conflicts_with_all(["json", "csv"])
                .help("Use the null character as field separator with -p/--print"),
        )
        .arg(
            Arg::new("undefined")
                .short('u')
                .long("undefined")
                .value_name("STRING")
                .help(
                    "String to use for undefined values. Default is an empty string for \
                     standard output and --csv, and null for --json.",
                ),
        )
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .num_args(1..)
                .required(true)
                .help("Files to print metadata for"),
        )
        .after_help(template_help(&registry))
        .get_matches();

    let templates: Vec<String> = matches
        .get_many::<String>("print")
        .unwrap_or_default()
        .cloned()
        .collect();
    let files: Vec<Utf8PathBuf> = matches
        .get_many::<String>("files")
        .unwrap_or_default()
        .map(|f| Utf8PathBuf::from(f.clone()))
        .collect();

    for file in &files {
        if !file.exists() {
            eprintln!("error: file does not exist: {file}");
            std::process::exit(2);
        }
    }

    let options = OutputOptions {
        no_filename: matches.get_flag("no-filename"),
        path: matches.get_flag("path"),
        null_separator: matches.get_flag("null-separator"),
        no_header: matches.get_flag("no-header"),
        array: matches.get_flag("array"),
        delimiter: matches.get_one::<String>("delimiter").cloned(),
        undefined: matches.get_one::<String>("undefined").cloned(),
    };

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let result = if matches.get_flag("csv") {
        metaprint::print_templates_to_csv(&mut writer, &files, &templates, &registry, &options)
    } else if matches.get_flag("json") {
        metaprint::print_templates_to_json(&mut writer, &files, &templates, &registry, &options)
    } else {
        metaprint::print_templates(&mut writer, &files, &templates, &registry, &options)
    };

    if let Err(error) = result {
        match error {
            MtlError::UnknownField(field) => eprintln!("unknown template field: {field}"),
            other => eprintln!("error: {other}"),
        }
        std::process::exit(1);
    }
}

/// Assemble the template-system help shown after the option list: entries
/// from every registered provider, then the built-in field tables.
fn template_help(registry: &FieldRegistry) -> String {
    let mut out = String::from("Template System:\n");
    let entries = registry
        .help()
        .into_iter()
        .chain(FieldRegistry::builtin_help());
    for entry in entries {
        match entry {
            HelpEntry::Markdown(text) => {
                out.push('\n');
                out.push_str(&text);
                out.push('\n');
            }
            HelpEntry::Table(rows) => {
                let width = rows
                    .iter()
                    .filter_map(|row| row.first())
                    .map(|cell| cell.len())
                    .max()
                    .unwrap_or(0);
                for row in rows {
                    let name = row.first().map(String::as_str).unwrap_or("");
                    let description = row.get(1).map(String::as_str).unwrap_or("");
                    out.push_str(&format!("  {name:<width$}  {description}\n"));
                }
            }
        }
    }
    out
}
