//! Built-in value filters for `|name` and `|name(arg)` template clauses.
//!
//! Every filter transforms a list of rendered values. Element-level filters
//! map each value; list-level filters (`sort`, `uniq`, `slice`, ...) operate
//! on the list as a whole. Unknown names fall through to the evaluator's
//! custom-filter hook.

use crate::error::{MtlError, Result};

/// Filters that refuse to run without a non-empty argument.
const REQUIRES_ARG: &[&str] = &[
    "split", "chop", "chomp", "append", "prepend", "remove", "slice", "sslice",
];

/// Apply a built-in filter. Returns `Ok(None)` when the name is not a
/// built-in so the caller can try its custom-filter hook. The argument must
/// already have variables expanded.
pub fn apply(name: &str, arg: Option<&str>, values: &[String]) -> Result<Option<Vec<String>>> {
    if REQUIRES_ARG.contains(&name) && arg.is_none_or(str::is_empty) {
        return Err(MtlError::Syntax(format!("{name} requires arguments")));
    }

    let filtered = match name {
        "lower" => values.iter().map(|v| v.to_lowercase()).collect(),
        "upper" => values.iter().map(|v| v.to_uppercase()).collect(),
        "strip" => values.iter().map(|v| v.trim().to_string()).collect(),
        "capitalize" => values.iter().map(|v| capitalize(v)).collect(),
        "titlecase" => values.iter().map(|v| titlecase(v)).collect(),
        "braces" => values.iter().map(|v| format!("{{{v}}}")).collect(),
        "parens" => values.iter().map(|v| format!("({v})")).collect(),
        "brackets" => values.iter().map(|v| format!("[{v}]")).collect(),
        "shell_quote" => values.iter().map(|v| shell_quote(v)).collect(),
        "split" => {
            let sep = arg.unwrap_or_default();
            values
                .iter()
                .flat_map(|v| v.split(sep).map(str::to_string))
                .collect()
        }
        "autosplit" => values
            .iter()
            .flat_map(|v| {
                v.replace([',', ';'], " ")
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect(),
        "chop" => {
            let count = parse_count(name, arg)?;
            if count == 0 {
                values.to_vec()
            } else {
                values
                    .iter()
                    .map(|v| string_slice(v, None, Some(count.checked_neg().unwrap_or(i64::MAX))))
                    .collect()
            }
        }
        "chomp" => {
            let count = parse_count(name, arg)?;
            if count == 0 {
                values.to_vec()
            } else {
                values
                    .iter()
                    .map(|v| string_slice(v, Some(count), None))
                    .collect()
            }
        }
        "sort" => {
            let mut sorted = values.to_vec();
            sorted.sort();
            sorted
        }
        "rsort" => {
            let mut sorted = values.to_vec();
            sorted.sort();
            sorted.reverse();
            sorted
        }
        "reverse" => values.iter().rev().cloned().collect(),
        "uniq" => {
            let mut seen = Vec::new();
            for v in values {
                if !seen.contains(v) {
                    seen.push(v.clone());
                }
            }
            seen
        }
        "join" => vec![values.join(arg.unwrap_or_default())],
        "append" => {
            let mut extended = values.to_vec();
            extended.push(arg.unwrap_or_default().to_string());
            extended
        }
        "prepend" => {
            let mut extended = vec![arg.unwrap_or_default().to_string()];
            extended.extend_from_slice(values);
            extended
        }
        "appends" => {
            let suffix = arg.unwrap_or_default();
            values.iter().map(|v| format!("{v}{suffix}")).collect()
        }
        "prepends" => {
            let prefix = arg.unwrap_or_default();
            values.iter().map(|v| format!("{prefix}{v}")).collect()
        }
        "remove" => {
            let target = arg.unwrap_or_default();
            values.iter().filter(|v| *v != target).cloned().collect()
        }
        "slice" => {
            let indices = slice_indices(values.len(), arg.unwrap_or_default())?;
            indices.into_iter().map(|i| values[i].clone()).collect()
        }
        "sslice" => {
            let spec = arg.unwrap_or_default();
            values
                .iter()
                .map(|v| {
                    let chars: Vec<char> = v.chars().collect();
                    let indices = slice_indices(chars.len(), spec)?;
                    Ok(indices.into_iter().map(|i| chars[i]).collect::<String>())
                })
                .collect::<Result<Vec<_>>>()?
        }
        _ => return Ok(None),
    };

    Ok(Some(filtered))
}

fn parse_count(name: &str, arg: Option<&str>) -> Result<i64> {
    arg.unwrap_or_default()
        .parse::<i64>()
        .map_err(|_| MtlError::Syntax(format!("invalid value for {name}: {}", arg.unwrap_or_default())))
}

/// Character slice with index clamping; a negative bound counts from the
/// end, so `chop`/`chomp` trim from either end depending on sign.
fn string_slice(value: &str, start: Option<i64>, stop: Option<i64>) -> String {
    let chars: Vec<char> = value.chars().collect();
    slice_range(chars.len(), start, stop, 1)
        .into_iter()
        .map(|i| chars[i])
        .collect()
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn titlecase(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_word = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// POSIX shell quoting: safe strings pass through, everything else is
/// single-quoted with embedded quotes rewritten as `'"'"'`.
fn shell_quote(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    let safe = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\"'\"'"))
    }
}

/// Resolve a `START:END:STEP` slice expression into concrete indices,
/// honoring negative indices and negative steps.
fn slice_indices(len: usize, spec: &str) -> Result<Vec<usize>> {
    let parts: Vec<&str> = spec.split(':').collect();
    let parse = |s: &str| -> Result<Option<i64>> {
        if s.is_empty() {
            Ok(None)
        } else {
            s.parse::<i64>()
                .map(Some)
                .map_err(|_| MtlError::Syntax(format!("invalid slice: {spec}")))
        }
    };
    let (start, stop, step) = match parts.len() {
        1 => (Some(parse(parts[0])?.unwrap_or(0)), None, None),
        2 => (parse(parts[0])?, parse(parts[1])?, None),
        3 => (parse(parts[0])?, parse(parts[1])?, parse(parts[2])?),
        _ => return Err(MtlError::Syntax(format!("invalid slice: {spec}"))),
    };

    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(MtlError::Syntax("slice step cannot be zero".to_string()));
    }

    Ok(slice_range(len, start, stop, step))
}

fn slice_range(len: usize, start: Option<i64>, stop: Option<i64>, step: i64) -> Vec<usize> {
    let n = len as i64;
    let normalize = |i: i64, floor: i64, ceil: i64| -> i64 {
        let i = if i < 0 { i.saturating_add(n) } else { i };
        i.clamp(floor, ceil)
    };

    let mut indices = Vec::new();
    if step > 0 {
        let mut i = normalize(start.unwrap_or(0), 0, n);
        let stop = normalize(stop.unwrap_or(n), 0, n);
        while i < stop {
            indices.push(i as usize);
            i += step;
        }
    } else {
        let mut i = match start {
            Some(s) => normalize(s, -1, n - 1),
            None => n - 1,
        };
        let stop = match stop {
            Some(s) => normalize(s, -1, n - 1),
            None => -1,
        };
        while i > stop {
            indices.push(i as usize);
            i += step;
        }
    }
    indices
}
