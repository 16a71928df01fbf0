//! Template evaluator.
//!
//! Walks the parsed segment tree with an accumulator of partial rendered
//! strings, resolving fields through the provider chain, expanding user
//! variables, applying filters and find/replace pairs, evaluating
//! conditionals, and combining each segment's alternatives into the
//! cartesian concatenation of the whole template.

use std::collections::HashMap;

use camino::Utf8Path;
use tracing::trace;

use super::ast::{CompareOp, Conditional, FilterCall, TemplateExpression, TemplateSegment, TemplateString};
use super::filters;
use super::grammar::parse_template;
use super::operators::{OperandKind, operand_kind};
use crate::error::{MtlError, Result};
use crate::fields::{self, FieldRegistry};

/// Custom-filter hook: `(name, argument, values) -> filtered values`.
/// Consulted for filter names the built-in catalog does not know.
pub type FilterHook = dyn Fn(&str, Option<&str>, &[String]) -> Result<Vec<String>>;

/// Pure string-to-string hook applied per value or per rendered string.
pub type SanitizeHook = dyn Fn(&str) -> String;

/// Options controlling a render.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Placeholder for unresolved values when no default is given. The host
    /// substitutes its user-visible "undefined" text for this afterwards.
    pub none_str: String,
    /// Join multi-value fields in place instead of producing alternatives.
    pub expand_inplace: bool,
    /// Separator used by `expand_inplace` when the template gives none.
    pub inplace_sep: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            none_str: "_".to_string(),
            expand_inplace: false,
            inplace_sep: ",".to_string(),
        }
    }
}

/// Renders MTL templates against one file.
///
/// A renderer owns its variable store, which is reset at the start of every
/// [`render`](Self::render) call; concurrent renders need distinct renderer
/// instances.
pub struct Renderer<'a> {
    filepath: &'a Utf8Path,
    registry: &'a FieldRegistry,
    options: RenderOptions,
    filter_hook: Option<Box<FilterHook>>,
    sanitize: Option<Box<SanitizeHook>>,
    sanitize_value: Option<Box<SanitizeHook>>,
    variables: HashMap<String, Vec<String>>,
}

impl<'a> Renderer<'a> {
    pub fn new(filepath: &'a Utf8Path, registry: &'a FieldRegistry) -> Self {
        Self {
            filepath,
            registry,
            options: RenderOptions::default(),
            filter_hook: None,
            sanitize: None,
            sanitize_value: None,
            variables: HashMap::new(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Handler for filter names outside the built-in catalog.
    pub fn with_filter_hook(
        mut self,
        hook: impl Fn(&str, Option<&str>, &[String]) -> Result<Vec<String>> + 'static,
    ) -> Self {
        self.filter_hook = Some(Box::new(hook));
        self
    }

    /// Applied to every fully rendered string.
    pub fn with_sanitize(mut self, hook: impl Fn(&str) -> String + 'static) -> Self {
        self.sanitize = Some(Box::new(hook));
        self
    }

    /// Applied to every field value as it comes out of the resolver chain.
    pub fn with_sanitize_value(mut self, hook: impl Fn(&str) -> String + 'static) -> Self {
        self.sanitize_value = Some(Box::new(hook));
        self
    }

    /// Render a template string to its list of rendered alternatives.
    pub fn render(&mut self, template: &str) -> Result<Vec<String>> {
        self.variables.clear();
        let parsed = parse_template(template)?;
        if parsed.segments.is_empty() {
            return Ok(Vec::new());
        }
        self.render_statement(&parsed)
    }

    fn render_statement(&mut self, statement: &TemplateString) -> Result<Vec<String>> {
        let mut results = Vec::new();
        for segment in &statement.segments {
            results = self.render_segment(segment, results)?;
        }
        if let Some(sanitize) = &self.sanitize {
            results = results.iter().map(|v| sanitize(v)).collect();
        }
        Ok(results)
    }

    /// Render a bool/combine/default clause; a clause that is present but
    /// empty renders to a single empty string.
    fn render_clause(&mut self, statement: &TemplateString) -> Result<Vec<String>> {
        if statement.segments.is_empty() {
            Ok(vec![String::new()])
        } else {
            self.render_statement(statement)
        }
    }

    fn render_segment(
        &mut self,
        segment: &TemplateSegment,
        results: Vec<String>,
    ) -> Result<Vec<String>> {
        let results = if results.is_empty() {
            vec![String::new()]
        } else {
            results
        };

        let Some(expr) = &segment.expression else {
            let text = format!("{}{}", segment.pre, segment.post);
            return Ok(results.into_iter().map(|r| r + &text).collect());
        };

        trace!("render_segment: field '{}'", expr.field);

        let delim = match &expr.delim {
            Some(d) => Some(self.expand_variables_to_str(d, "delim")?),
            None => None,
        };
        let combine_vals = match &expr.combine {
            Some(statement) => Some(self.render_clause(statement)?),
            None => None,
        };
        let bool_vals = match &expr.bool_clause {
            Some(statement) => Some(self.render_clause(statement)?),
            None => None,
        };
        let default = match &expr.default {
            Some(statement) => self.render_clause(statement)?,
            None => Vec::new(),
        };
        let comparands = match &expr.conditional {
            Some(cond) => self.render_statement(&cond.comparand)?,
            None => Vec::new(),
        };

        let mut vals: Vec<String>;
        if let Some(name) = expr.field.strip_prefix('%') {
            vals = self
                .variables
                .get(name)
                .cloned()
                .ok_or_else(|| MtlError::Syntax(format!("variable '{name}' is not defined")))?;
        } else if expr.field == "var" {
            let Some(name) = expr.subfield.as_deref() else {
                return Err(MtlError::Syntax(
                    "var must have a subfield and value in form {var:name,value}".to_string(),
                ));
            };
            if default.is_empty() {
                return Err(MtlError::Syntax(
                    "var must have a subfield and value in form {var:name,value}".to_string(),
                ));
            }
            // Empty strings are dropped from variable assignments.
            let values: Vec<String> = default.iter().filter(|d| !d.is_empty()).cloned().collect();
            self.variables.insert(name.to_string(), values);
            vals = Vec::new();
        } else {
            match self.resolve_field(expr, &default)? {
                Some(resolved) => vals = resolved.into_iter().flatten().collect(),
                None if expr.default.is_some() => vals = Vec::new(),
                None => return Err(MtlError::UnknownField(expr.field.clone())),
            }
        }

        if let Some(hook) = &self.sanitize_value {
            vals = vals.iter().map(|v| hook(v)).collect();
        }

        if self.options.expand_inplace || delim.is_some() {
            let sep = delim.unwrap_or_else(|| self.options.inplace_sep.clone());
            vals = if vals.is_empty() {
                Vec::new()
            } else {
                vec![vals.join(&sep)]
            };
        }

        for filter in &expr.filters {
            vals = self.apply_filter(filter, vals)?;
        }

        if !expr.find_replace.is_empty() {
            let mut pairs = Vec::with_capacity(expr.find_replace.len());
            for (find, replace) in &expr.find_replace {
                pairs.push((
                    self.expand_variables_to_str(find, "find/replace")?,
                    self.expand_variables_to_str(replace, "find/replace")?,
                ));
            }
            vals = vals
                .into_iter()
                .map(|mut v| {
                    for (find, replace) in &pairs {
                        v = v.replace(find.as_str(), replace);
                    }
                    v
                })
                .collect();
        }

        if let Some(cond) = &expr.conditional {
            vals = eval_conditional(cond, &comparands, &vals)?;
        }

        if let Some(combined) = combine_vals {
            vals.extend(combined.into_iter().filter(|v| !v.is_empty()));
        }

        if let Some(bool_results) = bool_vals {
            vals = if vals.is_empty() { default } else { bool_results };
        } else if vals.is_empty() && expr.field != "var" {
            vals = if default.is_empty() {
                vec![self.options.none_str.clone()]
            } else {
                default
            };
        }

        let rendered: Vec<String> = if vals.is_empty() {
            vec![format!("{}{}", segment.pre, segment.post)]
        } else {
            vals.iter()
                .map(|v| format!("{}{}{}", segment.pre, v, segment.post))
                .collect()
        };

        // Cartesian combination; earlier segments vary slowest.
        let mut combined = Vec::with_capacity(results.len() * rendered.len());
        for result in &results {
            for piece in &rendered {
                combined.push(format!("{result}{piece}"));
            }
        }
        Ok(combined)
    }

    /// Consult the resolver chain: registered providers, then punctuation,
    /// then the `strip`/`format` fields.
    fn resolve_field(
        &self,
        expr: &TemplateExpression,
        default: &[String],
    ) -> Result<Option<Vec<Option<String>>>> {
        if let Some(values) = self.registry.resolve(
            self.filepath,
            &expr.field,
            expr.subfield.as_deref(),
            expr.field_arg.as_deref(),
            default,
        )? {
            return Ok(Some(values));
        }
        if let Some(value) = fields::punctuation_value(&expr.field) {
            return Ok(Some(vec![Some(value.to_string())]));
        }
        self.format_values(expr, default)
    }

    fn format_values(
        &self,
        expr: &TemplateExpression,
        default: &[String],
    ) -> Result<Option<Vec<Option<String>>>> {
        match expr.field.as_str() {
            "strip" => Ok(Some(
                default.iter().map(|v| Some(v.trim().to_string())).collect(),
            )),
            "format" => {
                let subfield = expr.subfield.as_deref().unwrap_or_default();
                let Some((type_name, code)) = subfield.split_once(':') else {
                    return Err(MtlError::Syntax(
                        "format requires subfield in form TYPE:FORMAT".to_string(),
                    ));
                };
                let code = self.expand_variables_to_str(code, "format string")?;
                let formatted = default
                    .iter()
                    .map(|v| fields::format_typed(type_name, v, &code).map(Some))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(formatted))
            }
            _ => Ok(None),
        }
    }

    fn apply_filter(&self, filter: &FilterCall, values: Vec<String>) -> Result<Vec<String>> {
        let arg = match &filter.arg {
            Some(a) => Some(self.expand_variables_to_str(a, "filter arguments")?),
            None => None,
        };
        match filters::apply(&filter.name, arg.as_deref(), &values)? {
            Some(filtered) => Ok(filtered),
            None => match &self.filter_hook {
                Some(hook) => hook(&filter.name, arg.as_deref(), &values),
                None => Err(MtlError::Syntax(format!("unhandled filter: {}", filter.name))),
            },
        }
    }

    /// Expand `%name` references in a string context. `%%` escapes a literal
    /// percent; a multi-valued variable multiplies the results.
    fn expand_variables(&self, value: &str) -> Result<Vec<String>> {
        let mut results = vec![String::new()];
        let mut chars = value.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                for r in &mut results {
                    r.push(c);
                }
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                for r in &mut results {
                    r.push('%');
                }
                continue;
            }
            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_alphanumeric() || next == '_' {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                for r in &mut results {
                    r.push('%');
                }
            } else {
                let values = self
                    .variables
                    .get(&name)
                    .ok_or_else(|| MtlError::Syntax(format!("variable '{name}' is not defined")))?;
                results = results
                    .iter()
                    .flat_map(|r| values.iter().map(move |v| format!("{r}{v}")))
                    .collect();
            }
        }
        Ok(results)
    }

    /// Expand variables in a context that must stay single-valued.
    fn expand_variables_to_str(&self, value: &str, context: &str) -> Result<String> {
        let mut expanded = self.expand_variables(value)?;
        if expanded.len() != 1 {
            return Err(MtlError::Syntax(format!(
                "{context} must have a single value, not {expanded:?}"
            )));
        }
        Ok(expanded.remove(0))
    }
}

fn eval_conditional(cond: &Conditional, comparands: &[String], vals: &[String]) -> Result<Vec<String>> {
    let matched = match operand_kind(cond.op) {
        OperandKind::Text => {
            // Comparands carry OR alternatives separated by '|'.
            let alternatives: Vec<&str> = comparands.iter().flat_map(|c| c.split('|')).collect();
            vals.iter()
                .any(|v| alternatives.iter().any(|c| text_match(cond.op, v, c)))
        }
        OperandKind::List => {
            let mut lhs: Vec<&String> = vals.iter().collect();
            lhs.sort();
            let mut rhs: Vec<&String> = comparands.iter().collect();
            rhs.sort();
            if cond.op == CompareOp::Equal {
                lhs == rhs
            } else {
                lhs != rhs
            }
        }
        OperandKind::Numeric => {
            if comparands.len() != 1 {
                return Err(MtlError::Syntax(format!(
                    "comparison operators require a single value, not {comparands:?}"
                )));
            }
            let mut matched = false;
            for v in vals {
                let lhs = parse_comparand_number(v)?;
                let rhs = parse_comparand_number(&comparands[0])?;
                if numeric_match(cond.op, lhs, rhs) {
                    matched = true;
                    break;
                }
            }
            matched
        }
    };

    let truthy = matched != cond.negated;
    Ok(if truthy {
        vec!["True".to_string()]
    } else {
        Vec::new()
    })
}

fn text_match(op: CompareOp, value: &str, comparand: &str) -> bool {
    match op {
        CompareOp::Contains => value.contains(comparand),
        CompareOp::Matches => value == comparand,
        CompareOp::StartsWith => value.starts_with(comparand),
        CompareOp::EndsWith => value.ends_with(comparand),
        _ => false,
    }
}

fn numeric_match(op: CompareOp, lhs: f64, rhs: f64) -> bool {
    match op {
        CompareOp::LessThan => lhs < rhs,
        CompareOp::LessThanOrEqual => lhs <= rhs,
        CompareOp::GreaterThan => lhs > rhs,
        CompareOp::GreaterThanOrEqual => lhs >= rhs,
        _ => false,
    }
}

fn parse_comparand_number(value: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        MtlError::Syntax(format!(
            "comparison operators require values that convert to numbers: '{value}'"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldProvider, HelpEntry};

    /// Stub provider with the fixed fields the scenario table assumes.
    struct DemoFields;

    impl FieldProvider for DemoFields {
        fn resolve(
            &self,
            _filepath: &Utf8Path,
            field: &str,
            _subfield: Option<&str>,
            _field_arg: Option<&str>,
            _default: &[String],
        ) -> Result<Option<Vec<Option<String>>>> {
            let some = |v: &str| Some(v.to_string());
            match field {
                "filepath.name" => Ok(Some(vec![some("pears.jpg")])),
                "size" => Ok(Some(vec![some("2771656")])),
                "tags" => Ok(Some(vec![some("red"), some("green"), some("blue")])),
                "title" => Ok(Some(vec![])),
                "gapped" => Ok(Some(vec![some("a"), None, some("b")])),
                _ => Ok(None),
            }
        }

        fn help(&self) -> Vec<HelpEntry> {
            Vec::new()
        }
    }

    fn render(template: &str) -> Result<Vec<String>> {
        let mut registry = FieldRegistry::new();
        registry.register(Box::new(DemoFields));
        let path = Utf8Path::new("pears.jpg");
        Renderer::new(path, &registry).render(template)
    }

    fn rendered(template: &str) -> Vec<String> {
        render(template).unwrap()
    }

    #[test]
    fn test_literal_only_idempotence() {
        assert_eq!(rendered("plain text, no fields"), vec!["plain text, no fields"]);
    }

    #[test]
    fn test_empty_template() {
        assert_eq!(rendered(""), Vec::<String>::new());
    }

    #[test]
    fn test_simple_fields() {
        assert_eq!(rendered("{filepath.name}: {size}"), vec!["pears.jpg: 2771656"]);
    }

    #[test]
    fn test_multi_value_field() {
        assert_eq!(rendered("{tags}"), vec!["red", "green", "blue"]);
    }

    #[test]
    fn test_cartesian_order() {
        // Earlier segments vary slowest.
        assert_eq!(
            rendered("{tags}-{tags|slice(:2)}"),
            vec!["red-red", "red-green", "green-red", "green-green", "blue-red", "blue-green"]
        );
    }

    #[test]
    fn test_inline_delim() {
        assert_eq!(rendered("{+,tags}"), vec!["red,green,blue"]);
        assert_eq!(rendered("{+tags}"), vec!["redgreenblue"]);
        assert_eq!(rendered("{+ - tags}"), vec!["red - green - blue"]);
    }

    #[test]
    fn test_expand_inplace_option() {
        let mut registry = FieldRegistry::new();
        registry.register(Box::new(DemoFields));
        let path = Utf8Path::new("pears.jpg");
        let options = RenderOptions {
            expand_inplace: true,
            inplace_sep: "; ".to_string(),
            ..Default::default()
        };
        let mut renderer = Renderer::new(path, &registry).with_options(options);
        assert_eq!(renderer.render("{tags}").unwrap(), vec!["red; green; blue"]);
    }

    #[test]
    fn test_filters_compose() {
        assert_eq!(rendered("{tags|sort|join(-)}"), vec!["blue-green-red"]);
        assert_eq!(rendered("{tags|upper|lower}"), rendered("{tags|lower}"));
        assert_eq!(rendered("{tags|sort|reverse}"), rendered("{tags|rsort}"));
    }

    #[test]
    fn test_unknown_filter_without_hook() {
        assert!(matches!(render("{tags|frobnicate}"), Err(MtlError::Syntax(_))));
    }

    #[test]
    fn test_custom_filter_hook() {
        let mut registry = FieldRegistry::new();
        registry.register(Box::new(DemoFields));
        let path = Utf8Path::new("pears.jpg");
        let mut renderer = Renderer::new(path, &registry).with_filter_hook(|name, arg, values| {
            if name == "exclaim" {
                let mark = arg.unwrap_or("!");
                Ok(values.iter().map(|v| format!("{v}{mark}")).collect())
            } else {
                Err(MtlError::Syntax(format!("unhandled filter: {name}")))
            }
        });
        assert_eq!(
            renderer.render("{+,tags|exclaim}").unwrap(),
            vec!["red,green,blue!"]
        );
        assert!(renderer.render("{tags|frobnicate}").is_err());
    }

    #[test]
    fn test_unknown_field() {
        assert!(matches!(render("{nosuch}"), Err(MtlError::UnknownField(_))));
        assert_eq!(rendered("{nosuch,fallback}"), vec!["fallback"]);
    }

    #[test]
    fn test_empty_value_uses_default_or_placeholder() {
        assert_eq!(rendered("{title}"), vec!["_"]);
        assert_eq!(rendered("{title,untitled}"), vec!["untitled"]);
        assert_eq!(rendered("{title,}"), vec![""]);
    }

    #[test]
    fn test_none_entries_are_stripped() {
        assert_eq!(rendered("{+:gapped}"), vec!["a:b"]);
    }

    #[test]
    fn test_variable_round_trip() {
        assert_eq!(rendered("{var:x,hello}{%x}"), vec!["hello"]);
        assert!(matches!(render("{%x}"), Err(MtlError::Syntax(_))));
        assert!(matches!(render("{var:x}"), Err(MtlError::Syntax(_))));
    }

    #[test]
    fn test_assignment_only_template() {
        assert_eq!(rendered("{var:x,hello}"), vec![""]);
    }

    #[test]
    fn test_variable_in_filter_arg_and_delim() {
        assert_eq!(rendered("{var:d,-}{tags|sort|join(%d)}"), vec!["blue-green-red"]);
        assert_eq!(rendered("{var:d,;}{+%d tags}"), vec!["red; green; blue"]);
    }

    #[test]
    fn test_variable_escape_and_errors() {
        assert_eq!(rendered("{tags|sort|join(%%)}"), vec!["blue%green%red"]);
        assert!(matches!(render("{tags|join(%nope)}"), Err(MtlError::Syntax(_))));
        // Multi-valued variable cannot be a join separator.
        assert!(matches!(
            render("{var:m,{tags}}{tags|join(%m)}"),
            Err(MtlError::Syntax(_))
        ));
    }

    #[test]
    fn test_punctuation_fields() {
        assert_eq!(rendered("{openbrace}{size}{closebrace}"), vec!["{2771656}"]);
        assert_eq!(rendered("{pipe}{percent}{ampersand}{questionmark}"), vec!["|%&?"]);
        assert_eq!(rendered("a{comma}b{semicolon}c"), vec!["a,b;c"]);
        assert_eq!(rendered("{newline}"), vec!["\n"]);
        assert_eq!(rendered("{crlf}"), vec!["\r\n"]);
    }

    #[test]
    fn test_strip_and_format_fields() {
        assert_eq!(rendered("{strip,  padded  }"), vec!["padded"]);
        assert_eq!(rendered("{format:int:06d,{size}}"), vec!["2771656"]);
        assert_eq!(rendered("{format:int:010d,{size}}"), vec!["0002771656"]);
        assert_eq!(rendered("{format:float:.2f,3.14159}"), vec!["3.14"]);
        assert_eq!(rendered("{format:str:8s,abc}"), vec!["abc     "]);
        assert!(matches!(render("{format,x}"), Err(MtlError::Syntax(_))));
        assert!(matches!(render("{format:bool:d,x}"), Err(MtlError::Syntax(_))));
    }

    #[test]
    fn test_conditional_numeric() {
        assert_eq!(rendered("{size > 1000?big,small}"), vec!["big"]);
        assert_eq!(rendered("{size < 1000?big,small}"), vec!["small"]);
        assert_eq!(rendered("{size >= 2771656?yes,no}"), vec!["yes"]);
        assert_eq!(rendered("{size <= 2771655?yes,no}"), vec!["no"]);
        assert!(matches!(render("{tags > 1000?y,n}"), Err(MtlError::Syntax(_))));
    }

    #[test]
    fn test_conditional_without_bool_renders_true_or_placeholder() {
        assert_eq!(rendered("{size > 1000}"), vec!["True"]);
        assert_eq!(rendered("{size < 1000}"), vec!["_"]);
    }

    #[test]
    fn test_conditional_strings() {
        assert_eq!(rendered("{tags contains red?y,n}"), vec!["y"]);
        assert_eq!(rendered("{tags contains purple?y,n}"), vec!["n"]);
        assert_eq!(rendered("{tags matches green?y,n}"), vec!["y"]);
        assert_eq!(rendered("{tags matches gree?y,n}"), vec!["n"]);
        assert_eq!(rendered("{filepath.name startswith pear?y,n}"), vec!["y"]);
        assert_eq!(rendered("{filepath.name endswith .jpg?y,n}"), vec!["y"]);
    }

    #[test]
    fn test_conditional_or_alternatives() {
        assert_eq!(rendered("{tags matches purple|green?y,n}"), vec!["y"]);
        assert_eq!(rendered("{tags matches purple|orange?y,n}"), vec!["n"]);
    }

    #[test]
    fn test_conditional_negation_duality() {
        for (template, negated) in [
            ("{tags contains red?y,n}", "{tags contains not red?y,n}"),
            ("{size > 1000?y,n}", "{size > not 1000?y,n}"),
            ("{tags matches green?y,n}", "{tags matches not green?y,n}"),
        ] {
            let plain = rendered(template);
            let inverted = rendered(negated);
            assert_ne!(plain, inverted);
            assert!(plain == vec!["y"] || inverted == vec!["y"]);
        }
    }

    #[test]
    fn test_conditional_list_equality() {
        assert_eq!(rendered("{tags == {tags}?same,different}"), vec!["same"]);
        assert_eq!(rendered("{tags != {tags}?same,different}"), vec!["different"]);
        assert_eq!(rendered("{size == 2771656?y,n}"), vec!["y"]);
    }

    #[test]
    fn test_conditional_variable_comparand() {
        assert_eq!(
            rendered("{var:ext,jpg}{filepath.name endswith %ext?yes,no}"),
            vec!["yes"]
        );
    }

    #[test]
    fn test_find_replace() {
        assert_eq!(rendered("{filepath.name/jpg/jpeg}"), vec!["pears.jpeg"]);
        assert_eq!(rendered("{filepath.name/.jpg//pears/apples}"), vec!["apples"]);
        assert_eq!(
            rendered("{var:old,jpg}{var:new,png}{filepath.name/%old/%new}"),
            vec!["pears.png"]
        );
    }

    #[test]
    fn test_combine() {
        // Combine appends alternatives after any in-place joining.
        assert_eq!(
            rendered("{+,tags&{filepath.name}}"),
            vec!["red,green,blue", "pears.jpg"]
        );
        // Empty combine results are dropped.
        assert_eq!(rendered("{+,tags&{title,}}"), vec!["red,green,blue"]);
    }

    #[test]
    fn test_bool_clause() {
        assert_eq!(rendered("{tags?tagged,untagged}"), vec!["tagged"]);
        assert_eq!(rendered("{title?titled,untitled}"), vec!["untitled"]);
        // Bool with empty arms.
        assert_eq!(rendered("{tags?,none}"), vec![""]);
        assert_eq!(rendered("{title?some,}"), vec![""]);
    }

    #[test]
    fn test_delim_with_empty_values_respects_default() {
        assert_eq!(rendered("{+,title,empty}"), vec!["empty"]);
    }

    #[test]
    fn test_pre_and_post_survive_empty_values() {
        // A failed conditional with empty default keeps pre/post as the
        // single placeholder.
        assert_eq!(rendered("x{title?keep,}y"), vec!["xy"]);
    }

    #[test]
    fn test_nested_default() {
        assert_eq!(rendered("{nosuch,{filepath.name}}"), vec!["pears.jpg"]);
        assert_eq!(rendered("{title,{nosuch,deep}}"), vec!["deep"]);
    }

    #[test]
    fn test_variables_reset_between_renders() {
        let mut registry = FieldRegistry::new();
        registry.register(Box::new(DemoFields));
        let path = Utf8Path::new("pears.jpg");
        let mut renderer = Renderer::new(path, &registry);
        assert_eq!(renderer.render("{var:x,hello}{%x}").unwrap(), vec!["hello"]);
        assert!(renderer.render("{%x}").is_err());
    }

    #[test]
    fn test_sanitize_hooks() {
        let mut registry = FieldRegistry::new();
        registry.register(Box::new(DemoFields));
        let path = Utf8Path::new("pears.jpg");

        let mut renderer =
            Renderer::new(path, &registry).with_sanitize(|v| v.replace(' ', "_"));
        assert_eq!(
            renderer.render("{filepath.name} x").unwrap(),
            vec!["pears.jpg_x"]
        );

        let mut renderer =
            Renderer::new(path, &registry).with_sanitize_value(|v| v.to_uppercase());
        assert_eq!(renderer.render("{+,tags} x").unwrap(), vec!["RED,GREEN,BLUE x"]);
    }

    #[test]
    fn test_custom_none_str() {
        let mut registry = FieldRegistry::new();
        registry.register(Box::new(DemoFields));
        let path = Utf8Path::new("pears.jpg");
        let options = RenderOptions {
            none_str: "<missing>".to_string(),
            ..Default::default()
        };
        let mut renderer = Renderer::new(path, &registry).with_options(options);
        assert_eq!(renderer.render("{title}").unwrap(), vec!["<missing>"]);
    }
}
