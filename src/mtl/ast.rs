//! Abstract syntax tree for parsed MTL templates.
//!
//! The tree is owned by value and recursive: a [`TemplateExpression`] holds
//! further [`TemplateString`] children for its comparand, bool, combine, and
//! default clauses. Cycles are impossible since the tree is built purely from
//! parsed input.

/// A whole parsed template: an ordered sequence of segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateString {
    pub segments: Vec<TemplateSegment>,
}

/// One atom of a parsed template: literal pre-text, an optional expression,
/// and literal post-text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateSegment {
    pub pre: String,
    pub expression: Option<TemplateExpression>,
    pub post: String,
}

/// A brace-delimited template expression.
///
/// `field` is `size`-style plain, `filepath.name`-style dotted, `%name` for a
/// variable reference, or the literal `var` for variable assignment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateExpression {
    pub field: String,
    /// Colon-qualified subkey passed to the provider (`filepath:name`,
    /// `int:02d` for `format`).
    pub subfield: Option<String>,
    /// Parenthesized argument passed opaquely to the provider.
    pub field_arg: Option<String>,
    /// Join separator for multi-value results; `Some("")` is a valid empty
    /// separator, `None` means the field stays multi-valued.
    pub delim: Option<String>,
    pub filters: Vec<FilterCall>,
    /// Ordered `(find, replace)` pairs applied per value after filters.
    pub find_replace: Vec<(String, String)>,
    pub conditional: Option<Conditional>,
    /// Ternary arm rendered when the field resolves truthy.
    pub bool_clause: Option<TemplateString>,
    /// Expression whose non-empty results are appended to the field's.
    pub combine: Option<TemplateString>,
    /// Rendered when the field produces no values (and fed to providers).
    pub default: Option<TemplateString>,
}

/// A single filter invocation from a `|name` or `|name(arg)` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub arg: Option<String>,
}

/// A conditional clause: comparison operator, negation flag, and the
/// comparand expression it tests against. The comparand renders to one or
/// more comparison values (a multi-valued field or variable yields several).
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub op: CompareOp,
    pub negated: bool,
    pub comparand: TemplateString,
}

/// Comparison operators usable in a conditional clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Contains,
    Matches,
    StartsWith,
    EndsWith,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl TemplateString {
    /// Field names referenced by this template, in order of appearance.
    /// Does not verify that the fields are resolvable.
    pub fn fields(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| s.expression.as_ref())
            .map(|e| e.field.as_str())
            .collect()
    }

    /// First segment that carries an expression, if any.
    pub fn first_expression(&self) -> Option<&TemplateExpression> {
        self.segments.iter().find_map(|s| s.expression.as_ref())
    }
}
