//! Template grammar parser using Pest.
//!
//! The grammar lives in `src/pest/mtl.pest` and is compiled into [`MtlParser`]
//! at build time, so the metamodel is a process-wide immutable artifact that
//! any thread may query. This module walks the Pest parse tree into the owned
//! AST of [`super::ast`].

use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;
use tracing::trace;

use super::ast::{
    Conditional, FilterCall, TemplateExpression, TemplateSegment, TemplateString,
};
use super::operators::parse_compare_op;
use crate::error::{MtlError, Result};

/// MTL template parser generated from the Pest grammar.
#[derive(Parser)]
#[grammar = "pest/mtl.pest"]
pub struct MtlParser;

/// Parse a template string into its segment tree.
///
/// Unbalanced braces, stray punctuation inside an expression, and other
/// grammar violations surface as [`MtlError::Syntax`] carrying Pest's
/// position report.
pub fn parse_template(input: &str) -> Result<TemplateString> {
    trace!("parse_template called with: '{}'", input);
    let mut pairs =
        MtlParser::parse(Rule::template, input).map_err(|e| MtlError::Syntax(e.to_string()))?;
    let template = pairs.next().unwrap();
    Ok(build_statement(template.into_inner()))
}

/// Assemble a statement (top-level template or nested clause) from its parts.
///
/// Literal text preceding an expression becomes that segment's `pre`;
/// trailing literal text becomes the last expression's `post`, or a pure
/// literal segment when the statement holds no expression at all.
fn build_statement(pairs: Pairs<'_, Rule>) -> TemplateString {
    let mut segments: Vec<TemplateSegment> = Vec::new();
    let mut pending = String::new();

    for pair in pairs {
        match pair.as_rule() {
            Rule::expression => {
                segments.push(TemplateSegment {
                    pre: std::mem::take(&mut pending),
                    expression: Some(build_expression(pair)),
                    post: String::new(),
                });
            }
            Rule::cond_var => {
                // Bare %name inside a comparand is a variable reference.
                segments.push(TemplateSegment {
                    pre: std::mem::take(&mut pending),
                    expression: Some(TemplateExpression {
                        field: pair.as_str().to_string(),
                        ..Default::default()
                    }),
                    post: String::new(),
                });
            }
            Rule::literal
            | Rule::cond_literal
            | Rule::cond_percent
            | Rule::bool_literal
            | Rule::combine_literal
            | Rule::default_literal => pending.push_str(pair.as_str()),
            Rule::EOI => {}
            rule => trace!("build_statement: skipping rule {:?}", rule),
        }
    }

    if !pending.is_empty() {
        match segments.last_mut() {
            Some(seg) if seg.expression.is_some() => seg.post = pending,
            _ => segments.push(TemplateSegment {
                pre: pending,
                ..Default::default()
            }),
        }
    }

    TemplateString { segments }
}

fn build_expression(pair: Pair<'_, Rule>) -> TemplateExpression {
    let mut expr = TemplateExpression::default();

    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::delim => {
                expr.delim = Some(
                    item.into_inner()
                        .next()
                        .map(|t| t.as_str().to_string())
                        .unwrap_or_default(),
                );
            }
            Rule::field => expr.field = item.as_str().to_string(),
            Rule::subfield => {
                expr.subfield = item.into_inner().next().map(|t| t.as_str().to_string());
            }
            Rule::field_arg => {
                expr.field_arg = Some(
                    item.into_inner()
                        .next()
                        .map(|t| t.as_str().to_string())
                        .unwrap_or_default(),
                );
            }
            Rule::filter => {
                let mut name = String::new();
                let mut arg = None;
                for part in item.into_inner() {
                    match part.as_rule() {
                        Rule::filter_name => name = part.as_str().to_string(),
                        Rule::filter_args => {
                            arg = Some(
                                part.into_inner()
                                    .next()
                                    .map(|t| t.as_str().to_string())
                                    .unwrap_or_default(),
                            );
                        }
                        _ => {}
                    }
                }
                expr.filters.push(FilterCall { name, arg });
            }
            Rule::find_replace => {
                for fr in item.into_inner() {
                    let mut find = String::new();
                    let mut replace = String::new();
                    for part in fr.into_inner() {
                        match part.as_rule() {
                            Rule::fr_find => find = part.as_str().to_string(),
                            Rule::fr_replace => replace = part.as_str().to_string(),
                            _ => {}
                        }
                    }
                    expr.find_replace.push((find, replace));
                }
            }
            Rule::conditional => {
                let mut op = None;
                let mut negated = false;
                let mut comparand = TemplateString::default();
                for part in item.into_inner() {
                    match part.as_rule() {
                        Rule::operator => op = parse_compare_op(part.as_str()),
                        Rule::negation => negated = true,
                        Rule::comparand => comparand = build_statement(part.into_inner()),
                        _ => {}
                    }
                }
                if let Some(op) = op {
                    expr.conditional = Some(Conditional {
                        op,
                        negated,
                        comparand,
                    });
                }
            }
            Rule::bool_clause => {
                expr.bool_clause = Some(build_clause(item));
            }
            Rule::combine_clause => {
                expr.combine = Some(build_clause(item));
            }
            Rule::default_clause => {
                expr.default = Some(build_clause(item));
            }
            rule => trace!("build_expression: skipping rule {:?}", rule),
        }
    }

    expr
}

/// Unwrap a `*_clause` pair down to its `*_value` statement.
fn build_clause(pair: Pair<'_, Rule>) -> TemplateString {
    let value = pair.into_inner().next().unwrap();
    build_statement(value.into_inner())
}
