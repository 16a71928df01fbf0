//! Metadata Template Language (MTL): grammar, AST, and evaluator.
//!
//! An MTL template interleaves literal text with brace-delimited expressions:
//!
//! ```text
//! {filepath.name}: {size} bytes
//! {+,tags|sort}
//! {size > 1000000?big,small}
//! {var:ext,jpg}{filepath.name endswith %ext?match,no match}
//! ```
//!
//! Inside the braces an expression names a field and may add, in order: a
//! `+`-prefixed join separator, a `:subfield`, a parenthesized field
//! argument, `|filter` clauses, `/find/replace` pairs, a conditional, a `?`
//! ternary arm, an `&` combine arm, and a `,` default. Rendering an
//! expression yields a list of zero or more strings; a template's output is
//! the cartesian concatenation of its segments' alternatives.
//!
//! Field values come from a chain of [`FieldProvider`]s consulted in order
//! (registered providers first, then the built-in punctuation and format
//! fields); the first provider to claim a field wins.
//!
//! [`FieldProvider`]: crate::fields::FieldProvider

pub mod ast;
pub mod eval;
pub mod filters;
pub mod grammar;
pub mod operators;

pub use ast::{
    CompareOp, Conditional, FilterCall, TemplateExpression, TemplateSegment, TemplateString,
};
pub use eval::{FilterHook, RenderOptions, Renderer, SanitizeHook};
pub use grammar::{MtlParser, Rule, parse_template};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reexport() {
        let parsed = parse_template("{size} bytes").unwrap();
        assert_eq!(parsed.fields(), vec!["size"]);
    }

    #[test]
    fn test_grammar_is_shareable_across_threads() {
        // The grammar is compiled into the parser type; parsing from several
        // threads at once needs no synchronization.
        let handles: Vec<_> = (0..4)
            .map(|i| {
                std::thread::spawn(move || {
                    let template = format!("{{size}} thread {i}");
                    parse_template(&template).unwrap().segments.len()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
    }
}
