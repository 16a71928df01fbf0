// lib.rs - Library structure and public API

pub mod error;
pub mod fields;
pub mod mtl;
pub mod output;
pub mod providers;

pub use error::{MtlError, Result};
pub use fields::{FieldProvider, FieldRegistry, HelpEntry, PUNCTUATION_FIELDS};
pub use mtl::{
    CompareOp, Conditional, FilterCall, RenderOptions, Renderer, TemplateExpression,
    TemplateSegment, TemplateString, parse_template,
};
pub use output::{
    OutputOptions, field_name_for_template, none_str_sentinel, print_templates,
    print_templates_to_csv, print_templates_to_json,
};
pub use providers::{FilePathProvider, FileStatProvider};

use camino::Utf8Path;

/// Registry with the standard file providers registered: file path fields
/// first, then file stat fields.
pub fn default_registry() -> FieldRegistry {
    let mut registry = FieldRegistry::new();
    registry.register(Box::new(FilePathProvider));
    registry.register(Box::new(FileStatProvider));
    registry
}

/// High-level API: render templates against one file.
pub struct FileTemplate<'a> {
    filepath: &'a Utf8Path,
    registry: &'a FieldRegistry,
}

impl<'a> FileTemplate<'a> {
    pub fn new(filepath: &'a Utf8Path, registry: &'a FieldRegistry) -> Self {
        Self { filepath, registry }
    }

    /// Render with default options (`_` placeholder, no in-place joining).
    pub fn render(&self, template: &str) -> Result<Vec<String>> {
        self.render_with_options(template, RenderOptions::default())
    }

    pub fn render_with_options(
        &self,
        template: &str,
        options: RenderOptions,
    ) -> Result<Vec<String>> {
        Renderer::new(self.filepath, self.registry)
            .with_options(options)
            .render(template)
    }
}
