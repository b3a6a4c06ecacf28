//! Named parser tables.
//!
//! A [`ModuleBuilder`] collects named definitions and imported modules,
//! then compiles every definition into a [`ParserModule`]: the read-only
//! table runtime parsers, remote calls, and the generator resolve against.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;

use crate::combinator::error::BuildError;
use crate::combinator::ir::{NodeSpec, Program};
use crate::compiler::inline::inline_recognizer;
use crate::compiler::lower::{LinkContext, lower_program};
use crate::compiler::stage::Recognizer;
use crate::generator::{GenerateError, generate};
use crate::runtime::Parser;

/// Per-definition compile options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefineOptions {
    /// Expose a public parse entry point for this definition.
    pub entry_point: bool,
    /// Allow remote calls from other modules to target this definition.
    pub export_combinator: bool,
    /// Retain the IR for introspection and generation.
    pub export_metadata: bool,
    /// Run the redirect-inlining pass over the compiled stages.
    pub inline: bool,
    /// Print the compiled stage listing to standard error.
    pub debug: bool,
}

impl Default for DefineOptions {
    fn default() -> Self {
        Self {
            entry_point: true,
            export_combinator: false,
            export_metadata: false,
            inline: false,
            debug: false,
        }
    }
}

impl DefineOptions {
    /// Options for an internal combinator without a parse entry point.
    pub fn internal() -> Self {
        Self {
            entry_point: false,
            ..Self::default()
        }
    }

    /// Enables metadata export.
    pub fn with_metadata(mut self) -> Self {
        self.export_metadata = true;
        self
    }

    /// Enables combinator export for remote calls.
    pub fn with_export(mut self) -> Self {
        self.export_combinator = true;
        self
    }

    /// Enables the inlining pass.
    pub fn with_inline(mut self) -> Self {
        self.inline = true;
        self
    }
}

/// One compiled definition.
#[derive(Debug)]
pub(crate) struct CompiledDefinition {
    pub(crate) name: String,
    pub(crate) options: DefineOptions,
    pub(crate) recognizer: Recognizer,
    pub(crate) program: Option<Program>,
    pub(crate) metadata: Option<Vec<NodeSpec>>,
}

/// Builder collecting definitions and imports for one module.
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    name: String,
    definitions: Vec<(String, Program, DefineOptions)>,
    index: BTreeMap<String, usize>,
    imports: BTreeMap<String, Arc<ParserModule>>,
}

impl ModuleBuilder {
    /// Creates an empty module builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Registers an imported module for remote calls; the last import
    /// under a given module name wins.
    pub fn import(&mut self, module: Arc<ParserModule>) -> &mut Self {
        self.imports.insert(module.name().to_owned(), module);
        self
    }

    /// Declares one named definition.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        program: Program,
        options: DefineOptions,
    ) -> Result<&mut Self, BuildError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(BuildError::duplicate_definition(&name));
        }
        self.index.insert(name.clone(), self.definitions.len());
        self.definitions.push((name, program, options));
        Ok(self)
    }

    /// Compiles every definition and finalizes the module.
    pub fn compile(self) -> Result<ParserModule, BuildError> {
        let link = LinkContext {
            local: &self.index,
            imports: &self.imports,
        };

        let mut definitions = Vec::with_capacity(self.definitions.len());
        for (name, program, options) in &self.definitions {
            let recognizer = lower_program(program, &link)?;
            let recognizer = if options.inline {
                inline_recognizer(recognizer)
            } else {
                recognizer
            };
            if options.debug {
                eprintln!("{}.{name}:\n{recognizer}", self.name);
            }

            let metadata = options.export_metadata.then(|| program.spec());
            let stored = options.export_metadata.then(|| program.clone());
            definitions.push(CompiledDefinition {
                name: name.clone(),
                options: *options,
                recognizer,
                program: stored,
                metadata,
            });
        }

        Ok(ParserModule {
            name: self.name,
            definitions,
            index: self.index,
            imports: self.imports,
        })
    }
}

/// Compiled, read-only module of named parsers.
#[derive(Debug)]
pub struct ParserModule {
    name: String,
    definitions: Vec<CompiledDefinition>,
    index: BTreeMap<String, usize>,
    imports: BTreeMap<String, Arc<ParserModule>>,
}

impl ParserModule {
    /// Returns the module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a parse handle for a public entry point.
    pub fn parser(&self, name: &str) -> Option<Parser<'_>> {
        let index = self.lookup(name)?;
        self.definitions[index]
            .options
            .entry_point
            .then(|| Parser::new(self, index))
    }

    /// Returns the logical-order IR of a metadata-exporting definition.
    pub fn metadata(&self, name: &str) -> Option<&[NodeSpec]> {
        let index = self.lookup(name)?;
        self.definitions[index].metadata.as_deref()
    }

    /// Returns the compiled recognizer of a definition.
    pub fn recognizer(&self, name: &str) -> Option<&Recognizer> {
        let index = self.lookup(name)?;
        Some(&self.definitions[index].recognizer)
    }

    /// Generates one accepted input for a metadata-exporting definition.
    pub fn generate(&self, name: &str) -> Result<Vec<u8>, GenerateError> {
        self.generate_with_rng(name, &mut rand::thread_rng())
    }

    /// Like [`ParserModule::generate`], with a caller-supplied generator.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        name: &str,
        rng: &mut R,
    ) -> Result<Vec<u8>, GenerateError> {
        generate(self, name, rng)
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn definition(&self, index: usize) -> &CompiledDefinition {
        &self.definitions[index]
    }

    pub(crate) fn definition_exports_combinator(&self, index: usize) -> bool {
        self.definitions[index].options.export_combinator
    }

    pub(crate) fn import(&self, name: &str) -> Option<&Arc<ParserModule>> {
        self.imports.get(name)
    }
}
