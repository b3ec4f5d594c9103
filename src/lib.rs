// Allow recursive functions that use self only for recursion
// This is common in AST traversal code
#![allow(clippy::only_used_in_recursion)]

//! The Tova compiler: a full-stack application language compiling
//! `.tova` sources into shared, server, and client JavaScript modules.
//!
//! Pipeline: lexer -> parser -> semantic analyzer -> code generator,
//! with a directory merger that treats sibling `.tova` files as one
//! compilation unit and an incremental content-hash build cache.

pub mod analyzer;
pub mod build;
pub mod cache;
pub mod codegen;
pub mod config;
pub mod error;
pub mod error_codes;
pub mod fuzzy_matcher;
pub mod lexer;
pub mod merger;
pub mod module_system;
pub mod parser;
pub mod runtime;
pub mod stdlib;

pub use build::{build, BuildOptions, BuildSummary};
pub use error::{Diagnostic, Loc, Severity};

/// Compile one in-memory source to its artifact set. Convenience entry
/// for tests and tooling; the build driver handles multi-file projects.
pub fn compile_source(
    source: &str,
    file: &str,
    base: &str,
) -> Result<(codegen::CompiledOutputs, Vec<Diagnostic>), parser::ParseError> {
    let program = parser::Parser::parse_source(source, file)?;
    let diagnostics = analyzer::analyze(&program, false);
    let outputs = codegen::generate(&program, base);
    Ok((outputs, diagnostics))
}
