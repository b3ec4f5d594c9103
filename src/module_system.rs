//! Tova module system: import path resolution, cross-file visibility
//! checks, import rewriting for emitted JavaScript, and circular-import
//! reporting.
//!
//! Relative `.tova` imports resolve against the importing file's
//! directory; a path with no extension that names a directory imports
//! that directory group. Anything else (npm packages, host modules) is
//! external and passes through untouched.

use crate::error::Diagnostic;
use crate::error_codes as codes;
use crate::parser::ast::{ImportDecl, ModuleExportTable, Program};
use std::path::{Component, Path, PathBuf};

/// What an import path points at, decided by the build driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// Sibling file merged into the same directory group - the import
    /// disappears entirely
    SameGroup,
    /// A `.tova` file with no block directives; emits `<base>.js`
    Module,
    /// An app file (or app directory group); emits `<base>.shared.js`
    App,
    /// npm package or host module - left untouched
    External,
    /// Relative `.tova` path with nothing on disk behind it
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportRewrite {
    Keep,
    Drop,
    Replace(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedImport {
    File(PathBuf),
    Dir(PathBuf),
    External,
}

pub fn is_relative_import(source: &str) -> bool {
    source.starts_with("./") || source.starts_with("../")
}

/// Resolve an import source against the importing file's directory.
pub fn resolve_import(importer_dir: &Path, source: &str) -> ResolvedImport {
    if !is_relative_import(source) {
        return ResolvedImport::External;
    }
    let joined = normalize(&importer_dir.join(source));
    if source.ends_with(".tova") {
        ResolvedImport::File(joined)
    } else if joined.is_dir() {
        ResolvedImport::Dir(joined)
    } else {
        // Extension-less file import
        ResolvedImport::File(joined.with_extension("tova"))
    }
}

/// Lexical `.`/`..` normalization; no filesystem access.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// How the import source string appears in emitted JavaScript.
/// `.tova` suffixes become `.js` for plain modules and `.shared.js` for
/// app files; same-group imports vanish (the files were merged).
pub fn rewrite_import(source: &str, target: &ImportTarget) -> ImportRewrite {
    match target {
        ImportTarget::SameGroup => ImportRewrite::Drop,
        ImportTarget::External | ImportTarget::Missing => ImportRewrite::Keep,
        ImportTarget::Module => {
            if let Some(stripped) = source.strip_suffix(".tova") {
                ImportRewrite::Replace(format!("{}.js", stripped))
            } else {
                // Directory group emitting a plain module
                ImportRewrite::Replace(format!("{}/{}.js", source, dir_base(source)))
            }
        }
        ImportTarget::App => {
            if let Some(stripped) = source.strip_suffix(".tova") {
                ImportRewrite::Replace(format!("{}.shared.js", stripped))
            } else {
                ImportRewrite::Replace(format!("{}/{}.shared.js", source, dir_base(source)))
            }
        }
    }
}

fn dir_base(source: &str) -> &str {
    source.rsplit('/').next().unwrap_or(source)
}

/// Check an import's named specifiers against the target module's export
/// table. Names present but private get the `pub` remedy; names absent
/// entirely are unresolved.
pub fn validate_import(import: &ImportDecl, table: &ModuleExportTable) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for spec in &import.specifiers {
        if table.public_exports.contains(&spec.imported) {
            continue;
        }
        if table.all_names.contains(&spec.imported) {
            diagnostics.push(
                Diagnostic::error(
                    codes::PRIVATE_ACCESS,
                    format!(
                        "'{}' exists in \"{}\" but is not public",
                        spec.imported, import.source
                    ),
                    spec.loc.clone(),
                )
                .with_fix(format!(
                    "add 'pub' to the declaration of '{}' in \"{}\"",
                    spec.imported, import.source
                )),
            );
        } else {
            diagnostics.push(Diagnostic::error(
                codes::UNRESOLVED_IDENTIFIER,
                format!(
                    "\"{}\" has no export named '{}'",
                    import.source, spec.imported
                ),
                spec.loc.clone(),
            ));
        }
    }
    diagnostics
}

pub fn missing_module_error(import: &ImportDecl) -> Diagnostic {
    Diagnostic::error(
        codes::MISSING_MODULE,
        format!("cannot resolve module \"{}\"", import.source),
        import.loc.clone(),
    )
}

/// Circular imports abort the build with the full chain.
pub fn cycle_error(chain: &[PathBuf], offender: &Path, import: &ImportDecl) -> Diagnostic {
    let mut rendered: Vec<String> = chain
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    rendered.push(offender.display().to_string());
    Diagnostic::error(
        codes::CIRCULAR_IMPORT,
        format!("circular import: {}", rendered.join(" -> ")),
        import.loc.clone(),
    )
    .with_hint("move the shared declarations into a module both sides can import")
}

/// A file with no block directives is a plain module emitting one `.js`.
pub fn is_module_file(program: &Program) -> bool {
    !program.body.iter().any(|item| item.is_block_directive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    #[test]
    fn test_rewrite_module_import() {
        assert_eq!(
            rewrite_import("./util.tova", &ImportTarget::Module),
            ImportRewrite::Replace("./util.js".to_string())
        );
    }

    #[test]
    fn test_rewrite_app_import() {
        assert_eq!(
            rewrite_import("./app.tova", &ImportTarget::App),
            ImportRewrite::Replace("./app.shared.js".to_string())
        );
    }

    #[test]
    fn test_same_group_import_dropped() {
        assert_eq!(
            rewrite_import("./sibling.tova", &ImportTarget::SameGroup),
            ImportRewrite::Drop
        );
    }

    #[test]
    fn test_external_import_kept() {
        assert_eq!(
            rewrite_import("express", &ImportTarget::External),
            ImportRewrite::Keep
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
    }

    #[test]
    fn test_is_module_file() {
        let module = Parser::parse_source("pub fn f() { 1 }", "m.tova").unwrap();
        assert!(is_module_file(&module));
        let app = Parser::parse_source("client { state n = 0 }", "a.tova").unwrap();
        assert!(!is_module_file(&app));
    }

    #[test]
    fn test_validate_import_private_access() {
        let target = Parser::parse_source("fn secret() { 1 }\npub fn open() { 2 }", "m.tova")
            .unwrap();
        let table = crate::parser::ast::ModuleExportTable::from_program(&target);

        let importer =
            Parser::parse_source("import { secret, open } from \"./m.tova\"", "a.tova").unwrap();
        let import = match &importer.body[0] {
            crate::parser::ast::Item::Import(import) => import.clone(),
            other => panic!("expected import, got {:?}", other),
        };

        let diags = validate_import(&import, &table);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, codes::PRIVATE_ACCESS);
        assert!(diags[0].fix.as_deref().unwrap().contains("pub"));
    }

    #[test]
    fn test_validate_import_missing_name() {
        let target = Parser::parse_source("pub fn open() { 2 }", "m.tova").unwrap();
        let table = crate::parser::ast::ModuleExportTable::from_program(&target);
        let importer =
            Parser::parse_source("import { nope } from \"./m.tova\"", "a.tova").unwrap();
        let import = match &importer.body[0] {
            crate::parser::ast::Item::Import(import) => import.clone(),
            other => panic!("expected import, got {:?}", other),
        };
        let diags = validate_import(&import, &table);
        assert_eq!(diags[0].code, codes::UNRESOLVED_IDENTIFIER);
    }
}
