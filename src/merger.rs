//! Directory merger: all `.tova` files in one directory compile as a
//! single unit. Non-recursive - subdirectories remain separate groups.
//!
//! Member programs concatenate in sorted-path order; every node already
//! carries its source file in `loc.file`, which is the provenance the
//! source-map emitter and duplicate reporting rely on.

use crate::error::{Diagnostic, Loc};
use crate::error_codes as codes;
use crate::parser::ast::*;
use std::collections::HashMap;

pub struct MergeResult {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

/// Concatenate member programs (pre-sorted by path) and validate
/// cross-file uniqueness. Same-directory import pruning happens in the
/// driver's rewrite pass, before codegen.
pub fn merge_programs(files: Vec<(String, Program)>) -> MergeResult {
    let mut body = Vec::new();
    for (_, program) in files {
        body.extend(program.body);
    }
    let program = Program { body };
    let diagnostics = validate_merge(&program);
    MergeResult {
        program,
        diagnostics,
    }
}

/// One name-uniqueness domain: e.g. "component", "server function".
struct UniqueSet {
    what: &'static str,
    seen: HashMap<String, Loc>,
}

impl UniqueSet {
    fn new(what: &'static str) -> Self {
        Self {
            what,
            seen: HashMap::new(),
        }
    }

    fn insert(&mut self, name: &str, loc: &Loc, diagnostics: &mut Vec<Diagnostic>) {
        match self.seen.get(name) {
            Some(first) => diagnostics.push(
                Diagnostic::error(
                    codes::MERGE_CONFLICT,
                    format!(
                        "Duplicate {} '{}' declared in {}:{} and {}:{}",
                        self.what, name, first.file, first.line, loc.file, loc.line
                    ),
                    loc.clone(),
                )
                .with_hint("names must be unique across all files in a directory group"),
            ),
            None => {
                self.seen.insert(name.to_string(), loc.clone());
            }
        }
    }
}

/// Per-label-group uniqueness state for server blocks.
#[derive(Default)]
struct ServerGroup {
    functions: HashMap<String, Loc>,
    models: HashMap<String, Loc>,
    routes: HashMap<(String, String), Loc>,
    singletons: HashMap<&'static str, Loc>,
}

pub fn validate_merge(program: &Program) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    // Client namespace is the union of every client block
    let mut components = UniqueSet::new("component");
    let mut states = UniqueSet::new("state");
    let mut computeds = UniqueSet::new("computed");
    let mut stores = UniqueSet::new("store");
    let mut client_fns = UniqueSet::new("client function");

    // Shared namespace: shared blocks plus free-floating top-level items
    let mut shared_types = UniqueSet::new("type");
    let mut shared_fns = UniqueSet::new("function");
    let mut shared_ifaces = UniqueSet::new("interface");

    let mut server_groups: HashMap<Option<String>, ServerGroup> = HashMap::new();

    for item in &program.body {
        match item {
            Item::ClientBlock { body, .. } => {
                for stmt in body {
                    match stmt {
                        Stmt::Component(decl) => {
                            components.insert(&decl.name, &decl.loc, &mut diagnostics)
                        }
                        Stmt::State { name, loc, .. } => {
                            states.insert(name, loc, &mut diagnostics)
                        }
                        Stmt::ComputedDecl { name, loc, .. } => {
                            computeds.insert(name, loc, &mut diagnostics)
                        }
                        Stmt::StoreDecl { name, loc, .. } => {
                            stores.insert(name, loc, &mut diagnostics)
                        }
                        Stmt::Function(decl) => {
                            client_fns.insert(&decl.name, &decl.loc, &mut diagnostics)
                        }
                        _ => {}
                    }
                }
            }
            Item::ServerBlock { name, body, .. } => {
                let group = server_groups.entry(name.clone()).or_default();
                for stmt in body {
                    match stmt {
                        Stmt::Function(decl) => {
                            record_unique(
                                &mut group.functions,
                                "server function",
                                &decl.name,
                                &decl.loc,
                                &mut diagnostics,
                            );
                        }
                        Stmt::Model { name, loc, .. } => {
                            record_unique(
                                &mut group.models,
                                "model",
                                name,
                                loc,
                                &mut diagnostics,
                            );
                        }
                        Stmt::Route(route) => {
                            record_route(&mut group.routes, route, None, &mut diagnostics)
                        }
                        Stmt::RouteGroup { prefix, routes, .. } => {
                            for route in routes {
                                record_route(
                                    &mut group.routes,
                                    route,
                                    Some(prefix),
                                    &mut diagnostics,
                                );
                            }
                        }
                        Stmt::Db { loc, .. } => {
                            record_singleton(&mut group.singletons, "db", loc, &mut diagnostics)
                        }
                        Stmt::ConfigSingleton { kind, loc, .. } => record_singleton(
                            &mut group.singletons,
                            kind.as_str(),
                            loc,
                            &mut diagnostics,
                        ),
                        _ => {}
                    }
                }
            }
            Item::SharedBlock { body, .. } => {
                for stmt in body {
                    record_shared(
                        stmt,
                        &mut shared_types,
                        &mut shared_fns,
                        &mut shared_ifaces,
                        &mut diagnostics,
                    );
                }
            }
            Item::Statement(stmt) => {
                record_shared(
                    stmt,
                    &mut shared_types,
                    &mut shared_fns,
                    &mut shared_ifaces,
                    &mut diagnostics,
                );
            }
            _ => {}
        }
    }

    diagnostics
}

fn record_shared(
    stmt: &Stmt,
    types: &mut UniqueSet,
    fns: &mut UniqueSet,
    ifaces: &mut UniqueSet,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match stmt {
        Stmt::TypeDecl(decl) => types.insert(&decl.name, &decl.loc, diagnostics),
        Stmt::TypeAlias { name, loc, .. } => types.insert(name, loc, diagnostics),
        Stmt::Function(decl) => fns.insert(&decl.name, &decl.loc, diagnostics),
        Stmt::Interface { name, loc, .. } | Stmt::TraitDecl { name, loc, .. } => {
            ifaces.insert(name, loc, diagnostics)
        }
        _ => {}
    }
}

fn record_unique(
    seen: &mut HashMap<String, Loc>,
    what: &str,
    name: &str,
    loc: &Loc,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match seen.get(name) {
        Some(first) => diagnostics.push(Diagnostic::error(
            codes::MERGE_CONFLICT,
            format!(
                "Duplicate {} '{}' declared in {}:{} and {}:{}",
                what, name, first.file, first.line, loc.file, loc.line
            ),
            loc.clone(),
        )),
        None => {
            seen.insert(name.to_string(), loc.clone());
        }
    }
}

fn record_route(
    seen: &mut HashMap<(String, String), Loc>,
    route: &RouteDecl,
    prefix: Option<&str>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let path = match prefix {
        Some(prefix) => format!("{}{}", prefix, route.path),
        None => route.path.clone(),
    };
    let key = (route.method.as_str().to_string(), path.clone());
    match seen.get(&key) {
        Some(first) => diagnostics.push(Diagnostic::error(
            codes::MERGE_CONFLICT,
            format!(
                "Duplicate route {} {} declared in {}:{} and {}:{}",
                route.method, path, first.file, first.line, route.loc.file, route.loc.line
            ),
            route.loc.clone(),
        )),
        None => {
            seen.insert(key, route.loc.clone());
        }
    }
}

fn record_singleton(
    seen: &mut HashMap<&'static str, Loc>,
    kind: &'static str,
    loc: &Loc,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match seen.get(kind) {
        Some(first) => diagnostics.push(Diagnostic::error(
            codes::MERGE_CONFLICT,
            format!(
                "Duplicate '{}' declaration in {}:{} and {}:{}",
                kind, first.file, first.line, loc.file, loc.line
            ),
            loc.clone(),
        )),
        None => {
            seen.insert(kind, loc.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn merge(sources: &[(&str, &str)]) -> MergeResult {
        let files = sources
            .iter()
            .map(|(name, source)| {
                (
                    name.to_string(),
                    Parser::parse_source(source, name).unwrap(),
                )
            })
            .collect();
        merge_programs(files)
    }

    #[test]
    fn test_clean_merge() {
        let result = merge(&[
            ("a.tova", "client { component Header() { <h1>hi</h1> } }"),
            ("b.tova", "client { component Footer() { <p>bye</p> } }"),
        ]);
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.program.body.len(), 2);
    }

    #[test]
    fn test_duplicate_component_across_files() {
        let result = merge(&[
            ("a.tova", "client { component Header() { <h1>a</h1> } }"),
            ("b.tova", "client { component Header() { <h1>b</h1> } }"),
        ]);
        assert_eq!(result.diagnostics.len(), 1);
        let message = &result.diagnostics[0].message;
        assert!(message.contains("Duplicate component 'Header'"));
        assert!(message.contains("a.tova"));
        assert!(message.contains("b.tova"));
    }

    #[test]
    fn test_server_label_groups_are_separate() {
        // Same function name in differently-labeled server blocks is fine
        let result = merge(&[
            ("a.tova", "server { fn handle(req) { 1 } }"),
            ("b.tova", "server \"admin\" { fn handle(req) { 2 } }"),
        ]);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_duplicate_server_fn_same_group() {
        let result = merge(&[
            ("a.tova", "server { fn handle(req) { 1 } }"),
            ("b.tova", "server { fn handle(req) { 2 } }"),
        ]);
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0]
            .message
            .contains("Duplicate server function 'handle'"));
    }

    #[test]
    fn test_duplicate_route_across_files() {
        let result = merge(&[
            (
                "a.tova",
                "server { fn a(req) { 1 }\nroute GET \"/x\" => a }",
            ),
            (
                "b.tova",
                "server { fn b(req) { 2 }\nroute GET \"/x\" => b }",
            ),
        ]);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.message.contains("Duplicate route GET /x")));
    }

    #[test]
    fn test_duplicate_db_singleton() {
        let result = merge(&[
            ("a.tova", "server { db { provider: \"sqlite\" } }"),
            ("b.tova", "server { db { provider: \"postgres\" } }"),
        ]);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.message.contains("Duplicate 'db'")));
    }

    #[test]
    fn test_duplicate_shared_type() {
        let result = merge(&[
            ("a.tova", "shared { type User { name: String } }"),
            ("b.tova", "shared { type User { id: Int } }"),
        ]);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.message.contains("Duplicate type 'User'")));
    }

    #[test]
    fn test_duplicate_state_across_files() {
        let result = merge(&[
            ("a.tova", "client { state count = 0 }"),
            ("b.tova", "client { state count = 1 }"),
        ]);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.message.contains("Duplicate state 'count'")));
    }
}
