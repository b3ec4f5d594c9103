//! Semantic analysis: scope resolution, mutability and visibility rules,
//! and the warning set (shadowing, unused bindings, ignored values).
//!
//! The analyzer walks the AST with a scope stack and collects
//! diagnostics; it never aborts on the first problem. In strict mode
//! every warning is promoted to an error before the batch is returned.

use crate::error::{Diagnostic, Loc};
use crate::error_codes as codes;
use crate::fuzzy_matcher;
use crate::parser::ast::*;
use crate::stdlib;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Type,
    Parameter,
    Interface,
    Trait,
    Import,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub declared_at: Loc,
    pub is_public: bool,
    pub is_mutable: bool,
}

#[derive(Default)]
struct ScopeData {
    symbols: HashMap<String, Symbol>,
    used: HashSet<String>,
}

pub struct Analyzer {
    strict: bool,
    scopes: Vec<ScopeData>,
    diagnostics: Vec<Diagnostic>,
}

/// Analyze a whole program. Returns the collected diagnostics; the build
/// fails iff any has error severity.
pub fn analyze(program: &Program, strict: bool) -> Vec<Diagnostic> {
    Analyzer::new(strict).run(program)
}

impl Analyzer {
    pub fn new(strict: bool) -> Self {
        Analyzer {
            strict,
            scopes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn run(mut self, program: &Program) -> Vec<Diagnostic> {
        // Global scope holds the built-in stdlib names
        self.push_scope();
        for name in stdlib::builtin_names() {
            self.scopes[0].symbols.insert(
                name.to_string(),
                Symbol {
                    name: name.to_string(),
                    kind: SymbolKind::Function,
                    declared_at: Loc::default(),
                    is_public: false,
                    is_mutable: false,
                },
            );
        }

        // File scope: imports, top-level statements, and shared-block
        // declarations hoist here so every block sees them
        self.push_scope();
        for item in &program.body {
            match item {
                Item::Import(import) => self.declare_import(import),
                Item::Statement(stmt) => self.hoist_stmt(stmt, true),
                Item::SharedBlock { body, .. } => {
                    for stmt in body {
                        self.hoist_stmt(stmt, true);
                    }
                }
                _ => {}
            }
        }

        for item in &program.body {
            match item {
                Item::Import(_) => {}
                Item::Statement(stmt) => self.walk_stmt(stmt, true),
                Item::SharedBlock { body, .. } => {
                    for stmt in body {
                        self.walk_stmt(stmt, true);
                    }
                }
                Item::ServerBlock { body, .. } => {
                    self.push_scope();
                    self.walk_server_block(body);
                    self.pop_scope();
                }
                Item::ClientBlock { body, .. } => {
                    self.push_scope();
                    // `server.fn(...)` is the RPC bridge surface
                    self.declare_synthetic("server");
                    self.walk_block(body);
                    self.pop_scope();
                }
                Item::TestBlock { body, .. } | Item::BenchBlock { body, .. } => {
                    self.push_scope();
                    self.walk_block(body);
                    self.pop_scope();
                }
            }
        }

        self.pop_scope();
        self.scopes.pop(); // global scope, no unused reporting

        if self.strict {
            self.diagnostics = self
                .diagnostics
                .into_iter()
                .map(Diagnostic::promote)
                .collect();
        }
        self.diagnostics
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    fn push_scope(&mut self) {
        self.scopes.push(ScopeData::default());
    }

    fn pop_scope(&mut self) {
        let scope = self.scopes.pop().expect("scope underflow");
        for (name, symbol) in &scope.symbols {
            if scope.used.contains(name) || name.starts_with('_') || symbol.is_public {
                continue;
            }
            match symbol.kind {
                SymbolKind::Variable => {
                    self.diagnostics.push(
                        Diagnostic::warning(
                            codes::UNUSED_BINDING,
                            format!("unused binding '{}'", name),
                            symbol.declared_at.clone(),
                        )
                        .with_hint(format!("prefix it with an underscore: _{}", name)),
                    );
                }
                SymbolKind::Import => {
                    self.diagnostics.push(Diagnostic::warning(
                        codes::UNUSED_IMPORT,
                        format!("unused import '{}'", name),
                        symbol.declared_at.clone(),
                    ));
                }
                _ => {}
            }
        }
    }

    fn declare(
        &mut self,
        name: &str,
        kind: SymbolKind,
        loc: &Loc,
        is_public: bool,
        is_mutable: bool,
    ) {
        let depth = self.scopes.len() - 1;
        if let Some(existing) = self.scopes[depth].symbols.get(name) {
            let previous = existing.declared_at.clone();
            self.diagnostics.push(
                Diagnostic::error(
                    codes::DUPLICATE_DECLARATION,
                    format!("duplicate declaration of '{}'", name),
                    loc.clone(),
                )
                .with_hint(format!(
                    "'{}' was first declared at {}",
                    name, previous
                )),
            );
            return;
        }

        // Shadowing an outer user binding is worth a warning; shadowing a
        // built-in is routine and stays silent
        for outer in self.scopes[1..depth.max(1)].iter().rev() {
            if outer.symbols.contains_key(name) {
                self.diagnostics.push(Diagnostic::warning(
                    codes::SHADOWED_BINDING,
                    format!("'{}' shadows a binding from an outer scope", name),
                    loc.clone(),
                ));
                break;
            }
        }

        self.scopes[depth].symbols.insert(
            name.to_string(),
            Symbol {
                name: name.to_string(),
                kind,
                declared_at: loc.clone(),
                is_public,
                is_mutable,
            },
        );
    }

    /// Compiler-provided name; pre-marked used so it never warns.
    fn declare_synthetic(&mut self, name: &str) {
        let depth = self.scopes.len() - 1;
        self.scopes[depth].symbols.insert(
            name.to_string(),
            Symbol {
                name: name.to_string(),
                kind: SymbolKind::Import,
                declared_at: Loc::default(),
                is_public: false,
                is_mutable: false,
            },
        );
        self.scopes[depth].used.insert(name.to_string());
    }

    fn lookup(&mut self, name: &str) -> Option<Symbol> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(symbol) = scope.symbols.get(name) {
                let symbol = symbol.clone();
                scope.used.insert(name.to_string());
                return Some(symbol);
            }
        }
        None
    }

    fn visible_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for scope in &self.scopes {
            names.extend(scope.symbols.keys().cloned());
        }
        names
    }

    fn reference(&mut self, name: &str, loc: &Loc) {
        if self.lookup(name).is_some() {
            return;
        }
        let visible = self.visible_names();
        let mut diagnostic = Diagnostic::error(
            codes::UNRESOLVED_IDENTIFIER,
            format!("unresolved identifier '{}'", name),
            loc.clone(),
        );
        if let Some(suggestion) =
            fuzzy_matcher::find_best_match(name, visible.iter().map(|s| s.as_str()))
        {
            diagnostic = diagnostic.with_hint(format!("did you mean '{}'?", suggestion));
        }
        self.diagnostics.push(diagnostic);
    }

    fn declare_import(&mut self, import: &ImportDecl) {
        for spec in &import.specifiers {
            self.declare(&spec.local, SymbolKind::Import, &spec.loc, false, false);
        }
        if let Some(ref ns) = import.wildcard {
            self.declare(ns, SymbolKind::Import, &import.loc, false, false);
        }
        if let Some(ref name) = import.default {
            self.declare(name, SymbolKind::Import, &import.loc, false, false);
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Declarations visible from the start of the enclosing scope.
    /// `all` hoists every declaration form (block and top level);
    /// function bodies hoist only `fn` and `type`.
    fn hoist_stmt(&mut self, stmt: &Stmt, all: bool) {
        match stmt {
            Stmt::Function(decl) => {
                self.declare(
                    &decl.name,
                    SymbolKind::Function,
                    &decl.loc,
                    decl.is_pub,
                    false,
                );
            }
            Stmt::TypeDecl(decl) => {
                self.declare(&decl.name, SymbolKind::Type, &decl.loc, decl.is_pub, false);
                for variant in &decl.variants {
                    if variant.name != decl.name {
                        self.declare(
                            &variant.name,
                            SymbolKind::Function,
                            &variant.loc,
                            decl.is_pub,
                            false,
                        );
                    }
                }
            }
            Stmt::TypeAlias {
                name, is_pub, loc, ..
            } => self.declare(name, SymbolKind::Type, loc, *is_pub, false),
            Stmt::Interface {
                name, is_pub, loc, ..
            } => self.declare(name, SymbolKind::Interface, loc, *is_pub, false),
            Stmt::TraitDecl {
                name, is_pub, loc, ..
            } => self.declare(name, SymbolKind::Trait, loc, *is_pub, false),
            _ if !all => {}
            Stmt::Let {
                pattern,
                mutable,
                is_pub,
                ..
            } => {
                for (name, loc) in pattern.bound_names() {
                    self.declare(&name, SymbolKind::Variable, &loc, *is_pub, *mutable);
                }
            }
            Stmt::State { name, loc, .. } => {
                self.declare(name, SymbolKind::Variable, loc, false, true)
            }
            Stmt::ComputedDecl { name, loc, .. } => {
                self.declare(name, SymbolKind::Variable, loc, false, false)
            }
            Stmt::Component(decl) => {
                self.declare(&decl.name, SymbolKind::Function, &decl.loc, false, false)
            }
            Stmt::StoreDecl { name, loc, .. } => {
                self.declare(name, SymbolKind::Variable, loc, false, false)
            }
            Stmt::Model { name, loc, .. } => {
                self.declare(name, SymbolKind::Type, loc, false, false)
            }
            Stmt::Middleware { name, loc, .. } => {
                self.declare(name, SymbolKind::Function, loc, false, false)
            }
            Stmt::BackgroundJob { name, loc, .. } => {
                self.declare(name, SymbolKind::Function, loc, false, false)
            }
            Stmt::EnvDecl { names, loc } => {
                for (name, _) in names {
                    self.declare(name, SymbolKind::Variable, loc, false, false);
                }
            }
            Stmt::Db { loc, .. } => self.declare("db", SymbolKind::Variable, loc, false, false),
            _ => {}
        }
    }

    /// Walk a block body in a fresh scope with full hoisting.
    fn walk_block(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.hoist_stmt(stmt, true);
        }
        self.walk_stmts(body, true);
    }

    fn walk_server_block(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.hoist_stmt(stmt, true);
        }
        // Route identity must be unique within one server block
        let mut seen_routes: HashSet<(String, String)> = HashSet::new();
        for stmt in body {
            match stmt {
                Stmt::Route(route) => self.check_route(route, None, &mut seen_routes),
                Stmt::RouteGroup { prefix, routes, .. } => {
                    for route in routes {
                        self.check_route(route, Some(prefix), &mut seen_routes);
                    }
                }
                _ => {}
            }
        }
        self.walk_stmts(body, true);
    }

    fn check_route(
        &mut self,
        route: &RouteDecl,
        prefix: Option<&str>,
        seen: &mut HashSet<(String, String)>,
    ) {
        let full_path = match prefix {
            Some(prefix) => format!("{}{}", prefix, route.path),
            None => route.path.clone(),
        };
        if !seen.insert((route.method.as_str().to_string(), full_path.clone())) {
            self.diagnostics.push(Diagnostic::error(
                codes::DUPLICATE_ROUTE,
                format!("duplicate route {} {}", route.method, full_path),
                route.loc.clone(),
            ));
        }
    }

    fn walk_stmts(&mut self, stmts: &[Stmt], hoisted: bool) {
        let last = stmts.len().saturating_sub(1);
        for (i, stmt) in stmts.iter().enumerate() {
            if i != last {
                if let Stmt::Expression(expr) = stmt {
                    if is_pure(expr) {
                        self.diagnostics.push(Diagnostic::warning(
                            codes::VALUE_IGNORED,
                            "expression value is ignored",
                            expr.loc().clone(),
                        ));
                    }
                }
            }
            self.walk_stmt(stmt, hoisted);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt, hoisted: bool) {
        match stmt {
            Stmt::Let {
                pattern,
                value,
                mutable,
                is_pub,
                ..
            } => {
                self.walk_pattern_defaults(pattern);
                self.walk_expr(value);
                if !hoisted {
                    for (name, loc) in pattern.bound_names() {
                        self.declare(&name, SymbolKind::Variable, &loc, *is_pub, *mutable);
                    }
                }
            }
            Stmt::Function(decl) => self.walk_function(decl, false),
            Stmt::TypeDecl(_) | Stmt::TypeAlias { .. } => {}
            Stmt::Interface { .. } | Stmt::TraitDecl { .. } => {}
            Stmt::ImplBlock {
                target, functions, ..
            } => {
                let loc = stmt.loc().clone();
                self.reference(target, &loc);
                for function in functions {
                    self.walk_function(function, true);
                }
            }
            Stmt::Assign { target, value, .. } => {
                self.walk_expr(value);
                match target {
                    Expr::Ident(name, loc) => {
                        match self.lookup(name) {
                            Some(symbol)
                                if symbol.kind == SymbolKind::Variable && !symbol.is_mutable =>
                            {
                                self.diagnostics.push(
                                    Diagnostic::error(
                                        codes::ASSIGN_IMMUTABLE,
                                        format!("cannot assign to immutable binding '{}'", name),
                                        loc.clone(),
                                    )
                                    .with_fix(format!("declare it with 'var {} = ...'", name)),
                                );
                            }
                            Some(_) => {}
                            None => self.reference(name, loc),
                        }
                    }
                    other => self.walk_expr(other),
                }
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.walk_expr(value);
                }
            }
            Stmt::Break { .. } | Stmt::Continue { .. } => {}
            Stmt::Throw { value, .. } => self.walk_expr(value),
            Stmt::If {
                cond,
                then_body,
                elif_branches,
                else_body,
                ..
            } => {
                self.walk_expr(cond);
                self.walk_child_block(then_body);
                for (elif_cond, elif_body) in elif_branches {
                    self.walk_expr(elif_cond);
                    self.walk_child_block(elif_body);
                }
                if let Some(else_body) = else_body {
                    self.walk_child_block(else_body);
                }
            }
            Stmt::Match { subject, arms, loc } => {
                self.walk_expr(subject);
                self.walk_match_arms(arms, loc);
            }
            Stmt::For {
                bindings,
                iterable,
                body,
                loc,
            } => {
                self.walk_expr(iterable);
                self.push_scope();
                for binding in bindings {
                    self.declare(binding, SymbolKind::Variable, loc, false, false);
                }
                for s in body {
                    self.hoist_stmt(s, false);
                }
                self.walk_stmts(body, false);
                self.pop_scope();
            }
            Stmt::While { cond, body, .. } => {
                self.walk_expr(cond);
                self.walk_child_block(body);
            }
            Stmt::TryCatch {
                body,
                catch_name,
                catch_body,
                finally_body,
                loc,
            } => {
                self.walk_child_block(body);
                self.push_scope();
                if let Some(name) = catch_name {
                    self.declare(name, SymbolKind::Variable, loc, false, false);
                    let depth = self.scopes.len() - 1;
                    self.scopes[depth].used.insert(name.clone());
                }
                for s in catch_body {
                    self.hoist_stmt(s, false);
                }
                self.walk_stmts(catch_body, false);
                self.pop_scope();
                if let Some(finally_body) = finally_body {
                    self.walk_child_block(finally_body);
                }
            }
            Stmt::Expression(expr) => self.walk_expr(expr),

            Stmt::Route(route) => self.walk_route(route),
            Stmt::RouteGroup { routes, .. } => {
                for route in routes {
                    self.walk_route(route);
                }
            }
            Stmt::Db { config, .. } | Stmt::ConfigSingleton { config, .. } => {
                self.walk_expr(config)
            }
            Stmt::Model { .. } => {}
            Stmt::Middleware { params, body, .. } => self.walk_callable(params, body),
            Stmt::Websocket { handlers, .. } => {
                self.push_scope();
                for handler in handlers {
                    self.declare(
                        &handler.name,
                        SymbolKind::Function,
                        &handler.loc,
                        false,
                        false,
                    );
                    let depth = self.scopes.len() - 1;
                    self.scopes[depth].used.insert(handler.name.clone());
                }
                for handler in handlers {
                    self.walk_function_body(handler);
                }
                self.pop_scope();
            }
            Stmt::Sse { params, body, .. }
            | Stmt::Subscribe { params, body, .. }
            | Stmt::BackgroundJob { params, body, .. } => self.walk_callable(params, body),
            Stmt::Schedule { body, .. } | Stmt::LifecycleHook { body, .. } => {
                self.walk_child_block(body)
            }
            Stmt::StaticDir { .. } => {}
            Stmt::EnvDecl { names, .. } => {
                for (_, default) in names {
                    if let Some(default) = default {
                        self.walk_expr(default);
                    }
                }
            }

            Stmt::State { value, .. } | Stmt::ComputedDecl { value, .. } => self.walk_expr(value),
            Stmt::EffectDecl { body, .. } => self.walk_child_block(body),
            Stmt::Component(decl) => {
                self.push_scope();
                self.declare_params(&decl.params);
                for s in &decl.body {
                    self.hoist_stmt(s, false);
                }
                self.walk_stmts(&decl.body, false);
                self.pop_scope();
            }
            Stmt::StoreDecl { body, .. } => {
                self.push_scope();
                self.walk_block(body);
                self.pop_scope();
            }
        }
    }

    fn walk_route(&mut self, route: &RouteDecl) {
        for name in &route.middleware {
            let loc = route.loc.clone();
            self.reference(name, &loc);
        }
        match &route.handler {
            RouteHandler::Named(name) => self.reference(name, &route.loc),
            RouteHandler::Inline { params, body } => self.walk_callable(params, body),
        }
    }

    fn walk_child_block(&mut self, body: &[Stmt]) {
        self.push_scope();
        for stmt in body {
            self.hoist_stmt(stmt, false);
        }
        self.walk_stmts(body, false);
        self.pop_scope();
    }

    fn walk_callable(&mut self, params: &[Param], body: &[Stmt]) {
        for param in params {
            if let Some(ref default) = param.default {
                self.walk_expr(default);
            }
        }
        self.push_scope();
        self.declare_params(params);
        for stmt in body {
            self.hoist_stmt(stmt, false);
        }
        self.walk_stmts(body, false);
        self.pop_scope();
    }

    fn walk_function(&mut self, decl: &FunctionDecl, is_method: bool) {
        for param in &decl.params {
            if let Some(ref default) = param.default {
                self.walk_expr(default);
            }
        }
        self.push_scope();
        if is_method {
            self.declare_synthetic("self");
        }
        self.declare_params(&decl.params);
        for stmt in &decl.body {
            self.hoist_stmt(stmt, false);
        }
        self.walk_stmts(&decl.body, false);
        self.pop_scope();
    }

    fn walk_function_body(&mut self, decl: &FunctionDecl) {
        self.walk_function(decl, false);
    }

    fn declare_params(&mut self, params: &[Param]) {
        for param in params {
            for (name, loc) in param.pattern.bound_names() {
                self.declare(&name, SymbolKind::Parameter, &loc, false, false);
            }
        }
    }

    fn walk_pattern_defaults(&mut self, pattern: &BindPattern) {
        if let BindPattern::Object { entries, .. } = pattern {
            for entry in entries {
                if let Some(ref default) = entry.default {
                    self.walk_expr(default);
                }
            }
        }
    }

    fn walk_match_arms(&mut self, arms: &[MatchArm], loc: &Loc) {
        let has_terminal = arms
            .iter()
            .any(|arm| arm.pattern.is_irrefutable() && arm.guard.is_none());
        if !has_terminal {
            self.diagnostics.push(
                Diagnostic::warning(
                    codes::MATCH_NO_WILDCARD,
                    "match has no wildcard arm; unmatched values produce nil",
                    loc.clone(),
                )
                .with_hint("add a final '_ => ...' arm"),
            );
        }

        for arm in arms {
            self.push_scope();
            self.declare_pattern_bindings(&arm.pattern);
            if let Some(ref guard) = arm.guard {
                self.walk_expr(guard);
            }
            match &arm.body {
                MatchArmBody::Expr(expr) => self.walk_expr(expr),
                MatchArmBody::Block(body) => {
                    for stmt in body {
                        self.hoist_stmt(stmt, false);
                    }
                    self.walk_stmts(body, false);
                }
            }
            self.pop_scope();
        }
    }

    fn declare_pattern_bindings(&mut self, pattern: &MatchPattern) {
        match pattern {
            MatchPattern::Binding(name, loc) => {
                self.declare(name, SymbolKind::Variable, loc, false, false);
                let depth = self.scopes.len() - 1;
                self.scopes[depth].used.insert(name.clone());
            }
            MatchPattern::Variant { bindings, .. } => {
                for binding in bindings {
                    self.declare_pattern_bindings(binding);
                }
            }
            MatchPattern::Array { elements, rest, loc } => {
                for element in elements {
                    self.declare_pattern_bindings(element);
                }
                if let Some(rest) = rest {
                    self.declare(rest, SymbolKind::Variable, loc, false, false);
                    let depth = self.scopes.len() - 1;
                    self.scopes[depth].used.insert(rest.clone());
                }
            }
            MatchPattern::StringConcat { binding, loc, .. } => {
                self.declare(binding, SymbolKind::Variable, loc, false, false);
                let depth = self.scopes.len() - 1;
                self.scopes[depth].used.insert(binding.clone());
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn walk_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Number(..) | Expr::Str(..) | Expr::Bool(..) => {}
            Expr::Ident(name, loc) => self.reference(name, loc),
            Expr::TemplateStr(parts, _) => {
                for part in parts {
                    if let TemplateExprPart::Expr(expr) = part {
                        self.walk_expr(expr);
                    }
                }
            }
            Expr::ArrayLit(elements, _) => {
                for element in elements {
                    self.walk_expr(element);
                }
            }
            Expr::ObjectLit(entries, _) => {
                for entry in entries {
                    match entry {
                        ObjectEntry::KeyValue { value, .. } => self.walk_expr(value),
                        ObjectEntry::Shorthand(name, loc) => self.reference(name, loc),
                        ObjectEntry::Spread(value) => self.walk_expr(value),
                    }
                }
            }
            Expr::Lambda { params, body, .. } => {
                for param in params {
                    if let Some(ref default) = param.default {
                        self.walk_expr(default);
                    }
                }
                self.push_scope();
                self.declare_params(params);
                match body {
                    LambdaBody::Expr(expr) => self.walk_expr(expr),
                    LambdaBody::Block(stmts) => {
                        for stmt in stmts {
                            self.hoist_stmt(stmt, false);
                        }
                        self.walk_stmts(stmts, false);
                    }
                }
                self.pop_scope();
            }
            Expr::Unary { operand, .. } => self.walk_expr(operand),
            Expr::Binary { left, right, .. } => {
                self.walk_expr(left);
                self.walk_expr(right);
            }
            Expr::Range { start, end, .. } => {
                self.walk_expr(start);
                self.walk_expr(end);
            }
            Expr::Call { callee, args, .. } => {
                self.walk_expr(callee);
                for arg in args {
                    self.walk_expr(arg);
                }
            }
            Expr::Member { object, .. } => self.walk_expr(object),
            Expr::Index { object, index, .. } => {
                self.walk_expr(object);
                self.walk_expr(index);
            }
            Expr::Slice {
                object, start, end, ..
            } => {
                self.walk_expr(object);
                if let Some(start) = start {
                    self.walk_expr(start);
                }
                if let Some(end) = end {
                    self.walk_expr(end);
                }
            }
            Expr::Spread(value, _) => self.walk_expr(value),
            Expr::If {
                cond,
                then_body,
                elif_branches,
                else_body,
                ..
            } => {
                self.walk_expr(cond);
                self.walk_child_block(then_body);
                for (elif_cond, elif_body) in elif_branches {
                    self.walk_expr(elif_cond);
                    self.walk_child_block(elif_body);
                }
                if let Some(else_body) = else_body {
                    self.walk_child_block(else_body);
                }
            }
            Expr::Match { subject, arms, loc } => {
                self.walk_expr(subject);
                self.walk_match_arms(arms, loc);
            }
            Expr::Await(operand, _) | Expr::Propagate(operand, _) => self.walk_expr(operand),
            Expr::Jsx(element) => self.walk_jsx_element(element),
            Expr::JsxFragment { children, .. } => {
                for child in children {
                    self.walk_jsx_child(child);
                }
            }
        }
    }

    fn walk_jsx_element(&mut self, element: &JsxElement) {
        if element.is_component() {
            self.reference(&element.tag, &element.loc);
        }
        for attr in &element.attrs {
            match attr {
                JsxAttr::Static { .. } | JsxAttr::Bare { .. } => {}
                JsxAttr::Expr { value, .. }
                | JsxAttr::Event { handler: value, .. }
                | JsxAttr::Bind { target: value, .. }
                | JsxAttr::ClassToggle { cond: value, .. }
                | JsxAttr::StyleProp { value, .. }
                | JsxAttr::Spread { value, .. } => self.walk_expr(value),
            }
        }
        for child in &element.children {
            self.walk_jsx_child(child);
        }
    }

    fn walk_jsx_child(&mut self, child: &JsxChild) {
        match child {
            JsxChild::Element(element) => self.walk_jsx_element(element),
            JsxChild::Fragment(children, _) => {
                for child in children {
                    self.walk_jsx_child(child);
                }
            }
            JsxChild::Text(..) => {}
            JsxChild::Expr(expr, _) => self.walk_expr(expr),
            JsxChild::If(jsx_if) => {
                for (cond, body) in &jsx_if.branches {
                    self.walk_expr(cond);
                    for child in body {
                        self.walk_jsx_child(child);
                    }
                }
                if let Some(ref else_children) = jsx_if.else_children {
                    for child in else_children {
                        self.walk_jsx_child(child);
                    }
                }
            }
            JsxChild::For(jsx_for) => {
                self.walk_expr(&jsx_for.iterable);
                self.push_scope();
                for binding in &jsx_for.bindings {
                    self.declare(binding, SymbolKind::Variable, &jsx_for.loc, false, false);
                    let depth = self.scopes.len() - 1;
                    self.scopes[depth].used.insert(binding.clone());
                }
                if let Some(ref key) = jsx_for.key {
                    self.walk_expr(key);
                }
                for child in &jsx_for.body {
                    self.walk_jsx_child(child);
                }
                self.pop_scope();
            }
        }
    }
}

/// Side-effect-free expressions whose value is meaningless as a
/// non-final statement.
fn is_pure(expr: &Expr) -> bool {
    match expr {
        Expr::Number(..) | Expr::Str(..) | Expr::Bool(..) | Expr::Ident(..) => true,
        Expr::Binary { left, right, .. } => is_pure(left) && is_pure(right),
        Expr::Unary { operand, .. } => is_pure(operand),
        Expr::Member { object, .. } => is_pure(object),
        Expr::Range { start, end, .. } => is_pure(start) && is_pure(end),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;
    use crate::parser::Parser;

    fn diagnostics(source: &str) -> Vec<Diagnostic> {
        let program = Parser::parse_source(source, "t.tova").unwrap();
        analyze(&program, false)
    }

    fn error_codes_of(diags: &[Diagnostic]) -> Vec<&'static str> {
        diags.iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_unresolved_identifier() {
        let diags = diagnostics("let x = missing_name");
        assert!(error_codes_of(&diags).contains(&codes::UNRESOLVED_IDENTIFIER));
    }

    #[test]
    fn test_builtins_resolve() {
        let diags = diagnostics("print(len([1, 2, 3]))");
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }

    #[test]
    fn test_typo_hint() {
        let diags = diagnostics("prnt(1)");
        let diag = diags
            .iter()
            .find(|d| d.code == codes::UNRESOLVED_IDENTIFIER)
            .unwrap();
        assert_eq!(diag.hint.as_deref(), Some("did you mean 'print'?"));
    }

    #[test]
    fn test_duplicate_declaration() {
        let diags = diagnostics("fn f() { 1 }\nfn f() { 2 }");
        assert!(error_codes_of(&diags).contains(&codes::DUPLICATE_DECLARATION));
    }

    #[test]
    fn test_assign_to_immutable() {
        let diags = diagnostics("fn f() { let x = 1\nx = 2 }");
        assert!(error_codes_of(&diags).contains(&codes::ASSIGN_IMMUTABLE));
    }

    #[test]
    fn test_var_is_mutable() {
        let diags = diagnostics("fn f() { var x = 1\nx = 2\nprint(x) }");
        assert!(
            !error_codes_of(&diags).contains(&codes::ASSIGN_IMMUTABLE),
            "unexpected diagnostics: {:?}",
            diags
        );
    }

    #[test]
    fn test_function_hoisting() {
        // `first` calls `second` before its declaration
        let diags = diagnostics("fn first() { second() }\nfn second() { 1 }");
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }

    #[test]
    fn test_unused_binding_warning() {
        let diags = diagnostics("fn f() { let unused = 1\nreturn 2 }");
        let diag = diags
            .iter()
            .find(|d| d.code == codes::UNUSED_BINDING)
            .unwrap();
        assert_eq!(diag.severity, Severity::Warning);
    }

    #[test]
    fn test_underscore_silences_unused() {
        let diags = diagnostics("fn f() { let _unused = 1\nreturn 2 }");
        assert!(!error_codes_of(&diags).contains(&codes::UNUSED_BINDING));
    }

    #[test]
    fn test_shadowing_warning() {
        let diags = diagnostics("fn f() { let x = 1\nif true { let x = 2\nprint(x) }\nprint(x) }");
        assert!(error_codes_of(&diags).contains(&codes::SHADOWED_BINDING));
    }

    #[test]
    fn test_strict_mode_promotes_warnings() {
        let program =
            Parser::parse_source("fn f() { let unused = 1\nreturn 2 }", "t.tova").unwrap();
        let diags = analyze(&program, true);
        let diag = diags
            .iter()
            .find(|d| d.code == codes::UNUSED_BINDING)
            .unwrap();
        assert_eq!(diag.severity, Severity::Error);
    }

    #[test]
    fn test_match_without_wildcard_warns() {
        let diags = diagnostics("fn f(x) { match x { 1 => \"one\", 2 => \"two\" } }");
        assert!(error_codes_of(&diags).contains(&codes::MATCH_NO_WILDCARD));
    }

    #[test]
    fn test_client_state_and_server_rpc() {
        let source = r#"
client {
    state n = 0
    computed doubled = n * 2
    effect { print(doubled) }
    fn refresh() { server.reload() }
    component Counter() {
        <button on:click={refresh}>{n}</button>
    }
}
"#;
        let diags = diagnostics(source);
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }

    #[test]
    fn test_shared_decl_visible_in_client_block() {
        let source = r#"
shared {
    fn format_name(n) { upper(n) }
}

client {
    state name = "ada"
    computed pretty = format_name(name)
}
"#;
        let diags = diagnostics(source);
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }

    #[test]
    fn test_duplicate_route() {
        let source = r#"
server {
    fn a(req) { 1 }
    fn b(req) { 2 }
    route GET "/x" => a
    route GET "/x" => b
}
"#;
        let diags = diagnostics(source);
        assert!(error_codes_of(&diags).contains(&codes::DUPLICATE_ROUTE));
    }

    #[test]
    fn test_unknown_component_reference() {
        let source = r#"
client {
    component App() {
        <Missing/>
    }
}
"#;
        let diags = diagnostics(source);
        assert!(error_codes_of(&diags).contains(&codes::UNRESOLVED_IDENTIFIER));
    }
}
