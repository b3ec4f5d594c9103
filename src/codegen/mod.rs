//! JavaScript code generation.
//!
//! One source file (or merged directory group) compiles to up to five
//! artifact classes: shared, server(s), client(s), test, and bench.
//! Shared artifacts carry the tree-shaken stdlib and the `?` propagation
//! helper; client artifacts embed the reactive runtime; server artifacts
//! wrap their routes in a generated HTTP dispatcher.

mod client;
mod expr;
mod server;
pub mod source_maps;

use crate::error::Loc;
use crate::parser::ast::*;
use crate::stdlib;
use source_maps::SegmentMapping;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// One emitted JavaScript file plus its statement-level source mappings.
#[derive(Debug, Clone, Default)]
pub struct Artifact {
    pub code: String,
    pub mappings: Vec<SegmentMapping>,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledOutputs {
    /// `<base>.shared.js`, or the single `.js` for module files
    pub shared: Option<Artifact>,
    /// default (unlabeled) server
    pub server: Option<Artifact>,
    /// default client
    pub client: Option<Artifact>,
    pub test: Option<Artifact>,
    pub bench: Option<Artifact>,
    /// labeled servers: `<base>.server.<label>.js`
    pub servers: BTreeMap<String, Artifact>,
    pub clients: BTreeMap<String, Artifact>,
    pub is_module: bool,
}

/// Output writer tracking the current position for source mappings.
pub(crate) struct Emitter {
    buf: String,
    line: usize,
    col: usize,
    indent: usize,
    pub mappings: Vec<SegmentMapping>,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter {
            buf: String::new(),
            line: 1,
            col: 1,
            indent: 0,
            mappings: Vec::new(),
        }
    }

    pub fn push(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        self.buf.push_str(text);
    }

    /// Indented line with trailing newline.
    pub fn line(&mut self, text: &str) {
        if !text.is_empty() {
            self.push(&"  ".repeat(self.indent));
        }
        self.push(text);
        self.push("\n");
    }

    pub fn blank(&mut self) {
        if !self.buf.ends_with("\n\n") && !self.buf.is_empty() {
            self.push("\n");
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Record that the next emission corresponds to `loc`.
    pub fn map(&mut self, loc: &Loc) {
        self.mappings.push(SegmentMapping {
            source_file: loc.file.clone(),
            source_line: loc.line,
            source_col: loc.column,
            out_line: self.line,
            out_col: self.col + self.indent * 2,
        });
    }

    pub fn finish(self) -> Artifact {
        Artifact {
            code: self.buf,
            mappings: self.mappings,
        }
    }
}

/// Names visible to signal/computed rewriting, per lexical scope.
#[derive(Default)]
struct ReactiveScope {
    signals: HashSet<String>,
    computeds: HashSet<String>,
    locals: HashSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignalKind {
    Signal,
    Computed,
}

pub(crate) struct CodeGenerator {
    scopes: Vec<ReactiveScope>,
    pub(crate) in_client: bool,
}

pub fn generate(program: &Program, base: &str) -> CompiledOutputs {
    CodeGenerator::new().generate(program, base)
}

impl CodeGenerator {
    pub fn new() -> Self {
        CodeGenerator {
            scopes: vec![ReactiveScope::default()],
            in_client: false,
        }
    }

    pub fn generate(&mut self, program: &Program, base: &str) -> CompiledOutputs {
        let mut outputs = CompiledOutputs {
            is_module: !program.body.iter().any(Item::is_block_directive),
            ..Default::default()
        };

        let mut referenced = expr::referenced_builtins(program);
        // a user declaration shadows the builtin of the same name
        let user_names = shared_top_level_names(program);
        for name in &user_names {
            referenced.remove(name);
        }

        if outputs.is_module {
            outputs.shared = Some(self.emit_module(program, &referenced));
            return outputs;
        }

        outputs.shared = Some(self.emit_shared(program, &referenced));

        // Sibling artifacts import the shared surface: user declarations,
        // the inlined builtins, and the `?` helpers
        let mut shared_names = user_names;
        shared_names.extend(stdlib::emitted_names(&referenced));
        shared_names.extend(
            ["__propagate", "__try", "__try_async"]
                .iter()
                .map(|s| s.to_string()),
        );

        // Server blocks grouped by label; blocks sharing a label merge
        // into one artifact
        let mut server_groups: BTreeMap<Option<String>, Vec<&[Stmt]>> = BTreeMap::new();
        let mut client_groups: BTreeMap<Option<String>, Vec<&[Stmt]>> = BTreeMap::new();
        let mut tests: Vec<(Option<String>, &[Stmt], Loc)> = Vec::new();
        let mut benches: Vec<(Option<String>, &[Stmt], Loc)> = Vec::new();

        for item in &program.body {
            match item {
                Item::ServerBlock { name, body, .. } => {
                    server_groups.entry(name.clone()).or_default().push(body)
                }
                Item::ClientBlock { name, body, .. } => {
                    client_groups.entry(name.clone()).or_default().push(body)
                }
                Item::TestBlock { label, body, loc } => {
                    tests.push((label.clone(), body.as_slice(), loc.clone()))
                }
                Item::BenchBlock { label, body, loc } => {
                    benches.push((label.clone(), body.as_slice(), loc.clone()))
                }
                _ => {}
            }
        }

        for (label, bodies) in &server_groups {
            let artifact = self.emit_server(program, label.as_deref(), bodies, base, &shared_names);
            match label {
                None => outputs.server = Some(artifact),
                Some(label) => {
                    outputs.servers.insert(label.clone(), artifact);
                }
            }
        }

        for (label, bodies) in &client_groups {
            let artifact = self.emit_client(program, label.as_deref(), bodies, base, &shared_names);
            match label {
                None => outputs.client = Some(artifact),
                Some(label) => {
                    outputs.clients.insert(label.clone(), artifact);
                }
            }
        }

        if !tests.is_empty() {
            outputs.test = Some(self.emit_tests(program, &tests, base, &shared_names));
        }
        if !benches.is_empty() {
            outputs.bench = Some(self.emit_benches(program, &benches, base, &shared_names));
        }

        outputs
    }

    // ------------------------------------------------------------------
    // Artifact assembly
    // ------------------------------------------------------------------

    /// Module file: a single `.js` with `pub` as `export`.
    fn emit_module(&mut self, program: &Program, referenced: &BTreeSet<String>) -> Artifact {
        let mut e = Emitter::new();
        e.line("// Generated by the Tova compiler - do not edit.");
        self.emit_imports(&mut e, program);
        self.emit_stdlib_fragments(&mut e, referenced);
        for item in &program.body {
            if let Item::Statement(stmt) = item {
                self.emit_stmt(&mut e, stmt);
            }
        }
        e.finish()
    }

    /// Shared artifact: free-floating top-level declarations plus every
    /// shared block, stdlib, and the propagation helper.
    fn emit_shared(&mut self, program: &Program, referenced: &BTreeSet<String>) -> Artifact {
        let mut e = Emitter::new();
        e.line("// Generated by the Tova compiler - do not edit.");
        self.emit_imports(&mut e, program);
        self.emit_stdlib_fragments(&mut e, referenced);

        for item in &program.body {
            match item {
                Item::Statement(stmt) => self.emit_stmt(&mut e, stmt),
                Item::SharedBlock { body, .. } => {
                    for stmt in body {
                        self.emit_stmt(&mut e, stmt);
                    }
                }
                _ => {}
            }
        }

        // Sibling artifacts (server/client of the same app) need every
        // top-level name plus the inlined builtins and `?` helpers;
        // `pub` already exported the public declarations inline
        let mut private_names: Vec<String> = shared_top_level_entries(program)
            .into_iter()
            .filter(|(_, is_pub)| !is_pub)
            .map(|(name, _)| name)
            .collect();
        private_names.extend(stdlib::emitted_names(referenced));
        private_names.extend(
            ["__propagate", "__try", "__try_async"]
                .iter()
                .map(|s| s.to_string()),
        );
        e.blank();
        e.line("// intra-app visibility; compile-time checks enforce 'pub'");
        e.line(&format!("export {{ {} }};", private_names.join(", ")));
        e.finish()
    }

    fn emit_tests(
        &mut self,
        program: &Program,
        tests: &[(Option<String>, &[Stmt], Loc)],
        base: &str,
        shared_names: &[String],
    ) -> Artifact {
        let mut e = Emitter::new();
        e.line("// Generated by the Tova compiler - do not edit.");
        self.emit_shared_import(&mut e, base, shared_names);
        self.emit_imports(&mut e, program);
        e.blank();
        for (index, (label, body, loc)) in tests.iter().enumerate() {
            let label = label
                .clone()
                .unwrap_or_else(|| format!("test #{}", index + 1));
            e.map(loc);
            e.line(&format!("test({}, async () => {{", js_string(&label)));
            e.indent();
            self.emit_block_stmts(&mut e, body, false);
            e.dedent();
            e.line("});");
        }
        e.finish()
    }

    fn emit_benches(
        &mut self,
        program: &Program,
        benches: &[(Option<String>, &[Stmt], Loc)],
        base: &str,
        shared_names: &[String],
    ) -> Artifact {
        let mut e = Emitter::new();
        e.line("// Generated by the Tova compiler - do not edit.");
        self.emit_shared_import(&mut e, base, shared_names);
        self.emit_imports(&mut e, program);
        e.blank();
        e.push(BENCH_HARNESS);
        for (index, (label, body, loc)) in benches.iter().enumerate() {
            let label = label
                .clone()
                .unwrap_or_else(|| format!("bench #{}", index + 1));
            e.map(loc);
            e.line(&format!("__bench({}, () => {{", js_string(&label)));
            e.indent();
            self.emit_block_stmts(&mut e, body, false);
            e.dedent();
            e.line("});");
        }
        e.finish()
    }

    fn emit_stdlib_fragments(&mut self, e: &mut Emitter, referenced: &BTreeSet<String>) {
        e.blank();
        e.push(stdlib::PROPAGATE);
        let fragment = stdlib::builtins_fragment(referenced);
        if !fragment.is_empty() {
            e.push(&fragment);
        }
        e.blank();
    }

    /// User imports, already rewritten by the driver to `.js` /
    /// `.shared.js` targets.
    fn emit_imports(&mut self, e: &mut Emitter, program: &Program) {
        for item in &program.body {
            if let Item::Import(import) = item {
                e.map(&import.loc);
                e.line(&import_to_js(import));
            }
        }
    }

    pub(crate) fn emit_shared_import(
        &mut self,
        e: &mut Emitter,
        base: &str,
        shared_names: &[String],
    ) {
        if shared_names.is_empty() {
            return;
        }
        e.line(&format!(
            "import {{ {} }} from \"./{}.shared.js\";",
            shared_names.join(", "),
            base
        ));
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Emit a statement list; when `value_position` is set, a final
    /// expression, `match`, or `if` statement yields the block's value.
    pub(crate) fn emit_block_stmts(&mut self, e: &mut Emitter, stmts: &[Stmt], value_position: bool) {
        let last = stmts.len().saturating_sub(1);
        for (i, stmt) in stmts.iter().enumerate() {
            if value_position && i == last {
                match stmt {
                    Stmt::Expression(value) => {
                        e.map(value.loc());
                        let js = self.gen_expr(value);
                        e.line(&format!("return {};", js));
                        continue;
                    }
                    Stmt::Match { subject, arms, loc } => {
                        e.map(loc);
                        let js = self.gen_match(subject, arms);
                        e.line(&format!("return {};", js));
                        continue;
                    }
                    Stmt::If {
                        cond,
                        then_body,
                        elif_branches,
                        else_body,
                        loc,
                    } => {
                        e.map(loc);
                        let js = self.gen_if_value(cond, then_body, elif_branches, else_body);
                        e.line(&format!("return {};", js));
                        continue;
                    }
                    _ => {}
                }
            }
            self.emit_stmt(e, stmt);
        }
    }

    pub(crate) fn emit_stmt(&mut self, e: &mut Emitter, stmt: &Stmt) {
        match stmt {
            Stmt::Let {
                pattern,
                value,
                mutable,
                is_pub,
                doc,
                loc,
            } => {
                self.emit_doc(e, doc);
                e.map(loc);
                let keyword = if *mutable { "let" } else { "const" };
                let export = if *is_pub { "export " } else { "" };
                let value_js = self.gen_expr(value);
                e.line(&format!(
                    "{}{} {} = {};",
                    export,
                    keyword,
                    self.gen_bind_pattern(pattern),
                    value_js
                ));
                self.declare_locals(pattern);
            }
            Stmt::Function(decl) => self.emit_function(e, decl),
            Stmt::TypeDecl(decl) => self.emit_type_decl(e, decl),
            Stmt::TypeAlias { name, is_pub, loc, .. } => {
                // aliases have no runtime content; keep the name resolvable
                e.map(loc);
                let export = if *is_pub { "export " } else { "" };
                e.line(&format!("{}const {} = undefined; // type alias", export, name));
            }
            Stmt::Interface { name, loc, .. } | Stmt::TraitDecl { name, loc, .. } => {
                e.map(loc);
                e.line(&format!("const {} = Symbol({});", name, js_string(name)));
            }
            Stmt::ImplBlock {
                target, functions, ..
            } => {
                // conformance is unchecked; methods emit as `Target_name`
                for function in functions {
                    let mut renamed = function.clone();
                    renamed.name = format!("{}_{}", target, function.name);
                    renamed.params.insert(
                        0,
                        Param {
                            pattern: BindPattern::Name("self".to_string(), function.loc.clone()),
                            type_: None,
                            default: None,
                            loc: function.loc.clone(),
                        },
                    );
                    self.emit_function(e, &renamed);
                }
            }
            Stmt::Assign {
                target,
                op,
                value,
                loc,
            } => {
                e.map(loc);
                let js = self.gen_assignment(target, *op, value);
                e.line(&format!("{};", js));
            }
            Stmt::Return { value, loc } => {
                e.map(loc);
                match value {
                    Some(value) => {
                        let js = self.gen_expr(value);
                        e.line(&format!("return {};", js));
                    }
                    None => e.line("return;"),
                }
            }
            Stmt::Break { loc } => {
                e.map(loc);
                e.line("break;");
            }
            Stmt::Continue { loc } => {
                e.map(loc);
                e.line("continue;");
            }
            Stmt::Throw { value, loc } => {
                e.map(loc);
                let js = self.gen_expr(value);
                e.line(&format!("throw {};", js));
            }
            Stmt::If {
                cond,
                then_body,
                elif_branches,
                else_body,
                loc,
            } => {
                e.map(loc);
                let cond_js = self.gen_expr(cond);
                e.line(&format!("if ({}) {{", cond_js));
                e.indent();
                self.push_scope();
                self.emit_block_stmts(e, then_body, false);
                self.pop_scope();
                e.dedent();
                for (elif_cond, elif_body) in elif_branches {
                    let elif_js = self.gen_expr(elif_cond);
                    e.line(&format!("}} else if ({}) {{", elif_js));
                    e.indent();
                    self.push_scope();
                    self.emit_block_stmts(e, elif_body, false);
                    self.pop_scope();
                    e.dedent();
                }
                if let Some(else_body) = else_body {
                    e.line("} else {");
                    e.indent();
                    self.push_scope();
                    self.emit_block_stmts(e, else_body, false);
                    self.pop_scope();
                    e.dedent();
                }
                e.line("}");
            }
            Stmt::Match { subject, arms, loc } => {
                e.map(loc);
                let js = self.gen_match(subject, arms);
                e.line(&format!("{};", js));
            }
            Stmt::For {
                bindings,
                iterable,
                body,
                loc,
            } => {
                e.map(loc);
                let iter_js = self.gen_expr(iterable);
                let head = if bindings.len() == 1 {
                    format!("for (const {} of {}) {{", bindings[0], iter_js)
                } else {
                    format!(
                        "for (const [{}] of entries({})) {{",
                        bindings.join(", "),
                        iter_js
                    )
                };
                e.line(&head);
                e.indent();
                self.push_scope();
                for binding in bindings {
                    self.declare_local(binding);
                }
                self.emit_block_stmts(e, body, false);
                self.pop_scope();
                e.dedent();
                e.line("}");
            }
            Stmt::While { cond, body, loc } => {
                e.map(loc);
                let cond_js = self.gen_expr(cond);
                e.line(&format!("while ({}) {{", cond_js));
                e.indent();
                self.push_scope();
                self.emit_block_stmts(e, body, false);
                self.pop_scope();
                e.dedent();
                e.line("}");
            }
            Stmt::TryCatch {
                body,
                catch_name,
                catch_body,
                finally_body,
                loc,
            } => {
                e.map(loc);
                e.line("try {");
                e.indent();
                self.push_scope();
                self.emit_block_stmts(e, body, false);
                self.pop_scope();
                e.dedent();
                let catch_binding = catch_name.clone().unwrap_or_else(|| "__err".to_string());
                e.line(&format!("}} catch ({}) {{", catch_binding));
                e.indent();
                self.push_scope();
                self.declare_local(&catch_binding);
                self.emit_block_stmts(e, catch_body, false);
                self.pop_scope();
                e.dedent();
                if let Some(finally_body) = finally_body {
                    e.line("} finally {");
                    e.indent();
                    self.push_scope();
                    self.emit_block_stmts(e, finally_body, false);
                    self.pop_scope();
                    e.dedent();
                }
                e.line("}");
            }
            Stmt::Expression(expr) => {
                e.map(expr.loc());
                let js = self.gen_expr(expr);
                e.line(&format!("{};", js));
            }

            // Client and server declaration forms are emitted by their
            // artifact emitters; the parser keeps them out of any other
            // position, so the generic path has nothing to do here.
            _ => {}
        }
    }

    pub(crate) fn emit_function(&mut self, e: &mut Emitter, decl: &FunctionDecl) {
        self.emit_doc(e, &decl.doc);
        e.map(&decl.loc);
        let export = if decl.is_pub { "export " } else { "" };
        let is_async = decl.is_async || expr::contains_await(&decl.body);
        let async_kw = if is_async { "async " } else { "" };
        let params = self.gen_params(&decl.params);
        e.line(&format!(
            "{}{}function {}({}) {{",
            export, async_kw, decl.name, params
        ));
        e.indent();
        self.push_scope();
        for param in &decl.params {
            self.declare_locals(&param.pattern);
        }
        if expr::contains_propagate(&decl.body) {
            let helper = if is_async { "__try_async" } else { "__try" };
            let arrow = if is_async { "async () => {" } else { "() => {" };
            e.line(&format!("return {}({}", helper, arrow));
            e.indent();
            self.emit_block_stmts(e, &decl.body, true);
            e.dedent();
            e.line("});");
        } else {
            self.emit_block_stmts(e, &decl.body, true);
        }
        self.pop_scope();
        e.dedent();
        e.line("}");
    }

    /// Tagged-record factories: each variant becomes a frozen object
    /// with `__tag`, its declared fields, and positional `__values` for
    /// pattern destructuring.
    fn emit_type_decl(&mut self, e: &mut Emitter, decl: &TypeDecl) {
        self.emit_doc(e, &decl.doc);
        e.map(&decl.loc);
        let export = if decl.is_pub { "export " } else { "" };
        let record_form = decl.variants.len() == 1 && decl.variants[0].name == decl.name;

        for variant in &decl.variants {
            let fields: Vec<&str> = variant.fields.iter().map(|(n, _)| n.as_str()).collect();
            if fields.is_empty() {
                e.line(&format!(
                    "{}const {} = Object.freeze({{ __tag: {}, __values: [] }});",
                    export,
                    variant.name,
                    js_string(&variant.name)
                ));
            } else {
                e.line(&format!(
                    "{}function {}({}) {{ return Object.freeze({{ __tag: {}, {}, __values: [{}] }}); }}",
                    export,
                    variant.name,
                    fields.join(", "),
                    js_string(&variant.name),
                    fields.join(", "),
                    fields.join(", ")
                ));
            }
        }

        if !record_form {
            let names: Vec<&str> = decl.variants.iter().map(|v| v.name.as_str()).collect();
            e.line(&format!(
                "{}const {} = Object.freeze({{ {} }});",
                export,
                decl.name,
                names.join(", ")
            ));
        }
    }

    fn emit_doc(&mut self, e: &mut Emitter, doc: &Option<String>) {
        if let Some(doc) = doc {
            e.line("/**");
            for line in doc.lines() {
                e.line(&format!(" * {}", line));
            }
            e.line(" */");
        }
    }

    // ------------------------------------------------------------------
    // Reactive-scope bookkeeping (used by client emission)
    // ------------------------------------------------------------------

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(ReactiveScope::default());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub(crate) fn declare_signal(&mut self, name: &str) {
        self.scopes
            .last_mut()
            .expect("scope underflow")
            .signals
            .insert(name.to_string());
    }

    pub(crate) fn declare_computed(&mut self, name: &str) {
        self.scopes
            .last_mut()
            .expect("scope underflow")
            .computeds
            .insert(name.to_string());
    }

    pub(crate) fn declare_local(&mut self, name: &str) {
        self.scopes
            .last_mut()
            .expect("scope underflow")
            .locals
            .insert(name.to_string());
    }

    pub(crate) fn declare_locals(&mut self, pattern: &BindPattern) {
        for (name, _) in pattern.bound_names() {
            self.declare_local(&name);
        }
    }

    /// Is `name` a signal or computed at this point, not shadowed by a
    /// plain local?
    pub(crate) fn signal_kind(&self, name: &str) -> Option<SignalKind> {
        for scope in self.scopes.iter().rev() {
            if scope.locals.contains(name) {
                return None;
            }
            if scope.signals.contains(name) {
                return Some(SignalKind::Signal);
            }
            if scope.computeds.contains(name) {
                return Some(SignalKind::Computed);
            }
        }
        None
    }
}

// ---------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------

pub(crate) fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

fn import_to_js(import: &ImportDecl) -> String {
    let source = js_string(&import.source);
    if let Some(ref ns) = import.wildcard {
        return format!("import * as {} from {};", ns, source);
    }
    if let Some(ref default) = import.default {
        return format!("import {} from {};", default, source);
    }
    if import.specifiers.is_empty() {
        return format!("import {};", source);
    }
    let specs: Vec<String> = import
        .specifiers
        .iter()
        .map(|s| {
            if s.imported == s.local {
                s.imported.clone()
            } else {
                format!("{} as {}", s.imported, s.local)
            }
        })
        .collect();
    format!("import {{ {} }} from {};", specs.join(", "), source)
}

/// Top-level names of the shared artifact (free statements plus shared
/// blocks), paired with their `pub` flag.
fn shared_top_level_entries(program: &Program) -> Vec<(String, bool)> {
    let mut entries = Vec::new();
    let mut record = |stmt: &Stmt| match stmt {
        Stmt::Let {
            pattern, is_pub, ..
        } => {
            for (name, _) in pattern.bound_names() {
                entries.push((name, *is_pub));
            }
        }
        Stmt::Function(decl) => entries.push((decl.name.clone(), decl.is_pub)),
        Stmt::TypeDecl(decl) => {
            let record_form = decl.variants.len() == 1 && decl.variants[0].name == decl.name;
            for variant in &decl.variants {
                entries.push((variant.name.clone(), decl.is_pub));
            }
            if !record_form {
                entries.push((decl.name.clone(), decl.is_pub));
            }
        }
        Stmt::TypeAlias { name, is_pub, .. } => entries.push((name.clone(), *is_pub)),
        Stmt::Interface { name, is_pub, .. } | Stmt::TraitDecl { name, is_pub, .. } => {
            entries.push((name.clone(), *is_pub))
        }
        _ => {}
    };
    for item in &program.body {
        match item {
            Item::Statement(stmt) => record(stmt),
            Item::SharedBlock { body, .. } => {
                for stmt in body {
                    record(stmt);
                }
            }
            _ => {}
        }
    }
    entries
}

pub(crate) fn shared_top_level_names(program: &Program) -> Vec<String> {
    shared_top_level_entries(program)
        .into_iter()
        .map(|(name, _)| name)
        .collect()
}

const BENCH_HARNESS: &str = r#"function __bench(label, fn) {
  const iters = Number(process.env.TOVA_BENCH_ITERS || 1000);
  const times = [];
  for (let i = 0; i < iters; i++) {
    const t0 = performance.now();
    fn();
    times.push(performance.now() - t0);
  }
  times.sort((a, b) => a - b);
  const mean = times.reduce((a, b) => a + b, 0) / times.length;
  const median = times[Math.floor(times.length / 2)];
  console.log(
    "[bench] " + label + ": mean=" + mean.toFixed(3) + "ms median=" + median.toFixed(3) +
    "ms min=" + times[0].toFixed(3) + "ms max=" + times[times.length - 1].toFixed(3) + "ms"
  );
}
"#;
