//! Tova syntactic AST.
//!
//! Plain owned sum types with `Box` recursion; every node carries the
//! source location of its first token. The analyzer annotates symbols in
//! a separate scope tree and never mutates these nodes.

use crate::error::Loc;
use crate::lexer::HttpMethod;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub body: Vec<Item>,
}

/// Top-level node kinds. Block directives partition an app file into its
/// artifact classes; everything else is a free-floating statement that
/// lands in the shared artifact.
#[derive(Debug, Clone)]
pub enum Item {
    SharedBlock {
        body: Vec<Stmt>,
        loc: Loc,
    },
    ServerBlock {
        name: Option<String>,
        body: Vec<Stmt>,
        loc: Loc,
    },
    ClientBlock {
        name: Option<String>,
        body: Vec<Stmt>,
        loc: Loc,
    },
    TestBlock {
        label: Option<String>,
        body: Vec<Stmt>,
        loc: Loc,
    },
    BenchBlock {
        label: Option<String>,
        body: Vec<Stmt>,
        loc: Loc,
    },
    Import(ImportDecl),
    Statement(Stmt),
}

impl Item {
    pub fn loc(&self) -> &Loc {
        match self {
            Item::SharedBlock { loc, .. }
            | Item::ServerBlock { loc, .. }
            | Item::ClientBlock { loc, .. }
            | Item::TestBlock { loc, .. }
            | Item::BenchBlock { loc, .. } => loc,
            Item::Import(import) => &import.loc,
            Item::Statement(stmt) => stmt.loc(),
        }
    }

    /// True for the block directives that make a file an *app* file.
    pub fn is_block_directive(&self) -> bool {
        matches!(
            self,
            Item::SharedBlock { .. }
                | Item::ServerBlock { .. }
                | Item::ClientBlock { .. }
                | Item::TestBlock { .. }
                | Item::BenchBlock { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    /// `import * as ns from "..."`
    pub wildcard: Option<String>,
    /// `import name from "..."`
    pub default: Option<String>,
    pub source: String,
    pub loc: Loc,
}

/// `a` or `a as b`. `local` always holds the bound name; it defaults to
/// `imported` when there is no `as` clause.
#[derive(Debug, Clone)]
pub struct ImportSpecifier {
    pub imported: String,
    pub local: String,
    pub loc: Loc,
}

// ---------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Stmt {
    Let {
        pattern: BindPattern,
        value: Expr,
        mutable: bool,
        is_pub: bool,
        doc: Option<String>,
        loc: Loc,
    },
    Function(FunctionDecl),
    TypeDecl(TypeDecl),
    TypeAlias {
        name: String,
        target: TypeRef,
        is_pub: bool,
        loc: Loc,
    },
    Interface {
        name: String,
        methods: Vec<FunctionSig>,
        is_pub: bool,
        loc: Loc,
    },
    TraitDecl {
        name: String,
        methods: Vec<FunctionSig>,
        is_pub: bool,
        loc: Loc,
    },
    ImplBlock {
        trait_name: Option<String>,
        target: String,
        functions: Vec<FunctionDecl>,
        loc: Loc,
    },
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
        loc: Loc,
    },
    Return {
        value: Option<Expr>,
        loc: Loc,
    },
    Break {
        loc: Loc,
    },
    Continue {
        loc: Loc,
    },
    Throw {
        value: Expr,
        loc: Loc,
    },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        elif_branches: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
        loc: Loc,
    },
    Match {
        subject: Expr,
        arms: Vec<MatchArm>,
        loc: Loc,
    },
    For {
        bindings: Vec<String>,
        iterable: Expr,
        body: Vec<Stmt>,
        loc: Loc,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        loc: Loc,
    },
    TryCatch {
        body: Vec<Stmt>,
        catch_name: Option<String>,
        catch_body: Vec<Stmt>,
        finally_body: Option<Vec<Stmt>>,
        loc: Loc,
    },
    Expression(Expr),

    // Server-block forms
    Route(RouteDecl),
    RouteGroup {
        prefix: String,
        routes: Vec<RouteDecl>,
        loc: Loc,
    },
    Db {
        config: Expr,
        loc: Loc,
    },
    Model {
        name: String,
        fields: Vec<ModelField>,
        doc: Option<String>,
        loc: Loc,
    },
    Middleware {
        name: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
        loc: Loc,
    },
    Websocket {
        path: String,
        handlers: Vec<FunctionDecl>,
        loc: Loc,
    },
    Sse {
        path: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
        loc: Loc,
    },
    Schedule {
        spec: String,
        body: Vec<Stmt>,
        loc: Loc,
    },
    BackgroundJob {
        name: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
        loc: Loc,
    },
    LifecycleHook {
        hook: LifecycleEvent,
        body: Vec<Stmt>,
        loc: Loc,
    },
    Subscribe {
        channel: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
        loc: Loc,
    },
    StaticDir {
        route: String,
        dir: String,
        loc: Loc,
    },
    EnvDecl {
        names: Vec<(String, Option<Expr>)>,
        loc: Loc,
    },
    /// `db`-style config singletons: auth, cors, rate_limit, session, tls,
    /// compression, cache, upload, max_body
    ConfigSingleton {
        kind: SingletonKind,
        config: Expr,
        loc: Loc,
    },

    // Client-block forms
    State {
        name: String,
        value: Expr,
        loc: Loc,
    },
    ComputedDecl {
        name: String,
        value: Expr,
        loc: Loc,
    },
    EffectDecl {
        body: Vec<Stmt>,
        loc: Loc,
    },
    Component(ComponentDecl),
    StoreDecl {
        name: String,
        body: Vec<Stmt>,
        loc: Loc,
    },
}

impl Stmt {
    pub fn loc(&self) -> &Loc {
        match self {
            Stmt::Let { loc, .. }
            | Stmt::TypeAlias { loc, .. }
            | Stmt::Interface { loc, .. }
            | Stmt::TraitDecl { loc, .. }
            | Stmt::ImplBlock { loc, .. }
            | Stmt::Assign { loc, .. }
            | Stmt::Return { loc, .. }
            | Stmt::Break { loc }
            | Stmt::Continue { loc }
            | Stmt::Throw { loc, .. }
            | Stmt::If { loc, .. }
            | Stmt::Match { loc, .. }
            | Stmt::For { loc, .. }
            | Stmt::While { loc, .. }
            | Stmt::TryCatch { loc, .. }
            | Stmt::RouteGroup { loc, .. }
            | Stmt::Db { loc, .. }
            | Stmt::Model { loc, .. }
            | Stmt::Middleware { loc, .. }
            | Stmt::Websocket { loc, .. }
            | Stmt::Sse { loc, .. }
            | Stmt::Schedule { loc, .. }
            | Stmt::BackgroundJob { loc, .. }
            | Stmt::LifecycleHook { loc, .. }
            | Stmt::Subscribe { loc, .. }
            | Stmt::StaticDir { loc, .. }
            | Stmt::EnvDecl { loc, .. }
            | Stmt::ConfigSingleton { loc, .. }
            | Stmt::State { loc, .. }
            | Stmt::ComputedDecl { loc, .. }
            | Stmt::EffectDecl { loc, .. }
            | Stmt::StoreDecl { loc, .. } => loc,
            Stmt::Function(decl) => &decl.loc,
            Stmt::TypeDecl(decl) => &decl.loc,
            Stmt::Route(route) => &route.loc,
            Stmt::Component(component) => &component.loc,
            Stmt::Expression(expr) => expr.loc(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Start,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SingletonKind {
    Db,
    Auth,
    Cors,
    RateLimit,
    Session,
    Tls,
    Compression,
    Cache,
    Upload,
    MaxBody,
}

impl SingletonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SingletonKind::Db => "db",
            SingletonKind::Auth => "auth",
            SingletonKind::Cors => "cors",
            SingletonKind::RateLimit => "rate_limit",
            SingletonKind::Session => "session",
            SingletonKind::Tls => "tls",
            SingletonKind::Compression => "compression",
            SingletonKind::Cache => "cache",
            SingletonKind::Upload => "upload",
            SingletonKind::MaxBody => "max_body",
        }
    }

    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "auth" => Some(SingletonKind::Auth),
            "cors" => Some(SingletonKind::Cors),
            "rate_limit" => Some(SingletonKind::RateLimit),
            "session" => Some(SingletonKind::Session),
            "tls" => Some(SingletonKind::Tls),
            "compression" => Some(SingletonKind::Compression),
            "cache" => Some(SingletonKind::Cache),
            "upload" => Some(SingletonKind::Upload),
            "max_body" => Some(SingletonKind::MaxBody),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeRef>,
    pub body: Vec<Stmt>,
    pub is_pub: bool,
    pub is_async: bool,
    pub decorators: Vec<Decorator>,
    pub doc: Option<String>,
    pub loc: Loc,
}

/// Signature-only form used by interface and trait bodies.
#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeRef>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub pattern: BindPattern,
    pub type_: Option<TypeRef>,
    pub default: Option<Expr>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct Decorator {
    pub name: String,
    pub args: Vec<Expr>,
    pub loc: Loc,
}

/// Type annotation surface: a name plus optional generic arguments.
/// Annotations are carried for docs and diagnostics; emission ignores them.
#[derive(Debug, Clone)]
pub struct TypeRef {
    pub name: String,
    pub args: Vec<TypeRef>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub variants: Vec<Variant>,
    pub is_pub: bool,
    pub doc: Option<String>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct Variant {
    pub name: String,
    pub fields: Vec<(String, Option<TypeRef>)>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct ModelField {
    pub name: String,
    pub type_: TypeRef,
    pub attributes: Vec<Expr>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct RouteDecl {
    pub method: HttpMethod,
    pub path: String,
    pub handler: RouteHandler,
    pub middleware: Vec<String>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub enum RouteHandler {
    /// `route GET "/x" => handler_fn`
    Named(String),
    /// `route GET "/x" => (req) { ... }`
    Inline { params: Vec<Param>, body: Vec<Stmt> },
}

#[derive(Debug, Clone)]
pub struct ComponentDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub doc: Option<String>,
    pub loc: Loc,
}

// ---------------------------------------------------------------------
// Binding patterns (let / parameters)
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum BindPattern {
    Name(String, Loc),
    /// `{ a, b: renamed, c = default }`
    Object {
        entries: Vec<ObjectPatternEntry>,
        loc: Loc,
    },
    /// `[x, y, ...rest]`
    Array {
        elements: Vec<BindPattern>,
        rest: Option<String>,
        loc: Loc,
    },
}

impl BindPattern {
    pub fn loc(&self) -> &Loc {
        match self {
            BindPattern::Name(_, loc) => loc,
            BindPattern::Object { loc, .. } | BindPattern::Array { loc, .. } => loc,
        }
    }

    /// Every leaf name the pattern binds.
    pub fn bound_names(&self) -> Vec<(String, Loc)> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, out: &mut Vec<(String, Loc)>) {
        match self {
            BindPattern::Name(name, loc) => out.push((name.clone(), loc.clone())),
            BindPattern::Object { entries, loc } => {
                for entry in entries {
                    out.push((entry.binding.clone(), loc.clone()));
                }
            }
            BindPattern::Array {
                elements,
                rest,
                loc,
            } => {
                for element in elements {
                    element.collect_names(out);
                }
                if let Some(rest) = rest {
                    out.push((rest.clone(), loc.clone()));
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectPatternEntry {
    pub key: String,
    pub binding: String,
    pub default: Option<Expr>,
}

// ---------------------------------------------------------------------
// Match patterns
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MatchArm {
    pub pattern: MatchPattern,
    pub guard: Option<Expr>,
    pub body: MatchArmBody,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub enum MatchArmBody {
    Expr(Expr),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone)]
pub enum MatchPattern {
    /// Number, string, or boolean literal compared by equality
    Literal(Expr),
    Range {
        start: Expr,
        end: Expr,
        inclusive: bool,
    },
    /// `Circle(r)` - checks `__tag`, binds declared fields in order
    Variant {
        name: String,
        bindings: Vec<MatchPattern>,
        loc: Loc,
    },
    Array {
        elements: Vec<MatchPattern>,
        rest: Option<String>,
        loc: Loc,
    },
    /// `"prefix" ++ tail`
    StringConcat {
        prefix: String,
        binding: String,
        loc: Loc,
    },
    Wildcard(Loc),
    Binding(String, Loc),
}

impl MatchPattern {
    /// A pattern that matches any value ends the arm chain.
    pub fn is_irrefutable(&self) -> bool {
        matches!(self, MatchPattern::Wildcard(_) | MatchPattern::Binding(..))
    }
}

// ---------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Expr {
    Number(f64, Loc),
    Str(String, Loc),
    TemplateStr(Vec<TemplateExprPart>, Loc),
    Bool(bool, Loc),
    Ident(String, Loc),
    ArrayLit(Vec<Expr>, Loc),
    ObjectLit(Vec<ObjectEntry>, Loc),
    Lambda {
        params: Vec<Param>,
        body: LambdaBody,
        is_async: bool,
        loc: Loc,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        loc: Loc,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        loc: Loc,
    },
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
        inclusive: bool,
        loc: Loc,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        loc: Loc,
    },
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
        loc: Loc,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        loc: Loc,
    },
    Slice {
        object: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        loc: Loc,
    },
    Spread(Box<Expr>, Loc),
    If {
        cond: Box<Expr>,
        then_body: Vec<Stmt>,
        elif_branches: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
        loc: Loc,
    },
    Match {
        subject: Box<Expr>,
        arms: Vec<MatchArm>,
        loc: Loc,
    },
    Await(Box<Expr>, Loc),
    /// Postfix `?`: unwrap Ok/Some, early-return Err/None
    Propagate(Box<Expr>, Loc),
    Jsx(Box<JsxElement>),
    JsxFragment {
        children: Vec<JsxChild>,
        loc: Loc,
    },
}

impl Expr {
    pub fn loc(&self) -> &Loc {
        match self {
            Expr::Number(_, loc)
            | Expr::Str(_, loc)
            | Expr::TemplateStr(_, loc)
            | Expr::Bool(_, loc)
            | Expr::Ident(_, loc)
            | Expr::ArrayLit(_, loc)
            | Expr::ObjectLit(_, loc)
            | Expr::Spread(_, loc)
            | Expr::Await(_, loc)
            | Expr::Propagate(_, loc)
            | Expr::JsxFragment { loc, .. } => loc,
            Expr::Lambda { loc, .. }
            | Expr::Unary { loc, .. }
            | Expr::Binary { loc, .. }
            | Expr::Range { loc, .. }
            | Expr::Call { loc, .. }
            | Expr::Member { loc, .. }
            | Expr::Index { loc, .. }
            | Expr::Slice { loc, .. }
            | Expr::If { loc, .. }
            | Expr::Match { loc, .. } => loc,
            Expr::Jsx(element) => &element.loc,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TemplateExprPart {
    Literal(String),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum ObjectEntry {
    KeyValue { key: String, value: Expr },
    Shorthand(String, Loc),
    Spread(Expr),
}

#[derive(Debug, Clone)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    NullCoalesce,
    Pipe,
    In,
    NotIn,
}

// ---------------------------------------------------------------------
// JSX
// ---------------------------------------------------------------------

/// Tag-name case determines identity: lowercase tags are HTML elements,
/// PascalCase tags are component calls.
#[derive(Debug, Clone)]
pub struct JsxElement {
    pub tag: String,
    pub attrs: Vec<JsxAttr>,
    pub children: Vec<JsxChild>,
    pub self_closing: bool,
    pub loc: Loc,
}

impl JsxElement {
    pub fn is_component(&self) -> bool {
        self.tag.chars().next().is_some_and(|c| c.is_uppercase())
    }
}

#[derive(Debug, Clone)]
pub enum JsxAttr {
    Static {
        name: String,
        value: String,
        loc: Loc,
    },
    Expr {
        name: String,
        value: Expr,
        loc: Loc,
    },
    /// `<input disabled>`
    Bare {
        name: String,
        loc: Loc,
    },
    /// `on:click={handler}`
    Event {
        name: String,
        handler: Expr,
        loc: Loc,
    },
    /// `bind:value={signal}`
    Bind {
        name: String,
        target: Expr,
        loc: Loc,
    },
    /// `class:active={cond}`
    ClassToggle {
        name: String,
        cond: Expr,
        loc: Loc,
    },
    /// `style:width={expr}`
    StyleProp {
        name: String,
        value: Expr,
        loc: Loc,
    },
    /// `{...props}`
    Spread {
        value: Expr,
        loc: Loc,
    },
}

#[derive(Debug, Clone)]
pub enum JsxChild {
    Element(JsxElement),
    Fragment(Vec<JsxChild>, Loc),
    Text(String, Loc),
    Expr(Expr, Loc),
    If(JsxIf),
    For(JsxFor),
}

#[derive(Debug, Clone)]
pub struct JsxIf {
    /// `if` plus any `elif` branches, in order
    pub branches: Vec<(Expr, Vec<JsxChild>)>,
    pub else_children: Option<Vec<JsxChild>>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct JsxFor {
    pub bindings: Vec<String>,
    pub iterable: Expr,
    pub key: Option<Expr>,
    pub body: Vec<JsxChild>,
    pub loc: Loc,
}

// ---------------------------------------------------------------------
// Export table
// ---------------------------------------------------------------------

/// Per-file export surface, consulted during import resolution.
#[derive(Debug, Clone, Default)]
pub struct ModuleExportTable {
    pub public_exports: BTreeSet<String>,
    pub all_names: BTreeSet<String>,
}

impl ModuleExportTable {
    pub fn from_program(program: &Program) -> Self {
        let mut table = Self::default();
        for item in &program.body {
            match item {
                Item::Statement(stmt) => table.record(stmt),
                Item::SharedBlock { body, .. } => {
                    for stmt in body {
                        table.record(stmt);
                    }
                }
                _ => {}
            }
        }
        table
    }

    fn record(&mut self, stmt: &Stmt) {
        let (names, is_pub): (Vec<String>, bool) = match stmt {
            Stmt::Let {
                pattern, is_pub, ..
            } => (
                pattern.bound_names().into_iter().map(|(n, _)| n).collect(),
                *is_pub,
            ),
            Stmt::Function(decl) => (vec![decl.name.clone()], decl.is_pub),
            Stmt::TypeDecl(decl) => {
                // Variant constructors export alongside the type
                let mut names = vec![decl.name.clone()];
                names.extend(decl.variants.iter().map(|v| v.name.clone()));
                (names, decl.is_pub)
            }
            Stmt::TypeAlias { name, is_pub, .. }
            | Stmt::Interface { name, is_pub, .. }
            | Stmt::TraitDecl { name, is_pub, .. } => (vec![name.clone()], *is_pub),
            _ => return,
        };
        for name in names {
            if is_pub {
                self.public_exports.insert(name.clone());
            }
            self.all_names.insert(name);
        }
    }
}
