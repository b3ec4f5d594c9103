//! Client artifact emission: the embedded runtime, signal wiring for
//! `state`/`computed`/`effect`, components, stores, and JSX-to-vnode
//! compilation.

use super::expr::object_key;
use super::{js_string, Artifact, CodeGenerator, Emitter, SignalKind};
use crate::parser::ast::*;
use crate::runtime;

impl CodeGenerator {
    pub(crate) fn emit_client(
        &mut self,
        program: &Program,
        _label: Option<&str>,
        bodies: &[&[Stmt]],
        base: &str,
        shared_names: &[String],
    ) -> Artifact {
        let mut e = Emitter::new();
        e.line("// Generated by the Tova compiler - do not edit.");
        self.emit_shared_import(&mut e, base, shared_names);
        self.emit_imports(&mut e, program);
        e.blank();
        e.push(runtime::RUNTIME_JS);
        e.blank();

        self.in_client = true;
        self.push_scope();

        for body in bodies {
            for stmt in body.iter() {
                self.emit_client_stmt(&mut e, stmt);
            }
        }

        // An `App` component is the conventional entry point
        let has_app = bodies.iter().any(|body| {
            body.iter()
                .any(|stmt| matches!(stmt, Stmt::Component(decl) if decl.name == "App"))
        });
        if has_app {
            e.blank();
            e.line("if (typeof document !== \"undefined\") {");
            e.indent();
            e.line("const __container = document.getElementById(\"app\") || document.body;");
            e.line("if (__container.firstElementChild) {");
            e.indent();
            e.line("hydrate(h(App, {}), __container);");
            e.dedent();
            e.line("} else {");
            e.indent();
            e.line("mount(h(App, {}), __container);");
            e.dedent();
            e.line("}");
            e.dedent();
            e.line("}");
        }

        self.pop_scope();
        self.in_client = false;
        e.finish()
    }

    pub(crate) fn emit_client_stmt(&mut self, e: &mut Emitter, stmt: &Stmt) {
        match stmt {
            Stmt::State { name, value, loc } => {
                e.map(loc);
                let value_js = self.gen_expr(value);
                e.line(&format!(
                    "const [{}, __set_{}] = create_signal({});",
                    name, name, value_js
                ));
                self.declare_signal(name);
            }
            Stmt::ComputedDecl { name, value, loc } => {
                e.map(loc);
                let value_js = self.gen_expr(value);
                e.line(&format!(
                    "const {} = create_computed(() => ({}));",
                    name, value_js
                ));
                self.declare_computed(name);
            }
            Stmt::EffectDecl { body, loc } => {
                e.map(loc);
                e.line("create_effect(() => {");
                e.indent();
                self.push_scope();
                self.emit_block_stmts(e, body, false);
                self.pop_scope();
                e.dedent();
                e.line("});");
            }
            Stmt::Component(decl) => self.emit_component(e, decl),
            Stmt::StoreDecl { name, body, loc } => self.emit_store(e, name, body, loc),
            _ => self.emit_stmt(e, stmt),
        }
    }

    /// Components are plain functions over a `props` object returning a
    /// vnode tree; parameters destructure out of `props`.
    fn emit_component(&mut self, e: &mut Emitter, decl: &ComponentDecl) {
        self.emit_doc(e, &decl.doc);
        e.map(&decl.loc);
        e.line(&format!("function {}(props) {{", decl.name));
        e.indent();
        self.push_scope();
        self.declare_local("props");
        if !decl.params.is_empty() {
            let params_js = self.gen_params(&decl.params);
            e.line(&format!("const {{ {} }} = props;", params_js));
            for param in &decl.params {
                self.declare_locals(&param.pattern);
            }
        }
        self.emit_block_stmts(e, &decl.body, true);
        self.pop_scope();
        e.dedent();
        e.line("}");
    }

    /// `store Name { ... }` compiles to an IIFE module object whose
    /// state members read and write through the enclosed signals.
    fn emit_store(&mut self, e: &mut Emitter, name: &str, body: &[Stmt], loc: &crate::error::Loc) {
        e.map(loc);
        e.line(&format!("const {} = (() => {{", name));
        e.indent();
        self.push_scope();

        let mut exports: Vec<String> = Vec::new();
        for stmt in body {
            match stmt {
                Stmt::State { name, .. } => {
                    exports.push(format!("get {}() {{ return {}(); }}", name, name));
                    exports.push(format!("set {}(__v) {{ __set_{}(__v); }}", name, name));
                }
                Stmt::ComputedDecl { name, .. } => {
                    exports.push(format!("get {}() {{ return {}(); }}", name, name));
                }
                Stmt::Function(decl) => exports.push(decl.name.clone()),
                _ => {}
            }
        }

        for stmt in body {
            self.emit_client_stmt(e, stmt);
        }

        e.line(&format!("return {{ {} }};", exports.join(", ")));
        self.pop_scope();
        e.dedent();
        e.line("})();");
        self.declare_local(name);
    }

    // ------------------------------------------------------------------
    // JSX
    // ------------------------------------------------------------------

    pub(crate) fn gen_jsx_element(&mut self, element: &JsxElement) -> String {
        self.gen_jsx_element_keyed(element, None)
    }

    fn gen_jsx_element_keyed(&mut self, element: &JsxElement, key: Option<&str>) -> String {
        let is_component = element.is_component();
        let tag = if is_component {
            element.tag.clone()
        } else {
            js_string(&element.tag)
        };

        let mut props: Vec<String> = Vec::new();
        if let Some(key_js) = key {
            props.push(format!("key: {}", key_js));
        }
        for attr in &element.attrs {
            props.push(self.gen_jsx_attr(attr, is_component));
        }

        let children: Vec<String> = element
            .children
            .iter()
            .map(|child| self.gen_jsx_child(child))
            .collect();

        let props_js = if props.is_empty() {
            "{}".to_string()
        } else {
            format!("{{ {} }}", props.join(", "))
        };
        if children.is_empty() {
            format!("h({}, {})", tag, props_js)
        } else {
            format!("h({}, {}, {})", tag, props_js, children.join(", "))
        }
    }

    pub(crate) fn gen_jsx_fragment(&mut self, children: &[JsxChild]) -> String {
        let parts: Vec<String> = children
            .iter()
            .map(|child| self.gen_jsx_child(child))
            .collect();
        format!("[{}]", parts.join(", "))
    }

    fn gen_jsx_attr(&mut self, attr: &JsxAttr, is_component: bool) -> String {
        match attr {
            JsxAttr::Static { name, value, .. } => {
                format!("{}: {}", object_key(name), js_string(value))
            }
            JsxAttr::Bare { name, .. } => format!("{}: true", object_key(name)),
            JsxAttr::Expr { name, value, .. } => {
                let value_js = self.gen_expr(value);
                if is_component || expr_is_static(value) {
                    format!("{}: {}", object_key(name), value_js)
                } else {
                    // function-valued props re-evaluate on dependency change
                    format!("{}: () => ({})", object_key(name), value_js)
                }
            }
            JsxAttr::Event { name, handler, .. } => {
                let handler_js = self.gen_handler(handler);
                format!("on{}: {}", name.to_lowercase(), handler_js)
            }
            JsxAttr::Bind { name, target, .. } => {
                let pair = self.gen_bind_pair(target);
                format!("{}: {}", object_key(&format!("bind:{}", name)), pair)
            }
            JsxAttr::ClassToggle { name, cond, .. } => {
                let cond_js = self.gen_expr(cond);
                format!("{}: () => ({})", object_key(&format!("class:{}", name)), cond_js)
            }
            JsxAttr::StyleProp { name, value, .. } => {
                let value_js = self.gen_expr(value);
                format!("{}: () => ({})", object_key(&format!("style:{}", name)), value_js)
            }
            JsxAttr::Spread { value, .. } => format!("...({})", self.gen_expr(value)),
        }
    }

    /// Event handlers: bare function references pass through, anything
    /// else wraps so the expression evaluates at dispatch time.
    fn gen_handler(&mut self, handler: &Expr) -> String {
        match handler {
            Expr::Ident(name, _) if self.signal_kind(name).is_none() => name.clone(),
            Expr::Lambda { .. } => self.gen_expr(handler),
            other => format!("(__ev) => ({})", self.gen_expr(other)),
        }
    }

    /// `bind:x={target}` compiles to a `[getter, setter]` pair.
    fn gen_bind_pair(&mut self, target: &Expr) -> String {
        if let Expr::Ident(name, _) = target {
            if self.signal_kind(name) == Some(SignalKind::Signal) {
                return format!("[{}, __set_{}]", name, name);
            }
        }
        let read = self.gen_expr(target);
        let write_target = match target {
            Expr::Ident(name, _) => name.clone(),
            _ => read.clone(),
        };
        format!(
            "[() => ({}), (__v) => {{ {} = __v; }}]",
            read, write_target
        )
    }

    fn gen_jsx_child(&mut self, child: &JsxChild) -> String {
        match child {
            JsxChild::Element(element) => self.gen_jsx_element(element),
            JsxChild::Fragment(children, _) => self.gen_jsx_fragment(children),
            JsxChild::Text(text, _) => js_string(text),
            JsxChild::Expr(expr, _) => {
                let js = self.gen_expr(expr);
                if expr_is_static(expr) {
                    js
                } else {
                    format!("() => ({})", js)
                }
            }
            JsxChild::If(jsx_if) => self.gen_jsx_if(jsx_if),
            JsxChild::For(jsx_for) => self.gen_jsx_for(jsx_for),
        }
    }

    /// `if`/`elif`/`else` children compile to a function-vnode so the
    /// runtime re-renders the region when a condition flips.
    fn gen_jsx_if(&mut self, jsx_if: &JsxIf) -> String {
        let mut out = String::from("() => (");
        let mut close = 0;
        for (cond, body) in &jsx_if.branches {
            let cond_js = self.gen_expr(cond);
            let body_js = self.gen_jsx_fragment(body);
            out.push_str(&format!("({}) ? {} : (", cond_js, body_js));
            close += 1;
        }
        match &jsx_if.else_children {
            Some(children) => out.push_str(&self.gen_jsx_fragment(children)),
            None => out.push_str("null"),
        }
        for _ in 0..close {
            out.push(')');
        }
        out.push(')');
        out
    }

    /// `for` children compile to a function-vnode mapping the iterable;
    /// a `key={...}` attribute lands in each child vnode for keyed
    /// reconciliation.
    fn gen_jsx_for(&mut self, jsx_for: &JsxFor) -> String {
        let iter_js = self.gen_expr(&jsx_for.iterable);
        self.push_scope();
        for binding in &jsx_for.bindings {
            self.declare_local(binding);
        }
        let key_js = jsx_for.key.as_ref().map(|key| self.gen_expr(key));

        let body_parts: Vec<String> = jsx_for
            .body
            .iter()
            .enumerate()
            .map(|(i, child)| match (i, child, &key_js) {
                (0, JsxChild::Element(element), Some(key)) => {
                    self.gen_jsx_element_keyed(element, Some(key))
                }
                _ => self.gen_jsx_child(child),
            })
            .collect();
        let body_js = if body_parts.len() == 1 {
            body_parts.into_iter().next().unwrap()
        } else {
            format!("[{}]", body_parts.join(", "))
        };
        self.pop_scope();

        let source = if jsx_for.bindings.len() > 1 {
            format!(
                "entries({}).map(([{}]) => {})",
                iter_js,
                jsx_for.bindings.join(", "),
                body_js
            )
        } else {
            format!(
                "Array.from({}).map(({}) => {})",
                iter_js, jsx_for.bindings[0], body_js
            )
        };
        format!("() => {}", source)
    }
}

/// Literals render once; anything referencing a name may be reactive and
/// compiles to a thunk the runtime re-evaluates.
fn expr_is_static(expr: &Expr) -> bool {
    match expr {
        Expr::Number(..) | Expr::Str(..) | Expr::Bool(..) => true,
        Expr::ArrayLit(elements, _) => elements.iter().all(expr_is_static),
        Expr::ObjectLit(entries, _) => entries.iter().all(|entry| match entry {
            ObjectEntry::KeyValue { value, .. } => expr_is_static(value),
            _ => false,
        }),
        Expr::TemplateStr(parts, _) => parts.iter().all(|part| match part {
            TemplateExprPart::Literal(_) => true,
            TemplateExprPart::Expr(expr) => expr_is_static(expr),
        }),
        Expr::Unary { operand, .. } => expr_is_static(operand),
        Expr::Binary { left, right, .. } => expr_is_static(left) && expr_is_static(right),
        _ => false,
    }
}
