//! Expression and pattern compilation, plus the AST walks the generator
//! needs: builtin-reference collection for tree-shaking and the
//! `await`/`?` body scans.

use super::{js_string, CodeGenerator, Emitter, SignalKind};
use crate::parser::ast::*;
use std::collections::BTreeSet;

impl CodeGenerator {
    pub(crate) fn gen_expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Number(value, _) => js_number(*value),
            Expr::Str(value, _) => js_string(value),
            Expr::Bool(value, _) => value.to_string(),
            Expr::TemplateStr(parts, _) => self.gen_template(parts),
            Expr::Ident(name, _) => match self.signal_kind(name) {
                Some(_) => format!("{}()", name),
                None => name.clone(),
            },
            Expr::ArrayLit(elements, _) => {
                let parts: Vec<String> = elements.iter().map(|el| self.gen_expr(el)).collect();
                format!("[{}]", parts.join(", "))
            }
            Expr::ObjectLit(entries, _) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|entry| match entry {
                        ObjectEntry::KeyValue { key, value } => {
                            format!("{}: {}", object_key(key), self.gen_expr(value))
                        }
                        ObjectEntry::Shorthand(name, _) => match self.signal_kind(name) {
                            Some(_) => format!("{}: {}()", name, name),
                            None => name.clone(),
                        },
                        ObjectEntry::Spread(value) => format!("...{}", self.gen_expr(value)),
                    })
                    .collect();
                format!("{{ {} }}", parts.join(", "))
            }
            Expr::Lambda {
                params,
                body,
                is_async,
                ..
            } => self.gen_lambda(params, body, *is_async),
            Expr::Unary { op, operand, .. } => {
                let operand_js = self.gen_expr(operand);
                match op {
                    UnaryOp::Neg => format!("(-{})", operand_js),
                    UnaryOp::Not => format!("(!{})", operand_js),
                }
            }
            Expr::Binary {
                op, left, right, ..
            } => self.gen_binary(*op, left, right),
            Expr::Range {
                start,
                end,
                inclusive,
                ..
            } => {
                let start_js = self.gen_expr(start);
                let end_js = self.gen_expr(end);
                if *inclusive {
                    format!("range({}, ({}) + 1)", start_js, end_js)
                } else {
                    format!("range({}, {})", start_js, end_js)
                }
            }
            Expr::Call { callee, args, .. } => {
                // `server.fn(args)` from client code crosses the RPC bridge
                if self.in_client {
                    if let Expr::Member {
                        object, property, ..
                    } = callee.as_ref()
                    {
                        if matches!(object.as_ref(), Expr::Ident(name, _) if name == "server") {
                            let arg_js: Vec<String> =
                                args.iter().map(|a| self.gen_expr(a)).collect();
                            return format!(
                                "rpc({}, [{}])",
                                js_string(property),
                                arg_js.join(", ")
                            );
                        }
                    }
                }
                let callee_js = self.gen_callee(callee);
                let arg_js: Vec<String> = args.iter().map(|a| self.gen_expr(a)).collect();
                format!("{}({})", callee_js, arg_js.join(", "))
            }
            Expr::Member {
                object,
                property,
                optional,
                ..
            } => {
                if self.in_client {
                    if matches!(object.as_ref(), Expr::Ident(name, _) if name == "server") {
                        // bare RPC reference: usable as a callback
                        return format!("((...__args) => rpc({}, __args))", js_string(property));
                    }
                }
                let object_js = self.gen_expr(object);
                let accessor = if *optional { "?." } else { "." };
                format!("{}{}{}", object_js, accessor, property)
            }
            Expr::Index { object, index, .. } => {
                format!("{}[{}]", self.gen_expr(object), self.gen_expr(index))
            }
            Expr::Slice {
                object, start, end, ..
            } => {
                let object_js = self.gen_expr(object);
                let start_js = start
                    .as_ref()
                    .map(|s| self.gen_expr(s))
                    .unwrap_or_else(|| "0".to_string());
                match end {
                    Some(end) => format!("{}.slice({}, {})", object_js, start_js, self.gen_expr(end)),
                    None => format!("{}.slice({})", object_js, start_js),
                }
            }
            Expr::Spread(value, _) => format!("...{}", self.gen_expr(value)),
            Expr::If {
                cond,
                then_body,
                elif_branches,
                else_body,
                ..
            } => self.gen_if_value(cond, then_body, elif_branches, else_body),
            Expr::Match { subject, arms, .. } => self.gen_match(subject, arms),
            Expr::Await(operand, _) => format!("(await {})", self.gen_expr(operand)),
            Expr::Propagate(operand, _) => format!("__propagate({})", self.gen_expr(operand)),
            Expr::Jsx(element) => self.gen_jsx_element(element),
            Expr::JsxFragment { children, .. } => self.gen_jsx_fragment(children),
        }
    }

    /// Conditional in value position: an IIFE whose branches return
    /// their final expression.
    pub(crate) fn gen_if_value(
        &mut self,
        cond: &Expr,
        then_body: &[Stmt],
        elif_branches: &[(Expr, Vec<Stmt>)],
        else_body: &Option<Vec<Stmt>>,
    ) -> String {
        let mut out = String::from("(() => {\n");
        let cond_js = self.gen_expr(cond);
        out.push_str(&format!("if ({}) {{\n", cond_js));
        out.push_str(&self.gen_block_to_string(then_body, true));
        for (elif_cond, elif_body) in elif_branches {
            let elif_js = self.gen_expr(elif_cond);
            out.push_str(&format!("}} else if ({}) {{\n", elif_js));
            out.push_str(&self.gen_block_to_string(elif_body, true));
        }
        if let Some(else_body) = else_body {
            out.push_str("} else {\n");
            out.push_str(&self.gen_block_to_string(else_body, true));
        }
        out.push_str("}\nreturn undefined;\n})()");
        out
    }

    /// Callee position: signals read as values, not calls-of-calls.
    fn gen_callee(&mut self, callee: &Expr) -> String {
        match callee {
            Expr::Ident(name, _) if self.signal_kind(name).is_none() => name.clone(),
            Expr::Lambda { .. } => format!("({})", self.gen_expr(callee)),
            other => self.gen_expr(other),
        }
    }

    fn gen_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> String {
        if op == BinaryOp::Pipe {
            // `x |> f` calls f(x); `x |> f(a)` inserts x as the first argument
            let left_js = self.gen_expr(left);
            return match right {
                Expr::Call { callee, args, .. } => {
                    let callee_js = self.gen_callee(callee);
                    let mut arg_js = vec![left_js];
                    arg_js.extend(args.iter().map(|a| self.gen_expr(a)));
                    format!("{}({})", callee_js, arg_js.join(", "))
                }
                other => format!("{}({})", self.gen_callee(other), left_js),
            };
        }

        let left_js = self.gen_expr(left);
        let right_js = self.gen_expr(right);
        match op {
            BinaryOp::In => format!("contains({}, {})", right_js, left_js),
            BinaryOp::NotIn => format!("(!contains({}, {}))", right_js, left_js),
            BinaryOp::Pow => format!("({} ** {})", left_js, right_js),
            BinaryOp::NullCoalesce => format!("({} ?? {})", left_js, right_js),
            other => {
                let op_js = match other {
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                    BinaryOp::Mod => "%",
                    BinaryOp::Eq => "===",
                    BinaryOp::Ne => "!==",
                    BinaryOp::Lt => "<",
                    BinaryOp::Le => "<=",
                    BinaryOp::Gt => ">",
                    BinaryOp::Ge => ">=",
                    BinaryOp::And => "&&",
                    BinaryOp::Or => "||",
                    _ => unreachable!("handled above"),
                };
                format!("({} {} {})", left_js, op_js, right_js)
            }
        }
    }

    fn gen_template(&mut self, parts: &[TemplateExprPart]) -> String {
        let mut out = String::from("`");
        for part in parts {
            match part {
                TemplateExprPart::Literal(text) => {
                    for ch in text.chars() {
                        match ch {
                            '`' => out.push_str("\\`"),
                            '\\' => out.push_str("\\\\"),
                            '$' => out.push_str("\\$"),
                            _ => out.push(ch),
                        }
                    }
                }
                TemplateExprPart::Expr(expr) => {
                    out.push_str("${");
                    out.push_str(&self.gen_expr(expr));
                    out.push('}');
                }
            }
        }
        out.push('`');
        out
    }

    pub(crate) fn gen_lambda(
        &mut self,
        params: &[Param],
        body: &LambdaBody,
        is_async: bool,
    ) -> String {
        self.push_scope();
        for param in params {
            self.declare_locals(&param.pattern);
        }
        let params_js = self.gen_params(params);
        let async_kw = if is_async { "async " } else { "" };
        let out = match body {
            LambdaBody::Expr(expr) => {
                let has_propagate = expr_contains_propagate(expr);
                let body_js = self.gen_expr(expr);
                if has_propagate {
                    let helper = if is_async { "__try_async" } else { "__try" };
                    format!(
                        "{}({}) => {}(() => ({}))",
                        async_kw, params_js, helper, body_js
                    )
                } else {
                    format!("{}({}) => ({})", async_kw, params_js, body_js)
                }
            }
            LambdaBody::Block(stmts) => {
                let block = self.gen_block_to_string(stmts, true);
                if contains_propagate(stmts) {
                    let helper = if is_async { "__try_async" } else { "__try" };
                    let inner = if is_async { "async () => {" } else { "() => {" };
                    format!(
                        "{}({}) => {{ return {}({}\n{}}}); }}",
                        async_kw, params_js, helper, inner, block
                    )
                } else {
                    format!("{}({}) => {{\n{}}}", async_kw, params_js, block)
                }
            }
        };
        self.pop_scope();
        out
    }

    /// Render a statement block to a plain string (nested positions
    /// where the outer emitter's line tracking does not apply).
    pub(crate) fn gen_block_to_string(&mut self, stmts: &[Stmt], value_position: bool) -> String {
        let mut nested = Emitter::new();
        self.push_scope();
        self.emit_block_stmts(&mut nested, stmts, value_position);
        self.pop_scope();
        nested.finish().code
    }

    pub(crate) fn gen_params(&mut self, params: &[Param]) -> String {
        let parts: Vec<String> = params
            .iter()
            .map(|param| {
                let mut out = self.gen_bind_pattern(&param.pattern);
                if let Some(ref default) = param.default {
                    out.push_str(" = ");
                    out.push_str(&self.gen_expr(default));
                }
                out
            })
            .collect();
        parts.join(", ")
    }

    pub(crate) fn gen_bind_pattern(&mut self, pattern: &BindPattern) -> String {
        match pattern {
            BindPattern::Name(name, _) => name.clone(),
            BindPattern::Object { entries, .. } => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|entry| {
                        let mut out = if entry.key == entry.binding {
                            entry.key.clone()
                        } else {
                            format!("{}: {}", entry.key, entry.binding)
                        };
                        if let Some(ref default) = entry.default {
                            out.push_str(" = ");
                            out.push_str(&self.gen_expr(default));
                        }
                        out
                    })
                    .collect();
                format!("{{ {} }}", parts.join(", "))
            }
            BindPattern::Array {
                elements, rest, ..
            } => {
                let mut parts: Vec<String> = elements
                    .iter()
                    .map(|el| self.gen_bind_pattern(el))
                    .collect();
                if let Some(rest) = rest {
                    parts.push(format!("...{}", rest));
                }
                format!("[{}]", parts.join(", "))
            }
        }
    }

    pub(crate) fn gen_assignment(&mut self, target: &Expr, op: AssignOp, value: &Expr) -> String {
        let value_js = self.gen_expr(value);
        if let Expr::Ident(name, _) = target {
            if self.signal_kind(name) == Some(SignalKind::Signal) {
                return match op {
                    AssignOp::Assign => format!("__set_{}({})", name, value_js),
                    AssignOp::Add => format!("__set_{}({}() + {})", name, name, value_js),
                    AssignOp::Sub => format!("__set_{}({}() - {})", name, name, value_js),
                    AssignOp::Mul => format!("__set_{}({}() * {})", name, name, value_js),
                    AssignOp::Div => format!("__set_{}({}() / {})", name, name, value_js),
                };
            }
            let op_js = assign_op_js(op);
            return format!("{} {} {}", name, op_js, value_js);
        }
        let target_js = self.gen_expr(target);
        format!("{} {} {}", target_js, assign_op_js(op), value_js)
    }

    // ------------------------------------------------------------------
    // Pattern matching
    // ------------------------------------------------------------------

    /// `match` compiles to an IIFE over `__match`: arms test in order,
    /// the first passing test (and guard) returns its body.
    pub(crate) fn gen_match(&mut self, subject: &Expr, arms: &[MatchArm]) -> String {
        let subject_js = self.gen_expr(subject);
        let mut out = String::from("((__match) => {\n");
        for arm in arms {
            self.push_scope();
            self.declare_pattern_locals(&arm.pattern);
            let test = self.gen_pattern_test("__match", &arm.pattern);
            let mut bindings = Vec::new();
            self.gen_pattern_bindings("__match", &arm.pattern, &mut bindings);

            let body_js = match &arm.body {
                MatchArmBody::Expr(expr) => format!("return {};\n", self.gen_expr(expr)),
                MatchArmBody::Block(stmts) => self.gen_block_to_string(stmts, true),
            };

            out.push_str(&format!("if ({}) {{\n", test));
            for binding in &bindings {
                out.push_str(binding);
                out.push('\n');
            }
            match &arm.guard {
                Some(guard) => {
                    let guard_js = self.gen_expr(guard);
                    out.push_str(&format!("if ({}) {{\n{}}}\n", guard_js, body_js));
                }
                None => out.push_str(&body_js),
            }
            out.push_str("}\n");
            self.pop_scope();
        }
        out.push_str("return undefined;\n})(");
        out.push_str(&subject_js);
        out.push(')');
        out
    }

    fn declare_pattern_locals(&mut self, pattern: &MatchPattern) {
        match pattern {
            MatchPattern::Binding(name, _) => self.declare_local(name),
            MatchPattern::Variant { bindings, .. } => {
                for binding in bindings {
                    self.declare_pattern_locals(binding);
                }
            }
            MatchPattern::Array { elements, rest, .. } => {
                for element in elements {
                    self.declare_pattern_locals(element);
                }
                if let Some(rest) = rest {
                    self.declare_local(rest);
                }
            }
            MatchPattern::StringConcat { binding, .. } => self.declare_local(binding),
            _ => {}
        }
    }

    fn gen_pattern_test(&mut self, path: &str, pattern: &MatchPattern) -> String {
        match pattern {
            MatchPattern::Literal(lit) => format!("{} === {}", path, self.gen_expr(lit)),
            MatchPattern::Range {
                start,
                end,
                inclusive,
            } => {
                let start_js = self.gen_expr(start);
                let end_js = self.gen_expr(end);
                let cmp = if *inclusive { "<=" } else { "<" };
                format!(
                    "typeof {} === \"number\" && {} >= {} && {} {} {}",
                    path, path, start_js, path, cmp, end_js
                )
            }
            MatchPattern::Variant { name, bindings, .. } => {
                let mut test = format!("{} != null && {}.__tag === {}", path, path, js_string(name));
                for (i, sub) in bindings.iter().enumerate() {
                    if sub.is_irrefutable() {
                        continue;
                    }
                    let sub_path = format!("{}.__values[{}]", path, i);
                    test.push_str(" && ");
                    test.push_str(&self.gen_pattern_test(&sub_path, sub));
                }
                test
            }
            MatchPattern::Array { elements, rest, .. } => {
                let length_check = match rest {
                    Some(_) => format!("{}.length >= {}", path, elements.len()),
                    None => format!("{}.length === {}", path, elements.len()),
                };
                let mut test = format!("Array.isArray({}) && {}", path, length_check);
                for (i, sub) in elements.iter().enumerate() {
                    if sub.is_irrefutable() {
                        continue;
                    }
                    let sub_path = format!("{}[{}]", path, i);
                    test.push_str(" && ");
                    test.push_str(&self.gen_pattern_test(&sub_path, sub));
                }
                test
            }
            MatchPattern::StringConcat { prefix, .. } => format!(
                "typeof {} === \"string\" && {}.startsWith({})",
                path,
                path,
                js_string(prefix)
            ),
            MatchPattern::Wildcard(_) | MatchPattern::Binding(..) => "true".to_string(),
        }
    }

    fn gen_pattern_bindings(&mut self, path: &str, pattern: &MatchPattern, out: &mut Vec<String>) {
        match pattern {
            MatchPattern::Binding(name, _) => out.push(format!("const {} = {};", name, path)),
            MatchPattern::Variant { bindings, .. } => {
                for (i, sub) in bindings.iter().enumerate() {
                    let sub_path = format!("{}.__values[{}]", path, i);
                    self.gen_pattern_bindings(&sub_path, sub, out);
                }
            }
            MatchPattern::Array { elements, rest, .. } => {
                for (i, sub) in elements.iter().enumerate() {
                    let sub_path = format!("{}[{}]", path, i);
                    self.gen_pattern_bindings(&sub_path, sub, out);
                }
                if let Some(rest) = rest {
                    out.push(format!(
                        "const {} = {}.slice({});",
                        rest,
                        path,
                        elements.len()
                    ));
                }
            }
            MatchPattern::StringConcat {
                prefix, binding, ..
            } => {
                out.push(format!(
                    "const {} = {}.slice({});",
                    binding,
                    path,
                    prefix.chars().count()
                ));
            }
            _ => {}
        }
    }
}

pub(crate) fn js_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

pub(crate) fn object_key(key: &str) -> String {
    let plain = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !key.chars().next().unwrap().is_ascii_digit();
    if plain {
        key.to_string()
    } else {
        js_string(key)
    }
}

fn assign_op_js(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => "=",
        AssignOp::Add => "+=",
        AssignOp::Sub => "-=",
        AssignOp::Mul => "*=",
        AssignOp::Div => "/=",
    }
}

// ---------------------------------------------------------------------
// AST scans
// ---------------------------------------------------------------------

/// Every identifier the program references, plus the implicit helpers
/// compiled constructs lean on (`range` for range expressions,
/// `contains` for membership, `entries` for two-binding loops). The
/// stdlib emitter intersects this with the builtin registry.
pub(crate) fn referenced_builtins(program: &Program) -> BTreeSet<String> {
    let mut referenced = BTreeSet::new();
    for item in &program.body {
        match item {
            Item::Statement(stmt) => collect_stmt(stmt, &mut referenced),
            Item::SharedBlock { body, .. }
            | Item::ServerBlock { body, .. }
            | Item::ClientBlock { body, .. }
            | Item::TestBlock { body, .. }
            | Item::BenchBlock { body, .. } => {
                for stmt in body {
                    collect_stmt(stmt, &mut referenced);
                }
            }
            Item::Import(_) => {}
        }
    }
    referenced
}

fn collect_stmt(stmt: &Stmt, out: &mut BTreeSet<String>) {
    match stmt {
        Stmt::Let { pattern, value, .. } => {
            collect_bind_pattern(pattern, out);
            collect_expr(value, out);
        }
        Stmt::Function(decl) => collect_function(decl, out),
        Stmt::TypeDecl(_) | Stmt::TypeAlias { .. } => {}
        Stmt::Interface { .. } | Stmt::TraitDecl { .. } => {}
        Stmt::ImplBlock { functions, .. } => {
            for function in functions {
                collect_function(function, out);
            }
        }
        Stmt::Assign { target, value, .. } => {
            collect_expr(target, out);
            collect_expr(value, out);
        }
        Stmt::Return { value, .. } => {
            if let Some(value) = value {
                collect_expr(value, out);
            }
        }
        Stmt::Break { .. } | Stmt::Continue { .. } => {}
        Stmt::Throw { value, .. } => collect_expr(value, out),
        Stmt::If {
            cond,
            then_body,
            elif_branches,
            else_body,
            ..
        } => {
            collect_expr(cond, out);
            for stmt in then_body {
                collect_stmt(stmt, out);
            }
            for (elif_cond, elif_body) in elif_branches {
                collect_expr(elif_cond, out);
                for stmt in elif_body {
                    collect_stmt(stmt, out);
                }
            }
            if let Some(else_body) = else_body {
                for stmt in else_body {
                    collect_stmt(stmt, out);
                }
            }
        }
        Stmt::Match { subject, arms, .. } => {
            collect_expr(subject, out);
            collect_arms(arms, out);
        }
        Stmt::For {
            bindings,
            iterable,
            body,
            ..
        } => {
            if bindings.len() > 1 {
                out.insert("entries".to_string());
            }
            collect_expr(iterable, out);
            for stmt in body {
                collect_stmt(stmt, out);
            }
        }
        Stmt::While { cond, body, .. } => {
            collect_expr(cond, out);
            for stmt in body {
                collect_stmt(stmt, out);
            }
        }
        Stmt::TryCatch {
            body,
            catch_body,
            finally_body,
            ..
        } => {
            for stmt in body.iter().chain(catch_body) {
                collect_stmt(stmt, out);
            }
            if let Some(finally_body) = finally_body {
                for stmt in finally_body {
                    collect_stmt(stmt, out);
                }
            }
        }
        Stmt::Expression(expr) => collect_expr(expr, out),
        Stmt::Route(route) => {
            if let RouteHandler::Inline { params, body } = &route.handler {
                collect_params(params, out);
                for stmt in body {
                    collect_stmt(stmt, out);
                }
            }
        }
        Stmt::RouteGroup { routes, .. } => {
            for route in routes {
                if let RouteHandler::Inline { params, body } = &route.handler {
                    collect_params(params, out);
                    for stmt in body {
                        collect_stmt(stmt, out);
                    }
                }
            }
        }
        Stmt::Db { config, .. } | Stmt::ConfigSingleton { config, .. } => {
            collect_expr(config, out)
        }
        Stmt::Model { .. } | Stmt::StaticDir { .. } => {}
        Stmt::Middleware { params, body, .. }
        | Stmt::Sse { params, body, .. }
        | Stmt::Subscribe { params, body, .. }
        | Stmt::BackgroundJob { params, body, .. } => {
            collect_params(params, out);
            for stmt in body {
                collect_stmt(stmt, out);
            }
        }
        Stmt::Websocket { handlers, .. } => {
            for handler in handlers {
                collect_function(handler, out);
            }
        }
        Stmt::Schedule { body, .. } | Stmt::LifecycleHook { body, .. } => {
            for stmt in body {
                collect_stmt(stmt, out);
            }
        }
        Stmt::EnvDecl { names, .. } => {
            for (_, default) in names {
                if let Some(default) = default {
                    collect_expr(default, out);
                }
            }
        }
        Stmt::State { value, .. } | Stmt::ComputedDecl { value, .. } => collect_expr(value, out),
        Stmt::EffectDecl { body, .. } => {
            for stmt in body {
                collect_stmt(stmt, out);
            }
        }
        Stmt::Component(decl) => {
            collect_params(&decl.params, out);
            for stmt in &decl.body {
                collect_stmt(stmt, out);
            }
        }
        Stmt::StoreDecl { body, .. } => {
            for stmt in body {
                collect_stmt(stmt, out);
            }
        }
    }
}

fn collect_function(decl: &FunctionDecl, out: &mut BTreeSet<String>) {
    collect_params(&decl.params, out);
    for stmt in &decl.body {
        collect_stmt(stmt, out);
    }
}

fn collect_params(params: &[Param], out: &mut BTreeSet<String>) {
    for param in params {
        collect_bind_pattern(&param.pattern, out);
        if let Some(ref default) = param.default {
            collect_expr(default, out);
        }
    }
}

fn collect_bind_pattern(pattern: &BindPattern, out: &mut BTreeSet<String>) {
    if let BindPattern::Object { entries, .. } = pattern {
        for entry in entries {
            if let Some(ref default) = entry.default {
                collect_expr(default, out);
            }
        }
    }
}

fn collect_arms(arms: &[MatchArm], out: &mut BTreeSet<String>) {
    for arm in arms {
        if let Some(ref guard) = arm.guard {
            collect_expr(guard, out);
        }
        match &arm.body {
            MatchArmBody::Expr(expr) => collect_expr(expr, out),
            MatchArmBody::Block(stmts) => {
                for stmt in stmts {
                    collect_stmt(stmt, out);
                }
            }
        }
    }
}

fn collect_expr(expr: &Expr, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Number(..) | Expr::Str(..) | Expr::Bool(..) => {}
        Expr::Ident(name, _) => {
            out.insert(name.clone());
        }
        Expr::TemplateStr(parts, _) => {
            for part in parts {
                if let TemplateExprPart::Expr(expr) = part {
                    collect_expr(expr, out);
                }
            }
        }
        Expr::ArrayLit(elements, _) => {
            for element in elements {
                collect_expr(element, out);
            }
        }
        Expr::ObjectLit(entries, _) => {
            for entry in entries {
                match entry {
                    ObjectEntry::KeyValue { value, .. } => collect_expr(value, out),
                    ObjectEntry::Shorthand(name, _) => {
                        out.insert(name.clone());
                    }
                    ObjectEntry::Spread(value) => collect_expr(value, out),
                }
            }
        }
        Expr::Lambda { params, body, .. } => {
            collect_params(params, out);
            match body {
                LambdaBody::Expr(expr) => collect_expr(expr, out),
                LambdaBody::Block(stmts) => {
                    for stmt in stmts {
                        collect_stmt(stmt, out);
                    }
                }
            }
        }
        Expr::Unary { operand, .. } => collect_expr(operand, out),
        Expr::Binary {
            op, left, right, ..
        } => {
            if matches!(op, BinaryOp::In | BinaryOp::NotIn) {
                out.insert("contains".to_string());
            }
            collect_expr(left, out);
            collect_expr(right, out);
        }
        Expr::Range { start, end, .. } => {
            out.insert("range".to_string());
            collect_expr(start, out);
            collect_expr(end, out);
        }
        Expr::Call { callee, args, .. } => {
            collect_expr(callee, out);
            for arg in args {
                collect_expr(arg, out);
            }
        }
        Expr::Member { object, .. } => collect_expr(object, out),
        Expr::Index { object, index, .. } => {
            collect_expr(object, out);
            collect_expr(index, out);
        }
        Expr::Slice {
            object, start, end, ..
        } => {
            collect_expr(object, out);
            if let Some(start) = start {
                collect_expr(start, out);
            }
            if let Some(end) = end {
                collect_expr(end, out);
            }
        }
        Expr::Spread(value, _) => collect_expr(value, out),
        Expr::If {
            cond,
            then_body,
            elif_branches,
            else_body,
            ..
        } => {
            collect_expr(cond, out);
            for stmt in then_body {
                collect_stmt(stmt, out);
            }
            for (elif_cond, elif_body) in elif_branches {
                collect_expr(elif_cond, out);
                for stmt in elif_body {
                    collect_stmt(stmt, out);
                }
            }
            if let Some(else_body) = else_body {
                for stmt in else_body {
                    collect_stmt(stmt, out);
                }
            }
        }
        Expr::Match { subject, arms, .. } => {
            collect_expr(subject, out);
            collect_arms(arms, out);
        }
        Expr::Await(operand, _) | Expr::Propagate(operand, _) => collect_expr(operand, out),
        Expr::Jsx(element) => collect_jsx_element(element, out),
        Expr::JsxFragment { children, .. } => {
            for child in children {
                collect_jsx_child(child, out);
            }
        }
    }
}

fn collect_jsx_element(element: &JsxElement, out: &mut BTreeSet<String>) {
    for attr in &element.attrs {
        match attr {
            JsxAttr::Static { .. } | JsxAttr::Bare { .. } => {}
            JsxAttr::Expr { value, .. }
            | JsxAttr::Event { handler: value, .. }
            | JsxAttr::Bind { target: value, .. }
            | JsxAttr::ClassToggle { cond: value, .. }
            | JsxAttr::StyleProp { value, .. }
            | JsxAttr::Spread { value, .. } => collect_expr(value, out),
        }
    }
    for child in &element.children {
        collect_jsx_child(child, out);
    }
}

fn collect_jsx_child(child: &JsxChild, out: &mut BTreeSet<String>) {
    match child {
        JsxChild::Element(element) => collect_jsx_element(element, out),
        JsxChild::Fragment(children, _) => {
            for child in children {
                collect_jsx_child(child, out);
            }
        }
        JsxChild::Text(..) => {}
        JsxChild::Expr(expr, _) => collect_expr(expr, out),
        JsxChild::If(jsx_if) => {
            for (cond, body) in &jsx_if.branches {
                collect_expr(cond, out);
                for child in body {
                    collect_jsx_child(child, out);
                }
            }
            if let Some(ref else_children) = jsx_if.else_children {
                for child in else_children {
                    collect_jsx_child(child, out);
                }
            }
        }
        JsxChild::For(jsx_for) => {
            if jsx_for.bindings.len() > 1 {
                out.insert("entries".to_string());
            }
            collect_expr(&jsx_for.iterable, out);
            if let Some(ref key) = jsx_for.key {
                collect_expr(key, out);
            }
            for child in &jsx_for.body {
                collect_jsx_child(child, out);
            }
        }
    }
}

/// Does this body contain a postfix `?` outside nested functions?
pub(crate) fn contains_propagate(stmts: &[Stmt]) -> bool {
    stmts.iter().any(stmt_contains_propagate)
}

fn stmt_contains_propagate(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Let { value, .. }
        | Stmt::Throw { value, .. }
        | Stmt::State { value, .. }
        | Stmt::ComputedDecl { value, .. } => expr_contains_propagate(value),
        Stmt::Assign { target, value, .. } => {
            expr_contains_propagate(target) || expr_contains_propagate(value)
        }
        Stmt::Return { value, .. } => value.as_ref().is_some_and(expr_contains_propagate),
        Stmt::Expression(expr) => expr_contains_propagate(expr),
        Stmt::If {
            cond,
            then_body,
            elif_branches,
            else_body,
            ..
        } => {
            expr_contains_propagate(cond)
                || contains_propagate(then_body)
                || elif_branches
                    .iter()
                    .any(|(c, b)| expr_contains_propagate(c) || contains_propagate(b))
                || else_body.as_deref().is_some_and(contains_propagate)
        }
        Stmt::Match { subject, arms, .. } => {
            expr_contains_propagate(subject)
                || arms.iter().any(|arm| match &arm.body {
                    MatchArmBody::Expr(expr) => expr_contains_propagate(expr),
                    MatchArmBody::Block(stmts) => contains_propagate(stmts),
                })
        }
        Stmt::For { iterable, body, .. } => {
            expr_contains_propagate(iterable) || contains_propagate(body)
        }
        Stmt::While { cond, body, .. } => expr_contains_propagate(cond) || contains_propagate(body),
        Stmt::TryCatch {
            body,
            catch_body,
            finally_body,
            ..
        } => {
            contains_propagate(body)
                || contains_propagate(catch_body)
                || finally_body.as_deref().is_some_and(contains_propagate)
        }
        _ => false,
    }
}

fn expr_contains_propagate(expr: &Expr) -> bool {
    match expr {
        Expr::Propagate(..) => true,
        // nested functions wrap their own bodies
        Expr::Lambda { .. } => false,
        Expr::Unary { operand, .. } | Expr::Await(operand, _) | Expr::Spread(operand, _) => {
            expr_contains_propagate(operand)
        }
        Expr::Binary { left, right, .. } => {
            expr_contains_propagate(left) || expr_contains_propagate(right)
        }
        Expr::Range { start, end, .. } => {
            expr_contains_propagate(start) || expr_contains_propagate(end)
        }
        Expr::Call { callee, args, .. } => {
            expr_contains_propagate(callee) || args.iter().any(expr_contains_propagate)
        }
        Expr::Member { object, .. } => expr_contains_propagate(object),
        Expr::Index { object, index, .. } => {
            expr_contains_propagate(object) || expr_contains_propagate(index)
        }
        Expr::Slice {
            object, start, end, ..
        } => {
            expr_contains_propagate(object)
                || start.as_deref().is_some_and(expr_contains_propagate)
                || end.as_deref().is_some_and(expr_contains_propagate)
        }
        Expr::ArrayLit(elements, _) => elements.iter().any(expr_contains_propagate),
        Expr::ObjectLit(entries, _) => entries.iter().any(|entry| match entry {
            ObjectEntry::KeyValue { value, .. } | ObjectEntry::Spread(value) => {
                expr_contains_propagate(value)
            }
            ObjectEntry::Shorthand(..) => false,
        }),
        Expr::TemplateStr(parts, _) => parts.iter().any(|part| match part {
            TemplateExprPart::Expr(expr) => expr_contains_propagate(expr),
            TemplateExprPart::Literal(_) => false,
        }),
        Expr::If {
            cond,
            then_body,
            elif_branches,
            else_body,
            ..
        } => {
            expr_contains_propagate(cond)
                || contains_propagate(then_body)
                || elif_branches
                    .iter()
                    .any(|(c, b)| expr_contains_propagate(c) || contains_propagate(b))
                || else_body.as_deref().is_some_and(contains_propagate)
        }
        Expr::Match { subject, arms, .. } => {
            expr_contains_propagate(subject)
                || arms.iter().any(|arm| match &arm.body {
                    MatchArmBody::Expr(expr) => expr_contains_propagate(expr),
                    MatchArmBody::Block(stmts) => contains_propagate(stmts),
                })
        }
        _ => false,
    }
}

/// Does this body contain `await` outside nested functions? Functions
/// using it emit as `async` even without the keyword.
pub(crate) fn contains_await(stmts: &[Stmt]) -> bool {
    // structurally identical to the propagate scan
    struct AwaitScan;
    impl AwaitScan {
        fn stmts(stmts: &[Stmt]) -> bool {
            stmts.iter().any(Self::stmt)
        }
        fn stmt(stmt: &Stmt) -> bool {
            match stmt {
                Stmt::Let { value, .. }
                | Stmt::Throw { value, .. }
                | Stmt::State { value, .. }
                | Stmt::ComputedDecl { value, .. } => Self::expr(value),
                Stmt::Assign { target, value, .. } => Self::expr(target) || Self::expr(value),
                Stmt::Return { value, .. } => value.as_ref().is_some_and(|v| Self::expr(v)),
                Stmt::Expression(expr) => Self::expr(expr),
                Stmt::If {
                    cond,
                    then_body,
                    elif_branches,
                    else_body,
                    ..
                } => {
                    Self::expr(cond)
                        || Self::stmts(then_body)
                        || elif_branches.iter().any(|(c, b)| Self::expr(c) || Self::stmts(b))
                        || else_body.as_deref().is_some_and(Self::stmts)
                }
                Stmt::Match { subject, arms, .. } => {
                    Self::expr(subject)
                        || arms.iter().any(|arm| match &arm.body {
                            MatchArmBody::Expr(expr) => Self::expr(expr),
                            MatchArmBody::Block(stmts) => Self::stmts(stmts),
                        })
                }
                Stmt::For { iterable, body, .. } => Self::expr(iterable) || Self::stmts(body),
                Stmt::While { cond, body, .. } => Self::expr(cond) || Self::stmts(body),
                Stmt::TryCatch {
                    body,
                    catch_body,
                    finally_body,
                    ..
                } => {
                    Self::stmts(body)
                        || Self::stmts(catch_body)
                        || finally_body.as_deref().is_some_and(Self::stmts)
                }
                _ => false,
            }
        }
        fn expr(expr: &Expr) -> bool {
            match expr {
                Expr::Await(..) => true,
                Expr::Lambda { .. } => false,
                Expr::Unary { operand, .. } | Expr::Propagate(operand, _) | Expr::Spread(operand, _) => {
                    Self::expr(operand)
                }
                Expr::Binary { left, right, .. } => Self::expr(left) || Self::expr(right),
                Expr::Range { start, end, .. } => Self::expr(start) || Self::expr(end),
                Expr::Call { callee, args, .. } => {
                    Self::expr(callee) || args.iter().any(|a| Self::expr(a))
                }
                Expr::Member { object, .. } => Self::expr(object),
                Expr::Index { object, index, .. } => Self::expr(object) || Self::expr(index),
                Expr::Slice {
                    object, start, end, ..
                } => {
                    Self::expr(object)
                        || start.as_deref().is_some_and(|s| Self::expr(s))
                        || end.as_deref().is_some_and(|s| Self::expr(s))
                }
                Expr::ArrayLit(elements, _) => elements.iter().any(|el| Self::expr(el)),
                Expr::ObjectLit(entries, _) => entries.iter().any(|entry| match entry {
                    ObjectEntry::KeyValue { value, .. } | ObjectEntry::Spread(value) => {
                        Self::expr(value)
                    }
                    ObjectEntry::Shorthand(..) => false,
                }),
                Expr::TemplateStr(parts, _) => parts.iter().any(|part| match part {
                    TemplateExprPart::Expr(expr) => Self::expr(expr),
                    TemplateExprPart::Literal(_) => false,
                }),
                Expr::If {
                    cond,
                    then_body,
                    elif_branches,
                    else_body,
                    ..
                } => {
                    Self::expr(cond)
                        || Self::stmts(then_body)
                        || elif_branches.iter().any(|(c, b)| Self::expr(c) || Self::stmts(b))
                        || else_body.as_deref().is_some_and(Self::stmts)
                }
                Expr::Match { subject, arms, .. } => {
                    Self::expr(subject)
                        || arms.iter().any(|arm| match &arm.body {
                            MatchArmBody::Expr(expr) => Self::expr(expr),
                            MatchArmBody::Block(stmts) => Self::stmts(stmts),
                        })
                }
                _ => false,
            }
        }
    }
    AwaitScan::stmts(stmts)
}
