//! Statement-level grammar, including the block-restricted server and
//! client declaration forms.

use super::ast::*;
use super::{BlockCtx, ParseError, Parser};
use crate::lexer::TokenKind;

/// Server-block forms introduced by contextual identifiers rather than
/// reserved words, so the same names stay usable as plain identifiers
/// everywhere else.
const SERVER_FORM_WORDS: &[&str] = &[
    "db",
    "model",
    "middleware",
    "websocket",
    "sse",
    "schedule",
    "background",
    "subscribe",
    "static",
    "env",
    "on_start",
    "on_shutdown",
    "auth",
    "cors",
    "rate_limit",
    "session",
    "tls",
    "compression",
    "cache",
    "upload",
    "max_body",
];

impl Parser {
    pub(crate) fn parse_statement(&mut self, ctx: BlockCtx) -> Result<Stmt, ParseError> {
        self.skip_separators()?;

        let mut decorators = Vec::new();
        while self.at(&TokenKind::At) {
            decorators.push(self.parse_decorator()?);
            self.skip_newlines()?;
        }

        let is_pub = self.eat(&TokenKind::Pub)?;

        if !decorators.is_empty()
            && !matches!(
                self.current.kind,
                TokenKind::Fn | TokenKind::Async | TokenKind::Route
            )
        {
            return Err(self.unexpected("a function or route after decorators"));
        }

        let loc = self.current.loc.clone();
        match self.current.kind.clone() {
            TokenKind::Fn => {
                self.advance()?;
                Ok(Stmt::Function(self.parse_function(is_pub, false, decorators)?))
            }
            TokenKind::Async => {
                self.advance()?;
                self.expect(&TokenKind::Fn)?;
                Ok(Stmt::Function(self.parse_function(is_pub, true, decorators)?))
            }
            TokenKind::Let => {
                self.advance()?;
                self.parse_let(false, is_pub, loc)
            }
            TokenKind::Var => {
                self.advance()?;
                self.parse_let(true, is_pub, loc)
            }
            TokenKind::Type => {
                self.advance()?;
                self.parse_type_decl_or_alias(is_pub, loc)
            }
            TokenKind::Interface => {
                self.advance()?;
                let (name, methods) = self.parse_signature_block()?;
                Ok(Stmt::Interface {
                    name,
                    methods,
                    is_pub,
                    loc,
                })
            }
            TokenKind::Trait => {
                self.advance()?;
                let (name, methods) = self.parse_signature_block()?;
                Ok(Stmt::TraitDecl {
                    name,
                    methods,
                    is_pub,
                    loc,
                })
            }
            TokenKind::Impl => {
                self.advance()?;
                self.parse_impl_block(loc)
            }
            TokenKind::Return => {
                self.advance()?;
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                Ok(Stmt::Return { value, loc })
            }
            TokenKind::Break => {
                self.advance()?;
                Ok(Stmt::Break { loc })
            }
            TokenKind::Continue => {
                self.advance()?;
                Ok(Stmt::Continue { loc })
            }
            TokenKind::Throw => {
                self.advance()?;
                let value = self.parse_expression()?;
                Ok(Stmt::Throw { value, loc })
            }
            TokenKind::If => {
                self.advance()?;
                let (cond, then_body, elif_branches, else_body) = self.parse_if_parts()?;
                Ok(Stmt::If {
                    cond,
                    then_body,
                    elif_branches,
                    else_body,
                    loc,
                })
            }
            TokenKind::Match => {
                self.advance()?;
                let subject = self.parse_expression()?;
                let arms = self.parse_match_arms()?;
                Ok(Stmt::Match { subject, arms, loc })
            }
            TokenKind::For => {
                self.advance()?;
                let mut bindings = vec![self.expect_name("loop variable")?.0];
                while self.eat(&TokenKind::Comma)? {
                    bindings.push(self.expect_name("loop variable")?.0);
                }
                self.expect(&TokenKind::In)?;
                let iterable = self.parse_expression()?;
                let body = self.parse_block_body(BlockCtx::Function)?;
                Ok(Stmt::For {
                    bindings,
                    iterable,
                    body,
                    loc,
                })
            }
            TokenKind::While => {
                self.advance()?;
                let cond = self.parse_expression()?;
                let body = self.parse_block_body(BlockCtx::Function)?;
                Ok(Stmt::While { cond, body, loc })
            }
            TokenKind::Try => {
                self.advance()?;
                let body = self.parse_block_body(BlockCtx::Function)?;
                self.skip_newlines()?;
                self.expect(&TokenKind::Catch)?;
                let catch_name = match self.current.kind.ident_name() {
                    Some(name) => {
                        self.advance()?;
                        Some(name)
                    }
                    None => None,
                };
                let catch_body = self.parse_block_body(BlockCtx::Function)?;
                let finally_body = {
                    let cp = self.checkpoint();
                    self.skip_newlines()?;
                    if self.eat(&TokenKind::Finally)? {
                        Some(self.parse_block_body(BlockCtx::Function)?)
                    } else {
                        self.rewind(cp)?;
                        None
                    }
                };
                Ok(Stmt::TryCatch {
                    body,
                    catch_name,
                    catch_body,
                    finally_body,
                    loc,
                })
            }

            // Client-block declarations
            TokenKind::State => {
                self.require_client(ctx, "state")?;
                self.advance()?;
                let name = self.expect_name("state name")?.0;
                self.expect(&TokenKind::Assign)?;
                let value = self.parse_expression()?;
                Ok(Stmt::State { name, value, loc })
            }
            TokenKind::Computed => {
                self.require_client(ctx, "computed")?;
                self.advance()?;
                let name = self.expect_name("computed name")?.0;
                self.expect(&TokenKind::Assign)?;
                let value = self.parse_expression()?;
                Ok(Stmt::ComputedDecl { name, value, loc })
            }
            TokenKind::Effect => {
                self.require_client(ctx, "effect")?;
                self.advance()?;
                let body = self.parse_block_body(BlockCtx::Function)?;
                Ok(Stmt::EffectDecl { body, loc })
            }
            TokenKind::Component => {
                self.require_client(ctx, "component")?;
                self.advance()?;
                let doc = self.take_doc();
                let name = self.expect_name("component name")?.0;
                let params = if self.at(&TokenKind::LParen) {
                    self.parse_params()?
                } else {
                    Vec::new()
                };
                let body = self.parse_block_body(BlockCtx::Function)?;
                Ok(Stmt::Component(ComponentDecl {
                    name,
                    params,
                    body,
                    doc,
                    loc,
                }))
            }
            TokenKind::Store => {
                self.require_client(ctx, "store")?;
                self.advance()?;
                let name = self.expect_name("store name")?.0;
                let body = self.parse_block_body(BlockCtx::Client)?;
                Ok(Stmt::StoreDecl { name, body, loc })
            }

            // Server-block declarations
            TokenKind::Route => {
                self.require_server(ctx, "route")?;
                self.advance()?;
                Ok(Stmt::Route(self.parse_route(decorators, loc)?))
            }
            TokenKind::Routes => {
                self.require_server(ctx, "routes")?;
                self.advance()?;
                let prefix = self.expect_string("route group prefix")?;
                let routes = self.parse_route_group_body()?;
                Ok(Stmt::RouteGroup {
                    prefix,
                    routes,
                    loc,
                })
            }
            TokenKind::Ident(word)
                if ctx == BlockCtx::Server && SERVER_FORM_WORDS.contains(&word.as_str()) =>
            {
                if let Some(stmt) = self.try_parse_server_form(&word, loc)? {
                    Ok(stmt)
                } else {
                    self.parse_expr_or_assignment()
                }
            }
            _ => self.parse_expr_or_assignment(),
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        )
    }

    fn require_client(&self, ctx: BlockCtx, form: &str) -> Result<(), ParseError> {
        if ctx == BlockCtx::Client {
            Ok(())
        } else {
            Err(ParseError::new(
                format!(
                    "'{}' declarations are not allowed in {}",
                    form,
                    ctx.describe()
                ),
                self.current.loc.clone(),
            )
            .with_hint(format!("move this into a client block: client {{ {} ... }}", form)))
        }
    }

    fn require_server(&self, ctx: BlockCtx, form: &str) -> Result<(), ParseError> {
        if ctx == BlockCtx::Server {
            Ok(())
        } else {
            Err(ParseError::new(
                format!(
                    "'{}' declarations are not allowed in {}",
                    form,
                    ctx.describe()
                ),
                self.current.loc.clone(),
            )
            .with_hint(format!("move this into a server block: server {{ {} ... }}", form)))
        }
    }

    fn parse_expr_or_assignment(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_expression()?;
        let op = match self.current.kind {
            TokenKind::Assign => Some(AssignOp::Assign),
            TokenKind::PlusAssign => Some(AssignOp::Add),
            TokenKind::MinusAssign => Some(AssignOp::Sub),
            TokenKind::StarAssign => Some(AssignOp::Mul),
            TokenKind::SlashAssign => Some(AssignOp::Div),
            _ => None,
        };
        match op {
            Some(op) => {
                if !matches!(
                    expr,
                    Expr::Ident(..) | Expr::Member { .. } | Expr::Index { .. }
                ) {
                    return Err(ParseError::new(
                        "invalid assignment target",
                        expr.loc().clone(),
                    ));
                }
                let loc = self.current.loc.clone();
                self.advance()?;
                let value = self.parse_expression()?;
                Ok(Stmt::Assign {
                    target: expr,
                    op,
                    value,
                    loc,
                })
            }
            None => Ok(Stmt::Expression(expr)),
        }
    }

    fn parse_decorator(&mut self) -> Result<Decorator, ParseError> {
        let loc = self.expect(&TokenKind::At)?;
        let name = self.expect_name("decorator name")?.0;
        let mut args = Vec::new();
        if self.at(&TokenKind::LParen) {
            self.advance()?;
            while !self.at(&TokenKind::RParen) {
                args.push(self.parse_expression()?);
                if !self.eat(&TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(&TokenKind::RParen)?;
        }
        Ok(Decorator { name, args, loc })
    }

    fn parse_let(
        &mut self,
        mutable: bool,
        is_pub: bool,
        loc: crate::error::Loc,
    ) -> Result<Stmt, ParseError> {
        let doc = self.take_doc();
        let pattern = self.parse_bind_pattern()?;
        self.expect(&TokenKind::Assign)?;
        let value = self.parse_expression()?;
        Ok(Stmt::Let {
            pattern,
            value,
            mutable,
            is_pub,
            doc,
            loc,
        })
    }

    pub(crate) fn parse_function(
        &mut self,
        is_pub: bool,
        is_async: bool,
        decorators: Vec<Decorator>,
    ) -> Result<FunctionDecl, ParseError> {
        let doc = self.take_doc();
        let (name, loc) = self.expect_name("function name")?;
        let params = self.parse_params()?;
        let return_type = if self.eat(&TokenKind::Arrow)? {
            Some(self.parse_type_ref()?)
        } else {
            None
        };
        let body = self.parse_block_body(BlockCtx::Function)?;
        Ok(FunctionDecl {
            name,
            params,
            return_type,
            body,
            is_pub,
            is_async,
            decorators,
            doc,
            loc,
        })
    }

    pub(crate) fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.at(&TokenKind::RParen) {
            let loc = self.current.loc.clone();
            let pattern = self.parse_bind_pattern()?;
            let type_ = if self.eat(&TokenKind::Colon)? {
                Some(self.parse_type_ref()?)
            } else {
                None
            };
            let default = if self.eat(&TokenKind::Assign)? {
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(Param {
                pattern,
                type_,
                default,
                loc,
            });
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(params)
    }

    pub(crate) fn parse_type_ref(&mut self) -> Result<TypeRef, ParseError> {
        let (name, loc) = self.expect_name("type name")?;
        let mut args = Vec::new();
        if self.at(&TokenKind::Lt) {
            self.advance()?;
            loop {
                args.push(self.parse_type_ref()?);
                if !self.eat(&TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(&TokenKind::Gt)?;
        }
        Ok(TypeRef { name, args, loc })
    }

    fn parse_type_decl_or_alias(
        &mut self,
        is_pub: bool,
        loc: crate::error::Loc,
    ) -> Result<Stmt, ParseError> {
        let doc = self.take_doc();
        let name = self.expect_name("type name")?.0;

        if self.eat(&TokenKind::Assign)? {
            let target = self.parse_type_ref()?;
            return Ok(Stmt::TypeAlias {
                name,
                target,
                is_pub,
                loc,
            });
        }

        self.expect(&TokenKind::LBrace)?;
        let mut variants = Vec::new();
        let mut record_fields: Vec<(String, Option<TypeRef>)> = Vec::new();
        let mut is_record = false;

        loop {
            self.skip_newlines()?;
            if self.at(&TokenKind::RBrace) {
                break;
            }
            let (entry_name, entry_loc) = self.expect_name("variant or field name")?;
            if self.at(&TokenKind::Colon) {
                // `name: Type` - record form, a single implicit variant
                is_record = true;
                self.advance()?;
                let field_type = self.parse_type_ref()?;
                record_fields.push((entry_name, Some(field_type)));
            } else if self.at(&TokenKind::LParen) {
                self.advance()?;
                let mut fields = Vec::new();
                while !self.at(&TokenKind::RParen) {
                    let field_name = self.expect_name("field name")?.0;
                    let field_type = if self.eat(&TokenKind::Colon)? {
                        Some(self.parse_type_ref()?)
                    } else {
                        None
                    };
                    fields.push((field_name, field_type));
                    if !self.eat(&TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(&TokenKind::RParen)?;
                variants.push(Variant {
                    name: entry_name,
                    fields,
                    loc: entry_loc,
                });
            } else {
                variants.push(Variant {
                    name: entry_name,
                    fields: Vec::new(),
                    loc: entry_loc,
                });
            }
            self.skip_newlines()?;
            if !self.eat(&TokenKind::Comma)? && !self.at(&TokenKind::RBrace) {
                // allow newline-separated entries
                continue;
            }
        }
        self.expect(&TokenKind::RBrace)?;

        if is_record {
            variants = vec![Variant {
                name: name.clone(),
                fields: record_fields,
                loc: loc.clone(),
            }];
        }

        Ok(Stmt::TypeDecl(TypeDecl {
            name,
            variants,
            is_pub,
            doc,
            loc,
        }))
    }

    /// `interface Name { fn sigs }` / `trait Name { fn sigs }`.
    /// Name registration only; default method bodies are consumed and
    /// not retained.
    fn parse_signature_block(&mut self) -> Result<(String, Vec<FunctionSig>), ParseError> {
        let name = self.expect_name("interface name")?.0;
        self.expect(&TokenKind::LBrace)?;
        let mut methods = Vec::new();
        loop {
            self.skip_separators()?;
            if self.at(&TokenKind::RBrace) {
                break;
            }
            let sig_loc = self.expect(&TokenKind::Fn)?;
            let (method_name, _) = self.expect_name("method name")?;
            let params = self.parse_params()?;
            let return_type = if self.eat(&TokenKind::Arrow)? {
                Some(self.parse_type_ref()?)
            } else {
                None
            };
            if self.at(&TokenKind::LBrace) {
                self.parse_block_body(BlockCtx::Function)?;
            }
            methods.push(FunctionSig {
                name: method_name,
                params,
                return_type,
                loc: sig_loc,
            });
        }
        self.expect(&TokenKind::RBrace)?;
        Ok((name, methods))
    }

    fn parse_impl_block(&mut self, loc: crate::error::Loc) -> Result<Stmt, ParseError> {
        let first = self.expect_name("type or trait name")?.0;
        let (trait_name, target) = if self.eat(&TokenKind::For)? {
            let target = self.expect_name("type name")?.0;
            (Some(first), target)
        } else {
            (None, first)
        };
        self.expect(&TokenKind::LBrace)?;
        let mut functions = Vec::new();
        loop {
            self.skip_separators()?;
            if self.at(&TokenKind::RBrace) {
                break;
            }
            self.expect(&TokenKind::Fn)?;
            functions.push(self.parse_function(false, false, Vec::new())?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Stmt::ImplBlock {
            trait_name,
            target,
            functions,
            loc,
        })
    }

    pub(crate) fn parse_if_parts(
        &mut self,
    ) -> Result<
        (
            Expr,
            Vec<Stmt>,
            Vec<(Expr, Vec<Stmt>)>,
            Option<Vec<Stmt>>,
        ),
        ParseError,
    > {
        let cond = self.parse_expression()?;
        let then_body = self.parse_block_body(BlockCtx::Function)?;
        let mut elif_branches = Vec::new();
        let mut else_body = None;
        loop {
            let cp = self.checkpoint();
            self.skip_newlines()?;
            if self.eat(&TokenKind::Elif)? {
                let elif_cond = self.parse_expression()?;
                let elif_body = self.parse_block_body(BlockCtx::Function)?;
                elif_branches.push((elif_cond, elif_body));
            } else if self.eat(&TokenKind::Else)? {
                else_body = Some(self.parse_block_body(BlockCtx::Function)?);
                break;
            } else {
                self.rewind(cp)?;
                break;
            }
        }
        Ok((cond, then_body, elif_branches, else_body))
    }

    // ------------------------------------------------------------------
    // Server forms
    // ------------------------------------------------------------------

    fn parse_route(
        &mut self,
        decorators: Vec<Decorator>,
        loc: crate::error::Loc,
    ) -> Result<RouteDecl, ParseError> {
        let method = match self.current.kind {
            TokenKind::HttpMethod(method) => {
                self.advance()?;
                method
            }
            _ => {
                return Err(self
                    .unexpected("an HTTP method (GET, POST, PUT, DELETE, PATCH, HEAD, OPTIONS)"))
            }
        };
        let path = self.expect_string("route path")?;
        let handler = if self.eat(&TokenKind::FatArrow)? {
            if self.at(&TokenKind::LParen) {
                let params = self.parse_params()?;
                let body = self.parse_block_body(BlockCtx::Function)?;
                RouteHandler::Inline { params, body }
            } else {
                RouteHandler::Named(self.expect_name("handler function")?.0)
            }
        } else if self.at(&TokenKind::LBrace) {
            let body = self.parse_block_body(BlockCtx::Function)?;
            RouteHandler::Inline {
                params: Vec::new(),
                body,
            }
        } else {
            return Err(self.unexpected("'=>' or a handler block"));
        };
        let middleware = decorators.into_iter().map(|d| d.name).collect();
        Ok(RouteDecl {
            method,
            path,
            handler,
            middleware,
            loc,
        })
    }

    fn parse_route_group_body(&mut self) -> Result<Vec<RouteDecl>, ParseError> {
        self.skip_newlines()?;
        self.expect(&TokenKind::LBrace)?;
        let mut routes = Vec::new();
        loop {
            self.skip_separators()?;
            if self.at(&TokenKind::RBrace) {
                break;
            }
            let mut decorators = Vec::new();
            while self.at(&TokenKind::At) {
                decorators.push(self.parse_decorator()?);
                self.skip_newlines()?;
            }
            let loc = self.expect(&TokenKind::Route)?;
            routes.push(self.parse_route(decorators, loc)?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(routes)
    }

    fn try_parse_server_form(
        &mut self,
        word: &str,
        loc: crate::error::Loc,
    ) -> Result<Option<Stmt>, ParseError> {
        let next = self.peek_kind()?;
        let stmt = match (word, &next) {
            ("db", TokenKind::LBrace) => {
                self.advance()?;
                let config = self.parse_expression()?;
                Stmt::Db { config, loc }
            }
            ("model", TokenKind::Ident(_)) => {
                self.advance()?;
                let doc = self.take_doc();
                let name = self.expect_name("model name")?.0;
                let fields = self.parse_model_fields()?;
                Stmt::Model {
                    name,
                    fields,
                    doc,
                    loc,
                }
            }
            ("middleware", TokenKind::Ident(_)) => {
                self.advance()?;
                let name = self.expect_name("middleware name")?.0;
                let params = if self.at(&TokenKind::LParen) {
                    self.parse_params()?
                } else {
                    Vec::new()
                };
                let body = self.parse_block_body(BlockCtx::Function)?;
                Stmt::Middleware {
                    name,
                    params,
                    body,
                    loc,
                }
            }
            ("websocket", TokenKind::Str(_)) => {
                self.advance()?;
                let path = self.expect_string("websocket path")?;
                let handlers = self.parse_function_block()?;
                Stmt::Websocket {
                    path,
                    handlers,
                    loc,
                }
            }
            ("sse", TokenKind::Str(_)) => {
                self.advance()?;
                let path = self.expect_string("sse path")?;
                let params = if self.at(&TokenKind::LParen) {
                    self.parse_params()?
                } else {
                    Vec::new()
                };
                let body = self.parse_block_body(BlockCtx::Function)?;
                Stmt::Sse {
                    path,
                    params,
                    body,
                    loc,
                }
            }
            ("schedule", TokenKind::Str(_)) => {
                self.advance()?;
                let spec = self.expect_string("schedule spec")?;
                let body = self.parse_block_body(BlockCtx::Function)?;
                Stmt::Schedule { spec, body, loc }
            }
            ("background", TokenKind::Ident(_)) => {
                self.advance()?;
                let name = self.expect_name("job name")?.0;
                let params = if self.at(&TokenKind::LParen) {
                    self.parse_params()?
                } else {
                    Vec::new()
                };
                let body = self.parse_block_body(BlockCtx::Function)?;
                Stmt::BackgroundJob {
                    name,
                    params,
                    body,
                    loc,
                }
            }
            ("subscribe", TokenKind::Str(_)) => {
                self.advance()?;
                let channel = self.expect_string("channel name")?;
                let params = if self.at(&TokenKind::LParen) {
                    self.parse_params()?
                } else {
                    Vec::new()
                };
                let body = self.parse_block_body(BlockCtx::Function)?;
                Stmt::Subscribe {
                    channel,
                    params,
                    body,
                    loc,
                }
            }
            ("static", TokenKind::Str(_)) => {
                self.advance()?;
                let route = self.expect_string("static route")?;
                let dir = self.expect_string("static directory")?;
                Stmt::StaticDir { route, dir, loc }
            }
            ("env", TokenKind::LBrace) => {
                self.advance()?;
                self.expect(&TokenKind::LBrace)?;
                let mut names = Vec::new();
                loop {
                    self.skip_newlines()?;
                    if self.at(&TokenKind::RBrace) {
                        break;
                    }
                    let name = self.expect_name("environment variable")?.0;
                    let default = if self.eat(&TokenKind::Assign)? {
                        Some(self.parse_expression()?)
                    } else {
                        None
                    };
                    names.push((name, default));
                    self.skip_newlines()?;
                    if !self.eat(&TokenKind::Comma)? {
                        break;
                    }
                }
                self.skip_newlines()?;
                self.expect(&TokenKind::RBrace)?;
                Stmt::EnvDecl { names, loc }
            }
            ("on_start", TokenKind::LBrace) | ("on_shutdown", TokenKind::LBrace) => {
                let hook = if word == "on_start" {
                    LifecycleEvent::Start
                } else {
                    LifecycleEvent::Shutdown
                };
                self.advance()?;
                let body = self.parse_block_body(BlockCtx::Function)?;
                Stmt::LifecycleHook { hook, body, loc }
            }
            _ => {
                if let Some(kind) = SingletonKind::from_word(word) {
                    match next {
                        TokenKind::LBrace | TokenKind::Number(_) | TokenKind::Str(_) => {
                            self.advance()?;
                            let config = self.parse_expression()?;
                            Stmt::ConfigSingleton { kind, config, loc }
                        }
                        _ => return Ok(None),
                    }
                } else {
                    return Ok(None);
                }
            }
        };
        Ok(Some(stmt))
    }

    fn parse_model_fields(&mut self) -> Result<Vec<ModelField>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut fields = Vec::new();
        loop {
            self.skip_separators()?;
            if self.at(&TokenKind::RBrace) {
                break;
            }
            let (name, loc) = self.expect_name("field name")?;
            self.expect(&TokenKind::Colon)?;
            let type_ = self.parse_type_ref()?;
            let mut attributes = Vec::new();
            while self.at(&TokenKind::At) {
                let attr = self.parse_decorator()?;
                let attr_loc = attr.loc.clone();
                attributes.push(if attr.args.is_empty() {
                    Expr::Ident(attr.name, attr_loc)
                } else {
                    Expr::Call {
                        callee: Box::new(Expr::Ident(attr.name, attr_loc.clone())),
                        args: attr.args,
                        loc: attr_loc,
                    }
                });
            }
            fields.push(ModelField {
                name,
                type_,
                attributes,
                loc,
            });
            if !self.eat(&TokenKind::Comma)? {
                self.skip_newlines()?;
                if self.at(&TokenKind::RBrace) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(fields)
    }

    /// `{ fn handler() { ... } ... }` - used by websocket declarations.
    fn parse_function_block(&mut self) -> Result<Vec<FunctionDecl>, ParseError> {
        self.skip_newlines()?;
        self.expect(&TokenKind::LBrace)?;
        let mut functions = Vec::new();
        loop {
            self.skip_separators()?;
            if self.at(&TokenKind::RBrace) {
                break;
            }
            let is_async = self.eat(&TokenKind::Async)?;
            self.expect(&TokenKind::Fn)?;
            functions.push(self.parse_function(false, is_async, Vec::new())?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(functions)
    }
}
