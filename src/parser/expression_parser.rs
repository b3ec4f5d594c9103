//! Expression grammar: precedence climbing, literals, lambdas, and the
//! postfix chain. Precedence low to high: pipe, null-coalesce, or, and,
//! not, comparison, membership, range, additive, multiplicative, power,
//! unary, postfix.

use super::ast::*;
use super::{BlockCtx, ParseError, Parser};
use crate::lexer::{Lexer, TemplatePart, TokenKind};

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_pipe()
    }

    fn parse_pipe(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_coalesce()?;
        while self.at(&TokenKind::PipeOp) {
            let loc = self.current.loc.clone();
            self.advance()?;
            let right = self.parse_coalesce()?;
            left = Expr::Binary {
                op: BinaryOp::Pipe,
                left: Box::new(left),
                right: Box::new(right),
                loc,
            };
        }
        Ok(left)
    }

    fn parse_coalesce(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_or()?;
        if self.at(&TokenKind::QuestionQuestion) {
            let loc = self.current.loc.clone();
            self.advance()?;
            // right-associative
            let right = self.parse_coalesce()?;
            return Ok(Expr::Binary {
                op: BinaryOp::NullCoalesce,
                left: Box::new(left),
                right: Box::new(right),
                loc,
            });
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while matches!(self.current.kind, TokenKind::PipePipe | TokenKind::Or) {
            let loc = self.current.loc.clone();
            self.advance()?;
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
                loc,
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while matches!(self.current.kind, TokenKind::AmpAmp | TokenKind::And) {
            let loc = self.current.loc.clone();
            self.advance()?;
            let right = self.parse_not()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
                loc,
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.current.kind, TokenKind::Not | TokenKind::Bang) {
            let loc = self.current.loc.clone();
            self.advance()?;
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
                loc,
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_membership()?;
        loop {
            let op = match self.current.kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            let loc = self.current.loc.clone();
            self.advance()?;
            let right = self.parse_membership()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                loc,
            };
        }
        Ok(left)
    }

    fn parse_membership(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_range_expr()?;
        loop {
            let (op, loc) = match self.current.kind {
                TokenKind::In => {
                    let loc = self.current.loc.clone();
                    self.advance()?;
                    (BinaryOp::In, loc)
                }
                TokenKind::Not => {
                    let loc = self.current.loc.clone();
                    self.advance()?;
                    self.expect(&TokenKind::In)?;
                    (BinaryOp::NotIn, loc)
                }
                _ => break,
            };
            let right = self.parse_range_expr()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                loc,
            };
        }
        Ok(left)
    }

    fn parse_range_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.parse_additive()?;
        let inclusive = match self.current.kind {
            TokenKind::DotDot => false,
            TokenKind::DotDotEq => true,
            _ => return Ok(start),
        };
        let loc = self.current.loc.clone();
        self.advance()?;
        let end = self.parse_additive()?;
        Ok(Expr::Range {
            start: Box::new(start),
            end: Box::new(end),
            inclusive,
            loc,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let loc = self.current.loc.clone();
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                loc,
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            let loc = self.current.loc.clone();
            self.advance()?;
            let right = self.parse_power()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                loc,
            };
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_unary()?;
        if self.at(&TokenKind::StarStar) {
            let loc = self.current.loc.clone();
            self.advance()?;
            // right-associative
            let right = self.parse_power()?;
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                left: Box::new(left),
                right: Box::new(right),
                loc,
            });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.current.kind {
            TokenKind::Minus => {
                let loc = self.current.loc.clone();
                self.advance()?;
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                    loc,
                })
            }
            TokenKind::Await => {
                let loc = self.current.loc.clone();
                self.advance()?;
                let operand = self.parse_unary()?;
                Ok(Expr::Await(Box::new(operand), loc))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    let loc = self.current.loc.clone();
                    self.advance()?;
                    let property = self.expect_name("property name")?.0;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional: false,
                        loc,
                    };
                }
                TokenKind::QuestionDot => {
                    let loc = self.current.loc.clone();
                    self.advance()?;
                    let property = self.expect_name("property name")?.0;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional: true,
                        loc,
                    };
                }
                TokenKind::LParen => {
                    let loc = self.current.loc.clone();
                    self.advance()?;
                    let args = self.parse_call_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        loc,
                    };
                }
                TokenKind::LBracket => {
                    let loc = self.current.loc.clone();
                    self.advance()?;
                    expr = self.parse_index_or_slice(expr, loc)?;
                }
                TokenKind::Question => {
                    let loc = self.current.loc.clone();
                    self.advance()?;
                    expr = Expr::Propagate(Box::new(expr), loc);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        while !self.at(&TokenKind::RParen) {
            if self.at(&TokenKind::Ellipsis) {
                let loc = self.current.loc.clone();
                self.advance()?;
                let value = self.parse_expression()?;
                args.push(Expr::Spread(Box::new(value), loc));
            } else {
                args.push(self.parse_expression()?);
            }
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_index_or_slice(
        &mut self,
        object: Expr,
        loc: crate::error::Loc,
    ) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::Colon)? {
            // `a[:end]` or `a[:]`
            let end = if self.at(&TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            self.expect(&TokenKind::RBracket)?;
            return Ok(Expr::Slice {
                object: Box::new(object),
                start: None,
                end,
                loc,
            });
        }
        let first = self.parse_expression()?;
        if self.eat(&TokenKind::Colon)? {
            let end = if self.at(&TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            self.expect(&TokenKind::RBracket)?;
            return Ok(Expr::Slice {
                object: Box::new(object),
                start: Some(Box::new(first)),
                end,
                loc,
            });
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::Index {
            object: Box::new(object),
            index: Box::new(first),
            loc,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current.loc.clone();
        match self.current.kind.clone() {
            TokenKind::Number(value) => {
                self.advance()?;
                Ok(Expr::Number(value, loc))
            }
            TokenKind::Str(value) => {
                self.advance()?;
                Ok(Expr::Str(value, loc))
            }
            TokenKind::TemplateStr(parts) => {
                self.advance()?;
                let parts = self.parse_template_parts(parts, &loc)?;
                Ok(Expr::TemplateStr(parts, loc))
            }
            TokenKind::True => {
                self.advance()?;
                Ok(Expr::Bool(true, loc))
            }
            TokenKind::False => {
                self.advance()?;
                Ok(Expr::Bool(false, loc))
            }
            TokenKind::Ident(name) => {
                self.advance()?;
                if self.at(&TokenKind::FatArrow) {
                    return self.parse_arrow_body(
                        vec![Param {
                            pattern: BindPattern::Name(name, loc.clone()),
                            type_: None,
                            default: None,
                            loc: loc.clone(),
                        }],
                        false,
                        loc,
                    );
                }
                Ok(Expr::Ident(name, loc))
            }
            // Domain keywords double as plain names in expression position:
            // `server.add(2, 3)` is the RPC bridge surface
            TokenKind::Server => {
                self.advance()?;
                Ok(Expr::Ident("server".to_string(), loc))
            }
            TokenKind::HttpMethod(method) => {
                self.advance()?;
                Ok(Expr::Ident(method.as_str().to_string(), loc))
            }
            TokenKind::LParen => {
                let cp = self.checkpoint();
                match self.parse_paren_lambda(false) {
                    Ok(lambda) => Ok(lambda),
                    Err(_) => {
                        self.rewind(cp)?;
                        self.advance()?; // (
                        let expr = self.parse_expression()?;
                        self.expect(&TokenKind::RParen)?;
                        Ok(expr)
                    }
                }
            }
            TokenKind::LBracket => {
                self.advance()?;
                let mut elements = Vec::new();
                loop {
                    if self.at(&TokenKind::RBracket) {
                        break;
                    }
                    if self.at(&TokenKind::Ellipsis) {
                        let spread_loc = self.current.loc.clone();
                        self.advance()?;
                        let value = self.parse_expression()?;
                        elements.push(Expr::Spread(Box::new(value), spread_loc));
                    } else {
                        elements.push(self.parse_expression()?);
                    }
                    if !self.eat(&TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(&TokenKind::RBracket)?;
                Ok(Expr::ArrayLit(elements, loc))
            }
            TokenKind::LBrace => self.parse_object_literal(loc),
            TokenKind::Lt => {
                let element = self.parse_jsx_element(false)?;
                Ok(element)
            }
            TokenKind::If => {
                self.advance()?;
                let (cond, then_body, elif_branches, else_body) = self.parse_if_parts()?;
                Ok(Expr::If {
                    cond: Box::new(cond),
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
                Ok(Expr::Match {
                    subject: Box::new(subject),
                    arms,
                    loc,
                })
            }
            TokenKind::Fn => {
                self.advance()?;
                self.parse_fn_expression(false, loc)
            }
            TokenKind::Async => {
                self.advance()?;
                if self.eat(&TokenKind::Fn)? {
                    self.parse_fn_expression(true, loc)
                } else if self.at(&TokenKind::LParen) {
                    self.parse_paren_lambda(true)
                } else {
                    let (name, name_loc) = self.expect_name("parameter")?;
                    self.parse_arrow_body(
                        vec![Param {
                            pattern: BindPattern::Name(name, name_loc.clone()),
                            type_: None,
                            default: None,
                            loc: name_loc,
                        }],
                        true,
                        loc,
                    )
                }
            }
            other => Err(ParseError::new(
                format!("expected an expression, found {}", other),
                loc,
            )),
        }
    }

    /// `(params) => expr-or-block`; fails (for caller rewind) when the
    /// parenthesized form is not actually a lambda.
    fn parse_paren_lambda(&mut self, is_async: bool) -> Result<Expr, ParseError> {
        let loc = self.current.loc.clone();
        let params = self.parse_params()?;
        if !self.at(&TokenKind::FatArrow) {
            return Err(self.unexpected("'=>'"));
        }
        self.parse_arrow_body(params, is_async, loc)
    }

    fn parse_arrow_body(
        &mut self,
        params: Vec<Param>,
        is_async: bool,
        loc: crate::error::Loc,
    ) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::FatArrow)?;
        let body = if self.at(&TokenKind::LBrace) {
            LambdaBody::Block(self.parse_block_body(BlockCtx::Function)?)
        } else {
            LambdaBody::Expr(Box::new(self.parse_expression()?))
        };
        Ok(Expr::Lambda {
            params,
            body,
            is_async,
            loc,
        })
    }

    /// Anonymous `fn (params) { body }`.
    fn parse_fn_expression(
        &mut self,
        is_async: bool,
        loc: crate::error::Loc,
    ) -> Result<Expr, ParseError> {
        let params = self.parse_params()?;
        if self.eat(&TokenKind::Arrow)? {
            // return annotation carried for symmetry with declarations
            self.parse_type_ref()?;
        }
        let body = self.parse_block_body(BlockCtx::Function)?;
        Ok(Expr::Lambda {
            params,
            body: LambdaBody::Block(body),
            is_async,
            loc,
        })
    }

    fn parse_object_literal(&mut self, loc: crate::error::Loc) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut entries = Vec::new();
        loop {
            self.skip_newlines()?;
            if self.at(&TokenKind::RBrace) {
                break;
            }
            if self.at(&TokenKind::Ellipsis) {
                self.advance()?;
                entries.push(ObjectEntry::Spread(self.parse_expression()?));
            } else {
                let (key, key_loc) = match self.current.kind.clone() {
                    TokenKind::Str(s) => {
                        let key_loc = self.current.loc.clone();
                        self.advance()?;
                        (s, key_loc)
                    }
                    _ => self.expect_name("object key")?,
                };
                if self.eat(&TokenKind::Colon)? {
                    let value = self.parse_expression()?;
                    entries.push(ObjectEntry::KeyValue { key, value });
                } else {
                    entries.push(ObjectEntry::Shorthand(key, key_loc));
                }
            }
            self.skip_newlines()?;
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.skip_newlines()?;
        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::ObjectLit(entries, loc))
    }

    pub(crate) fn parse_match_arms(&mut self) -> Result<Vec<MatchArm>, ParseError> {
        self.skip_newlines()?;
        self.expect(&TokenKind::LBrace)?;
        let mut arms = Vec::new();
        loop {
            self.skip_separators()?;
            if self.at(&TokenKind::RBrace) {
                break;
            }
            let loc = self.current.loc.clone();
            let pattern = self.parse_match_pattern()?;
            let guard = if self.eat(&TokenKind::If)? {
                Some(self.parse_expression()?)
            } else {
                None
            };
            self.expect(&TokenKind::FatArrow)?;
            let body = if self.at(&TokenKind::LBrace) {
                MatchArmBody::Block(self.parse_block_body(BlockCtx::Function)?)
            } else {
                MatchArmBody::Expr(self.parse_expression()?)
            };
            arms.push(MatchArm {
                pattern,
                guard,
                body,
                loc,
            });
            self.eat(&TokenKind::Comma)?;
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(arms)
    }

    fn parse_template_parts(
        &mut self,
        parts: Vec<TemplatePart>,
        loc: &crate::error::Loc,
    ) -> Result<Vec<TemplateExprPart>, ParseError> {
        let mut out = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                TemplatePart::Literal(text) => out.push(TemplateExprPart::Literal(text)),
                TemplatePart::Expr {
                    source,
                    line,
                    column,
                } => {
                    let lexer = Lexer::with_position(&source, loc.file.clone(), line, column);
                    let mut parser = Parser::new(lexer)?;
                    let expr = parser.parse_expression()?;
                    parser.skip_newlines()?;
                    if !parser.at(&TokenKind::Eof) {
                        return Err(parser.unexpected("end of interpolation"));
                    }
                    out.push(TemplateExprPart::Expr(expr));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::super::ast::*;
    use super::super::Parser;

    fn parse_expr(source: &str) -> Expr {
        let program = Parser::parse_source(source, "t.tova").unwrap();
        match program.body.into_iter().next().unwrap() {
            Item::Statement(Stmt::Expression(expr)) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_add_mul() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        match parse_expr("1 + 2 * 3") {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => match *right {
                Expr::Binary {
                    op: BinaryOp::Mul, ..
                } => {}
                other => panic!("expected mul on the right, got {:?}", other),
            },
            other => panic!("expected add at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_power_right_associative() {
        // 2 ** 3 ** 2 parses as 2 ** (3 ** 2)
        match parse_expr("2 ** 3 ** 2") {
            Expr::Binary {
                op: BinaryOp::Pow,
                left,
                right,
                ..
            } => {
                assert!(matches!(*left, Expr::Number(n, _) if n == 2.0));
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        op: BinaryOp::Pow,
                        ..
                    }
                ));
            }
            other => panic!("expected pow at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_pipe_operator() {
        match parse_expr("data |> clean |> render") {
            Expr::Binary {
                op: BinaryOp::Pipe,
                left,
                ..
            } => {
                // left-associative: (data |> clean) |> render
                assert!(matches!(
                    *left,
                    Expr::Binary {
                        op: BinaryOp::Pipe,
                        ..
                    }
                ));
            }
            other => panic!("expected pipe at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_membership_not_in() {
        match parse_expr("x not in xs") {
            Expr::Binary {
                op: BinaryOp::NotIn,
                ..
            } => {}
            other => panic!("expected not-in, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_chain_and_propagate() {
        match parse_expr("user?.profile") {
            Expr::Member { optional: true, .. } => {}
            other => panic!("expected optional member, got {:?}", other),
        }
        match parse_expr("fetch_user()?") {
            Expr::Propagate(..) => {}
            other => panic!("expected propagate, got {:?}", other),
        }
    }

    #[test]
    fn test_arrow_functions() {
        match parse_expr("x => x * 2") {
            Expr::Lambda { params, .. } => assert_eq!(params.len(), 1),
            other => panic!("expected lambda, got {:?}", other),
        }
        match parse_expr("(a, b) => a + b") {
            Expr::Lambda { params, .. } => assert_eq!(params.len(), 2),
            other => panic!("expected lambda, got {:?}", other),
        }
        // Parenthesized expression still works
        match parse_expr("(1 + 2) * 3") {
            Expr::Binary {
                op: BinaryOp::Mul, ..
            } => {}
            other => panic!("expected mul, got {:?}", other),
        }
    }

    #[test]
    fn test_slice_and_index() {
        assert!(matches!(parse_expr("xs[0]"), Expr::Index { .. }));
        assert!(matches!(parse_expr("xs[1:3]"), Expr::Slice { .. }));
        assert!(matches!(
            parse_expr("xs[:2]"),
            Expr::Slice { start: None, .. }
        ));
    }

    #[test]
    fn test_template_string_parses_holes() {
        match parse_expr("\"total: {a + b}\"") {
            Expr::TemplateStr(parts, _) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(
                    parts[1],
                    TemplateExprPart::Expr(Expr::Binary { .. })
                ));
            }
            other => panic!("expected template string, got {:?}", other),
        }
    }

    #[test]
    fn test_object_and_array_literals() {
        match parse_expr("{ name: \"ada\", age, ...rest }") {
            Expr::ObjectLit(entries, _) => {
                assert_eq!(entries.len(), 3);
                assert!(matches!(entries[1], ObjectEntry::Shorthand(..)));
                assert!(matches!(entries[2], ObjectEntry::Spread(..)));
            }
            other => panic!("expected object literal, got {:?}", other),
        }
        match parse_expr("[1, 2, ...more]") {
            Expr::ArrayLit(elements, _) => assert_eq!(elements.len(), 3),
            other => panic!("expected array literal, got {:?}", other),
        }
    }

    #[test]
    fn test_server_rpc_surface() {
        match parse_expr("server.add(2, 3)") {
            Expr::Call { callee, args, .. } => {
                assert_eq!(args.len(), 2);
                match *callee {
                    Expr::Member {
                        ref object,
                        ref property,
                        ..
                    } => {
                        assert!(matches!(**object, Expr::Ident(ref n, _) if n == "server"));
                        assert_eq!(property, "add");
                    }
                    ref other => panic!("expected member callee, got {:?}", other),
                }
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_range_expression() {
        match parse_expr("1..10") {
            Expr::Range {
                inclusive: false, ..
            } => {}
            other => panic!("expected range, got {:?}", other),
        }
        match parse_expr("1..=10") {
            Expr::Range {
                inclusive: true, ..
            } => {}
            other => panic!("expected inclusive range, got {:?}", other),
        }
    }
}
