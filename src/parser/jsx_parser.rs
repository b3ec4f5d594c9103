//! JSX sublanguage: elements, fragments, attribute directives, raw text
//! children, and the `if`/`for` control-flow forms.
//!
//! The parser owns every lexer mode switch. The invariant is that a
//! token is always pulled in the mode of the position it occupies: raw
//! text mode for element child positions, normal mode everywhere else.
//! Getting this wrong reads child text as identifiers, so each `advance`
//! past a structural token sets the mode for the token that follows it.

use super::ast::*;
use super::{ParseError, Parser};
use crate::error::Loc;
use crate::lexer::TokenKind;

#[derive(Clone, Copy)]
enum JsxTerminator<'a> {
    CloseTag(&'a str),
    Fragment,
    /// `if`/`for` bodies end at `}`
    Brace,
}

impl Parser {
    /// Entry point from expression position; `current` is `<`.
    /// `resume_jsx` selects the lexer mode for the token following the
    /// element (true when nested in a child position).
    pub(crate) fn parse_jsx_element(&mut self, resume_jsx: bool) -> Result<Expr, ParseError> {
        let loc = self.current.loc.clone();
        self.advance()?; // consume '<'

        if self.at(&TokenKind::Gt) {
            // Fragment `<> ... </>`
            self.set_jsx_text(true);
            self.advance()?; // consume '>'
            let children = self.parse_jsx_children(JsxTerminator::Fragment)?;
            self.set_jsx_text(resume_jsx);
            self.expect(&TokenKind::Gt)?;
            return Ok(Expr::JsxFragment { children, loc });
        }

        let element = self.parse_jsx_element_core(loc, resume_jsx)?;
        Ok(Expr::Jsx(Box::new(element)))
    }

    /// Parses tag, attributes, and children. `current` is the tag name;
    /// the `<` has already been consumed.
    fn parse_jsx_element_core(
        &mut self,
        loc: Loc,
        resume_jsx: bool,
    ) -> Result<JsxElement, ParseError> {
        let tag = self.expect_name("tag name")?.0;
        let attrs = self.parse_jsx_attrs()?;

        if self.at(&TokenKind::Slash) {
            self.advance()?;
            self.set_jsx_text(resume_jsx);
            self.expect(&TokenKind::Gt)?;
            return Ok(JsxElement {
                tag,
                attrs,
                children: Vec::new(),
                self_closing: true,
                loc,
            });
        }

        self.set_jsx_text(true);
        self.expect(&TokenKind::Gt)?;
        let children = self.parse_jsx_children(JsxTerminator::CloseTag(&tag))?;
        self.set_jsx_text(resume_jsx);
        self.expect(&TokenKind::Gt)?;

        Ok(JsxElement {
            tag,
            attrs,
            children,
            self_closing: false,
            loc,
        })
    }

    fn parse_jsx_attrs(&mut self) -> Result<Vec<JsxAttr>, ParseError> {
        let mut attrs = Vec::new();
        loop {
            self.skip_newlines()?;
            match self.current.kind {
                TokenKind::Gt | TokenKind::Slash => return Ok(attrs),
                TokenKind::LBrace => {
                    // `{...props}`
                    let loc = self.current.loc.clone();
                    self.advance()?;
                    self.expect(&TokenKind::Ellipsis)?;
                    let value = self.parse_expression()?;
                    self.expect(&TokenKind::RBrace)?;
                    attrs.push(JsxAttr::Spread { value, loc });
                }
                _ => {
                    let loc = self.current.loc.clone();
                    let name = self.parse_jsx_attr_name()?;
                    if self.at(&TokenKind::Colon) {
                        self.advance()?;
                        let sub = self.parse_jsx_attr_name()?;
                        let value = self.parse_jsx_attr_expr()?;
                        let attr = match name.as_str() {
                            "on" => JsxAttr::Event {
                                name: sub,
                                handler: value,
                                loc,
                            },
                            "bind" => JsxAttr::Bind {
                                name: sub,
                                target: value,
                                loc,
                            },
                            "class" => JsxAttr::ClassToggle {
                                name: sub,
                                cond: value,
                                loc,
                            },
                            "style" => JsxAttr::StyleProp {
                                name: sub,
                                value,
                                loc,
                            },
                            other => {
                                return Err(ParseError::new(
                                    format!("unknown attribute directive '{}:'", other),
                                    loc,
                                )
                                .with_hint("supported directives: on:, bind:, class:, style:"))
                            }
                        };
                        attrs.push(attr);
                    } else if self.eat(&TokenKind::Assign)? {
                        match self.current.kind.clone() {
                            TokenKind::Str(value) => {
                                self.advance()?;
                                attrs.push(JsxAttr::Static { name, value, loc });
                            }
                            TokenKind::LBrace => {
                                self.advance()?;
                                let value = self.parse_expression()?;
                                self.expect(&TokenKind::RBrace)?;
                                attrs.push(JsxAttr::Expr { name, value, loc });
                            }
                            _ => {
                                return Err(self
                                    .unexpected("a string literal or {expression} attribute value"))
                            }
                        }
                    } else {
                        attrs.push(JsxAttr::Bare { name, loc });
                    }
                }
            }
        }
    }

    /// Attribute names allow hyphens (`data-id`, `aria-label`).
    fn parse_jsx_attr_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.expect_name("attribute name")?.0;
        while self.at(&TokenKind::Minus) {
            self.advance()?;
            name.push('-');
            name.push_str(&self.expect_name("attribute name")?.0);
        }
        Ok(name)
    }

    fn parse_jsx_attr_expr(&mut self) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::Assign)?;
        self.expect(&TokenKind::LBrace)?;
        let value = self.parse_expression()?;
        self.expect(&TokenKind::RBrace)?;
        Ok(value)
    }

    /// Child loop. Precondition: `current` was pulled in JSX text mode.
    /// Postcondition depends on the terminator:
    /// - CloseTag/Fragment: the `</name` (or `</`) is consumed, `current`
    ///   is the final `>`, text mode is off.
    /// - Brace: `current` is the `}`, unconsumed.
    fn parse_jsx_children(
        &mut self,
        terminator: JsxTerminator<'_>,
    ) -> Result<Vec<JsxChild>, ParseError> {
        let mut children = Vec::new();
        loop {
            let loc = self.current.loc.clone();
            match self.current.kind.clone() {
                TokenKind::JsxText(text) => {
                    if !text.is_empty() {
                        children.push(JsxChild::Text(text, loc));
                    }
                    self.advance()?;
                }
                TokenKind::LBrace => {
                    self.set_jsx_text(false);
                    self.advance()?;
                    let expr = self.parse_expression()?;
                    self.set_jsx_text(true);
                    self.expect(&TokenKind::RBrace)?;
                    children.push(JsxChild::Expr(expr, loc));
                }
                TokenKind::RBrace => match terminator {
                    JsxTerminator::Brace => return Ok(children),
                    _ => return Err(ParseError::new("unexpected '}' in element children", loc)),
                },
                TokenKind::If => {
                    children.push(self.parse_jsx_if(loc)?);
                }
                TokenKind::For => {
                    children.push(self.parse_jsx_for(loc)?);
                }
                TokenKind::Lt => {
                    self.set_jsx_text(false);
                    self.advance()?;
                    if self.at(&TokenKind::Slash) {
                        self.advance()?;
                        match terminator {
                            JsxTerminator::CloseTag(tag) => {
                                let (name, name_loc) = self.expect_name("closing tag name")?;
                                if name != tag {
                                    return Err(ParseError::new(
                                        format!(
                                            "mismatched closing tag: expected </{}>, found </{}>",
                                            tag, name
                                        ),
                                        name_loc,
                                    ));
                                }
                                return Ok(children);
                            }
                            JsxTerminator::Fragment => return Ok(children),
                            JsxTerminator::Brace => {
                                return Err(ParseError::new(
                                    "unexpected closing tag in control-flow block",
                                    loc,
                                ))
                            }
                        }
                    }
                    if self.at(&TokenKind::Gt) {
                        // nested fragment
                        self.set_jsx_text(true);
                        self.advance()?;
                        let fragment_children =
                            self.parse_jsx_children(JsxTerminator::Fragment)?;
                        self.set_jsx_text(true);
                        self.expect(&TokenKind::Gt)?;
                        children.push(JsxChild::Fragment(fragment_children, loc));
                    } else {
                        let element = self.parse_jsx_element_core(loc, true)?;
                        children.push(JsxChild::Element(element));
                    }
                }
                TokenKind::Eof => {
                    return Err(ParseError::new("unterminated element", loc));
                }
                other => {
                    return Err(ParseError::new(
                        format!("unexpected {} in element children", other),
                        loc,
                    ));
                }
            }
        }
    }

    /// `if cond { children } elif cond { children } else { children }`
    fn parse_jsx_if(&mut self, loc: Loc) -> Result<JsxChild, ParseError> {
        let mut branches = Vec::new();
        let mut else_children = None;

        // current is `if`
        self.set_jsx_text(false);
        self.advance()?;
        let cond = self.parse_expression()?;
        self.set_jsx_text(true);
        self.expect(&TokenKind::LBrace)?;
        let body = self.parse_jsx_children(JsxTerminator::Brace)?;
        branches.push((cond, body));

        loop {
            // current is the branch's `}`; the token after it is a child
            // position again, where `elif`/`else` lex as keywords
            self.set_jsx_text(true);
            self.advance()?;
            match self.current.kind {
                TokenKind::Elif => {
                    self.set_jsx_text(false);
                    self.advance()?;
                    let elif_cond = self.parse_expression()?;
                    self.set_jsx_text(true);
                    self.expect(&TokenKind::LBrace)?;
                    let elif_body = self.parse_jsx_children(JsxTerminator::Brace)?;
                    branches.push((elif_cond, elif_body));
                }
                TokenKind::Else => {
                    self.advance()?;
                    if !self.at(&TokenKind::LBrace) {
                        return Err(self.unexpected("'{' after else"));
                    }
                    self.advance()?;
                    let body = self.parse_jsx_children(JsxTerminator::Brace)?;
                    else_children = Some(body);
                    self.set_jsx_text(true);
                    self.advance()?; // consume final `}`
                    break;
                }
                _ => break, // current is already the next child
            }
        }

        Ok(JsxChild::If(JsxIf {
            branches,
            else_children,
            loc,
        }))
    }

    /// `for x[, y] in expr key={expr} { children }`
    fn parse_jsx_for(&mut self, loc: Loc) -> Result<JsxChild, ParseError> {
        self.set_jsx_text(false);
        self.advance()?;
        let mut bindings = vec![self.expect_name("loop variable")?.0];
        while self.eat(&TokenKind::Comma)? {
            bindings.push(self.expect_name("loop variable")?.0);
        }
        self.expect(&TokenKind::In)?;
        let iterable = self.parse_expression()?;

        let key = if self.at(&TokenKind::Ident("key".to_string())) {
            self.advance()?;
            self.expect(&TokenKind::Assign)?;
            self.expect(&TokenKind::LBrace)?;
            let key_expr = self.parse_expression()?;
            self.expect(&TokenKind::RBrace)?;
            Some(key_expr)
        } else {
            None
        };

        self.set_jsx_text(true);
        self.expect(&TokenKind::LBrace)?;
        let body = self.parse_jsx_children(JsxTerminator::Brace)?;
        self.set_jsx_text(true);
        self.advance()?; // consume `}`

        Ok(JsxChild::For(JsxFor {
            bindings,
            iterable,
            key,
            body,
            loc,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::ast::*;
    use super::super::Parser;

    fn parse_jsx(source: &str) -> Expr {
        let program = Parser::parse_source(source, "t.tova").unwrap();
        match program.body.into_iter().next().unwrap() {
            Item::Statement(Stmt::Expression(expr)) => expr,
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_element() {
        match parse_jsx("<div class=\"box\">hello</div>") {
            Expr::Jsx(element) => {
                assert_eq!(element.tag, "div");
                assert_eq!(element.attrs.len(), 1);
                assert_eq!(element.children.len(), 1);
                match &element.children[0] {
                    JsxChild::Text(text, _) => assert_eq!(text, "hello"),
                    other => panic!("expected text child, got {:?}", other),
                }
            }
            other => panic!("expected jsx, got {:?}", other),
        }
    }

    #[test]
    fn test_self_closing_and_nested() {
        match parse_jsx("<div><br/><span>{count}</span></div>") {
            Expr::Jsx(element) => {
                assert_eq!(element.children.len(), 2);
                match &element.children[0] {
                    JsxChild::Element(br) => assert!(br.self_closing),
                    other => panic!("expected element, got {:?}", other),
                }
                match &element.children[1] {
                    JsxChild::Element(span) => {
                        assert!(matches!(span.children[0], JsxChild::Expr(..)))
                    }
                    other => panic!("expected element, got {:?}", other),
                }
            }
            other => panic!("expected jsx, got {:?}", other),
        }
    }

    #[test]
    fn test_attribute_directives() {
        match parse_jsx("<input on:input={update} bind:value={name} class:error={invalid}/>") {
            Expr::Jsx(element) => {
                assert!(matches!(element.attrs[0], JsxAttr::Event { ref name, .. } if name == "input"));
                assert!(matches!(element.attrs[1], JsxAttr::Bind { ref name, .. } if name == "value"));
                assert!(
                    matches!(element.attrs[2], JsxAttr::ClassToggle { ref name, .. } if name == "error")
                );
            }
            other => panic!("expected jsx, got {:?}", other),
        }
    }

    #[test]
    fn test_jsx_if_elif_else() {
        let source = "<div>if loading { <Spinner/> } elif failed { <Error/> } else { <Content/> }</div>";
        match parse_jsx(source) {
            Expr::Jsx(element) => match &element.children[0] {
                JsxChild::If(jsx_if) => {
                    assert_eq!(jsx_if.branches.len(), 2);
                    assert!(jsx_if.else_children.is_some());
                }
                other => panic!("expected jsx_if, got {:?}", other),
            },
            other => panic!("expected jsx, got {:?}", other),
        }
    }

    #[test]
    fn test_jsx_for_with_key() {
        let source = "<ul>for item in items key={item.id} { <li>{item.name}</li> }</ul>";
        match parse_jsx(source) {
            Expr::Jsx(element) => match &element.children[0] {
                JsxChild::For(jsx_for) => {
                    assert_eq!(jsx_for.bindings, vec!["item".to_string()]);
                    assert!(jsx_for.key.is_some());
                    assert_eq!(jsx_for.body.len(), 1);
                }
                other => panic!("expected jsx_for, got {:?}", other),
            },
            other => panic!("expected jsx, got {:?}", other),
        }
    }

    #[test]
    fn test_component_tag_case() {
        match parse_jsx("<Header title=\"home\"/>") {
            Expr::Jsx(element) => assert!(element.is_component()),
            other => panic!("expected jsx, got {:?}", other),
        }
        match parse_jsx("<header/>") {
            Expr::Jsx(element) => assert!(!element.is_component()),
            other => panic!("expected jsx, got {:?}", other),
        }
    }

    #[test]
    fn test_fragment() {
        match parse_jsx("<><a/><b/></>") {
            Expr::JsxFragment { children, .. } => assert_eq!(children.len(), 2),
            other => panic!("expected fragment, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_closing_tag() {
        let err = Parser::parse_source("<div>text</span>", "t.tova").unwrap_err();
        assert!(err.message.contains("mismatched closing tag"));
    }

    #[test]
    fn test_jsx_inside_lambda() {
        // Nested JSX in an interpolated child expression
        let source = "<ul>{items.map(i => <li>{i}</li>)}</ul>";
        match parse_jsx(source) {
            Expr::Jsx(element) => {
                assert!(matches!(element.children[0], JsxChild::Expr(..)));
            }
            other => panic!("expected jsx, got {:?}", other),
        }
    }
}
