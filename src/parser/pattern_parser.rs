//! Binding patterns (let / parameters) and match-arm patterns.

use super::ast::*;
use super::{ParseError, Parser};
use crate::lexer::TokenKind;

impl Parser {
    /// Destructuring target: a plain name, `{ a, b: renamed, c = default }`,
    /// or `[x, y, ...rest]`.
    pub(crate) fn parse_bind_pattern(&mut self) -> Result<BindPattern, ParseError> {
        let loc = self.current.loc.clone();
        match self.current.kind {
            TokenKind::LBrace => {
                self.advance()?;
                let mut entries = Vec::new();
                loop {
                    self.skip_newlines()?;
                    if self.at(&TokenKind::RBrace) {
                        break;
                    }
                    let key = self.expect_name("property name")?.0;
                    let binding = if self.eat(&TokenKind::Colon)? {
                        self.expect_name("binding name")?.0
                    } else {
                        key.clone()
                    };
                    let default = if self.eat(&TokenKind::Assign)? {
                        Some(self.parse_expression()?)
                    } else {
                        None
                    };
                    entries.push(ObjectPatternEntry {
                        key,
                        binding,
                        default,
                    });
                    if !self.eat(&TokenKind::Comma)? {
                        break;
                    }
                }
                self.skip_newlines()?;
                self.expect(&TokenKind::RBrace)?;
                Ok(BindPattern::Object { entries, loc })
            }
            TokenKind::LBracket => {
                self.advance()?;
                let mut elements = Vec::new();
                let mut rest = None;
                loop {
                    if self.at(&TokenKind::RBracket) {
                        break;
                    }
                    if self.at(&TokenKind::Ellipsis) {
                        self.advance()?;
                        rest = Some(self.expect_name("rest binding")?.0);
                        break;
                    }
                    elements.push(self.parse_bind_pattern()?);
                    if !self.eat(&TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(&TokenKind::RBracket)?;
                Ok(BindPattern::Array {
                    elements,
                    rest,
                    loc,
                })
            }
            _ => {
                let (name, name_loc) = self.expect_name("binding name")?;
                Ok(BindPattern::Name(name, name_loc))
            }
        }
    }

    pub(crate) fn parse_match_pattern(&mut self) -> Result<MatchPattern, ParseError> {
        let loc = self.current.loc.clone();
        match self.current.kind.clone() {
            TokenKind::Number(_) | TokenKind::Minus => {
                let start = self.parse_pattern_literal()?;
                let inclusive = match self.current.kind {
                    TokenKind::DotDot => false,
                    TokenKind::DotDotEq => true,
                    _ => return Ok(MatchPattern::Literal(start)),
                };
                self.advance()?;
                let end = self.parse_pattern_literal()?;
                Ok(MatchPattern::Range {
                    start,
                    end,
                    inclusive,
                })
            }
            TokenKind::Str(prefix) => {
                self.advance()?;
                if self.at(&TokenKind::PlusPlus) {
                    self.advance()?;
                    let binding = self.expect_name("binding for the string remainder")?.0;
                    Ok(MatchPattern::StringConcat {
                        prefix,
                        binding,
                        loc,
                    })
                } else {
                    Ok(MatchPattern::Literal(Expr::Str(prefix, loc)))
                }
            }
            TokenKind::True => {
                self.advance()?;
                Ok(MatchPattern::Literal(Expr::Bool(true, loc)))
            }
            TokenKind::False => {
                self.advance()?;
                Ok(MatchPattern::Literal(Expr::Bool(false, loc)))
            }
            TokenKind::LBracket => {
                self.advance()?;
                let mut elements = Vec::new();
                let mut rest = None;
                loop {
                    if self.at(&TokenKind::RBracket) {
                        break;
                    }
                    if self.at(&TokenKind::Ellipsis) {
                        self.advance()?;
                        rest = Some(self.expect_name("rest binding")?.0);
                        break;
                    }
                    elements.push(self.parse_match_pattern()?);
                    if !self.eat(&TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(&TokenKind::RBracket)?;
                Ok(MatchPattern::Array {
                    elements,
                    rest,
                    loc,
                })
            }
            TokenKind::Ident(name) => {
                self.advance()?;
                if name == "_" {
                    return Ok(MatchPattern::Wildcard(loc));
                }
                let is_variant = name.chars().next().is_some_and(|c| c.is_uppercase());
                if self.at(&TokenKind::LParen) {
                    if !is_variant {
                        return Err(ParseError::new(
                            format!("variant pattern '{}' must start with an uppercase letter", name),
                            loc,
                        ));
                    }
                    self.advance()?;
                    let mut bindings = Vec::new();
                    while !self.at(&TokenKind::RParen) {
                        bindings.push(self.parse_match_pattern()?);
                        if !self.eat(&TokenKind::Comma)? {
                            break;
                        }
                    }
                    self.expect(&TokenKind::RParen)?;
                    Ok(MatchPattern::Variant {
                        name,
                        bindings,
                        loc,
                    })
                } else if is_variant {
                    // Unit variant like `None`
                    Ok(MatchPattern::Variant {
                        name,
                        bindings: Vec::new(),
                        loc,
                    })
                } else {
                    Ok(MatchPattern::Binding(name, loc))
                }
            }
            other => Err(ParseError::new(
                format!("expected a pattern, found {}", other),
                loc,
            )),
        }
    }

    fn parse_pattern_literal(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current.loc.clone();
        match self.current.kind.clone() {
            TokenKind::Number(value) => {
                self.advance()?;
                Ok(Expr::Number(value, loc))
            }
            TokenKind::Minus => {
                self.advance()?;
                match self.current.kind {
                    TokenKind::Number(value) => {
                        self.advance()?;
                        Ok(Expr::Number(-value, loc))
                    }
                    _ => Err(self.unexpected("a number literal")),
                }
            }
            other => Err(ParseError::new(
                format!("expected a literal, found {}", other),
                loc,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::ast::*;
    use super::super::Parser;

    fn parse_arms(source: &str) -> Vec<MatchArm> {
        let program = Parser::parse_source(source, "t.tova").unwrap();
        match program.body.into_iter().next().unwrap() {
            Item::Statement(Stmt::Match { arms, .. }) => arms,
            other => panic!("expected match statement, got {:?}", other),
        }
    }

    #[test]
    fn test_variant_patterns() {
        let arms = parse_arms("match x { Circle(r) => r, Square(s) => s, _ => 0 }");
        assert_eq!(arms.len(), 3);
        match &arms[0].pattern {
            MatchPattern::Variant { name, bindings, .. } => {
                assert_eq!(name, "Circle");
                assert_eq!(bindings.len(), 1);
            }
            other => panic!("expected variant, got {:?}", other),
        }
        assert!(matches!(arms[2].pattern, MatchPattern::Wildcard(_)));
    }

    #[test]
    fn test_range_and_literal_patterns() {
        let arms = parse_arms("match n { 0 => \"zero\", 1..=9 => \"digit\", _ => \"big\" }");
        assert!(matches!(arms[0].pattern, MatchPattern::Literal(_)));
        assert!(matches!(
            arms[1].pattern,
            MatchPattern::Range {
                inclusive: true,
                ..
            }
        ));
    }

    #[test]
    fn test_string_concat_pattern() {
        let arms = parse_arms("match s { \"user:\" ++ id => id, _ => \"\" }");
        match &arms[0].pattern {
            MatchPattern::StringConcat {
                prefix, binding, ..
            } => {
                assert_eq!(prefix, "user:");
                assert_eq!(binding, "id");
            }
            other => panic!("expected string-concat pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_array_pattern_with_rest() {
        let arms = parse_arms("match xs { [first, ...rest] => first, [] => 0 }");
        match &arms[0].pattern {
            MatchPattern::Array { elements, rest, .. } => {
                assert_eq!(elements.len(), 1);
                assert_eq!(rest.as_deref(), Some("rest"));
            }
            other => panic!("expected array pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_guard() {
        let arms = parse_arms("match n { x if x > 10 => \"big\", _ => \"small\" }");
        assert!(arms[0].guard.is_some());
        assert!(matches!(arms[0].pattern, MatchPattern::Binding(..)));
    }

    #[test]
    fn test_destructuring_let() {
        let program =
            Parser::parse_source("let { name, age: years, role = \"user\" } = person", "t.tova")
                .unwrap();
        match &program.body[0] {
            Item::Statement(Stmt::Let { pattern, .. }) => {
                let names: Vec<String> =
                    pattern.bound_names().into_iter().map(|(n, _)| n).collect();
                assert_eq!(names, vec!["name", "years", "role"]);
            }
            other => panic!("expected let, got {:?}", other),
        }
    }
}
