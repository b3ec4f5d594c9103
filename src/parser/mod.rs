//! Tova parser: token stream to AST.
//!
//! Recursive descent over a pull-based lexer. The parser drives the
//! lexer's JSX text mode directly and rewinds through lexer snapshots
//! where the grammar needs more than one token of lookahead (arrow
//! functions, contextual server forms).

pub mod ast;
mod expression_parser;
mod jsx_parser;
mod pattern_parser;
mod statement_parser;

use crate::error::Loc;
use crate::lexer::{LexError, Lexer, LexerState, Token, TokenKind};
use ast::{ImportDecl, ImportSpecifier, Item, Program};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{message} at {loc}")]
pub struct ParseError {
    pub message: String,
    pub loc: Loc,
    pub hint: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, loc: Loc) -> Self {
        Self {
            message: message.into(),
            loc,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::new(err.kind.to_string(), err.loc)
    }
}

/// Which block directive encloses the statement being parsed. Block
/// bodies restrict their permitted top-level forms; violations are
/// parse errors naming the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCtx {
    TopLevel,
    Shared,
    Server,
    Client,
    TestBench,
    Function,
}

impl BlockCtx {
    pub fn describe(&self) -> &'static str {
        match self {
            BlockCtx::TopLevel => "the top level",
            BlockCtx::Shared => "a shared block",
            BlockCtx::Server => "a server block",
            BlockCtx::Client => "a client block",
            BlockCtx::TestBench => "a test or bench block",
            BlockCtx::Function => "a function body",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    lex: LexerState,
}

pub struct Parser {
    lexer: Lexer,
    pub(crate) current: Token,
    before_current: LexerState,
    pub(crate) pending_doc: Option<String>,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let before_current = lexer.state();
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            before_current,
            pending_doc: None,
        })
    }

    /// Parse a whole source file.
    pub fn parse_source(source: &str, file: &str) -> Result<Program, ParseError> {
        let mut parser = Parser::new(Lexer::new(source, file))?;
        parser.parse_program()
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        loop {
            self.skip_separators()?;
            if self.at(&TokenKind::Eof) {
                break;
            }
            body.push(self.parse_item()?);
        }
        Ok(Program { body })
    }

    fn parse_item(&mut self) -> Result<Item, ParseError> {
        let loc = self.current.loc.clone();
        match self.current.kind.clone() {
            TokenKind::Shared => {
                self.advance()?;
                let body = self.parse_block_body(BlockCtx::Shared)?;
                Ok(Item::SharedBlock { body, loc })
            }
            TokenKind::Server => {
                self.advance()?;
                let name = self.eat_string_label()?;
                let body = self.parse_block_body(BlockCtx::Server)?;
                Ok(Item::ServerBlock { name, body, loc })
            }
            TokenKind::Client => {
                self.advance()?;
                let name = self.eat_string_label()?;
                let body = self.parse_block_body(BlockCtx::Client)?;
                Ok(Item::ClientBlock { name, body, loc })
            }
            TokenKind::Test => {
                self.advance()?;
                let label = self.eat_string_label()?;
                let body = self.parse_block_body(BlockCtx::TestBench)?;
                Ok(Item::TestBlock { label, body, loc })
            }
            TokenKind::Bench => {
                self.advance()?;
                let label = self.eat_string_label()?;
                let body = self.parse_block_body(BlockCtx::TestBench)?;
                Ok(Item::BenchBlock { label, body, loc })
            }
            TokenKind::Import => Ok(Item::Import(self.parse_import()?)),
            _ => Ok(Item::Statement(
                self.parse_terminated_statement(BlockCtx::TopLevel)?,
            )),
        }
    }

    /// `{ stmt* }` with statements restricted by `ctx`.
    pub(crate) fn parse_block_body(
        &mut self,
        ctx: BlockCtx,
    ) -> Result<Vec<ast::Stmt>, ParseError> {
        self.skip_newlines()?;
        self.expect(&TokenKind::LBrace)?;
        let mut body = Vec::new();
        loop {
            self.skip_separators()?;
            if self.at(&TokenKind::RBrace) {
                break;
            }
            if self.at(&TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.parse_terminated_statement(ctx)?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(body)
    }

    fn parse_terminated_statement(&mut self, ctx: BlockCtx) -> Result<ast::Stmt, ParseError> {
        let stmt = self.parse_statement(ctx)?;
        self.expect_statement_end()?;
        Ok(stmt)
    }

    fn parse_import(&mut self) -> Result<ImportDecl, ParseError> {
        let loc = self.current.loc.clone();
        self.advance()?; // import

        let mut specifiers = Vec::new();
        let mut wildcard = None;
        let mut default = None;

        match self.current.kind.clone() {
            TokenKind::LBrace => {
                self.advance()?;
                loop {
                    self.skip_newlines()?;
                    if self.at(&TokenKind::RBrace) {
                        break;
                    }
                    let (imported, spec_loc) = self.expect_name("import specifier")?;
                    let local = if self.eat(&TokenKind::As)? {
                        self.expect_name("local alias")?.0
                    } else {
                        imported.clone()
                    };
                    specifiers.push(ImportSpecifier {
                        imported,
                        local,
                        loc: spec_loc,
                    });
                    self.skip_newlines()?;
                    if !self.eat(&TokenKind::Comma)? {
                        break;
                    }
                }
                self.skip_newlines()?;
                self.expect(&TokenKind::RBrace)?;
                self.expect(&TokenKind::From)?;
            }
            TokenKind::Star => {
                self.advance()?;
                self.expect(&TokenKind::As)?;
                wildcard = Some(self.expect_name("namespace alias")?.0);
                self.expect(&TokenKind::From)?;
            }
            TokenKind::Str(_) => {
                // Bare `import "./side_effects.tova"`
            }
            _ => {
                default = Some(self.expect_name("import name")?.0);
                self.expect(&TokenKind::From)?;
            }
        }

        let source = self.expect_string("module path")?;
        Ok(ImportDecl {
            specifiers,
            wildcard,
            default,
            source,
            loc,
        })
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    pub(crate) fn advance(&mut self) -> Result<(), ParseError> {
        self.before_current = self.lexer.state();
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    /// Snapshot before the current token; `rewind` re-lexes from here.
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            lex: self.before_current,
        }
    }

    pub(crate) fn rewind(&mut self, cp: Checkpoint) -> Result<(), ParseError> {
        self.lexer.restore(cp.lex);
        self.advance()
    }

    /// One-token lookahead via checkpoint/rewind.
    pub(crate) fn peek_kind(&mut self) -> Result<TokenKind, ParseError> {
        let cp = self.checkpoint();
        self.advance()?;
        let kind = self.current.kind.clone();
        self.rewind(cp)?;
        Ok(kind)
    }

    pub(crate) fn set_jsx_text(&mut self, on: bool) {
        self.lexer.set_jsx_text(on);
    }

    pub(crate) fn at(&self, kind: &TokenKind) -> bool {
        self.current.kind == *kind
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> Result<bool, ParseError> {
        if self.at(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind) -> Result<Loc, ParseError> {
        if self.at(kind) {
            let loc = self.current.loc.clone();
            self.advance()?;
            Ok(loc)
        } else {
            Err(ParseError::new(
                format!("expected {:?}, found {}", kind, self.current.kind),
                self.current.loc.clone(),
            ))
        }
    }

    /// Identifier-or-method-name token, with the thing being named in
    /// the error message.
    pub(crate) fn expect_name(&mut self, what: &str) -> Result<(String, Loc), ParseError> {
        match self.current.kind.ident_name() {
            Some(name) => {
                let loc = self.current.loc.clone();
                self.advance()?;
                Ok((name, loc))
            }
            None => Err(ParseError::new(
                format!("expected {}, found {}", what, self.current.kind),
                self.current.loc.clone(),
            )),
        }
    }

    pub(crate) fn expect_string(&mut self, what: &str) -> Result<String, ParseError> {
        match self.current.kind.clone() {
            TokenKind::Str(value) => {
                self.advance()?;
                Ok(value)
            }
            other => Err(ParseError::new(
                format!("expected {} string, found {}", what, other),
                self.current.loc.clone(),
            )),
        }
    }

    fn eat_string_label(&mut self) -> Result<Option<String>, ParseError> {
        if let TokenKind::Str(label) = self.current.kind.clone() {
            self.advance()?;
            Ok(Some(label))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn skip_newlines(&mut self) -> Result<(), ParseError> {
        while self.at(&TokenKind::Newline) {
            self.advance()?;
        }
        Ok(())
    }

    /// Newlines, semicolons, and docstrings between statements.
    /// Docstrings accumulate onto the next declaration.
    pub(crate) fn skip_separators(&mut self) -> Result<(), ParseError> {
        loop {
            match self.current.kind.clone() {
                TokenKind::Newline | TokenKind::Semicolon => self.advance()?,
                TokenKind::Doc(text) => {
                    match self.pending_doc {
                        Some(ref mut doc) => {
                            doc.push('\n');
                            doc.push_str(&text);
                        }
                        None => self.pending_doc = Some(text),
                    }
                    self.advance()?;
                }
                _ => return Ok(()),
            }
        }
    }

    pub(crate) fn take_doc(&mut self) -> Option<String> {
        self.pending_doc.take()
    }

    /// A statement ends at a newline, `;`, the enclosing `}`, or EOF.
    pub(crate) fn expect_statement_end(&mut self) -> Result<(), ParseError> {
        match self.current.kind {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.advance()?;
                Ok(())
            }
            TokenKind::RBrace | TokenKind::Eof => Ok(()),
            _ => Err(ParseError::new(
                format!("expected end of statement, found {}", self.current.kind),
                self.current.loc.clone(),
            )
            .with_hint("separate statements with a newline or ';'")),
        }
    }

    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::new(
            format!("expected {}, found {}", expected, self.current.kind),
            self.current.loc.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ast::*;
    use super::*;

    #[test]
    fn test_parse_empty_program() {
        let program = Parser::parse_source("", "t.tova").unwrap();
        assert!(program.body.is_empty());
    }

    #[test]
    fn test_parse_block_directives() {
        let source = r#"
shared {
    fn helper() { 1 }
}

server {
    fn add(a, b) { a + b }
}

client "admin" {
    state n = 0
}

test "math" {
    let x = 1
}
"#;
        let program = Parser::parse_source(source, "t.tova").unwrap();
        assert_eq!(program.body.len(), 4);
        assert!(matches!(program.body[0], Item::SharedBlock { .. }));
        assert!(matches!(
            program.body[1],
            Item::ServerBlock { name: None, .. }
        ));
        match &program.body[2] {
            Item::ClientBlock { name, .. } => assert_eq!(name.as_deref(), Some("admin")),
            other => panic!("expected client block, got {:?}", other),
        }
        match &program.body[3] {
            Item::TestBlock { label, .. } => assert_eq!(label.as_deref(), Some("math")),
            other => panic!("expected test block, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_import_forms() {
        let source = r#"
import { helper, format as fmt } from "./util.tova"
import * as math from "./math.tova"
"#;
        let program = Parser::parse_source(source, "t.tova").unwrap();
        match &program.body[0] {
            Item::Import(import) => {
                assert_eq!(import.specifiers.len(), 2);
                assert_eq!(import.specifiers[0].imported, "helper");
                assert_eq!(import.specifiers[0].local, "helper");
                assert_eq!(import.specifiers[1].imported, "format");
                assert_eq!(import.specifiers[1].local, "fmt");
                assert_eq!(import.source, "./util.tova");
            }
            other => panic!("expected import, got {:?}", other),
        }
        match &program.body[1] {
            Item::Import(import) => {
                assert_eq!(import.wildcard.as_deref(), Some("math"));
            }
            other => panic!("expected import, got {:?}", other),
        }
    }

    #[test]
    fn test_statement_termination_with_semicolons() {
        let program = Parser::parse_source("let a = 1; let b = 2; a + b", "t.tova").unwrap();
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn test_missing_terminator_is_error() {
        let err = Parser::parse_source("let a = 1 let b = 2", "t.tova").unwrap_err();
        assert!(err.message.contains("end of statement"));
    }
}
