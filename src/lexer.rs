//! Tova lexer: UTF-8 source text to a located token stream.
//!
//! Newlines are tokens only at bracket depth zero (they terminate
//! statements); inside parentheses and square brackets they are plain
//! whitespace. JSX raw text is lexed in a parser-driven mode switch so
//! that unquoted element children are never mis-read as identifiers.

use crate::error::Loc;
use std::fmt;
use thiserror::Error;

/// One piece of an interpolated string: either literal text or the raw
/// source of a `{expr}` hole, which the parser re-parses as an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Expr {
        source: String,
        line: usize,
        column: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        match word {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            "PATCH" => Some(HttpMethod::Patch),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Block directives
    Shared,
    Server,
    Client,
    Test,
    Bench,

    // Domain keywords
    Route,
    Routes,
    State,
    Computed,
    Effect,
    Component,
    Store,

    // General keywords
    Fn,
    Let,
    Var,
    Pub,
    Return,
    If,
    Elif,
    Else,
    Match,
    For,
    In,
    While,
    Break,
    Continue,
    Type,
    Import,
    From,
    As,
    Async,
    Await,
    Try,
    Catch,
    Finally,
    Throw,
    Interface,
    Trait,
    Impl,
    And,
    Or,
    Not,

    // Literals
    Number(f64),
    Str(String),
    TemplateStr(Vec<TemplatePart>),
    True,
    False,

    Ident(String),
    /// GET/POST/... - keywords after `route`, plain names elsewhere
    HttpMethod(HttpMethod),
    /// `///` docstring, attached to the next declaration by the parser
    Doc(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,   // **
    PlusPlus,   // ++ (string-concat pattern)
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AmpAmp,
    PipePipe,
    Bang,
    Arrow,            // ->
    FatArrow,         // =>
    DotDot,           // ..
    DotDotEq,         // ..=
    Ellipsis,         // ...
    ColonColon,       // ::
    QuestionDot,      // ?.
    QuestionQuestion, // ??
    PipeOp,           // |>
    Question,
    Dot,
    Comma,
    Colon,
    Semicolon,
    At,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    /// Raw element child text, produced only in JSX text mode
    JsxText(String),

    Newline,
    Eof,
}

impl TokenKind {
    /// Identifier-like name for tokens usable where a name is expected.
    pub fn ident_name(&self) -> Option<String> {
        match self {
            TokenKind::Ident(name) => Some(name.clone()),
            TokenKind::HttpMethod(m) => Some(m.as_str().to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) => write!(f, "identifier '{}'", s),
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::Str(s) => write!(f, "string \"{}\"", s),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Eof => write!(f, "end of file"),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Loc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedBlockComment,
    #[error("invalid number literal")]
    InvalidNumber,
    #[error("invalid escape sequence")]
    InvalidEscape,
    #[error("unrecognized character")]
    UnrecognizedChar,
}

#[derive(Debug, Clone, Error)]
#[error("{kind} at {loc}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub loc: Loc,
}

/// Snapshot of the lexer position, used by the parser for backtracking
/// (arrow-function lookahead) and JSX mode switches.
#[derive(Debug, Clone, Copy)]
pub struct LexerState {
    position: usize,
    line: usize,
    column: usize,
    depth: usize,
    jsx_text: bool,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    file: String,
    /// Open `(`/`[` nesting; newlines are insignificant inside
    depth: usize,
    /// Parser-driven JSX child-position mode
    jsx_text: bool,
}

impl Lexer {
    pub fn new(input: &str, file: impl Into<String>) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            file: file.into(),
            depth: 0,
            jsx_text: false,
        }
    }

    /// Lexer for an embedded fragment (string-interpolation holes), so
    /// diagnostics inside the fragment point at the enclosing file.
    pub fn with_position(input: &str, file: impl Into<String>, line: usize, column: usize) -> Self {
        let mut lexer = Self::new(input, file);
        lexer.line = line;
        lexer.column = column;
        lexer
    }

    pub fn state(&self) -> LexerState {
        LexerState {
            position: self.position,
            line: self.line,
            column: self.column,
            depth: self.depth,
            jsx_text: self.jsx_text,
        }
    }

    pub fn restore(&mut self, state: LexerState) {
        self.position = state.position;
        self.line = state.line;
        self.column = state.column;
        self.depth = state.depth;
        self.jsx_text = state.jsx_text;
    }

    pub fn set_jsx_text(&mut self, on: bool) {
        self.jsx_text = on;
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn loc_here(&self, length: usize) -> Loc {
        Loc::new(self.file.clone(), self.line, self.column, length)
    }

    fn token(&self, kind: TokenKind, line: usize, column: usize, start: usize) -> Token {
        Token {
            kind,
            loc: Loc::new(self.file.clone(), line, column, self.position - start),
        }
    }

    fn err(&self, kind: LexErrorKind, line: usize, column: usize) -> LexError {
        LexError {
            kind,
            loc: Loc::new(self.file.clone(), line, column, 1),
        }
    }

    fn skip_inline_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        if self.jsx_text {
            return self.next_in_jsx_text();
        }

        self.skip_inline_whitespace();

        let (line, column, start) = (self.line, self.column, self.position);

        let ch = match self.current() {
            None => return Ok(self.token(TokenKind::Eof, line, column, start)),
            Some(c) => c,
        };

        match ch {
            '\n' => {
                self.advance();
                if self.depth == 0 {
                    Ok(self.token(TokenKind::Newline, line, column, start))
                } else {
                    self.next_token()
                }
            }
            '/' if self.peek(1) == Some('/') => {
                if self.peek(2) == Some('/') {
                    self.read_doc_comment(line, column, start)
                } else {
                    while let Some(c) = self.current() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                    self.next_token()
                }
            }
            '/' if self.peek(1) == Some('*') => {
                self.skip_block_comment(line, column)?;
                self.next_token()
            }
            '"' => self.read_double_string(line, column, start),
            '\'' => self.read_single_string(line, column, start),
            c if c.is_ascii_digit() => self.read_number(line, column, start),
            c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier(line, column, start)),
            _ => self.read_operator(line, column, start),
        }
    }

    /// Tokenize the whole input. Newline tokens are retained - the parser
    /// relies on them for statement termination.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    // ------------------------------------------------------------------
    // JSX text mode
    // ------------------------------------------------------------------

    /// In child position: structural characters and the four control
    /// keywords lex normally; everything else is a raw text run.
    fn next_in_jsx_text(&mut self) -> Result<Token, LexError> {
        // Whitespace between children is insignificant
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }

        let (line, column, start) = (self.line, self.column, self.position);

        match self.current() {
            None => Ok(self.token(TokenKind::Eof, line, column, start)),
            Some('<') => {
                self.advance();
                Ok(self.token(TokenKind::Lt, line, column, start))
            }
            Some('{') => {
                self.advance();
                Ok(self.token(TokenKind::LBrace, line, column, start))
            }
            Some('}') => {
                self.advance();
                Ok(self.token(TokenKind::RBrace, line, column, start))
            }
            Some(_) => {
                // A leading control keyword is reserved, not text
                if let Some(kind) = self.peek_jsx_keyword() {
                    let word_len = match kind {
                        TokenKind::If => 2,
                        TokenKind::For => 3,
                        TokenKind::Elif | TokenKind::Else => 4,
                        _ => unreachable!(),
                    };
                    for _ in 0..word_len {
                        self.advance();
                    }
                    return Ok(self.token(kind, line, column, start));
                }

                let mut text = String::new();
                while let Some(c) = self.current() {
                    if c == '<' || c == '{' || c == '}' {
                        break;
                    }
                    text.push(c);
                    self.advance();
                }
                // Trailing layout whitespace belongs to the markup, not the text
                let trimmed = text.trim_end().to_string();
                Ok(self.token(TokenKind::JsxText(trimmed), line, column, start))
            }
        }
    }

    fn peek_jsx_keyword(&self) -> Option<TokenKind> {
        let mut word = String::new();
        let mut offset = 0;
        while let Some(c) = self.peek(offset) {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                offset += 1;
                if word.len() > 4 {
                    return None;
                }
            } else {
                break;
            }
        }
        match word.as_str() {
            "if" => Some(TokenKind::If),
            "for" => Some(TokenKind::For),
            "elif" => Some(TokenKind::Elif),
            "else" => Some(TokenKind::Else),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    fn read_doc_comment(
        &mut self,
        line: usize,
        column: usize,
        start: usize,
    ) -> Result<Token, LexError> {
        // Consume `///`
        self.advance();
        self.advance();
        self.advance();
        if self.current() == Some(' ') {
            self.advance();
        }
        let mut text = String::new();
        while let Some(c) = self.current() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.advance();
        }
        Ok(self.token(TokenKind::Doc(text), line, column, start))
    }

    fn skip_block_comment(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        // Consume `/*`; block comments nest
        self.advance();
        self.advance();
        let mut depth = 1usize;
        while depth > 0 {
            match self.current() {
                None => return Err(self.err(LexErrorKind::UnterminatedBlockComment, line, column)),
                Some('/') if self.peek(1) == Some('*') => {
                    depth += 1;
                    self.advance();
                    self.advance();
                }
                Some('*') if self.peek(1) == Some('/') => {
                    depth -= 1;
                    self.advance();
                    self.advance();
                }
                Some(_) => self.advance(),
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------

    fn read_number(
        &mut self,
        line: usize,
        column: usize,
        start: usize,
    ) -> Result<Token, LexError> {
        if self.current() == Some('0') {
            match self.peek(1) {
                Some('x') | Some('X') => return self.read_radix(16, line, column, start),
                Some('b') | Some('B') => return self.read_radix(2, line, column, start),
                Some('o') | Some('O') => return self.read_radix(8, line, column, start),
                _ => {}
            }
        }

        let mut text = String::new();
        while let Some(c) = self.current() {
            if c.is_ascii_digit() || c == '_' {
                if c != '_' {
                    text.push(c);
                }
                self.advance();
            } else {
                break;
            }
        }

        // Fractional part only when a digit follows the dot, so ranges
        // like `1..10` keep their dots
        if self.current() == Some('.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.advance();
            while let Some(c) = self.current() {
                if c.is_ascii_digit() || c == '_' {
                    if c != '_' {
                        text.push(c);
                    }
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if matches!(self.current(), Some('e') | Some('E')) {
            let mut offset = 1;
            if matches!(self.peek(1), Some('+') | Some('-')) {
                offset = 2;
            }
            if self.peek(offset).is_some_and(|c| c.is_ascii_digit()) {
                text.push('e');
                self.advance();
                if matches!(self.current(), Some('+') | Some('-')) {
                    text.push(self.current().unwrap());
                    self.advance();
                }
                while let Some(c) = self.current() {
                    if c.is_ascii_digit() || c == '_' {
                        if c != '_' {
                            text.push(c);
                        }
                        self.advance();
                    } else {
                        break;
                    }
                }
            } else if self.peek(1).is_some_and(|c| c.is_alphabetic()) {
                // `1exp` is an identifier boundary, not an exponent
            } else {
                return Err(self.err(LexErrorKind::InvalidNumber, line, column));
            }
        }

        let value: f64 = text
            .parse()
            .map_err(|_| self.err(LexErrorKind::InvalidNumber, line, column))?;
        Ok(self.token(TokenKind::Number(value), line, column, start))
    }

    fn read_radix(
        &mut self,
        radix: u32,
        line: usize,
        column: usize,
        start: usize,
    ) -> Result<Token, LexError> {
        // Consume `0x` / `0b` / `0o`
        self.advance();
        self.advance();
        let mut text = String::new();
        while let Some(c) = self.current() {
            if c.is_digit(radix) || c == '_' {
                if c != '_' {
                    text.push(c);
                }
                self.advance();
            } else {
                break;
            }
        }
        if text.is_empty() {
            return Err(self.err(LexErrorKind::InvalidNumber, line, column));
        }
        let value = u64::from_str_radix(&text, radix)
            .map_err(|_| self.err(LexErrorKind::InvalidNumber, line, column))?;
        Ok(self.token(TokenKind::Number(value as f64), line, column, start))
    }

    fn read_escape(&mut self) -> Result<char, LexError> {
        let (line, column) = (self.line, self.column);
        self.advance(); // backslash
        let escaped = match self.current() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('\\') => '\\',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('{') => '{',
            _ => return Err(self.err(LexErrorKind::InvalidEscape, line, column)),
        };
        self.advance();
        Ok(escaped)
    }

    fn read_double_string(
        &mut self,
        line: usize,
        column: usize,
        start: usize,
    ) -> Result<Token, LexError> {
        if self.peek(1) == Some('"') && self.peek(2) == Some('"') {
            return self.read_triple_string(line, column, start);
        }

        self.advance(); // opening quote
        let mut parts: Vec<TemplatePart> = Vec::new();
        let mut literal = String::new();
        let mut has_interpolation = false;

        loop {
            match self.current() {
                None | Some('\n') => {
                    return Err(self.err(LexErrorKind::UnterminatedString, line, column))
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => literal.push(self.read_escape()?),
                Some('{') => {
                    has_interpolation = true;
                    if !literal.is_empty() {
                        parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                    }
                    self.advance(); // {
                    let (expr_line, expr_column) = (self.line, self.column);
                    let source = self.read_interpolation_source(line, column)?;
                    parts.push(TemplatePart::Expr {
                        source,
                        line: expr_line,
                        column: expr_column,
                    });
                }
                Some(c) => {
                    literal.push(c);
                    self.advance();
                }
            }
        }

        if has_interpolation {
            if !literal.is_empty() {
                parts.push(TemplatePart::Literal(literal));
            }
            Ok(self.token(TokenKind::TemplateStr(parts), line, column, start))
        } else {
            Ok(self.token(TokenKind::Str(literal), line, column, start))
        }
    }

    /// Raw expression source between interpolation braces. The lexer does
    /// not recurse; it only balances braces and skips over nested string
    /// literals so quoted braces do not end the hole early.
    fn read_interpolation_source(
        &mut self,
        str_line: usize,
        str_column: usize,
    ) -> Result<String, LexError> {
        let mut source = String::new();
        let mut depth = 1usize;
        loop {
            match self.current() {
                None => {
                    return Err(self.err(LexErrorKind::UnterminatedString, str_line, str_column))
                }
                Some('{') => {
                    depth += 1;
                    source.push('{');
                    self.advance();
                }
                Some('}') => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        return Ok(source);
                    }
                    source.push('}');
                }
                Some(q @ '"') | Some(q @ '\'') => {
                    source.push(q);
                    self.advance();
                    while let Some(c) = self.current() {
                        source.push(c);
                        if c == '\\' {
                            self.advance();
                            if let Some(esc) = self.current() {
                                source.push(esc);
                                self.advance();
                            }
                            continue;
                        }
                        self.advance();
                        if c == q {
                            break;
                        }
                    }
                }
                Some(c) => {
                    source.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_single_string(
        &mut self,
        line: usize,
        column: usize,
        start: usize,
    ) -> Result<Token, LexError> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.current() {
                None | Some('\n') => {
                    return Err(self.err(LexErrorKind::UnterminatedString, line, column))
                }
                Some('\'') => {
                    self.advance();
                    return Ok(self.token(TokenKind::Str(text), line, column, start));
                }
                Some('\\') => text.push(self.read_escape()?),
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_triple_string(
        &mut self,
        line: usize,
        column: usize,
        start: usize,
    ) -> Result<Token, LexError> {
        // Consume `"""`
        self.advance();
        self.advance();
        self.advance();
        let mut text = String::new();
        loop {
            match self.current() {
                None => return Err(self.err(LexErrorKind::UnterminatedString, line, column)),
                Some('"') if self.peek(1) == Some('"') && self.peek(2) == Some('"') => {
                    self.advance();
                    self.advance();
                    self.advance();
                    return Ok(self.token(TokenKind::Str(text), line, column, start));
                }
                Some('\\') => text.push(self.read_escape()?),
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Identifiers and keywords
    // ------------------------------------------------------------------

    fn read_identifier(&mut self, line: usize, column: usize, start: usize) -> Token {
        let mut word = String::new();
        while let Some(c) = self.current() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match word.as_str() {
            "shared" => TokenKind::Shared,
            "server" => TokenKind::Server,
            "client" => TokenKind::Client,
            "test" => TokenKind::Test,
            "bench" => TokenKind::Bench,
            "route" => TokenKind::Route,
            "routes" => TokenKind::Routes,
            "state" => TokenKind::State,
            "computed" => TokenKind::Computed,
            "effect" => TokenKind::Effect,
            "component" => TokenKind::Component,
            "store" => TokenKind::Store,
            "fn" => TokenKind::Fn,
            "let" => TokenKind::Let,
            "var" => TokenKind::Var,
            "pub" => TokenKind::Pub,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "match" => TokenKind::Match,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "while" => TokenKind::While,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "type" => TokenKind::Type,
            "import" => TokenKind::Import,
            "from" => TokenKind::From,
            "as" => TokenKind::As,
            "async" => TokenKind::Async,
            "await" => TokenKind::Await,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "throw" => TokenKind::Throw,
            "interface" => TokenKind::Interface,
            "trait" => TokenKind::Trait,
            "impl" => TokenKind::Impl,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => match HttpMethod::from_word(&word) {
                Some(method) => TokenKind::HttpMethod(method),
                None => TokenKind::Ident(word),
            },
        };

        self.token(kind, line, column, start)
    }

    // ------------------------------------------------------------------
    // Operators and delimiters (maximal munch)
    // ------------------------------------------------------------------

    fn read_operator(
        &mut self,
        line: usize,
        column: usize,
        start: usize,
    ) -> Result<Token, LexError> {
        let ch = self.current().unwrap();
        let next = self.peek(1);
        let next2 = self.peek(2);

        let (kind, len) = match (ch, next, next2) {
            ('.', Some('.'), Some('.')) => (TokenKind::Ellipsis, 3),
            ('.', Some('.'), Some('=')) => (TokenKind::DotDotEq, 3),
            ('.', Some('.'), _) => (TokenKind::DotDot, 2),
            ('.', _, _) => (TokenKind::Dot, 1),
            ('+', Some('+'), _) => (TokenKind::PlusPlus, 2),
            ('+', Some('='), _) => (TokenKind::PlusAssign, 2),
            ('+', _, _) => (TokenKind::Plus, 1),
            ('-', Some('>'), _) => (TokenKind::Arrow, 2),
            ('-', Some('='), _) => (TokenKind::MinusAssign, 2),
            ('-', _, _) => (TokenKind::Minus, 1),
            ('*', Some('*'), _) => (TokenKind::StarStar, 2),
            ('*', Some('='), _) => (TokenKind::StarAssign, 2),
            ('*', _, _) => (TokenKind::Star, 1),
            ('/', Some('='), _) => (TokenKind::SlashAssign, 2),
            ('/', _, _) => (TokenKind::Slash, 1),
            ('%', _, _) => (TokenKind::Percent, 1),
            ('=', Some('='), _) => (TokenKind::EqEq, 2),
            ('=', Some('>'), _) => (TokenKind::FatArrow, 2),
            ('=', _, _) => (TokenKind::Assign, 1),
            ('!', Some('='), _) => (TokenKind::NotEq, 2),
            ('!', _, _) => (TokenKind::Bang, 1),
            ('<', Some('='), _) => (TokenKind::Le, 2),
            ('<', _, _) => (TokenKind::Lt, 1),
            ('>', Some('='), _) => (TokenKind::Ge, 2),
            ('>', _, _) => (TokenKind::Gt, 1),
            ('&', Some('&'), _) => (TokenKind::AmpAmp, 2),
            ('|', Some('>'), _) => (TokenKind::PipeOp, 2),
            ('|', Some('|'), _) => (TokenKind::PipePipe, 2),
            ('?', Some('.'), _) => (TokenKind::QuestionDot, 2),
            ('?', Some('?'), _) => (TokenKind::QuestionQuestion, 2),
            ('?', _, _) => (TokenKind::Question, 1),
            (':', Some(':'), _) => (TokenKind::ColonColon, 2),
            (':', _, _) => (TokenKind::Colon, 1),
            (';', _, _) => (TokenKind::Semicolon, 1),
            (',', _, _) => (TokenKind::Comma, 1),
            ('@', _, _) => (TokenKind::At, 1),
            ('(', _, _) => (TokenKind::LParen, 1),
            (')', _, _) => (TokenKind::RParen, 1),
            ('[', _, _) => (TokenKind::LBracket, 1),
            (']', _, _) => (TokenKind::RBracket, 1),
            ('{', _, _) => (TokenKind::LBrace, 1),
            ('}', _, _) => (TokenKind::RBrace, 1),
            _ => return Err(self.err(LexErrorKind::UnrecognizedChar, line, column)),
        };

        match kind {
            TokenKind::LParen | TokenKind::LBracket => self.depth += 1,
            TokenKind::RParen | TokenKind::RBracket => {
                self.depth = self.depth.saturating_sub(1)
            }
            _ => {}
        }

        for _ in 0..len {
            self.advance();
        }
        Ok(self.token(kind, line, column, start))
    }

    pub fn eof_loc(&self) -> Loc {
        self.loc_here(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source, "test.tova")
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Newline && *k != TokenKind::Eof)
            .collect()
    }

    #[test]
    fn test_lexer_basic() {
        let tokens = kinds("fn main() { let x = 42 }");
        assert_eq!(tokens[0], TokenKind::Fn);
        assert_eq!(tokens[1], TokenKind::Ident("main".to_string()));
        assert_eq!(tokens[2], TokenKind::LParen);
        assert_eq!(tokens[3], TokenKind::RParen);
        assert_eq!(tokens[6], TokenKind::Ident("x".to_string()));
        assert_eq!(tokens[8], TokenKind::Number(42.0));
    }

    #[test]
    fn test_lexer_block_keywords() {
        let tokens = kinds("shared server client test bench");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Shared,
                TokenKind::Server,
                TokenKind::Client,
                TokenKind::Test,
                TokenKind::Bench,
            ]
        );
    }

    #[test]
    fn test_lexer_maximal_munch() {
        let tokens = kinds("a ..= b .. c ... |> ?? ?. ** ++");
        assert!(tokens.contains(&TokenKind::DotDotEq));
        assert!(tokens.contains(&TokenKind::DotDot));
        assert!(tokens.contains(&TokenKind::Ellipsis));
        assert!(tokens.contains(&TokenKind::PipeOp));
        assert!(tokens.contains(&TokenKind::QuestionQuestion));
        assert!(tokens.contains(&TokenKind::QuestionDot));
        assert!(tokens.contains(&TokenKind::StarStar));
        assert!(tokens.contains(&TokenKind::PlusPlus));
    }

    #[test]
    fn test_lexer_number_forms() {
        assert_eq!(kinds("1_000_000"), vec![TokenKind::Number(1_000_000.0)]);
        assert_eq!(kinds("0xff"), vec![TokenKind::Number(255.0)]);
        assert_eq!(kinds("0b1010"), vec![TokenKind::Number(10.0)]);
        assert_eq!(kinds("0o17"), vec![TokenKind::Number(15.0)]);
        assert_eq!(kinds("2.5e3"), vec![TokenKind::Number(2500.0)]);
    }

    #[test]
    fn test_lexer_string_interpolation() {
        let tokens = kinds("\"hello {name}!\"");
        match &tokens[0] {
            TokenKind::TemplateStr(parts) => {
                assert_eq!(parts.len(), 3);
                assert_eq!(parts[0], TemplatePart::Literal("hello ".to_string()));
                match &parts[1] {
                    TemplatePart::Expr { source, .. } => assert_eq!(source, "name"),
                    other => panic!("expected expr part, got {:?}", other),
                }
            }
            other => panic!("expected template string, got {:?}", other),
        }
    }

    #[test]
    fn test_lexer_escaped_brace_is_literal() {
        assert_eq!(
            kinds("\"a \\{b}\""),
            vec![TokenKind::Str("a {b}".to_string())]
        );
    }

    #[test]
    fn test_lexer_triple_string() {
        let tokens = kinds("\"\"\"line one\nline two\"\"\"");
        assert_eq!(tokens, vec![TokenKind::Str("line one\nline two".to_string())]);
    }

    #[test]
    fn test_lexer_newline_suppressed_in_brackets() {
        let tokens: Vec<TokenKind> = Lexer::new("[1,\n2]\nx", "t.tova")
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect();
        let newlines = tokens
            .iter()
            .filter(|k| **k == TokenKind::Newline)
            .count();
        // Only the newline after `]` survives
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_lexer_http_methods() {
        let tokens = kinds("route GET \"/users\"");
        assert_eq!(tokens[0], TokenKind::Route);
        assert_eq!(tokens[1], TokenKind::HttpMethod(HttpMethod::Get));
    }

    #[test]
    fn test_lexer_doc_comment() {
        let tokens = kinds("/// adds two numbers\nfn add() {}");
        assert_eq!(tokens[0], TokenKind::Doc("adds two numbers".to_string()));
        assert_eq!(tokens[1], TokenKind::Fn);
    }

    #[test]
    fn test_lexer_nested_block_comment() {
        let tokens = kinds("/* outer /* inner */ still outer */ x");
        assert_eq!(tokens, vec![TokenKind::Ident("x".to_string())]);
    }

    #[test]
    fn test_lexer_unterminated_string() {
        let err = Lexer::new("\"oops", "t.tova").tokenize().unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
    }

    #[test]
    fn test_lexer_locations() {
        let tokens = Lexer::new("let x\nlet yy", "t.tova").tokenize().unwrap();
        assert_eq!(tokens[0].loc.line, 1);
        assert_eq!(tokens[0].loc.column, 1);
        assert_eq!(tokens[1].loc.column, 5);
        assert_eq!(tokens[3].loc.line, 2);
        // `yy` has length 2
        assert_eq!(tokens[4].loc.length, 2);
    }

    #[test]
    fn test_lexer_jsx_text_mode() {
        let mut lexer = Lexer::new("Hello world <b>", "t.tova");
        lexer.set_jsx_text(true);
        let t1 = lexer.next_token().unwrap();
        assert_eq!(t1.kind, TokenKind::JsxText("Hello world".to_string()));
        let t2 = lexer.next_token().unwrap();
        assert_eq!(t2.kind, TokenKind::Lt);
    }

    #[test]
    fn test_lexer_jsx_control_keyword_reserved() {
        let mut lexer = Lexer::new("if visible { x }", "t.tova");
        lexer.set_jsx_text(true);
        let t = lexer.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::If);
    }
}
