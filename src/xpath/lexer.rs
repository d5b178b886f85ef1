//! XPath Lexer
//!
//! Tokenizes XPath expressions on demand. Every token remembers the byte
//! offset it starts at so syntax errors can point into the query.
//! `and`, `or`, `div` and `mod` come out as plain names; the parser decides
//! from position whether they are operators.

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // *
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(f64),
    String(String),

    // Names: NCName, QName, or prefix:*
    Name(String),
    // $name
    Variable(String),

    // Special
    DoubleColon, // ::
    Comma,       // ,

    // Anything the grammar has no token for
    Invalid,

    // End of input
    Eof,
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    token_start: usize,
}

#[inline]
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// Name start: ASCII letter, underscore, or any byte of a non-ASCII char
#[inline]
fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

#[inline]
fn is_name_char(b: u8) -> bool {
    is_name_start(b) || b.is_ascii_digit() || b == b'-' || b == b'.'
}

impl<'a> Lexer<'a> {
    /// Create a new lexer
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            token_start: 0,
        }
    }

    /// Byte offset where the last returned token starts
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    #[inline]
    fn byte_at(&self, pos: usize) -> Option<u8> {
        self.input.as_bytes().get(pos).copied()
    }

    /// Whether the next non-space character is `(`
    pub fn next_is_open_paren(&self) -> bool {
        let mut pos = self.pos;
        while self.byte_at(pos).is_some_and(is_space) {
            pos += 1;
        }
        self.byte_at(pos) == Some(b'(')
    }

    /// Produce the next token
    pub fn next_token(&mut self) -> Token {
        while self.byte_at(self.pos).is_some_and(is_space) {
            self.pos += 1;
        }
        self.token_start = self.pos;

        let Some(b) = self.byte_at(self.pos) else {
            return Token::Eof;
        };
        let next = self.byte_at(self.pos + 1);

        let (token, len) = match b {
            b'>' if next == Some(b'=') => (Token::GtEq, 2),
            b'>' => (Token::Gt, 1),
            b'<' if next == Some(b'=') => (Token::LtEq, 2),
            b'<' => (Token::Lt, 1),
            b'!' if next == Some(b'=') => (Token::NotEq, 2),
            b'=' => (Token::Eq, 1),
            b'+' => (Token::Plus, 1),
            b'-' => (Token::Minus, 1),
            b'*' => (Token::Star, 1),
            b'|' => (Token::Pipe, 1),
            b'(' => (Token::LeftParen, 1),
            b')' => (Token::RightParen, 1),
            b'[' => (Token::LeftBracket, 1),
            b']' => (Token::RightBracket, 1),
            b',' => (Token::Comma, 1),
            b'@' => (Token::At, 1),
            b'/' if next == Some(b'/') => (Token::DoubleSlash, 2),
            b'/' => (Token::Slash, 1),
            b':' if next == Some(b':') => (Token::DoubleColon, 2),
            b'$' => return self.read_variable(),
            b'"' | b'\'' => return self.read_string(b),
            b'.' if next == Some(b'.') => (Token::DoubleDot, 2),
            b'.' if next.is_some_and(|c| c.is_ascii_digit()) => return self.read_number(),
            b'.' => (Token::Dot, 1),
            b'0'..=b'9' => return self.read_number(),
            _ if is_name_start(b) => return self.read_name(),
            _ => (Token::Invalid, 1),
        };
        self.pos += len;
        token
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        while self.byte_at(self.pos).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.byte_at(self.pos) == Some(b'.') {
            self.pos += 1;
            while self.byte_at(self.pos).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text = &self.input[start..self.pos];
        Token::Number(text.parse().unwrap_or(f64::NAN))
    }

    fn read_string(&mut self, quote: u8) -> Token {
        let start = self.pos + 1;
        match self.input.as_bytes()[start..].iter().position(|&c| c == quote) {
            Some(len) => {
                self.pos = start + len + 1;
                Token::String(self.input[start..start + len].to_string())
            }
            None => Token::Invalid,
        }
    }

    /// NCName, optionally followed by `:NCName` or `:*`
    fn scan_qname(&mut self) -> &'a str {
        let start = self.pos;
        while self.byte_at(self.pos).is_some_and(is_name_char) {
            self.pos += 1;
        }
        if self.byte_at(self.pos) == Some(b':') {
            match self.byte_at(self.pos + 1) {
                Some(b'*') => self.pos += 2,
                Some(c) if is_name_start(c) => {
                    self.pos += 2;
                    while self.byte_at(self.pos).is_some_and(is_name_char) {
                        self.pos += 1;
                    }
                }
                _ => {}
            }
        }
        &self.input[start..self.pos]
    }

    fn read_name(&mut self) -> Token {
        Token::Name(self.scan_qname().to_string())
    }

    fn read_variable(&mut self) -> Token {
        self.pos += 1;
        if !self.byte_at(self.pos).is_some_and(is_name_start) {
            return Token::Invalid;
        }
        Token::Variable(self.scan_qname().to_string())
    }
}
