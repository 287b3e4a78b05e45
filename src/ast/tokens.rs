use std::fmt;

/// Classification of a single source character.
///
/// Inside a quoted string every character except the end of input is [`CharClass::Char`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// End of input
    Eof,
    /// Space, tab, carriage return or line feed
    Whitespace,
    /// Any other control character
    ControlChar,
    /// `#`, allowed inside words
    Sharp,
    /// Punctuation and everything not covered by the other classes
    Char,
    /// ASCII digit
    Digit,
    /// Alphabetic character
    Alpha,
}

impl CharClass {
    pub fn of(ch: Option<char>, in_string: bool) -> Self {
        match ch {
            None => CharClass::Eof,
            Some(_) if in_string => CharClass::Char,
            Some(c) if c.is_whitespace() => CharClass::Whitespace,
            Some(c) if c.is_control() => CharClass::ControlChar,
            Some('#') => CharClass::Sharp,
            Some(c) if c.is_ascii_digit() => CharClass::Digit,
            Some(c) if c.is_alphabetic() => CharClass::Alpha,
            Some(_) => CharClass::Char,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// End of input
    Eof,

    /// A single control character
    ControlChar,

    /// A single punctuation character
    ///
    /// # Examples
    /// ```text
    /// (  )  ,  .  /  +  -
    /// ```
    Char,

    /// A maximal run of ASCII digits
    ///
    /// Signs, fractions, exponents and type suffixes are assembled by the parser.
    Digits,

    /// A maximal run of letters and `#`
    ///
    /// Keywords, operator names, function names and identifiers are all words.
    ///
    /// # Examples
    /// ```text
    /// eq
    /// startswith
    /// Index
    /// ```
    Word,

    /// Quoted string; the token text is the unescaped content
    ///
    /// # Examples
    /// ```text
    /// 'hello'
    /// 'it''s'
    /// ```
    StringLiteral,
}

/// A classified lexeme with its source position.
///
/// `line` and `column` are 1-based; `offset` and `end` are character indices into the
/// source, `end` being exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
    pub offset: usize,
    pub end: usize,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    pub fn is_char(&self, ch: char) -> bool {
        self.kind == TokenKind::Char && self.text.chars().eq(std::iter::once(ch))
    }

    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Word && self.text == word
    }

    /// True when `self` starts exactly where `previous` ended, with nothing in between.
    pub fn follows(&self, previous_end: usize) -> bool {
        self.offset == previous_end
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::StringLiteral => write!(f, "'{}'", self.text.replace('\'', "''")),
            _ => write!(f, "{}", self.text),
        }
    }
}
