use crate::{
    ast::{CharClass, Token, TokenKind},
    error::{BoxError, ErrorKind, FilterError},
};

/// A location in the filter source. `line` and `column` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

/// Turns filter text into tokens, one at a time.
///
/// Only the cursor state is kept; the parser pulls the next token with
/// [`Lexer::next_token`] and never sees more than one token at once.
pub struct Lexer {
    source: Vec<char>,
    index: usize,
    current_char: Option<char>,
    current_char_class: CharClass,
    in_string: bool,
    after_cr: bool,
    line: u32,
    column: u32,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let source: Vec<char> = input.chars().collect();
        let current_char = source.first().copied();
        Lexer {
            current_char_class: CharClass::of(current_char, false),
            source,
            index: 0,
            current_char,
            in_string: false,
            after_cr: false,
            line: 1,
            column: 1,
        }
    }

    pub fn source(&self) -> &[char] {
        &self.source
    }

    /// Position of the character under the cursor.
    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
            offset: self.index,
        }
    }

    /// Advance one character. Returns false once the end of input is reached.
    pub fn next_char(&mut self) -> bool {
        let Some(previous) = self.current_char else {
            return false;
        };

        match previous {
            '\r' => {
                self.line += 1;
                self.column = 1;
            }
            '\n' if !self.after_cr => {
                self.line += 1;
                self.column = 1;
            }
            '\n' => self.column = 1,
            _ => self.column += 1,
        }
        self.after_cr = previous == '\r';

        self.index += 1;
        self.current_char = self.source.get(self.index).copied();
        self.current_char_class = CharClass::of(self.current_char, self.in_string);
        self.current_char.is_some()
    }

    /// The next non-whitespace character after the cursor, without consuming anything.
    ///
    /// Called while the parser holds a token, this looks just past that token.
    pub fn peek(&self) -> Option<char> {
        self.source[self.index..]
            .iter()
            .copied()
            .find(|c| CharClass::of(Some(*c), false) != CharClass::Whitespace)
    }

    pub fn syntax_error(&self, reason: impl Into<String>, cause: Option<BoxError>) -> FilterError {
        FilterError::new(ErrorKind::Syntax, &self.source, self.position(), reason, cause)
    }

    fn skip_whitespace(&mut self) {
        while self.current_char_class == CharClass::Whitespace {
            self.next_char();
        }
    }

    fn scan_run(&mut self, accept: impl Fn(CharClass) -> bool) -> String {
        let mut text = String::new();
        while accept(self.current_char_class) {
            if let Some(ch) = self.current_char {
                text.push(ch);
            }
            self.next_char();
        }
        text
    }

    /// Scan a quoted string starting at the cursor; `''` inside stands for one quote.
    ///
    /// Returns `Ok(None)` without consuming anything when the cursor is not on a quote.
    fn scan_string(&mut self) -> Result<Option<String>, FilterError> {
        if self.current_char != Some('\'') {
            return Ok(None);
        }

        let mut text = String::new();
        self.in_string = true;
        self.next_char(); // Consume opening quote

        loop {
            match self.current_char {
                None => {
                    self.in_string = false;
                    return Err(self.syntax_error("Unterminated string literal.", None));
                }
                Some('\'') => {
                    self.in_string = false;
                    self.next_char();
                    if self.current_char == Some('\'') {
                        // Escaped quote
                        self.in_string = true;
                        text.push('\'');
                        self.next_char();
                    } else {
                        return Ok(Some(text));
                    }
                }
                Some(ch) => {
                    text.push(ch);
                    self.next_char();
                }
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, FilterError> {
        self.skip_whitespace();

        let start = self.position();
        let (kind, text) = match self.current_char_class {
            CharClass::Eof => (TokenKind::Eof, String::new()),
            CharClass::Digit => (
                TokenKind::Digits,
                self.scan_run(|class| class == CharClass::Digit),
            ),
            CharClass::Alpha | CharClass::Sharp => (
                TokenKind::Word,
                self.scan_run(|class| matches!(class, CharClass::Alpha | CharClass::Sharp)),
            ),
            // Whitespace was skipped above
            class => match self.scan_string()? {
                Some(text) => (TokenKind::StringLiteral, text),
                None => {
                    let text = self.current_char.map(String::from).unwrap_or_default();
                    self.next_char();
                    let kind = if class == CharClass::ControlChar {
                        TokenKind::ControlChar
                    } else {
                        TokenKind::Char
                    };
                    (kind, text)
                }
            },
        };

        Ok(Token {
            kind,
            text,
            line: start.line,
            column: start.column,
            offset: start.offset,
            end: self.index,
        })
    }
}

#[cfg(test)]
fn kinds(input: &str) -> Vec<(TokenKind, String)> {
    let mut lexer = Lexer::new(input);
    let mut out = Vec::new();
    loop {
        let token = lexer.next_token().unwrap();
        if token.is_eof() {
            return out;
        }
        out.push((token.kind, token.text));
    }
}

#[test]
fn test_word_digit_and_char_runs() {
    assert_eq!(
        kinds("Index gt 3"),
        vec![
            (TokenKind::Word, "Index".to_string()),
            (TokenKind::Word, "gt".to_string()),
            (TokenKind::Digits, "3".to_string()),
        ]
    );
    assert_eq!(
        kinds("3.5f"),
        vec![
            (TokenKind::Digits, "3".to_string()),
            (TokenKind::Char, ".".to_string()),
            (TokenKind::Digits, "5".to_string()),
            (TokenKind::Word, "f".to_string()),
        ]
    );
}

#[test]
fn test_escaped_quote() {
    let mut lexer = Lexer::new("'it''s'");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::StringLiteral);
    assert_eq!(token.text, "it's");
    assert!(lexer.next_token().unwrap().is_eof());
}

#[test]
fn test_line_and_column_tracking() {
    let mut lexer = Lexer::new("A\r\n  eq\nB");
    let a = lexer.next_token().unwrap();
    assert_eq!((a.line, a.column), (1, 1));
    let eq = lexer.next_token().unwrap();
    assert_eq!((eq.line, eq.column), (2, 3));
    let b = lexer.next_token().unwrap();
    assert_eq!((b.line, b.column), (3, 1));
}

#[test]
fn test_peek_skips_whitespace() {
    let mut lexer = Lexer::new("-   3");
    let minus = lexer.next_token().unwrap();
    assert!(minus.is_char('-'));
    assert_eq!(lexer.peek(), Some('3'));
}
