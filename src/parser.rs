use std::mem;

use rust_decimal::Decimal;

use crate::{
    ast::{Expr, Literal, Token, TokenKind, literal::parse_datetime},
    builder::ExpressionBuilder,
    error::{BoxError, BuildError, ErrorKind, FilterError},
    filter::DEFAULT_MAX_DEPTH,
    functions::is_function_name,
    lexer::{Lexer, Position},
};

/// Recursive-descent parser, one method per grammar production.
///
/// Nodes are built through the [`ExpressionBuilder`] while descending, so every
/// production returns a fully resolved subtree.
pub struct Parser<'a> {
    lexer: Lexer,
    current_token: Token,
    builder: ExpressionBuilder<'a>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer, builder: ExpressionBuilder<'a>) -> Result<Self, FilterError> {
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
            builder,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Move to the next token, returning the one just consumed.
    fn advance(&mut self) -> Result<Token, FilterError> {
        let next = self.lexer.next_token()?;
        Ok(mem::replace(&mut self.current_token, next))
    }

    fn position(&self) -> Position {
        Position {
            line: self.current_token.line,
            column: self.current_token.column,
            offset: self.current_token.offset,
        }
    }

    fn error(&self, reason: impl Into<String>) -> FilterError {
        self.error_at(self.position(), reason, None)
    }

    fn error_at(
        &self,
        position: Position,
        reason: impl Into<String>,
        cause: Option<BoxError>,
    ) -> FilterError {
        FilterError::new(ErrorKind::Syntax, self.lexer.source(), position, reason, cause)
    }

    fn semantic_error(&self, position: Position, error: BuildError) -> FilterError {
        FilterError::new(
            ErrorKind::Semantic,
            self.lexer.source(),
            position,
            error.to_string(),
            Some(Box::new(error)),
        )
    }

    fn expect_char(&mut self, ch: char, expected: &str) -> Result<Token, FilterError> {
        if !self.current_token.is_char(ch) {
            return Err(self.error(format!("Expected: {}.", expected)));
        }
        self.advance()
    }

    /// Run a nested production, refusing to go deeper than `max_depth`.
    fn descend<T>(
        &mut self,
        production: fn(&mut Self) -> Result<T, FilterError>,
    ) -> Result<T, FilterError> {
        if self.depth >= self.max_depth {
            return Err(self.error(format!(
                "Expression nesting exceeds the maximum depth of {}.",
                self.max_depth
            )));
        }
        self.depth += 1;
        let result = production(self);
        self.depth -= 1;
        result
    }

    fn peek_is_digit(&self) -> bool {
        self.lexer.peek().is_some_and(|c| c.is_ascii_digit())
    }

    /// The current word is glued to digits or `_`, so it is only the start of a name.
    fn continues_name(&self) -> bool {
        self.lexer
            .source()
            .get(self.current_token.end)
            .is_some_and(|c| c.is_ascii_digit() || *c == '_')
    }

    fn is_keyword(&self, word: &str) -> bool {
        self.current_token.is_word(word) && !self.continues_name()
    }

    fn at_name(&self) -> bool {
        self.current_token.kind == TokenKind::Word || self.current_token.is_char('_')
    }

    fn binary_operator(&self, keywords: &[&'static str]) -> Option<&'static str> {
        if self.current_token.kind != TokenKind::Word {
            return None;
        }
        keywords
            .iter()
            .copied()
            .find(|keyword| self.current_token.text == *keyword)
    }

    fn additive_operator(&self) -> Option<&'static str> {
        if self.current_token.is_char('+') {
            Some("add")
        } else if self.current_token.is_char('-') {
            Some("sub")
        } else {
            self.binary_operator(&["add", "sub"])
        }
    }

    /// Parse a complete filter; anything after the expression is an error.
    pub fn parse(&mut self) -> Result<Expr, FilterError> {
        let expr = self.parse_expr()?;
        if !self.current_token.is_eof() {
            return Err(self.error("Expected: end of expression."));
        }
        Ok(expr)
    }

    pub fn parse_expr(&mut self) -> Result<Expr, FilterError> {
        self.descend(Self::parse_or_expr)
    }

    /// `operand (op operand)*`, grouped to the right: `a op b op c` is `a op (b op c)`.
    ///
    /// The chain is collected in a loop, so its length costs no stack.
    fn parse_binary_chain(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, FilterError>,
        operator: fn(&Self) -> Option<&'static str>,
    ) -> Result<Expr, FilterError> {
        let start = self.position();
        let mut operands = vec![(start, operand(self)?)];
        let mut ops = Vec::new();
        while let Some(op) = operator(self) {
            self.advance()?;
            ops.push(op);
            let start = self.position();
            operands.push((start, operand(self)?));
        }

        let Some((_, mut right)) = operands.pop() else {
            return Err(self.error("Expected: Expr."));
        };
        while let (Some(op), Some((start, left))) = (ops.pop(), operands.pop()) {
            right = self
                .builder
                .build_simple_binary(op, left, right)
                .map_err(|e| self.semantic_error(start, e))?;
        }
        Ok(right)
    }

    fn parse_or_expr(&mut self) -> Result<Expr, FilterError> {
        self.parse_binary_chain(Self::parse_and_expr, |p| p.binary_operator(&["or"]))
    }

    fn parse_and_expr(&mut self) -> Result<Expr, FilterError> {
        self.parse_binary_chain(Self::parse_equality_expr, |p| p.binary_operator(&["and"]))
    }

    fn parse_equality_expr(&mut self) -> Result<Expr, FilterError> {
        self.parse_binary_chain(Self::parse_relational_expr, |p| {
            p.binary_operator(&["eq", "ne"])
        })
    }

    fn parse_relational_expr(&mut self) -> Result<Expr, FilterError> {
        self.parse_binary_chain(Self::parse_additive_expr, |p| {
            p.binary_operator(&["lt", "gt", "le", "ge"])
        })
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, FilterError> {
        self.parse_binary_chain(Self::parse_multiplicative_expr, Self::additive_operator)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, FilterError> {
        self.parse_binary_chain(Self::parse_unary_expr, |p| {
            p.binary_operator(&["mul", "div", "mod"])
        })
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, FilterError> {
        // A sign directly before digits belongs to the number literal
        let op = if self.is_keyword("not") {
            "not"
        } else if self.current_token.is_char('-') && !self.peek_is_digit() {
            "minus"
        } else if self.current_token.is_char('+') && !self.peek_is_digit() {
            "plus"
        } else {
            return self.parse_primary_expr();
        };
        let start = self.position();
        self.advance()?;
        let operand = self.descend(Self::parse_unary_expr)?;
        self.builder
            .build_unary(op, operand)
            .map_err(|e| self.semantic_error(start, e))
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, FilterError> {
        if let Some(expr) = self.try_null_literal()? {
            return Ok(expr);
        }
        if let Some(expr) = self.try_paren_expr()? {
            return Ok(expr);
        }
        if let Some(expr) = self.try_literal_expr()? {
            return Ok(expr);
        }
        if let Some(expr) = self.try_function_call()? {
            return Ok(expr);
        }
        if let Some(expr) = self.try_member_path()? {
            return Ok(expr);
        }
        Err(self.error("Expected: Expr."))
    }

    fn try_null_literal(&mut self) -> Result<Option<Expr>, FilterError> {
        if !(self.is_keyword("null") || self.is_keyword("NULL")) {
            return Ok(None);
        }
        self.advance()?;
        Ok(Some(self.builder.build_constant(Literal::Null)))
    }

    fn try_paren_expr(&mut self) -> Result<Option<Expr>, FilterError> {
        if !self.current_token.is_char('(') {
            return Ok(None);
        }
        self.advance()?;
        let expr = self.parse_expr()?;
        self.expect_char(')', "')'")?;
        Ok(Some(expr))
    }

    fn try_literal_expr(&mut self) -> Result<Option<Expr>, FilterError> {
        if let Some(expr) = self.try_point_literal()? {
            return Ok(Some(expr));
        }
        if let Some(literal) = self.try_datetime_literal()? {
            return Ok(Some(self.builder.build_constant(literal)));
        }
        if self.current_token.kind == TokenKind::StringLiteral {
            let token = self.advance()?;
            return Ok(Some(self.builder.build_constant(Literal::String(token.text))));
        }
        for (word, value) in [("true", true), ("false", false)] {
            if self.is_keyword(word) {
                self.advance()?;
                return Ok(Some(self.builder.build_constant(Literal::Boolean(value))));
            }
        }
        match self.try_number_literal()? {
            Some(literal) => Ok(Some(self.builder.build_constant(literal))),
            None => Ok(None),
        }
    }

    /// `POINT(x y)` or `POINT(x y z)`
    fn try_point_literal(&mut self) -> Result<Option<Expr>, FilterError> {
        if !self.current_token.is_word("POINT") || self.lexer.peek() != Some('(') {
            return Ok(None);
        }
        let start = self.position();
        self.advance()?;
        self.expect_char('(', "'('")?;

        let x = self.parse_coordinate()?;
        let y = self.parse_coordinate()?;
        let z = if self.current_token.is_char(')') {
            None
        } else {
            Some(self.parse_coordinate()?)
        };
        self.expect_char(')', "')'")?;

        self.builder
            .build_point_constant(x, y, z)
            .map(Some)
            .map_err(|e| self.semantic_error(start, e))
    }

    fn parse_coordinate(&mut self) -> Result<f64, FilterError> {
        let position = self.position();
        match self.try_number_literal()? {
            Some(literal) => literal
                .as_f64()
                .ok_or_else(|| self.error_at(position, "Expected: number.", None)),
            None => Err(self.error("Expected: number.")),
        }
    }

    /// `datetime'…'`
    fn try_datetime_literal(&mut self) -> Result<Option<Literal>, FilterError> {
        if !self.current_token.is_word("datetime") || self.lexer.peek() != Some('\'') {
            return Ok(None);
        }
        self.advance()?;
        if self.current_token.kind != TokenKind::StringLiteral {
            return Err(self.error("Expected: string."));
        }
        let value = parse_datetime(&self.current_token.text).map_err(|e| {
            self.error_at(
                self.position(),
                format!("Invalid datetime literal: {}.", self.current_token.text),
                Some(Box::new(e)),
            )
        })?;
        self.advance()?;
        Ok(Some(Literal::DateTime(value)))
    }

    /// A type suffix glued to the number text ending at `end`.
    fn at_suffix(&self, end: usize, suffixes: &[&str]) -> bool {
        self.current_token.kind == TokenKind::Word
            && self.current_token.follows(end)
            && suffixes.contains(&self.current_token.text.as_str())
    }

    fn expect_digits(&mut self, adjacent_to: Option<usize>) -> Result<Token, FilterError> {
        let adjacent = adjacent_to.is_none_or(|end| self.current_token.follows(end));
        if self.current_token.kind != TokenKind::Digits || !adjacent {
            return Err(self.error("Expected: digits."));
        }
        self.advance()
    }

    fn number_literal<E>(
        &self,
        start: Position,
        text: &str,
        parsed: Result<Literal, E>,
    ) -> Result<Option<Literal>, FilterError>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        parsed.map(Some).map_err(|e| {
            self.error_at(
                start,
                format!("Invalid number literal: {}.", text),
                Some(Box::new(e)),
            )
        })
    }

    /// Signed number with optional fraction, exponent and type suffix.
    fn try_number_literal(&mut self) -> Result<Option<Literal>, FilterError> {
        let start = self.position();
        let mut text = String::new();

        if (self.current_token.is_char('-') || self.current_token.is_char('+')) && self.peek_is_digit() {
            let sign = self.advance()?;
            if sign.text == "-" {
                text.push('-');
            }
        } else if self.current_token.kind != TokenKind::Digits {
            return Ok(None);
        }

        let digits = self.expect_digits(None)?;
        text.push_str(&digits.text);
        let mut end = digits.end;
        let mut is_integer = true;

        if self.at_suffix(end, &["L"]) {
            self.advance()?;
            return self.number_literal(start, &text, text.parse::<i64>().map(Literal::Int64));
        }

        if self.current_token.is_char('.') && self.current_token.follows(end) {
            let dot = self.advance()?;
            let fraction = self.expect_digits(Some(dot.end))?;
            text.push('.');
            text.push_str(&fraction.text);
            end = fraction.end;
            is_integer = false;
        }

        if self.at_suffix(end, &["f"]) {
            self.advance()?;
            return self.number_literal(start, &text, text.parse::<f32>().map(Literal::Single));
        }

        if self.at_suffix(end, &["e", "E"]) {
            let marker = self.advance()?;
            text.push('e');
            let mut exponent_end = marker.end;
            if (self.current_token.is_char('-') || self.current_token.is_char('+'))
                && self.current_token.follows(exponent_end)
            {
                let sign = self.advance()?;
                text.push_str(&sign.text);
                exponent_end = sign.end;
            }
            let exponent = self.expect_digits(Some(exponent_end))?;
            text.push_str(&exponent.text);
            end = exponent.end;
            is_integer = false;
        }

        if self.at_suffix(end, &["m", "M"]) {
            self.advance()?;
            let parsed = if text.contains('e') {
                Decimal::from_scientific(&text)
            } else {
                text.parse::<Decimal>()
            };
            return self.number_literal(start, &text, parsed.map(Literal::Decimal));
        }

        if self.at_suffix(end, &["d", "D"]) {
            self.advance()?;
            return self.number_literal(start, &text, text.parse::<f64>().map(Literal::Double));
        }

        if is_integer {
            self.number_literal(start, &text, text.parse::<i32>().map(Literal::Int32))
        } else {
            self.number_literal(start, &text, text.parse::<f64>().map(Literal::Double))
        }
    }

    fn try_function_call(&mut self) -> Result<Option<Expr>, FilterError> {
        if self.current_token.kind != TokenKind::Word
            || !is_function_name(&self.current_token.text)
            || self.lexer.peek() != Some('(')
        {
            return Ok(None);
        }
        let start = self.position();
        let name = self.advance()?.text.to_lowercase();
        self.expect_char('(', "'('")?;
        let mut args = if self.current_token.is_char(')') {
            Vec::new()
        } else {
            self.parse_arguments()?
        };
        self.expect_char(')', "')'")?;

        if name == "isof" {
            args.insert(0, Expr::CurrentContent);
        }

        self.builder
            .build_global_call(&name, args)
            .map(Some)
            .map_err(|e| self.semantic_error(start, e))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, FilterError> {
        let mut args = vec![self.parse_expr()?];
        while self.current_token.is_char(',') {
            self.advance()?;
            args.push(self.parse_expr()?);
        }
        Ok(args)
    }

    /// A word (or `_`) followed by directly adjacent words, digits and underscores.
    fn parse_name(&mut self) -> Result<String, FilterError> {
        if !self.at_name() {
            return Err(self.error("Expected: name."));
        }
        let first = self.advance()?;
        let mut name = first.text;
        let mut end = first.end;
        while self.current_token.follows(end)
            && (matches!(self.current_token.kind, TokenKind::Word | TokenKind::Digits)
                || self.current_token.is_char('_'))
        {
            let part = self.advance()?;
            name.push_str(&part.text);
            end = part.end;
        }
        Ok(name)
    }

    /// `[Name ("." Name)* "/"]* Name ("/" Name)* ["(" ")"]`
    fn try_member_path(&mut self) -> Result<Option<Expr>, FilterError> {
        if !self.at_name() {
            return Ok(None);
        }
        let start = self.position();
        let mut type_name: Option<String> = None;
        let mut names: Vec<String> = Vec::new();

        loop {
            let segment_start = self.position();
            let mut segment = vec![self.parse_name()?];
            while self.current_token.is_char('.') {
                self.advance()?;
                segment.push(self.parse_name()?);
            }

            if segment.len() > 1 {
                if !self.current_token.is_char('/') {
                    return Err(self.error("Expected: / after namespace."));
                }
                if !names.is_empty() || type_name.is_some() {
                    return Err(self.error_at(segment_start, "Unexpected type qualifier.", None));
                }
                self.advance()?;
                type_name = Some(segment.join("."));
                continue;
            }

            names.append(&mut segment);
            if !self.current_token.is_char('/') {
                break;
            }
            self.advance()?;
        }

        if type_name.is_none() && names.len() == 1 && names[0] == "ContentType" {
            names.push("Name".to_string());
        }

        // Call-style suffix without arguments is ignored
        if self.current_token.is_char('(') {
            self.advance()?;
            self.expect_char(')', "')'")?;
        }

        self.builder
            .build_member_path(type_name.as_deref(), &names)
            .map(Some)
            .map_err(|e| self.semantic_error(start, e))
    }
}
