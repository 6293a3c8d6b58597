//! Formula tokenizer
//!
//! Converts formula strings like "=SUM(A1:A3) * 1.1" into a sequence of tokens
//! that can be parsed into an AST. The tokenizer is an iterator: tokens are
//! produced on demand and the sequence ends after the first error.

use std::iter::Peekable;
use std::str::Chars;

use crate::core::reference::{CellCoord, RangeRef};
use crate::error::FormulaError;

/// A token in a formula expression
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A numeric literal (e.g., 123, 45.67, .5, 1.5e10)
    Number(f64),
    /// A double-quoted string literal, with `""` unescaped to `"`
    Text(String),
    /// TRUE or FALSE
    Boolean(bool),
    /// A single cell reference (e.g., A1, $B$2)
    CellRef(CellCoord),
    /// A range reference (e.g., A1:C10)
    RangeRef(RangeRef),
    /// A function name, uppercased. Only produced when followed by '('
    Ident(String),
    /// Binary/comparison operators: + - * / ^ & = <> >= <= < >
    Operator(String),
    /// Opening parenthesis
    OpenParen,
    /// Closing parenthesis
    CloseParen,
    /// Comma separator for function arguments
    Comma,
}

/// Error during tokenization
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizeError {
    pub message: String,
    pub position: usize,
}

impl TokenizeError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl std::fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tokenize error at position {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for TokenizeError {}

impl From<TokenizeError> for FormulaError {
    fn from(err: TokenizeError) -> Self {
        FormulaError::Syntax(err.to_string())
    }
}

/// Tokenizer for formula expressions
pub struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
    failed: bool,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer for the given formula string
    pub fn new(formula: &'a str) -> Self {
        // Formulas start with '='; the marker is not part of the expression
        let formula = formula.trim_start();
        let formula = formula.strip_prefix('=').unwrap_or(formula);
        Self {
            chars: formula.chars().peekable(),
            position: 0,
            failed: false,
        }
    }

    /// Tokenize the entire formula into a vector of tokens
    pub fn tokenize(self) -> Result<Vec<Token>, TokenizeError> {
        self.collect()
    }

    /// Get the next token, or None if at end of input
    fn next_token(&mut self) -> Result<Option<Token>, TokenizeError> {
        self.skip_whitespace();

        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '"' => self.read_string()?,

            '(' => {
                self.advance();
                Token::OpenParen
            }
            ')' => {
                self.advance();
                Token::CloseParen
            }
            ',' => {
                self.advance();
                Token::Comma
            }

            '+' | '-' | '*' | '/' | '^' | '&' | '=' => {
                self.advance();
                Token::Operator(c.to_string())
            }
            '<' => self.read_less_than_operator(),
            '>' => self.read_greater_than_operator(),

            c if c.is_ascii_digit() => self.read_number()?,
            '.' if self.peek_second().is_some_and(|n| n.is_ascii_digit()) => self.read_number()?,

            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => self.read_word()?,

            c => {
                return Err(TokenizeError::new(
                    format!("Unexpected character: '{}'", c),
                    self.position,
                ));
            }
        };
        Ok(Some(token))
    }

    /// Peek at the next character without consuming it
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Peek one character past the next one
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    /// First non-whitespace character ahead, without consuming anything
    fn peek_past_whitespace(&self) -> Option<char> {
        self.chars.clone().find(|c| !c.is_whitespace())
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn advance_while(&mut self, buf: &mut String, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            buf.push(c);
            self.advance();
        }
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Read a double-quoted string literal
    fn read_string(&mut self) -> Result<Token, TokenizeError> {
        let start_pos = self.position;
        self.advance(); // opening quote
        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    return Err(TokenizeError::new("Unterminated string literal", start_pos));
                }
                Some('"') => {
                    // A doubled quote is a literal quote
                    if self.peek() == Some('"') {
                        value.push('"');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => value.push(c),
            }
        }

        Ok(Token::Text(value))
    }

    /// Read a number (integer, decimal, or scientific notation)
    fn read_number(&mut self) -> Result<Token, TokenizeError> {
        let start_pos = self.position;
        let mut num_str = String::new();

        self.advance_while(&mut num_str, |c| c.is_ascii_digit());

        if self.peek() == Some('.') {
            num_str.push('.');
            self.advance();
            self.advance_while(&mut num_str, |c| c.is_ascii_digit());
        }

        // Exponent part (e.g., 1.5e10, 2E-5)
        if matches!(self.peek(), Some('e' | 'E')) {
            num_str.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                num_str.push(sign);
                self.advance();
            }
            self.advance_while(&mut num_str, |c| c.is_ascii_digit());
        }

        num_str
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Token::Number)
            .ok_or_else(|| TokenizeError::new(format!("Invalid number: {}", num_str), start_pos))
    }

    /// Read a word: function name, cell reference, range, or boolean
    fn read_word(&mut self) -> Result<Token, TokenizeError> {
        let start_pos = self.position;
        let mut word = String::new();
        self.advance_while(&mut word, |c| c.is_ascii_alphanumeric() || c == '_' || c == '$');

        if self.peek_past_whitespace() == Some('(') {
            let valid_name = word
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && !word.contains('$');
            if !valid_name {
                return Err(TokenizeError::new(
                    format!("Invalid function name: '{}'", word),
                    start_pos,
                ));
            }
            return Ok(Token::Ident(word.to_ascii_uppercase()));
        }

        if let Some(start) = CellCoord::parse(&word) {
            if self.peek() != Some(':') {
                return Ok(Token::CellRef(start));
            }
            self.advance(); // ':'
            let end_pos = self.position;
            let mut end_word = String::new();
            self.advance_while(&mut end_word, |c| c.is_ascii_alphanumeric() || c == '$');
            let end = CellCoord::parse(&end_word).ok_or_else(|| {
                TokenizeError::new(
                    format!("Invalid range end: '{}:{}'", word, end_word),
                    end_pos,
                )
            })?;
            return Ok(Token::RangeRef(RangeRef::new(start, end)));
        }

        match word.to_ascii_uppercase().as_str() {
            "TRUE" => Ok(Token::Boolean(true)),
            "FALSE" => Ok(Token::Boolean(false)),
            _ => Err(TokenizeError::new(
                format!("Unknown name: '{}'", word),
                start_pos,
            )),
        }
    }

    /// Read operators starting with '<'
    fn read_less_than_operator(&mut self) -> Token {
        self.advance(); // consume '<'

        match self.peek() {
            Some('=') => {
                self.advance();
                Token::Operator("<=".to_string())
            }
            Some('>') => {
                self.advance();
                Token::Operator("<>".to_string())
            }
            _ => Token::Operator("<".to_string()),
        }
    }

    /// Read operators starting with '>'
    fn read_greater_than_operator(&mut self) -> Token {
        self.advance(); // consume '>'

        match self.peek() {
            Some('=') => {
                self.advance();
                Token::Operator(">=".to_string())
            }
            _ => Token::Operator(">".to_string()),
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Convenience function to tokenize a formula string
pub fn tokenize(formula: &str) -> Result<Vec<Token>, TokenizeError> {
    Tokenizer::new(formula).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(s: &str) -> Token {
        Token::Operator(s.to_string())
    }

    fn cell(a1: &str) -> Token {
        Token::CellRef(CellCoord::parse(a1).unwrap())
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(tokenize("42").unwrap(), vec![Token::Number(42.0)]);
        assert_eq!(tokenize("3.567").unwrap(), vec![Token::Number(3.567)]);
        assert_eq!(tokenize(".5").unwrap(), vec![Token::Number(0.5)]);
        assert_eq!(tokenize("1.5e10").unwrap(), vec![Token::Number(1.5e10)]);
        assert_eq!(tokenize("2E-5").unwrap(), vec![Token::Number(2e-5)]);
    }

    #[test]
    fn test_tokenize_string_escaped_quotes() {
        let tokens = tokenize("\"say \"\"hi\"\"\"").unwrap();
        assert_eq!(tokens, vec![Token::Text("say \"hi\"".to_string())]);
    }

    #[test]
    fn test_tokenize_single_quotes_rejected() {
        let err = tokenize("'hello'").unwrap_err();
        assert!(err.message.contains("Unexpected"));
    }

    #[test]
    fn test_tokenize_cell_and_range_refs() {
        assert_eq!(tokenize("=a1").unwrap(), vec![cell("A1")]);
        assert_eq!(
            tokenize("B2:C10").unwrap(),
            vec![Token::RangeRef(RangeRef::new(
                CellCoord::new(2, 2),
                CellCoord::new(10, 3)
            ))]
        );
        assert_eq!(tokenize("$A$1").unwrap(), vec![cell("A1")]);
    }

    #[test]
    fn test_tokenize_function_call() {
        let tokens = tokenize("=sum (A1, 2)").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("SUM".to_string()),
                Token::OpenParen,
                cell("A1"),
                Token::Comma,
                Token::Number(2.0),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn test_function_name_that_looks_like_a_cell() {
        // LOG10( is a function name, not cell LOG10
        let tokens = tokenize("LOG10(1)").unwrap();
        assert_eq!(tokens[0], Token::Ident("LOG10".to_string()));
    }

    #[test]
    fn test_tokenize_all_operators() {
        let tokens = tokenize("1 + 2 - 3 * 4 / 5 ^ 6 & 7 = 8 <> 9 <= 10 >= 11 < 12 > 13").unwrap();
        let ops: Vec<Token> = tokens
            .into_iter()
            .filter(|t| matches!(t, Token::Operator(_)))
            .collect();
        assert_eq!(
            ops,
            ["+", "-", "*", "/", "^", "&", "=", "<>", "<=", ">=", "<", ">"]
                .iter()
                .map(|s| op(s))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_tokenize_booleans() {
        assert_eq!(
            tokenize("true & False").unwrap(),
            vec![Token::Boolean(true), op("&"), Token::Boolean(false)]
        );
    }

    #[test]
    fn test_tokenize_is_lazy_and_stops_after_error() {
        let mut tokens = Tokenizer::new("=1 + @ + 2");
        assert_eq!(tokens.next(), Some(Ok(Token::Number(1.0))));
        assert_eq!(tokens.next(), Some(Ok(op("+"))));
        assert!(matches!(tokens.next(), Some(Err(_))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_tokenize_empty_and_whitespace() {
        assert_eq!(tokenize("").unwrap(), vec![]);
        assert_eq!(tokenize("=   ").unwrap(), vec![]);
    }

    #[test]
    fn test_tokenize_errors() {
        let err = tokenize("\"hello").unwrap_err();
        assert!(err.message.contains("Unterminated"));
        let err = tokenize("price * 2").unwrap_err();
        assert!(err.message.contains("Unknown name"));
        let err = tokenize("A1:foo").unwrap_err();
        assert!(err.message.contains("Invalid range end"));
        let err = tokenize("1e").unwrap_err();
        assert!(err.message.contains("Invalid number"));
    }
}
