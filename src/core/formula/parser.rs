//! Formula parser
//!
//! Converts a sequence of tokens into an Abstract Syntax Tree (AST).
//! Uses recursive descent parsing with operator precedence, lowest first:
//!
//! 1. comparison `= <> < <= > >=` (left-associative)
//! 2. concatenation `&`
//! 3. additive `+ -`
//! 4. multiplicative `* /`
//! 5. exponent `^` (right-associative)
//! 6. unary `- +`
//! 7. primary: literal, reference, function call, parenthesized expression
//!
//! Function arity is not checked here; the function library does that when
//! the call is evaluated.

use std::fmt;

use super::tokenizer::{tokenize, Token};
use crate::core::reference::{CellCoord, RangeRef, Reference};
use crate::error::FormulaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "^" => Self::Pow,
            "&" => Self::Concat,
            "=" => Self::Eq,
            "<>" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "^",
            Self::Concat => "&",
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Neg,
    Plus,
}

/// Abstract Syntax Tree node for formula expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A numeric literal
    Number(f64),
    /// A string literal
    Text(String),
    /// TRUE / FALSE
    Boolean(bool),
    /// A single cell reference
    CellRef(CellCoord),
    /// A rectangular range reference
    RangeRef(RangeRef),
    /// Function call: NAME(arg1, arg2, ...)
    FunctionCall { name: String, args: Vec<Expr> },
    /// Binary operation: left op right
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation: -expr, +expr
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
}

impl Expr {
    /// Every cell and range the expression mentions, in source order.
    ///
    /// Walks all branches, including the untaken branch of an IF, so the
    /// dependency graph stays complete when a condition flips.
    pub fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references(&self, refs: &mut Vec<Reference>) {
        match self {
            Expr::Number(_) | Expr::Text(_) | Expr::Boolean(_) => {}
            Expr::CellRef(coord) => refs.push(Reference::Cell(*coord)),
            Expr::RangeRef(range) => refs.push(Reference::Range(*range)),
            Expr::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_references(refs);
                }
            }
            Expr::BinaryOp { left, right, .. } => {
                left.collect_references(refs);
                right.collect_references(refs);
            }
            Expr::UnaryOp { operand, .. } => operand.collect_references(refs),
        }
    }
}

/// Error during parsing
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parse error at token {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for FormulaError {
    fn from(err: ParseError) -> Self {
        FormulaError::Syntax(err.to_string())
    }
}

/// Deepest expression tree the parser accepts. Parentheses, function
/// arguments, unary signs, `^` and chained binary operators each add a level.
pub const MAX_NESTING: usize = 256;

/// Parser for formula tokens
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    /// Create a new parser for the given tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    /// Parse the tokens into an AST
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::new("Empty expression", 0));
        }
        let expr = self.expression()?;

        match self.peek() {
            None => Ok(expr),
            Some(Token::CloseParen) => Err(ParseError::new("Unmatched ')'", self.position)),
            Some(token) => Err(ParseError::new(
                format!("Unexpected token after expression: {:?}", token),
                self.position,
            )),
        }
    }

    /// Check if we've consumed all tokens
    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Peek at the current token
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// Advance to the next token
    fn advance(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
        }
    }

    /// Check if current token matches and consume it
    fn match_token(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the current token if it is one of the given operators
    fn match_any_operator(&mut self, ops: &[&str]) -> Option<BinaryOperator> {
        if let Some(Token::Operator(s)) = self.peek() {
            if ops.contains(&s.as_str()) {
                let op = BinaryOperator::from_symbol(s);
                self.advance();
                return op;
            }
        }
        None
    }

    fn expect_close_paren(&mut self, context: &str) -> Result<(), ParseError> {
        if self.match_token(&Token::CloseParen) {
            Ok(())
        } else {
            Err(ParseError::new(
                format!("Expected ')' {}", context),
                self.position,
            ))
        }
    }

    fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(
                format!("Formula nesting too deep (limit {})", MAX_NESTING),
                self.position,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `parse` one nesting level down
    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        self.descend()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Parse one binary precedence level with left associativity
    fn left_assoc(
        &mut self,
        ops: &[&str],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let entered = self.depth;
        let mut left = next(self)?;

        // Each fold deepens the tree on the left
        while let Some(op) = self.match_any_operator(ops) {
            self.descend()?;
            let right = next(self)?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        self.depth = entered;
        Ok(left)
    }

    /// Expression: comparison
    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.comparison()
    }

    /// Comparison: concat (( "=" | "<>" | "<" | ">" | "<=" | ">=" ) concat)*
    ///
    /// Comparisons chain left to right like Excel: `A1<B1<C1` is `(A1<B1)<C1`.
    fn comparison(&mut self) -> Result<Expr, ParseError> {
        self.left_assoc(&["=", "<>", "<", ">", "<=", ">="], Self::concat)
    }

    /// Concat: term ( "&" term )*
    fn concat(&mut self) -> Result<Expr, ParseError> {
        self.left_assoc(&["&"], Self::term)
    }

    /// Term: factor (( "+" | "-" ) factor)*
    fn term(&mut self) -> Result<Expr, ParseError> {
        self.left_assoc(&["+", "-"], Self::factor)
    }

    /// Factor: power (( "*" | "/" ) power)*
    fn factor(&mut self) -> Result<Expr, ParseError> {
        self.left_assoc(&["*", "/"], Self::power)
    }

    /// Power: unary ( "^" power )?   (right-associative)
    fn power(&mut self) -> Result<Expr, ParseError> {
        let left = self.unary()?;

        if self.match_any_operator(&["^"]).is_some() {
            let right = self.nested(Self::power)?;
            Ok(Expr::BinaryOp {
                op: BinaryOperator::Pow,
                left: Box::new(left),
                right: Box::new(right),
            })
        } else {
            Ok(left)
        }
    }

    /// Unary: ( "-" | "+" ) unary | primary
    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(Token::Operator(s)) if s == "-" => Some(UnaryOperator::Neg),
            Some(Token::Operator(s)) if s == "+" => Some(UnaryOperator::Plus),
            _ => None,
        };

        match op {
            Some(op) => {
                self.advance();
                let operand = self.nested(Self::unary)?;
                Ok(Expr::UnaryOp {
                    op,
                    operand: Box::new(operand),
                })
            }
            None => self.primary(),
        }
    }

    /// Arguments: ( expr ( "," expr )* )?
    fn arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();

        if let Some(Token::CloseParen) = self.peek() {
            return Ok(args);
        }

        args.push(self.nested(Self::expression)?);
        while self.match_token(&Token::Comma) {
            args.push(self.nested(Self::expression)?);
        }

        Ok(args)
    }

    /// Primary: NUMBER | STRING | BOOLEAN | CELL | RANGE | call | "(" expr ")"
    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().cloned();

        match token {
            Some(Token::Number(n)) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Some(Token::Text(s)) => {
                self.advance();
                Ok(Expr::Text(s))
            }
            Some(Token::Boolean(b)) => {
                self.advance();
                Ok(Expr::Boolean(b))
            }
            Some(Token::CellRef(coord)) => {
                self.advance();
                Ok(Expr::CellRef(coord))
            }
            Some(Token::RangeRef(range)) => {
                self.advance();
                Ok(Expr::RangeRef(range))
            }
            Some(Token::Ident(name)) => {
                self.advance();
                if !self.match_token(&Token::OpenParen) {
                    return Err(ParseError::new(
                        format!("Expected '(' after function name {}", name),
                        self.position,
                    ));
                }
                let args = self.arguments()?;
                self.expect_close_paren("after function arguments")?;
                Ok(Expr::FunctionCall { name, args })
            }
            Some(Token::OpenParen) => {
                self.advance();
                let expr = self.nested(Self::expression)?;
                self.expect_close_paren("after expression")?;
                Ok(expr)
            }
            Some(token) => Err(ParseError::new(
                format!("Unexpected token: {:?}", token),
                self.position,
            )),
            None => Err(ParseError::new(
                "Unexpected end of expression",
                self.position,
            )),
        }
    }
}

/// Convenience function to parse tokens into an AST
pub fn parse(tokens: Vec<Token>) -> Result<Expr, ParseError> {
    Parser::new(tokens).parse()
}

/// Tokenize and parse formula text. Any failure is a syntax error.
pub fn parse_formula(formula: &str) -> Result<Expr, FormulaError> {
    let tokens = tokenize(formula)?;
    Ok(parse(tokens)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cell(a1: &str) -> Box<Expr> {
        Box::new(Expr::CellRef(CellCoord::parse(a1).unwrap()))
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    fn bin(op: BinaryOperator, left: Box<Expr>, right: Box<Expr>) -> Box<Expr> {
        Box::new(Expr::BinaryOp { op, left, right })
    }

    fn parse_ok(formula: &str) -> Expr {
        parse_formula(formula).unwrap()
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_ok("=42"), Expr::Number(42.0));
        assert_eq!(parse_ok("=\"hi\""), Expr::Text("hi".to_string()));
        assert_eq!(parse_ok("=TRUE"), Expr::Boolean(true));
    }

    #[test]
    fn test_parse_precedence_mul_over_add() {
        assert_eq!(
            parse_ok("=A1 + B1 * 2"),
            *bin(
                BinaryOperator::Add,
                cell("A1"),
                bin(BinaryOperator::Mul, cell("B1"), num(2.0))
            )
        );
    }

    #[test]
    fn test_parse_power_right_associative() {
        assert_eq!(
            parse_ok("=2^3^2"),
            *bin(
                BinaryOperator::Pow,
                num(2.0),
                bin(BinaryOperator::Pow, num(3.0), num(2.0))
            )
        );
    }

    #[test]
    fn test_parse_unary_binds_tighter_than_power() {
        assert_eq!(
            parse_ok("=-2^2"),
            *bin(
                BinaryOperator::Pow,
                Box::new(Expr::UnaryOp {
                    op: UnaryOperator::Neg,
                    operand: num(2.0)
                }),
                num(2.0)
            )
        );
    }

    #[test]
    fn test_parse_concat_between_additive_and_comparison() {
        // 1 + 2 & "x" = "3x"  parses as ((1 + 2) & "x") = "3x"
        assert_eq!(
            parse_ok("=1 + 2 & \"x\" = \"3x\""),
            *bin(
                BinaryOperator::Eq,
                bin(
                    BinaryOperator::Concat,
                    bin(BinaryOperator::Add, num(1.0), num(2.0)),
                    Box::new(Expr::Text("x".into()))
                ),
                Box::new(Expr::Text("3x".into()))
            )
        );
    }

    #[test]
    fn test_parse_comparison_left_associative() {
        assert_eq!(
            parse_ok("=A1 < B1 < C1"),
            *bin(
                BinaryOperator::Lt,
                bin(BinaryOperator::Lt, cell("A1"), cell("B1")),
                cell("C1")
            )
        );
    }

    #[test]
    fn test_parse_function_calls() {
        assert_eq!(
            parse_ok("=TODAY()"),
            Expr::FunctionCall {
                name: "TODAY".into(),
                args: vec![]
            }
        );
        assert_eq!(
            parse_ok("=round(sum(A1:A3), 2)"),
            Expr::FunctionCall {
                name: "ROUND".into(),
                args: vec![
                    Expr::FunctionCall {
                        name: "SUM".into(),
                        args: vec![Expr::RangeRef("A1:A3".parse().unwrap())],
                    },
                    Expr::Number(2.0),
                ],
            }
        );
    }

    #[test]
    fn test_parse_does_not_check_arity() {
        assert!(parse_formula("=IF(1)").is_ok());
        assert!(parse_formula("=NOSUCHFUNCTION(1, 2, 3)").is_ok());
    }

    #[test]
    fn test_references_include_both_if_branches() {
        let expr = parse_ok("=IF(A1 > 0, B1, SUM(C1:C2))");
        let refs: Vec<String> = expr.references().iter().map(|r| r.to_string()).collect();
        assert_eq!(refs, vec!["A1", "B1", "C1:C2"]);
    }

    #[test]
    fn test_parse_errors() {
        let err = parse(tokenize("").unwrap()).unwrap_err();
        assert!(err.message.contains("Empty"));

        let err = parse(tokenize("SUM(1, 2").unwrap()).unwrap_err();
        assert!(err.message.contains("')'"));

        let err = parse(tokenize("(1 + 2))").unwrap()).unwrap_err();
        assert!(err.message.contains("Unmatched"));

        let err = parse(tokenize("1 2").unwrap()).unwrap_err();
        assert!(err.message.contains("after expression"));

        let err = parse(tokenize("1 +").unwrap()).unwrap_err();
        assert!(err.message.contains("end of expression"));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(2000), ")".repeat(2000));
        let err = parse(tokenize(&deep).unwrap()).unwrap_err();
        assert!(err.message.contains("too deep"));

        let unary_chain = format!("{}1", "-".repeat(2000));
        assert!(parse(tokenize(&unary_chain).unwrap()).is_err());

        let long_sum = vec!["1"; 2000].join("+");
        assert!(parse(tokenize(&long_sum).unwrap()).is_err());

        let calls = format!("{}1{}", "ABS(".repeat(2000), ")".repeat(2000));
        assert!(parse(tokenize(&calls).unwrap()).is_err());

        let modest = format!("={}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(parse_ok(&modest), Expr::Number(1.0));
    }

    #[test]
    fn test_parse_formula_maps_to_syntax_error() {
        assert!(matches!(
            parse_formula("=1 +* 2"),
            Err(FormulaError::Syntax(_))
        ));
        assert!(matches!(
            parse_formula("=\"open"),
            Err(FormulaError::Syntax(_))
        ));
    }
}
