//! Recursive descent parser.
//!
//! ```text
//! or_expr   = and_expr ("or" and_expr)*
//! and_expr  = not_expr ("and" not_expr)*
//! not_expr  = "not" not_expr | primary
//! primary   = "(" or_expr ")"
//!           | ("name" | "resname" | "type") value+
//!           | ("mass" | "charge") op ["-"] number
//!           | ("resid" | "index") range+
//!           | "water" | "hydrogen" | "all" | "none"
//! range     = int [("-" | ":" | "to") int]
//! ```

use crate::selection::ast::*;
use crate::selection::error::SelectionError;
use crate::selection::token::{tokenize, SpannedToken, Token};

const RESERVED: &[&str] = &["and", "or", "not", "to"];

/// Parse an expression into its syntax tree.
pub fn parse(input: &str) -> Result<Expr, SelectionError> {
    if input.trim().is_empty() {
        return Err(SelectionError::new("empty expression"));
    }
    let mut parser = Parser {
        tokens: tokenize(input)?,
        pos: 0,
        input,
    };
    let expr = parser.or_expr()?;
    if parser.peek() != &Token::Eof {
        return Err(parser.error_here(format!("Unexpected '{}'", parser.text())));
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: Vec<SpannedToken>,
    pos: usize,
    input: &'a str,
}

impl<'a> Parser<'a> {
    fn current(&self) -> &SpannedToken {
        // tokenize always ends with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn text(&self) -> &'a str {
        let (start, end) = self.current().span;
        &self.input[start..end]
    }

    fn bump(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn error_here(&self, message: impl Into<String>) -> SelectionError {
        SelectionError::new(message).at(self.current().span, self.input)
    }

    /// Current token is the given keyword (case-insensitive).
    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    fn at_reserved(&self) -> bool {
        RESERVED.iter().any(|k| self.at_keyword(k))
    }

    fn or_expr(&mut self) -> Result<Expr, SelectionError> {
        let mut lhs = self.and_expr()?;
        while self.at_keyword("or") {
            self.bump();
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, SelectionError> {
        let mut lhs = self.not_expr()?;
        while self.at_keyword("and") {
            self.bump();
            let rhs = self.not_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, SelectionError> {
        if self.at_keyword("not") {
            self.bump();
            return Ok(Expr::Not(Box::new(self.not_expr()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, SelectionError> {
        if self.peek() == &Token::LParen {
            self.bump();
            let inner = self.or_expr()?;
            if self.peek() != &Token::RParen {
                return Err(self.error_here("Expected ')'"));
            }
            self.bump();
            return Ok(inner);
        }

        let keyword = match self.peek() {
            Token::Word(w) => w.to_ascii_lowercase(),
            Token::Eof => return Err(self.error_here("Unexpected end of expression")),
            _ => return Err(self.error_here(format!("Expected a keyword, found '{}'", self.text()))),
        };

        let expr = match keyword.as_str() {
            "name" => self.text_values(TextField::Name)?,
            "resname" => self.text_values(TextField::Resname)?,
            "type" => self.text_values(TextField::Type)?,
            "mass" => self.comparison(NumericField::Mass)?,
            "charge" => self.comparison(NumericField::Charge)?,
            "resid" => self.ranges(RangeField::Resid)?,
            "index" => self.ranges(RangeField::Index)?,
            "water" | "waters" => self.keyword(Keyword::Water),
            "hydrogen" => self.keyword(Keyword::Hydrogen),
            "all" => self.keyword(Keyword::All),
            "none" => self.keyword(Keyword::None),
            _ => return Err(self.error_here(format!("Unknown keyword '{}'", self.text()))),
        };
        Ok(expr)
    }

    fn keyword(&mut self, keyword: Keyword) -> Expr {
        self.bump();
        Expr::Keyword(keyword)
    }

    fn text_values(&mut self, field: TextField) -> Result<Expr, SelectionError> {
        self.bump();
        let mut patterns = Vec::new();
        while matches!(self.peek(), Token::Word(_) | Token::Number(_)) && !self.at_reserved() {
            patterns.push(Pattern::parse(self.text()));
            self.bump();
        }
        if patterns.is_empty() {
            return Err(self.error_here("Expected at least one name"));
        }
        Ok(Expr::Text { field, patterns })
    }

    fn comparison(&mut self, field: NumericField) -> Result<Expr, SelectionError> {
        self.bump();
        let op = match self.peek() {
            Token::Cmp(op) => *op,
            _ => return Err(self.error_here("Expected a comparison operator")),
        };
        self.bump();
        let sign = if self.peek() == &Token::Dash {
            self.bump();
            -1.0
        } else {
            1.0
        };
        let value = match self.peek() {
            Token::Number(v) => sign * *v,
            _ => return Err(self.error_here("Expected a number")),
        };
        self.bump();
        Ok(Expr::Compare { field, op, value })
    }

    fn integer(&mut self) -> Result<i64, SelectionError> {
        match self.peek() {
            Token::Number(v) if v.fract() == 0.0 => {
                let v = *v as i64;
                self.bump();
                Ok(v)
            }
            _ => Err(self.error_here("Expected integer")),
        }
    }

    fn ranges(&mut self, field: RangeField) -> Result<Expr, SelectionError> {
        self.bump();
        let mut ranges = Vec::new();
        while matches!(self.peek(), Token::Number(_)) {
            let lo = self.integer()?;
            let hi = if matches!(self.peek(), Token::Dash | Token::Colon) || self.at_keyword("to")
            {
                self.bump();
                self.integer()?
            } else {
                lo
            };
            if hi < lo {
                return Err(SelectionError::new(format!("Empty range {}-{}", lo, hi)));
            }
            ranges.push((lo, hi));
        }
        if ranges.is_empty() {
            return Err(self.error_here("Expected integer"));
        }
        Ok(Expr::Ranges { field, ranges })
    }
}
