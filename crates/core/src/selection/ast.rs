//! Syntax tree for selection expressions.

/// A parsed selection expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// `name O H1`, `resname WAT`, `type OW`: any pattern may match.
    Text {
        field: TextField,
        patterns: Vec<Pattern>,
    },
    /// `mass > 15`, `charge <= -0.5`
    Compare {
        field: NumericField,
        op: CmpOp,
        value: f64,
    },
    /// `resid 1-10 12`, `index 0:99`; bounds are inclusive.
    Ranges {
        field: RangeField,
        ranges: Vec<(i64, i64)>,
    },
    Keyword(Keyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Name,
    Resname,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    Mass,
    Charge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeField {
    /// 1-based residue number
    Resid,
    /// 0-based atom index
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Water,
    Hydrogen,
    All,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        const TOL: f64 = 1e-9;
        match self {
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Eq => (lhs - rhs).abs() < TOL,
            CmpOp::Ne => (lhs - rhs).abs() >= TOL,
        }
    }
}

/// Exact text or a glob using `*` and `?`.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Exact(String),
    Glob(String),
}

impl Pattern {
    pub fn parse(text: &str) -> Self {
        if text.contains(['*', '?']) {
            Pattern::Glob(text.to_string())
        } else {
            Pattern::Exact(text.to_string())
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Pattern::Exact(p) => p == value,
            Pattern::Glob(p) => glob(p.as_bytes(), value.as_bytes()),
        }
    }
}

// Atom and residue names are at most a few bytes, so plain recursion is fine.
fn glob(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.split_first(), text.split_first()) {
        (None, None) => true,
        (Some((b'*', rest)), _) => {
            glob(rest, text) || (!text.is_empty() && glob(pattern, &text[1..]))
        }
        (Some((b'?', rest)), Some((_, tail))) => glob(rest, tail),
        (Some((p, rest)), Some((t, tail))) if p == t => glob(rest, tail),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_exact_and_glob() {
        assert!(Pattern::parse("O").matches("O"));
        assert!(!Pattern::parse("O").matches("OW"));
        assert!(Pattern::parse("O*").matches("OW"));
        assert!(Pattern::parse("O*").matches("O"));
        assert!(Pattern::parse("H?").matches("H1"));
        assert!(!Pattern::parse("H?").matches("H"));
        assert!(Pattern::parse("*1").matches("H1"));
        assert!(!Pattern::parse("*1").matches("H2"));
    }

    #[test]
    fn test_cmp_op() {
        assert!(CmpOp::Gt.apply(16.0, 15.0));
        assert!(!CmpOp::Lt.apply(16.0, 15.0));
        assert!(CmpOp::Eq.apply(1.008, 1.008));
        assert!(CmpOp::Ne.apply(1.008, 16.0));
    }
}
