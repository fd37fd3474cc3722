//! Lexer for selection expressions.

use crate::selection::error::SelectionError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Keywords, atom/residue names and globs; keywords are resolved by the parser.
    Word(String),
    Number(f64),
    LParen,
    RParen,
    Dash,
    Colon,
    Cmp(crate::selection::ast::CmpOp),
    Eof,
}

/// A token plus its byte span in the expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: (usize, usize),
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'*' | b'?' | b'\'' | b'.' | b'+')
}

/// Split an expression into tokens. The result always ends with `Eof`.
pub fn tokenize(input: &str) -> Result<Vec<SpannedToken>, SelectionError> {
    use crate::selection::ast::CmpOp;

    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let b = bytes[pos];
        if b.is_ascii_whitespace() || b == b',' {
            pos += 1;
            continue;
        }

        let token = match b {
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'-' => Token::Dash,
            b':' => Token::Colon,
            b'>' | b'<' | b'=' | b'!' => {
                let eq_follows = bytes.get(pos + 1) == Some(&b'=');
                let op = match (b, eq_follows) {
                    (b'>', true) => CmpOp::Ge,
                    (b'>', false) => CmpOp::Gt,
                    (b'<', true) => CmpOp::Le,
                    (b'<', false) => CmpOp::Lt,
                    (b'=', _) => CmpOp::Eq,
                    (b'!', true) => CmpOp::Ne,
                    _ => {
                        return Err(SelectionError::new("Expected '!='").at((start, start + 1), input))
                    }
                };
                if eq_follows {
                    pos += 1;
                }
                Token::Cmp(op)
            }
            b if is_word_byte(b) => {
                while pos < bytes.len() && is_word_byte(bytes[pos]) {
                    pos += 1;
                }
                let text = &input[start..pos];
                let token = match text.parse::<f64>() {
                    Ok(v) if text.starts_with(|c: char| c.is_ascii_digit() || c == '.') => {
                        Token::Number(v)
                    }
                    _ => Token::Word(text.to_string()),
                };
                tokens.push(SpannedToken {
                    token,
                    span: (start, pos),
                });
                continue;
            }
            other => {
                return Err(SelectionError::new(format!(
                    "Unexpected character '{}'",
                    other as char
                ))
                .at((start, start + 1), input))
            }
        };
        pos += 1;
        tokens.push(SpannedToken {
            token,
            span: (start, pos),
        });
    }

    tokens.push(SpannedToken {
        token: Token::Eof,
        span: (bytes.len(), bytes.len()),
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::ast::CmpOp;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_words_and_numbers() {
        assert_eq!(
            kinds("name O"),
            vec![Token::Word("name".into()), Token::Word("O".into()), Token::Eof]
        );
        assert_eq!(
            kinds("resid 1-50"),
            vec![
                Token::Word("resid".into()),
                Token::Number(1.0),
                Token::Dash,
                Token::Number(50.0),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_names_starting_with_digits_stay_words() {
        assert_eq!(kinds("1HH3")[0], Token::Word("1HH3".into()));
        assert_eq!(kinds("H*")[0], Token::Word("H*".into()));
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds(">= <= != == = > <"),
            vec![
                Token::Cmp(CmpOp::Ge),
                Token::Cmp(CmpOp::Le),
                Token::Cmp(CmpOp::Ne),
                Token::Cmp(CmpOp::Eq),
                Token::Cmp(CmpOp::Eq),
                Token::Cmp(CmpOp::Gt),
                Token::Cmp(CmpOp::Lt),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_spans_and_bad_characters() {
        let toks = tokenize("name  OW").unwrap();
        assert_eq!(toks[1].span, (6, 8));

        let err = tokenize("name O & name H").unwrap_err();
        assert_eq!(err.span, Some((7, 8)));
    }
}
