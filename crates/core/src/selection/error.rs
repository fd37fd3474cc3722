//! Selection errors carrying the offending byte span.

use std::fmt;

/// A lexing, parsing or evaluation failure in a selection expression.
///
/// When both a span and the input are attached, `Display` renders the
/// expression with a caret line under the offending text.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionError {
    pub message: String,
    pub span: Option<(usize, usize)>,
    pub input: Option<String>,
}

impl SelectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
            input: None,
        }
    }

    /// Attach a byte span and the full expression in one step.
    pub fn at(mut self, span: (usize, usize), input: &str) -> Self {
        self.span = Some(span);
        self.input = Some(input.to_string());
        self
    }
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid selection: {}", self.message)?;
        if let (Some((start, end)), Some(input)) = (self.span, self.input.as_deref()) {
            let width = end.saturating_sub(start).max(1);
            write!(f, "\n  {}\n  {:start$}{}", input, "", "^".repeat(width))?;
        }
        Ok(())
    }
}

impl std::error::Error for SelectionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_points_at_span() {
        let err = SelectionError::new("Unknown keyword 'nmae'").at((0, 4), "nmae O");
        let text = err.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "invalid selection: Unknown keyword 'nmae'");
        assert_eq!(lines[1], "  nmae O");
        assert_eq!(lines[2], "  ^^^^");
    }

    #[test]
    fn test_plain_message_without_span() {
        let err = SelectionError::new("empty expression");
        assert_eq!(err.to_string(), "invalid selection: empty expression");
    }
}
