//! Accumulation of element text into numeric arrays.
//!
//! Character data can arrive in several chunks for one element, so text is
//! buffered until the element closes and only then split into numbers.
//! Tokens that are not numbers become `0` instead of failing the parse.

/// Text collected for the element currently open.
#[derive(Debug, Default)]
pub struct TextAccumulator {
    text: String,
}

impl TextAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard whatever was collected.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Append a chunk of character data.
    pub fn push(&mut self, chunk: &str) {
        if !self.text.is_empty() {
            // Chunks are trimmed by the reader, keep tokens apart
            self.text.push(' ');
        }
        self.text.push_str(chunk);
    }

    /// The collected text, trimmed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn floats(&self) -> Vec<f32> {
        parse_floats(&self.text)
    }

    pub fn ints(&self) -> Vec<i32> {
        parse_ints(&self.text)
    }
}

/// Split on whitespace and parse every token as a float, substituting 0.
pub fn parse_floats(text: &str) -> Vec<f32> {
    text.split_whitespace()
        .map(|token| token.parse::<f32>().unwrap_or(0.0))
        .collect()
}

/// Split on whitespace and parse every token as an integer.
///
/// Tokens written as floats (`3.0`) are truncated; anything else becomes 0.
pub fn parse_ints(text: &str) -> Vec<i32> {
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<i32>()
                .unwrap_or_else(|_| token.parse::<f32>().map(|f| f as i32).unwrap_or(0))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_floats_substitutes_zero() {
        assert_eq!(parse_floats(" 1 2.5\n-3e1\t#QNAN 4"), vec![1.0, 2.5, -30.0, 0.0, 4.0]);
        assert!(parse_floats("   ").is_empty());
    }

    #[test]
    fn test_parse_ints() {
        assert_eq!(parse_ints("0 1 2 3.0 x -4"), vec![0, 1, 2, 3, 0, -4]);
    }

    #[test]
    fn test_accumulator_joins_chunks() {
        let mut acc = TextAccumulator::new();
        acc.push("1 2");
        acc.push("3");
        assert_eq!(acc.floats(), vec![1.0, 2.0, 3.0]);
        assert_eq!(acc.text(), "1 2 3");

        acc.clear();
        assert!(acc.ints().is_empty());
    }
}
