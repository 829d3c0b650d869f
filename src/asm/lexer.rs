//! Tokenizer for one line of assembler source.
//!
//! Tokens are runs of characters that are neither whitespace nor commas.
//! A `/` at the start of a token begins a comment that runs to the end of
//! the line.

/// Cursor over a single source line.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    fn skip_while(&mut self, pred: impl Fn(char) -> bool) {
        let rest = self.rest();
        let skipped = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += skipped;
    }

    /// Next token, or `None` at end of line or at a comment.
    pub fn next_token(&mut self) -> Option<&'a str> {
        self.skip_while(|c| c.is_whitespace() || c == ',');
        let rest = self.rest();
        if rest.is_empty() || rest.starts_with('/') {
            self.pos = self.line.len();
            return None;
        }
        let len = rest.find(|c: char| c.is_whitespace() || c == ',').unwrap_or(rest.len());
        self.pos += len;
        Some(&rest[..len])
    }

    /// Consume a comma directly after the last token, making it a label.
    ///
    /// Whitespace between the token and the comma is allowed.
    pub fn take_label_comma(&mut self) -> bool {
        let start = self.pos;
        self.skip_while(char::is_whitespace);
        if self.rest().starts_with(',') {
            self.pos += 1;
            true
        } else {
            self.pos = start;
            false
        }
    }

    /// Check that only whitespace or a comment remains.
    ///
    /// On failure returns the first unexpected run of text.
    pub fn finish(&mut self) -> Result<(), &'a str> {
        self.skip_while(char::is_whitespace);
        let rest = self.rest();
        if rest.is_empty() || rest.starts_with('/') {
            self.pos = self.line.len();
            return Ok(());
        }
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        Err(&rest[..len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens() {
        let mut cursor = LineCursor::new("  LDA  SUB I");
        assert_eq!(cursor.next_token(), Some("LDA"));
        assert_eq!(cursor.next_token(), Some("SUB"));
        assert_eq!(cursor.next_token(), Some("I"));
        assert_eq!(cursor.next_token(), None);
        assert!(cursor.finish().is_ok());
    }

    #[test]
    fn test_label() {
        let mut cursor = LineCursor::new("LOP , ADD X");
        assert_eq!(cursor.next_token(), Some("LOP"));
        assert!(cursor.take_label_comma());
        assert_eq!(cursor.next_token(), Some("ADD"));

        let mut cursor = LineCursor::new("ADD X");
        cursor.next_token();
        assert!(!cursor.take_label_comma());
        assert_eq!(cursor.next_token(), Some("X"));
    }

    #[test]
    fn test_comment() {
        let mut cursor = LineCursor::new("HLT / stop here, please");
        assert_eq!(cursor.next_token(), Some("HLT"));
        assert_eq!(cursor.next_token(), None);

        let mut cursor = LineCursor::new("/ whole line");
        assert_eq!(cursor.next_token(), None);
        assert!(cursor.finish().is_ok());
    }

    #[test]
    fn test_finish_rejects_trailing_text() {
        let mut cursor = LineCursor::new("ORG 10 junk here");
        cursor.next_token();
        cursor.next_token();
        assert_eq!(cursor.finish(), Err("junk"));

        let mut cursor = LineCursor::new("END ,");
        cursor.next_token();
        assert_eq!(cursor.finish(), Err(","));
    }
}
