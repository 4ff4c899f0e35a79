//! The transcript: ordered captured text produced by running one pipeline.
//!
//! Stages append banners, raw tool output, `EXIT:` sentinels, and include
//! sections in order. The finished transcript is compared byte-for-byte
//! against the stored baseline after both sides go through the same newline
//! canonicalization.

use once_cell::sync::Lazy;
use regex::Regex;

const BANNER_RULE: &str = "=================================";
const BANNER_TITLE: &str = "         Console output          ";

static NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n?").expect("static newline pattern"));

/// Canonicalizes `\r\n` and bare `\r` line endings to `\n`.
///
/// Applied identically to stored baselines and actual transcripts before
/// comparison, so baselines recorded on any platform keep matching.
pub fn normalize_newlines(text: &str) -> String {
    NEWLINES.replace_all(text, "\n").into_owned()
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    buf: String,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed console banner opening each captured section.
    pub fn banner(&mut self) {
        self.line(BANNER_RULE);
        self.line(BANNER_TITLE);
        self.line(BANNER_RULE);
    }

    pub fn line(&mut self, line: &str) {
        self.buf.push_str(line);
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// Appends captured tool output verbatim, without adding a newline.
    pub fn raw(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    /// Synthesized or captured exit sentinel: `EXIT: <code>`.
    pub fn exit(&mut self, code: i32) {
        self.line(&format!("EXIT: {code}"));
    }

    /// Exit sentinel attributed to a named tool: `EXIT (<tool>): <code>`.
    pub fn labeled_exit(&mut self, tool: &str, code: i32) {
        self.line(&format!("EXIT ({tool}): {code}"));
    }

    /// Appends one labeled include-file section, line by line.
    pub fn include_section(&mut self, name: &str, contents: &str) {
        self.blank();
        self.line(BANNER_RULE);
        self.line(name);
        self.line(BANNER_RULE);
        for line in contents.lines() {
            self.line(line);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// The transcript with canonical line endings, ready for comparison.
    pub fn normalized(&self) -> String {
        normalize_newlines(&self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_then_exit_sentinel() {
        let mut t = Transcript::new();
        t.banner();
        t.exit(0);
        let expected = "=================================\n         Console output          \n=================================\nEXIT: 0\n";
        assert_eq!(t.as_str(), expected);
    }

    #[test]
    fn labeled_exit_names_the_tool() {
        let mut t = Transcript::new();
        t.labeled_exit("csc", 1);
        assert_eq!(t.as_str(), "EXIT (csc): 1\n");
    }

    #[test]
    fn include_section_is_banner_wrapped_and_newline_terminated() {
        let mut t = Transcript::new();
        t.include_section("run.trace", "first\nsecond");
        let expected =
            "\n=================================\nrun.trace\n=================================\nfirst\nsecond\n";
        assert_eq!(t.as_str(), expected);
    }

    #[test]
    fn raw_appends_without_newline() {
        let mut t = Transcript::new();
        t.raw("no newline");
        t.exit(2);
        assert_eq!(t.as_str(), "no newlineEXIT: 2\n");
    }

    #[test]
    fn normalization_canonicalizes_crlf_and_bare_cr() {
        assert_eq!(normalize_newlines("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert_eq!(normalize_newlines("EXIT: 0\r\n"), "EXIT: 0\n");
    }
}
