//! Wildcard patterns for `~` (like) terms.
//!
//! Like is a case-insensitive prefix match. `*` matches any run of
//! characters and `?` exactly one; everything else is literal.

use once_cell::sync::Lazy;
use regex::Regex;

static WILDCARDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*?]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// `*`
    Many,
    /// `?`
    One,
}

/// A like value split into literal text and wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePattern<'a> {
    segments: Vec<Segment<'a>>,
}

impl<'a> LikePattern<'a> {
    pub fn parse(value: &'a str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;
        for wildcard in WILDCARDS.find_iter(value) {
            if wildcard.start() > last {
                segments.push(Segment::Literal(&value[last..wildcard.start()]));
            }
            segments.push(match wildcard.as_str() {
                "*" => Segment::Many,
                _ => Segment::One,
            });
            last = wildcard.end();
        }
        if last < value.len() {
            segments.push(Segment::Literal(&value[last..]));
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment<'a>] {
        &self.segments
    }

    /// SQL `LIKE` pattern for use with `ESCAPE '\'`
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    for c in text.chars() {
                        if matches!(c, '\\' | '%' | '_') {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                }
                Segment::Many => out.push('%'),
                Segment::One => out.push('_'),
            }
        }
        if !out.ends_with('%') || out.ends_with("\\%") {
            out.push('%');
        }
        out
    }

    /// Anchored regex source; compile case-insensitively
    pub fn to_regex(&self) -> String {
        let mut out = String::from("^");
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(&regex::escape(text)),
                Segment::Many => out.push_str(".*"),
                Segment::One => out.push('.'),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("alice", "alice%" ; "plain prefix")]
    #[test_case("ali*ce", "ali%ce%" ; "star")]
    #[test_case("b?b", "b_b%" ; "question mark")]
    #[test_case("al*", "al%" ; "trailing star")]
    #[test_case("50%", r"50\%%" ; "literal percent")]
    #[test_case("a_b", r"a\_b%" ; "literal underscore")]
    #[test_case(r"c:\dir", r"c:\\dir%" ; "literal backslash")]
    fn test_to_sql(value: &str, expected: &str) {
        assert_eq!(LikePattern::parse(value).to_sql(), expected);
    }

    #[test_case("alice", "^alice" ; "plain prefix")]
    #[test_case("ali*ce", "^ali.*ce" ; "star")]
    #[test_case("b?b", "^b.b" ; "question mark")]
    #[test_case("a.b", r"^a\.b" ; "escaped dot")]
    fn test_to_regex(value: &str, expected: &str) {
        assert_eq!(LikePattern::parse(value).to_regex(), expected);
    }

    #[test]
    fn test_segments() {
        let pattern = LikePattern::parse("*a?");
        assert_eq!(
            pattern.segments(),
            [Segment::Many, Segment::Literal("a"), Segment::One]
        );
    }
}
