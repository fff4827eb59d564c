//! Chumsky lexer for the search language.
//!
//! The grammar is total: every input lexes to some sequence of keywords and
//! terms. Anything that doesn't fit a fielded term falls back to a bare
//! value, so a search box can't produce a parse error.

use crate::ast::{Keyword, Operator, Quoting, Term};
use chumsky::extra;
use chumsky::prelude::*;
use tracing::debug;

/// Extra type for parsers - uses Rich errors for better messages
pub type Extra<'src> = extra::Err<Rich<'src, char>>;

// ============================================================================
// Lexemes
// ============================================================================

/// Term pieces before negation is known.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TermParts {
    pub field: Option<String>,
    pub operator: Operator,
    /// `None` for a fielded term with nothing after the infix (`foo:`)
    pub value: Option<String>,
    pub quoting: Quoting,
    pub text: String,
}

impl TermParts {
    fn bare(word: &str) -> Self {
        Self {
            field: None,
            operator: Operator::Eq,
            value: Some(strip_quotes(word)),
            quoting: Quoting::None,
            text: word.to_string(),
        }
    }

    /// Finish the term; void terms yield `None`
    pub fn into_term(self, negated: bool) -> Option<Term> {
        let value = self.value?;
        Some(Term::new(self.field, self.operator, value, self.quoting, negated).with_text(self.text))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Lexeme {
    Keyword(Keyword),
    Term(TermParts),
}

/// Lex `input`, never failing.
pub(crate) fn lex(input: &str) -> Vec<Lexeme> {
    match lexer().parse(input).into_result() {
        Ok(lexemes) => lexemes,
        Err(errors) => {
            // The grammar has a bare-word fallback for every character, so
            // this only guards against future grammar changes.
            debug!(
                errors = errors.len(),
                "search input failed to lex, falling back to whitespace split"
            );
            input
                .split_whitespace()
                .map(|word| Lexeme::Term(TermParts::bare(word)))
                .collect()
        }
    }
}

// ============================================================================
// Primitive parsers
// ============================================================================

fn whitespace<'src>() -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_whitespace())
        .repeated()
        .ignored()
}

/// Run of non-whitespace characters
fn bare_word<'src>() -> impl Parser<'src, &'src str, &'src str, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| !c.is_whitespace())
        .repeated()
        .at_least(1)
        .to_slice()
        .labelled("word")
}

/// Field names: a letter or underscore, then letters, digits, `_` or `-`
fn field_name<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .repeated(),
        )
        .to_slice()
        .map(|s: &str| s.to_string())
        .labelled("field name")
}

fn infix<'src>() -> impl Parser<'src, &'src str, Operator, Extra<'src>> + Clone {
    choice((
        just("<=").to(Operator::Lte),
        just(">=").to(Operator::Gte),
        just("<").to(Operator::Lt),
        just(">").to(Operator::Gt),
        just(":").to(Operator::Eq),
        just("~").to(Operator::Like),
    ))
    .labelled("comparison like : ~ < > <= >=")
}

/// Quoted string; only the delimiter itself can be escaped.
///
/// Yields the unescaped content and whether the closing delimiter was found.
fn quoted<'src>(delim: char) -> impl Parser<'src, &'src str, (String, bool), Extra<'src>> + Clone {
    let escaped = just('\\').ignore_then(just(delim));
    let plain = any().filter(move |c: &char| *c != delim);

    just(delim)
        .ignore_then(escaped.or(plain).repeated().collect::<String>())
        .then(just(delim).or_not().map(|close| close.is_some()))
}

/// Any value: single-quoted, double-quoted, or a bare token
fn value<'src>() -> impl Parser<'src, &'src str, (String, Quoting), Extra<'src>> + Clone {
    let quoting = |style: Quoting| {
        move |(value, closed): (String, bool)| {
            // An unterminated quote runs to the end of input, unquoted
            (value, if closed { style } else { Quoting::None })
        }
    };

    choice((
        quoted('\'').map(quoting(Quoting::Single)),
        quoted('"').map(quoting(Quoting::Double)),
        bare_word().map(|word: &str| (strip_quotes(word), Quoting::None)),
    ))
    .labelled("value")
}

fn strip_quotes(word: &str) -> String {
    word.chars().filter(|c| *c != '\'' && *c != '"').collect()
}

// ============================================================================
// Lexeme parsers
// ============================================================================

/// `and`, `&&`, `or`, `||`, `not` or a free-standing `!`
fn keyword<'src>() -> impl Parser<'src, &'src str, Keyword, Extra<'src>> + Clone {
    bare_word().try_map(|word: &str, span| {
        Keyword::parse(word).ok_or_else(|| Rich::custom(span, "expected keyword"))
    })
}

/// `!` attached to the following term (`!age~25`)
fn bang<'src>() -> impl Parser<'src, &'src str, Keyword, Extra<'src>> + Clone {
    just('!')
        .then_ignore(any().filter(|c: &char| !c.is_whitespace()).rewind())
        .to(Keyword::Not)
}

/// `field <infix> value`, with optional whitespace around the infix
fn fielded_term<'src>() -> impl Parser<'src, &'src str, TermParts, Extra<'src>> + Clone {
    field_name()
        .then_ignore(whitespace())
        .then(infix())
        .then_ignore(whitespace())
        .then(value().or_not())
        .map_with(|((field, operator), value), e| {
            let (value, quoting) = match value {
                Some((value, quoting)) => (Some(value), quoting),
                None => (None, Quoting::None),
            };
            TermParts {
                field: Some(field),
                operator,
                value,
                quoting,
                text: e.slice().to_string(),
            }
        })
        .labelled("term like field:value")
}

fn bare_term<'src>() -> impl Parser<'src, &'src str, TermParts, Extra<'src>> + Clone {
    value().map_with(|(value, quoting), e| TermParts {
        field: None,
        operator: Operator::Eq,
        value: Some(value),
        quoting,
        text: e.slice().to_string(),
    })
}

fn lexeme<'src>() -> impl Parser<'src, &'src str, Lexeme, Extra<'src>> + Clone {
    choice((
        keyword().map(Lexeme::Keyword),
        bang().map(Lexeme::Keyword),
        fielded_term().map(Lexeme::Term),
        bare_term().map(Lexeme::Term),
    ))
}

fn lexer<'src>() -> impl Parser<'src, &'src str, Vec<Lexeme>, Extra<'src>> {
    whitespace()
        .ignore_then(
            lexeme()
                .then_ignore(whitespace())
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(lexeme: &Lexeme) -> &TermParts {
        match lexeme {
            Lexeme::Term(parts) => parts,
            Lexeme::Keyword(k) => panic!("expected term, got keyword {k:?}"),
        }
    }

    #[test]
    fn test_lex_empty() {
        assert!(lex("").is_empty());
        assert!(lex("   \t ").is_empty());
    }

    #[test]
    fn test_lex_keywords_case_insensitive() {
        let lexemes = lex("AND Or || && NOT !");
        assert_eq!(
            lexemes,
            vec![
                Lexeme::Keyword(Keyword::And),
                Lexeme::Keyword(Keyword::Or),
                Lexeme::Keyword(Keyword::Or),
                Lexeme::Keyword(Keyword::And),
                Lexeme::Keyword(Keyword::Not),
                Lexeme::Keyword(Keyword::Not),
            ]
        );
    }

    #[test]
    fn test_lex_attached_bang() {
        let lexemes = lex("!age~25");
        assert_eq!(lexemes.len(), 2);
        assert_eq!(lexemes[0], Lexeme::Keyword(Keyword::Not));
        let parts = term(&lexemes[1]);
        assert_eq!(parts.field.as_deref(), Some("age"));
        assert_eq!(parts.operator, Operator::Like);
        assert_eq!(parts.value.as_deref(), Some("25"));
    }

    #[test]
    fn test_lex_spaced_infix() {
        let lexemes = lex("age >= 25");
        assert_eq!(lexemes.len(), 1);
        let parts = term(&lexemes[0]);
        assert_eq!(parts.field.as_deref(), Some("age"));
        assert_eq!(parts.operator, Operator::Gte);
        assert_eq!(parts.text, "age >= 25");
    }

    #[test]
    fn test_lex_void_term() {
        let lexemes = lex("foo:");
        assert_eq!(term(&lexemes[0]).value, None);
    }

    #[test]
    fn test_lex_escaped_delimiter() {
        let lexemes = lex(r#""say \"hi\"""#);
        let parts = term(&lexemes[0]);
        assert_eq!(parts.value.as_deref(), Some(r#"say "hi""#));
        assert_eq!(parts.quoting, Quoting::Double);
    }

    #[test]
    fn test_lex_backslash_without_delimiter_is_literal() {
        let lexemes = lex(r"'a\b'");
        assert_eq!(term(&lexemes[0]).value.as_deref(), Some(r"a\b"));
    }

    #[test]
    fn test_lex_unterminated_quote_runs_to_end() {
        let lexemes = lex("'hello world");
        assert_eq!(lexemes.len(), 1);
        let parts = term(&lexemes[0]);
        assert_eq!(parts.value.as_deref(), Some("hello world"));
        assert_eq!(parts.quoting, Quoting::None);
    }

    #[test]
    fn test_lex_bare_word_strips_quotes() {
        let lexemes = lex("don't");
        assert_eq!(term(&lexemes[0]).value.as_deref(), Some("dont"));
    }

    #[test]
    fn test_lex_keyword_prefix_is_not_keyword() {
        let lexemes = lex("android ornament");
        assert!(lexemes.iter().all(|l| matches!(l, Lexeme::Term(_))));
    }
}
