//! Per-pass decoration around a parsed term.

use crate::ast::{Operator, Quoting, Term};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TermState {
    Open,
    Consumed,
    Rejected,
}

/// A [`Term`] as seen by rule bodies during one compilation.
///
/// Tracks whether the term has been consumed or rejected, an optional field
/// alias, and which rules have claimed it. A fresh `MatchedTerm` is created
/// for every term visit and dropped afterwards.
#[derive(Debug, Clone)]
pub struct MatchedTerm {
    term: Term,
    alias: Option<String>,
    state: TermState,
    claimed_by: Vec<String>,
}

impl MatchedTerm {
    pub fn new(term: Term) -> Self {
        Self {
            term,
            alias: None,
            state: TermState::Open,
            claimed_by: Vec::new(),
        }
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    /// The field rules should see: the alias if one was set, else the parsed field
    pub fn field(&self) -> Option<&str> {
        self.alias.as_deref().or(self.term.field())
    }

    /// The field as typed, ignoring any alias
    pub fn original_field(&self) -> Option<&str> {
        self.term.field()
    }

    pub fn operator(&self) -> Operator {
        self.term.operator()
    }

    pub fn value(&self) -> &str {
        self.term.value()
    }

    pub fn quoting(&self) -> Quoting {
        self.term.quoting()
    }

    pub fn is_negated(&self) -> bool {
        self.term.is_negated()
    }

    pub fn plaintext(&self) -> &str {
        self.term.plaintext()
    }

    /// Rewrite the field seen by later matchers
    pub fn alias(&mut self, field: impl Into<String>) -> &mut Self {
        self.alias = Some(field.into());
        self
    }

    /// Stop further matchers from running on this term
    pub fn consume(&mut self) -> &mut Self {
        if self.state == TermState::Open {
            self.state = TermState::Consumed;
        }
        self
    }

    /// Drop the term entirely; a rejected term can't be claimed again
    pub fn reject(&mut self) -> &mut Self {
        self.state = TermState::Rejected;
        self
    }

    /// True once consumed or rejected
    pub fn is_settled(&self) -> bool {
        self.state != TermState::Open
    }

    pub fn is_consumed(&self) -> bool {
        self.state == TermState::Consumed
    }

    pub fn is_rejected(&self) -> bool {
        self.state == TermState::Rejected
    }

    /// Names of the rules that claimed this term, in claim order
    pub fn claimed_by(&self) -> &[String] {
        &self.claimed_by
    }

    pub fn is_claimed(&self) -> bool {
        !self.claimed_by.is_empty()
    }

    /// Record `rule` as a claimant. Returns false if the term is settled.
    pub(crate) fn claim(&mut self, rule: &str) -> bool {
        if self.is_settled() {
            return false;
        }
        self.claimed_by.push(rule.to_string());
        true
    }
}

impl fmt::Display for MatchedTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(
                f,
                "{}{alias}:{}:{q}{}{q}",
                if self.is_negated() { "!" } else { "" },
                self.operator(),
                self.value(),
                q = self.quoting().delimiter(),
            ),
            None => self.term.fmt(f),
        }
    }
}

impl From<Term> for MatchedTerm {
    fn from(term: Term) -> Self {
        Self::new(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_overrides_field() {
        let mut term = MatchedTerm::new(Term::fielded("nick", Operator::Eq, "bo"));
        term.alias("nickname");
        assert_eq!(term.field(), Some("nickname"));
        assert_eq!(term.original_field(), Some("nick"));
        assert_eq!(term.to_string(), "nickname:eq:bo");
    }

    #[test]
    fn test_rejected_term_cannot_be_claimed() {
        let mut term = MatchedTerm::new(Term::bare("x"));
        assert!(term.claim("first"));
        term.reject();
        assert!(!term.claim("second"));
        assert_eq!(term.claimed_by(), ["first".to_string()]);
    }

    #[test]
    fn test_consume_does_not_undo_reject() {
        let mut term = MatchedTerm::new(Term::bare("x"));
        term.reject().consume();
        assert!(term.is_rejected());
        assert!(!term.is_consumed());
    }
}
