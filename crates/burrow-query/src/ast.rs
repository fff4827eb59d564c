//! Parsed search trees.
//!
//! A parse always yields a root [`Group`] whose children are groups of
//! [`Term`]s. Both render to a compact s-expression form that the parser
//! tests compare against:
//!
//! ```text
//! "A or B and C or D"  =>  (and (or :eq:A :eq:B) (or :eq:C :eq:D))
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Operators and keywords
// ============================================================================

/// Comparison operator carried by a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    Like,
    NotLike,
}

impl Operator {
    /// Map an infix symbol (`:`, `~`, `<`, `>`, `<=`, `>=`) to its operator
    pub fn from_infix(infix: &str) -> Option<Self> {
        match infix {
            ":" => Some(Self::Eq),
            "~" => Some(Self::Like),
            "<" => Some(Self::Lt),
            ">" => Some(Self::Gt),
            "<=" => Some(Self::Lte),
            ">=" => Some(Self::Gte),
            _ => None,
        }
    }

    /// Logical inverse, applied to negated terms
    pub fn inverse(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Gte,
            Self::Gte => Self::Lt,
            Self::Gt => Self::Lte,
            Self::Lte => Self::Gt,
            Self::Like => Self::NotLike,
            Self::NotLike => Self::Like,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Lte => "lte",
            Self::Gte => "gte",
            Self::Like => "like",
            Self::NotLike => "notlike",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean connective used to merge sub-queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Predicate {
    #[default]
    And,
    Or,
}

impl Predicate {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// The opposite connective, used when a builder is negated
    pub fn flip(self) -> Self {
        match self {
            Self::And => Self::Or,
            Self::Or => Self::And,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword token seen in the input (`and`, `&&`, `or`, `||`, `not`, `!`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyword {
    And,
    Or,
    Not,
}

impl Keyword {
    /// Case-insensitive keyword lookup for a whole word
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "and" | "&&" => Some(Self::And),
            "or" | "||" => Some(Self::Or),
            "not" | "!" => Some(Self::Not),
            _ => None,
        }
    }

    /// The connective this keyword stands for; `not` has none
    pub fn predicate(self) -> Option<Predicate> {
        match self {
            Self::And => Some(Predicate::And),
            Self::Or => Some(Predicate::Or),
            Self::Not => None,
        }
    }
}

/// How a term's value was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quoting {
    #[default]
    None,
    Single,
    Double,
}

impl Quoting {
    pub fn delimiter(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Single => "'",
            Self::Double => "\"",
        }
    }
}

// ============================================================================
// Terms
// ============================================================================

/// A single parsed search term such as `age>=25`, `!name:bob` or `'foo bar'`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    field: Option<String>,
    operator: Operator,
    value: String,
    negated: bool,
    quoting: Quoting,
    text: String,
}

impl Term {
    /// Build a term. A negated term carries the inverse of `operator`.
    pub fn new(
        field: Option<String>,
        operator: Operator,
        value: impl Into<String>,
        quoting: Quoting,
        negated: bool,
    ) -> Self {
        let value = value.into();
        let operator = if negated { operator.inverse() } else { operator };
        let text = match &field {
            Some(field) => format!("{field}:{value}"),
            None => value.clone(),
        };
        Self {
            field,
            operator,
            value,
            negated,
            quoting,
            text,
        }
    }

    /// Plain `value` term with no field
    pub fn bare(value: impl Into<String>) -> Self {
        Self::new(None, Operator::Eq, value, Quoting::None, false)
    }

    /// `field:value` term
    pub fn fielded(field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self::new(Some(field.into()), operator, value, Quoting::None, false)
    }

    pub(crate) fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn quoting(&self) -> Quoting {
        self.quoting
    }

    /// Source text the term was parsed from, trimmed
    pub fn plaintext(&self) -> &str {
        self.text.trim()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quote = self.quoting.delimiter();
        write!(
            f,
            "{}{}:{}:{quote}{}{quote}",
            if self.negated { "!" } else { "" },
            self.field.as_deref().unwrap_or(""),
            self.operator,
            self.value,
        )
    }
}

// ============================================================================
// Groups
// ============================================================================

/// Child of a [`Group`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Term(Term),
    Group(Group),
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Term(term) => term.fmt(f),
            Self::Group(group) => group.fmt(f),
        }
    }
}

/// Ordered children plus the keyword tokens that joined them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    children: Vec<Node>,
    #[serde(default)]
    keywords: Vec<Keyword>,
}

impl Group {
    pub fn new(children: Vec<Node>, keywords: Vec<Keyword>) -> Self {
        Self { children, keywords }
    }

    /// `or` when the first connective keyword is `or`, otherwise `and`
    pub fn predicate(&self) -> Predicate {
        self.keywords
            .iter()
            .find_map(|keyword| keyword.predicate())
            .unwrap_or_default()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// All terms beneath this group, depth first
    pub fn terms(&self) -> Vec<&Term> {
        let mut out = Vec::new();
        for child in &self.children {
            match child {
                Node::Term(term) => out.push(term),
                Node::Group(group) => out.extend(group.terms()),
            }
        }
        out
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.predicate())?;
        for child in &self.children {
            write!(f, " {child}")?;
        }
        f.write_str(")")
    }
}
