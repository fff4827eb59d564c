//! Search syntaxes.
//!
//! This module defines the `SearchSyntax` trait a compiler definition uses to
//! turn input into a [`Group`], and `SimpleSyntax`, the default grammar:
//!
//! ```text
//! query   := (keyword | term)*
//! keyword := and | && | or | || | not | !
//! term    := [field infix] value
//! infix   := : | ~ | < | > | <= | >=
//! value   := 'single' | "double" | bare-token
//! ```

mod grouping;
mod lexer;

pub use lexer::Extra;

use crate::ast::Group;

/// Trait for search syntax parsers.
///
/// Parsing is total: implementations degrade malformed input to a
/// best-effort tree instead of failing.
pub trait SearchSyntax: Send + Sync {
    /// Unique name for this syntax
    fn name(&self) -> &'static str;

    /// Parse input into a root group
    fn parse(&self, input: &str) -> Group;
}

/// The default boolean search language.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleSyntax;

impl SearchSyntax for SimpleSyntax {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn parse(&self, input: &str) -> Group {
        parse(input)
    }
}

/// Parse with [`SimpleSyntax`]
pub fn parse(input: &str) -> Group {
    grouping::group(lexer::lex(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Node, Predicate};

    #[test]
    fn test_simple_syntax_name() {
        assert_eq!(SimpleSyntax.name(), "simple");
    }

    #[test]
    fn test_plain_run_defaults_to_and() {
        let root = parse("a b");
        let Node::Group(group) = &root.children()[0] else {
            panic!("expected subgroup");
        };
        assert_eq!(group.predicate(), Predicate::And);
        assert_eq!(group.children().len(), 2);
    }

    #[test]
    fn test_or_run() {
        let root = parse("a or b");
        let Node::Group(group) = &root.children()[0] else {
            panic!("expected subgroup");
        };
        assert_eq!(group.predicate(), Predicate::Or);
    }
}
