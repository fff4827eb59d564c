//! Turns the flat lexeme stream into nested groups.
//!
//! Terms sit in slots separated by whatever keywords appeared between them.
//! Maximal runs of slots joined by `or` become one group; the remaining slots
//! are collected into `and` groups between them. So `A B or C D` becomes
//! `(and (and A) (or B C) (and D))`.

use super::lexer::Lexeme;
use crate::ast::{Group, Keyword, Node, Predicate, Term};

pub(crate) fn group(lexemes: Vec<Lexeme>) -> Group {
    let mut root_keywords = Vec::new();
    // Void terms (`foo:`) keep their slot but add no child
    let mut slots: Vec<Option<Term>> = Vec::new();
    // separators[i] holds the keywords between slot i and slot i + 1
    let mut separators: Vec<Vec<Keyword>> = Vec::new();
    let mut pending = Vec::new();
    let mut negate = false;

    for lexeme in lexemes {
        match lexeme {
            Lexeme::Keyword(Keyword::Not) => negate = true,
            Lexeme::Keyword(keyword) => pending.push(keyword),
            Lexeme::Term(parts) => {
                let keywords = std::mem::take(&mut pending);
                if slots.is_empty() {
                    root_keywords.extend(keywords);
                } else {
                    separators.push(keywords);
                }
                slots.push(parts.into_term(negate));
                negate = false;
            }
        }
    }

    if slots.is_empty() {
        return Group::new(Vec::new(), pending);
    }
    // Anything left in `pending` trails the last term and is dropped

    let or_separators: Vec<bool> = separators.iter().map(|keywords| is_or(keywords)).collect();
    let or_linked = |slot: usize| {
        (slot > 0 && or_separators[slot - 1])
            || (slot < or_separators.len() && or_separators[slot])
    };

    let mut groups = Vec::new();
    let mut children = Vec::new();
    let mut keywords = Vec::new();

    for (i, slot) in slots.into_iter().enumerate() {
        if i > 0 {
            let separator = std::mem::take(&mut separators[i - 1]);
            if or_separators[i - 1] || (!or_linked(i - 1) && !or_linked(i)) {
                keywords.extend(separator);
            } else {
                let finished = Group::new(std::mem::take(&mut children), std::mem::take(&mut keywords));
                groups.push(Node::Group(finished));
                root_keywords.extend(separator);
            }
        }
        if let Some(term) = slot {
            children.push(Node::Term(term));
        }
    }
    groups.push(Node::Group(Group::new(children, keywords)));

    Group::new(groups, root_keywords)
}

/// A separator is `or` when its first connective keyword is `or`
fn is_or(keywords: &[Keyword]) -> bool {
    keywords.iter().find_map(|keyword| keyword.predicate()) == Some(Predicate::Or)
}
