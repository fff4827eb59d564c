//! burrow-query: a small boolean search language compiled into
//! backend-neutral queries.
//!
//! ```text
//! "name:alice age>30 or smartness>50"
//!        │
//!        ▼  SearchSyntax::parse
//!      Group ──► Compiler::compile ──► Q: Query
//!                  │
//!                  ├─ filters reject terms
//!                  ├─ ranked matchers pick rules per term
//!                  └─ rules build sub-queries in a Builder
//! ```
//!
//! Backends implement [`Query`] (and usually [`Results`]) and expose their
//! monadic operations as extension traits over [`Scope`].

pub mod ast;
pub mod builder;
pub mod compiler;
pub mod config;
pub mod definition;
pub mod error;
pub mod matcher;
pub mod merge;
pub mod pattern;
pub mod query;
pub mod syntax;
pub mod term;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use ast::{Group, Keyword, Node, Operator, Predicate, Quoting, Term};
pub use builder::{Builder, MergingBuilder, Scope};
pub use compiler::{Compiler, RuleContext};
pub use config::{SearchEntry, SearchKind, SurfaceConfig};
pub use definition::{CompilerDefinition, DefinitionBuilder, FilterFn, RuleFn, SearchOptions};
pub use error::{ConfigError, QueryError, QueryResult};
pub use matcher::{FieldFilter, Guard, GuardFn, MatchOptions, Matcher};
pub use merge::{merge_clauses, Expressions};
pub use pattern::LikePattern;
pub use query::{push_unique, ClauseKind, ClauseValue, Clauses, Condition, MergeRule, Query, Results};
pub use syntax::{parse, SearchSyntax, SimpleSyntax};
pub use term::MatchedTerm;
