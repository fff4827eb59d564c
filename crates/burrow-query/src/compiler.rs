//! The compiler: walks a parsed tree, runs matching rules per term, and
//! merges the results group by group.

use crate::ast::{Group, Node, Term};
use crate::builder::Builder;
use crate::definition::CompilerDefinition;
use crate::error::{ConfigError, QueryResult};
use crate::query::Query;
use crate::term::MatchedTerm;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Everything a rule body gets to work with.
pub struct RuleContext<'a, Q: Query> {
    pub term: &'a mut MatchedTerm,
    /// Fresh scope rooted at the compiler's scope
    pub builder: &'a mut Builder<Q>,
    pub compiler: &'a Compiler<Q>,
}

/// Compiles searches against one scope using a shared definition.
pub struct Compiler<Q: Query> {
    definition: Arc<CompilerDefinition<Q>>,
    scope: Q,
}

impl<Q: Query> Compiler<Q> {
    /// Compiler rooted at the definition's base scope
    pub fn new(definition: Arc<CompilerDefinition<Q>>) -> Result<Self, ConfigError> {
        let scope = definition.base().cloned().ok_or(ConfigError::NoBaseScope)?;
        Ok(Self { definition, scope })
    }

    pub fn with_scope(definition: Arc<CompilerDefinition<Q>>, scope: Q) -> Self {
        Self { definition, scope }
    }

    pub fn definition(&self) -> &CompilerDefinition<Q> {
        &self.definition
    }

    pub fn scope(&self) -> &Q {
        &self.scope
    }

    pub fn parse(&self, input: &str) -> Group {
        self.definition.syntax().parse(input)
    }

    /// Parse and compile `input`
    pub fn search(&self, input: &str) -> QueryResult<Q> {
        let root = self.parse(input);
        debug!(
            input,
            syntax = self.definition.syntax().name(),
            tree = %root,
            "compiling search"
        );
        self.compile(&root)
    }

    /// Compile a parsed tree. With nothing to merge the scope comes back
    /// unchanged.
    pub fn compile(&self, root: &Group) -> QueryResult<Q> {
        Ok(self
            .compile_group(root)?
            .unwrap_or_else(|| self.scope.clone()))
    }

    fn compile_group(&self, group: &Group) -> QueryResult<Option<Q>> {
        let mut pending = Vec::new();
        for child in group.children() {
            match child {
                Node::Term(term) => pending.extend(self.match_and_apply_rules(term)?),
                Node::Group(inner) => pending.extend(self.compile_group(inner)?),
            }
        }

        let predicate = group.predicate();
        debug!(predicate = %predicate, parts = pending.len(), "merging group");
        let Some((first, rest)) = pending.split_first() else {
            return Ok(None);
        };
        Ok(Some(first.merge(predicate, rest)))
    }

    /// Run the matcher pipeline for one term and collect its sub-queries
    pub fn match_and_apply_rules(&self, term: &Term) -> QueryResult<Vec<Q>> {
        if !self.definition.has_rules() {
            return Err(ConfigError::NoRules.into());
        }

        let mut matched = MatchedTerm::new(term.clone());
        if let Some(index) = self
            .definition
            .filters()
            .iter()
            .position(|filter| !filter(&matched))
        {
            matched.reject();
            debug!(term = %term, filter = index, "term rejected by filter");
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for matcher in self.definition.matchers() {
            if matched.is_settled() {
                break;
            }
            if !matcher.matches(self, &matched) {
                trace!(rule = matcher.rule(), term = %matched, "matcher skipped");
                continue;
            }
            results.extend(self.apply_rule(matcher.rule(), &mut matched)?);
        }

        debug!(
            term = %term,
            claimed_by = ?matched.claimed_by(),
            results = results.len(),
            "resolved term"
        );
        Ok(results)
    }

    /// Claim `term` for `rule` and run the rule in a fresh builder.
    ///
    /// Returns `None` when the term was already settled or the rule made no
    /// monadic call.
    pub fn apply_rule(&self, rule: &str, term: &mut MatchedTerm) -> QueryResult<Option<Q>> {
        let body = self
            .definition
            .rule(rule)
            .cloned()
            .ok_or_else(|| ConfigError::UndeclaredRule {
                rule: rule.to_string(),
            })?;
        if !term.claim(rule) {
            return Ok(None);
        }

        let mut builder = Builder::new(self.scope.clone(), term.is_negated());
        let mut context = RuleContext {
            term,
            builder: &mut builder,
            compiler: self,
        };
        body(&mut context)?;

        Ok(builder.is_touched().then(|| builder.into_result()))
    }
}

impl<Q: Query> fmt::Debug for Compiler<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("definition", &self.definition)
            .field("scope", &self.scope)
            .finish()
    }
}
