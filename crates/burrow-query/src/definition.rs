//! Compiler definitions: rules, matchers, guards and filters.
//!
//! A definition is assembled once with [`DefinitionBuilder`] and shared by
//! every compiler created from it. `extend` starts a child definition that
//! inherits everything from its parent; a child may re-declare a parent rule
//! to replace its body for all matchers, parent ones included.
//!
//! ```ignore
//! let definition = CompilerDefinition::builder()
//!     .base(SqlQuery::table("badgers"))
//!     .permit(["name", "age"])
//!     .search_in(["name"], SearchOptions::new())
//!     .rule("adults", |ctx| {
//!         ctx.builder.filter("age >= ?", vec![json!(18)])?;
//!         ctx.term.consume();
//!         Ok(())
//!     })
//!     .match_rule("adults", MatchOptions::new().field("adults"))
//!     .build()?;
//! ```

use crate::builder::{Builder, Scope};
use crate::compiler::{Compiler, RuleContext};
use crate::error::{ConfigError, QueryResult};
use crate::matcher::{FieldFilter, Guard, GuardFn, MatchOptions, Matcher};
use crate::query::Query;
use crate::syntax::{SearchSyntax, SimpleSyntax};
use crate::term::MatchedTerm;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Rule body
pub type RuleFn<Q> = Arc<dyn Fn(&mut RuleContext<'_, Q>) -> QueryResult<()> + Send + Sync>;

/// Filter evaluated before any matcher; `false` rejects the term
pub type FilterFn = Arc<dyn Fn(&MatchedTerm) -> bool + Send + Sync>;

/// Rank given to alias matchers so they run before everything else
pub const ALIAS_RANK: i64 = i64::MIN;

// ============================================================================
// Search options
// ============================================================================

/// Options for the `search_in*` helpers.
pub struct SearchOptions<Q: Query> {
    field: Option<String>,
    consume: bool,
    rank: i64,
    when: Option<Guard<Q>>,
    unless: Option<Guard<Q>>,
}

impl<Q: Query> Default for SearchOptions<Q> {
    fn default() -> Self {
        Self {
            field: None,
            consume: true,
            rank: 0,
            when: None,
            unless: None,
        }
    }
}

impl<Q: Query> Clone for SearchOptions<Q> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            consume: self.consume,
            rank: self.rank,
            when: self.when.clone(),
            unless: self.unless.clone(),
        }
    }
}

impl<Q: Query> SearchOptions<Q> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require terms to carry this field (fan-out helpers only; by default
    /// they take fieldless terms)
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Leave the term open for later rules when `false`
    pub fn consume(mut self, consume: bool) -> Self {
        self.consume = consume;
        self
    }

    pub fn rank(mut self, rank: i64) -> Self {
        self.rank = rank;
        self
    }

    pub fn when(mut self, guard: Guard<Q>) -> Self {
        self.when = Some(guard);
        self
    }

    pub fn unless(mut self, guard: Guard<Q>) -> Self {
        self.unless = Some(guard);
        self
    }

    fn fan_out_filter(&self) -> FieldFilter {
        match &self.field {
            Some(field) => FieldFilter::only([field.clone()]),
            None => FieldFilter::fieldless(),
        }
    }

    fn into_match_options(self, fields: FieldFilter) -> MatchOptions<Q> {
        MatchOptions {
            fields,
            rank: self.rank,
            when: self.when,
            unless: self.unless,
        }
    }
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Clone)]
struct MatcherSpec<Q: Query> {
    rule: String,
    options: MatchOptions<Q>,
}

#[derive(Clone)]
struct Declarations<Q: Query> {
    base: Option<Q>,
    syntax: Arc<dyn SearchSyntax>,
    filters: Vec<FilterFn>,
    specs: Vec<MatcherSpec<Q>>,
    rules: HashMap<String, RuleFn<Q>>,
    conditions: HashMap<String, GuardFn<Q>>,
    permitted: Vec<String>,
    aliases: Vec<(String, String)>,
    generated: usize,
}

impl<Q: Query> Default for Declarations<Q> {
    fn default() -> Self {
        Self {
            base: None,
            syntax: Arc::new(SimpleSyntax),
            filters: Vec::new(),
            specs: Vec::new(),
            rules: HashMap::new(),
            conditions: HashMap::new(),
            permitted: Vec::new(),
            aliases: Vec::new(),
            generated: 0,
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Chained registration of rules and matchers.
///
/// Registration errors are collected and reported by [`build`](Self::build).
pub struct DefinitionBuilder<Q: Query> {
    decls: Declarations<Q>,
    own_rules: HashSet<String>,
    errors: Vec<ConfigError>,
}

impl<Q: Query> Default for DefinitionBuilder<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: Query> DefinitionBuilder<Q> {
    pub fn new() -> Self {
        Self {
            decls: Declarations::default(),
            own_rules: HashSet::new(),
            errors: Vec::new(),
        }
    }

    /// Default scope for compilers created without an explicit one
    pub fn base(mut self, query: Q) -> Self {
        self.decls.base = Some(query);
        self
    }

    pub fn syntax(mut self, syntax: Arc<dyn SearchSyntax>) -> Self {
        self.decls.syntax = syntax;
        self
    }

    /// Declare a rule body. Re-declaring a parent's rule replaces it.
    pub fn rule<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut RuleContext<'_, Q>) -> QueryResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        if !self.own_rules.insert(name.clone()) {
            self.errors.push(ConfigError::DuplicateRule { rule: name });
            return self;
        }
        self.decls.rules.insert(name, Arc::new(body));
        self
    }

    /// Run rule `name` for terms accepted by `options`
    pub fn match_rule(mut self, name: impl Into<String>, options: MatchOptions<Q>) -> Self {
        self.decls.specs.push(MatcherSpec {
            rule: name.into(),
            options,
        });
        self
    }

    /// Register a reusable guard for [`Guard::named`]
    pub fn condition<F>(mut self, name: impl Into<String>, guard: F) -> Self
    where
        F: Fn(&Compiler<Q>, &MatchedTerm) -> bool + Send + Sync + 'static,
    {
        self.decls.conditions.insert(name.into(), Arc::new(guard));
        self
    }

    /// Reject terms for which `predicate` is false
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&MatchedTerm) -> bool + Send + Sync + 'static,
    {
        self.decls.filters.push(Arc::new(predicate));
        self
    }

    /// Reject fielded terms whose field is not listed. Fieldless terms pass.
    pub fn permit<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        self.decls.permitted.extend(fields.iter().cloned());
        self.filter(move |term| {
            term.original_field()
                .map_or(true, |field| fields.iter().any(|permitted| permitted == field))
        })
    }

    /// Make later matchers see `target` wherever `field` was typed
    pub fn alias(mut self, field: impl Into<String>, target: impl Into<String>) -> Self {
        let field = field.into();
        let target = target.into();
        let name = self.generated_name("alias");
        self.decls.aliases.push((field.clone(), target.clone()));

        self.rule(name.clone(), move |ctx| {
            ctx.term.alias(target.clone());
            Ok(())
        })
        .match_rule(name, MatchOptions::new().field(field).rank(ALIAS_RANK))
    }

    /// Compare a fielded term against its own field, for the listed fields
    pub fn search_in_specific_fields<I, S>(mut self, fields: I, options: SearchOptions<Q>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = self.generated_name("search_in_specific_fields");
        let consume = options.consume;
        let filter = FieldFilter::only(fields);

        self.rule(name.clone(), move |ctx| {
            ctx.builder.compare(ctx.term)?;
            if consume {
                ctx.term.consume();
            }
            Ok(())
        })
        .match_rule(name, options.into_match_options(filter))
    }

    /// Fan the term out across `fields`, merged under `or`
    pub fn search_in_any_of<I, S>(self, fields: I, options: SearchOptions<Q>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fan_out("search_in_any_of", fields, options, |builder, term, fields| {
            builder.any_of(|scope| {
                for field in fields {
                    scope.compare_field(field, term)?;
                }
                Ok(())
            })?;
            Ok(())
        })
    }

    /// Fan the term out across `fields`, merged under `and`
    pub fn search_in_all_of<I, S>(self, fields: I, options: SearchOptions<Q>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fan_out("search_in_all_of", fields, options, |builder, term, fields| {
            builder.all_of(|scope| {
                for field in fields {
                    scope.compare_field(field, term)?;
                }
                Ok(())
            })?;
            Ok(())
        })
    }

    /// `search_in_specific_fields` for fielded terms plus
    /// `search_in_any_of` for fieldless ones
    pub fn search_in<I, S>(self, fields: I, options: SearchOptions<Q>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        self.search_in_specific_fields(fields.clone(), options.clone())
            .search_in_any_of(fields, options)
    }

    fn fan_out<I, S, G>(mut self, prefix: &str, fields: I, options: SearchOptions<Q>, group: G) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        G: Fn(&mut Builder<Q>, &MatchedTerm, &[String]) -> QueryResult<()>
            + Send
            + Sync
            + 'static,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let name = self.generated_name(prefix);
        let consume = options.consume;
        let filter = options.fan_out_filter();

        self.rule(name.clone(), move |ctx| {
            group(ctx.builder, ctx.term, &fields)?;
            if consume {
                ctx.term.consume();
            }
            Ok(())
        })
        .match_rule(name, options.into_match_options(filter))
    }

    fn generated_name(&mut self, prefix: &str) -> String {
        self.decls.generated += 1;
        format!("{prefix}#{}", self.decls.generated)
    }

    /// Validate and resolve into a definition
    pub fn build(self) -> Result<CompilerDefinition<Q>, ConfigError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }
        let decls = self.decls;

        if !decls.permitted.is_empty() {
            for (field, target) in &decls.aliases {
                if !decls.permitted.contains(field) {
                    warn!(
                        field = %field,
                        target = %target,
                        "alias source is not permitted, alias can never fire"
                    );
                }
            }
        }

        let mut matchers = Vec::with_capacity(decls.specs.len());
        for spec in &decls.specs {
            if !decls.rules.contains_key(&spec.rule) {
                return Err(ConfigError::UndeclaredRule {
                    rule: spec.rule.clone(),
                });
            }
            let when = resolve_guard(spec.options.when.as_ref(), &decls.conditions)?;
            let unless = resolve_guard(spec.options.unless.as_ref(), &decls.conditions)?;
            matchers.push(Matcher::new(
                spec.rule.clone(),
                spec.options.rank,
                spec.options.fields.clone(),
                when,
                unless,
            ));
        }
        // Stable: declaration order breaks ties, parents before children
        matchers.sort_by_key(|matcher| matcher.rank());

        debug!(
            matchers = matchers.len(),
            rules = decls.rules.len(),
            filters = decls.filters.len(),
            "built compiler definition"
        );

        Ok(CompilerDefinition { decls, matchers })
    }
}

fn resolve_guard<Q: Query>(
    guard: Option<&Guard<Q>>,
    conditions: &HashMap<String, GuardFn<Q>>,
) -> Result<Option<GuardFn<Q>>, ConfigError> {
    match guard {
        None => Ok(None),
        Some(Guard::Inline(f)) => Ok(Some(Arc::clone(f))),
        Some(Guard::Named(name)) => conditions
            .get(name)
            .cloned()
            .map(Some)
            .ok_or_else(|| ConfigError::UndeclaredCondition { name: name.clone() }),
    }
}

// ============================================================================
// Definition
// ============================================================================

/// A validated, immutable set of rules and rank-sorted matchers.
pub struct CompilerDefinition<Q: Query> {
    decls: Declarations<Q>,
    matchers: Vec<Matcher<Q>>,
}

impl<Q: Query> CompilerDefinition<Q> {
    pub fn builder() -> DefinitionBuilder<Q> {
        DefinitionBuilder::new()
    }

    /// Start a child definition inheriting everything from this one
    pub fn extend(&self) -> DefinitionBuilder<Q> {
        DefinitionBuilder {
            decls: self.decls.clone(),
            own_rules: HashSet::new(),
            errors: Vec::new(),
        }
    }

    pub fn base(&self) -> Option<&Q> {
        self.decls.base.as_ref()
    }

    pub fn syntax(&self) -> &dyn SearchSyntax {
        self.decls.syntax.as_ref()
    }

    /// Matchers in evaluation order
    pub fn matchers(&self) -> &[Matcher<Q>] {
        &self.matchers
    }

    pub fn filters(&self) -> &[FilterFn] {
        &self.decls.filters
    }

    pub fn rule(&self, name: &str) -> Option<&RuleFn<Q>> {
        self.decls.rules.get(name)
    }

    pub fn has_rules(&self) -> bool {
        !self.decls.rules.is_empty()
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.decls.rules.keys().map(String::as_str)
    }
}

impl<Q: Query> fmt::Debug for CompilerDefinition<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerDefinition")
            .field("base", &self.decls.base)
            .field("syntax", &self.decls.syntax.name())
            .field("filters", &self.decls.filters.len())
            .field("matchers", &self.matchers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockQuery;

    fn noop(_: &mut RuleContext<'_, MockQuery>) -> QueryResult<()> {
        Ok(())
    }

    #[test]
    fn test_matchers_sorted_by_rank() {
        let definition = CompilerDefinition::<MockQuery>::builder()
            .rule("late", noop)
            .rule("early", noop)
            .rule("middle", noop)
            .match_rule("late", MatchOptions::new().rank(1000))
            .match_rule("early", MatchOptions::new().rank(10))
            .match_rule("middle", MatchOptions::new().rank(100))
            .build()
            .unwrap();

        let order: Vec<&str> = definition.matchers().iter().map(|m| m.rule()).collect();
        assert_eq!(order, ["early", "middle", "late"]);
    }

    #[test]
    fn test_undeclared_rule() {
        let err = CompilerDefinition::<MockQuery>::builder()
            .match_rule("missing", MatchOptions::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UndeclaredRule { rule } if rule == "missing"));
    }

    #[test]
    fn test_undeclared_condition() {
        let err = CompilerDefinition::<MockQuery>::builder()
            .rule("generic", noop)
            .match_rule("generic", MatchOptions::new().when(Guard::named("staff")))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UndeclaredCondition { name } if name == "staff"));
    }

    #[test]
    fn test_duplicate_rule_same_level() {
        let err = CompilerDefinition::<MockQuery>::builder()
            .rule("generic", noop)
            .rule("generic", noop)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRule { rule } if rule == "generic"));
    }

    #[test]
    fn test_child_may_redefine_parent_rule() {
        let parent = CompilerDefinition::<MockQuery>::builder()
            .rule("generic", noop)
            .build()
            .unwrap();
        let child = parent.extend().rule("generic", noop).build();
        assert!(child.is_ok());
    }

    #[test]
    fn test_extend_keeps_parent_matchers_first_at_equal_rank() {
        let parent = CompilerDefinition::<MockQuery>::builder()
            .rule("parent", noop)
            .match_rule("parent", MatchOptions::new())
            .build()
            .unwrap();
        let child = parent
            .extend()
            .rule("child", noop)
            .match_rule("child", MatchOptions::new())
            .build()
            .unwrap();

        let order: Vec<&str> = child.matchers().iter().map(|m| m.rule()).collect();
        assert_eq!(order, ["parent", "child"]);
        assert_eq!(parent.matchers().len(), 1);
    }

    #[test]
    fn test_generated_helper_names_are_unique_across_extend() {
        let parent = CompilerDefinition::<MockQuery>::builder()
            .search_in(["name"], SearchOptions::new())
            .build()
            .unwrap();
        let child = parent
            .extend()
            .search_in(["age"], SearchOptions::new())
            .build()
            .unwrap();
        assert_eq!(child.rule_names().count(), 4);
    }
}
