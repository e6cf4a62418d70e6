//! Content selection query builder
//!
//! Translates an operator's declarative filter request into a normalized,
//! store-agnostic query description. The builder only constructs the query;
//! executing it against a content store is someone else's job.
//!
//! Taxonomy clauses combine with OR at the top level: a post matching any
//! one clause is eligible, so multiple filters broaden the selection, never
//! narrow it. Callers wanting AND semantics must issue separate queries and
//! intersect the results themselves.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, SelectionError};
use crate::types::KEY_SEPARATOR;

/// Wildcard sentinel meaning "every term of the taxonomy"
pub const WILDCARD_TERM: &str = "all";

/// A term defined under a taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub slug: String,
    pub name: String,
}

/// A taxonomy as exposed by the content source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub name: String,
    pub label: String,
}

/// Live view of the taxonomies and terms the content source currently
/// defines. Lookups happen at query-build time, never from a cached
/// snapshot, so results can change between builds if terms are added or
/// removed externally.
pub trait TermSource {
    /// Taxonomies applicable to a post type
    fn taxonomies(&self, post_type: &str) -> Result<Vec<Taxonomy>>;

    /// All terms currently defined for a taxonomy
    fn terms(&self, taxonomy: &str) -> Result<Vec<Term>>;
}

/// One taxonomy filter of a selection request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyFilter {
    pub taxonomy: String,
    /// `None` means wildcard: match every term of the taxonomy
    pub term: Option<String>,
}

impl TaxonomyFilter {
    pub fn new(taxonomy: impl Into<String>, term: impl Into<String>) -> Self {
        let term = term.into();
        Self {
            taxonomy: taxonomy.into(),
            term: normalize_term(Some(term)),
        }
    }

    pub fn wildcard(taxonomy: impl Into<String>) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            term: None,
        }
    }

    /// Parse the encoded `"<taxonomy>_<term>"` form, splitting on the FIRST
    /// separator only. A taxonomy name itself containing the separator is
    /// unsupported.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::MalformedFilter` when the value has no
    /// separator at all, rather than silently producing an over-broad
    /// clause.
    pub fn parse(value: &str) -> Result<Self> {
        let (taxonomy, term) = value
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| SelectionError::MalformedFilter(value.to_string()))?;

        if taxonomy.is_empty() {
            return Err(SelectionError::MalformedFilter(value.to_string()).into());
        }

        Ok(Self {
            taxonomy: taxonomy.to_string(),
            term: normalize_term(Some(term.to_string())),
        })
    }
}

/// Treat the wildcard sentinel and the empty string as "no specific term"
fn normalize_term(term: Option<String>) -> Option<String> {
    match term {
        Some(t) if t.is_empty() || t == WILDCARD_TERM => None,
        other => other,
    }
}

/// Request-scoped filter description; never persisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    pub post_types: Vec<String>,
    pub taxonomy_filters: Vec<TaxonomyFilter>,
    /// When true, every clause matches posts NOT carrying the terms
    pub exclude: bool,
}

/// Clause operator, uniform across all clauses of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClauseOperator {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
}

/// How clauses relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClauseRelation {
    #[serde(rename = "OR")]
    Or,
}

/// One taxonomy clause of the built query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyClause {
    pub taxonomy: String,
    /// Terms are always matched by slug
    pub field: String,
    pub terms: Vec<String>,
    /// Descendant terms match automatically
    pub include_children: bool,
    pub operator: ClauseOperator,
}

/// Normalized query description consumable by a generic content store.
///
/// Stateless and immutable once built; owned solely by the caller that
/// requested it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescription {
    /// Empty set matches nothing, not "match all"
    pub post_types: BTreeSet<String>,
    pub relation: ClauseRelation,
    pub taxonomy_clauses: Vec<TaxonomyClause>,
}

/// Build a query description from selection criteria.
///
/// Wildcard filters resolve against `terms` at build time; everything else
/// is a pure transformation, so identical criteria with unchanged terms
/// yield byte-identical serialized output.
pub fn build_query(
    criteria: &SelectionCriteria,
    terms: &dyn TermSource,
) -> Result<QueryDescription> {
    let operator = if criteria.exclude {
        ClauseOperator::NotIn
    } else {
        ClauseOperator::In
    };

    let mut clauses = Vec::with_capacity(criteria.taxonomy_filters.len());
    for filter in &criteria.taxonomy_filters {
        let clause_terms = match &filter.term {
            Some(term) => vec![term.clone()],
            None => terms
                .terms(&filter.taxonomy)?
                .into_iter()
                .map(|t| t.slug)
                .collect(),
        };

        clauses.push(TaxonomyClause {
            taxonomy: filter.taxonomy.clone(),
            field: "slug".to_string(),
            terms: clause_terms,
            include_children: true,
            operator,
        });
    }

    Ok(QueryDescription {
        post_types: criteria.post_types.iter().cloned().collect(),
        relation: ClauseRelation::Or,
        taxonomy_clauses: clauses,
    })
}

/// Merged taxonomy catalog entry: label plus current terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyTerms {
    pub label: String,
    pub terms: Vec<Term>,
}

/// Catalog of taxonomies (with their current terms) applicable to a list of
/// post types, for the operator to pick filters from. Taxonomies shared by
/// several post types appear once.
pub fn taxonomy_catalog(
    post_types: &[String],
    source: &dyn TermSource,
) -> Result<BTreeMap<String, TaxonomyTerms>> {
    let mut catalog = BTreeMap::new();

    for post_type in post_types {
        for taxonomy in source.taxonomies(post_type)? {
            if catalog.contains_key(&taxonomy.name) {
                continue;
            }
            let terms = source.terms(&taxonomy.name)?;
            catalog.insert(
                taxonomy.name,
                TaxonomyTerms {
                    label: taxonomy.label,
                    terms,
                },
            );
        }
    }

    Ok(catalog)
}

/// Fixed-content term source backed by in-memory maps.
///
/// Available in all builds so tests and the admin tooling can build queries
/// without a live content store.
#[derive(Debug, Clone, Default)]
pub struct StaticTermSource {
    taxonomies_by_post_type: BTreeMap<String, Vec<Taxonomy>>,
    terms_by_taxonomy: BTreeMap<String, Vec<Term>>,
}

impl StaticTermSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_taxonomy(
        mut self,
        post_type: &str,
        taxonomy: &str,
        label: &str,
        term_slugs: &[&str],
    ) -> Self {
        self.taxonomies_by_post_type
            .entry(post_type.to_string())
            .or_default()
            .push(Taxonomy {
                name: taxonomy.to_string(),
                label: label.to_string(),
            });
        let terms = self
            .terms_by_taxonomy
            .entry(taxonomy.to_string())
            .or_default();
        for slug in term_slugs {
            terms.push(Term {
                slug: slug.to_string(),
                name: slug.to_string(),
            });
        }
        self
    }
}

impl TermSource for StaticTermSource {
    fn taxonomies(&self, post_type: &str) -> Result<Vec<Taxonomy>> {
        Ok(self
            .taxonomies_by_post_type
            .get(post_type)
            .cloned()
            .unwrap_or_default())
    }

    fn terms(&self, taxonomy: &str) -> Result<Vec<Term>> {
        Ok(self
            .terms_by_taxonomy
            .get(taxonomy)
            .cloned()
            .unwrap_or_default())
    }
}
