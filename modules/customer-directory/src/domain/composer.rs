//! Progressive query composition.
//!
//! Clauses narrow the working set one at a time, but only while the narrowed
//! set stays non-empty: the first clause that would empty it is dropped
//! together with every clause after it. Search then tries each search field
//! and keeps the first one that matches anything. Sorting comes last.

use ontology_client::{ObjectQuery, OrderBy, Predicate};
use tracing::debug;

use super::filter::FilterClause;
use super::schema::EntitySchema;
use super::DomainError;

/// A validated sort request, `field` or `-field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    attribute: &'static str,
    property: &'static str,
    descending: bool,
}

impl SortSpec {
    /// # Errors
    ///
    /// Returns `InvalidSortAttribute` when the field, without its sign, is not
    /// a public attribute of `schema`.
    pub fn parse(schema: &EntitySchema, raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        let (descending, name) = raw
            .strip_prefix('-')
            .map_or((false, raw), |name| (true, name));
        let attr = schema
            .sort_attribute(name)
            .ok_or_else(|| DomainError::invalid_sort_attribute(name))?;
        Ok(Self {
            attribute: attr.name,
            property: attr.property,
            descending,
        })
    }

    #[must_use]
    pub fn attribute(&self) -> &'static str {
        self.attribute
    }

    #[must_use]
    pub fn is_descending(&self) -> bool {
        self.descending
    }

    fn order_by(&self) -> OrderBy {
        if self.descending {
            OrderBy::desc(self.property)
        } else {
            OrderBy::asc(self.property)
        }
    }
}

/// The composed query and how it came about.
#[derive(Debug)]
pub struct Composition {
    pub query: ObjectQuery,
    /// Clauses that narrowed the set.
    pub applied: usize,
    /// Index of the clause that would have emptied the set, if any.
    pub fell_back_at: Option<usize>,
    /// Search field whose matches replaced the set.
    pub search_field: Option<&'static str>,
}

pub struct QueryComposer {
    schema: &'static EntitySchema,
}

impl QueryComposer {
    #[must_use]
    pub fn new(schema: &'static EntitySchema) -> Self {
        Self { schema }
    }

    /// Narrow `base` by `clauses`, then `search`, then order by `sort`.
    ///
    /// # Errors
    ///
    /// Returns `Store` when an emptiness check against the store fails.
    #[tracing::instrument(skip_all, fields(clauses = clauses.len(), search = search.is_some()))]
    pub async fn compose(
        &self,
        base: ObjectQuery,
        clauses: &[FilterClause],
        search: Option<&str>,
        sort: Option<&SortSpec>,
    ) -> Result<Composition, DomainError> {
        let mut result = base;
        // Emptiness of `result`, once known.
        let mut non_empty: Option<bool> = None;
        let mut applied = 0;
        let mut fell_back_at = None;

        for (idx, clause) in clauses.iter().enumerate() {
            let candidate = result.filter(clause.to_predicate());
            if candidate.is_empty().await? {
                debug!(
                    attribute = clause.attribute(),
                    operator = %clause.condition().operator(),
                    skipped = clauses.len() - idx,
                    "clause would empty the result; keeping previous set"
                );
                fell_back_at = Some(idx);
                break;
            }
            result = candidate;
            non_empty = Some(true);
            applied += 1;
        }

        let mut search_field = None;
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let has_rows = match non_empty {
                Some(known) => known,
                None => !result.is_empty().await?,
            };
            if has_rows {
                for (name, property) in self.schema.search_properties() {
                    let candidate = result.filter(Predicate::starts_with(property, term));
                    if !candidate.is_empty().await? {
                        result = candidate;
                        search_field = Some(name);
                        break;
                    }
                }
                if search_field.is_none() {
                    debug!(term, "search matched no field; keeping unsearched set");
                }
            }
        }

        if let Some(sort) = sort {
            result = result.order_by(sort.order_by());
        }

        Ok(Composition {
            query: result,
            applied,
            fell_back_at,
            search_field,
        })
    }
}
