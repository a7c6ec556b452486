//! Filter clauses supplied by callers.
//!
//! Clauses are validated against the entity schema when they are parsed, so
//! composition only ever sees known attributes with well-typed payloads.

use std::fmt;
use std::str::FromStr;

use ontology_client::Predicate;
use serde_json::Value;
use tracing::debug;

use super::schema::{Attribute, AttributeKind, EntitySchema};
use super::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Contains,
    StartsWith,
    IsEmpty,
    IsNotEmpty,
    IsAnyOf,
    Equals,
}

impl FilterOperator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
            Self::IsAnyOf => "is_any_of",
            Self::Equals => "equals",
        }
    }

    #[must_use]
    pub fn takes_value(self) -> bool {
        !matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = DomainError;

    /// `ends_with` is a known operator name the store cannot evaluate yet;
    /// it is rejected like any unknown name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "contains" => Ok(Self::Contains),
            "starts_with" => Ok(Self::StartsWith),
            "is_empty" => Ok(Self::IsEmpty),
            "is_not_empty" => Ok(Self::IsNotEmpty),
            "is_any_of" => Ok(Self::IsAnyOf),
            "equals" => Ok(Self::Equals),
            other => Err(DomainError::unsupported_operator(other)),
        }
    }
}

/// Operator together with its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    /// Any whitespace-separated term occurs in the value.
    Contains(String),
    StartsWith(String),
    IsEmpty,
    IsNotEmpty,
    IsAnyOf(Vec<Value>),
    Equals(Value),
}

impl FilterCondition {
    #[must_use]
    pub fn operator(&self) -> FilterOperator {
        match self {
            Self::Contains(_) => FilterOperator::Contains,
            Self::StartsWith(_) => FilterOperator::StartsWith,
            Self::IsEmpty => FilterOperator::IsEmpty,
            Self::IsNotEmpty => FilterOperator::IsNotEmpty,
            Self::IsAnyOf(_) => FilterOperator::IsAnyOf,
            Self::Equals(_) => FilterOperator::Equals,
        }
    }
}

/// One validated narrowing condition.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    attribute: &'static Attribute,
    condition: FilterCondition,
}

impl FilterClause {
    /// Validate `attribute`, `operator` and `value` against `schema`.
    ///
    /// # Errors
    ///
    /// - `UnknownFilterAttribute` if `attribute` is not a filter key
    /// - `UnsupportedOperator` if `operator` is unknown or not available
    /// - `InvalidFilterValue` if a value is missing or a list is malformed
    ///
    /// A value that does not fit the attribute's type is kept as text. It
    /// then matches no record, so composition drops the clause like any
    /// other emptying clause.
    pub fn parse(
        schema: &EntitySchema,
        attribute: &str,
        operator: &str,
        value: Option<&str>,
    ) -> Result<Self, DomainError> {
        let attr = schema
            .filter_attribute(attribute)
            .ok_or_else(|| DomainError::unknown_filter_attribute(attribute))?;
        let operator: FilterOperator = operator.parse()?;

        let value = value.map(str::trim).filter(|v| !v.is_empty());
        let raw = match (operator.takes_value(), value) {
            (true, Some(v)) => v,
            (true, None) => {
                return Err(DomainError::invalid_filter_value(
                    attribute,
                    format!("operator '{operator}' needs a value"),
                ));
            }
            (false, _) => "",
        };

        let condition = match operator {
            FilterOperator::Contains => FilterCondition::Contains(raw.to_owned()),
            FilterOperator::StartsWith => FilterCondition::StartsWith(raw.to_owned()),
            FilterOperator::IsEmpty => FilterCondition::IsEmpty,
            FilterOperator::IsNotEmpty => FilterCondition::IsNotEmpty,
            FilterOperator::Equals => FilterCondition::Equals(typed_value(attr, raw)),
            FilterOperator::IsAnyOf => FilterCondition::IsAnyOf(
                split_list(attr, raw)?
                    .iter()
                    .map(|v| typed_value(attr, v))
                    .collect(),
            ),
        };

        Ok(Self {
            attribute: attr,
            condition,
        })
    }

    #[must_use]
    pub fn attribute(&self) -> &'static str {
        self.attribute.name
    }

    #[must_use]
    pub fn condition(&self) -> &FilterCondition {
        &self.condition
    }

    /// Store predicate for this clause.
    #[must_use]
    pub fn to_predicate(&self) -> Predicate {
        let property = self.attribute.property;
        match &self.condition {
            FilterCondition::Contains(terms) => Predicate::contains_any_term(property, terms.as_str()),
            FilterCondition::StartsWith(prefix) => Predicate::starts_with(property, prefix.as_str()),
            FilterCondition::IsEmpty => Predicate::is_null(property),
            FilterCondition::IsNotEmpty => Predicate::is_null(property).negate(),
            FilterCondition::IsAnyOf(values) => Predicate::any_of(property, values.iter().cloned()),
            FilterCondition::Equals(value) => Predicate::eq(property, value.clone()),
        }
    }
}

/// Read filter clauses from decoded query pairs.
///
/// A filter key is given twice, operator first and value second:
/// `industry=equals&industry=Mining`. Keys that are not filter keys are
/// skipped. Clauses keep the order in which their keys first appear.
///
/// # Errors
///
/// Returns the first clause error, see [`FilterClause::parse`].
pub fn parse_query_filters(
    schema: &EntitySchema,
    pairs: &[(String, String)],
) -> Result<Vec<FilterClause>, DomainError> {
    let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
    for (key, value) in pairs {
        if !schema.is_filter_key(key) {
            continue;
        }
        match grouped.iter_mut().find(|(k, _)| *k == key.as_str()) {
            Some((_, values)) => values.push(value.as_str()),
            None => grouped.push((key.as_str(), vec![value.as_str()])),
        }
    }

    grouped
        .into_iter()
        .map(|(key, values)| {
            let operator = values.first().copied().unwrap_or_default();
            FilterClause::parse(schema, key, operator, values.get(1).copied())
        })
        .collect()
}

/// `["A","B"]` as JSON, or `A,B` as a plain list.
fn split_list(attr: &Attribute, raw: &str) -> Result<Vec<String>, DomainError> {
    let items: Vec<String> = if raw.starts_with('[') {
        let parsed: Vec<Value> = serde_json::from_str(raw).map_err(|e| {
            DomainError::invalid_filter_value(attr.name, format!("invalid list: {e}"))
        })?;
        parsed
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                other => Err(DomainError::invalid_filter_value(
                    attr.name,
                    format!("list items must be scalars, got {other}"),
                )),
            })
            .collect::<Result<_, _>>()?
    } else {
        raw.split(',').map(|s| s.trim().to_owned()).collect()
    };

    let items: Vec<String> = items.into_iter().filter(|s| !s.trim().is_empty()).collect();
    if items.is_empty() {
        return Err(DomainError::invalid_filter_value(attr.name, "empty list"));
    }
    Ok(items)
}

fn typed_value(attr: &Attribute, raw: &str) -> Value {
    let raw = raw.trim();
    let typed = match attr.kind {
        AttributeKind::Text => None,
        AttributeKind::Integer => raw.parse::<i64>().ok().map(Value::from),
        AttributeKind::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(Value::Bool(true)),
            "false" | "0" | "no" => Some(Value::Bool(false)),
            _ => None,
        },
    };
    typed.unwrap_or_else(|| {
        if attr.kind != AttributeKind::Text {
            debug!(
                attribute = attr.name,
                value = raw,
                "value does not fit attribute type; kept as text"
            );
        }
        Value::from(raw)
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::schema::CUSTOMER_ORGANIZATION;

    fn parse(attribute: &str, operator: &str, value: Option<&str>) -> Result<FilterClause, DomainError> {
        FilterClause::parse(&CUSTOMER_ORGANIZATION, attribute, operator, value)
    }

    fn pairs(raw: &str) -> Vec<(String, String)> {
        serde_urlencoded::from_str(raw).unwrap()
    }

    #[test]
    fn equals_maps_to_store_property() {
        let clause = parse("primary_branch", "equals", Some(" B12 ")).unwrap();

        assert_eq!(clause.to_predicate(), Predicate::eq("primaryBranch", "B12"));
    }

    #[test]
    fn integer_attributes_are_typed() {
        let clause = parse("location_count", "equals", Some("3")).unwrap();
        assert_eq!(clause.to_predicate(), Predicate::eq("locationCount", 3));

        let clause = parse("location_count", "equals", Some("three")).unwrap();
        assert_eq!(clause.to_predicate(), Predicate::eq("locationCount", "three"));
    }

    #[test]
    fn mistyped_value_matches_nothing_instead_of_failing() {
        let clause = parse("status", "equals", Some("Active")).unwrap();
        assert_eq!(clause.to_predicate(), Predicate::eq("status", "Active"));

        let mut record = ontology_client::Record::new();
        record.insert("status".to_owned(), json!(true));
        assert!(!clause.to_predicate().matches(&record));

        let list = parse("status", "is_any_of", Some("Active,true")).unwrap();
        assert_eq!(
            list.condition(),
            &FilterCondition::IsAnyOf(vec![json!("Active"), json!(true)])
        );
    }

    #[test]
    fn contains_uses_the_clause_attribute() {
        let clause = parse("industry", "contains", Some("Mining")).unwrap();

        assert_eq!(
            clause.to_predicate(),
            Predicate::contains_any_term("industry", "Mining")
        );
    }

    #[test]
    fn is_any_of_accepts_json_and_comma_lists() {
        let json_list = parse("status", "is_any_of", Some(r#"["true", false]"#)).unwrap();
        assert_eq!(
            json_list.condition(),
            &FilterCondition::IsAnyOf(vec![json!(true), json!(false)])
        );

        let plain = parse("industry", "is_any_of", Some("Mining, Forestry,")).unwrap();
        assert_eq!(
            plain.to_predicate(),
            Predicate::any_of("industry", ["Mining", "Forestry"])
        );
    }

    #[test]
    fn is_any_of_rejects_code_and_empty_lists() {
        for value in ["[__import__('os')]", "[]", " , ", r#"[{"a": 1}]"#] {
            let err = parse("industry", "is_any_of", Some(value)).unwrap_err();
            assert!(matches!(err, DomainError::InvalidFilterValue { .. }), "{value}");
        }
    }

    #[test]
    fn null_tests_need_no_value() {
        let empty = parse("parent", "is_empty", None).unwrap();
        let present = parse("parent", "is_not_empty", Some("ignored")).unwrap();

        assert_eq!(empty.to_predicate(), Predicate::is_null("parent"));
        assert_eq!(present.to_predicate(), Predicate::is_null("parent").negate());
    }

    #[test]
    fn value_operators_require_a_value() {
        let err = parse("industry", "equals", Some("  ")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidFilterValue { .. }));
    }

    #[test]
    fn ends_with_and_unknown_operators_are_unsupported() {
        for op in ["ends_with", "like", ""] {
            let err = parse("customer_name", op, Some("x")).unwrap_err();
            assert!(matches!(err, DomainError::UnsupportedOperator { .. }), "{op}");
        }
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        for attribute in ["soft_delete_flag", "db_code", "customerName"] {
            let err = parse(attribute, "equals", Some("x")).unwrap_err();
            assert!(matches!(err, DomainError::UnknownFilterAttribute { .. }), "{attribute}");
        }
    }

    #[test]
    fn query_pairs_keep_first_appearance_order_and_skip_other_keys() {
        let clauses = parse_query_filters(
            &CUSTOMER_ORGANIZATION,
            &pairs("status=equals&page_num=2&industry=equals&status=true&industry=Mining&sort_by=x"),
        )
        .unwrap();

        let attrs: Vec<_> = clauses.iter().map(FilterClause::attribute).collect();
        assert_eq!(attrs, vec!["status", "industry"]);
        assert_eq!(clauses[0].condition(), &FilterCondition::Equals(json!(true)));
        assert_eq!(
            clauses[1].condition(),
            &FilterCondition::Equals(json!("Mining"))
        );
    }

    #[test]
    fn query_pairs_surface_operator_errors() {
        let err = parse_query_filters(
            &CUSTOMER_ORGANIZATION,
            &pairs("customer_name=ends_with&customer_name=Co"),
        )
        .unwrap_err();

        assert!(matches!(err, DomainError::UnsupportedOperator { .. }));
    }
}
