//! Static description of the customer organization entity.
//!
//! API attribute names are snake case; the store uses camel case property
//! names. Every allow-list the directory checks lives here.

/// Value type of an attribute, used to type filter payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Text,
    Integer,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    pub property: &'static str,
    pub kind: AttributeKind,
    pub filterable: bool,
}

const fn attr(
    name: &'static str,
    property: &'static str,
    kind: AttributeKind,
    filterable: bool,
) -> Attribute {
    Attribute {
        name,
        property,
        kind,
        filterable,
    }
}

#[derive(Debug)]
pub struct EntitySchema {
    /// Public attributes. Every public attribute is sortable.
    attributes: &'static [Attribute],
    /// Attributes tried, in order, by free-text search.
    search_fields: &'static [&'static str],
}

/// Customer organizations.
pub static CUSTOMER_ORGANIZATION: EntitySchema = EntitySchema {
    attributes: &[
        attr("customer_name", "customerName", AttributeKind::Text, true),
        attr("customer_account_code", "customerAccountCode", AttributeKind::Text, true),
        attr("industry", "industry", AttributeKind::Text, true),
        attr("parent", "parent", AttributeKind::Text, true),
        attr("distributor", "distributor", AttributeKind::Text, true),
        attr("primary_branch", "primaryBranch", AttributeKind::Text, true),
        attr("location_count", "locationCount", AttributeKind::Integer, true),
        attr("user_count", "userCount", AttributeKind::Integer, true),
        attr("machine_count", "machineCount", AttributeKind::Integer, true),
        attr("status", "status", AttributeKind::Boolean, true),
        attr("db_code", "dbCode", AttributeKind::Text, false),
        attr("display_name", "displayName", AttributeKind::Text, false),
    ],
    search_fields: &["customer_name", "customer_account_code", "display_name"],
};

impl EntitySchema {
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&'static Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// The attribute if it may be filtered on.
    #[must_use]
    pub fn filter_attribute(&self, name: &str) -> Option<&'static Attribute> {
        self.attribute(name).filter(|a| a.filterable)
    }

    /// The attribute if it may be sorted by.
    #[must_use]
    pub fn sort_attribute(&self, name: &str) -> Option<&'static Attribute> {
        self.attribute(name)
    }

    #[must_use]
    pub fn is_filter_key(&self, name: &str) -> bool {
        self.filter_attribute(name).is_some()
    }

    /// Store properties of the search fields, in search order.
    #[must_use]
    pub fn search_properties(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.search_fields
            .iter()
            .filter_map(|name| self.attribute(name))
            .map(|a| (a.name, a.property))
    }

    /// Store property for an API attribute name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&'static str> {
        self.attribute(name).map(|a| a.property)
    }
}
