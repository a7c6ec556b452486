//! Customer organization records and the shapes they are listed in.

use ontology_client::Record;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Booleans arrive as JSON booleans or as `"True"`/`"False"` strings.
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "y" | "yes" => Some(true),
            "false" | "0" | "n" | "no" => Some(false),
            _ => None,
        },
        Some(Value::Number(n)) => n.as_i64().map(|n| n != 0),
        _ => None,
    })
}

/// Counts arrive as integers, floats or numeric strings.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract().abs() < f64::EPSILON && f.abs() < 9.0e15)
                .map(whole_number)
        }),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Caller guarantees `f` is integral and well inside the `i64` range.
#[allow(clippy::cast_possible_truncation)]
fn whole_number(f: f64) -> i64 {
    f as i64
}

/// One customer organization, read from the store's camel case properties
/// and written in snake case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct Customer {
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer_account_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub distributor: Option<String>,
    /// Distributor that owns the customer.
    #[serde(default, deserialize_with = "lenient_string")]
    pub db_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub primary_branch: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub status: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub soft_delete_flag: Option<String>,

    #[serde(default, deserialize_with = "lenient_count")]
    pub location_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub user_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub machine_count: Option<i64>,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub can_access_shop_manuals: Option<bool>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub can_order_parts: Option<bool>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub primary_phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub secondary_phone_number: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub billing_address_1: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub billing_address_2: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub billing_city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub billing_state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub billing_country: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub billing_zip: Option<String>,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub shipping_same_as_billing: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub shipping_address_1: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub shipping_address_2: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub shipping_city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub shipping_state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub shipping_country: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub shipping_zip: Option<String>,
}

impl Customer {
    /// # Errors
    ///
    /// Returns an error when a known property has a structurally invalid
    /// value.
    pub fn from_record(record: Record) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(record))
    }

    /// Non-empty billing address parts joined with `", "`.
    #[must_use]
    pub fn billing_address(&self) -> String {
        join_address([
            self.billing_address_1.as_deref(),
            self.billing_address_2.as_deref(),
            self.billing_city.as_deref(),
            self.billing_state.as_deref(),
            self.billing_country.as_deref(),
            self.billing_zip.as_deref(),
        ])
    }

    /// Non-empty shipping address parts joined with `", "`.
    #[must_use]
    pub fn shipping_address(&self) -> String {
        join_address([
            self.shipping_address_1.as_deref(),
            self.shipping_address_2.as_deref(),
            self.shipping_city.as_deref(),
            self.shipping_state.as_deref(),
            self.shipping_country.as_deref(),
            self.shipping_zip.as_deref(),
        ])
    }
}

fn join_address(parts: [Option<&str>; 6]) -> String {
    parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Actions the caller may offer on a listed customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct CustomerPermissions {
    pub perm_deactivate: bool,
    pub perm_edit: bool,
    pub perm_delete: bool,
    pub perm_activate: bool,
}

impl CustomerPermissions {
    // TODO: derive per caller once record-level permissions exist in the store.
    #[must_use]
    pub fn granted() -> Self {
        Self {
            perm_deactivate: true,
            perm_edit: true,
            perm_delete: true,
            perm_activate: true,
        }
    }
}

/// A customer as it appears in a filtered listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSummary {
    pub customer_name: Option<String>,
    pub customer_account_code: Option<String>,
    pub industry: Option<String>,
    pub parent: Option<String>,
    pub distributor: Option<String>,
    pub db_code: Option<String>,
    pub status: Option<bool>,
    pub location_count: Option<i64>,
    pub user_count: Option<i64>,
    pub machine_count: Option<i64>,
    pub display_name: Option<String>,
    pub shipping_address: String,
    pub billing_address: String,
    #[serde(flatten)]
    pub permissions: CustomerPermissions,
}

impl CustomerSummary {
    #[must_use]
    pub fn new(customer: Customer, permissions: CustomerPermissions) -> Self {
        let shipping_address = customer.shipping_address();
        let billing_address = customer.billing_address();
        Self {
            customer_name: customer.customer_name,
            customer_account_code: customer.customer_account_code,
            industry: customer.industry,
            parent: customer.parent,
            distributor: customer.distributor,
            db_code: customer.db_code,
            status: customer.status,
            location_count: customer.location_count,
            user_count: customer.user_count,
            machine_count: customer.machine_count,
            display_name: customer.display_name,
            shipping_address,
            billing_address,
            permissions,
        }
    }
}

/// A customer as it appears under its parent organization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildCustomerSummary {
    pub customer_name: Option<String>,
    pub customer_account_code: Option<String>,
    pub distributor: Option<String>,
    pub db_code: Option<String>,
    #[serde(flatten)]
    pub permissions: CustomerPermissions,
}

impl ChildCustomerSummary {
    #[must_use]
    pub fn new(customer: Customer, permissions: CustomerPermissions) -> Self {
        Self {
            customer_name: customer.customer_name,
            customer_account_code: customer.customer_account_code,
            distributor: customer.distributor,
            db_code: customer.db_code,
            permissions,
        }
    }
}
