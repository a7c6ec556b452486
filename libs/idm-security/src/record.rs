//! Raw identity and role records as returned by the ontology store.
//!
//! Nothing in here is validated beyond shape. [`RawIdentityRecord::sanitize`]
//! normalizes the few values the capability resolver relies on; everything
//! else is carried through untouched so it can be echoed back to consumers.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Organisation ids the store uses to mean "not set".
const NULL_LIKE_IDS: [&str; 2] = ["", "None"];

/// Property a user record keeps its id under by default.
pub const USER_ID_PROPERTY: &str = "userId";

/// Property a user record keeps its home role id under by default.
pub const HOME_ROLE_ID_PROPERTY: &str = "homeRoleId";

/// Accepts strings, numbers and booleans as an optional string.
///
/// The store is not consistent about scalar types for id-like properties.
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

fn is_null_like(value: Option<&str>) -> bool {
    value.is_none_or(|v| NULL_LIKE_IDS.contains(&v))
}

/// One role record attached to a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRecord {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    /// Always serialized, `null` when unset.
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer_id: Option<String>,

    /// Always serialized, `null` when unset.
    #[serde(default, deserialize_with = "lenient_string")]
    pub distributor_id: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub branch_id: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub location_id: Option<String>,

    /// Every other property of the role object.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl RoleRecord {
    /// Build a role from a flat property map.
    ///
    /// # Errors
    ///
    /// Returns an error when a known property has a structurally invalid value
    /// (for example an object where an id is expected).
    pub fn from_properties(properties: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(properties))
    }
}

/// Roles of one user split into the home role and everything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleData {
    /// Role whose id equals the user's home role id, or an empty role.
    #[serde(default)]
    pub primary_user_role: RoleRecord,

    /// All remaining roles, in store order.
    #[serde(default)]
    pub user_roles: Vec<RoleRecord>,
}

impl RoleData {
    /// Split `roles` by the home role id.
    ///
    /// The first role whose id matches becomes the primary role; all other
    /// roles (including later duplicates of the home id) are secondary. With
    /// no match the primary role is empty, with both organisation ids unset.
    #[must_use]
    pub fn partition<I>(home_role_id: Option<&str>, roles: I) -> Self
    where
        I: IntoIterator<Item = RoleRecord>,
    {
        let mut primary = None;
        let mut user_roles = Vec::new();

        for role in roles {
            let is_home = primary.is_none()
                && home_role_id.is_some()
                && role.id.as_deref() == home_role_id;
            if is_home {
                primary = Some(role);
            } else {
                user_roles.push(role);
            }
        }

        Self {
            primary_user_role: primary.unwrap_or_default(),
            user_roles,
        }
    }

    /// Every role, primary first.
    pub fn all_roles(&self) -> impl Iterator<Item = &RoleRecord> {
        std::iter::once(&self.primary_user_role).chain(self.user_roles.iter())
    }
}

/// A user record fetched from the ontology store, plus its roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawIdentityRecord {
    #[serde(
        rename = "userId",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,

    /// Older records spell the user id in snake case.
    #[serde(
        rename = "user_id",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_user_id: Option<String>,

    #[serde(
        rename = "homeRoleId",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub home_role_id: Option<String>,

    /// Free-form user type; `admin` (any case, surrounding blanks ignored)
    /// grants the admin flag.
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_type: Option<String>,

    #[serde(default)]
    pub role_data: RoleData,

    /// Every other property of the user object.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl RawIdentityRecord {
    /// Assemble a record from the user's properties and its role objects.
    ///
    /// Any `role_data` present on the user object is replaced by the
    /// partition of `roles` around the user's home role id.
    ///
    /// # Errors
    ///
    /// Returns an error when the user or a role has a structurally invalid
    /// value for one of the known properties.
    pub fn from_parts(
        user: Map<String, Value>,
        roles: Vec<Map<String, Value>>,
    ) -> Result<Self, serde_json::Error> {
        let mut record = Self::from_user(user)?;
        record.attach_roles(roles)?;
        Ok(record)
    }

    /// Read the user's own properties, with no roles attached yet.
    ///
    /// # Errors
    ///
    /// Returns an error when a known property has a structurally invalid value.
    pub fn from_user(user: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(user))
    }

    /// Like [`Self::from_user`], for a store that keeps the user id and home
    /// role id under other property names. A property under the default name
    /// is ignored once another name is configured for it.
    ///
    /// # Errors
    ///
    /// Returns an error when a known property has a structurally invalid value.
    pub fn from_user_with_names(
        mut user: Map<String, Value>,
        user_id: &str,
        home_role_id: &str,
    ) -> Result<Self, serde_json::Error> {
        for (configured, default) in [
            (user_id, USER_ID_PROPERTY),
            (home_role_id, HOME_ROLE_ID_PROPERTY),
        ] {
            if configured != default {
                user.remove(default);
                if let Some(value) = user.remove(configured) {
                    user.insert(default.to_owned(), value);
                }
            }
        }
        Self::from_user(user)
    }

    /// Replace `role_data` with the partition of `roles` around the home
    /// role id.
    ///
    /// # Errors
    ///
    /// Returns an error when a role has a structurally invalid value; the
    /// record is left unchanged in that case.
    pub fn attach_roles(&mut self, roles: Vec<Map<String, Value>>) -> Result<(), serde_json::Error> {
        let roles = roles
            .into_iter()
            .map(RoleRecord::from_properties)
            .collect::<Result<Vec<_>, _>>()?;
        self.role_data = RoleData::partition(self.home_role_id.as_deref(), roles);
        Ok(())
    }

    /// User id under either accepted spelling, if non-empty.
    #[must_use]
    pub fn subject_user_id(&self) -> Option<&str> {
        [self.user_id.as_deref(), self.legacy_user_id.as_deref()]
            .into_iter()
            .flatten()
            .find(|id| !id.is_empty())
    }

    /// Coerce null-like organisation ids on the primary role to `None`.
    ///
    /// Idempotent.
    pub fn sanitize(&mut self) {
        let primary = &mut self.role_data.primary_user_role;
        if is_null_like(primary.customer_id.as_deref()) {
            primary.customer_id = None;
        }
        if is_null_like(primary.distributor_id.as_deref()) {
            primary.distributor_id = None;
        }
    }

    /// Consuming form of [`Self::sanitize`].
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }
}
