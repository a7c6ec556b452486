use std::collections::BTreeSet;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::record::{RawIdentityRecord, RoleData};

/// Coarse caller classification. Exactly one applies to every valid user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// Primary role carries a distributor id.
    Distributor,
    /// Primary role carries a customer id and no distributor id.
    Customer,
    /// Primary role carries neither: an internal user.
    Komatsu,
}

/// `IdentityContext` is the normalized view of the caller of one request.
///
/// Built by the identity resolver and attached to the request before any
/// handler runs. Immutable once built. An anonymous context (no valid user)
/// is a normal value, not an error: every derived field then holds its
/// zero value.
#[derive(Debug, Clone, Default)]
pub struct IdentityContext {
    /// User id from the identity record. `None` for anonymous callers.
    subject_id: Option<String>,
    /// `None` iff the caller is not a valid user.
    kind: Option<PrincipalKind>,
    is_admin: bool,
    distributor_id: Option<String>,
    customer_id: Option<String>,
    branch_ids: BTreeSet<String>,
    location_ids: BTreeSet<String>,
    /// Sanitized record the context was derived from, echoed to consumers.
    record: RawIdentityRecord,
    /// Wall time spent fetching and classifying the identity.
    resolution_time: Duration,
    /// Inbound bearer token. Never serialized.
    bearer_token: Option<SecretString>,
}

impl IdentityContext {
    /// Create a new `IdentityContext` builder
    #[must_use]
    pub fn builder() -> IdentityContextBuilder {
        IdentityContextBuilder::default()
    }

    /// Context of a caller without a resolvable identity.
    #[must_use]
    pub fn anonymous() -> Self {
        IdentityContextBuilder::default().build()
    }

    #[must_use]
    pub fn subject_id(&self) -> Option<&str> {
        self.subject_id.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> Option<PrincipalKind> {
        self.kind
    }

    #[must_use]
    pub fn is_valid_user(&self) -> bool {
        self.kind.is_some()
    }

    #[must_use]
    pub fn is_distributor(&self) -> bool {
        self.kind == Some(PrincipalKind::Distributor)
    }

    #[must_use]
    pub fn is_customer(&self) -> bool {
        self.kind == Some(PrincipalKind::Customer)
    }

    #[must_use]
    pub fn is_komatsu(&self) -> bool {
        self.kind == Some(PrincipalKind::Komatsu)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Internal admins can access everything.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.is_komatsu() && self.is_admin
    }

    #[must_use]
    pub fn distributor_id(&self) -> Option<&str> {
        self.distributor_id.as_deref()
    }

    #[must_use]
    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    #[must_use]
    pub fn branch_ids(&self) -> &BTreeSet<String> {
        &self.branch_ids
    }

    #[must_use]
    pub fn location_ids(&self) -> &BTreeSet<String> {
        &self.location_ids
    }

    #[must_use]
    pub fn record(&self) -> &RawIdentityRecord {
        &self.record
    }

    #[must_use]
    pub fn role_data(&self) -> &RoleData {
        &self.record.role_data
    }

    #[must_use]
    pub fn resolution_time(&self) -> Duration {
        self.resolution_time
    }

    #[must_use]
    pub fn bearer_token(&self) -> Option<&SecretString> {
        self.bearer_token.as_ref()
    }

    /// Attach the inbound bearer token for forwarding.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<SecretString>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Read-only serializable view for downstream consumers.
    ///
    /// The derived flags sit under `identity`; the raw user attributes and
    /// `role_data` are merged in at the top level.
    #[must_use]
    pub fn view(&self) -> IdentityView<'_> {
        IdentityView {
            identity: IdentityFlags {
                performance: Performance {
                    fetch_and_set: format!("{:.2}s", self.resolution_time.as_secs_f64()),
                },
                is_valid_user: self.is_valid_user(),
                is_distributor: self.is_distributor(),
                is_customer: self.is_customer(),
                is_komatsu: self.is_komatsu(),
                is_admin: self.is_admin,
                is_super_admin: self.is_super_admin(),
                distributor_id: self.distributor_id.as_deref(),
                customer_id: self.customer_id.as_deref(),
                branch_ids: &self.branch_ids,
                location_ids: &self.location_ids,
            },
            record: &self.record,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IdentityView<'a> {
    identity: IdentityFlags<'a>,
    #[serde(flatten)]
    record: &'a RawIdentityRecord,
}

#[derive(Debug, Serialize)]
#[allow(clippy::struct_excessive_bools)]
struct IdentityFlags<'a> {
    performance: Performance,
    is_valid_user: bool,
    is_distributor: bool,
    is_customer: bool,
    is_komatsu: bool,
    is_admin: bool,
    is_super_admin: bool,
    distributor_id: Option<&'a str>,
    customer_id: Option<&'a str>,
    branch_ids: &'a BTreeSet<String>,
    location_ids: &'a BTreeSet<String>,
}

#[derive(Debug, Serialize)]
struct Performance {
    fetch_and_set: String,
}

#[derive(Default)]
pub struct IdentityContextBuilder {
    subject_id: Option<String>,
    kind: Option<PrincipalKind>,
    is_admin: bool,
    distributor_id: Option<String>,
    customer_id: Option<String>,
    branch_ids: BTreeSet<String>,
    location_ids: BTreeSet<String>,
    record: RawIdentityRecord,
    resolution_time: Duration,
    bearer_token: Option<SecretString>,
}

impl IdentityContextBuilder {
    #[must_use]
    pub fn subject_id(mut self, subject_id: &str) -> Self {
        self.subject_id = Some(subject_id.to_owned());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: PrincipalKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    #[must_use]
    pub fn distributor_id(mut self, distributor_id: Option<String>) -> Self {
        self.distributor_id = distributor_id;
        self
    }

    #[must_use]
    pub fn customer_id(mut self, customer_id: Option<String>) -> Self {
        self.customer_id = customer_id;
        self
    }

    #[must_use]
    pub fn branch_ids<I: IntoIterator<Item = String>>(mut self, ids: I) -> Self {
        self.branch_ids = ids.into_iter().collect();
        self
    }

    #[must_use]
    pub fn location_ids<I: IntoIterator<Item = String>>(mut self, ids: I) -> Self {
        self.location_ids = ids.into_iter().collect();
        self
    }

    #[must_use]
    pub fn record(mut self, record: RawIdentityRecord) -> Self {
        self.record = record;
        self
    }

    #[must_use]
    pub fn resolution_time(mut self, elapsed: Duration) -> Self {
        self.resolution_time = elapsed;
        self
    }

    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<SecretString>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Build the context. Without a [`PrincipalKind`] every derived field is
    /// reset to its zero value, whatever was set before.
    #[must_use]
    pub fn build(self) -> IdentityContext {
        let mut ctx = IdentityContext {
            subject_id: self.subject_id,
            kind: self.kind,
            is_admin: self.is_admin,
            distributor_id: self.distributor_id,
            customer_id: self.customer_id,
            branch_ids: self.branch_ids,
            location_ids: self.location_ids,
            record: self.record,
            resolution_time: self.resolution_time,
            bearer_token: self.bearer_token,
        };
        if ctx.kind.is_none() {
            ctx.subject_id = None;
            ctx.is_admin = false;
            ctx.distributor_id = None;
            ctx.customer_id = None;
            ctx.branch_ids.clear();
            ctx.location_ids.clear();
        }
        ctx
    }
}
