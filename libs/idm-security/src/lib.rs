#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Identity types shared by the identity resolver and its consumers.
//!
//! - [`RawIdentityRecord`] is what the ontology store returns for a user,
//!   together with its roles grouped into [`RoleData`].
//! - [`IdentityContext`] is the normalized, privilege-classified view of the
//!   caller that request handlers consume.

pub mod context;
pub mod record;

pub use context::{IdentityContext, IdentityContextBuilder, IdentityView, PrincipalKind};
pub use record::{
    RawIdentityRecord, RoleData, RoleRecord, HOME_ROLE_ID_PROPERTY, USER_ID_PROPERTY,
};
