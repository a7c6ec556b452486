//! Turns a raw identity record into an [`IdentityContext`].

use std::collections::BTreeSet;
use std::time::Instant;

use idm_security::{IdentityContext, PrincipalKind, RawIdentityRecord, RoleRecord};

/// Classify `record`. `started` marks the beginning of the resolution and
/// only feeds the context's timing attribute.
///
/// A record without a user id yields an anonymous context that still echoes
/// the (sanitized) record.
#[must_use]
pub fn resolve(record: RawIdentityRecord, started: Instant) -> IdentityContext {
    let record = record.sanitized();

    let Some(subject_id) = record.subject_user_id().map(str::to_owned) else {
        return IdentityContext::builder()
            .record(record)
            .resolution_time(started.elapsed())
            .build();
    };

    let primary = &record.role_data.primary_user_role;
    let distributor_id = primary.distributor_id.clone();
    let customer_id = primary.customer_id.clone();

    let kind = if distributor_id.is_some() {
        PrincipalKind::Distributor
    } else if customer_id.is_some() {
        PrincipalKind::Customer
    } else {
        PrincipalKind::Komatsu
    };

    let is_admin = record
        .user_type
        .as_deref()
        .is_some_and(|t| t.trim().to_lowercase() == "admin");

    let branch_ids = collect_ids(record.role_data.all_roles(), |r| r.branch_id.as_deref());
    let location_ids = collect_ids(record.role_data.all_roles(), |r| r.location_id.as_deref());

    IdentityContext::builder()
        .subject_id(&subject_id)
        .kind(kind)
        .admin(is_admin)
        .distributor_id(distributor_id)
        .customer_id(customer_id)
        .branch_ids(branch_ids)
        .location_ids(location_ids)
        .record(record)
        .resolution_time(started.elapsed())
        .build()
}

/// Trimmed, non-empty values of `field` across `roles`, deduplicated.
fn collect_ids<'a, I, F>(roles: I, field: F) -> BTreeSet<String>
where
    I: Iterator<Item = &'a RoleRecord>,
    F: Fn(&'a RoleRecord) -> Option<&'a str>,
{
    roles
        .filter_map(field)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use idm_security::RoleData;

    use super::*;

    fn role(branch: Option<&str>, location: Option<&str>) -> RoleRecord {
        RoleRecord {
            branch_id: branch.map(str::to_owned),
            location_id: location.map(str::to_owned),
            ..RoleRecord::default()
        }
    }

    fn user(distributor: Option<&str>, customer: Option<&str>, kind: Option<&str>) -> RawIdentityRecord {
        let mut record = RawIdentityRecord {
            user_id: Some("u-1".to_owned()),
            user_type: kind.map(str::to_owned),
            ..RawIdentityRecord::default()
        };
        record.role_data.primary_user_role.distributor_id = distributor.map(str::to_owned);
        record.role_data.primary_user_role.customer_id = customer.map(str::to_owned);
        record
    }

    fn exactly_one_kind(ctx: &IdentityContext) -> bool {
        [ctx.is_distributor(), ctx.is_customer(), ctx.is_komatsu()]
            .into_iter()
            .filter(|f| *f)
            .count()
            == 1
    }

    #[test]
    fn record_without_user_id_is_anonymous() {
        let mut record = user(Some("D1"), Some("C1"), Some("admin"));
        record.user_id = None;
        record.role_data.user_roles.push(role(Some("B1"), Some("L1")));

        let ctx = resolve(record, Instant::now());

        assert!(!ctx.is_valid_user());
        assert!(!ctx.is_distributor() && !ctx.is_customer() && !ctx.is_komatsu());
        assert!(!ctx.is_admin());
        assert!(!ctx.is_super_admin());
        assert!(ctx.distributor_id().is_none());
        assert!(ctx.customer_id().is_none());
        assert!(ctx.branch_ids().is_empty());
        assert!(ctx.location_ids().is_empty());
    }

    #[test]
    fn legacy_user_id_spelling_is_valid() {
        let mut record = user(None, None, None);
        record.user_id = None;
        record.legacy_user_id = Some("u-legacy".to_owned());

        let ctx = resolve(record, Instant::now());

        assert!(ctx.is_valid_user());
        assert_eq!(ctx.subject_id(), Some("u-legacy"));
    }

    #[test]
    fn distributor_takes_precedence_over_customer() {
        let ctx = resolve(user(Some("D1"), Some("C1"), None), Instant::now());

        assert!(ctx.is_distributor());
        assert!(exactly_one_kind(&ctx));
        assert_eq!(ctx.distributor_id(), Some("D1"));
        assert_eq!(ctx.customer_id(), Some("C1"));
    }

    #[test]
    fn null_like_ids_fall_through_to_customer_or_komatsu() {
        let customer = resolve(user(Some("None"), Some("C1"), None), Instant::now());
        assert!(customer.is_customer());
        assert!(exactly_one_kind(&customer));
        assert_eq!(customer.distributor_id(), None);

        let komatsu = resolve(user(Some(""), Some("None"), None), Instant::now());
        assert!(komatsu.is_komatsu());
        assert!(exactly_one_kind(&komatsu));
        assert_eq!(
            komatsu.record().role_data.primary_user_role.customer_id,
            None
        );
    }

    #[test]
    fn admin_type_is_trimmed_and_case_folded() {
        for (kind, expected) in [
            (Some(" Admin "), true),
            (Some("ADMIN"), true),
            (Some("administrator"), false),
            (Some("user"), false),
            (None, false),
        ] {
            let ctx = resolve(user(None, None, kind), Instant::now());
            assert_eq!(ctx.is_admin(), expected, "type {kind:?}");
        }
    }

    #[test]
    fn super_admin_only_for_komatsu_admins() {
        let komatsu = resolve(user(None, None, Some("admin")), Instant::now());
        let customer = resolve(user(None, Some("C1"), Some("admin")), Instant::now());

        assert!(komatsu.is_super_admin());
        assert!(!customer.is_super_admin());
        assert!(customer.is_admin());
    }

    #[test]
    fn branch_and_location_ids_are_trimmed_union_including_primary() {
        let mut record = user(None, Some("C1"), None);
        record.role_data = RoleData {
            primary_user_role: RoleRecord {
                customer_id: Some("C1".to_owned()),
                branch_id: Some(" B1 ".to_owned()),
                location_id: Some("L0".to_owned()),
                ..RoleRecord::default()
            },
            user_roles: vec![
                role(Some("B1"), Some("   ")),
                role(Some("B2"), None),
                role(Some(""), Some("L1 ")),
            ],
        };

        let ctx = resolve(record, Instant::now());

        let branches: Vec<_> = ctx.branch_ids().iter().map(String::as_str).collect();
        let locations: Vec<_> = ctx.location_ids().iter().map(String::as_str).collect();
        assert_eq!(branches, vec!["B1", "B2"]);
        assert_eq!(locations, vec!["L0", "L1"]);
    }

    #[test]
    fn resolving_twice_is_stable() {
        let record = user(Some("None"), Some("C1"), Some("admin"));

        let once = resolve(record.clone(), Instant::now());
        let twice = resolve(once.record().clone(), Instant::now());

        assert_eq!(once.record(), twice.record());
        assert_eq!(once.customer_id(), twice.customer_id());
        assert_eq!(once.kind(), twice.kind());
    }
}
