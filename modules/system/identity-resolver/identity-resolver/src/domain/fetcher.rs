//! Fetches a user and its roles from the ontology store.

use std::sync::Arc;

use idm_security::RawIdentityRecord;
use ontology_client::{ObjectQuery, OntologyClient, Predicate};

use super::DomainError;
use crate::config::IdentityResolverConfig;

pub struct IdentityFetcher {
    ontology: Arc<dyn OntologyClient>,
    user_object_type: String,
    role_object_type: String,
    subject_property: String,
    soft_delete_property: String,
    user_id_property: String,
    home_role_id_property: String,
    role_user_id_property: String,
    delete_flag: String,
}

impl IdentityFetcher {
    #[must_use]
    pub fn new(ontology: Arc<dyn OntologyClient>, cfg: &IdentityResolverConfig) -> Self {
        Self {
            ontology,
            user_object_type: cfg.user_object_type.clone(),
            role_object_type: cfg.role_object_type.clone(),
            subject_property: cfg.properties.subject.clone(),
            soft_delete_property: cfg.properties.soft_delete.clone(),
            user_id_property: cfg.properties.user_id.clone(),
            home_role_id_property: cfg.properties.home_role_id.clone(),
            role_user_id_property: cfg.properties.role_user_id.clone(),
            delete_flag: cfg.delete_flag.clone(),
        }
    }

    /// The active user whose subject property equals `subject_id`, with its
    /// roles partitioned around the home role. `None` if no active user
    /// matches.
    ///
    /// # Errors
    ///
    /// - `Store` if the ontology store cannot be queried
    /// - `MalformedRecord` if the user or a role cannot be read
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, subject_id: &str) -> Result<Option<RawIdentityRecord>, DomainError> {
        let user = ObjectQuery::new(Arc::clone(&self.ontology), &self.user_object_type)
            .filter(Predicate::eq(&self.subject_property, subject_id))
            .filter(Predicate::eq(&self.soft_delete_property, self.delete_flag.as_str()).negate())
            .first()
            .await?;
        let Some(user) = user else {
            tracing::debug!("no active user");
            return Ok(None);
        };

        let mut record = RawIdentityRecord::from_user_with_names(
            user,
            &self.user_id_property,
            &self.home_role_id_property,
        )?;
        if let Some(user_id) = record.subject_user_id() {
            let roles = ObjectQuery::new(Arc::clone(&self.ontology), &self.role_object_type)
                .filter(Predicate::eq(&self.role_user_id_property, user_id))
                .fetch_all()
                .await?;
            tracing::debug!(roles = roles.len(), "user roles fetched");
            record.attach_roles(roles)?;
        }
        Ok(Some(record))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use ontology_client::{InMemoryOntology, Record};
    use serde_json::{json, Value};

    use super::*;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn seeded() -> Arc<InMemoryOntology> {
        let store = Arc::new(InMemoryOntology::new());
        store.extend(
            "MyKomatsuUser",
            [
                record(json!({"userId": "u-old", "entraId": "e-1", "softDeleteFlag": "Y"})),
                record(json!({"userId": "u-1", "entraId": "e-1", "homeRoleId": "r-2", "softDeleteFlag": null})),
            ],
        );
        store.extend(
            "MyKomatsuRole",
            [
                record(json!({"id": "r-1", "userId": "u-1", "branchId": "B1"})),
                record(json!({"id": "r-2", "userId": "u-1", "distributorId": "D7"})),
                record(json!({"id": "r-9", "userId": "u-other"})),
            ],
        );
        store
    }

    #[tokio::test]
    async fn skips_soft_deleted_user_and_partitions_roles() {
        let fetcher = IdentityFetcher::new(seeded(), &IdentityResolverConfig::default());

        let record = fetcher.fetch("e-1").await.unwrap().unwrap();

        assert_eq!(record.subject_user_id(), Some("u-1"));
        assert_eq!(record.role_data.primary_user_role.id.as_deref(), Some("r-2"));
        assert_eq!(
            record.role_data.primary_user_role.distributor_id.as_deref(),
            Some("D7")
        );
        assert_eq!(record.role_data.user_roles.len(), 1);
        assert_eq!(record.role_data.user_roles[0].branch_id.as_deref(), Some("B1"));
    }

    #[tokio::test]
    async fn unknown_subject_is_none() {
        let fetcher = IdentityFetcher::new(seeded(), &IdentityResolverConfig::default());

        assert!(fetcher.fetch("e-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_without_id_skips_role_lookup() {
        let store = Arc::new(InMemoryOntology::new());
        store.insert("MyKomatsuUser", record(json!({"entraId": "e-2"})));
        let fetcher = IdentityFetcher::new(store.clone(), &IdentityResolverConfig::default());

        let record = fetcher.fetch("e-2").await.unwrap().unwrap();

        assert!(record.subject_user_id().is_none());
        assert_eq!(store.search_calls(), 1);
    }

    #[tokio::test]
    async fn honours_configured_names() {
        let mut cfg = IdentityResolverConfig::default();
        cfg.user_object_type = "Person".to_owned();
        cfg.properties.subject = "externalId".to_owned();
        cfg.delete_flag = "1".to_owned();

        let store = Arc::new(InMemoryOntology::new());
        store.insert(
            "Person",
            record(json!({"userId": "p-1", "externalId": "x", "softDeleteFlag": "1"})),
        );
        let fetcher = IdentityFetcher::new(store, &cfg);

        assert!(fetcher.fetch("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn configured_user_id_and_home_role_drive_role_lookup() {
        let mut cfg = IdentityResolverConfig::default();
        cfg.properties.user_id = "personId".to_owned();
        cfg.properties.home_role_id = "primaryRoleId".to_owned();

        let store = Arc::new(InMemoryOntology::new());
        store.insert(
            "MyKomatsuUser",
            record(json!({"personId": "p-1", "entraId": "e-3", "primaryRoleId": "r-2"})),
        );
        store.extend(
            "MyKomatsuRole",
            [
                record(json!({"id": "r-1", "userId": "p-1"})),
                record(json!({"id": "r-2", "userId": "p-1", "customerId": "C9"})),
            ],
        );
        let fetcher = IdentityFetcher::new(store, &cfg);

        let record = fetcher.fetch("e-3").await.unwrap().unwrap();

        assert_eq!(record.subject_user_id(), Some("p-1"));
        assert_eq!(record.role_data.primary_user_role.id.as_deref(), Some("r-2"));
        assert_eq!(record.role_data.user_roles.len(), 1);
    }
}
