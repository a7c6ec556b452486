use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::OntologyError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OntologyConfig {
    /// Platform base URL; usually the same host the service credentials are
    /// issued by.
    pub base_url: String,

    /// Ontology API name or RID.
    pub ontology: String,

    pub timeout_secs: u64,
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            ontology: String::new(),
            timeout_secs: 30,
        }
    }
}

impl OntologyConfig {
    /// # Errors
    ///
    /// Returns [`OntologyError::Config`] when the base URL is invalid or the
    /// ontology is not set.
    pub fn objects_url(&self) -> Result<Url, OntologyError> {
        if self.ontology.trim().is_empty() {
            return Err(OntologyError::Config("ontology is not set".to_owned()));
        }
        let raw = format!(
            "{}/api/v2/ontologies/{}/objects/",
            self.base_url.trim_end_matches('/'),
            self.ontology.trim()
        );
        Url::parse(&raw).map_err(|e| OntologyError::Config(format!("invalid base_url '{raw}': {e}")))
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn objects_url_is_a_directory() {
        let cfg = OntologyConfig {
            base_url: "https://stack.example.com/".to_owned(),
            ontology: "mykomatsu".to_owned(),
            ..OntologyConfig::default()
        };

        let url = cfg.objects_url().unwrap();
        assert_eq!(
            url.join("MyKomatsuUser/search").unwrap().as_str(),
            "https://stack.example.com/api/v2/ontologies/mykomatsu/objects/MyKomatsuUser/search"
        );
    }

    #[test]
    fn objects_url_requires_ontology() {
        let cfg = OntologyConfig {
            base_url: "https://stack.example.com".to_owned(),
            ..OntologyConfig::default()
        };
        assert!(matches!(cfg.objects_url(), Err(OntologyError::Config(_))));
    }
}
