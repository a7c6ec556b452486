use serde::Deserialize;

/// Configuration for the `customer_directory` module
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustomerDirectoryConfig {
    /// Object type holding customer organizations.
    pub object_type: String,

    /// Property compared with `delete_flag`.
    pub soft_delete_property: String,

    /// Value of the soft-delete property that marks an organization deleted.
    pub delete_flag: String,

    pub default_page_size: usize,

    /// Upper bound for a caller-supplied `page_size`.
    pub max_page_size: usize,

    /// Reject callers without a resolved identity.
    pub require_valid_user: bool,
}

impl Default for CustomerDirectoryConfig {
    fn default() -> Self {
        Self {
            object_type: "MyKomatsuCustomerOrganization".to_owned(),
            soft_delete_property: "softDeleteFlag".to_owned(),
            delete_flag: "Y".to_owned(),
            default_page_size: 20,
            max_page_size: 500,
            require_valid_user: true,
        }
    }
}

impl CustomerDirectoryConfig {
    /// `requested` clamped to `1..=max_page_size`, or the default page size.
    #[must_use]
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}
