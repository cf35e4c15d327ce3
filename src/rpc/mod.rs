//! RPC facade.
//!
//! # Data Flow
//! ```text
//! ResourceManager (domain types, retries, paging)
//!     → ResourceManagerRpc (wire DTOs, one round trip per call)
//!         → http.rs   (HTTP/JSON transport)
//!         → testing::LocalResourceManager (in-process fake)
//! ```
//!
//! # Design Decisions
//! - One trait method per remote capability; no retries or page aggregation here
//! - Options are a map keyed by the closed [`RpcOption`] enum; absent key means server default
//! - `get`-style calls return `Ok(None)` when the resource does not exist

pub mod http;
pub mod wire;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;

pub use http::HttpResourceManagerRpc;

/// Option keys accepted by list and get calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RpcOption {
    Filter,
    Fields,
    PageSize,
    PageToken,
}

impl RpcOption {
    /// Query parameter name on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Fields => "fields",
            Self::PageSize => "pageSize",
            Self::PageToken => "pageToken",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Text(String),
    Int(u32),
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
        }
    }
}

/// Options for a single RPC call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcOptions {
    values: BTreeMap<RpcOption, OptionValue>,
}

impl RpcOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: RpcOption, value: OptionValue) -> &mut Self {
        self.values.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: RpcOption) -> Option<OptionValue> {
        self.values.remove(&key)
    }

    /// Copy of these options with `PAGE_TOKEN` set to `token`.
    pub fn with_page_token(&self, token: impl Into<String>) -> Self {
        let mut options = self.clone();
        options.insert(RpcOption::PageToken, OptionValue::Text(token.into()));
        options
    }

    pub fn get(&self, key: RpcOption) -> Option<&OptionValue> {
        self.values.get(&key)
    }

    /// Value of a string-valued option.
    pub fn get_str(&self, key: RpcOption) -> Option<&str> {
        match self.values.get(&key) {
            Some(OptionValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Value of an integer-valued option.
    pub fn get_int(&self, key: RpcOption) -> Option<u32> {
        match self.values.get(&key) {
            Some(OptionValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Wire query parameters in key order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        self.values
            .iter()
            .map(|(key, value)| (key.wire_name(), value.to_string()))
            .collect()
    }

    /// Body of a POST-style list call.
    pub fn to_list_request(&self) -> wire::ListRequest {
        wire::ListRequest {
            page_size: self.get_int(RpcOption::PageSize),
            page_token: self.get_str(RpcOption::PageToken).map(str::to_string),
        }
    }
}

impl FromIterator<(RpcOption, OptionValue)> for RpcOptions {
    fn from_iter<I: IntoIterator<Item = (RpcOption, OptionValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// A page of wire items plus the cursor of the next page.
pub type RpcPage<T> = (Option<String>, Vec<T>);

/// Transport-facing operations of the resource manager service.
///
/// Implementations perform exactly one round trip per call and report failures
/// as [`crate::ResourceManagerError`] built with `from_status` or `unclassified`.
#[async_trait]
pub trait ResourceManagerRpc: Send + Sync {
    /// Create a new project.
    async fn create(&self, project: wire::Project) -> Result<wire::Project>;

    /// Mark a project for deletion.
    async fn delete(&self, project_id: &str) -> Result<()>;

    /// Retrieve a project. `None` if it is not found or not readable.
    async fn get(&self, project_id: &str, options: &RpcOptions) -> Result<Option<wire::Project>>;

    /// List the projects visible to the caller.
    async fn list(&self, options: &RpcOptions) -> Result<RpcPage<wire::Project>>;

    /// Restore a project in `DELETE_REQUESTED` state.
    async fn undelete(&self, project_id: &str) -> Result<()>;

    /// Replace the mutable attributes of a project.
    async fn replace(&self, project: wire::Project) -> Result<wire::Project>;

    /// IAM policy of a project. `None` if the project is not found.
    async fn get_policy(&self, project_id: &str) -> Result<Option<wire::Policy>>;

    /// Replace the IAM policy of a project. Without an etag the write is unconditional.
    async fn replace_policy(&self, project_id: &str, policy: wire::Policy) -> Result<wire::Policy>;

    /// One flag per requested permission, in request order.
    async fn test_permissions(&self, project_id: &str, permissions: &[String])
        -> Result<Vec<bool>>;

    /// Permission check on an organization resource.
    async fn test_org_permissions(
        &self,
        resource: &str,
        permissions: &[String],
    ) -> Result<BTreeMap<String, bool>>;

    async fn clear_org_policy(&self, resource: &str, request: wire::ClearOrgPolicyRequest)
        -> Result<()>;

    /// Policy merged across the hierarchy; carries no etag.
    async fn get_effective_org_policy(
        &self,
        resource: &str,
        request: wire::GetEffectiveOrgPolicyRequest,
    ) -> Result<wire::OrgPolicy>;

    /// Policy set on the resource, or a default one with an etag usable for
    /// read-modify-write.
    async fn get_org_policy(
        &self,
        resource: &str,
        request: wire::GetOrgPolicyRequest,
    ) -> Result<wire::OrgPolicy>;

    async fn list_available_org_policy_constraints(
        &self,
        resource: &str,
        options: &RpcOptions,
    ) -> Result<RpcPage<wire::Constraint>>;

    async fn list_org_policies(
        &self,
        resource: &str,
        options: &RpcOptions,
    ) -> Result<RpcPage<wire::OrgPolicy>>;

    /// Create or update a policy. Without an etag the write is unconditional.
    async fn set_org_policy(
        &self,
        resource: &str,
        request: wire::SetOrgPolicyRequest,
    ) -> Result<wire::OrgPolicy>;

    async fn create_lien(&self, lien: wire::Lien) -> Result<wire::Lien>;

    /// `None` if no lien has this name.
    async fn get_lien(&self, name: &str) -> Result<Option<wire::Lien>>;

    async fn delete_lien(&self, name: &str) -> Result<()>;

    async fn list_liens(&self, parent: &str, options: &RpcOptions) -> Result<RpcPage<wire::Lien>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_wire_names() {
        assert_eq!(RpcOption::Filter.wire_name(), "filter");
        assert_eq!(RpcOption::Fields.wire_name(), "fields");
        assert_eq!(RpcOption::PageSize.wire_name(), "pageSize");
        assert_eq!(RpcOption::PageToken.wire_name(), "pageToken");
    }

    #[test]
    fn test_typed_accessors() {
        let mut options = RpcOptions::new();
        options
            .insert(RpcOption::PageSize, OptionValue::Int(2))
            .insert(RpcOption::Filter, OptionValue::Text("name:x".into()));

        assert_eq!(options.get_int(RpcOption::PageSize), Some(2));
        assert_eq!(options.get_str(RpcOption::PageSize), None);
        assert_eq!(options.get_str(RpcOption::Filter), Some("name:x"));
        assert_eq!(options.get_str(RpcOption::PageToken), None);
        assert_eq!(
            options.query_pairs(),
            vec![("filter", "name:x".to_string()), ("pageSize", "2".to_string())]
        );
    }

    #[test]
    fn test_page_token_substitution_leaves_original() {
        let mut base = RpcOptions::new();
        base.insert(RpcOption::PageToken, OptionValue::Text("old".into()));
        let next = base.with_page_token("new");

        assert_eq!(base.get_str(RpcOption::PageToken), Some("old"));
        assert_eq!(next.get_str(RpcOption::PageToken), Some("new"));
        assert_eq!(next.to_list_request().page_token.as_deref(), Some("new"));
    }
}
