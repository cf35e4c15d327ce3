//! Client facade.
//!
//! # Data Flow
//! ```text
//! caller (domain values + typed options)
//!     → ResourceManager (to wire, lower options)
//!     → RetryPolicy (attempts with backoff on transient codes)
//!     → ResourceManagerRpc (one round trip)
//!     → ResourceManager (from wire, wrap in Project / Lien / Page)
//! ```
//!
//! # Design Decisions
//! - Every call completes, retries included, before the future resolves
//! - Etags are passed through untouched; nothing is cached between calls
//! - List calls return the first [`Page`]; later pages are fetched on demand

mod listing;
pub mod options;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{ResourceManagerConfig, RetryConfig};
use crate::error::Result;
use crate::model::{
    ConstraintInfo, Lien, LienInfo, OrgPolicyInfo, Policy, Project, ProjectInfo,
};
use crate::paging::Page;
use crate::resilience::RetryPolicy;
use crate::rpc::{wire, HttpResourceManagerRpc, ResourceManagerRpc};

use listing::{fetch_page, Constraints, Liens, OrgPolicies, Projects};
pub use options::{
    LienListOption, OrgPolicyListOption, PagingOption, ProjectField, ProjectGetOption,
    ProjectListOption,
};

/// Entry point for project, IAM, org-policy and lien operations.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct ResourceManager {
    rpc: Arc<dyn ResourceManagerRpc>,
    retry: RetryPolicy,
}

impl ResourceManager {
    pub fn new(rpc: Arc<dyn ResourceManagerRpc>, retry: RetryConfig) -> Self {
        Self {
            rpc,
            retry: RetryPolicy::new(retry),
        }
    }

    /// Client over HTTP, configured from `config`.
    pub fn from_config(config: &ResourceManagerConfig) -> Result<Self> {
        let rpc = HttpResourceManagerRpc::new(config)?;
        Ok(Self::new(Arc::new(rpc), config.retries.clone()))
    }

    pub fn rpc(&self) -> &Arc<dyn ResourceManagerRpc> {
        &self.rpc
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    // Projects

    /// Create a project. Server-assigned fields of `project` are not sent.
    pub async fn create(&self, project: &ProjectInfo) -> Result<Project> {
        let request = project.to_request_wire();
        let created = self
            .retry
            .run("create", || self.rpc.create(request.clone()))
            .await?;
        tracing::debug!(project_id = project.project_id(), "Project created");
        Ok(Project::new(ProjectInfo::from_wire(created)))
    }

    /// Mark a project for deletion.
    pub async fn delete(&self, project_id: &str) -> Result<()> {
        self.retry
            .run("delete", || self.rpc.delete(project_id))
            .await?;
        tracing::debug!(project_id, "Project deletion requested");
        Ok(())
    }

    /// `None` if the project does not exist or the caller cannot see it.
    pub async fn get(
        &self,
        project_id: &str,
        options: &[ProjectGetOption],
    ) -> Result<Option<Project>> {
        let options = ProjectGetOption::to_rpc_options(options);
        let project = self
            .retry
            .run("get", || self.rpc.get(project_id, &options))
            .await?;
        Ok(project.map(|dto| Project::new(ProjectInfo::from_wire(dto))))
    }

    /// First page of the projects visible to the caller.
    pub async fn list(&self, options: &[ProjectListOption]) -> Result<Page<Project>> {
        let options = ProjectListOption::to_rpc_options(options);
        fetch_page(self.clone(), Arc::new(Projects), options).await
    }

    /// Restore a project in `DELETE_REQUESTED` state.
    pub async fn undelete(&self, project_id: &str) -> Result<()> {
        self.retry
            .run("undelete", || self.rpc.undelete(project_id))
            .await
    }

    /// Replace the name, labels and parent of an existing project.
    pub async fn replace(&self, project: &ProjectInfo) -> Result<Project> {
        let request = project.to_request_wire();
        let replaced = self
            .retry
            .run("replace", || self.rpc.replace(request.clone()))
            .await?;
        Ok(Project::new(ProjectInfo::from_wire(replaced)))
    }

    // IAM

    /// IAM policy of a project, carrying the etag to present on the next write.
    pub async fn get_policy(&self, project_id: &str) -> Result<Option<Policy>> {
        let policy = self
            .retry
            .run("get_policy", || self.rpc.get_policy(project_id))
            .await?;
        Ok(policy.map(Policy::from_wire))
    }

    /// Replace the IAM policy of a project.
    ///
    /// A policy read earlier carries its etag; if the policy changed since, the
    /// call fails with [`Conflict`](crate::ResourceManagerError::Conflict). A
    /// policy without an etag overwrites whatever is there.
    pub async fn replace_policy(&self, project_id: &str, policy: &Policy) -> Result<Policy> {
        let request = policy.to_wire();
        let updated = self
            .retry
            .run("replace_policy", || {
                self.rpc.replace_policy(project_id, request.clone())
            })
            .await?;
        Ok(Policy::from_wire(updated))
    }

    /// One flag per permission, in the order requested.
    pub async fn test_permissions(
        &self,
        project_id: &str,
        permissions: &[String],
    ) -> Result<Vec<bool>> {
        self.retry
            .run("test_permissions", || {
                self.rpc.test_permissions(project_id, permissions)
            })
            .await
    }

    /// Permission check on an organization resource such as `organizations/123`.
    pub async fn test_org_permissions(
        &self,
        resource: &str,
        permissions: &[String],
    ) -> Result<BTreeMap<String, bool>> {
        self.retry
            .run("test_org_permissions", || {
                self.rpc.test_org_permissions(resource, permissions)
            })
            .await
    }

    // Org policy

    /// Remove the policy for `policy.constraint()` from `resource`.
    ///
    /// The policy's etag, if any, guards the removal.
    pub async fn clear_org_policy(&self, resource: &str, policy: &OrgPolicyInfo) -> Result<()> {
        let request = wire::ClearOrgPolicyRequest {
            constraint: Some(policy.constraint().to_string()),
            etag: policy.etag().map(str::to_string),
        };
        self.retry
            .run("clear_org_policy", || {
                self.rpc.clear_org_policy(resource, request.clone())
            })
            .await
    }

    /// Policy in effect for `constraint` after merging the hierarchy.
    pub async fn get_effective_org_policy(
        &self,
        resource: &str,
        constraint: &str,
    ) -> Result<OrgPolicyInfo> {
        let request = wire::GetEffectiveOrgPolicyRequest {
            constraint: Some(constraint.to_string()),
        };
        let policy = self
            .retry
            .run("get_effective_org_policy", || {
                self.rpc.get_effective_org_policy(resource, request.clone())
            })
            .await?;
        Ok(OrgPolicyInfo::from_wire(policy))
    }

    /// Policy set directly on `resource` for `constraint`.
    pub async fn get_org_policy(&self, resource: &str, constraint: &str) -> Result<OrgPolicyInfo> {
        let request = wire::GetOrgPolicyRequest {
            constraint: Some(constraint.to_string()),
        };
        let policy = self
            .retry
            .run("get_org_policy", || {
                self.rpc.get_org_policy(resource, request.clone())
            })
            .await?;
        Ok(OrgPolicyInfo::from_wire(policy))
    }

    /// First page of constraints that can be set on `resource`.
    pub async fn list_available_org_policy_constraints(
        &self,
        resource: &str,
        options: &[OrgPolicyListOption],
    ) -> Result<Page<ConstraintInfo>> {
        let listing = Constraints {
            resource: resource.to_string(),
        };
        let options = PagingOption::to_rpc_options(options);
        fetch_page(self.clone(), Arc::new(listing), options).await
    }

    /// First page of the policies set on `resource`.
    pub async fn list_org_policies(
        &self,
        resource: &str,
        options: &[OrgPolicyListOption],
    ) -> Result<Page<OrgPolicyInfo>> {
        let listing = OrgPolicies {
            resource: resource.to_string(),
        };
        let options = PagingOption::to_rpc_options(options);
        fetch_page(self.clone(), Arc::new(listing), options).await
    }

    /// Create or update a policy; the etag protocol matches [`Self::replace_policy`].
    pub async fn set_org_policy(
        &self,
        resource: &str,
        policy: &OrgPolicyInfo,
    ) -> Result<OrgPolicyInfo> {
        let request = wire::SetOrgPolicyRequest {
            policy: Some(policy.to_wire()),
        };
        let updated = self
            .retry
            .run("set_org_policy", || {
                self.rpc.set_org_policy(resource, request.clone())
            })
            .await?;
        Ok(OrgPolicyInfo::from_wire(updated))
    }

    // Liens

    pub async fn create_lien(&self, lien: &LienInfo) -> Result<Lien> {
        let request = lien.to_wire();
        let created = self
            .retry
            .run("create_lien", || self.rpc.create_lien(request.clone()))
            .await?;
        let created = LienInfo::from_wire(created);
        tracing::debug!(name = ?created.name(), parent = created.parent(), "Lien created");
        Ok(Lien::new(created))
    }

    /// `None` if no lien has this name.
    pub async fn get_lien(&self, name: &str) -> Result<Option<Lien>> {
        let lien = self
            .retry
            .run("get_lien", || self.rpc.get_lien(name))
            .await?;
        Ok(lien.map(|dto| Lien::new(LienInfo::from_wire(dto))))
    }

    pub async fn delete_lien(&self, name: &str) -> Result<()> {
        self.retry
            .run("delete_lien", || self.rpc.delete_lien(name))
            .await
    }

    /// First page of the liens on `parent` (e.g. `projects/1234`).
    pub async fn list_liens(&self, parent: &str, options: &[LienListOption]) -> Result<Page<Lien>> {
        let listing = Liens {
            parent: parent.to_string(),
        };
        let options = PagingOption::to_rpc_options(options);
        fetch_page(self.clone(), Arc::new(listing), options).await
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
