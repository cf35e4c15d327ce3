//! HTTP/JSON transport.
//!
//! # Responsibilities
//! - Map each facade operation onto one REST call
//! - Decode the `{"error": {...}}` envelope of non-2xx responses into a status-bearing error
//! - Wrap connection and decode failures as unclassified errors, keeping the cause
//!
//! Projects and project IAM live under `v1beta1/`, org policy and liens under `v1/`.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ResourceManagerConfig;
use crate::error::{ResourceManagerError, Result};
use crate::rpc::{wire, ResourceManagerRpc, RpcOptions, RpcPage};

const PROJECTS: &str = "v1beta1/projects";
const LIENS: &str = "v1/liens";

/// [`ResourceManagerRpc`] over HTTP.
#[derive(Clone)]
pub struct HttpResourceManagerRpc {
    client: Client,
    endpoint: Url,
}

impl HttpResourceManagerRpc {
    /// Build a transport from the endpoint and timeouts in `config`.
    pub fn new(config: &ResourceManagerConfig) -> Result<Self> {
        let mut endpoint =
            Url::parse(&config.endpoint).map_err(ResourceManagerError::unclassified)?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .build()
            .map_err(ResourceManagerError::unclassified)?;

        tracing::debug!(endpoint = %endpoint, "HTTP transport initialized");
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.endpoint
            .join(path)
            .map_err(ResourceManagerError::unclassified)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(ResourceManagerError::unclassified)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<wire::ErrorResponse>(&body)
            .ok()
            .and_then(|envelope| envelope.error.message)
            .unwrap_or_else(|| format!("{status}: {body}"));

        tracing::debug!(status = status.as_u16(), message = %message, "Service returned error");
        Err(ResourceManagerError::from_status(status.as_u16(), message))
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.execute(request)
            .await?
            .json::<T>()
            .await
            .map_err(ResourceManagerError::unclassified)
    }

    async fn call_empty(&self, request: RequestBuilder) -> Result<()> {
        self.execute(request).await.map(|_| ())
    }
}

impl std::fmt::Debug for HttpResourceManagerRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResourceManagerRpc")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

/// `Ok(None)` for the listed "does not exist" codes.
fn absent_on<T>(result: Result<T>, codes: &[u16]) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.code().is_some_and(|code| codes.contains(&code)) => Ok(None),
        Err(err) => Err(err),
    }
}

fn granted_flags(requested: &[String], granted: &[String]) -> Vec<bool> {
    requested
        .iter()
        .map(|permission| granted.contains(permission))
        .collect()
}

#[async_trait]
impl ResourceManagerRpc for HttpResourceManagerRpc {
    async fn create(&self, project: wire::Project) -> Result<wire::Project> {
        let request = self.client.post(self.url(PROJECTS)?).json(&project);
        self.call(request).await
    }

    async fn delete(&self, project_id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("{PROJECTS}/{project_id}"))?);
        self.call_empty(request).await
    }

    async fn get(&self, project_id: &str, options: &RpcOptions) -> Result<Option<wire::Project>> {
        let request = self
            .client
            .get(self.url(&format!("{PROJECTS}/{project_id}"))?)
            .query(&options.query_pairs());
        absent_on(self.call(request).await, &[403, 404])
    }

    async fn list(&self, options: &RpcOptions) -> Result<RpcPage<wire::Project>> {
        let request = self
            .client
            .get(self.url(PROJECTS)?)
            .query(&options.query_pairs());
        let response: wire::ListProjectsResponse = self.call(request).await?;
        Ok((response.next_page_token, response.projects))
    }

    async fn undelete(&self, project_id: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("{PROJECTS}/{project_id}:undelete"))?)
            .json(&serde_json::json!({}));
        self.call_empty(request).await
    }

    async fn replace(&self, project: wire::Project) -> Result<wire::Project> {
        let project_id = project.project_id.clone().unwrap_or_default();
        let request = self
            .client
            .put(self.url(&format!("{PROJECTS}/{project_id}"))?)
            .json(&project);
        self.call(request).await
    }

    async fn get_policy(&self, project_id: &str) -> Result<Option<wire::Policy>> {
        let request = self
            .client
            .post(self.url(&format!("{PROJECTS}/{project_id}:getIamPolicy"))?)
            .json(&wire::GetIamPolicyRequest::default());
        absent_on(self.call(request).await, &[403, 404])
    }

    async fn replace_policy(&self, project_id: &str, policy: wire::Policy) -> Result<wire::Policy> {
        let request = self
            .client
            .post(self.url(&format!("{PROJECTS}/{project_id}:setIamPolicy"))?)
            .json(&wire::SetIamPolicyRequest { policy });
        self.call(request).await
    }

    async fn test_permissions(
        &self,
        project_id: &str,
        permissions: &[String],
    ) -> Result<Vec<bool>> {
        let request = self
            .client
            .post(self.url(&format!("{PROJECTS}/{project_id}:testIamPermissions"))?)
            .json(&wire::TestIamPermissionsRequest {
                permissions: permissions.to_vec(),
            });
        let response: wire::TestIamPermissionsResponse = self.call(request).await?;
        Ok(granted_flags(permissions, &response.permissions))
    }

    async fn test_org_permissions(
        &self,
        resource: &str,
        permissions: &[String],
    ) -> Result<BTreeMap<String, bool>> {
        let request = self
            .client
            .post(self.url(&format!("v1/{resource}:testIamPermissions"))?)
            .json(&wire::TestIamPermissionsRequest {
                permissions: permissions.to_vec(),
            });
        let response: wire::TestIamPermissionsResponse = self.call(request).await?;
        let flags = granted_flags(permissions, &response.permissions);
        Ok(permissions.iter().cloned().zip(flags).collect())
    }

    async fn clear_org_policy(
        &self,
        resource: &str,
        request: wire::ClearOrgPolicyRequest,
    ) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("v1/{resource}:clearOrgPolicy"))?)
            .json(&request);
        self.call_empty(request).await
    }

    async fn get_effective_org_policy(
        &self,
        resource: &str,
        request: wire::GetEffectiveOrgPolicyRequest,
    ) -> Result<wire::OrgPolicy> {
        let request = self
            .client
            .post(self.url(&format!("v1/{resource}:getEffectiveOrgPolicy"))?)
            .json(&request);
        self.call(request).await
    }

    async fn get_org_policy(
        &self,
        resource: &str,
        request: wire::GetOrgPolicyRequest,
    ) -> Result<wire::OrgPolicy> {
        let request = self
            .client
            .post(self.url(&format!("v1/{resource}:getOrgPolicy"))?)
            .json(&request);
        self.call(request).await
    }

    async fn list_available_org_policy_constraints(
        &self,
        resource: &str,
        options: &RpcOptions,
    ) -> Result<RpcPage<wire::Constraint>> {
        let request = self
            .client
            .post(self.url(&format!("v1/{resource}:listAvailableOrgPolicyConstraints"))?)
            .json(&options.to_list_request());
        let response: wire::ListAvailableOrgPolicyConstraintsResponse = self.call(request).await?;
        Ok((response.next_page_token, response.constraints))
    }

    async fn list_org_policies(
        &self,
        resource: &str,
        options: &RpcOptions,
    ) -> Result<RpcPage<wire::OrgPolicy>> {
        let request = self
            .client
            .post(self.url(&format!("v1/{resource}:listOrgPolicies"))?)
            .json(&options.to_list_request());
        let response: wire::ListOrgPoliciesResponse = self.call(request).await?;
        Ok((response.next_page_token, response.policies))
    }

    async fn set_org_policy(
        &self,
        resource: &str,
        request: wire::SetOrgPolicyRequest,
    ) -> Result<wire::OrgPolicy> {
        let request = self
            .client
            .post(self.url(&format!("v1/{resource}:setOrgPolicy"))?)
            .json(&request);
        self.call(request).await
    }

    async fn create_lien(&self, lien: wire::Lien) -> Result<wire::Lien> {
        let request = self.client.post(self.url(LIENS)?).json(&lien);
        self.call(request).await
    }

    async fn get_lien(&self, name: &str) -> Result<Option<wire::Lien>> {
        let request = self.client.get(self.url(&format!("v1/{name}"))?);
        absent_on(self.call(request).await, &[404])
    }

    async fn delete_lien(&self, name: &str) -> Result<()> {
        let request = self.client.delete(self.url(&format!("v1/{name}"))?);
        self.call_empty(request).await
    }

    async fn list_liens(&self, parent: &str, options: &RpcOptions) -> Result<RpcPage<wire::Lien>> {
        let mut query = vec![("parent", parent.to_string())];
        query.extend(options.query_pairs());
        let request = self.client.get(self.url(LIENS)?).query(&query);
        let response: wire::ListLiensResponse = self.call(request).await?;
        Ok((response.next_page_token, response.liens))
    }
}
