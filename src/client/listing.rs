//! List sources behind [`Page`] fetchers.
//!
//! Each listing knows which list RPC to call and how to lift its wire items. The
//! option set is fixed when the first page is requested; later pages only swap
//! the page token.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt};

use crate::client::ResourceManager;
use crate::error::Result;
use crate::model::{ConstraintInfo, Lien, LienInfo, OrgPolicyInfo, Project, ProjectInfo};
use crate::paging::{Page, PageFetcher};
use crate::rpc::{wire, ResourceManagerRpc, RpcOptions, RpcPage};

#[async_trait]
pub(crate) trait Listing: Send + Sync + 'static {
    type Wire: Send;
    type Item: Send + 'static;

    const OPERATION: &'static str;

    async fn fetch(
        &self,
        rpc: &dyn ResourceManagerRpc,
        options: &RpcOptions,
    ) -> Result<RpcPage<Self::Wire>>;

    fn convert(item: Self::Wire) -> Self::Item;
}

/// Fetch one page through the retry policy and wire up the fetcher for the next.
pub(crate) fn fetch_page<L: Listing>(
    client: ResourceManager,
    listing: Arc<L>,
    options: RpcOptions,
) -> BoxFuture<'static, Result<Page<L::Item>>> {
    async move {
        let (next_page_token, items) = client
            .retry
            .run(L::OPERATION, || listing.fetch(client.rpc.as_ref(), &options))
            .await?;

        tracing::debug!(
            operation = L::OPERATION,
            items = items.len(),
            has_next = next_page_token.is_some(),
            "Fetched page"
        );

        let values = items.into_iter().map(L::convert).collect();
        let fetcher: PageFetcher<L::Item> = Arc::new(move |token: String| {
            fetch_page(client.clone(), listing.clone(), options.with_page_token(token))
        });
        Ok(Page::new(values, next_page_token, fetcher))
    }
    .boxed()
}

pub(crate) struct Projects;

#[async_trait]
impl Listing for Projects {
    type Wire = wire::Project;
    type Item = Project;

    const OPERATION: &'static str = "list";

    async fn fetch(
        &self,
        rpc: &dyn ResourceManagerRpc,
        options: &RpcOptions,
    ) -> Result<RpcPage<wire::Project>> {
        rpc.list(options).await
    }

    fn convert(item: wire::Project) -> Project {
        Project::new(ProjectInfo::from_wire(item))
    }
}

pub(crate) struct Liens {
    pub parent: String,
}

#[async_trait]
impl Listing for Liens {
    type Wire = wire::Lien;
    type Item = Lien;

    const OPERATION: &'static str = "list_liens";

    async fn fetch(
        &self,
        rpc: &dyn ResourceManagerRpc,
        options: &RpcOptions,
    ) -> Result<RpcPage<wire::Lien>> {
        rpc.list_liens(&self.parent, options).await
    }

    fn convert(item: wire::Lien) -> Lien {
        Lien::new(LienInfo::from_wire(item))
    }
}

pub(crate) struct OrgPolicies {
    pub resource: String,
}

#[async_trait]
impl Listing for OrgPolicies {
    type Wire = wire::OrgPolicy;
    type Item = OrgPolicyInfo;

    const OPERATION: &'static str = "list_org_policies";

    async fn fetch(
        &self,
        rpc: &dyn ResourceManagerRpc,
        options: &RpcOptions,
    ) -> Result<RpcPage<wire::OrgPolicy>> {
        rpc.list_org_policies(&self.resource, options).await
    }

    fn convert(item: wire::OrgPolicy) -> OrgPolicyInfo {
        OrgPolicyInfo::from_wire(item)
    }
}

pub(crate) struct Constraints {
    pub resource: String,
}

#[async_trait]
impl Listing for Constraints {
    type Wire = wire::Constraint;
    type Item = ConstraintInfo;

    const OPERATION: &'static str = "list_available_org_policy_constraints";

    async fn fetch(
        &self,
        rpc: &dyn ResourceManagerRpc,
        options: &RpcOptions,
    ) -> Result<RpcPage<wire::Constraint>> {
        rpc.list_available_org_policy_constraints(&self.resource, options)
            .await
    }

    fn convert(item: wire::Constraint) -> ConstraintInfo {
        ConstraintInfo::from_wire(item)
    }
}
