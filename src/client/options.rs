//! Caller-facing options, lowered to [`RpcOptions`] before each call.

use crate::rpc::{OptionValue, RpcOption, RpcOptions};

/// Project fields that can be selected with a `fields` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProjectField {
    ProjectId,
    Name,
    Labels,
    ProjectNumber,
    State,
    CreateTime,
    Parent,
}

impl ProjectField {
    /// Wire name of the field.
    pub fn selector(self) -> &'static str {
        match self {
            Self::ProjectId => "projectId",
            Self::Name => "name",
            Self::Labels => "labels",
            Self::ProjectNumber => "projectNumber",
            Self::State => "lifecycleState",
            Self::CreateTime => "createTime",
            Self::Parent => "parent",
        }
    }

    /// Comma-separated selectors; the project id is always included.
    fn selection(fields: &[ProjectField]) -> String {
        let mut selected = vec![ProjectField::ProjectId];
        selected.extend(fields.iter().copied());
        selected.sort();
        selected.dedup();
        selected
            .iter()
            .map(|field| field.selector())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Options for [`ResourceManager::get`](crate::ResourceManager::get).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectGetOption {
    /// Return only these fields, plus the project id.
    Fields(Vec<ProjectField>),
}

impl ProjectGetOption {
    pub fn fields(fields: &[ProjectField]) -> Self {
        Self::Fields(fields.to_vec())
    }

    pub(crate) fn to_rpc_options(options: &[ProjectGetOption]) -> RpcOptions {
        options
            .iter()
            .map(|option| match option {
                Self::Fields(fields) => (
                    RpcOption::Fields,
                    OptionValue::Text(ProjectField::selection(fields)),
                ),
            })
            .collect()
    }
}

/// Options for [`ResourceManager::list`](crate::ResourceManager::list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectListOption {
    /// Space-separated `field:value` terms, e.g. `name:my-project labels.color:red`.
    /// `*` matches any present value.
    Filter(String),
    PageSize(u32),
    PageToken(String),
    /// Return only these project fields, plus the project id and the next page token.
    Fields(Vec<ProjectField>),
}

impl ProjectListOption {
    pub fn filter(filter: impl Into<String>) -> Self {
        Self::Filter(filter.into())
    }

    pub fn page_size(page_size: u32) -> Self {
        Self::PageSize(page_size)
    }

    pub fn page_token(token: impl Into<String>) -> Self {
        Self::PageToken(token.into())
    }

    pub fn fields(fields: &[ProjectField]) -> Self {
        Self::Fields(fields.to_vec())
    }

    pub(crate) fn to_rpc_options(options: &[ProjectListOption]) -> RpcOptions {
        options
            .iter()
            .map(|option| match option {
                Self::Filter(filter) => (RpcOption::Filter, OptionValue::Text(filter.clone())),
                Self::PageSize(size) => (RpcOption::PageSize, OptionValue::Int(*size)),
                Self::PageToken(token) => (RpcOption::PageToken, OptionValue::Text(token.clone())),
                Self::Fields(fields) => (
                    RpcOption::Fields,
                    OptionValue::Text(format!(
                        "projects({}),nextPageToken",
                        ProjectField::selection(fields)
                    )),
                ),
            })
            .collect()
    }
}

/// Paging options shared by the lien and org-policy list calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagingOption {
    PageSize(u32),
    PageToken(String),
}

impl PagingOption {
    pub fn page_size(page_size: u32) -> Self {
        Self::PageSize(page_size)
    }

    pub fn page_token(token: impl Into<String>) -> Self {
        Self::PageToken(token.into())
    }

    pub(crate) fn to_rpc_options(options: &[PagingOption]) -> RpcOptions {
        options
            .iter()
            .map(|option| match option {
                Self::PageSize(size) => (RpcOption::PageSize, OptionValue::Int(*size)),
                Self::PageToken(token) => (RpcOption::PageToken, OptionValue::Text(token.clone())),
            })
            .collect()
    }
}

/// Options for [`ResourceManager::list_liens`](crate::ResourceManager::list_liens).
pub type LienListOption = PagingOption;

/// Options for the org-policy and constraint list calls.
pub type OrgPolicyListOption = PagingOption;
