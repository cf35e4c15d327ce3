//! In-memory [`ResourceManagerRpc`].
//!
//! Emulates the service closely enough for client tests: project lifecycle,
//! list filters, field selection, cursor paging, IAM and org-policy etags, and
//! liens. Failures can be queued per operation and every call is counted,
//! including calls that fail.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::client::ResourceManager;
use crate::config::RetryConfig;
use crate::error::{ResourceManagerError, Result};
use crate::model::ConstraintInfo;
use crate::rpc::{wire, ResourceManagerRpc, RpcOption, RpcOptions, RpcPage};

/// Etag reported for a constraint with no policy set.
const UNSET_ORG_POLICY_ETAG: &str = "unset";

#[derive(Default)]
struct State {
    projects: BTreeMap<String, wire::Project>,
    policies: BTreeMap<String, wire::Policy>,
    org_policies: BTreeMap<(String, String), wire::OrgPolicy>,
    constraints: BTreeMap<String, wire::Constraint>,
    org_permissions: BTreeMap<String, BTreeSet<String>>,
    liens: BTreeMap<String, wire::Lien>,
    next_project_number: i64,
    failures: HashMap<String, VecDeque<ResourceManagerError>>,
    calls: HashMap<String, usize>,
}

/// In-memory resource manager service.
#[derive(Default)]
pub struct LocalResourceManager {
    state: Mutex<State>,
}

impl LocalResourceManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Client backed by this fake.
    pub fn client(self: &Arc<Self>, retry: RetryConfig) -> ResourceManager {
        ResourceManager::new(self.clone(), retry)
    }

    /// Fail the next call of `operation` with `err`. Queued failures are
    /// consumed in order, one per call.
    pub async fn inject_failure(&self, operation: &str, err: ResourceManagerError) {
        let mut state = self.state.lock().await;
        state
            .failures
            .entry(operation.to_string())
            .or_default()
            .push_back(err);
    }

    /// Calls of `operation` so far, failed ones included.
    pub async fn call_count(&self, operation: &str) -> usize {
        let state = self.state.lock().await;
        state.calls.get(operation).copied().unwrap_or(0)
    }

    /// Drop a project without going through the deletion lifecycle.
    pub async fn remove_project(&self, project_id: &str) -> bool {
        let mut state = self.state.lock().await;
        state.policies.remove(project_id);
        state.projects.remove(project_id).is_some()
    }

    /// Make a constraint visible to `list_available_org_policy_constraints`.
    pub async fn add_constraint(&self, constraint: &ConstraintInfo) {
        let mut state = self.state.lock().await;
        state
            .constraints
            .insert(constraint.name().to_string(), constraint.to_wire());
    }

    /// Grant `permissions` on an organization resource.
    pub async fn grant_org_permissions(&self, resource: &str, permissions: &[&str]) {
        let mut state = self.state.lock().await;
        state
            .org_permissions
            .entry(resource.to_string())
            .or_default()
            .extend(permissions.iter().map(|p| p.to_string()));
    }

    /// Count the call, then either fail with a queued error or hand out the state.
    async fn begin(&self, operation: &str) -> Result<MutexGuard<'_, State>> {
        let mut state = self.state.lock().await;
        *state.calls.entry(operation.to_string()).or_default() += 1;

        let queued = state
            .failures
            .get_mut(operation)
            .and_then(VecDeque::pop_front);
        match queued {
            Some(err) => {
                tracing::debug!(operation, error = %err, "Injected failure");
                Err(err)
            }
            None => Ok(state),
        }
    }
}

impl std::fmt::Debug for LocalResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalResourceManager").finish_non_exhaustive()
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn new_etag() -> String {
    Uuid::new_v4().simple().to_string()
}

fn error(code: u16, message: impl Into<String>) -> ResourceManagerError {
    ResourceManagerError::from_status(code, message)
}

fn project_not_found(project_id: &str) -> ResourceManagerError {
    error(403, format!("Project {project_id} not found."))
}

/// One page of `items`, which must be sorted by key. The cursor is the key of
/// the first item of the next page.
fn paginate<T: Clone>(items: &BTreeMap<String, T>, options: &RpcOptions) -> RpcPage<T> {
    let start = options.get_str(RpcOption::PageToken).unwrap_or("");
    let mut remaining = items.range::<str, _>((std::ops::Bound::Included(start), std::ops::Bound::Unbounded));

    let limit = match options.get_int(RpcOption::PageSize) {
        Some(0) | None => usize::MAX,
        Some(size) => size as usize,
    };

    let page: Vec<T> = remaining.by_ref().take(limit).map(|(_, item)| item.clone()).collect();
    let next = remaining.next().map(|(key, _)| key.clone());
    (next, page)
}

/// A single `field:value` filter term.
#[derive(Debug, PartialEq, Eq)]
enum FilterTerm {
    Id(String),
    Name(String),
    Label(String, String),
    ParentType(String),
    ParentId(String),
}

fn parse_filter(filter: &str) -> Result<Vec<FilterTerm>> {
    filter
        .split_whitespace()
        .map(|term| {
            let (field, value) = term
                .split_once(':')
                .ok_or_else(|| error(400, format!("Could not parse the filter term '{term}'")))?;
            let field = field.to_lowercase();
            let value = value.to_string();
            match field.as_str() {
                "id" => Ok(FilterTerm::Id(value)),
                "name" => Ok(FilterTerm::Name(value)),
                "parent.type" => Ok(FilterTerm::ParentType(value)),
                "parent.id" => Ok(FilterTerm::ParentId(value)),
                _ => match field.strip_prefix("labels.") {
                    Some(key) => Ok(FilterTerm::Label(key.to_string(), value)),
                    None => Err(error(400, format!("Unknown filter field '{field}'"))),
                },
            }
        })
        .collect()
}

fn value_matches(actual: Option<&str>, wanted: &str, ignore_case: bool) -> bool {
    match actual {
        None => false,
        Some(_) if wanted == "*" => true,
        Some(actual) if ignore_case => actual.eq_ignore_ascii_case(wanted),
        Some(actual) => actual == wanted,
    }
}

fn project_matches(project: &wire::Project, terms: &[FilterTerm]) -> bool {
    let parent = project.parent.as_ref();
    terms.iter().all(|term| match term {
        FilterTerm::Id(wanted) => value_matches(project.project_id.as_deref(), wanted, false),
        FilterTerm::Name(wanted) => value_matches(project.name.as_deref(), wanted, true),
        FilterTerm::Label(key, wanted) => {
            let value = project.labels.as_ref().and_then(|labels| labels.get(key));
            value_matches(value.map(String::as_str), wanted, false)
        }
        FilterTerm::ParentType(wanted) => {
            value_matches(parent.and_then(|p| p.kind.as_deref()), wanted, false)
        }
        FilterTerm::ParentId(wanted) => {
            value_matches(parent.and_then(|p| p.id.as_deref()), wanted, false)
        }
    })
}

/// Selected project fields from a `fields` option, in either the get form
/// (`projectId,name`) or the list form (`projects(projectId,name),nextPageToken`).
fn project_selection(fields: &str) -> BTreeSet<String> {
    let inner = match (fields.find("projects("), fields.rfind(')')) {
        (Some(open), Some(close)) if close > open => &fields[open + "projects(".len()..close],
        _ => fields,
    };
    inner
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}

fn select_fields(project: &wire::Project, selection: &BTreeSet<String>) -> wire::Project {
    let pick = |field: &str| selection.contains(field);
    wire::Project {
        project_id: project.project_id.clone().filter(|_| pick("projectId")),
        name: project.name.clone().filter(|_| pick("name")),
        labels: project.labels.clone().filter(|_| pick("labels")),
        project_number: project.project_number.filter(|_| pick("projectNumber")),
        lifecycle_state: project.lifecycle_state.clone().filter(|_| pick("lifecycleState")),
        create_time: project.create_time.clone().filter(|_| pick("createTime")),
        parent: project.parent.clone().filter(|_| pick("parent")),
    }
}

fn require_constraint(constraint: Option<&String>) -> Result<String> {
    match constraint {
        Some(constraint) if !constraint.is_empty() => Ok(constraint.clone()),
        _ => Err(error(400, "A constraint name is required")),
    }
}

impl State {
    fn project_mut(&mut self, project_id: &str, action: &str) -> Result<&mut wire::Project> {
        self.projects.get_mut(project_id).ok_or_else(|| {
            error(
                403,
                format!("Error when {action} {project_id} because the project was not found."),
            )
        })
    }

    fn current_org_policy_etag(&self, key: &(String, String)) -> String {
        self.org_policies
            .get(key)
            .and_then(|policy| policy.etag.clone())
            .unwrap_or_else(|| UNSET_ORG_POLICY_ETAG.to_string())
    }
}

#[async_trait]
impl ResourceManagerRpc for LocalResourceManager {
    async fn create(&self, project: wire::Project) -> Result<wire::Project> {
        let mut state = self.begin("create").await?;

        let project_id = match project.project_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(error(400, "Project id is required")),
        };
        if state.projects.contains_key(&project_id) {
            return Err(error(
                409,
                format!("A project with the same project ID ({project_id}) already exists."),
            ));
        }

        state.next_project_number += 1;
        let stored = wire::Project {
            project_id: Some(project_id.clone()),
            name: project.name,
            labels: project.labels.filter(|labels| !labels.is_empty()),
            project_number: Some(state.next_project_number),
            lifecycle_state: Some("ACTIVE".to_string()),
            create_time: Some(now()),
            parent: project.parent,
        };
        state.projects.insert(project_id.clone(), stored.clone());
        state.policies.insert(
            project_id,
            wire::Policy {
                bindings: None,
                etag: Some(new_etag()),
                version: Some(0),
            },
        );
        Ok(stored)
    }

    async fn delete(&self, project_id: &str) -> Result<()> {
        let mut state = self.begin("delete").await?;
        let project = state
            .projects
            .get_mut(project_id)
            .ok_or_else(|| project_not_found(project_id))?;
        if project.lifecycle_state.as_deref() != Some("ACTIVE") {
            return Err(error(400, format!("Project {project_id} is not active.")));
        }
        project.lifecycle_state = Some("DELETE_REQUESTED".to_string());
        Ok(())
    }

    async fn get(&self, project_id: &str, options: &RpcOptions) -> Result<Option<wire::Project>> {
        let state = self.begin("get").await?;
        let selection = options.get_str(RpcOption::Fields).map(project_selection);
        Ok(state.projects.get(project_id).map(|project| match &selection {
            Some(selection) => select_fields(project, selection),
            None => project.clone(),
        }))
    }

    async fn list(&self, options: &RpcOptions) -> Result<RpcPage<wire::Project>> {
        let state = self.begin("list").await?;

        let terms = match options.get_str(RpcOption::Filter) {
            Some(filter) => parse_filter(filter)?,
            None => Vec::new(),
        };
        let matching: BTreeMap<String, wire::Project> = state
            .projects
            .iter()
            .filter(|(_, project)| project_matches(project, &terms))
            .map(|(id, project)| (id.clone(), project.clone()))
            .collect();
        let (next, page) = paginate(&matching, options);

        match options.get_str(RpcOption::Fields) {
            Some(fields) => {
                let selection = project_selection(fields);
                let page = page.iter().map(|p| select_fields(p, &selection)).collect();
                let next = next.filter(|_| fields.contains("nextPageToken"));
                Ok((next, page))
            }
            None => Ok((next, page)),
        }
    }

    async fn undelete(&self, project_id: &str) -> Result<()> {
        let mut state = self.begin("undelete").await?;
        let project = state.project_mut(project_id, "undeleting")?;
        if project.lifecycle_state.as_deref() != Some("DELETE_REQUESTED") {
            return Err(error(
                400,
                format!("Project {project_id} is not in DELETE_REQUESTED state."),
            ));
        }
        project.lifecycle_state = Some("ACTIVE".to_string());
        Ok(())
    }

    async fn replace(&self, project: wire::Project) -> Result<wire::Project> {
        let mut state = self.begin("replace").await?;
        let project_id = project.project_id.clone().unwrap_or_default();
        let stored = state.project_mut(&project_id, "replacing")?;
        stored.name = project.name;
        stored.labels = project.labels.filter(|labels| !labels.is_empty());
        stored.parent = project.parent;
        Ok(stored.clone())
    }

    async fn get_policy(&self, project_id: &str) -> Result<Option<wire::Policy>> {
        let state = self.begin("get_policy").await?;
        Ok(state.policies.get(project_id).cloned())
    }

    async fn replace_policy(&self, project_id: &str, policy: wire::Policy) -> Result<wire::Policy> {
        let mut state = self.begin("replace_policy").await?;
        state.project_mut(project_id, "replacing the policy of")?;

        let current = state.policies.entry(project_id.to_string()).or_default();
        if let Some(etag) = &policy.etag {
            if current.etag.as_ref() != Some(etag) {
                return Err(error(409, "Policy etag mismatch"));
            }
        }
        current.bindings = policy.bindings.filter(|bindings| !bindings.is_empty());
        current.etag = Some(new_etag());
        current.version = Some(current.version.unwrap_or(0));
        Ok(current.clone())
    }

    async fn test_permissions(
        &self,
        project_id: &str,
        permissions: &[String],
    ) -> Result<Vec<bool>> {
        let state = self.begin("test_permissions").await?;
        if !state.projects.contains_key(project_id) {
            return Err(project_not_found(project_id));
        }
        Ok(vec![true; permissions.len()])
    }

    async fn test_org_permissions(
        &self,
        resource: &str,
        permissions: &[String],
    ) -> Result<BTreeMap<String, bool>> {
        let state = self.begin("test_org_permissions").await?;
        if !resource.starts_with("organizations/") {
            return Err(error(400, format!("Invalid organization resource {resource}")));
        }
        let granted = state.org_permissions.get(resource);
        Ok(permissions
            .iter()
            .map(|permission| {
                let allowed = granted.is_some_and(|set| set.contains(permission));
                (permission.clone(), allowed)
            })
            .collect())
    }

    async fn clear_org_policy(
        &self,
        resource: &str,
        request: wire::ClearOrgPolicyRequest,
    ) -> Result<()> {
        let mut state = self.begin("clear_org_policy").await?;
        let key = (resource.to_string(), require_constraint(request.constraint.as_ref())?);
        if let Some(etag) = &request.etag {
            if *etag != state.current_org_policy_etag(&key) {
                return Err(error(409, "Org policy etag mismatch"));
            }
        }
        state.org_policies.remove(&key);
        Ok(())
    }

    async fn get_effective_org_policy(
        &self,
        resource: &str,
        request: wire::GetEffectiveOrgPolicyRequest,
    ) -> Result<wire::OrgPolicy> {
        let state = self.begin("get_effective_org_policy").await?;
        let constraint = require_constraint(request.constraint.as_ref())?;
        let key = (resource.to_string(), constraint.clone());
        Ok(match state.org_policies.get(&key) {
            Some(policy) => wire::OrgPolicy {
                etag: None,
                ..policy.clone()
            },
            None => wire::OrgPolicy {
                constraint: Some(constraint),
                ..wire::OrgPolicy::default()
            },
        })
    }

    async fn get_org_policy(
        &self,
        resource: &str,
        request: wire::GetOrgPolicyRequest,
    ) -> Result<wire::OrgPolicy> {
        let state = self.begin("get_org_policy").await?;
        let constraint = require_constraint(request.constraint.as_ref())?;
        let key = (resource.to_string(), constraint.clone());
        Ok(match state.org_policies.get(&key) {
            Some(policy) => policy.clone(),
            None => wire::OrgPolicy {
                constraint: Some(constraint),
                etag: Some(UNSET_ORG_POLICY_ETAG.to_string()),
                ..wire::OrgPolicy::default()
            },
        })
    }

    async fn list_available_org_policy_constraints(
        &self,
        _resource: &str,
        options: &RpcOptions,
    ) -> Result<RpcPage<wire::Constraint>> {
        let state = self.begin("list_available_org_policy_constraints").await?;
        Ok(paginate(&state.constraints, options))
    }

    async fn list_org_policies(
        &self,
        resource: &str,
        options: &RpcOptions,
    ) -> Result<RpcPage<wire::OrgPolicy>> {
        let state = self.begin("list_org_policies").await?;
        let policies: BTreeMap<String, wire::OrgPolicy> = state
            .org_policies
            .iter()
            .filter(|((owner, _), _)| owner == resource)
            .map(|((_, constraint), policy)| (constraint.clone(), policy.clone()))
            .collect();
        Ok(paginate(&policies, options))
    }

    async fn set_org_policy(
        &self,
        resource: &str,
        request: wire::SetOrgPolicyRequest,
    ) -> Result<wire::OrgPolicy> {
        let mut state = self.begin("set_org_policy").await?;
        let policy = request
            .policy
            .ok_or_else(|| error(400, "A policy is required"))?;
        let key = (resource.to_string(), require_constraint(policy.constraint.as_ref())?);

        if let Some(etag) = &policy.etag {
            if *etag != state.current_org_policy_etag(&key) {
                return Err(error(409, "Org policy etag mismatch"));
            }
        }

        let stored = wire::OrgPolicy {
            etag: Some(new_etag()),
            update_time: Some(now()),
            version: Some(policy.version.unwrap_or(1)),
            ..policy
        };
        state.org_policies.insert(key, stored.clone());
        Ok(stored)
    }

    async fn create_lien(&self, lien: wire::Lien) -> Result<wire::Lien> {
        let mut state = self.begin("create_lien").await?;
        match lien.parent.as_deref() {
            Some(parent) if !parent.is_empty() => {}
            _ => return Err(error(400, "A lien parent is required")),
        }

        let name = format!("liens/{}", Uuid::new_v4().simple());
        let stored = wire::Lien {
            name: Some(name.clone()),
            create_time: Some(now()),
            ..lien
        };
        state.liens.insert(name, stored.clone());
        Ok(stored)
    }

    async fn get_lien(&self, name: &str) -> Result<Option<wire::Lien>> {
        let state = self.begin("get_lien").await?;
        Ok(state.liens.get(name).cloned())
    }

    async fn delete_lien(&self, name: &str) -> Result<()> {
        let mut state = self.begin("delete_lien").await?;
        match state.liens.remove(name) {
            Some(_) => Ok(()),
            None => Err(error(404, format!("Lien {name} not found."))),
        }
    }

    async fn list_liens(&self, parent: &str, options: &RpcOptions) -> Result<RpcPage<wire::Lien>> {
        let state = self.begin("list_liens").await?;
        let liens: BTreeMap<String, wire::Lien> = state
            .liens
            .iter()
            .filter(|(_, lien)| lien.parent.as_deref() == Some(parent))
            .map(|(name, lien)| (name.clone(), lien.clone()))
            .collect();
        Ok(paginate(&liens, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::OptionValue;

    fn project(id: &str) -> wire::Project {
        wire::Project {
            project_id: Some(id.to_string()),
            ..wire::Project::default()
        }
    }

    #[test]
    fn test_parse_filter() {
        let terms = parse_filter("id:* name:myProject labels.color:blue LABELS.SIZE:*").unwrap();
        assert_eq!(
            terms,
            vec![
                FilterTerm::Id("*".into()),
                FilterTerm::Name("myProject".into()),
                FilterTerm::Label("color".into(), "blue".into()),
                FilterTerm::Label("size".into(), "*".into()),
            ]
        );
        assert_eq!(parse_filter("owner:me").unwrap_err().code(), Some(400));
        assert_eq!(parse_filter("bogus").unwrap_err().code(), Some(400));
    }

    #[test]
    fn test_project_selection_forms() {
        let get = project_selection("projectId,name,createTime");
        let list = project_selection("projects(projectId,name,labels),nextPageToken");
        assert!(get.contains("createTime"));
        assert!(list.contains("labels"));
        assert!(!list.contains("nextPageToken"));
    }

    #[test]
    fn test_paginate_uses_next_key_as_cursor() {
        let items: BTreeMap<String, u32> = [("a", 1), ("b", 2), ("c", 3)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let mut options = RpcOptions::new();
        options.insert(RpcOption::PageSize, OptionValue::Int(2));

        let (next, page) = paginate(&items, &options);
        assert_eq!(page, vec![1, 2]);
        assert_eq!(next.as_deref(), Some("c"));

        let (next, page) = paginate(&items, &options.with_page_token("c"));
        assert_eq!(page, vec![3]);
        assert_eq!(next, None);
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let local = LocalResourceManager::new();
        local
            .inject_failure("create", ResourceManagerError::from_status(503, "unavailable"))
            .await;

        let err = local.create(project("p1")).await.unwrap_err();
        assert_eq!(err.code(), Some(503));
        assert!(local.create(project("p1")).await.is_ok());
        assert_eq!(local.call_count("create").await, 2);
        assert_eq!(local.call_count("delete").await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let local = LocalResourceManager::new();
        local.create(project("p1")).await.unwrap();
        let err = local.create(project("p1")).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(err.message().contains("(p1) already exists"));
    }

    #[tokio::test]
    async fn test_replace_keeps_server_fields() {
        let local = LocalResourceManager::new();
        let created = local.create(project("p1")).await.unwrap();

        let mut update = project("p1");
        update.name = Some("renamed".into());
        update.project_number = Some(987_654_321);
        update.lifecycle_state = Some("DELETE_REQUESTED".into());
        let replaced = local.replace(update).await.unwrap();

        assert_eq!(replaced.name.as_deref(), Some("renamed"));
        assert_eq!(replaced.project_number, created.project_number);
        assert_eq!(replaced.lifecycle_state.as_deref(), Some("ACTIVE"));
        assert_eq!(replaced.create_time, created.create_time);

        let err = local.replace(project("missing")).await.unwrap_err();
        assert!(err.message().contains("the project was not found"));
    }

    #[tokio::test]
    async fn test_undelete_requires_delete_requested() {
        let local = LocalResourceManager::new();
        local.create(project("p1")).await.unwrap();
        assert_eq!(local.undelete("p1").await.unwrap_err().code(), Some(400));

        local.delete("p1").await.unwrap();
        local.undelete("p1").await.unwrap();
        let stored = local.get("p1", &RpcOptions::new()).await.unwrap().unwrap();
        assert_eq!(stored.lifecycle_state.as_deref(), Some("ACTIVE"));
    }

    #[tokio::test]
    async fn test_list_fields_drop_unselected_token() {
        let local = LocalResourceManager::new();
        local.create(project("a")).await.unwrap();
        local.create(project("b")).await.unwrap();

        let mut options = RpcOptions::new();
        options
            .insert(RpcOption::PageSize, OptionValue::Int(1))
            .insert(RpcOption::Fields, OptionValue::Text("projects(projectId)".into()));
        let (next, page) = local.list(&options).await.unwrap();
        assert_eq!(page, vec![project("a")]);
        assert_eq!(next, None);
    }
}
