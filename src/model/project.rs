//! Project entity.

use std::collections::BTreeMap;
use std::ops::Deref;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::client::ResourceManager;
use crate::error::Result;
use crate::model::iam::Policy;
use crate::rpc::wire;

/// Lifecycle state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectState {
    /// Unknown or unrecognized state.
    Unspecified,
    Active,
    /// Deletion requested; the project can still be undeleted.
    DeleteRequested,
    DeleteInProgress,
}

impl ProjectState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "LIFECYCLE_STATE_UNSPECIFIED",
            Self::Active => "ACTIVE",
            Self::DeleteRequested => "DELETE_REQUESTED",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
        }
    }

    pub fn from_wire(value: &str) -> Self {
        match value {
            "ACTIVE" => Self::Active,
            "DELETE_REQUESTED" => Self::DeleteRequested,
            "DELETE_IN_PROGRESS" => Self::DeleteInProgress,
            _ => Self::Unspecified,
        }
    }
}

/// Reference to a parent resource (`organization`, `folder`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    kind: String,
    id: String,
}

impl ResourceId {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn from_wire(dto: wire::ResourceId) -> Self {
        Self {
            kind: dto.kind.unwrap_or_default(),
            id: dto.id.unwrap_or_default(),
        }
    }

    pub fn to_wire(&self) -> wire::ResourceId {
        wire::ResourceId {
            kind: Some(self.kind.clone()),
            id: Some(self.id.clone()),
        }
    }
}

/// Immutable description of a project.
///
/// `project_number`, `state` and `create_time_millis` are assigned by the
/// service and are never sent on create.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectInfo {
    project_id: String,
    name: Option<String>,
    labels: BTreeMap<String, String>,
    project_number: Option<i64>,
    state: Option<ProjectState>,
    create_time_millis: Option<i64>,
    parent: Option<ResourceId>,
}

impl ProjectInfo {
    pub fn builder(project_id: impl Into<String>) -> ProjectInfoBuilder {
        ProjectInfoBuilder {
            project_id: project_id.into(),
            ..ProjectInfoBuilder::default()
        }
    }

    pub fn to_builder(&self) -> ProjectInfoBuilder {
        ProjectInfoBuilder {
            project_id: self.project_id.clone(),
            name: self.name.clone(),
            labels: self.labels.clone(),
            project_number: self.project_number,
            state: self.state,
            create_time_millis: self.create_time_millis,
            parent: self.parent.clone(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// User-assigned display name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn project_number(&self) -> Option<i64> {
        self.project_number
    }

    pub fn state(&self) -> Option<ProjectState> {
        self.state
    }

    /// Creation time in milliseconds since the epoch.
    pub fn create_time_millis(&self) -> Option<i64> {
        self.create_time_millis
    }

    pub fn parent(&self) -> Option<&ResourceId> {
        self.parent.as_ref()
    }

    pub fn from_wire(dto: wire::Project) -> Self {
        let create_time_millis = dto.create_time.as_deref().and_then(|raw| {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(time) => Some(time.timestamp_millis()),
                Err(e) => {
                    tracing::warn!(create_time = %raw, error = %e, "Ignoring unparseable project create time");
                    None
                }
            }
        });

        Self {
            project_id: dto.project_id.unwrap_or_default(),
            name: dto.name,
            labels: dto.labels.unwrap_or_default(),
            project_number: dto.project_number,
            state: dto.lifecycle_state.as_deref().map(ProjectState::from_wire),
            create_time_millis,
            parent: dto.parent.map(ResourceId::from_wire),
        }
    }

    pub fn to_wire(&self) -> wire::Project {
        wire::Project {
            project_id: Some(self.project_id.clone()),
            name: self.name.clone(),
            labels: (!self.labels.is_empty()).then(|| self.labels.clone()),
            project_number: self.project_number,
            lifecycle_state: self.state.map(|state| state.as_str().to_string()),
            create_time: self
                .create_time_millis
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|time| time.to_rfc3339_opts(SecondsFormat::Millis, true)),
            parent: self.parent.as_ref().map(ResourceId::to_wire),
        }
    }

    /// Wire message for create and replace: server-assigned fields stripped.
    pub fn to_request_wire(&self) -> wire::Project {
        wire::Project {
            project_number: None,
            lifecycle_state: None,
            create_time: None,
            ..self.to_wire()
        }
    }
}

/// Mutable staging area for a [`ProjectInfo`].
#[derive(Debug, Clone, Default)]
pub struct ProjectInfoBuilder {
    project_id: String,
    name: Option<String>,
    labels: BTreeMap<String, String>,
    project_number: Option<i64>,
    state: Option<ProjectState>,
    create_time_millis: Option<i64>,
    parent: Option<ResourceId>,
}

impl ProjectInfoBuilder {
    pub fn project_id(&mut self, project_id: impl Into<String>) -> &mut Self {
        self.project_id = project_id.into();
        self
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn clear_name(&mut self) -> &mut Self {
        self.name = None;
        self
    }

    /// Replace all labels.
    pub fn labels<I, K, V>(&mut self, labels: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.labels = labels
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn add_label(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn remove_label(&mut self, key: &str) -> &mut Self {
        self.labels.remove(key);
        self
    }

    pub fn clear_labels(&mut self) -> &mut Self {
        self.labels.clear();
        self
    }

    pub fn project_number(&mut self, project_number: i64) -> &mut Self {
        self.project_number = Some(project_number);
        self
    }

    pub fn state(&mut self, state: ProjectState) -> &mut Self {
        self.state = Some(state);
        self
    }

    pub fn create_time_millis(&mut self, millis: i64) -> &mut Self {
        self.create_time_millis = Some(millis);
        self
    }

    pub fn parent(&mut self, parent: ResourceId) -> &mut Self {
        self.parent = Some(parent);
        self
    }

    pub fn clear_parent(&mut self) -> &mut Self {
        self.parent = None;
        self
    }

    /// Snapshot the current state. The builder stays usable.
    pub fn build(&self) -> ProjectInfo {
        ProjectInfo {
            project_id: self.project_id.clone(),
            name: self.name.clone(),
            labels: self.labels.clone(),
            project_number: self.project_number,
            state: self.state,
            create_time_millis: self.create_time_millis,
            parent: self.parent.clone(),
        }
    }
}

/// A project returned by the service.
///
/// Operations on the project itself take the client explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    info: ProjectInfo,
}

impl Project {
    pub(crate) fn new(info: ProjectInfo) -> Self {
        Self { info }
    }

    pub fn info(&self) -> &ProjectInfo {
        &self.info
    }

    pub fn into_info(self) -> ProjectInfo {
        self.info
    }

    /// Fetch the latest state. `None` if the project no longer exists.
    pub async fn reload(&self, client: &ResourceManager) -> Result<Option<Project>> {
        client.get(self.project_id(), &[]).await
    }

    pub async fn delete(&self, client: &ResourceManager) -> Result<()> {
        client.delete(self.project_id()).await
    }

    pub async fn undelete(&self, client: &ResourceManager) -> Result<()> {
        client.undelete(self.project_id()).await
    }

    /// Send this project's mutable attributes to the service.
    pub async fn replace(&self, client: &ResourceManager) -> Result<Project> {
        client.replace(&self.info).await
    }

    pub async fn get_policy(&self, client: &ResourceManager) -> Result<Option<Policy>> {
        client.get_policy(self.project_id()).await
    }

    pub async fn replace_policy(&self, client: &ResourceManager, policy: &Policy) -> Result<Policy> {
        client.replace_policy(self.project_id(), policy).await
    }

    pub async fn test_permissions(
        &self,
        client: &ResourceManager,
        permissions: &[String],
    ) -> Result<Vec<bool>> {
        client.test_permissions(self.project_id(), permissions).await
    }
}

impl Deref for Project {
    type Target = ProjectInfo;

    fn deref(&self) -> &Self::Target {
        &self.info
    }
}

impl From<Project> for ProjectInfo {
    fn from(project: Project) -> Self {
        project.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_project() -> ProjectInfo {
        ProjectInfo::builder("complete-project")
            .name("name")
            .add_label("k1", "v1")
            .project_number(123)
            .state(ProjectState::Active)
            .create_time_millis(1_412_262_083_045)
            .parent(ResourceId::new("organization", "id"))
            .build()
    }

    #[test]
    fn test_builder() {
        let project = complete_project();
        assert_eq!(project.project_id(), "complete-project");
        assert_eq!(project.name(), Some("name"));
        assert_eq!(project.labels().get("k1").map(String::as_str), Some("v1"));
        assert_eq!(project.project_number(), Some(123));
        assert_eq!(project.state(), Some(ProjectState::Active));
        assert_eq!(project.create_time_millis(), Some(1_412_262_083_045));
        assert_eq!(project.parent().map(ResourceId::kind), Some("organization"));

        let partial = ProjectInfo::builder("partial-project").build();
        assert_eq!(partial.name(), None);
        assert!(partial.labels().is_empty());
        assert_eq!(partial.parent(), None);
    }

    #[test]
    fn test_builder_independence() {
        let mut builder = ProjectInfo::builder("p1");
        builder.add_label("color", "blue");
        let first = builder.build();

        builder.add_label("size", "big").name("changed");
        let second = builder.build();

        assert_eq!(first.labels().len(), 1);
        assert_eq!(first.name(), None);
        assert_eq!(second.labels().len(), 2);
        assert_ne!(first, second);
    }

    #[test]
    fn test_to_builder() {
        let project = complete_project();
        let renamed = project.to_builder().name("other").clear_parent().build();
        assert_eq!(renamed.name(), Some("other"));
        assert_eq!(renamed.parent(), None);
        assert_eq!(renamed.project_number(), project.project_number());
        assert_eq!(project.to_builder().build(), project);
    }

    #[test]
    fn test_wire_round_trip() {
        let complete = complete_project();
        assert_eq!(ProjectInfo::from_wire(complete.to_wire()), complete);

        let partial = ProjectInfo::builder("partial-project").build();
        assert_eq!(ProjectInfo::from_wire(partial.to_wire()), partial);
    }

    #[test]
    fn test_wire_create_time_format() {
        let wire = complete_project().to_wire();
        assert_eq!(wire.create_time.as_deref(), Some("2014-10-02T15:01:23.045Z"));
        assert_eq!(wire.project_number, Some(123));
        assert_eq!(wire.lifecycle_state.as_deref(), Some("ACTIVE"));
    }

    #[test]
    fn test_request_wire_strips_server_fields() {
        let wire = complete_project().to_request_wire();
        assert_eq!(wire.project_number, None);
        assert_eq!(wire.create_time, None);
        assert_eq!(wire.lifecycle_state, None);
        assert_eq!(wire.name.as_deref(), Some("name"));
    }

    #[test]
    fn test_absent_wire_fields_stay_absent() {
        let info = ProjectInfo::from_wire(wire::Project {
            project_id: Some("p".into()),
            ..Default::default()
        });
        assert_eq!(info.state(), None);
        assert_eq!(info.project_number(), None);
        assert_eq!(info.create_time_millis(), None);
        assert_eq!(info.parent(), None);
    }

    #[test]
    fn test_unknown_state() {
        assert_eq!(ProjectState::from_wire("ARCHIVED"), ProjectState::Unspecified);
        assert_eq!(
            ProjectState::from_wire(ProjectState::DeleteRequested.as_str()),
            ProjectState::DeleteRequested
        );
    }
}
