//! Organization policy and constraint entities.

use crate::rpc::wire;

/// Whether a list policy allows or denies every value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AllValues {
    #[default]
    Unspecified,
    Allow,
    Deny,
}

impl AllValues {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "ALL_VALUES_UNSPECIFIED",
            Self::Allow => "ALLOW",
            Self::Deny => "DENY",
        }
    }

    fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("ALLOW") => Self::Allow,
            Some("DENY") => Self::Deny,
            _ => Self::Unspecified,
        }
    }

    fn to_wire(self) -> Option<String> {
        match self {
            Self::Unspecified => None,
            other => Some(other.as_str().to_string()),
        }
    }
}

/// Policy for a boolean constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BooleanPolicy {
    pub enforced: Option<bool>,
}

/// Policy for a list constraint.
///
/// When `all_values` is set the service requires both value lists to be empty;
/// that rule is enforced server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListPolicy {
    pub all_values: AllValues,
    pub allowed_values: Vec<String>,
    pub denied_values: Vec<String>,
    pub inherit_from_parent: Option<bool>,
    pub suggested_value: Option<String>,
}

impl ListPolicy {
    fn from_wire(dto: wire::ListPolicy) -> Self {
        Self {
            all_values: AllValues::from_wire(dto.all_values.as_deref()),
            allowed_values: dto.allowed_values.unwrap_or_default(),
            denied_values: dto.denied_values.unwrap_or_default(),
            inherit_from_parent: dto.inherit_from_parent,
            suggested_value: dto.suggested_value,
        }
    }

    fn to_wire(&self) -> wire::ListPolicy {
        wire::ListPolicy {
            all_values: self.all_values.to_wire(),
            allowed_values: non_empty(&self.allowed_values),
            denied_values: non_empty(&self.denied_values),
            inherit_from_parent: self.inherit_from_parent,
            suggested_value: self.suggested_value.clone(),
        }
    }
}

/// The two mutually exclusive policy shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrgPolicyKind {
    Boolean(BooleanPolicy),
    List(ListPolicy),
}

/// Organization policy attached to a resource for one constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrgPolicyInfo {
    constraint: String,
    policy: Option<OrgPolicyKind>,
    restore_default: bool,
    etag: Option<String>,
    update_time: Option<String>,
    version: Option<i32>,
}

impl OrgPolicyInfo {
    /// Builder for a policy on `constraint` (e.g. `constraints/compute.disableSerialPortAccess`).
    pub fn builder(constraint: impl Into<String>) -> OrgPolicyInfoBuilder {
        OrgPolicyInfoBuilder {
            constraint: constraint.into(),
            ..OrgPolicyInfoBuilder::default()
        }
    }

    pub fn to_builder(&self) -> OrgPolicyInfoBuilder {
        OrgPolicyInfoBuilder {
            constraint: self.constraint.clone(),
            policy: self.policy.clone(),
            restore_default: self.restore_default,
            etag: self.etag.clone(),
            update_time: self.update_time.clone(),
            version: self.version,
        }
    }

    pub fn constraint(&self) -> &str {
        &self.constraint
    }

    pub fn policy(&self) -> Option<&OrgPolicyKind> {
        self.policy.as_ref()
    }

    pub fn boolean_policy(&self) -> Option<&BooleanPolicy> {
        match &self.policy {
            Some(OrgPolicyKind::Boolean(policy)) => Some(policy),
            _ => None,
        }
    }

    pub fn list_policy(&self) -> Option<&ListPolicy> {
        match &self.policy {
            Some(OrgPolicyKind::List(policy)) => Some(policy),
            _ => None,
        }
    }

    /// True if this policy restores the constraint default, ignoring ancestors.
    pub fn restore_default(&self) -> bool {
        self.restore_default
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn update_time(&self) -> Option<&str> {
        self.update_time.as_deref()
    }

    pub fn version(&self) -> Option<i32> {
        self.version
    }

    pub fn from_wire(dto: wire::OrgPolicy) -> Self {
        let constraint = dto.constraint.unwrap_or_default();
        let policy = match (dto.boolean_policy, dto.list_policy) {
            (Some(boolean), list) => {
                if list.is_some() {
                    tracing::warn!(
                        constraint = %constraint,
                        "Org policy carries both boolean and list variants, keeping boolean"
                    );
                }
                Some(OrgPolicyKind::Boolean(BooleanPolicy {
                    enforced: boolean.enforced,
                }))
            }
            (None, Some(list)) => Some(OrgPolicyKind::List(ListPolicy::from_wire(list))),
            (None, None) => None,
        };

        Self {
            constraint,
            policy,
            restore_default: dto.restore_default.is_some(),
            etag: dto.etag,
            update_time: dto.update_time,
            version: dto.version,
        }
    }

    pub fn to_wire(&self) -> wire::OrgPolicy {
        let (boolean_policy, list_policy) = match &self.policy {
            Some(OrgPolicyKind::Boolean(policy)) => (
                Some(wire::BooleanPolicy {
                    enforced: policy.enforced,
                }),
                None,
            ),
            Some(OrgPolicyKind::List(policy)) => (None, Some(policy.to_wire())),
            None => (None, None),
        };

        wire::OrgPolicy {
            constraint: Some(self.constraint.clone()),
            boolean_policy,
            list_policy,
            restore_default: self.restore_default.then(wire::RestoreDefault::default),
            etag: self.etag.clone(),
            update_time: self.update_time.clone(),
            version: self.version,
        }
    }
}

/// Mutable staging area for an [`OrgPolicyInfo`].
#[derive(Debug, Clone, Default)]
pub struct OrgPolicyInfoBuilder {
    constraint: String,
    policy: Option<OrgPolicyKind>,
    restore_default: bool,
    etag: Option<String>,
    update_time: Option<String>,
    version: Option<i32>,
}

impl OrgPolicyInfoBuilder {
    pub fn constraint(&mut self, constraint: impl Into<String>) -> &mut Self {
        self.constraint = constraint.into();
        self
    }

    /// Replaces any list policy.
    pub fn boolean_policy(&mut self, enforced: bool) -> &mut Self {
        self.policy = Some(OrgPolicyKind::Boolean(BooleanPolicy {
            enforced: Some(enforced),
        }));
        self
    }

    /// Replaces any boolean policy.
    pub fn list_policy(&mut self, policy: ListPolicy) -> &mut Self {
        self.policy = Some(OrgPolicyKind::List(policy));
        self
    }

    pub fn clear_policy(&mut self) -> &mut Self {
        self.policy = None;
        self
    }

    pub fn restore_default(&mut self, restore_default: bool) -> &mut Self {
        self.restore_default = restore_default;
        self
    }

    pub fn etag(&mut self, etag: impl Into<String>) -> &mut Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn clear_etag(&mut self) -> &mut Self {
        self.etag = None;
        self
    }

    pub fn update_time(&mut self, update_time: impl Into<String>) -> &mut Self {
        self.update_time = Some(update_time.into());
        self
    }

    pub fn version(&mut self, version: i32) -> &mut Self {
        self.version = Some(version);
        self
    }

    pub fn build(&self) -> OrgPolicyInfo {
        OrgPolicyInfo {
            constraint: self.constraint.clone(),
            policy: self.policy.clone(),
            restore_default: self.restore_default,
            etag: self.etag.clone(),
            update_time: self.update_time.clone(),
            version: self.version,
        }
    }
}

/// Behavior of a constraint when no policy is set anywhere in the hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConstraintDefault {
    #[default]
    Unspecified,
    Allow,
    Deny,
}

impl ConstraintDefault {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "CONSTRAINT_DEFAULT_UNSPECIFIED",
            Self::Allow => "ALLOW",
            Self::Deny => "DENY",
        }
    }

    fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("ALLOW") => Self::Allow,
            Some("DENY") => Self::Deny,
            _ => Self::Unspecified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    Boolean,
    List { suggested_value: Option<String> },
}

/// A constraint that policies can be set on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstraintInfo {
    name: String,
    display_name: Option<String>,
    description: Option<String>,
    constraint_default: ConstraintDefault,
    constraint_type: Option<ConstraintType>,
    version: Option<i32>,
}

impl ConstraintInfo {
    pub fn builder(name: impl Into<String>) -> ConstraintInfoBuilder {
        ConstraintInfoBuilder {
            name: name.into(),
            ..ConstraintInfoBuilder::default()
        }
    }

    pub fn to_builder(&self) -> ConstraintInfoBuilder {
        ConstraintInfoBuilder {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            constraint_default: self.constraint_default,
            constraint_type: self.constraint_type.clone(),
            version: self.version,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn constraint_default(&self) -> ConstraintDefault {
        self.constraint_default
    }

    pub fn constraint_type(&self) -> Option<&ConstraintType> {
        self.constraint_type.as_ref()
    }

    pub fn version(&self) -> Option<i32> {
        self.version
    }

    pub fn from_wire(dto: wire::Constraint) -> Self {
        let constraint_type = match (dto.boolean_constraint, dto.list_constraint) {
            (Some(_), _) => Some(ConstraintType::Boolean),
            (None, Some(list)) => Some(ConstraintType::List {
                suggested_value: list.suggested_value,
            }),
            (None, None) => None,
        };

        Self {
            name: dto.name.unwrap_or_default(),
            display_name: dto.display_name,
            description: dto.description,
            constraint_default: ConstraintDefault::from_wire(dto.constraint_default.as_deref()),
            constraint_type,
            version: dto.version,
        }
    }

    pub fn to_wire(&self) -> wire::Constraint {
        let (boolean_constraint, list_constraint) = match &self.constraint_type {
            Some(ConstraintType::Boolean) => (Some(wire::BooleanConstraint::default()), None),
            Some(ConstraintType::List { suggested_value }) => (
                None,
                Some(wire::ListConstraint {
                    suggested_value: suggested_value.clone(),
                }),
            ),
            None => (None, None),
        };

        wire::Constraint {
            name: Some(self.name.clone()),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            constraint_default: match self.constraint_default {
                ConstraintDefault::Unspecified => None,
                other => Some(other.as_str().to_string()),
            },
            boolean_constraint,
            list_constraint,
            version: self.version,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstraintInfoBuilder {
    name: String,
    display_name: Option<String>,
    description: Option<String>,
    constraint_default: ConstraintDefault,
    constraint_type: Option<ConstraintType>,
    version: Option<i32>,
}

impl ConstraintInfoBuilder {
    pub fn display_name(&mut self, display_name: impl Into<String>) -> &mut Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn constraint_default(&mut self, constraint_default: ConstraintDefault) -> &mut Self {
        self.constraint_default = constraint_default;
        self
    }

    pub fn constraint_type(&mut self, constraint_type: ConstraintType) -> &mut Self {
        self.constraint_type = Some(constraint_type);
        self
    }

    pub fn version(&mut self, version: i32) -> &mut Self {
        self.version = Some(version);
        self
    }

    pub fn build(&self) -> ConstraintInfo {
        ConstraintInfo {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            constraint_default: self.constraint_default,
            constraint_type: self.constraint_type.clone(),
            version: self.version,
        }
    }
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}
