//! IAM policy: role → identity bindings guarded by an etag.
//!
//! Writes must carry the etag of the latest read of the same resource; the
//! service rejects stale etags with a conflict. A policy without an etag is
//! written unconditionally (last writer wins).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::rpc::wire;

/// A role name such as `roles/owner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Role(String);

impl Role {
    const PREFIX: &'static str = "roles/";

    /// Role from a full name, or a bare name that gets the `roles/` prefix.
    pub fn of(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.contains('/') {
            Self(name)
        } else {
            Self(format!("{}{name}", Self::PREFIX))
        }
    }

    pub fn owner() -> Self {
        Self::of("owner")
    }

    pub fn editor() -> Self {
        Self::of("editor")
    }

    pub fn viewer() -> Self {
        Self::of("viewer")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A member of a binding, encoded on the wire as `kind:value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    AllUsers,
    AllAuthenticatedUsers,
    User(String),
    ServiceAccount(String),
    Group(String),
    Domain(String),
    /// Member string with an unrecognized kind, kept verbatim.
    Other(String),
}

impl Identity {
    pub fn user(email: impl Into<String>) -> Self {
        Self::User(email.into())
    }

    pub fn service_account(email: impl Into<String>) -> Self {
        Self::ServiceAccount(email.into())
    }

    pub fn group(email: impl Into<String>) -> Self {
        Self::Group(email.into())
    }

    pub fn domain(domain: impl Into<String>) -> Self {
        Self::Domain(domain.into())
    }

    pub fn parse(member: &str) -> Self {
        match member.split_once(':') {
            None if member == "allUsers" => Self::AllUsers,
            None if member == "allAuthenticatedUsers" => Self::AllAuthenticatedUsers,
            Some(("user", value)) => Self::User(value.to_string()),
            Some(("serviceAccount", value)) => Self::ServiceAccount(value.to_string()),
            Some(("group", value)) => Self::Group(value.to_string()),
            Some(("domain", value)) => Self::Domain(value.to_string()),
            _ => Self::Other(member.to_string()),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllUsers => f.write_str("allUsers"),
            Self::AllAuthenticatedUsers => f.write_str("allAuthenticatedUsers"),
            Self::User(v) => write!(f, "user:{v}"),
            Self::ServiceAccount(v) => write!(f, "serviceAccount:{v}"),
            Self::Group(v) => write!(f, "group:{v}"),
            Self::Domain(v) => write!(f, "domain:{v}"),
            Self::Other(v) => f.write_str(v),
        }
    }
}

/// IAM policy of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Policy {
    bindings: BTreeMap<Role, BTreeSet<Identity>>,
    etag: Option<String>,
    version: Option<i32>,
}

impl Policy {
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    pub fn to_builder(&self) -> PolicyBuilder {
        PolicyBuilder {
            bindings: self.bindings.clone(),
            etag: self.etag.clone(),
            version: self.version,
        }
    }

    pub fn bindings(&self) -> &BTreeMap<Role, BTreeSet<Identity>> {
        &self.bindings
    }

    /// Concurrency token of the version this policy was read at.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn version(&self) -> Option<i32> {
        self.version
    }

    pub fn from_wire(dto: wire::Policy) -> Self {
        let mut bindings: BTreeMap<Role, BTreeSet<Identity>> = BTreeMap::new();
        for binding in dto.bindings.unwrap_or_default() {
            let Some(role) = binding.role else {
                continue;
            };
            bindings
                .entry(Role(role))
                .or_default()
                .extend(binding.members.unwrap_or_default().iter().map(|m| Identity::parse(m)));
        }

        Self {
            bindings,
            etag: dto.etag,
            version: dto.version,
        }
    }

    pub fn to_wire(&self) -> wire::Policy {
        let bindings = self
            .bindings
            .iter()
            .map(|(role, members)| wire::Binding {
                role: Some(role.to_string()),
                members: Some(members.iter().map(ToString::to_string).collect()),
            })
            .collect::<Vec<_>>();

        wire::Policy {
            bindings: (!bindings.is_empty()).then_some(bindings),
            etag: self.etag.clone(),
            version: self.version,
        }
    }
}

/// Mutable staging area for a [`Policy`].
#[derive(Debug, Clone, Default)]
pub struct PolicyBuilder {
    bindings: BTreeMap<Role, BTreeSet<Identity>>,
    etag: Option<String>,
    version: Option<i32>,
}

impl PolicyBuilder {
    pub fn add_identity(&mut self, role: Role, identity: Identity) -> &mut Self {
        self.bindings.entry(role).or_default().insert(identity);
        self
    }

    /// Remove one member; a role left without members is dropped.
    pub fn remove_identity(&mut self, role: &Role, identity: &Identity) -> &mut Self {
        if let Some(members) = self.bindings.get_mut(role) {
            members.remove(identity);
            if members.is_empty() {
                self.bindings.remove(role);
            }
        }
        self
    }

    pub fn remove_role(&mut self, role: &Role) -> &mut Self {
        self.bindings.remove(role);
        self
    }

    pub fn etag(&mut self, etag: impl Into<String>) -> &mut Self {
        self.etag = Some(etag.into());
        self
    }

    /// Drop the etag, turning the next write into an unconditional overwrite.
    pub fn clear_etag(&mut self) -> &mut Self {
        self.etag = None;
        self
    }

    pub fn version(&mut self, version: i32) -> &mut Self {
        self.version = Some(version);
        self
    }

    pub fn build(&self) -> Policy {
        Policy {
            bindings: self.bindings.clone(),
            etag: self.etag.clone(),
            version: self.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> Policy {
        Policy::builder()
            .add_identity(Role::owner(), Identity::user("me@gmail.com"))
            .add_identity(Role::editor(), Identity::service_account("sa@gmail.com"))
            .add_identity(Role::editor(), Identity::AllAuthenticatedUsers)
            .etag("etag-1")
            .version(1)
            .build()
    }

    #[test]
    fn test_identity_wire_strings() {
        for member in [
            "allUsers",
            "allAuthenticatedUsers",
            "user:me@gmail.com",
            "serviceAccount:sa@gmail.com",
            "group:team@example.com",
            "domain:example.com",
            "deleted:user:old@example.com",
        ] {
            assert_eq!(Identity::parse(member).to_string(), member);
        }
        assert_eq!(
            Identity::parse("deleted:user:old@example.com"),
            Identity::Other("deleted:user:old@example.com".into())
        );
    }

    #[test]
    fn test_role_prefix() {
        assert_eq!(Role::owner().as_str(), "roles/owner");
        assert_eq!(Role::of("roles/custom.admin").as_str(), "roles/custom.admin");
        assert_eq!(Role::of("organizations/1/roles/x").as_str(), "organizations/1/roles/x");
    }

    #[test]
    fn test_wire_round_trip() {
        let policy = policy();
        assert_eq!(Policy::from_wire(policy.to_wire()), policy);
        assert_eq!(Policy::from_wire(Policy::default().to_wire()), Policy::default());
    }

    #[test]
    fn test_wire_role_kept_verbatim() {
        let dto = wire::Policy {
            bindings: Some(vec![wire::Binding {
                role: Some("owner".into()),
                members: Some(vec!["user:a@x.com".into()]),
            }]),
            etag: Some("etag-1".into()),
            version: None,
        };
        let policy = Policy::from_wire(dto.clone());
        assert!(!policy.bindings().contains_key(&Role::owner()));
        assert_eq!(policy.to_wire(), dto);
    }

    #[test]
    fn test_duplicate_wire_roles_merge() {
        let dto = wire::Policy {
            bindings: Some(vec![
                wire::Binding {
                    role: Some("roles/owner".into()),
                    members: Some(vec!["user:a@x.com".into()]),
                },
                wire::Binding {
                    role: Some("roles/owner".into()),
                    members: Some(vec!["user:b@x.com".into()]),
                },
            ]),
            etag: None,
            version: None,
        };
        let policy = Policy::from_wire(dto);
        assert_eq!(policy.bindings()[&Role::owner()].len(), 2);
    }

    #[test]
    fn test_remove_identity_drops_empty_role() {
        let updated = policy()
            .to_builder()
            .remove_identity(&Role::owner(), &Identity::user("me@gmail.com"))
            .build();
        assert!(!updated.bindings().contains_key(&Role::owner()));
        assert_eq!(updated.bindings()[&Role::editor()].len(), 2);
        assert_eq!(updated.etag(), Some("etag-1"));
    }
}
