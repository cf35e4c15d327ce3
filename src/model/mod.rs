//! Domain entities.
//!
//! # Design Decisions
//! - Values are immutable; builders are mutable staging structs and `build(&self)`
//!   snapshots owned copies
//! - Every entity converts to and from its wire message; an absent wire field is
//!   an absent domain field
//! - `Project` and `Lien` act on themselves through an explicit `&ResourceManager`

pub mod iam;
pub mod lien;
pub mod org_policy;
pub mod project;

pub use iam::{Identity, Policy, PolicyBuilder, Role};
pub use lien::{Lien, LienInfo, LienInfoBuilder};
pub use org_policy::{
    AllValues, BooleanPolicy, ConstraintDefault, ConstraintInfo, ConstraintInfoBuilder,
    ConstraintType, ListPolicy, OrgPolicyInfo, OrgPolicyInfoBuilder, OrgPolicyKind,
};
pub use project::{Project, ProjectInfo, ProjectInfoBuilder, ProjectState, ResourceId};
