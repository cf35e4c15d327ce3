//! Lien entity.

use std::ops::Deref;

use crate::client::ResourceManager;
use crate::error::{ResourceManagerError, Result};
use crate::rpc::wire;

/// Immutable description of a lien.
///
/// The parent is fixed at construction; the name and create time are assigned
/// by the service when the lien is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LienInfo {
    name: Option<String>,
    parent: String,
    reason: Option<String>,
    origin: Option<String>,
    restrictions: Vec<String>,
    create_time: Option<String>,
}

impl LienInfo {
    /// Builder for a lien on `parent` (e.g. `projects/1234`).
    pub fn builder(parent: impl Into<String>) -> LienInfoBuilder {
        LienInfoBuilder {
            parent: parent.into(),
            ..LienInfoBuilder::default()
        }
    }

    pub fn to_builder(&self) -> LienInfoBuilder {
        LienInfoBuilder {
            name: self.name.clone(),
            parent: self.parent.clone(),
            reason: self.reason.clone(),
            origin: self.origin.clone(),
            restrictions: self.restrictions.clone(),
            create_time: self.create_time.clone(),
        }
    }

    /// Server-assigned name such as `liens/1234abcd`.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Permissions blocked by this lien, in the order supplied.
    pub fn restrictions(&self) -> &[String] {
        &self.restrictions
    }

    /// RFC 3339 creation timestamp.
    pub fn create_time(&self) -> Option<&str> {
        self.create_time.as_deref()
    }

    pub fn from_wire(dto: wire::Lien) -> Self {
        Self {
            name: dto.name,
            parent: dto.parent.unwrap_or_default(),
            reason: dto.reason,
            origin: dto.origin,
            restrictions: dto.restrictions.unwrap_or_default(),
            create_time: dto.create_time,
        }
    }

    pub fn to_wire(&self) -> wire::Lien {
        wire::Lien {
            name: self.name.clone(),
            parent: Some(self.parent.clone()),
            restrictions: (!self.restrictions.is_empty()).then(|| self.restrictions.clone()),
            reason: self.reason.clone(),
            origin: self.origin.clone(),
            create_time: self.create_time.clone(),
        }
    }
}

/// Mutable staging area for a [`LienInfo`].
#[derive(Debug, Clone, Default)]
pub struct LienInfoBuilder {
    name: Option<String>,
    parent: String,
    reason: Option<String>,
    origin: Option<String>,
    restrictions: Vec<String>,
    create_time: Option<String>,
}

impl LienInfoBuilder {
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn parent(&mut self, parent: impl Into<String>) -> &mut Self {
        self.parent = parent.into();
        self
    }

    pub fn reason(&mut self, reason: impl Into<String>) -> &mut Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn origin(&mut self, origin: impl Into<String>) -> &mut Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn restrictions<I, S>(&mut self, restrictions: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restrictions = restrictions.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_restriction(&mut self, restriction: impl Into<String>) -> &mut Self {
        self.restrictions.push(restriction.into());
        self
    }

    pub fn create_time(&mut self, create_time: impl Into<String>) -> &mut Self {
        self.create_time = Some(create_time.into());
        self
    }

    pub fn build(&self) -> LienInfo {
        LienInfo {
            name: self.name.clone(),
            parent: self.parent.clone(),
            reason: self.reason.clone(),
            origin: self.origin.clone(),
            restrictions: self.restrictions.clone(),
            create_time: self.create_time.clone(),
        }
    }
}

/// A lien returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lien {
    info: LienInfo,
}

impl Lien {
    pub(crate) fn new(info: LienInfo) -> Self {
        Self { info }
    }

    pub fn info(&self) -> &LienInfo {
        &self.info
    }

    pub fn into_info(self) -> LienInfo {
        self.info
    }

    /// Fetch the latest state. `None` if the lien is gone.
    pub async fn reload(&self, client: &ResourceManager) -> Result<Option<Lien>> {
        match self.name() {
            Some(name) => client.get_lien(name).await,
            None => Ok(None),
        }
    }

    /// Remove this lien. A lien without a name was never created and is treated as not found.
    pub async fn delete(&self, client: &ResourceManager) -> Result<()> {
        let Some(name) = self.name() else {
            return Err(ResourceManagerError::NotFound {
                message: "Lien has no name.".to_string(),
            });
        };
        client.delete_lien(name).await
    }
}

impl Deref for Lien {
    type Target = LienInfo;

    fn deref(&self) -> &Self::Target {
        &self.info
    }
}
