use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    Audience, CatalogError, CatalogResult, EntityKind, Id, Package, Page, Portal, Server, World,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Scope {
    Package(Id),
    World(Id),
    Owner(Id),
}

impl Scope {
    /// Root column the scope filters on.
    pub fn column(&self) -> &'static str {
        match self {
            Scope::Package(_) => "package_id",
            Scope::World(_) => "world_id",
            Scope::Owner(_) => "owner_id",
        }
    }

    pub fn id(&self) -> Id {
        match self {
            Scope::Package(id) | Scope::World(id) | Scope::Owner(id) => *id,
        }
    }

    pub fn applies_to(&self, kind: EntityKind) -> bool {
        match self {
            Scope::Owner(_) => true,
            Scope::Package(_) => kind == EntityKind::World,
            Scope::World(_) => matches!(kind, EntityKind::Portal | EntityKind::Server),
        }
    }
}

/// Restricts which file variants are joined. Files whose platform or
/// deployment is null match any selector.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSelector {
    pub platform: Option<String>,
    pub deployment: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Newest,
    Name,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListInput {
    pub audience: Audience,
    pub query: Option<String>,
    pub scope: Option<Scope>,
    pub files: FileSelector,
    pub sort: SortKey,
    pub offset: u32,
    pub limit: u32,
}

impl ListInput {
    pub fn new(audience: Audience, offset: u32, limit: u32) -> Self {
        Self {
            audience,
            offset,
            limit,
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_files(mut self, files: FileSelector) -> Self {
        self.files = files;
        self
    }

    /// Rejects scopes the root kind has no column for and oversized queries.
    pub fn validate(&self, kind: EntityKind, max_query_len: usize) -> CatalogResult<()> {
        if let Some(scope) = &self.scope
            && !scope.applies_to(kind)
        {
            return Err(CatalogError::invalid(format!(
                "scope {scope:?} does not apply to {} listings",
                kind.as_str()
            )));
        }
        if let Some(query) = &self.query
            && query.chars().count() > max_query_len
        {
            return Err(CatalogError::invalid("search query too long"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetInput {
    pub audience: Audience,
    pub id: Id,
    pub files: FileSelector,
}

impl GetInput {
    pub fn new(audience: Audience, id: Id) -> Self {
        Self {
            audience,
            id,
            files: FileSelector::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPackage {
    pub owner_id: Option<Id>,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub public: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorld {
    pub package_id: Option<Id>,
    pub owner_id: Option<Id>,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub map: Option<String>,
    pub public: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPortal {
    pub world_id: Option<Id>,
    pub destination_id: Option<Id>,
    pub owner_id: Option<Id>,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub public: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewServer {
    pub world_id: Option<Id>,
    pub owner_id: Option<Id>,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub region: Option<String>,
    pub public: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFile {
    pub file_type: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
    pub url: Option<String>,
    pub original_path: Option<String>,
    pub hash: Option<String>,
    pub platform: Option<String>,
    pub deployment: Option<String>,
}

#[async_trait]
pub trait CatalogReadApi {
    async fn list_packages(&self, input: ListInput) -> CatalogResult<Page<Package>>;
    async fn list_worlds(&self, input: ListInput) -> CatalogResult<Page<World>>;
    async fn list_portals(&self, input: ListInput) -> CatalogResult<Page<Portal>>;
    async fn list_servers(&self, input: ListInput) -> CatalogResult<Page<Server>>;

    async fn count_packages(&self, input: &ListInput) -> CatalogResult<u64>;
    async fn count_worlds(&self, input: &ListInput) -> CatalogResult<u64>;
    async fn count_portals(&self, input: &ListInput) -> CatalogResult<u64>;
    async fn count_servers(&self, input: &ListInput) -> CatalogResult<u64>;

    async fn get_package(&self, input: GetInput) -> CatalogResult<Package>;
    async fn get_world(&self, input: GetInput) -> CatalogResult<World>;
    async fn get_portal(&self, input: GetInput) -> CatalogResult<Portal>;
    async fn get_server(&self, input: GetInput) -> CatalogResult<Server>;
}

#[async_trait]
pub trait CatalogWriteApi {
    async fn create_user(&self, input: NewUser) -> CatalogResult<Id>;
    async fn create_package(&self, input: NewPackage) -> CatalogResult<Id>;
    async fn create_world(&self, input: NewWorld) -> CatalogResult<Id>;
    async fn create_portal(&self, input: NewPortal) -> CatalogResult<Id>;
    async fn create_server(&self, input: NewServer) -> CatalogResult<Id>;
    async fn add_file(&self, kind: EntityKind, entity_id: Id, input: NewFile) -> CatalogResult<Id>;
    /// `value` is -1 or 1; 0 removes the principal's vote.
    async fn rate(
        &self,
        kind: EntityKind,
        entity_id: Id,
        principal: Id,
        value: i64,
    ) -> CatalogResult<()>;
    async fn grant_view(&self, kind: EntityKind, entity_id: Id, principal: Id)
    -> CatalogResult<()>;
    async fn revoke_view(
        &self,
        kind: EntityKind,
        entity_id: Id,
        principal: Id,
    ) -> CatalogResult<()>;
    async fn set_public(&self, kind: EntityKind, entity_id: Id, public: bool)
    -> CatalogResult<()>;
    async fn delete_entity(&self, kind: EntityKind, entity_id: Id) -> CatalogResult<()>;
}
