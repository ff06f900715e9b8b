use serde::{Deserialize, Serialize};

use crate::{CatalogError, CatalogResult, Id};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Package,
    World,
    Portal,
    Server,
}

const PACKAGE_COLUMNS: &[&str] = &[
    "id",
    "name",
    "title",
    "description",
    "version",
    "public",
    "owner_id",
    "created_at",
    "updated_at",
];

const WORLD_COLUMNS: &[&str] = &[
    "id",
    "package_id",
    "name",
    "title",
    "description",
    "map",
    "public",
    "owner_id",
    "created_at",
    "updated_at",
];

const PORTAL_COLUMNS: &[&str] = &[
    "id",
    "world_id",
    "destination_id",
    "name",
    "title",
    "description",
    "public",
    "owner_id",
    "created_at",
    "updated_at",
];

const SERVER_COLUMNS: &[&str] = &[
    "id",
    "world_id",
    "name",
    "title",
    "description",
    "host",
    "port",
    "region",
    "public",
    "owner_id",
    "created_at",
    "updated_at",
];

pub const FILE_COLUMNS: &[&str] = &[
    "id",
    "file_type",
    "mime_type",
    "size",
    "url",
    "original_path",
    "hash",
    "platform",
    "deployment",
    "created_at",
];

pub const OWNER_COLUMNS: &[&str] = &["id", "username", "display_name"];

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Package => "package",
            EntityKind::World => "world",
            EntityKind::Portal => "portal",
            EntityKind::Server => "server",
        }
    }

    pub fn parse(value: &str) -> CatalogResult<Self> {
        match value {
            "package" => Ok(EntityKind::Package),
            "world" => Ok(EntityKind::World),
            "portal" => Ok(EntityKind::Portal),
            "server" => Ok(EntityKind::Server),
            other => Err(CatalogError::invalid(format!("unknown entity kind '{other}'"))),
        }
    }

    /// Entity table columns a level selects, aliased `{prefix}_{column}`.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            EntityKind::Package => PACKAGE_COLUMNS,
            EntityKind::World => WORLD_COLUMNS,
            EntityKind::Portal => PORTAL_COLUMNS,
            EntityKind::Server => SERVER_COLUMNS,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub id: Id,
    pub file_type: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
    pub url: Option<String>,
    pub original_path: Option<String>,
    pub hash: Option<String>,
    pub platform: Option<String>,
    pub deployment: Option<String>,
    pub created_at: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: Id,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

impl Owner {
    pub fn id_only(id: Id) -> Self {
        Self {
            id,
            username: None,
            display_name: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub positive: i64,
    /// Sum of negative votes; zero or below.
    pub negative: i64,
    /// The requesting principal's own vote, if any.
    pub own: Option<i64>,
}

impl Rating {
    pub fn score(&self) -> i64 {
        self.positive + self.negative
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: Id,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub public: bool,
    pub owner: Option<Owner>,
    pub files: Vec<File>,
    pub rating: Rating,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub id: Id,
    pub package_id: Option<Id>,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub map: Option<String>,
    pub public: bool,
    pub owner: Option<Owner>,
    pub files: Vec<File>,
    pub rating: Rating,
    pub created_at: i64,
    pub updated_at: i64,
    pub package: Option<Box<Package>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    pub id: Id,
    pub world_id: Option<Id>,
    pub destination_id: Option<Id>,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub public: bool,
    pub owner: Option<Owner>,
    pub files: Vec<File>,
    pub rating: Rating,
    pub created_at: i64,
    pub updated_at: i64,
    pub destination: Option<Box<Portal>>,
    /// Set on destination portals: the world the destination lives in.
    pub world: Option<Box<World>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: Id,
    pub world_id: Option<Id>,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub region: Option<String>,
    pub public: bool,
    pub owner: Option<Owner>,
    pub files: Vec<File>,
    pub rating: Rating,
    pub created_at: i64,
    pub updated_at: i64,
    pub world: Option<Box<World>>,
}
