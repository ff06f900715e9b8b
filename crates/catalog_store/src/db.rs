use sea_orm::sea_query;
use sea_orm::sea_query::Alias;
use sea_orm_migration::prelude::Iden;

use aideon_catalog_core::EntityKind;

#[derive(Iden, Clone, Copy)]
pub enum CatalogUsers {
    Table,
    Id,
    Username,
    DisplayName,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum CatalogPackages {
    Table,
    Id,
    Name,
    Title,
    Description,
    Version,
    Public,
    OwnerId,
    SearchName,
    SearchTitle,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum CatalogWorlds {
    Table,
    Id,
    PackageId,
    Name,
    Title,
    Description,
    Map,
    Public,
    OwnerId,
    SearchName,
    SearchTitle,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum CatalogPortals {
    Table,
    Id,
    WorldId,
    DestinationId,
    Name,
    Title,
    Description,
    Public,
    OwnerId,
    SearchName,
    SearchTitle,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum CatalogServers {
    Table,
    Id,
    WorldId,
    Name,
    Title,
    Description,
    Host,
    Port,
    Region,
    Public,
    OwnerId,
    SearchName,
    SearchTitle,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum CatalogFiles {
    Table,
    Id,
    EntityKind,
    EntityId,
    FileType,
    MimeType,
    Size,
    Url,
    OriginalPath,
    Hash,
    Platform,
    Deployment,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum CatalogGrants {
    Table,
    EntityKind,
    EntityId,
    PrincipalId,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum CatalogRatings {
    Table,
    EntityKind,
    EntityId,
    PrincipalId,
    Value,
    UpdatedAt,
}

/// Per-entity vote sums, maintained by every rating write.
#[derive(Iden, Clone, Copy)]
pub enum CatalogRatingTotals {
    Table,
    EntityKind,
    EntityId,
    Positive,
    Negative,
}

pub fn col_name(column: impl sea_query::Iden) -> String {
    column.to_string()
}

/// Table holding rows of one entity kind.
pub fn entity_table(kind: EntityKind) -> Alias {
    let name = match kind {
        EntityKind::Package => col_name(CatalogPackages::Table),
        EntityKind::World => col_name(CatalogWorlds::Table),
        EntityKind::Portal => col_name(CatalogPortals::Table),
        EntityKind::Server => col_name(CatalogServers::Table),
    };
    Alias::new(name)
}
