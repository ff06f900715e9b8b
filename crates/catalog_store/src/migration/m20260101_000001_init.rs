use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

use crate::db::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();

        manager
            .create_table(
                Table::create()
                    .table(CatalogUsers::Table)
                    .if_not_exists()
                    .col(id_col(backend, CatalogUsers::Id, false))
                    .col(ColumnDef::new(CatalogUsers::Username).string().not_null())
                    .col(ColumnDef::new(CatalogUsers::DisplayName).string())
                    .col(
                        ColumnDef::new(CatalogUsers::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_catalog_users")
                            .col(CatalogUsers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatalogPackages::Table)
                    .if_not_exists()
                    .col(id_col(backend, CatalogPackages::Id, false))
                    .col(ColumnDef::new(CatalogPackages::Name).string().not_null())
                    .col(ColumnDef::new(CatalogPackages::Title).string())
                    .col(ColumnDef::new(CatalogPackages::Description).text())
                    .col(ColumnDef::new(CatalogPackages::Version).string())
                    .col(
                        ColumnDef::new(CatalogPackages::Public)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(id_col(backend, CatalogPackages::OwnerId, true))
                    .col(
                        ColumnDef::new(CatalogPackages::SearchName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CatalogPackages::SearchTitle).string())
                    .col(
                        ColumnDef::new(CatalogPackages::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CatalogPackages::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_catalog_packages")
                            .col(CatalogPackages::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatalogWorlds::Table)
                    .if_not_exists()
                    .col(id_col(backend, CatalogWorlds::Id, false))
                    .col(id_col(backend, CatalogWorlds::PackageId, true))
                    .col(ColumnDef::new(CatalogWorlds::Name).string().not_null())
                    .col(ColumnDef::new(CatalogWorlds::Title).string())
                    .col(ColumnDef::new(CatalogWorlds::Description).text())
                    .col(ColumnDef::new(CatalogWorlds::Map).string())
                    .col(
                        ColumnDef::new(CatalogWorlds::Public)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(id_col(backend, CatalogWorlds::OwnerId, true))
                    .col(ColumnDef::new(CatalogWorlds::SearchName).string().not_null())
                    .col(ColumnDef::new(CatalogWorlds::SearchTitle).string())
                    .col(
                        ColumnDef::new(CatalogWorlds::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CatalogWorlds::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_catalog_worlds")
                            .col(CatalogWorlds::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatalogPortals::Table)
                    .if_not_exists()
                    .col(id_col(backend, CatalogPortals::Id, false))
                    .col(id_col(backend, CatalogPortals::WorldId, true))
                    .col(id_col(backend, CatalogPortals::DestinationId, true))
                    .col(ColumnDef::new(CatalogPortals::Name).string().not_null())
                    .col(ColumnDef::new(CatalogPortals::Title).string())
                    .col(ColumnDef::new(CatalogPortals::Description).text())
                    .col(
                        ColumnDef::new(CatalogPortals::Public)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(id_col(backend, CatalogPortals::OwnerId, true))
                    .col(
                        ColumnDef::new(CatalogPortals::SearchName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CatalogPortals::SearchTitle).string())
                    .col(
                        ColumnDef::new(CatalogPortals::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CatalogPortals::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_catalog_portals")
                            .col(CatalogPortals::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatalogServers::Table)
                    .if_not_exists()
                    .col(id_col(backend, CatalogServers::Id, false))
                    .col(id_col(backend, CatalogServers::WorldId, true))
                    .col(ColumnDef::new(CatalogServers::Name).string().not_null())
                    .col(ColumnDef::new(CatalogServers::Title).string())
                    .col(ColumnDef::new(CatalogServers::Description).text())
                    .col(ColumnDef::new(CatalogServers::Host).string())
                    .col(ColumnDef::new(CatalogServers::Port).big_integer())
                    .col(ColumnDef::new(CatalogServers::Region).string())
                    .col(
                        ColumnDef::new(CatalogServers::Public)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(id_col(backend, CatalogServers::OwnerId, true))
                    .col(
                        ColumnDef::new(CatalogServers::SearchName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CatalogServers::SearchTitle).string())
                    .col(
                        ColumnDef::new(CatalogServers::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CatalogServers::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_catalog_servers")
                            .col(CatalogServers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatalogFiles::Table)
                    .if_not_exists()
                    .col(id_col(backend, CatalogFiles::Id, false))
                    .col(ColumnDef::new(CatalogFiles::EntityKind).string().not_null())
                    .col(id_col(backend, CatalogFiles::EntityId, false))
                    .col(ColumnDef::new(CatalogFiles::FileType).string())
                    .col(ColumnDef::new(CatalogFiles::MimeType).string())
                    .col(ColumnDef::new(CatalogFiles::Size).big_integer())
                    .col(ColumnDef::new(CatalogFiles::Url).text())
                    .col(ColumnDef::new(CatalogFiles::OriginalPath).text())
                    .col(ColumnDef::new(CatalogFiles::Hash).string())
                    .col(ColumnDef::new(CatalogFiles::Platform).string())
                    .col(ColumnDef::new(CatalogFiles::Deployment).string())
                    .col(ColumnDef::new(CatalogFiles::CreatedAt).big_integer())
                    .primary_key(
                        Index::create()
                            .name("pk_catalog_files")
                            .col(CatalogFiles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatalogGrants::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CatalogGrants::EntityKind).string().not_null())
                    .col(id_col(backend, CatalogGrants::EntityId, false))
                    .col(id_col(backend, CatalogGrants::PrincipalId, false))
                    .col(
                        ColumnDef::new(CatalogGrants::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_catalog_grants")
                            .col(CatalogGrants::EntityKind)
                            .col(CatalogGrants::EntityId)
                            .col(CatalogGrants::PrincipalId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatalogRatings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CatalogRatings::EntityKind).string().not_null())
                    .col(id_col(backend, CatalogRatings::EntityId, false))
                    .col(id_col(backend, CatalogRatings::PrincipalId, false))
                    .col(ColumnDef::new(CatalogRatings::Value).big_integer().not_null())
                    .col(
                        ColumnDef::new(CatalogRatings::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_catalog_ratings")
                            .col(CatalogRatings::EntityKind)
                            .col(CatalogRatings::EntityId)
                            .col(CatalogRatings::PrincipalId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatalogRatingTotals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatalogRatingTotals::EntityKind)
                            .string()
                            .not_null(),
                    )
                    .col(id_col(backend, CatalogRatingTotals::EntityId, false))
                    .col(
                        ColumnDef::new(CatalogRatingTotals::Positive)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CatalogRatingTotals::Negative)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_catalog_rating_totals")
                            .col(CatalogRatingTotals::EntityKind)
                            .col(CatalogRatingTotals::EntityId),
                    )
                    .to_owned(),
            )
            .await?;

        create_indexes(manager).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_table(manager, CatalogRatingTotals::Table).await?;
        drop_table(manager, CatalogRatings::Table).await?;
        drop_table(manager, CatalogGrants::Table).await?;
        drop_table(manager, CatalogFiles::Table).await?;
        drop_table(manager, CatalogServers::Table).await?;
        drop_table(manager, CatalogPortals::Table).await?;
        drop_table(manager, CatalogWorlds::Table).await?;
        drop_table(manager, CatalogPackages::Table).await?;
        drop_table(manager, CatalogUsers::Table).await?;
        Ok(())
    }
}

async fn create_indexes(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    manager
        .create_index(
            Index::create()
                .name("catalog_users_username_idx")
                .table(CatalogUsers::Table)
                .col(CatalogUsers::Username)
                .unique()
                .to_owned(),
        )
        .await?;

    // Listing sort orders: newest first and by name, both tied on id.
    manager
        .create_index(
            Index::create()
                .name("catalog_packages_created_idx")
                .table(CatalogPackages::Table)
                .col(CatalogPackages::CreatedAt)
                .col(CatalogPackages::Id)
                .to_owned(),
        )
        .await?;
    manager
        .create_index(
            Index::create()
                .name("catalog_packages_name_idx")
                .table(CatalogPackages::Table)
                .col(CatalogPackages::Name)
                .col(CatalogPackages::Id)
                .to_owned(),
        )
        .await?;
    manager
        .create_index(
            Index::create()
                .name("catalog_packages_owner_idx")
                .table(CatalogPackages::Table)
                .col(CatalogPackages::OwnerId)
                .to_owned(),
        )
        .await?;

    manager
        .create_index(
            Index::create()
                .name("catalog_worlds_created_idx")
                .table(CatalogWorlds::Table)
                .col(CatalogWorlds::CreatedAt)
                .col(CatalogWorlds::Id)
                .to_owned(),
        )
        .await?;
    manager
        .create_index(
            Index::create()
                .name("catalog_worlds_package_idx")
                .table(CatalogWorlds::Table)
                .col(CatalogWorlds::PackageId)
                .to_owned(),
        )
        .await?;

    manager
        .create_index(
            Index::create()
                .name("catalog_portals_created_idx")
                .table(CatalogPortals::Table)
                .col(CatalogPortals::CreatedAt)
                .col(CatalogPortals::Id)
                .to_owned(),
        )
        .await?;
    manager
        .create_index(
            Index::create()
                .name("catalog_portals_world_idx")
                .table(CatalogPortals::Table)
                .col(CatalogPortals::WorldId)
                .to_owned(),
        )
        .await?;
    manager
        .create_index(
            Index::create()
                .name("catalog_portals_destination_idx")
                .table(CatalogPortals::Table)
                .col(CatalogPortals::DestinationId)
                .to_owned(),
        )
        .await?;

    manager
        .create_index(
            Index::create()
                .name("catalog_servers_created_idx")
                .table(CatalogServers::Table)
                .col(CatalogServers::CreatedAt)
                .col(CatalogServers::Id)
                .to_owned(),
        )
        .await?;
    manager
        .create_index(
            Index::create()
                .name("catalog_servers_world_idx")
                .table(CatalogServers::Table)
                .col(CatalogServers::WorldId)
                .to_owned(),
        )
        .await?;

    manager
        .create_index(
            Index::create()
                .name("catalog_files_entity_idx")
                .table(CatalogFiles::Table)
                .col(CatalogFiles::EntityKind)
                .col(CatalogFiles::EntityId)
                .to_owned(),
        )
        .await?;
    manager
        .create_index(
            Index::create()
                .name("catalog_grants_principal_idx")
                .table(CatalogGrants::Table)
                .col(CatalogGrants::PrincipalId)
                .to_owned(),
        )
        .await?;
    Ok(())
}

async fn drop_table<T: Iden + 'static>(manager: &SchemaManager<'_>, table: T) -> Result<(), DbErr> {
    manager
        .drop_table(Table::drop().table(table).if_exists().to_owned())
        .await
}

fn id_col(backend: DatabaseBackend, col: impl Iden, nullable: bool) -> ColumnDef {
    let mut col_def = ColumnDef::new(col);
    match backend {
        DatabaseBackend::Postgres => {
            col_def.uuid();
        }
        DatabaseBackend::MySql => {
            col_def.binary_len(16);
        }
        _ => {
            col_def.string_len(36);
        }
    }
    if nullable {
        col_def.null();
    } else {
        col_def.not_null();
    }
    col_def.to_owned()
}
