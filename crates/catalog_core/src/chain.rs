//! Chain shapes: which nested entities a root query joins, and how each
//! nested level is decoded.

use serde::{Deserialize, Serialize};

use crate::decode::{decode_group, flag, opt_i64, opt_id, opt_str, required_str};
use crate::{
    CatalogResult, EntityKind, File, Id, Owner, Package, Portal, Rating, RowView, Server, World,
};

/// Foreign key a nested level is reached through, read on the parent level.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Relation {
    Destination,
    World,
    Package,
}

impl Relation {
    pub fn foreign_key(self) -> &'static str {
        match self {
            Relation::Destination => "destination_id",
            Relation::World => "world_id",
            Relation::Package => "package_id",
        }
    }
}

/// What happens to a root when a nested link is present but not visible.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkPolicy {
    /// The root is excluded. Row and count queries push the same check down.
    Require,
    /// The nested entity and everything below it is dropped; the root stays.
    Prune,
}

#[derive(Clone, Copy, Debug)]
pub struct Level {
    pub prefix: &'static str,
    pub kind: EntityKind,
    pub via: Option<Relation>,
    pub files: bool,
    pub owner: bool,
    pub rating: bool,
    pub policy: LinkPolicy,
}

impl Level {
    const fn root(prefix: &'static str, kind: EntityKind) -> Self {
        Self {
            prefix,
            kind,
            via: None,
            files: true,
            owner: true,
            rating: true,
            policy: LinkPolicy::Require,
        }
    }

    const fn nested(
        prefix: &'static str,
        kind: EntityKind,
        via: Relation,
        policy: LinkPolicy,
    ) -> Self {
        Self {
            prefix,
            kind,
            via: Some(via),
            files: true,
            owner: false,
            rating: false,
            policy,
        }
    }

    pub fn column(&self, field: &str) -> String {
        format!("{}_{field}", self.prefix)
    }

    pub fn files_prefix(&self) -> String {
        format!("{}_f", self.prefix)
    }

    pub fn owner_prefix(&self) -> String {
        format!("{}_o", self.prefix)
    }
}

static PACKAGE_LEVELS: [Level; 1] = [Level::root("p", EntityKind::Package)];

static WORLD_PACKAGE_LEVELS: [Level; 2] = [
    Level::root("w", EntityKind::World),
    Level::nested("wp", EntityKind::Package, Relation::Package, LinkPolicy::Require),
];

static PORTAL_DESTINATION_LEVELS: [Level; 4] = [
    Level::root("p", EntityKind::Portal),
    Level::nested("d", EntityKind::Portal, Relation::Destination, LinkPolicy::Require),
    Level::nested("dw", EntityKind::World, Relation::World, LinkPolicy::Require),
    Level::nested("dwp", EntityKind::Package, Relation::Package, LinkPolicy::Require),
];

static SERVER_WORLD_LEVELS: [Level; 3] = [
    Level::root("s", EntityKind::Server),
    Level::nested("sw", EntityKind::World, Relation::World, LinkPolicy::Prune),
    Level::nested("swp", EntityKind::Package, Relation::Package, LinkPolicy::Prune),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ChainShape {
    /// Package roots, no nesting.
    Package,
    /// World -> Package.
    WorldPackage,
    /// Portal -> destination Portal -> World -> Package.
    PortalDestination,
    /// Server -> World -> Package; hidden worlds are pruned, not fatal.
    ServerWorld,
}

impl ChainShape {
    pub fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Package => ChainShape::Package,
            EntityKind::World => ChainShape::WorldPackage,
            EntityKind::Portal => ChainShape::PortalDestination,
            EntityKind::Server => ChainShape::ServerWorld,
        }
    }

    pub fn levels(self) -> &'static [Level] {
        match self {
            ChainShape::Package => &PACKAGE_LEVELS,
            ChainShape::WorldPackage => &WORLD_PACKAGE_LEVELS,
            ChainShape::PortalDestination => &PORTAL_DESTINATION_LEVELS,
            ChainShape::ServerWorld => &SERVER_WORLD_LEVELS,
        }
    }

    pub fn root(self) -> &'static Level {
        &self.levels()[0]
    }

    pub fn depth(self) -> usize {
        self.levels().len()
    }
}

/// Mutable handle to an unset-or-set nested entity on a parent.
pub enum Slot<'a> {
    Portal(&'a mut Option<Box<Portal>>),
    World(&'a mut Option<Box<World>>),
    Package(&'a mut Option<Box<Package>>),
}

/// An entity that can sit at some level of a chain.
pub trait Node: Sized + Send {
    const KIND: EntityKind;

    /// Builds the entity from its level's scalar columns, `None` when the
    /// level's id is null.
    fn decode_head<R: RowView + ?Sized>(row: &R, level: &Level) -> CatalogResult<Option<Self>>;

    fn id(&self) -> Id;

    fn files_mut(&mut self) -> &mut Vec<File>;

    fn link(&mut self, relation: Relation) -> Option<Slot<'_>>;
}

fn decode_owner<R: RowView + ?Sized>(row: &R, level: &Level) -> CatalogResult<Option<Owner>> {
    if level.owner {
        return decode_group(row, &level.owner_prefix());
    }
    Ok(opt_id(row, level.prefix, "owner_id")?.map(Owner::id_only))
}

fn decode_rating<R: RowView + ?Sized>(row: &R, level: &Level) -> CatalogResult<Rating> {
    if level.rating {
        Rating::decode(row, level.prefix)
    } else {
        Ok(Rating::default())
    }
}

impl Node for Package {
    const KIND: EntityKind = EntityKind::Package;

    fn decode_head<R: RowView + ?Sized>(row: &R, level: &Level) -> CatalogResult<Option<Self>> {
        let p = level.prefix;
        let Some(id) = opt_id(row, p, "id")? else {
            return Ok(None);
        };
        Ok(Some(Package {
            id,
            name: required_str(row, p, "name")?,
            title: opt_str(row, p, "title")?,
            description: opt_str(row, p, "description")?,
            version: opt_str(row, p, "version")?,
            public: flag(row, p, "public")?,
            owner: decode_owner(row, level)?,
            files: Vec::new(),
            rating: decode_rating(row, level)?,
            created_at: opt_i64(row, p, "created_at")?.unwrap_or(0),
            updated_at: opt_i64(row, p, "updated_at")?.unwrap_or(0),
        }))
    }

    fn id(&self) -> Id {
        self.id
    }

    fn files_mut(&mut self) -> &mut Vec<File> {
        &mut self.files
    }

    fn link(&mut self, _relation: Relation) -> Option<Slot<'_>> {
        None
    }
}

impl Node for World {
    const KIND: EntityKind = EntityKind::World;

    fn decode_head<R: RowView + ?Sized>(row: &R, level: &Level) -> CatalogResult<Option<Self>> {
        let p = level.prefix;
        let Some(id) = opt_id(row, p, "id")? else {
            return Ok(None);
        };
        Ok(Some(World {
            id,
            package_id: opt_id(row, p, "package_id")?,
            name: required_str(row, p, "name")?,
            title: opt_str(row, p, "title")?,
            description: opt_str(row, p, "description")?,
            map: opt_str(row, p, "map")?,
            public: flag(row, p, "public")?,
            owner: decode_owner(row, level)?,
            files: Vec::new(),
            rating: decode_rating(row, level)?,
            created_at: opt_i64(row, p, "created_at")?.unwrap_or(0),
            updated_at: opt_i64(row, p, "updated_at")?.unwrap_or(0),
            package: None,
        }))
    }

    fn id(&self) -> Id {
        self.id
    }

    fn files_mut(&mut self) -> &mut Vec<File> {
        &mut self.files
    }

    fn link(&mut self, relation: Relation) -> Option<Slot<'_>> {
        match relation {
            Relation::Package => Some(Slot::Package(&mut self.package)),
            _ => None,
        }
    }
}

impl Node for Portal {
    const KIND: EntityKind = EntityKind::Portal;

    fn decode_head<R: RowView + ?Sized>(row: &R, level: &Level) -> CatalogResult<Option<Self>> {
        let p = level.prefix;
        let Some(id) = opt_id(row, p, "id")? else {
            return Ok(None);
        };
        Ok(Some(Portal {
            id,
            world_id: opt_id(row, p, "world_id")?,
            destination_id: opt_id(row, p, "destination_id")?,
            name: required_str(row, p, "name")?,
            title: opt_str(row, p, "title")?,
            description: opt_str(row, p, "description")?,
            public: flag(row, p, "public")?,
            owner: decode_owner(row, level)?,
            files: Vec::new(),
            rating: decode_rating(row, level)?,
            created_at: opt_i64(row, p, "created_at")?.unwrap_or(0),
            updated_at: opt_i64(row, p, "updated_at")?.unwrap_or(0),
            destination: None,
            world: None,
        }))
    }

    fn id(&self) -> Id {
        self.id
    }

    fn files_mut(&mut self) -> &mut Vec<File> {
        &mut self.files
    }

    fn link(&mut self, relation: Relation) -> Option<Slot<'_>> {
        match relation {
            Relation::Destination => Some(Slot::Portal(&mut self.destination)),
            Relation::World => Some(Slot::World(&mut self.world)),
            Relation::Package => None,
        }
    }
}

impl Node for Server {
    const KIND: EntityKind = EntityKind::Server;

    fn decode_head<R: RowView + ?Sized>(row: &R, level: &Level) -> CatalogResult<Option<Self>> {
        let p = level.prefix;
        let Some(id) = opt_id(row, p, "id")? else {
            return Ok(None);
        };
        Ok(Some(Server {
            id,
            world_id: opt_id(row, p, "world_id")?,
            name: required_str(row, p, "name")?,
            title: opt_str(row, p, "title")?,
            description: opt_str(row, p, "description")?,
            host: opt_str(row, p, "host")?,
            port: opt_i64(row, p, "port")?,
            region: opt_str(row, p, "region")?,
            public: flag(row, p, "public")?,
            owner: decode_owner(row, level)?,
            files: Vec::new(),
            rating: decode_rating(row, level)?,
            created_at: opt_i64(row, p, "created_at")?.unwrap_or(0),
            updated_at: opt_i64(row, p, "updated_at")?.unwrap_or(0),
            world: None,
        }))
    }

    fn id(&self) -> Id {
        self.id
    }

    fn files_mut(&mut self) -> &mut Vec<File> {
        &mut self.files
    }

    fn link(&mut self, relation: Relation) -> Option<Slot<'_>> {
        match relation {
            Relation::World => Some(Slot::World(&mut self.world)),
            _ => None,
        }
    }
}
