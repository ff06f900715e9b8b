use serde::{Deserialize, Serialize};

use crate::decode::{flag, opt_id};
use crate::{CatalogResult, Id, RowView};

/// Who is asking. Admin reads bypass visibility entirely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Audience {
    #[default]
    Anonymous,
    Principal(Id),
    Admin,
}

impl Audience {
    pub fn principal(&self) -> Option<Id> {
        match self {
            Audience::Principal(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Audience::Admin)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VisibilityFact {
    pub is_public: bool,
    pub can_view: bool,
    pub is_owner: bool,
}

impl VisibilityFact {
    pub fn granted() -> Self {
        Self {
            is_public: true,
            can_view: true,
            is_owner: true,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.is_public || self.can_view || self.is_owner
    }

    /// Reads `{prefix}_public`, `{prefix}_grant` (the requesting principal's
    /// view grant, null when there is none) and `{prefix}_owner_id`.
    pub fn decode<R: RowView + ?Sized>(
        row: &R,
        prefix: &str,
        audience: &Audience,
    ) -> CatalogResult<Self> {
        if audience.is_admin() {
            return Ok(Self::granted());
        }
        let is_public = flag(row, prefix, "public")?;
        let Some(principal) = audience.principal() else {
            return Ok(Self {
                is_public,
                can_view: false,
                is_owner: false,
            });
        };
        let grant = opt_id(row, prefix, "grant")?;
        let owner = opt_id(row, prefix, "owner_id")?;
        Ok(Self {
            is_public,
            can_view: grant == Some(principal),
            is_owner: owner == Some(principal),
        })
    }
}

/// A chain is visible only when every link is.
pub fn is_visible(chain: &[VisibilityFact]) -> bool {
    chain.iter().all(VisibilityFact::is_visible)
}
