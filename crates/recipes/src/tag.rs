use serde::{Deserialize, Serialize};

use larder_core::{DomainResult, Entity, TagId, validate};

pub const NAME_MAX: usize = 200;
pub const SLUG_MAX: usize = 200;

/// A label recipes can be filtered by (e.g. "Breakfast", `#E26C2D`, `breakfast`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl Entity for Tag {
    type Id = TagId;

    fn id(&self) -> TagId {
        self.id
    }
}

/// Unvalidated tag payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TagDraft {
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// Tag fields that passed validation; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl TagDraft {
    pub fn validate(self) -> DomainResult<NewTag> {
        let name = validate::bounded_text("name", &self.name, NAME_MAX)?;
        let color = self.color.trim().to_string();
        validate::hex_color("color", &color)?;
        let slug = validate::bounded_text("slug", &self.slug, SLUG_MAX)?;
        validate::slug("slug", &slug)?;
        Ok(NewTag { name, color, slug })
    }
}
