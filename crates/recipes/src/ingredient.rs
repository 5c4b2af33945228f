use serde::{Deserialize, Serialize};

use larder_core::{DomainResult, Entity, IngredientId, validate};

pub const NAME_MAX: usize = 100;
pub const UNIT_MAX: usize = 20;

/// Canonical catalog ingredient. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

impl Entity for Ingredient {
    type Id = IngredientId;

    fn id(&self) -> IngredientId {
        self.id
    }
}

/// Validated catalog entry awaiting an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

impl NewIngredient {
    pub fn new(name: &str, measurement_unit: &str) -> DomainResult<Self> {
        Ok(Self {
            name: validate::bounded_text("name", name, NAME_MAX)?,
            measurement_unit: validate::bounded_text("measurement_unit", measurement_unit, UNIT_MAX)?,
        })
    }

    /// Re-run validation on a deserialized payload.
    pub fn validated(self) -> DomainResult<Self> {
        Self::new(&self.name, &self.measurement_unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ingredient_trims_both_fields() {
        let ing = NewIngredient::new(" flour ", " g ").unwrap();
        assert_eq!(ing.name, "flour");
        assert_eq!(ing.measurement_unit, "g");
    }

    #[test]
    fn unit_length_is_bounded() {
        let err = NewIngredient::new("salt", "a very long unit of measure").unwrap_err();
        assert_eq!(err.field(), Some("measurement_unit"));
    }
}
