//! Database model for the ingredient taxonomy.

use serde::{Deserialize, Serialize};

use crate::db::models::Entity;
use crate::db::scan::RowScanner;
use crate::db::schema::TableSchema;
use crate::db::sql::SqlValue;

/// A known ingredient together with its allergen and dietary flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidIngredient {
    pub name: String,
    pub variant: String,
    pub description: String,
    pub warning: String,
    pub contains_egg: bool,
    pub contains_dairy: bool,
    pub contains_peanut: bool,
    pub contains_tree_nut: bool,
    pub contains_soy: bool,
    pub contains_wheat: bool,
    pub contains_shellfish: bool,
    pub contains_sesame: bool,
    pub contains_fish: bool,
    pub contains_gluten: bool,
    pub animal_flesh: bool,
    pub animal_derived: bool,
    pub measurable_by_volume: bool,
    pub icon: String,
}

impl Entity for ValidIngredient {
    type Chain = [u64; 0];

    const SCHEMA: &'static TableSchema = &TableSchema {
        table: "valid_ingredients",
        columns: &[
            "name",
            "variant",
            "description",
            "warning",
            "contains_egg",
            "contains_dairy",
            "contains_peanut",
            "contains_tree_nut",
            "contains_soy",
            "contains_wheat",
            "contains_shellfish",
            "contains_sesame",
            "contains_fish",
            "contains_gluten",
            "animal_flesh",
            "animal_derived",
            "measurable_by_volume",
            "icon",
        ],
        ancestors: &[],
    };

    fn scan(scanner: &mut RowScanner<'_>) -> Result<Self, sqlx::Error> {
        Ok(Self {
            name: scanner.next()?,
            variant: scanner.next()?,
            description: scanner.next()?,
            warning: scanner.next()?,
            contains_egg: scanner.next()?,
            contains_dairy: scanner.next()?,
            contains_peanut: scanner.next()?,
            contains_tree_nut: scanner.next()?,
            contains_soy: scanner.next()?,
            contains_wheat: scanner.next()?,
            contains_shellfish: scanner.next()?,
            contains_sesame: scanner.next()?,
            contains_fish: scanner.next()?,
            contains_gluten: scanner.next()?,
            animal_flesh: scanner.next()?,
            animal_derived: scanner.next()?,
            measurable_by_volume: scanner.next()?,
            icon: scanner.next()?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.as_str().into(),
            self.variant.as_str().into(),
            self.description.as_str().into(),
            self.warning.as_str().into(),
            self.contains_egg.into(),
            self.contains_dairy.into(),
            self.contains_peanut.into(),
            self.contains_tree_nut.into(),
            self.contains_soy.into(),
            self.contains_wheat.into(),
            self.contains_shellfish.into(),
            self.contains_sesame.into(),
            self.contains_fish.into(),
            self.contains_gluten.into(),
            self.animal_flesh.into(),
            self.animal_derived.into(),
            self.measurable_by_volume.into(),
            self.icon.as_str().into(),
        ]
    }
}
