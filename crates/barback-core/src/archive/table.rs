//! Tables carried by a migration archive, in foreign-key dependency order.

use serde::Serialize;

/// A destination table with a `<name>.json` row dump inside the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveTable {
    IngredientCategories,
    Glasses,
    Tags,
    Ingredients,
    Cocktails,
    CocktailIngredients,
    CocktailIngredientSubstitutes,
    CocktailTag,
    Images,
}

impl ArchiveTable {
    /// Parents before children. Every table only references tables earlier
    /// in this list.
    pub const DEPENDENCY_ORDER: [ArchiveTable; 9] = [
        ArchiveTable::IngredientCategories,
        ArchiveTable::Glasses,
        ArchiveTable::Tags,
        ArchiveTable::Ingredients,
        ArchiveTable::Cocktails,
        ArchiveTable::CocktailIngredients,
        ArchiveTable::CocktailIngredientSubstitutes,
        ArchiveTable::CocktailTag,
        ArchiveTable::Images,
    ];

    /// Destination table name, which is also the dump file stem.
    pub fn name(&self) -> &'static str {
        match self {
            ArchiveTable::IngredientCategories => "ingredient_categories",
            ArchiveTable::Glasses => "glasses",
            ArchiveTable::Tags => "tags",
            ArchiveTable::Ingredients => "ingredients",
            ArchiveTable::Cocktails => "cocktails",
            ArchiveTable::CocktailIngredients => "cocktail_ingredients",
            ArchiveTable::CocktailIngredientSubstitutes => "cocktail_ingredient_substitutes",
            ArchiveTable::CocktailTag => "cocktail_tag",
            ArchiveTable::Images => "images",
        }
    }

    /// File name of this table's row dump inside the archive.
    pub fn dump_file(&self) -> String {
        format!("{}.json", self.name())
    }

    /// Children before parents, for clearing tables without violating
    /// foreign keys.
    pub fn truncate_order() -> impl Iterator<Item = ArchiveTable> {
        Self::DEPENDENCY_ORDER.into_iter().rev()
    }
}

impl std::fmt::Display for ArchiveTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(table: ArchiveTable) -> usize {
        ArchiveTable::DEPENDENCY_ORDER
            .iter()
            .position(|t| *t == table)
            .unwrap()
    }

    #[test]
    fn test_parents_precede_children() {
        assert!(position(ArchiveTable::Ingredients) > position(ArchiveTable::IngredientCategories));
        assert!(position(ArchiveTable::Cocktails) > position(ArchiveTable::Glasses));
        assert!(position(ArchiveTable::CocktailIngredients) > position(ArchiveTable::Cocktails));
        assert!(position(ArchiveTable::CocktailIngredients) > position(ArchiveTable::Ingredients));
        assert!(
            position(ArchiveTable::CocktailIngredientSubstitutes)
                > position(ArchiveTable::CocktailIngredients)
        );
        assert!(position(ArchiveTable::CocktailTag) > position(ArchiveTable::Tags));
    }

    #[test]
    fn test_truncate_order_is_reversed() {
        let order: Vec<_> = ArchiveTable::truncate_order().collect();
        assert_eq!(order.first(), Some(&ArchiveTable::Images));
        assert_eq!(order.last(), Some(&ArchiveTable::IngredientCategories));
    }

    #[test]
    fn test_dump_file_names() {
        assert_eq!(ArchiveTable::Glasses.dump_file(), "glasses.json");
        assert_eq!(
            ArchiveTable::CocktailIngredientSubstitutes.dump_file(),
            "cocktail_ingredient_substitutes.json"
        );
    }
}
