//! Shopping list built from a user's cart: ingredient totals merged across recipes.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One (recipe, ingredient) pair in a user's cart. A recipe without ingredients shows up
/// once with the ingredient columns empty.
#[derive(Debug, Clone, FromRow)]
pub struct CartLine {
    pub recipe: String,
    pub author: String,
    pub ingredient: Option<String>,
    pub measurement_unit: Option<String>,
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    /// 1-based position in the list
    pub index: usize,
    pub name: String,
    pub amount: i64,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Attribution {
    pub recipe: String,
    pub author: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ShoppingList {
    pub items: Vec<ShoppingItem>,
    pub recipes: Vec<Attribution>,
}

fn alphabetical(name: &str) -> (String, &str) {
    (name.to_lowercase(), name)
}

impl ShoppingList {
    pub const TITLE: &'static str = "Foodgram shopping list";

    /// Sums amounts per (ingredient, unit) and sorts both sections alphabetically.
    pub fn aggregate(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut totals: HashMap<(String, String), i64> = HashMap::new();
        let mut recipes = BTreeSet::new();

        for line in lines {
            if let (Some(name), Some(unit), Some(amount)) =
                (line.ingredient, line.measurement_unit, line.amount)
            {
                let total = totals.entry((name, unit)).or_default();
                *total = total.saturating_add(amount);
            }
            recipes.insert(Attribution {
                recipe: line.recipe,
                author: line.author,
            });
        }

        let mut totals = totals.into_iter().collect::<Vec<_>>();
        totals.sort_by(|((a, a_unit), _), ((b, b_unit), _)| {
            alphabetical(a)
                .cmp(&alphabetical(b))
                .then_with(|| a_unit.cmp(b_unit))
        });

        let items = totals
            .into_iter()
            .enumerate()
            .map(|(i, ((name, measurement_unit), amount))| ShoppingItem {
                index: i + 1,
                name,
                amount,
                measurement_unit,
            })
            .collect();

        let mut recipes = recipes.into_iter().collect::<Vec<_>>();
        recipes.sort_by(|a, b| {
            alphabetical(&a.recipe)
                .cmp(&alphabetical(&b.recipe))
                .then_with(|| a.author.cmp(&b.author))
        });

        Self { items, recipes }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.recipes.is_empty()
    }

    /// Title and timestamp, the numbered ingredient table, then the recipes it came from.
    pub fn to_csv(&self, generated_at: DateTime<Utc>) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());

        writer.write_record([Self::TITLE])?;
        let timestamp = generated_at.format("%Y-%m-%d %H:%M UTC").to_string();
        writer.write_record(["Generated at", timestamp.as_str()])?;

        writer.write_record(["#", "Ingredient", "Amount", "Unit"])?;
        for item in &self.items {
            writer.write_record([
                item.index.to_string().as_str(),
                item.name.as_str(),
                item.amount.to_string().as_str(),
                item.measurement_unit.as_str(),
            ])?;
        }

        writer.write_record(["Recipe", "Author"])?;
        for attribution in &self.recipes {
            writer.write_record([&attribution.recipe, &attribution.author])?;
        }

        writer
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn line(recipe: &str, author: &str, ingredient: &str, unit: &str, amount: i64) -> CartLine {
        CartLine {
            recipe: recipe.to_string(),
            author: author.to_string(),
            ingredient: Some(ingredient.to_string()),
            measurement_unit: Some(unit.to_string()),
            amount: Some(amount),
        }
    }

    fn empty_recipe(recipe: &str, author: &str) -> CartLine {
        CartLine {
            recipe: recipe.to_string(),
            author: author.to_string(),
            ingredient: None,
            measurement_unit: None,
            amount: None,
        }
    }

    fn summary(list: &ShoppingList) -> Vec<(usize, &str, i64, &str)> {
        list.items
            .iter()
            .map(|item| {
                (
                    item.index,
                    item.name.as_str(),
                    item.amount,
                    item.measurement_unit.as_str(),
                )
            })
            .collect()
    }

    #[test]
    fn merges_ingredients_across_recipes() {
        let list = ShoppingList::aggregate([
            line("Recipe A", "alice", "Salt", "g", 5),
            line("Recipe A", "alice", "Water", "ml", 200),
            line("Recipe B", "bob", "Salt", "g", 3),
            line("Recipe B", "bob", "Milk", "ml", 100),
        ]);

        assert_eq!(
            summary(&list),
            [
                (1, "Milk", 100, "ml"),
                (2, "Salt", 8, "g"),
                (3, "Water", 200, "ml"),
            ]
        );
        assert_eq!(
            list.recipes,
            [
                Attribution {
                    recipe: "Recipe A".into(),
                    author: "alice".into()
                },
                Attribution {
                    recipe: "Recipe B".into(),
                    author: "bob".into()
                },
            ]
        );
    }

    #[test]
    fn same_name_with_different_units_stays_separate() {
        let list = ShoppingList::aggregate([
            line("Tea", "alice", "sugar", "g", 10),
            line("Cake", "bob", "sugar", "cup", 1),
            line("Jam", "bob", "Sugar", "g", 300),
        ]);

        assert_eq!(
            summary(&list),
            [(1, "Sugar", 300, "g"), (2, "sugar", 1, "cup"), (3, "sugar", 10, "g")]
        );
    }

    #[test]
    fn sorting_ignores_case() {
        let list = ShoppingList::aggregate([
            line("b", "x", "water", "ml", 1),
            line("A", "x", "Butter", "g", 1),
            line("c", "x", "apple", "pc", 1),
        ]);

        let names = list.items.iter().map(|i| i.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["apple", "Butter", "water"]);

        let recipes = list.recipes.iter().map(|r| r.recipe.as_str()).collect::<Vec<_>>();
        assert_eq!(recipes, ["A", "b", "c"]);
    }

    #[test]
    fn every_key_appears_once_with_the_full_sum() {
        let lines = (0..40)
            .map(|i| {
                let name = ["flour", "egg", "oil"][i % 3];
                line(&format!("recipe {}", i % 7), "cook", name, "g", i as i64 + 1)
            })
            .collect::<Vec<_>>();

        let expected = |name: &str| -> i64 {
            lines
                .iter()
                .filter(|l| l.ingredient.as_deref() == Some(name))
                .filter_map(|l| l.amount)
                .sum()
        };

        let list = ShoppingList::aggregate(lines.clone());
        assert_eq!(list.items.len(), 3);
        for item in &list.items {
            assert_eq!(item.amount, expected(&item.name), "{}", item.name);
        }
        assert_eq!(list.recipes.len(), 7);
    }

    #[test]
    fn totals_saturate_instead_of_wrapping() {
        let list = ShoppingList::aggregate([
            line("A", "alice", "salt", "g", i64::MAX),
            line("B", "bob", "salt", "g", 1),
        ]);

        assert_eq!(summary(&list), [(1, "salt", i64::MAX, "g")]);
    }

    #[test]
    fn recipe_without_ingredients_is_still_attributed() {
        let list = ShoppingList::aggregate([empty_recipe("Air", "alice")]);

        assert!(list.items.is_empty());
        assert_eq!(list.recipes.len(), 1);
    }

    #[test]
    fn empty_cart_renders_an_empty_table() {
        let list = ShoppingList::aggregate(Vec::new());
        assert!(list.is_empty());

        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let csv = String::from_utf8(list.to_csv(at).unwrap()).unwrap();

        assert_eq!(
            csv,
            "Foodgram shopping list\nGenerated at,2024-03-01 12:30 UTC\n#,Ingredient,Amount,Unit\nRecipe,Author\n"
        );
    }

    #[test]
    fn renders_numbered_table_and_attribution() {
        let list = ShoppingList::aggregate([
            line("Soup, hot", "alice", "Salt", "g", 5),
            line("Bread", "bob", "Salt", "g", 3),
        ]);

        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let csv = String::from_utf8(list.to_csv(at).unwrap()).unwrap();
        let rows = csv.lines().collect::<Vec<_>>();

        assert_eq!(rows[3], "1,Salt,8,g");
        assert_eq!(rows[4], "Recipe,Author");
        assert_eq!(rows[5], "Bread,bob");
        assert_eq!(rows[6], "\"Soup, hot\",alice");
    }
}
