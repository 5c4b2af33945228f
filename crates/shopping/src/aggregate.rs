//! Ingredient aggregation across every recipe in a cart.
//!
//! Rows are merged by `(ingredient name, measurement unit)`, not by ingredient
//! id: two catalog entries that share a name and unit end up on one line.

use std::collections::BTreeMap;

use serde::Serialize;

/// One recipe-ingredient row reachable from a user's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: u32,
}

impl IngredientRow {
    pub fn new(name: impl Into<String>, measurement_unit: impl Into<String>, amount: u32) -> Self {
        Self {
            name: name.into(),
            measurement_unit: measurement_unit.into(),
            amount,
        }
    }
}

/// One line of the shopping list: summed amount for a `(name, unit)` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedLine {
    pub ingredient_name: String,
    pub measurement_unit: String,
    pub total_amount: u64,
}

impl AggregatedLine {
    /// `"{index}. {name}: {total} {unit}."`, index is 1-based.
    pub fn report_text(&self, index: usize) -> String {
        format!(
            "{index}. {}: {} {}.",
            self.ingredient_name, self.total_amount, self.measurement_unit
        )
    }
}

/// Merge rows by `(name, unit)`, summing amounts.
///
/// Output is ordered by name ascending, then unit ascending. An empty input
/// yields an empty list.
pub fn aggregate<I>(rows: I) -> Vec<AggregatedLine>
where
    I: IntoIterator<Item = IngredientRow>,
{
    let mut totals: BTreeMap<(String, String), u64> = BTreeMap::new();
    for row in rows {
        *totals.entry((row.name, row.measurement_unit)).or_default() += u64::from(row.amount);
    }
    totals
        .into_iter()
        .map(|((ingredient_name, measurement_unit), total_amount)| AggregatedLine {
            ingredient_name,
            measurement_unit,
            total_amount,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(name: &str, unit: &str, total: u64) -> AggregatedLine {
        AggregatedLine {
            ingredient_name: name.to_string(),
            measurement_unit: unit.to_string(),
            total_amount: total,
        }
    }

    #[test]
    fn two_recipes_merge_shared_ingredient() {
        // Recipe A: Sugar 100 g. Recipe B: Sugar 50 g, Salt 5 g.
        let rows = vec![
            IngredientRow::new("Sugar", "g", 100),
            IngredientRow::new("Sugar", "g", 50),
            IngredientRow::new("Salt", "g", 5),
        ];
        assert_eq!(aggregate(rows), vec![line("Salt", "g", 5), line("Sugar", "g", 150)]);
    }

    #[test]
    fn empty_cart_yields_empty_list() {
        assert!(aggregate(Vec::new()).is_empty());
    }

    #[test]
    fn same_name_different_unit_stays_separate() {
        let rows = vec![
            IngredientRow::new("Milk", "ml", 200),
            IngredientRow::new("Milk", "cup", 1),
            IngredientRow::new("Milk", "ml", 300),
        ];
        assert_eq!(
            aggregate(rows),
            vec![line("Milk", "cup", 1), line("Milk", "ml", 500)]
        );
    }

    #[test]
    fn report_text_matches_line_format() {
        assert_eq!(line("Flour", "g", 450).report_text(3), "3. Flour: 450 g.");
    }

    fn rows_strategy() -> impl Strategy<Value = Vec<IngredientRow>> {
        prop::collection::vec(
            (
                prop::sample::select(vec!["Egg", "Flour", "Milk", "Salt", "Sugar"]),
                prop::sample::select(vec!["g", "pc", "ml"]),
                1u32..10_000,
            )
                .prop_map(|(n, u, a)| IngredientRow::new(n, u, a)),
            0..60,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Each key's total equals the sum of the matching input rows.
        #[test]
        fn totals_equal_sum_per_key(rows in rows_strategy()) {
            let out = aggregate(rows.clone());
            for l in &out {
                let expected: u64 = rows
                    .iter()
                    .filter(|r| r.name == l.ingredient_name && r.measurement_unit == l.measurement_unit)
                    .map(|r| u64::from(r.amount))
                    .sum();
                prop_assert_eq!(l.total_amount, expected);
            }
            let grand: u64 = rows.iter().map(|r| u64::from(r.amount)).sum();
            prop_assert_eq!(out.iter().map(|l| l.total_amount).sum::<u64>(), grand);
        }

        #[test]
        fn output_is_sorted_and_stable(rows in rows_strategy()) {
            let out = aggregate(rows.clone());
            prop_assert!(out.windows(2).all(|w| w[0].ingredient_name <= w[1].ingredient_name));
            prop_assert_eq!(out, aggregate(rows));
        }
    }
}
