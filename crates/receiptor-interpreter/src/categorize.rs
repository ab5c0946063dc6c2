//! Default `categorize` implementation.
//!
//! Spec §6 specifies `categorize` as a pure function the *caller* supplies;
//! the core never assumes one. This module ships a reference keyword-table
//! implementation — grounded on the same contains-match rule-engine idiom as
//! `aequi_import::rules::CategoryRuleEngine` — so the pipeline has something
//! concrete to exercise end to end. Callers are free to pass their own.

use receiptor_core::Category;

/// `(keyword, category)` pairs, checked in order — first match wins. Prepared-
/// food keywords are listed before raw-ingredient ones so an item like
/// "Cheese Burger" resolves to the restaurant it names rather than the
/// ingredient it happens to contain. Kept as a flat contains-match table
/// rather than a compiled rule engine since item names are short and the
/// keyword set is small.
const KEYWORDS: &[(&str, Category)] = &[
    ("burger", Category::Restaurant),
    ("fries", Category::Restaurant),
    ("soda", Category::Restaurant),
    ("pizza", Category::Restaurant),
    ("taco", Category::Restaurant),
    ("sandwich", Category::Restaurant),
    ("combo", Category::Restaurant),
    ("entree", Category::Restaurant),
    ("latte", Category::Restaurant),
    ("coffee", Category::Restaurant),
    ("aspirin", Category::Pharmacy),
    ("ibuprofen", Category::Pharmacy),
    ("vitamin", Category::Pharmacy),
    ("prescription", Category::Pharmacy),
    ("bandage", Category::Pharmacy),
    ("cough", Category::Pharmacy),
    ("allergy", Category::Pharmacy),
    ("shampoo", Category::Retail),
    ("detergent", Category::Retail),
    ("batteries", Category::Retail),
    ("towel", Category::Retail),
    ("notebook", Category::Retail),
    ("charger", Category::Retail),
    ("shirt", Category::Retail),
    ("banana", Category::Groceries),
    ("apple", Category::Groceries),
    ("milk", Category::Groceries),
    ("bread", Category::Groceries),
    ("cheese", Category::Groceries),
    ("egg", Category::Groceries),
    ("produce", Category::Groceries),
    ("organic", Category::Groceries),
    ("cereal", Category::Groceries),
    ("yogurt", Category::Groceries),
    ("vegetable", Category::Groceries),
];

/// Looks `name` up in the built-in keyword table, case-insensitively,
/// falling back to [`Category::Other`] when nothing matches.
pub fn default_categorizer(name: &str) -> Category {
    let lower = name.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(kw, _)| lower.contains(kw))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_groceries() {
        assert_eq!(default_categorizer("BANANA CAVENDISH"), Category::Groceries);
    }

    #[test]
    fn recognizes_restaurant_items() {
        assert_eq!(default_categorizer("Cheese Burger"), Category::Restaurant);
    }

    #[test]
    fn recognizes_pharmacy_items() {
        assert_eq!(default_categorizer("Children's Ibuprofen"), Category::Pharmacy);
    }

    #[test]
    fn recognizes_retail_items() {
        assert_eq!(default_categorizer("Duracell Batteries"), Category::Retail);
    }

    #[test]
    fn unmatched_name_falls_back_to_other() {
        assert_eq!(default_categorizer("Mystery Widget"), Category::Other);
    }

    #[test]
    fn match_is_case_insensitive() {
        assert_eq!(default_categorizer("ORGANIC milk"), Category::Groceries);
    }
}
