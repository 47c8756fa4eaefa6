//! Archetype and ingredient-category presets for onboarding.
//!
//! The library is defined in `archetypes.toml` and embedded in the binary at
//! compile time.

use std::sync::LazyLock;

use serde::Deserialize;

/// A starting pantry offered on the quick onboarding path.
#[derive(Debug, Clone, Deserialize)]
pub struct Archetype {
    /// Short identifier (e.g. `baker`).
    pub key: String,
    /// Display title; this is what gets stored on the profile.
    pub title: String,
    pub description: String,
    /// Suggested pantry items, already normalized.
    pub ingredients: Vec<String>,
}

/// A group of ingredients shown during detailed pantry setup.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientCategory {
    pub name: String,
    pub items: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PresetLibrary {
    archetypes: Vec<Archetype>,
    categories: Vec<IngredientCategory>,
}

static PRESETS_TOML: &str = include_str!("archetypes.toml");

/// # Panics
///
/// Panics on first use if the embedded TOML is malformed. The file is part of
/// the binary, so a build that passes its tests cannot hit this.
static LIBRARY: LazyLock<PresetLibrary> = LazyLock::new(|| {
    toml::from_str(PRESETS_TOML).expect("embedded archetypes.toml is invalid")
});

pub fn archetypes() -> &'static [Archetype] {
    &LIBRARY.archetypes
}

/// Look up an archetype by key or title, ignoring case.
pub fn find_archetype(name: &str) -> Option<&'static Archetype> {
    let name = name.trim();
    archetypes()
        .iter()
        .find(|a| a.key.eq_ignore_ascii_case(name) || a.title.eq_ignore_ascii_case(name))
}

pub fn categories() -> &'static [IngredientCategory] {
    &LIBRARY.categories
}

/// Category items whose name contains `query`, case-insensitively, grouped
/// by category. Categories with no match are left out. A blank query
/// matches everything.
pub fn search_ingredients(query: &str) -> Vec<(&'static str, Vec<&'static str>)> {
    let query = query.trim().to_lowercase();
    categories()
        .iter()
        .filter_map(|c| {
            let items: Vec<&str> = c
                .items
                .iter()
                .map(String::as_str)
                .filter(|item| item.to_lowercase().contains(&query))
                .collect();
            (!items.is_empty()).then_some((c.name.as_str(), items))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_library_parses() {
        assert_eq!(archetypes().len(), 4);
        assert_eq!(categories().len(), 4);
    }

    #[test]
    fn archetype_ingredients_are_normalized() {
        for a in archetypes() {
            assert!(!a.ingredients.is_empty(), "{} has no ingredients", a.key);
            for i in &a.ingredients {
                assert_eq!(
                    crate::pantry::normalize_item_name(i).as_deref(),
                    Some(i.as_str())
                );
            }
        }
    }

    #[test]
    fn find_by_key_or_title() {
        let baker = find_archetype("baker").unwrap();
        assert_eq!(baker.title, "The Baker");
        assert!(baker.ingredients.contains(&"yeast".to_string()));

        assert_eq!(find_archetype("the ascetic").unwrap().key, "ascetic");
        assert!(find_archetype("gourmand").is_none());
    }

    #[test]
    fn search_is_substring_and_grouped() {
        let hits = search_ingredients("PA");
        assert_eq!(
            hits,
            vec![("Spices", vec!["paprika"]), ("Grains", vec!["pasta"])]
        );

        let all = search_ingredients("  ");
        assert_eq!(all.len(), 4);
        assert!(search_ingredients("zzz").is_empty());
    }
}
