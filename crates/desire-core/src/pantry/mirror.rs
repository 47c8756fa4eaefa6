use std::collections::BTreeSet;

/// Normalize a pantry item name: surrounding whitespace trimmed, lowercased.
///
/// Returns `None` when nothing is left.
pub fn normalize_item_name(raw: &str) -> Option<String> {
    let name = raw.trim().to_lowercase();
    (!name.is_empty()).then_some(name)
}

/// Local copy of the signed-in user's pantry. Holds normalized names only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PantryMirror {
    items: BTreeSet<String>,
}

impl PantryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Membership test; `name` is normalized first.
    pub fn contains(&self, name: &str) -> bool {
        normalize_item_name(name).is_some_and(|n| self.items.contains(&n))
    }

    pub(crate) fn insert(&mut self, normalized: String) -> bool {
        self.items.insert(normalized)
    }

    pub(crate) fn remove(&mut self, normalized: &str) -> bool {
        self.items.remove(normalized)
    }

    pub(crate) fn replace(&mut self, items: BTreeSet<String>) {
        self.items = items;
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

impl FromIterator<String> for PantryMirror {
    /// Builds a mirror from raw names, normalizing and dropping blanks.
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            items: iter
                .into_iter()
                .filter_map(|raw| normalize_item_name(&raw))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization() {
        assert_eq!(normalize_item_name("  Olive Oil "), Some("olive oil".into()));
        assert_eq!(normalize_item_name("SALT"), Some("salt".into()));
        assert_eq!(normalize_item_name("   "), None);
        assert_eq!(normalize_item_name(""), None);
    }

    #[test]
    fn contains_normalizes_the_query() {
        let mirror: PantryMirror = ["Rice".to_owned(), " beans".to_owned()].into_iter().collect();
        assert!(mirror.contains("RICE"));
        assert!(mirror.contains("beans "));
        assert!(!mirror.contains("flour"));
        assert!(!mirror.contains(""));
    }

    #[test]
    fn from_iter_dedupes_and_drops_blanks() {
        let mirror: PantryMirror = ["Salt", "salt", " ", "Pepper"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(mirror.iter().collect::<Vec<_>>(), vec!["pepper", "salt"]);
        assert_eq!(mirror.len(), 2);
    }
}
