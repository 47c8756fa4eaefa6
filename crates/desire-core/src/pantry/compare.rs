use super::mirror::PantryMirror;

/// A recipe's ingredients split by whether the pantry already has them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PantryComparison {
    pub have: Vec<String>,
    pub need: Vec<String>,
}

impl PantryComparison {
    /// `true` when nothing needs to be bought.
    pub fn is_complete(&self) -> bool {
        self.need.is_empty()
    }
}

/// Split `ingredients` into owned and missing, keeping recipe order and the
/// caller's spelling.
pub fn compare_ingredients<S: AsRef<str>>(
    mirror: &PantryMirror,
    ingredients: &[S],
) -> PantryComparison {
    let (have, need): (Vec<_>, Vec<_>) = ingredients
        .iter()
        .map(|i| i.as_ref().to_owned())
        .partition(|i| mirror.contains(i));
    PantryComparison { have, need }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_by_membership() {
        let mirror: PantryMirror = ["flour", "sugar", "eggs"]
            .into_iter()
            .map(String::from)
            .collect();
        let cmp = compare_ingredients(&mirror, &["Eggs", "butter", "flour", "vanilla"]);
        assert_eq!(cmp.have, vec!["Eggs", "flour"]);
        assert_eq!(cmp.need, vec!["butter", "vanilla"]);
        assert!(!cmp.is_complete());
    }

    #[test]
    fn empty_recipe_is_complete() {
        let cmp = compare_ingredients::<&str>(&PantryMirror::new(), &[]);
        assert!(cmp.is_complete());
        assert!(cmp.have.is_empty());
    }
}
