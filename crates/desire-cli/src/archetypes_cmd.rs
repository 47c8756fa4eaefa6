//! `desire archetypes` command: browse the onboarding presets. Needs no
//! database.

use desire_core::presets;

pub fn run_archetypes(search: Option<&str>) {
    match search {
        Some(query) => print!("{}", render_search(query)),
        None => print!("{}", render_library()),
    }
}

fn render_library() -> String {
    let mut out = String::from("Archetypes:\n");
    for a in presets::archetypes() {
        out.push_str(&format!("  {:<12} {}\n", a.key, a.title));
        out.push_str(&format!("  {:<12} {}\n", "", a.description));
        out.push_str(&format!("  {:<12} {}\n\n", "", a.ingredients.join(", ")));
    }
    out.push_str("Categories:\n");
    for c in presets::categories() {
        out.push_str(&format!("  {:<12} {}\n", c.name, c.items.join(", ")));
    }
    out
}

fn render_search(query: &str) -> String {
    let hits = presets::search_ingredients(query);
    if hits.is_empty() {
        return format!("No ingredients match {query:?}.\n");
    }
    hits.iter()
        .map(|(category, items)| format!("  {:<12} {}\n", category, items.join(", ")))
        .collect()
}
