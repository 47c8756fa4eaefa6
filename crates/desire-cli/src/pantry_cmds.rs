//! `desire pantry` subcommands.

use anyhow::Result;
use sqlx::PgPool;

use desire_core::pantry::PantryComparison;

use crate::PantryCommands;
use crate::config::DesireConfig;
use crate::session::{self, user_facing};

pub async fn run_pantry_command(
    command: PantryCommands,
    pool: &PgPool,
    config: &DesireConfig,
) -> Result<()> {
    let ctx = session::open(pool, config).await?;

    match command {
        PantryCommands::List => {
            let snap = ctx.snapshot();
            if snap.pantry.is_empty() {
                println!("Your pantry is empty.");
            } else {
                for item in snap.pantry.iter() {
                    println!("  {item}");
                }
                println!("{} items", snap.pantry.len());
            }
        }
        PantryCommands::Add { items } => {
            for raw in &items {
                let name = ctx.pantry.add_item(raw).await.map_err(user_facing)?;
                println!("Added {name}");
            }
        }
        PantryCommands::Remove { items } => {
            for raw in &items {
                let name = ctx.pantry.remove_item(raw).await.map_err(user_facing)?;
                println!("Removed {name}");
            }
        }
        PantryCommands::Compare { ingredients } => {
            print!("{}", render_comparison(&ctx.compare_ingredients(ingredients.as_slice())));
        }
    }

    Ok(())
}

/// Two-column have/need listing for a recipe's ingredients.
pub fn render_comparison(cmp: &PantryComparison) -> String {
    let mut out = String::new();
    for item in &cmp.have {
        out.push_str(&format!("  [+] {item}\n"));
    }
    for item in &cmp.need {
        out.push_str(&format!("  [ ] {item}\n"));
    }
    if cmp.is_complete() {
        out.push_str("You have everything.\n");
    } else {
        out.push_str(&format!(
            "Have {} of {}; missing {}.\n",
            cmp.have.len(),
            cmp.have.len() + cmp.need.len(),
            cmp.need.len()
        ));
    }
    out
}
