//! `desire onboard` command: run the quick onboarding path end to end.
//!
//! Choosing an archetype, confirming its checklist and finishing happen in
//! one session. A later invocation re-hydrates the step from the remote
//! profile, which only records completed onboarding.

use anyhow::Result;
use sqlx::PgPool;

use desire_core::OnboardingStep;
use desire_core::pantry::normalize_item_name;
use desire_core::presets::Archetype;

use crate::config::DesireConfig;
use crate::session::{self, user_facing};

pub async fn run_onboard(
    pool: &PgPool,
    config: &DesireConfig,
    archetype: &str,
    exclude: &[String],
    refine: &[String],
) -> Result<()> {
    let ctx = session::open(pool, config).await?;
    if ctx.onboarding.current() == OnboardingStep::Finished {
        println!("Onboarding is already finished.");
        return Ok(());
    }

    let chosen = ctx.choose_archetype(archetype).await.map_err(user_facing)?;
    println!("Archetype: {}", chosen.title);

    let selection = checklist_selection(chosen, exclude);
    let saved = ctx
        .confirm_checklist(selection.as_slice())
        .await
        .map_err(user_facing)?;
    println!("Pantry stocked with {} items: {}", saved.len(), saved.join(", "));

    let refined = (!refine.is_empty()).then_some(refine);
    ctx.finish_onboarding(refined).await.map_err(user_facing)?;
    if refined.is_some() {
        println!("Pantry refined to {} items.", ctx.snapshot().pantry.len());
    }

    println!("Onboarding finished.");
    Ok(())
}

/// The archetype's suggested items minus the ones the user unticked.
pub fn checklist_selection(archetype: &Archetype, exclude: &[String]) -> Vec<String> {
    let excluded: Vec<String> = exclude
        .iter()
        .filter_map(|e| normalize_item_name(e))
        .collect();
    archetype
        .ingredients
        .iter()
        .filter(|i| !excluded.contains(i))
        .cloned()
        .collect()
}
