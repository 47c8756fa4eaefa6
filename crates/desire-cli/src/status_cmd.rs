//! `desire status` command: show the signed-in user's session.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use desire_core::home::HomePrompt;
use desire_core::{Flow, IdentityStatus, SessionSnapshot};

use crate::config::DesireConfig;
use crate::session;

pub async fn run_status(pool: &PgPool, config: &DesireConfig) -> Result<()> {
    let ctx = session::open(pool, config).await?;
    let now = Utc::now();
    print!(
        "{}",
        render_status(&ctx.snapshot(), ctx.current_flow(), &ctx.home_prompt(now))
    );
    Ok(())
}

const UPDATE_BADGE: &str = "[!] Your pantry needs an update";

/// Multi-line session summary, shared with the interactive shell.
pub fn render_status(snap: &SessionSnapshot, flow: Flow, prompt: &HomePrompt) -> String {
    let user = match &snap.identity {
        IdentityStatus::Pending => "(resolving)".to_owned(),
        IdentityStatus::Absent => "(signed out)".to_owned(),
        IdentityStatus::Present { user_id, hydrated } if !hydrated => {
            format!("{user_id} (loading)")
        }
        IdentityStatus::Present { user_id, .. } => user_id.clone(),
    };
    let session = &snap.session;

    let mut lines = vec![
        format!("User:       {user}"),
        format!("Screen:     {}", flow.route()),
        format!("Onboarding: {}", session.onboarding_step),
    ];
    lines.extend(
        session
            .onboarding_archetype
            .as_ref()
            .map(|archetype| format!("Archetype:  {archetype}")),
    );
    lines.push(format!("Pantry:     {} items", snap.pantry.len()));
    lines.push(format!("Last sync:  {}", format_sync(session.pantry_last_synced_at)));
    lines.push(format!("Inactive:   {} opens", session.consecutive_inactive_opens));

    if flow == Flow::Main {
        lines.push(String::new());
        lines.push(prompt.text.to_owned());
        if prompt.needs_pantry_update {
            lines.push(UPDATE_BADGE.to_owned());
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn format_sync(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "never".to_owned(),
    }
}
