//! `desire shell` command: an interactive session driven by the engine.
//!
//! Identity and foreground changes typed at the prompt are fed to a running
//! [`SessionEngine`], so hydration, sign-out teardown and inactive-open
//! counting behave as they would in the app.

use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::Utc;
use sqlx::PgPool;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use desire_core::presets;
use desire_core::store::{
    AppLifecycle, FileKeyValueStore, Identity, ManualIdentityProvider, ManualLifecycleSource,
    PgDocumentStore,
};
use desire_core::{SessionContext, SessionEngine};

use crate::config::DesireConfig;
use crate::pantry_cmds::render_comparison;
use crate::session::user_facing;
use crate::status_cmd::render_status;

const HELP: &str = "\
commands:
  sign-in <user>        sign-out
  search <query>        background | foreground
  add <item>            remove <item>
  compare <a, b, ...>   status
  choose <archetype>    confirm [a, b, ...]    finish [a, b, ...]
  help                  quit
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    SignIn(String),
    SignOut,
    Search(String),
    Background,
    Foreground,
    Add(String),
    Remove(String),
    Compare(Vec<String>),
    Choose(String),
    /// Empty means "keep every suggestion of the chosen archetype".
    Confirm(Vec<String>),
    /// Empty means "keep the checklist pantry".
    Finish(Vec<String>),
    Status,
    Help,
    Quit,
}

/// Parse one input line. Blank lines parse to `None`.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    let required = |usage: &str| {
        if rest.is_empty() {
            Err(format!("usage: {word} {usage}"))
        } else {
            Ok(rest.to_owned())
        }
    };

    let cmd = match word.to_ascii_lowercase().as_str() {
        "sign-in" | "signin" => ShellCommand::SignIn(required("<user>")?),
        "sign-out" | "signout" => ShellCommand::SignOut,
        "search" => ShellCommand::Search(required("<query>")?),
        "background" | "bg" => ShellCommand::Background,
        "foreground" | "fg" => ShellCommand::Foreground,
        "add" => ShellCommand::Add(required("<item>")?),
        "remove" | "rm" => ShellCommand::Remove(required("<item>")?),
        "compare" => ShellCommand::Compare(split_list(&required("<a, b, ...>")?)),
        "choose" => ShellCommand::Choose(required("<archetype>")?),
        "confirm" => ShellCommand::Confirm(split_list(rest)),
        "finish" => ShellCommand::Finish(split_list(rest)),
        "status" => ShellCommand::Status,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command {other:?}; type `help`")),
    };
    Ok(Some(cmd))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// The session context plus the two event sources the engine listens to.
pub struct Shell {
    ctx: SessionContext,
    identity: Arc<ManualIdentityProvider>,
    lifecycle: Arc<ManualLifecycleSource>,
}

impl Shell {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            identity: Arc::new(ManualIdentityProvider::new()),
            lifecycle: Arc::new(ManualLifecycleSource::new()),
        }
    }

    pub fn engine(&self) -> SessionEngine {
        SessionEngine::new(
            self.ctx.clone(),
            self.identity.clone(),
            self.lifecycle.clone(),
        )
    }

    pub async fn execute(&self, cmd: ShellCommand) -> Result<Reply> {
        let ctx = &self.ctx;
        let text = match cmd {
            ShellCommand::SignIn(user) => {
                self.identity.sign_in(Identity::new(user.clone()));
                format!("signing in as {user}")
            }
            ShellCommand::SignOut => {
                self.identity.sign_out();
                "signing out".to_owned()
            }
            ShellCommand::Search(query) => match ctx.submit_search(&query) {
                Some(q) => format!("searching for {q:?}"),
                None => "nothing to search for".to_owned(),
            },
            ShellCommand::Background => {
                self.lifecycle.emit(AppLifecycle::Background);
                "app backgrounded".to_owned()
            }
            ShellCommand::Foreground => {
                self.lifecycle.emit(AppLifecycle::Active);
                "app foregrounded".to_owned()
            }
            ShellCommand::Add(item) => {
                let name = ctx.pantry.add_item(&item).await.map_err(user_facing)?;
                format!("added {name}")
            }
            ShellCommand::Remove(item) => {
                let name = ctx.pantry.remove_item(&item).await.map_err(user_facing)?;
                format!("removed {name}")
            }
            ShellCommand::Compare(items) => {
                render_comparison(&ctx.compare_ingredients(items.as_slice()))
            }
            ShellCommand::Choose(name) => {
                let a = ctx.choose_archetype(&name).await.map_err(user_facing)?;
                format!("{}: {}\nsuggested: {}", a.title, a.description, a.ingredients.join(", "))
            }
            ShellCommand::Confirm(items) => {
                let items = if items.is_empty() {
                    self.suggested_items()?
                } else {
                    items
                };
                let saved = ctx
                    .confirm_checklist(items.as_slice())
                    .await
                    .map_err(user_facing)?;
                format!("pantry saved: {}", saved.join(", "))
            }
            ShellCommand::Finish(items) => {
                let refined = (!items.is_empty()).then_some(items.as_slice());
                ctx.finish_onboarding(refined).await.map_err(user_facing)?;
                "onboarding finished".to_owned()
            }
            ShellCommand::Status => {
                let status = render_status(
                    &ctx.snapshot(),
                    ctx.current_flow(),
                    &ctx.home_prompt(Utc::now()),
                );
                status.trim_end().to_owned()
            }
            ShellCommand::Help => HELP.trim_end().to_owned(),
            ShellCommand::Quit => return Ok(Reply::Quit),
        };
        Ok(Reply::Text(text))
    }

    fn suggested_items(&self) -> Result<Vec<String>> {
        let snap = self.ctx.snapshot();
        let Some(archetype) = snap
            .session
            .onboarding_archetype
            .as_deref()
            .and_then(presets::find_archetype)
        else {
            bail!("choose an archetype first");
        };
        Ok(archetype.ingredients.clone())
    }
}

pub async fn run_shell(pool: &PgPool, config: &DesireConfig) -> Result<()> {
    let ctx = SessionContext::new(
        Arc::new(FileKeyValueStore::new(&config.state_path)),
        Arc::new(PgDocumentStore::new(pool.clone())),
    );
    let shell = Shell::new(ctx);
    let cancel = CancellationToken::new();
    let engine = tokio::spawn(shell.engine().run(cancel.clone()));

    match config.user_id.as_deref() {
        Some(user) => shell.identity.sign_in(Identity::new(user)),
        None => shell.identity.sign_out(),
    }

    println!("Desire shell. Type `help` for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let cmd = match parse_line(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(usage) => {
                println!("{usage}");
                continue;
            }
        };
        match shell.execute(cmd).await {
            Ok(Reply::Text(text)) => println!("{text}"),
            Ok(Reply::Quit) => break,
            Err(e) => println!("error: {e:#}"),
        }
    }

    cancel.cancel();
    let exit = engine.await?;
    info!(?exit, "shell closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use desire_core::store::{MemoryDocumentStore, MemoryKeyValueStore};
    use desire_core::{Flow, OnboardingEntry};

    use super::*;

    #[test]
    fn parses_commands_and_arguments() {
        assert_eq!(parse_line("   "), Ok(None));
        assert_eq!(
            parse_line("add  olive oil "),
            Ok(Some(ShellCommand::Add("olive oil".into())))
        );
        assert_eq!(
            parse_line("compare flour, eggs ,, milk"),
            Ok(Some(ShellCommand::Compare(vec![
                "flour".into(),
                "eggs".into(),
                "milk".into()
            ])))
        );
        assert_eq!(parse_line("confirm"), Ok(Some(ShellCommand::Confirm(vec![]))));
        assert_eq!(parse_line("BG"), Ok(Some(ShellCommand::Background)));
        assert_eq!(parse_line("exit"), Ok(Some(ShellCommand::Quit)));
    }

    #[test]
    fn reports_usage_and_unknown_commands() {
        assert_eq!(parse_line("add"), Err("usage: add <item>".into()));
        assert_eq!(parse_line("sign-in "), Err("usage: sign-in <user>".into()));
        let err = parse_line("cook pasta").unwrap_err();
        assert!(err.contains("unknown command \"cook\""), "got {err}");
    }

    async fn wait_for_flow(shell: &Shell, flow: Flow) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while shell.ctx.current_flow() != flow {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("flow never became {flow}"));
    }

    fn text(reply: Reply) -> String {
        match reply {
            Reply::Text(t) => t,
            Reply::Quit => panic!("unexpected quit"),
        }
    }

    #[tokio::test]
    async fn onboarding_session_end_to_end() {
        let docs = Arc::new(MemoryDocumentStore::new());
        let shell = Shell::new(SessionContext::new(
            Arc::new(MemoryKeyValueStore::new()),
            docs.clone(),
        ));
        let cancel = CancellationToken::new();
        let engine = tokio::spawn(shell.engine().run(cancel.clone()));

        shell.execute(ShellCommand::SignIn("u1".into())).await.unwrap();
        wait_for_flow(&shell, Flow::Onboarding(OnboardingEntry::Welcome)).await;

        let err = shell.execute(ShellCommand::Confirm(vec![])).await.unwrap_err();
        assert!(err.to_string().contains("choose an archetype first"));

        let chosen = text(shell.execute(ShellCommand::Choose("Baker".into())).await.unwrap());
        assert!(chosen.starts_with("The Baker:"));

        let saved = text(shell.execute(ShellCommand::Confirm(vec![])).await.unwrap());
        assert!(saved.contains("yeast"));
        shell
            .execute(ShellCommand::Finish(vec!["flour".into(), "cumin".into()]))
            .await
            .unwrap();
        assert_eq!(shell.ctx.current_flow(), Flow::Main);
        assert_eq!(docs.profile("u1").unwrap().onboarding_completed, Some(true));

        let status = text(shell.execute(ShellCommand::Status).await.unwrap());
        assert!(status.contains("Screen:     Home"));
        assert!(status.contains("Pantry:     2 items"));

        shell.execute(ShellCommand::SignOut).await.unwrap();
        wait_for_flow(&shell, Flow::Auth).await;

        assert_eq!(shell.execute(ShellCommand::Quit).await.unwrap(), Reply::Quit);
        cancel.cancel();
        engine.await.unwrap();
    }

    #[tokio::test]
    async fn pantry_errors_carry_user_message() {
        let shell = Shell::new(SessionContext::new(
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(MemoryDocumentStore::new()),
        ));
        let err = shell
            .execute(ShellCommand::Add("salt".into()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User ID missing");
    }
}
