//! The session engine: subscribes to identity and lifecycle changes and
//! drives the session components from them.
//!
//! The main loop:
//! 1. Subscribe to the identity provider and the lifecycle source, and load
//!    the onboarding step saved on the device.
//! 2. On a new identity, start a session epoch and spawn its hydration.
//! 3. On sign-out, abort in-flight hydrations and clear the session.
//! 4. Feed lifecycle transitions to the tracker.
//! 5. On cancellation, or once both subscriptions have ended, release the
//!    subscriptions and abort outstanding work.

mod context;

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::hydrate::HydrationOutcome;
use crate::session::IdentityStatus;
use crate::store::{Identity, IdentityProvider, LifecycleSource};

pub use context::SessionContext;

/// Why [`SessionEngine::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineExit {
    Cancelled,
    /// Both event sources ended and no hydration was outstanding.
    SourcesClosed,
}

pub struct SessionEngine {
    ctx: SessionContext,
    identity: Arc<dyn IdentityProvider>,
    lifecycle: Arc<dyn LifecycleSource>,
}

impl SessionEngine {
    pub fn new(
        ctx: SessionContext,
        identity: Arc<dyn IdentityProvider>,
        lifecycle: Arc<dyn LifecycleSource>,
    ) -> Self {
        Self {
            ctx,
            identity,
            lifecycle,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Run until `cancel` fires or both event sources end.
    pub async fn run(self, cancel: CancellationToken) -> EngineExit {
        let mut identities = self.identity.subscribe();
        let mut lifecycle = self.lifecycle.subscribe();
        let mut hydrations: JoinSet<()> = JoinSet::new();
        let mut identity_open = true;
        let mut lifecycle_open = true;

        tracing::info!("session engine started");

        // The device-local step applies until the first hydration replaces it.
        if let Err(e) = self.ctx.onboarding.hydrate().await {
            tracing::warn!(error = %e, "failed to load saved onboarding step");
        }

        let exit = loop {
            if !identity_open && !lifecycle_open && hydrations.is_empty() {
                break EngineExit::SourcesClosed;
            }

            tokio::select! {
                _ = cancel.cancelled() => break EngineExit::Cancelled,

                next = identities.next(), if identity_open => match next {
                    Some(identity) => self.on_identity(identity, &mut hydrations).await,
                    None => {
                        tracing::debug!("identity source ended");
                        identity_open = false;
                    }
                },

                next = lifecycle.next(), if lifecycle_open => match next {
                    Some(transition) => {
                        tracing::debug!(%transition, "lifecycle transition");
                        self.ctx.on_lifecycle(transition).await;
                    }
                    None => {
                        tracing::debug!("lifecycle source ended");
                        lifecycle_open = false;
                    }
                },

                Some(joined) = hydrations.join_next(), if !hydrations.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(error = %e, "hydration task panicked");
                        }
                    }
                }
            }
        };

        hydrations.abort_all();
        drop(identities);
        drop(lifecycle);
        tracing::info!(reason = ?exit, "session engine stopped, subscriptions released");
        exit
    }

    async fn on_identity(&self, identity: Option<Identity>, hydrations: &mut JoinSet<()>) {
        let state = &self.ctx.state;
        let Some(identity) = identity else {
            if state.identity() != IdentityStatus::Absent {
                hydrations.abort_all();
                self.ctx.sign_out().await;
            }
            return;
        };

        match state.user_id() {
            Some(current) if current == identity.user_id => return,
            Some(_) => {
                hydrations.abort_all();
                self.ctx.sign_out().await;
            }
            None => {}
        }

        let epoch = self.ctx.begin_session(&identity.user_id);
        let ctx = self.ctx.clone();
        hydrations.spawn(async move {
            let user_id = identity.user_id;
            match ctx.hydrator.hydrate(&user_id, epoch).await {
                Ok(HydrationOutcome::Applied { .. }) | Ok(HydrationOutcome::Discarded) => {}
                Err(e) => tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    user_message = e.user_message(),
                    "hydration failed"
                ),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::{Flow, OnboardingEntry};
    use crate::store::{
        AppLifecycle, MemoryDocumentStore, MemoryKeyValueStore, StaticIdentityProvider,
        Subscription,
    };

    /// Emits a fixed list of transitions, then ends.
    struct ScriptedLifecycle(Vec<AppLifecycle>);

    impl LifecycleSource for ScriptedLifecycle {
        fn subscribe(&self) -> Subscription<AppLifecycle> {
            Subscription::new("lifecycle", futures::stream::iter(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn ends_when_sources_close() {
        let ctx = SessionContext::new(
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(MemoryDocumentStore::new()),
        );
        let engine = SessionEngine::new(
            ctx.clone(),
            Arc::new(StaticIdentityProvider::new(Some(Identity::new("u1")))),
            Arc::new(ScriptedLifecycle(vec![
                AppLifecycle::Background,
                AppLifecycle::Active,
            ])),
        );

        let exit = engine.run(CancellationToken::new()).await;
        assert_eq!(exit, EngineExit::SourcesClosed);
        assert_eq!(ctx.state.user_id().as_deref(), Some("u1"));
        // The hydration finished before the engine returned.
        assert_eq!(
            ctx.current_flow(),
            Flow::Onboarding(OnboardingEntry::Welcome)
        );
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        let ctx = SessionContext::new(
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(MemoryDocumentStore::new()),
        );
        let identity = Arc::new(crate::store::ManualIdentityProvider::new());
        let engine = SessionEngine::new(
            ctx,
            identity.clone(),
            Arc::new(crate::store::ManualLifecycleSource::new()),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(engine.run(cancel).await, EngineExit::Cancelled);
        assert_eq!(identity.subscriber_count(), 0);
    }
}
