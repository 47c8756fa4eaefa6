//! Session state engine for the Desire pantry assistant.
//!
//! The engine decides which flow the app presents (sign-in, onboarding,
//! main), keeps a local mirror of the user's pantry in step with the remote
//! document store, and tracks the engagement signals behind the home prompt.
//!
//! # Architecture
//!
//! ```text
//! IdentityProvider --subscribe--> SessionEngine <--subscribe-- LifecycleSource
//!                                     |
//!                               SessionContext
//!        +-----------+-------------+-------------+--------------+
//!        |           |             |             |              |
//!  ProfileHydrator  Onboarding   Pantry       Session       navigation /
//!        |        StateMachine  Synchronizer  Tracker       home prompt
//!        |           |             |             |
//!        +-----------+------> SessionState <-----+
//!                    |             |
//!              KeyValueStore  DocumentStore
//! ```

pub mod engine;
pub mod error;
pub mod home;
pub mod hydrate;
pub mod navigation;
pub mod onboarding;
pub mod pantry;
pub mod presets;
pub mod session;
pub mod store;
pub mod tracker;

pub use desire_db::models::{OnboardingStep, ProfileDocument};
pub use engine::{EngineExit, SessionContext, SessionEngine};
pub use error::{RemoteOp, SessionError};
pub use navigation::{Flow, OnboardingEntry, select_flow};
pub use session::{IdentityStatus, SessionSnapshot, SessionState, UserSession};
