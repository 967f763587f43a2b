//! Request-lifecycle verification engine: projects the role-visible view of
//! provider responses, tracks the status-machine invariants of every observed
//! request, and orchestrates scenario expectations over the correlation
//! broker.

pub mod error;
pub mod lifecycle;
pub mod projector;
pub mod scenario;
pub mod settings;

pub use error::{Error, Result};
pub use lifecycle::{LifecycleTracker, Progress};
pub use projector::{ProjectionContext, project};
pub use scenario::{ExpectedStatus, ScenarioVerifier};
pub use settings::Settings;
