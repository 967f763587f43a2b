//! Correlation broker matching an unordered, multi-source stream of callback
//! events to scenario-scoped expectations, each resolved at most once.

pub mod correlator;
pub mod error;
pub mod expectation;
pub mod key;

pub use correlator::{Correlator, CorrelatorStats, EventSink};
pub use error::{Error, Result};
pub use expectation::{ExpectationHandle, ExpectationId};
pub use key::CorrelationKey;
