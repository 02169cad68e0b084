//! Perception backend factory.

use super::PerceptionSet;
use crate::{Error, Result};

/// Builds the default perception set from compiled-in backends.
///
/// Model runtimes are heavyweight native integrations and ship behind
/// cargo features; the `onnx-backend` feature is currently a stub awaiting
/// the runtime crate. Library users (and the test suites) inject trait
/// implementations directly through [`PerceptionSet::new`].
///
/// # Errors
///
/// Returns [`Error::FeatureNotEnabled`] until a backend feature is
/// compiled in.
pub fn build_default() -> Result<PerceptionSet> {
    Err(Error::FeatureNotEnabled("onnx-backend".to_string()))
}
