//! Environment construction by encoding name

use tracing::warn;

use crate::adapter::AgarioEnv;
use crate::config::{EnvOptions, ObservationKind};
use crate::error::Result;
use crate::native::EngineBackend;

/// Create an environment from an encoding name ("ram", "grid" or "screen")
///
/// Unknown names fail with `UnsupportedObservationType` before any engine
/// is constructed.
pub fn make_env(
    observation: &str,
    options: &EnvOptions,
    backend: &dyn EngineBackend,
) -> Result<AgarioEnv> {
    let kind: ObservationKind = observation.parse().inspect_err(|_| {
        warn!(observation, "Unknown observation encoding requested");
    })?;
    AgarioEnv::new(kind, options, backend)
}

/// Encodings the backend can construct
pub fn available_encodings(backend: &dyn EngineBackend) -> Vec<ObservationKind> {
    let mut kinds = vec![ObservationKind::Ram, ObservationKind::Grid];
    if backend.supports_screen() {
        kinds.push(ObservationKind::Screen);
    }
    kinds
}
