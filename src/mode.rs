//! Simulation modes and the resolution of unsupported mode requests.
use serde::{Deserialize, Serialize};

/// The mode in which a simulatable unit runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationMode {
    /// Spiking simulation with per-step boolean spike output.
    Default,
    /// Closed-form firing rate, evaluated once per run call.
    ConstantRate,
    /// Firing-rate simulation.
    Rate,
    /// Spiking simulation with sub-step-interpolated spike times.
    Precise,
}

impl SimulationMode {
    /// The fallback priority of each mode: spiking modes prefer spiking
    /// fallbacks, rate modes prefer rate fallbacks.
    fn fallbacks(&self) -> [SimulationMode; 4] {
        match self {
            SimulationMode::Default => [
                SimulationMode::Default,
                SimulationMode::Precise,
                SimulationMode::Rate,
                SimulationMode::ConstantRate,
            ],
            SimulationMode::Precise => [
                SimulationMode::Precise,
                SimulationMode::Default,
                SimulationMode::Rate,
                SimulationMode::ConstantRate,
            ],
            SimulationMode::Rate => [
                SimulationMode::Rate,
                SimulationMode::ConstantRate,
                SimulationMode::Default,
                SimulationMode::Precise,
            ],
            SimulationMode::ConstantRate => [
                SimulationMode::ConstantRate,
                SimulationMode::Rate,
                SimulationMode::Default,
                SimulationMode::Precise,
            ],
        }
    }

    /// Resolve a requested mode against the modes a unit supports.
    /// The first supported mode in the request's fallback priority wins.
    /// If the supported list is empty, the request is returned unchanged.
    pub fn closest(requested: SimulationMode, supported: &[SimulationMode]) -> SimulationMode {
        if supported.is_empty() {
            return requested;
        }
        *requested
            .fallbacks()
            .iter()
            .find(|mode| supported.contains(mode))
            .unwrap_or(&requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_supported_request() {
        let supported = [SimulationMode::Default, SimulationMode::Precise];
        assert_eq!(
            SimulationMode::closest(SimulationMode::Precise, &supported),
            SimulationMode::Precise
        );
    }

    #[test]
    fn test_closest_spiking_prefers_spiking() {
        let supported = [SimulationMode::Precise, SimulationMode::ConstantRate];
        assert_eq!(
            SimulationMode::closest(SimulationMode::Default, &supported),
            SimulationMode::Precise
        );
    }

    #[test]
    fn test_closest_rate_prefers_rate() {
        let supported = [SimulationMode::Default, SimulationMode::ConstantRate];
        assert_eq!(
            SimulationMode::closest(SimulationMode::Rate, &supported),
            SimulationMode::ConstantRate
        );
    }

    #[test]
    fn test_closest_empty_supported() {
        assert_eq!(
            SimulationMode::closest(SimulationMode::Rate, &[]),
            SimulationMode::Rate
        );
    }
}
