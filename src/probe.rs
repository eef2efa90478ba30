//! Probeable targets and the probes that record their named state.
use serde::{Deserialize, Serialize};

use crate::error::NeuroError;
use crate::series::{TimeSeries, Units};

/// A unit whose named internal state can be read out after each run.
pub trait Probeable {
    /// The history of the named state over the last run interval.
    /// Returns a simulation error if the state name is unknown.
    fn history(&self, state: &str) -> Result<TimeSeries, NeuroError>;

    /// The state names the unit exposes, with a short description of each.
    fn list_states(&self) -> Vec<(String, String)>;
}

/// How a probe addresses its target within the simulator's network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProbeAddress {
    /// A top-level node, by name.
    Node { node: String },
    /// A constituent of an ensemble, by index.
    Constituent { ensemble: String, index: usize },
    /// A named target, either top-level (no ensemble) or a constituent of the
    /// named ensemble.
    Target {
        ensemble: Option<String>,
        node: String,
    },
}

/// A read-only observer bound to a named state of a probeable target.
/// Retains the full sampled history only when `record` is set; otherwise it
/// keeps the samples of the most recent step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probe {
    id: usize,
    address: ProbeAddress,
    state: String,
    record: bool,
    data: TimeSeries,
}

impl Probe {
    pub(crate) fn new(id: usize, address: ProbeAddress, state: &str, record: bool) -> Self {
        Probe {
            id,
            address,
            state: state.to_string(),
            record,
            data: TimeSeries::empty(Units::Unknown),
        }
    }

    /// Returns the identifier the simulator assigned to this probe.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the address of the probed target.
    pub fn address(&self) -> &ProbeAddress {
        &self.address
    }

    /// Returns the probed state name.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Returns true if the probe retains its full history.
    pub fn records(&self) -> bool {
        self.record
    }

    /// Returns the collected samples.
    pub fn data(&self) -> &TimeSeries {
        &self.data
    }

    /// Fold the samples of one step into the probe. A non-recording probe
    /// retains only the latest sample.
    pub(crate) fn collect(&mut self, series: &TimeSeries) -> Result<(), NeuroError> {
        if self.record {
            self.data.extend_from(series)
        } else {
            self.data = TimeSeries::empty(series.units());
            if let Some((time, value)) = series.last() {
                self.data.append(time, value.to_vec())?;
            }
            Ok(())
        }
    }

    /// Discard all collected samples.
    pub fn clear(&mut self) {
        self.data = TimeSeries::empty(self.data.units());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_with_record() {
        let mut probe = Probe::new(
            0,
            ProbeAddress::Node {
                node: "input".to_string(),
            },
            "input",
            true,
        );
        let first = TimeSeries::build_1d(vec![0.0, 0.001], vec![1.0, 2.0], Units::Avu).unwrap();
        let second = TimeSeries::build_1d(vec![0.002], vec![3.0], Units::Avu).unwrap();
        probe.collect(&first).unwrap();
        probe.collect(&second).unwrap();
        assert_eq!(probe.data().times(), &[0.0, 0.001, 0.002]);
    }

    #[test]
    fn test_collect_without_record_keeps_latest() {
        let mut probe = Probe::new(
            0,
            ProbeAddress::Node {
                node: "input".to_string(),
            },
            "input",
            false,
        );
        let first = TimeSeries::build_1d(vec![0.0], vec![1.0], Units::Avu).unwrap();
        // A multi-sample step, e.g., several sub-steps of a voltage trace.
        let second =
            TimeSeries::build_1d(vec![0.001, 0.0015, 0.002], vec![2.0, 2.5, 3.0], Units::Avu)
                .unwrap();
        probe.collect(&first).unwrap();
        probe.collect(&second).unwrap();
        assert_eq!(probe.data().times(), &[0.002]);
        assert_eq!(probe.data().values(), &[vec![3.0]]);
    }
}
