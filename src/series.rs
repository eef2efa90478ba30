//! Time-stamped vector histories, as sampled by probes and retained by units.
use serde::{Deserialize, Serialize};

use crate::error::NeuroError;

/// Units in which output values are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    /// Spike events (dimensionless).
    Spikes,
    /// Firing rate in spikes per second.
    SpikesPerSecond,
    /// Arbitrary voltage units.
    Avu,
    /// Unspecified units.
    Unknown,
}

/// A time series of real-valued vectors.
/// Times are strictly increasing; every value row has the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    times: Vec<f64>,
    values: Vec<Vec<f64>>,
    units: Units,
}

impl TimeSeries {
    /// Create an empty time series.
    pub fn empty(units: Units) -> Self {
        TimeSeries {
            times: vec![],
            values: vec![],
            units,
        }
    }

    /// Create a time series from parallel time and value collections.
    /// The function returns an error if the lengths differ or the value rows are ragged.
    pub fn build(times: Vec<f64>, values: Vec<Vec<f64>>, units: Units) -> Result<Self, NeuroError> {
        if times.len() != values.len() {
            return Err(NeuroError::InvalidArgument(format!(
                "{} times given for {} value rows",
                times.len(),
                values.len()
            )));
        }
        if let Some(first) = values.first() {
            if values.iter().any(|row| row.len() != first.len()) {
                return Err(NeuroError::InvalidArgument(
                    "All value rows of a time series must have the same length".to_string(),
                ));
            }
        }
        Ok(TimeSeries {
            times,
            values,
            units,
        })
    }

    /// Create a one-dimensional time series from parallel scalars.
    pub fn build_1d(times: Vec<f64>, values: Vec<f64>, units: Units) -> Result<Self, NeuroError> {
        let values = values.into_iter().map(|v| vec![v]).collect();
        TimeSeries::build(times, values, units)
    }

    /// Append a sample. Returns an error on a non-increasing time or a
    /// dimension mismatch with the existing rows.
    pub fn append(&mut self, time: f64, value: Vec<f64>) -> Result<(), NeuroError> {
        if let Some(&last) = self.times.last() {
            if time <= last {
                return Err(NeuroError::InvalidArgument(format!(
                    "Sample time {} is not after the last sample time {}",
                    time, last
                )));
            }
        }
        if let Some(first) = self.values.first() {
            if value.len() != first.len() {
                return Err(NeuroError::InvalidArgument(format!(
                    "Sample of dimension {} appended to a series of dimension {}",
                    value.len(),
                    first.len()
                )));
            }
        }
        self.times.push(time);
        self.values.push(value);
        Ok(())
    }

    /// Append every sample of another series that is strictly after this
    /// series' last time.
    pub fn extend_from(&mut self, other: &TimeSeries) -> Result<(), NeuroError> {
        for (t, v) in other.times.iter().zip(other.values.iter()) {
            match self.times.last() {
                Some(&last) if *t <= last => continue,
                _ => self.append(*t, v.clone())?,
            }
        }
        Ok(())
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Returns true if the series holds no samples.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Returns the dimension of the value rows, or 0 if the series is empty.
    pub fn dimension(&self) -> usize {
        self.values.first().map_or(0, |row| row.len())
    }

    /// Returns the sample times.
    pub fn times(&self) -> &[f64] {
        &self.times[..]
    }

    /// Returns the value rows.
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values[..]
    }

    /// Returns the units of the values.
    pub fn units(&self) -> Units {
        self.units
    }

    /// Returns the last time-value pair, if any.
    pub fn last(&self) -> Option<(f64, &[f64])> {
        match (self.times.last(), self.values.last()) {
            (Some(&t), Some(v)) => Some((t, &v[..])),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_mismatched_lengths() {
        assert_eq!(
            TimeSeries::build(vec![0.0, 1.0], vec![vec![1.0]], Units::Unknown),
            Err(NeuroError::InvalidArgument(
                "2 times given for 1 value rows".to_string()
            ))
        );
    }

    #[test]
    fn test_build_ragged_rows() {
        assert!(TimeSeries::build(
            vec![0.0, 1.0],
            vec![vec![1.0], vec![1.0, 2.0]],
            Units::Unknown
        )
        .is_err());
    }

    #[test]
    fn test_append() {
        let mut series = TimeSeries::empty(Units::Avu);
        series.append(0.0, vec![1.0, 2.0]).unwrap();
        series.append(1.0, vec![3.0, 4.0]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.dimension(), 2);
        assert_eq!(series.last(), Some((1.0, &[3.0, 4.0][..])));
        assert!(series.append(0.5, vec![0.0, 0.0]).is_err());
        assert!(series.append(2.0, vec![0.0]).is_err());
    }

    #[test]
    fn test_extend_from_skips_stale_samples() {
        let mut series = TimeSeries::build_1d(vec![0.0, 1.0], vec![0.1, 0.2], Units::Avu).unwrap();
        let other = TimeSeries::build_1d(vec![0.5, 1.5, 2.0], vec![0.0, 0.3, 0.4], Units::Avu).unwrap();
        series.extend_from(&other).unwrap();
        assert_eq!(series.times(), &[0.0, 1.0, 1.5, 2.0]);
    }
}
