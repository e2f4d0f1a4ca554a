//! In-memory slice of an archive: newly decoded time steps awaiting a write.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use grid_decoder::CoordinateAxes;

use crate::error::{ArchiveError, Result};

/// Time steps sharing one set of axes and one set of variables.
///
/// Each variable is a row-major `[time, latitude, longitude]` buffer.
#[derive(Debug, Clone)]
pub struct ArchiveDataset {
    pub times: Vec<NaiveDate>,
    pub axes: CoordinateAxes,
    pub variables: BTreeMap<String, Vec<f32>>,
}

impl ArchiveDataset {
    /// An empty dataset over `axes` holding the named variables.
    pub fn new(axes: CoordinateAxes, variables: impl IntoIterator<Item = String>) -> Self {
        Self {
            times: Vec::new(),
            axes,
            variables: variables.into_iter().map(|v| (v, Vec::new())).collect(),
        }
    }

    /// Cells in one time step.
    pub fn slice_len(&self) -> usize {
        self.axes.rows() * self.axes.cols()
    }

    pub fn time_steps(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    /// Append one time step; `grids` must hold exactly this dataset's variables.
    pub fn push_time_step(
        &mut self,
        date: NaiveDate,
        grids: &BTreeMap<String, Vec<f32>>,
    ) -> Result<()> {
        if let Some(last) = self.times.last() {
            if date <= *last {
                return Err(ArchiveError::invalid(format!(
                    "time step {date} does not follow {last}"
                )));
            }
        }
        if grids.len() != self.variables.len()
            || grids.keys().any(|k| !self.variables.contains_key(k))
        {
            return Err(ArchiveError::invalid(format!(
                "time step {date} has variables {:?}, expected {:?}",
                grids.keys().collect::<Vec<_>>(),
                self.variables.keys().collect::<Vec<_>>()
            )));
        }
        let slice_len = self.slice_len();
        if let Some((name, data)) = grids.iter().find(|(_, d)| d.len() != slice_len) {
            return Err(ArchiveError::invalid(format!(
                "{name} on {date} has {} cells, expected {slice_len}",
                data.len()
            )));
        }

        for (name, data) in grids {
            if let Some(buffer) = self.variables.get_mut(name) {
                buffer.extend_from_slice(data);
            }
        }
        self.times.push(date);
        Ok(())
    }

    /// One time step of one variable.
    pub fn slice(&self, variable: &str, index: usize) -> Option<&[f32]> {
        let len = self.slice_len();
        let data = self.variables.get(variable)?;
        data.get(index * len..(index + 1) * len)
    }

    /// Check that times strictly increase and every buffer is `t * lat * lon` long.
    pub fn validate(&self) -> Result<()> {
        if let Some(pair) = self.times.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ArchiveError::invalid(format!(
                "times not strictly increasing at {} -> {}",
                pair[0], pair[1]
            )));
        }
        let expected = self.times.len() * self.slice_len();
        for (name, data) in &self.variables {
            if data.len() != expected {
                return Err(ArchiveError::invalid(format!(
                    "{name} holds {} values, expected {expected}",
                    data.len()
                )));
            }
        }
        Ok(())
    }
}
