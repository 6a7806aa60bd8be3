use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::{debug, warn};
use ndarray::{Array2, Axis};

use crate::data_structs::array_design::ArrayDesign;
use crate::errors::{MethylNormError, Result};

/// Per-sample output of the vendor file reader: probe address ids plus the
/// mean intensity of both channels, in file order.
#[derive(Debug, Clone)]
pub struct SampleIntensities {
    pub sample_id: String,
    pub probe_ids: Vec<u32>,
    pub grn:       Vec<f64>,
    pub red:       Vec<f64>,
}

/// Raw two-channel intensities for a batch of samples sharing one array
/// design.
///
/// Matrices are `[samples, probes]`; sample order follows the input order so
/// caller-side identifiers stay aligned, and both channels share one probe
/// ordering. Construction enforces the batch invariants: a single supported
/// design across all samples, and a common probe id set.
#[derive(Debug, Clone)]
pub struct RawIntensities {
    pub sample_ids: Vec<String>,
    pub design:     ArrayDesign,
    pub probe_ids:  Vec<u32>,
    pub grn:        Array2<f64>,
    pub red:        Array2<f64>,
}

impl RawIntensities {
    /// Assembles a batch from per-sample reader output.
    ///
    /// Samples with differing probe id orderings are reduced to the sorted
    /// intersection of their id sets; a mix of array designs or a design
    /// outside the supported set is a hard error.
    pub fn from_samples(samples: Vec<SampleIntensities>) -> Result<Self> {
        if samples.is_empty() {
            return Err(MethylNormError::InvalidInput(
                "cannot build a batch from zero samples".to_string(),
            ));
        }
        for sample in &samples {
            if sample.grn.len() != sample.probe_ids.len()
                || sample.red.len() != sample.probe_ids.len()
            {
                return Err(MethylNormError::InvalidInput(format!(
                    "sample '{}' has inconsistent channel lengths ({} ids, {} grn, {} red)",
                    sample.sample_id,
                    sample.probe_ids.len(),
                    sample.grn.len(),
                    sample.red.len()
                )));
            }
        }

        let designs = samples
            .iter()
            .map(|s| ArrayDesign::from_probe_count(s.probe_ids.len()))
            .unique()
            .collect_vec();
        if designs.len() != 1 {
            return Err(MethylNormError::MixedDesigns(designs));
        }
        let design = designs[0];
        if !design.is_supported() {
            return Err(MethylNormError::UnsupportedDesign(design));
        }

        let sample_ids = samples
            .iter()
            .map(|s| s.sample_id.clone())
            .collect_vec();

        let identical_ids = samples[1..]
            .iter()
            .all(|s| s.probe_ids == samples[0].probe_ids);

        let (probe_ids, grn, red) = if identical_ids {
            let probe_ids = samples[0].probe_ids.clone();
            let grn = stack_rows(samples.iter().map(|s| s.grn.clone()), probe_ids.len())?;
            let red = stack_rows(samples.iter().map(|s| s.red.clone()), probe_ids.len())?;
            (probe_ids, grn, red)
        }
        else {
            let common = intersect_ids(&samples);
            if common.is_empty() {
                return Err(MethylNormError::InvalidInput(
                    "samples share no common probe ids".to_string(),
                ));
            }
            warn!(
                "probe id orderings differ across samples, reducing batch to {} shared probes",
                common.len()
            );
            let grn = stack_rows(
                samples.iter().map(|s| subset_by_ids(s, &s.grn, &common)),
                common.len(),
            )?;
            let red = stack_rows(
                samples.iter().map(|s| subset_by_ids(s, &s.red, &common)),
                common.len(),
            )?;
            (common, grn, red)
        };

        debug!(
            "raw batch assembled: {} samples x {} probes, design {}",
            sample_ids.len(),
            probe_ids.len(),
            design
        );
        Ok(Self {
            sample_ids,
            design,
            probe_ids,
            grn,
            red,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn n_probes(&self) -> usize {
        self.probe_ids.len()
    }

    /// Restricts the batch to the given probe positions, preserving their
    /// order in `indices`.
    pub fn keep_indices(
        mut self,
        indices: &[usize],
    ) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_probes()) {
            return Err(MethylNormError::InvalidInput(format!(
                "probe index {} out of bounds for {} probes",
                bad,
                self.n_probes()
            )));
        }
        self.probe_ids = indices
            .iter()
            .map(|&i| self.probe_ids[i])
            .collect();
        self.grn = self.grn.select(Axis(1), indices);
        self.red = self.red.select(Axis(1), indices);
        Ok(self)
    }
}

fn stack_rows(
    rows: impl Iterator<Item = Vec<f64>>,
    n_probes: usize,
) -> Result<Array2<f64>> {
    let mut flat = Vec::new();
    let mut n_rows = 0;
    for row in rows {
        flat.extend(row);
        n_rows += 1;
    }
    Array2::from_shape_vec((n_rows, n_probes), flat)
        .map_err(|e| MethylNormError::InvalidInput(e.to_string()))
}

/// Sorted intersection of every sample's probe id set.
fn intersect_ids(samples: &[SampleIntensities]) -> Vec<u32> {
    let mut common: Vec<u32> = samples[0]
        .probe_ids
        .iter()
        .copied()
        .sorted()
        .dedup()
        .collect();
    for sample in &samples[1..] {
        let ids: HashSet<u32> = sample.probe_ids.iter().copied().collect();
        common.retain(|id| ids.contains(id));
    }
    common
}

fn subset_by_ids(
    sample: &SampleIntensities,
    values: &[f64],
    ids: &[u32],
) -> Vec<f64> {
    let positions: HashMap<u32, usize> = sample
        .probe_ids
        .iter()
        .enumerate()
        .map(|(pos, &id)| (id, pos))
        .collect();
    ids.iter()
        .map(|id| values[positions[id]])
        .collect()
}
