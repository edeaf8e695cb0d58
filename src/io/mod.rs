// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contracts for the imager's external collaborators: row-by-row
//! measurement-set access and precomputed imaging weights.

mod mem;
#[cfg(test)]
mod tests;

pub use mem::{MemoryMsProvider, MsRow};

use std::ops::Range;

use hifitime::Epoch;
use num_complex::Complex;
use vec1::Vec1;

use crate::bands::MultiBandData;

/// The (u, v, w) coordinates \[m\] and data description of one main-table
/// row.
#[derive(Debug, Clone, Copy)]
pub struct RowMeta {
    pub u: f64,
    pub v: f64,
    pub w: f64,
    pub data_desc_id: usize,
}

/// A J2000 phase direction \[radians\].
#[derive(Debug, Clone, Copy)]
pub struct PhaseCentre {
    pub ra: f64,
    pub dec: f64,
}

/// Metadata of one measurement set that the imager needs up front.
#[derive(Debug, Clone)]
pub struct ObservationMeta {
    pub antenna_count: usize,
    /// Phase directions by field id.
    pub phase_centres: Vec1<PhaseCentre>,
    /// Offset of the image centre from the phase direction, in direction
    /// cosines. These are the WSCLEAN_DL / WSCLEAN_DM field-table keywords;
    /// 0 when the centre is not shifted.
    pub phase_centre_dl: f64,
    pub phase_centre_dm: f64,
    /// The epoch of the first main-table row.
    pub start_time: Epoch,
}

/// Row-by-row access to one measurement set, already restricted to the
/// channel window of its [`Selection`]: `read_data`, `read_model` and
/// `read_weights` fill exactly the selected channels of the current row.
/// Rows are iterated in storage order and the provider is not assumed to be
/// thread-safe; the imager serialises all access on one thread at a time.
pub trait MsProvider: Send {
    fn observation_meta(&self) -> &ObservationMeta;

    /// The full (unselected) channel-frequency tables of this set.
    fn multi_band_data(&self) -> MultiBandData;

    fn row_count(&self) -> u64;

    /// Rewind to the first row.
    fn reset(&mut self);

    fn current_row_available(&self) -> bool;

    fn next_row(&mut self);

    fn read_meta(&mut self) -> RowMeta;

    fn read_data(&mut self, buf: &mut [Complex<f32>]);

    fn read_model(&mut self, buf: &mut [Complex<f32>]);

    fn read_weights(&mut self, buf: &mut [f32]);

    /// A stable identifier for the current row, usable with `write_model`
    /// after iteration has moved on.
    fn row_id(&self) -> u64;

    /// Make `write_model` possible. Called once before a prediction run.
    fn reopen_rw(&mut self);

    fn write_model(&mut self, row_id: u64, buf: &[Complex<f32>]);

    fn start_time(&self) -> Epoch {
        self.observation_meta().start_time
    }
}

/// Which part of a measurement set an imaging run uses. Immutable per run.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// `[start, end)` channel window; the whole band when `None`.
    pub channel_range: Option<Range<usize>>,
    pub field_id: usize,
}

/// Precomputed density weights (uniform, Briggs, ...) looked up per sample.
/// The returned weight is non-negative.
pub trait ImageWeights: Sync {
    fn weight(&self, u_lambda: f64, v_lambda: f64) -> f64;
}

/// Unit density weights: every sample keeps its raw weight.
pub struct NaturalWeights;

impl ImageWeights for NaturalWeights {
    fn weight(&self, _u_lambda: f64, _v_lambda: f64) -> f64 {
        1.0
    }
}

/// How the density weighting contributes to the gridded samples and the
/// normalisation sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightMode {
    #[default]
    Natural,
    Uniform,
    Briggs,
    /// Weight samples by baseline length \[m\] instead of a density lookup.
    Distance,
}

/// How raw visibility weights have been (or still need to be) applied to the
/// visibilities themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityWeightingMode {
    /// The provider hands out pre-weighted visibilities; nothing to do.
    #[default]
    Normal,
    /// Multiply each sample by its weight.
    Squared,
    /// Divide each sample by its weight, zeroing where the weight is zero.
    Unit,
}
