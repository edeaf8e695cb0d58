// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An in-memory [`MsProvider`]. The crate's own tests run against it, and it
//! doubles as the reference implementation of the provider contract.

use std::ops::Range;

use hifitime::Epoch;
use num_complex::Complex;
use vec1::Vec1;

use super::{MsProvider, ObservationMeta, PhaseCentre, RowMeta};
use crate::bands::MultiBandData;

/// One main-table row held in memory.
#[derive(Debug, Clone)]
pub struct MsRow {
    /// Baseline coordinates \[m\].
    pub u: f64,
    pub v: f64,
    pub w: f64,
    pub data_desc_id: usize,
    /// Full-band visibilities, one per channel.
    pub data: Vec<Complex<f32>>,
    /// Full-band model visibilities.
    pub model: Vec<Complex<f32>>,
    /// Full-band raw weights.
    pub weights: Vec<f32>,
}

pub struct MemoryMsProvider {
    meta: ObservationMeta,
    bands: MultiBandData,
    rows: Vec<MsRow>,
    /// The channel window served to the imager; must agree with the
    /// [`super::Selection`] the caller passes alongside this provider.
    channel_range: Option<Range<usize>>,
    cursor: usize,
    writable: bool,
}

impl MemoryMsProvider {
    pub fn new(meta: ObservationMeta, bands: MultiBandData, rows: Vec<MsRow>) -> MemoryMsProvider {
        for row in &rows {
            let n = bands.band(row.data_desc_id).channel_count();
            assert_eq!(row.data.len(), n, "row data length != band channel count");
            assert_eq!(row.model.len(), n);
            assert_eq!(row.weights.len(), n);
        }
        MemoryMsProvider {
            meta,
            bands,
            rows,
            channel_range: None,
            cursor: 0,
            writable: false,
        }
    }

    /// Serve only the given channel window from every row.
    pub fn with_channel_range(mut self, range: Range<usize>) -> MemoryMsProvider {
        self.channel_range = Some(range);
        self
    }

    /// A metadata block good enough for a phase-centred observation.
    pub fn simple_meta(antenna_count: usize) -> ObservationMeta {
        ObservationMeta {
            antenna_count,
            phase_centres: Vec1::new(PhaseCentre { ra: 0.0, dec: 0.5 }),
            phase_centre_dl: 0.0,
            phase_centre_dm: 0.0,
            start_time: Epoch::from_gpst_seconds(1_090_008_640.0),
        }
    }

    /// The rows, e.g. for inspecting written model data after a prediction.
    pub fn rows(&self) -> &[MsRow] {
        &self.rows
    }

    fn selected(&self, full_len: usize) -> Range<usize> {
        match &self.channel_range {
            Some(r) => r.clone(),
            None => 0..full_len,
        }
    }
}

impl MsProvider for MemoryMsProvider {
    fn observation_meta(&self) -> &ObservationMeta {
        &self.meta
    }

    fn multi_band_data(&self) -> MultiBandData {
        self.bands.clone()
    }

    fn row_count(&self) -> u64 {
        self.rows.len() as u64
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn current_row_available(&self) -> bool {
        self.cursor < self.rows.len()
    }

    fn next_row(&mut self) {
        self.cursor += 1;
    }

    fn read_meta(&mut self) -> RowMeta {
        let row = &self.rows[self.cursor];
        RowMeta {
            u: row.u,
            v: row.v,
            w: row.w,
            data_desc_id: row.data_desc_id,
        }
    }

    fn read_data(&mut self, buf: &mut [Complex<f32>]) {
        let row = &self.rows[self.cursor];
        let sel = self.selected(row.data.len());
        buf.copy_from_slice(&row.data[sel]);
    }

    fn read_model(&mut self, buf: &mut [Complex<f32>]) {
        let row = &self.rows[self.cursor];
        let sel = self.selected(row.model.len());
        buf.copy_from_slice(&row.model[sel]);
    }

    fn read_weights(&mut self, buf: &mut [f32]) {
        let row = &self.rows[self.cursor];
        let sel = self.selected(row.weights.len());
        buf.copy_from_slice(&row.weights[sel]);
    }

    fn row_id(&self) -> u64 {
        self.cursor as u64
    }

    fn reopen_rw(&mut self) {
        self.writable = true;
    }

    fn write_model(&mut self, row_id: u64, buf: &[Complex<f32>]) {
        assert!(self.writable, "write_model before reopen_rw");
        let row = &mut self.rows[row_id as usize];
        let sel = match &self.channel_range {
            Some(r) => r.clone(),
            None => 0..row.model.len(),
        };
        row.model[sel].copy_from_slice(buf);
    }
}
