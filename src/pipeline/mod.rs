// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The threaded producer/consumer pipelines that stream measurement-set rows
//! through the gridder. Inversion fans rows out to per-layer gridding lanes;
//! prediction runs bounded calc workers into a single writer thread.

pub(crate) mod inversion;
pub(crate) mod prediction;

#[cfg(test)]
mod tests;

use num_complex::Complex;

use crate::bands::BandData;

/// One accepted row on its way to the fan-out stage. The channel buffer is
/// owned and travels with the item; the fan-out stage releases it.
pub(crate) struct InversionWorkItem {
    pub(crate) u: f64,
    pub(crate) v: f64,
    pub(crate) w: f64,
    pub(crate) data_desc_id: usize,
    pub(crate) data: Vec<Complex<f32>>,
}

/// A single-channel sample in wavelength units, headed for one gridding
/// lane.
#[derive(Clone, Copy)]
pub(crate) struct InversionWorkSample {
    pub(crate) sample: Complex<f32>,
    pub(crate) u_lambda: f64,
    pub(crate) v_lambda: f64,
    pub(crate) w_lambda: f64,
}

/// One pre-scanned row of a prediction run. The output buffer is allocated
/// by the emitter, filled by a calc worker and released by the writer.
pub(crate) struct PredictionWorkItem {
    pub(crate) u: f64,
    pub(crate) v: f64,
    pub(crate) w: f64,
    pub(crate) data_desc_id: usize,
    pub(crate) row_id: u64,
    pub(crate) data: Vec<Complex<f32>>,
}

/// Rotate visibilities by `shift_factor / lambda` radians per channel. Used
/// to move PSF weights to a shifted (denormal) phase centre, whose data
/// visibilities already carry the (u, v) part of the rotation.
pub(crate) fn rotate_visibilities(band: &BandData, shift_factor: f64, data: &mut [Complex<f32>]) {
    for (ch, vis) in data.iter_mut().enumerate() {
        let w_shift = shift_factor / band.channel_wavelength(ch);
        let (rot_sin, rot_cos) = w_shift.sin_cos();
        let v = *vis;
        *vis = Complex::new(
            v.re * rot_cos as f32 - v.im * rot_sin as f32,
            v.re * rot_sin as f32 + v.im * rot_cos as f32,
        );
    }
}
