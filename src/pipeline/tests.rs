// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::num::NonZeroUsize;

use approx::assert_abs_diff_eq;
use num_complex::Complex;

use super::inversion::{self, InversionContext};
use super::prediction;
use super::rotate_visibilities;
use crate::bands::{BandData, MultiBandData};
use crate::buffer::ImageBufferAllocator;
use crate::constants::VEL_C;
use crate::gridder::{GridderConfig, WStackingGridder};
use crate::io::{MemoryMsProvider, MsRow, NaturalWeights, VisibilityWeightingMode, WeightMode};

/// A band whose single channel has a wavelength of exactly one metre.
fn metre_band() -> MultiBandData {
    MultiBandData::from_single(BandData::new(vec![VEL_C]).unwrap())
}

fn unit_row(u: f64, v: f64, w: f64) -> MsRow {
    MsRow {
        u,
        v,
        w,
        data_desc_id: 0,
        data: vec![Complex::new(1.0, 0.0)],
        model: vec![Complex::new(0.0, 0.0)],
        weights: vec![1.0],
    }
}

fn cross_provider(w: f64) -> MemoryMsProvider {
    let rows = vec![
        unit_row(10.0, 0.0, w),
        unit_row(0.0, 10.0, w),
        unit_row(-10.0, 0.0, w),
        unit_row(0.0, -10.0, w),
    ];
    MemoryMsProvider::new(MemoryMsProvider::simple_meta(2), metre_band(), rows)
}

fn default_context(weights: &NaturalWeights) -> InversionContext {
    InversionContext {
        do_image_psf: false,
        do_subtract_model: false,
        visibility_weighting: VisibilityWeightingMode::Normal,
        weight_mode: WeightMode::Natural,
        phase_centre_dl: 0.0,
        phase_centre_dm: 0.0,
        weights,
    }
}

#[test]
fn rotation_applies_the_per_channel_shift() {
    let band = BandData::new(vec![VEL_C, VEL_C / 2.0]).unwrap();
    let mut data = vec![Complex::new(1.0f32, 0.0); 2];
    let shift = 0.25;
    rotate_visibilities(&band, shift, &mut data);
    // Channel 0 has lambda = 1 m, channel 1 lambda = 0.5 m.
    assert_abs_diff_eq!(data[0].re, 0.25f32.cos() as f32, epsilon = 1e-6);
    assert_abs_diff_eq!(data[0].im, 0.25f32.sin() as f32, epsilon = 1e-6);
    assert_abs_diff_eq!(data[1].re, 0.5f32.cos() as f32, epsilon = 1e-6);
    assert_abs_diff_eq!(data[1].im, 0.5f32.sin() as f32, epsilon = 1e-6);
}

#[test]
fn inversion_pass_grids_all_accepted_rows() {
    let mut config = GridderConfig::new(64, 64, 0.01, 0.01);
    config.thread_count = NonZeroUsize::new(2).unwrap();
    let mut gridder = WStackingGridder::new(config, ImageBufferAllocator::new()).unwrap();
    gridder.prepare_w_layers(2, u64::MAX, 0.0, 0.0).unwrap();

    let mut provider = cross_provider(0.0);
    let band = metre_band();
    let weights = NaturalWeights;
    let ctx = default_context(&weights);

    let lanes = gridder.start_inversion_pass(0);
    let (lanes, stats) = inversion::process_pass(lanes, &mut provider, &band, &ctx);
    assert_eq!(stats.rows_read, 4);
    assert_abs_diff_eq!(stats.weight_sum, 4.0, epsilon = 1e-12);
    gridder.finish_inversion_pass(lanes);
    assert_eq!(gridder.samples_gridded(), 4);

    gridder.finalize_image(1.0, true);
    let image = gridder.real_image();
    assert_abs_diff_eq!(image[32 * 64 + 32], 4.0, epsilon = 1e-6);
}

#[test]
fn psf_mode_grids_weights_as_unit_amplitudes() {
    let mut gridder = WStackingGridder::new(
        GridderConfig::new(64, 64, 0.01, 0.01),
        ImageBufferAllocator::new(),
    )
    .unwrap();
    gridder.prepare_w_layers(1, u64::MAX, 0.0, 0.0).unwrap();

    // Data that would grid to garbage; PSF mode must ignore it.
    let mut rows = vec![
        unit_row(10.0, 0.0, 0.0),
        unit_row(0.0, 10.0, 0.0),
    ];
    for row in &mut rows {
        row.data = vec![Complex::new(-7.0, 3.0)];
        row.weights = vec![2.0];
    }
    let mut provider =
        MemoryMsProvider::new(MemoryMsProvider::simple_meta(2), metre_band(), rows);
    let band = metre_band();
    let weights = NaturalWeights;
    let mut ctx = default_context(&weights);
    ctx.do_image_psf = true;

    let lanes = gridder.start_inversion_pass(0);
    let (lanes, stats) = inversion::process_pass(lanes, &mut provider, &band, &ctx);
    gridder.finish_inversion_pass(lanes);
    gridder.finalize_image(1.0, true);
    // Each weight-2 sample contributes 2 at the centre.
    assert_abs_diff_eq!(gridder.real_image()[32 * 64 + 32], 4.0, epsilon = 1e-6);
    assert_abs_diff_eq!(stats.weight_sum, 4.0, epsilon = 1e-12);
}

#[test]
fn model_subtraction_removes_the_model_column() {
    let mut gridder = WStackingGridder::new(
        GridderConfig::new(64, 64, 0.01, 0.01),
        ImageBufferAllocator::new(),
    )
    .unwrap();
    gridder.prepare_w_layers(1, u64::MAX, 0.0, 0.0).unwrap();

    let mut row = unit_row(10.0, 0.0, 0.0);
    row.model = vec![Complex::new(1.0, 0.0)];
    let mut provider =
        MemoryMsProvider::new(MemoryMsProvider::simple_meta(2), metre_band(), vec![row]);
    let band = metre_band();
    let weights = NaturalWeights;
    let mut ctx = default_context(&weights);
    ctx.do_subtract_model = true;

    let lanes = gridder.start_inversion_pass(0);
    let (lanes, _) = inversion::process_pass(lanes, &mut provider, &band, &ctx);
    gridder.finish_inversion_pass(lanes);
    gridder.finalize_image(1.0, true);
    // data - model = 0 everywhere.
    assert_abs_diff_eq!(gridder.real_image()[32 * 64 + 32], 0.0, epsilon = 1e-9);
}

#[test]
fn unit_visibility_weighting_divides_and_zeroes() {
    let mut gridder = WStackingGridder::new(
        GridderConfig::new(64, 64, 0.01, 0.01),
        ImageBufferAllocator::new(),
    )
    .unwrap();
    gridder.prepare_w_layers(1, u64::MAX, 0.0, 0.0).unwrap();

    let mut strong = unit_row(10.0, 0.0, 0.0);
    strong.data = vec![Complex::new(6.0, 0.0)];
    strong.weights = vec![3.0];
    let mut flagged = unit_row(0.0, 10.0, 0.0);
    flagged.data = vec![Complex::new(5.0, 0.0)];
    flagged.weights = vec![0.0];
    let mut provider = MemoryMsProvider::new(
        MemoryMsProvider::simple_meta(2),
        metre_band(),
        vec![strong, flagged],
    );
    let band = metre_band();
    let weights = NaturalWeights;
    let mut ctx = default_context(&weights);
    ctx.visibility_weighting = VisibilityWeightingMode::Unit;

    let lanes = gridder.start_inversion_pass(0);
    let (lanes, _) = inversion::process_pass(lanes, &mut provider, &band, &ctx);
    gridder.finish_inversion_pass(lanes);
    gridder.finalize_image(1.0, true);
    // 6 / 3 = 2 from the first row, 0 from the flagged one.
    assert_abs_diff_eq!(gridder.real_image()[32 * 64 + 32], 2.0, epsilon = 1e-6);
}

#[test]
fn distance_weighting_accumulates_baseline_lengths() {
    let mut gridder = WStackingGridder::new(
        GridderConfig::new(64, 64, 0.01, 0.01),
        ImageBufferAllocator::new(),
    )
    .unwrap();
    gridder.prepare_w_layers(1, u64::MAX, 0.0, 0.0).unwrap();

    let mut provider = MemoryMsProvider::new(
        MemoryMsProvider::simple_meta(2),
        metre_band(),
        vec![unit_row(3.0, 4.0, 0.0)],
    );
    let band = metre_band();
    let weights = NaturalWeights;
    let mut ctx = default_context(&weights);
    ctx.weight_mode = WeightMode::Distance;

    let lanes = gridder.start_inversion_pass(0);
    let (lanes, stats) = inversion::process_pass(lanes, &mut provider, &band, &ctx);
    gridder.finish_inversion_pass(lanes);
    // Distance weighting uses |uvw| in metres, not wavelengths.
    assert_abs_diff_eq!(stats.weight_sum, 5.0, epsilon = 1e-12);
}

#[test]
fn prediction_pass_writes_the_model_column() {
    let mut gridder = WStackingGridder::new(
        GridderConfig::new(64, 64, 0.01, 0.01),
        ImageBufferAllocator::new(),
    )
    .unwrap();
    gridder.prepare_w_layers(2, u64::MAX, 0.0, 5.0).unwrap();
    let band = metre_band();
    gridder.prepare_band(&band);

    let mut model = vec![0.0; 64 * 64];
    model[32 * 64 + 32] = 1.0;
    gridder.initialize_prediction(&model, None).unwrap();
    gridder.start_prediction_pass(0);

    let mut provider = cross_provider(2.0);
    let rows = prediction::process_pass(&gridder, &mut provider, &band, 2);
    assert_eq!(rows, 4);
    for row in provider.rows() {
        assert_abs_diff_eq!(row.model[0].re, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(row.model[0].im, 0.0, epsilon = 1e-5);
    }
}
