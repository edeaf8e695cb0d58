// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;

#[test]
fn a_constant_plane_survives_any_resampling() {
    for &(iw, ih, ow, oh) in &[(16, 16, 32, 32), (32, 32, 16, 16), (16, 32, 32, 16)] {
        let input = vec![2.5; iw * ih];
        let mut output = vec![0.0; ow * oh];
        FftResampler::new(iw, ih, ow, oh).run_single(&input, &mut output);
        for &v in &output {
            assert_abs_diff_eq!(v, 2.5, epsilon = 1e-9);
        }
    }
}

#[test]
fn band_limited_content_round_trips_exactly() {
    // A low-order cosine survives a down-up round trip unchanged because
    // all of its power lies inside the smaller spectrum.
    const W: usize = 32;
    let input: Vec<f64> = (0..W * W)
        .map(|i| {
            let x = (i % W) as f64;
            let y = (i / W) as f64;
            (std::f64::consts::TAU * 3.0 * x / W as f64).cos()
                + 0.5 * (std::f64::consts::TAU * 2.0 * y / W as f64).sin()
        })
        .collect();

    let mut small = vec![0.0; 16 * 16];
    FftResampler::new(W, W, 16, 16).run_single(&input, &mut small);
    let mut back = vec![0.0; W * W];
    FftResampler::new(16, 16, W, W).run_single(&small, &mut back);

    for (a, b) in input.iter().zip(&back) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-9);
    }
}

#[test]
fn upsampling_preserves_a_smooth_peak() {
    const W: usize = 16;
    // A broad Gaussian centred on the image.
    let input: Vec<f64> = (0..W * W)
        .map(|i| {
            let x = (i % W) as f64 - (W / 2) as f64;
            let y = (i / W) as f64 - (W / 2) as f64;
            (-(x * x + y * y) / 18.0).exp()
        })
        .collect();
    let mut output = vec![0.0; 32 * 32];
    FftResampler::new(W, W, 32, 32).run_single(&input, &mut output);
    // The centre pixel maps to the centre pixel.
    assert_abs_diff_eq!(output[16 * 32 + 16], input[8 * 16 + 8], epsilon = 1e-3);
}

#[test]
fn pair_resampling_matches_two_singles() {
    const W: usize = 16;
    let a: Vec<f64> = (0..W * W).map(|i| (i % 7) as f64).collect();
    let b: Vec<f64> = (0..W * W).map(|i| (i % 5) as f64 - 2.0).collect();
    let resampler = FftResampler::new(W, W, 32, 32);

    let mut pair_a = vec![0.0; 32 * 32];
    let mut pair_b = vec![0.0; 32 * 32];
    resampler.run_pair(&a, &b, &mut pair_a, &mut pair_b);

    let mut single_a = vec![0.0; 32 * 32];
    let mut single_b = vec![0.0; 32 * 32];
    resampler.run_single(&a, &mut single_a);
    resampler.run_single(&b, &mut single_b);

    assert_eq!(pair_a, single_a);
    assert_eq!(pair_b, single_b);
}
