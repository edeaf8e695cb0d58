// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! FFT-based image-domain resampling, used to blow a reduced inversion grid
//! back up to the requested image size (and the reverse for prediction).

#[cfg(test)]
mod tests;

use num_complex::Complex;
use num_traits::Zero;

use crate::fourier::{Direction, Fft2d};

/// Resamples real planes from one size to another by cropping or zero-padding
/// the centred spectrum. All dimensions must be even.
pub struct FftResampler {
    in_width: usize,
    in_height: usize,
    out_width: usize,
    out_height: usize,
    fft_in: Fft2d,
    fft_out: Fft2d,
}

impl FftResampler {
    pub fn new(in_width: usize, in_height: usize, out_width: usize, out_height: usize) -> Self {
        FftResampler {
            in_width,
            in_height,
            out_width,
            out_height,
            fft_in: Fft2d::new(Direction::Forward, in_width, in_height),
            fft_out: Fft2d::new(Direction::Backward, out_width, out_height),
        }
    }

    /// Resample one plane.
    pub fn run_single(&self, input: &[f64], output: &mut [f64]) {
        debug_assert_eq!(input.len(), self.in_width * self.in_height);
        debug_assert_eq!(output.len(), self.out_width * self.out_height);

        let mut spectrum: Vec<Complex<f64>> =
            input.iter().map(|&v| Complex::new(v, 0.0)).collect();
        self.fft_in.process(&mut spectrum);

        // Transplant the centre-aligned overlap of the two spectra.
        let mut out_spectrum = vec![Complex::zero(); self.out_width * self.out_height];
        let copy_width = self.in_width.min(self.out_width);
        let copy_height = self.in_height.min(self.out_height);
        let in_x0 = self.in_width / 2 - copy_width / 2;
        let in_y0 = self.in_height / 2 - copy_height / 2;
        let out_x0 = self.out_width / 2 - copy_width / 2;
        let out_y0 = self.out_height / 2 - copy_height / 2;
        for y in 0..copy_height {
            let src = (in_y0 + y) * self.in_width + in_x0;
            let dst = (out_y0 + y) * self.out_width + out_x0;
            out_spectrum[dst..dst + copy_width]
                .copy_from_slice(&spectrum[src..src + copy_width]);
        }

        self.fft_out.process(&mut out_spectrum);
        let scale = 1.0 / (self.in_width * self.in_height) as f64;
        for (dst, cell) in output.iter_mut().zip(&out_spectrum) {
            *dst = cell.re * scale;
        }
    }

    /// Resample two planes in parallel, e.g. the real and imaginary parts of
    /// a complex image.
    pub fn run_pair(
        &self,
        input_a: &[f64],
        input_b: &[f64],
        output_a: &mut [f64],
        output_b: &mut [f64],
    ) {
        rayon::join(
            || self.run_single(input_a, output_a),
            || self.run_single(input_b, output_b),
        );
    }
}
