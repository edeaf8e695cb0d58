// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Centred 2-D Fourier transforms over flat row-major grids.
//!
//! All grids in this crate put the origin (u = 0, or l = 0) at pixel
//! `(width / 2, height / 2)`; a transform here is a plain FFT wrapped in the
//! matching quadrant swaps. Grid dimensions must be even.


use std::sync::Arc;

use num_complex::Complex;
use num_traits::Zero;
use rustfft::{Fft, FftPlanner};

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Image to spatial-frequency, `e^{-2 pi i ...}`, unnormalised.
    Forward,
    /// Spatial-frequency to image, `e^{+2 pi i ...}`, unnormalised.
    Backward,
}

/// Swap quadrants so that the centre pixel moves to index 0 (and back; the
/// operation is an involution for even dimensions).
pub(crate) fn fft_shift_2d(grid: &mut [Complex<f64>], width: usize, height: usize) {
    debug_assert_eq!(grid.len(), width * height);
    debug_assert!(width % 2 == 0 && height % 2 == 0);
    let half_width = width / 2;
    let half_height = height / 2;
    for y in 0..half_height {
        for x in 0..width {
            let x2 = (x + half_width) % width;
            let y2 = y + half_height;
            grid.swap(y * width + x, y2 * width + x2);
        }
    }
}

/// A planned centred 2-D transform of fixed dimensions. `process` takes
/// `&self` and allocates its own scratch, so one plan can serve many threads.
pub(crate) struct Fft2d {
    width: usize,
    height: usize,
    row_fft: Arc<dyn Fft<f64>>,
    col_fft: Arc<dyn Fft<f64>>,
}

impl Fft2d {
    pub(crate) fn new(direction: Direction, width: usize, height: usize) -> Fft2d {
        assert!(width % 2 == 0 && height % 2 == 0, "grid dimensions must be even");
        let mut planner = FftPlanner::new();
        let (row_fft, col_fft) = match direction {
            Direction::Forward => (
                planner.plan_fft_forward(width),
                planner.plan_fft_forward(height),
            ),
            Direction::Backward => (
                planner.plan_fft_inverse(width),
                planner.plan_fft_inverse(height),
            ),
        };
        Fft2d {
            width,
            height,
            row_fft,
            col_fft,
        }
    }

    /// Transform `grid` in place. Unnormalised in both directions.
    pub(crate) fn process(&self, grid: &mut [Complex<f64>]) {
        debug_assert_eq!(grid.len(), self.width * self.height);
        fft_shift_2d(grid, self.width, self.height);

        let scratch_len = self
            .row_fft
            .get_inplace_scratch_len()
            .max(self.col_fft.get_inplace_scratch_len());
        let mut scratch = vec![Complex::zero(); scratch_len];

        // All rows are contiguous; one call transforms them all.
        self.row_fft.process_with_scratch(grid, &mut scratch);

        // Columns go through a gather/scatter buffer.
        let mut column = vec![Complex::zero(); self.height];
        for x in 0..self.width {
            for y in 0..self.height {
                column[y] = grid[y * self.width + x];
            }
            self.col_fft.process_with_scratch(&mut column, &mut scratch);
            for y in 0..self.height {
                grid[y * self.width + x] = column[y];
            }
        }

        fft_shift_2d(grid, self.width, self.height);
    }
}
