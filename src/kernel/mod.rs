// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The oversampled antialiasing kernel used for gridding and degridding.


use std::f64::consts::TAU;

/// How visibilities are placed on (and read from) a layer grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridMode {
    /// Each sample lands in the single nearest cell. Fast and rough.
    NearestNeighbour,
    /// Convolutional (de)gridding with an oversampled prolate-spheroidal
    /// kernel.
    #[default]
    ProlateSpheroidal,
}

/// A 1-D antialiasing kernel, tabulated at `oversampling + 1` fractional
/// offsets. The same tables serve gridding and degridding; every sub-kernel
/// is normalised to unit sum so a gridded sample deposits exactly its own
/// weight regardless of where it falls within a cell.
pub struct GriddingKernel {
    mode: GridMode,
    size: usize,
    oversampling: usize,
    /// `tables[o][k]` is the tap for grid offset `k - size/2` when the
    /// sample's fractional cell offset is `o / oversampling - 0.5`.
    tables: Vec<Vec<f64>>,
}

impl GriddingKernel {
    /// `size` is the square support in cells (odd), `oversampling` the
    /// number of tabulated fractional offsets per cell. Both are validated
    /// by [`crate::gridder::GridderConfig`] before construction.
    pub fn new(mode: GridMode, size: usize, oversampling: usize) -> GriddingKernel {
        assert!(size % 2 == 1 && size >= 3, "kernel support must be odd and >= 3");
        assert!(oversampling >= 1);
        let tables = match mode {
            GridMode::NearestNeighbour => vec![vec![1.0]; oversampling + 1],
            GridMode::ProlateSpheroidal => {
                let half = (size / 2) as isize;
                let half_support = size as f64 / 2.0;
                (0..=oversampling)
                    .map(|o| {
                        let frac = o as f64 / oversampling as f64 - 0.5;
                        let mut taps: Vec<f64> = (0..size)
                            .map(|k| {
                                let d = (k as isize - half) as f64 - frac;
                                gridding_function(d / half_support)
                            })
                            .collect();
                        let sum: f64 = taps.iter().sum();
                        for t in &mut taps {
                            *t /= sum;
                        }
                        taps
                    })
                    .collect()
            }
        };
        GriddingKernel {
            mode,
            size,
            oversampling,
            tables,
        }
    }

    pub fn mode(&self) -> GridMode {
        self.mode
    }

    /// The support in cells: 1 in nearest-neighbour mode.
    pub fn support(&self) -> usize {
        match self.mode {
            GridMode::NearestNeighbour => 1,
            GridMode::ProlateSpheroidal => self.size,
        }
    }

    /// Cells either side of the centre tap.
    pub fn half_support(&self) -> usize {
        self.support() / 2
    }

    /// The tap row for a sample whose position within its nearest cell is
    /// `frac` (in `[-0.5, 0.5]`).
    #[inline]
    pub fn taps(&self, frac: f64) -> &[f64] {
        let idx = ((frac + 0.5) * self.oversampling as f64).round() as usize;
        &self.tables[idx.min(self.oversampling)]
    }

    /// The image-domain taper of the gridding convolution along one axis of
    /// `n` pixels, centred on pixel `n / 2`. [`finalize
    /// image`](crate::gridder::WStackingGridder::finalize_image) divides by
    /// this to undo the kernel's response; prediction divides by it up front
    /// for the same reason.
    pub fn correction(&self, n: usize) -> Vec<f64> {
        match self.mode {
            GridMode::NearestNeighbour => vec![1.0; n],
            GridMode::ProlateSpheroidal => {
                let half_support = self.size as f64 / 2.0;
                let step = 1.0 / self.oversampling as f64;
                let fine_count = self.size * self.oversampling + 1;
                let fine: Vec<(f64, f64)> = (0..fine_count)
                    .map(|i| {
                        let d = -half_support + i as f64 * step;
                        (d, gridding_function(d / half_support))
                    })
                    .collect();
                let wsum: f64 = fine.iter().map(|(_, w)| w).sum();
                (0..n)
                    .map(|p| {
                        let nu = (p as f64 - (n / 2) as f64) / n as f64;
                        let c: f64 =
                            fine.iter().map(|(d, w)| w * (TAU * nu * d).cos()).sum();
                        c / wsum
                    })
                    .collect()
            }
        }
    }
}

/// The zeroth-order prolate spheroidal wave function for m = 6, alpha = 1,
/// via Schwab's rational approximation.
fn prolate_spheroidal(eta: f64) -> f64 {
    const P_LOW: [f64; 5] = [
        8.203343e-2,
        -3.644705e-1,
        6.278660e-1,
        -5.335581e-1,
        2.312756e-1,
    ];
    const P_HIGH: [f64; 5] = [
        4.028559e-3,
        -3.697768e-2,
        1.021332e-1,
        -1.201436e-1,
        6.412774e-2,
    ];
    const Q_LOW: [f64; 3] = [1.0, 8.212018e-1, 2.078043e-1];
    const Q_HIGH: [f64; 3] = [1.0, 9.599102e-1, 2.918724e-1];

    let eta = eta.abs();
    if eta > 1.0 {
        return 0.0;
    }
    let (p, q, x) = if eta <= 0.75 {
        (P_LOW, Q_LOW, eta * eta - 0.5625)
    } else {
        (P_HIGH, Q_HIGH, eta * eta - 1.0)
    };
    let num = p[0] + x * (p[1] + x * (p[2] + x * (p[3] + x * p[4])));
    let den = q[0] + x * (q[1] + x * q[2]);
    num / den
}

/// The gridding function `(1 - eta^2) * psi(eta)`.
#[inline]
fn gridding_function(eta: f64) -> f64 {
    if eta.abs() >= 1.0 {
        0.0
    } else {
        (1.0 - eta * eta) * prolate_spheroidal(eta)
    }
}
