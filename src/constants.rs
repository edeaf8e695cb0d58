// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Useful constants. All constants are double precision; calculations should
//! stay in double precision for as long as possible.

/// Speed of light \[m/s\].
pub(crate) const VEL_C: f64 = 299_792_458.0;

/// Default antialiasing kernel support \[pixels\]. Must be odd.
pub(crate) const DEFAULT_KERNEL_SIZE: usize = 7;

/// Default kernel oversampling factor.
pub(crate) const DEFAULT_OVERSAMPLING: usize = 63;

/// Capacity of the per-measurement-set inversion work queue \[items\].
pub(crate) const INVERSION_WORK_LANE_CAPACITY: usize = 2048;

/// Fraction of the memory budget reserved for w-layer allocation; the rest
/// is left for MS buffers, FFT work arrays and OS cache.
pub(crate) const DEFAULT_MEM_FRACTION_FOR_LAYERS: f64 = 0.7;
