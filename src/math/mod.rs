// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.


use num_complex::Complex;

/// Complex exponential `e^{ix}`.
#[inline]
pub(crate) fn cexp(x: f64) -> Complex<f64> {
    let (s, c) = x.sin_cos();
    Complex::new(c, s)
}

#[inline]
pub(crate) fn div_ceil(a: usize, b: usize) -> usize {
    if a % b != 0 {
        a / b + 1
    } else {
        a / b
    }
}

/// Render an angle \[radians\] with a unit a human can read.
pub(crate) fn angle_to_nice_string(rad: f64) -> String {
    let deg = rad.to_degrees();
    if deg.abs() >= 2.0 {
        format!("{deg:.2}°")
    } else if deg.abs() >= 2.0 / 60.0 {
        format!("{:.2}'", deg * 60.0)
    } else {
        format!("{:.2}''", deg * 3600.0)
    }
}
