// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridderError {
    #[error("Image dimensions must be even and non-zero, got {width} x {height}")]
    BadImageSize { width: usize, height: usize },

    #[error("Pixel scales must be positive, got {x} x {y}")]
    BadPixelScale { x: f64, y: f64 },

    #[error("The antialiasing kernel support must be odd and at least 3, got {size}")]
    BadKernelSize { size: usize },

    #[error("The kernel oversampling factor must be at least 1")]
    BadOversampling,

    #[error("At least one w-layer is required")]
    NoLayers,

    #[error("Invalid w range: [{min_w}, {max_w}]")]
    BadWRange { min_w: f64, max_w: f64 },

    #[error("One w-layer pass needs {required} bytes, but the memory budget is {available} bytes; lower the w-grid size or raise the memory limit")]
    MemTooSmall { required: u64, available: u64 },

    #[error("Missing imaginary image in complex prediction")]
    MissingImaginary,

    #[error("Imaginary image specified in non-complex prediction")]
    UnexpectedImaginary,

    #[error(transparent)]
    Band(#[from] crate::bands::BandError),
}
