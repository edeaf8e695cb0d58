// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::bands::BandError;
use crate::gridder::GridderError;

/// Problems found while preparing the measurement sets, before any gridding.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("No measurement sets were added to the imager")]
    NoMeasurementSets,

    #[error("Measurement set has no rows (no data)")]
    NoRows,

    #[error("No antennae in measurement set")]
    NoAntennae,

    #[error("Measurement set has no field {field_id}")]
    BadFieldId { field_id: usize },

    #[error(transparent)]
    Band(#[from] BandError),
}

#[derive(Error, Debug)]
pub enum InvertError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Gridder(#[from] GridderError),
}

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Missing imaginary image in complex prediction")]
    MissingImaginary,

    #[error("Imaginary image specified in non-complex prediction")]
    UnexpectedImaginary,

    #[error("Model image dimensions do not match the configured image size")]
    BadModelImage,

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Gridder(#[from] GridderError),
}
