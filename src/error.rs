// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all wstack-related errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WstackError {
    #[error(transparent)]
    Band(#[from] crate::bands::BandError),

    #[error(transparent)]
    Gridder(#[from] crate::gridder::GridderError),

    #[error(transparent)]
    Invert(#[from] crate::imager::InvertError),

    #[error(transparent)]
    Predict(#[from] crate::imager::PredictError),
}
