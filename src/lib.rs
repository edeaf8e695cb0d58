// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Core of a w-stacking radio-interferometric imager.

Irregularly-sampled visibilities are convolutionally gridded onto a set of
w-layers, each layer is Fourier transformed and corrected for its w-term, and
the layers are accumulated into a dirty image ([`Imager::invert`]). The
reverse operation predicts model visibilities from a sky image
([`Imager::predict`]). Layers are processed in as many passes as the memory
budget requires; within a pass, every layer is owned by exactly one worker
thread.

Measurement-set access, imaging-weight precomputation and the surrounding
deconvolution loop are external collaborators; their contracts live in
[`io`].
 */

pub mod bands;
pub mod buffer;
pub mod gridder;
pub mod imager;
pub mod io;
pub mod kernel;
pub mod resample;

pub(crate) mod constants;
pub(crate) mod error;
pub(crate) mod fourier;
pub(crate) mod math;
pub(crate) mod pipeline;

pub use bands::{BandData, BandError, MultiBandData};
pub use buffer::{ComplexBuffer, ImageBuffer, ImageBufferAllocator};
pub use error::WstackError;
pub use gridder::{GridderConfig, GridderError, GridderLane, WLayerPlan, WStackingGridder};
pub use imager::{DirtyImage, Imager, ImagerConfig, InvertError, PredictError, SetupError};
pub use io::{
    ImageWeights, MemoryMsProvider, MsProvider, MsRow, NaturalWeights, ObservationMeta,
    PhaseCentre, RowMeta, Selection, VisibilityWeightingMode, WeightMode,
};
pub use kernel::{GridMode, GriddingKernel};
pub use resample::FftResampler;

use crossbeam_utils::atomic::AtomicCell;

/// If this is set, long row scans draw progress bars on stdout. Off by
/// default so that library users in quiet or non-terminal contexts aren't
/// surprised.
pub static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
