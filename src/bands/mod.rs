// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-spectral-window channel-frequency tables.


use std::ops::Range;

use thiserror::Error;
use vec1::Vec1;

use crate::constants::VEL_C;

/// The ordered channel frequencies of one spectral window. Immutable after
/// construction; frequencies are strictly positive and there is always at
/// least one channel.
#[derive(Debug, Clone)]
pub struct BandData {
    /// Channel centre frequencies \[Hz\], in storage order.
    frequencies: Vec1<f64>,
}

impl BandData {
    pub fn new(frequencies: Vec<f64>) -> Result<BandData, BandError> {
        let frequencies = Vec1::try_from_vec(frequencies).map_err(|_| BandError::Empty)?;
        if let Some(&f) = frequencies.iter().find(|f| !(**f > 0.0)) {
            return Err(BandError::NonPositiveFrequency { freq: f });
        }
        Ok(BandData { frequencies })
    }

    pub fn channel_count(&self) -> usize {
        self.frequencies.len()
    }

    /// The centre frequency of channel `ch` \[Hz\].
    pub fn channel_frequency(&self, ch: usize) -> f64 {
        self.frequencies[ch]
    }

    /// The wavelength of channel `ch` \[m\].
    pub fn channel_wavelength(&self, ch: usize) -> f64 {
        VEL_C / self.frequencies[ch]
    }

    pub fn highest_frequency(&self) -> f64 {
        self.frequencies.iter().copied().fold(f64::MIN, f64::max)
    }

    pub fn lowest_frequency(&self) -> f64 {
        self.frequencies.iter().copied().fold(f64::MAX, f64::min)
    }

    /// The wavelength of the highest-frequency channel \[m\].
    pub fn smallest_wavelength(&self) -> f64 {
        VEL_C / self.highest_frequency()
    }

    /// The wavelength of the lowest-frequency channel \[m\].
    pub fn longest_wavelength(&self) -> f64 {
        VEL_C / self.lowest_frequency()
    }

    /// The band restricted to `[range.start, range.end)`.
    pub fn subset(&self, range: Range<usize>) -> Result<BandData, BandError> {
        if range.start >= range.end || range.end > self.channel_count() {
            return Err(BandError::InvalidChannelRange {
                start: range.start,
                end: range.end,
                channel_count: self.channel_count(),
            });
        }
        BandData::new(self.frequencies.as_slice()[range].to_vec())
    }
}

/// The channel-frequency tables of every data description in a measurement
/// set. Rebuilt per MS; every data-description id seen in the main table must
/// resolve to a band.
#[derive(Debug, Clone)]
pub struct MultiBandData {
    bands: Vec1<BandData>,
    /// `data_desc_id -> index into bands`.
    data_desc_to_band: Vec1<usize>,
}

impl MultiBandData {
    /// `data_desc_to_band[id]` gives the band (spectral window) of data
    /// description `id`; identity for the common one-window-per-description
    /// case.
    pub fn new(bands: Vec<BandData>, data_desc_to_band: Vec<usize>) -> Result<Self, BandError> {
        let bands = Vec1::try_from_vec(bands).map_err(|_| BandError::Empty)?;
        let data_desc_to_band =
            Vec1::try_from_vec(data_desc_to_band).map_err(|_| BandError::Empty)?;
        if let Some(&bad) = data_desc_to_band.iter().find(|i| **i >= bands.len()) {
            return Err(BandError::UnknownBand { index: bad });
        }
        Ok(MultiBandData {
            bands,
            data_desc_to_band,
        })
    }

    /// A single band addressed by data description 0.
    pub fn from_single(band: BandData) -> Self {
        MultiBandData {
            bands: Vec1::new(band),
            data_desc_to_band: Vec1::new(0),
        }
    }

    pub fn band(&self, data_desc_id: usize) -> &BandData {
        &self.bands[self.data_desc_to_band[data_desc_id]]
    }

    pub fn first_band(&self) -> &BandData {
        self.bands.first()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn data_desc_count(&self) -> usize {
        self.data_desc_to_band.len()
    }

    /// The largest channel count over all bands; sizes scratch buffers.
    pub fn max_channels(&self) -> usize {
        self.bands.iter().map(BandData::channel_count).max().unwrap_or(0)
    }

    pub fn lowest_frequency(&self) -> f64 {
        self.bands
            .iter()
            .map(BandData::lowest_frequency)
            .fold(f64::MAX, f64::min)
    }

    pub fn highest_frequency(&self) -> f64 {
        self.bands
            .iter()
            .map(BandData::highest_frequency)
            .fold(f64::MIN, f64::max)
    }

    /// Every band restricted to the same channel window.
    pub fn selected(&self, range: Range<usize>) -> Result<MultiBandData, BandError> {
        let bands = self
            .bands
            .iter()
            .map(|b| b.subset(range.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        MultiBandData::new(bands, self.data_desc_to_band.as_slice().to_vec())
    }
}

#[derive(Error, Debug)]
pub enum BandError {
    #[error("A band with no channels was supplied")]
    Empty,

    #[error("Non-positive channel frequency {freq} supplied")]
    NonPositiveFrequency { freq: f64 },

    #[error("An invalid channel range was specified! The band only has {channel_count} channels, requested imaging range is {start} -- {end}.")]
    InvalidChannelRange {
        start: usize,
        end: usize,
        channel_count: usize,
    },

    #[error("Data description refers to band {index}, which does not exist")]
    UnknownBand { index: usize },
}
