// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The inversion and prediction orchestrators: the cross-measurement-set
//! pre-pass, the pass loop, and the image-resampling hand-off.

mod error;

pub use error::{InvertError, PredictError, SetupError};

use std::f64::consts::TAU;
use std::num::NonZeroUsize;
use std::thread;

use hifitime::Epoch;
use itertools::Itertools;
use log::{debug, info, log_enabled, warn, Level};
use ndarray::ArrayView2;

use crate::bands::MultiBandData;
use crate::buffer::{ImageBuffer, ImageBufferAllocator};
use crate::constants::{
    DEFAULT_KERNEL_SIZE, DEFAULT_MEM_FRACTION_FOR_LAYERS, DEFAULT_OVERSAMPLING,
};
use crate::gridder::{GridderConfig, GridderError, WLayerPlan, WStackingGridder};
use crate::io::{
    ImageWeights, MsProvider, Selection, VisibilityWeightingMode, WeightMode,
};
use crate::kernel::GridMode;
use crate::math::angle_to_nice_string;
use crate::pipeline::{inversion, prediction};
use crate::resample::FftResampler;

/// Everything an imaging run needs to know. Construct with
/// [`ImagerConfig::new`] and adjust fields before handing it to
/// [`Imager::new`]; the imager never mutates it.
#[derive(Debug, Clone)]
pub struct ImagerConfig {
    pub width: usize,
    pub height: usize,
    /// \[radians per pixel\]
    pub pixel_scale_x: f64,
    pub pixel_scale_y: f64,
    pub grid_mode: GridMode,
    pub kernel_size: usize,
    pub oversampling: usize,
    pub weight_mode: WeightMode,
    pub visibility_weighting: VisibilityWeightingMode,
    /// Grid the weights instead of the data, producing the dirty beam.
    pub do_image_psf: bool,
    /// Subtract the model column from the data before gridding.
    pub do_subtract_model: bool,
    /// Divide the final image by the summed imaging weights.
    pub normalize_for_weighting: bool,
    /// Allow inverting on a Nyquist-justified smaller grid, resampling the
    /// result up to the requested size afterwards.
    pub small_inversion: bool,
    pub is_complex: bool,
    /// Number of w-layers; when `None` a suggestion is computed from the w
    /// range and image extent.
    pub w_grid_size: Option<usize>,
    /// Discard this fraction of the upper w range.
    pub w_limit: Option<f64>,
    /// The memory budget \[bytes\], e.g. the detected system memory.
    pub mem_size: u64,
    /// Fraction of `mem_size` available to the w-layer planner.
    pub mem_fraction_for_layers: f64,
    /// Gridding/degridding worker threads; detected when `None`.
    pub thread_count: Option<NonZeroUsize>,
}

impl ImagerConfig {
    pub fn new(width: usize, height: usize, pixel_scale_x: f64, pixel_scale_y: f64) -> Self {
        ImagerConfig {
            width,
            height,
            pixel_scale_x,
            pixel_scale_y,
            grid_mode: GridMode::default(),
            kernel_size: DEFAULT_KERNEL_SIZE,
            oversampling: DEFAULT_OVERSAMPLING,
            weight_mode: WeightMode::default(),
            visibility_weighting: VisibilityWeightingMode::default(),
            do_image_psf: false,
            do_subtract_model: false,
            normalize_for_weighting: true,
            small_inversion: true,
            is_complex: false,
            w_grid_size: None,
            w_limit: None,
            mem_size: 8 * 1024 * 1024 * 1024,
            mem_fraction_for_layers: DEFAULT_MEM_FRACTION_FOR_LAYERS,
            thread_count: None,
        }
    }
}

/// Per-measurement-set state of one imaging run.
struct MsData {
    selected_band: MultiBandData,
    start_channel: usize,
    end_channel: usize,
    /// w range \[wavelengths\] of the samples that pass the image-bounds and
    /// weight filters; both zero for a set with nothing to grid.
    min_w: f64,
    max_w: f64,
    matching_rows: u64,
    total_rows_processed: u64,
}

/// Cross-measurement-set quantities collected by the pre-pass.
struct InitState {
    beam_size: f64,
    phase_centre_dl: f64,
    phase_centre_dm: f64,
    freq_low: f64,
    freq_high: f64,
    start_time: Option<Epoch>,
    actual_width: usize,
    actual_height: usize,
    actual_pixel_x: f64,
    actual_pixel_y: f64,
    w_grid_size: Option<usize>,
    thread_count: NonZeroUsize,
}

struct MsEntry<'a> {
    provider: &'a mut dyn MsProvider,
    selection: Selection,
}

/// The result of an inversion: the dirty image at the requested size.
pub struct DirtyImage {
    pub width: usize,
    pub height: usize,
    /// Sum of the imaging weights over all gridded samples.
    pub total_weight: f64,
    /// Theoretical beam size \[radians\], `1 / max |uvw|`.
    pub beam_size: f64,
    real: ImageBuffer,
    imaginary: Option<ImageBuffer>,
}

impl DirtyImage {
    pub fn real(&self) -> &[f64] {
        &self.real
    }

    pub fn imaginary(&self) -> Option<&[f64]> {
        self.imaginary.as_deref()
    }

    /// The real plane as a `[height, width]` view.
    pub fn real_view(&self) -> ArrayView2<f64> {
        ArrayView2::from_shape((self.height, self.width), &self.real).unwrap()
    }

    pub fn imaginary_view(&self) -> Option<ArrayView2<f64>> {
        self.imaginary
            .as_deref()
            .map(|b| ArrayView2::from_shape((self.height, self.width), b).unwrap())
    }
}

/// Orchestrates [`Imager::invert`] and [`Imager::predict`] over any number
/// of measurement sets. Both calls are synchronous and return when every
/// pass has completed.
pub struct Imager<'a> {
    config: ImagerConfig,
    weights: &'a dyn ImageWeights,
    allocator: ImageBufferAllocator,
    sets: Vec<MsEntry<'a>>,
}

impl<'a> Imager<'a> {
    pub fn new(config: ImagerConfig, weights: &'a dyn ImageWeights) -> Imager<'a> {
        info!(
            "Memory budget: {:.1} GB, {:.0}% of it for w-layers",
            config.mem_size as f64 / (1024.0 * 1024.0 * 1024.0),
            config.mem_fraction_for_layers * 100.0
        );
        Imager {
            config,
            weights,
            allocator: ImageBufferAllocator::new(),
            sets: vec![],
        }
    }

    pub fn add_measurement_set(
        &mut self,
        provider: &'a mut dyn MsProvider,
        selection: Selection,
    ) {
        self.sets.push(MsEntry {
            provider,
            selection,
        });
    }

    /// Grid all measurement sets into a dirty image.
    pub fn invert(&mut self) -> Result<DirtyImage, InvertError> {
        let (mut ms_data, init) = self.initialize_measurement_sets()?;
        let min_w = ms_data.iter().map(|m| m.min_w).fold(f64::INFINITY, f64::min);
        let max_w = ms_data.iter().map(|m| m.max_w).fold(f64::NEG_INFINITY, f64::max);

        let mut gridder = self.make_gridder(&init)?;
        let w_grid_size = init.w_grid_size.unwrap_or(1);
        gridder.prepare_w_layers(w_grid_size, self.layer_mem_budget(), min_w, max_w)?;

        if log_enabled!(Level::Debug) {
            for (entry, ms) in self.sets.iter_mut().zip(ms_data.iter_mut()) {
                count_samples_per_layer(entry.provider, ms, gridder.plan());
            }
        }

        let mut total_weight = 0.0;
        for pass in 0..gridder.n_passes() {
            info!("Gridding pass {pass}...");
            let mut lanes = gridder.start_inversion_pass(pass);
            for (entry, ms) in self.sets.iter_mut().zip(ms_data.iter_mut()) {
                let ctx = inversion::InversionContext {
                    do_image_psf: self.config.do_image_psf,
                    do_subtract_model: self.config.do_subtract_model,
                    visibility_weighting: self.config.visibility_weighting,
                    weight_mode: self.config.weight_mode,
                    phase_centre_dl: init.phase_centre_dl,
                    phase_centre_dm: init.phase_centre_dm,
                    weights: self.weights,
                };
                let (returned, stats) =
                    inversion::process_pass(lanes, &mut *entry.provider, &ms.selected_band, &ctx);
                lanes = returned;
                total_weight += stats.weight_sum;
                debug!(
                    "Rows that were required: {}/{}",
                    stats.rows_read, ms.matching_rows
                );
                ms.total_rows_processed += stats.rows_read;
            }
            info!("Fourier transforms...");
            gridder.finish_inversion_pass(lanes);
        }
        log_row_totals("read", &ms_data);

        if !self.config.normalize_for_weighting {
            info!("Not dividing by normalization factor of {total_weight}.");
            gridder.finalize_image(1.0, true);
        } else if total_weight > 0.0 {
            gridder.finalize_image(1.0 / total_weight, false);
        } else {
            warn!("Total weight is zero; the image is left unnormalized.");
            gridder.finalize_image(1.0, true);
        }

        if self.config.width != init.actual_width || self.config.height != init.actual_height {
            let resampler = FftResampler::new(
                init.actual_width,
                init.actual_height,
                self.config.width,
                self.config.height,
            );
            let cells = self.config.width * self.config.height;
            if self.config.is_complex {
                let mut real = self.allocator.allocate(cells);
                let mut imaginary = self.allocator.allocate(cells);
                resampler.run_pair(
                    gridder.real_image(),
                    gridder
                        .imaginary_image()
                        .expect("complex inversion keeps an imaginary plane"),
                    &mut real,
                    &mut imaginary,
                );
                gridder.replace_real_image_buffer(real);
                gridder.replace_imaginary_image_buffer(imaginary);
            } else {
                let mut real = self.allocator.allocate(cells);
                resampler.run_single(gridder.real_image(), &mut real);
                gridder.replace_real_image_buffer(real);
            }
        }

        Ok(DirtyImage {
            width: self.config.width,
            height: self.config.height,
            total_weight,
            beam_size: init.beam_size,
            real: gridder.take_real_image(),
            imaginary: gridder.take_imaginary_image(),
        })
    }

    /// Predict model visibilities for all measurement sets from a sky image
    /// and write them to the model column.
    pub fn predict(&mut self, real: &[f64], imaginary: Option<&[f64]>) -> Result<(), PredictError> {
        if imaginary.is_none() && self.config.is_complex {
            return Err(PredictError::MissingImaginary);
        }
        if imaginary.is_some() && !self.config.is_complex {
            return Err(PredictError::UnexpectedImaginary);
        }
        let cells = self.config.width * self.config.height;
        if real.len() != cells || imaginary.map_or(false, |b| b.len() != cells) {
            return Err(PredictError::BadModelImage);
        }

        let (mut ms_data, init) = self.initialize_measurement_sets()?;
        let min_w = ms_data.iter().map(|m| m.min_w).fold(f64::INFINITY, f64::min);
        let max_w = ms_data.iter().map(|m| m.max_w).fold(f64::NEG_INFINITY, f64::max);

        let mut gridder = self.make_gridder(&init)?;
        let w_grid_size = init.w_grid_size.unwrap_or(1);
        gridder.prepare_w_layers(w_grid_size, self.layer_mem_budget(), min_w, max_w)?;

        if log_enabled!(Level::Debug) {
            for (entry, ms) in self.sets.iter_mut().zip(ms_data.iter_mut()) {
                count_samples_per_layer(entry.provider, ms, gridder.plan());
            }
        }

        // Resample the model down to the internal grid before any pass.
        let (real_plane, imaginary_plane);
        let (real_small, imaginary_small);
        if self.config.width != init.actual_width || self.config.height != init.actual_height {
            let resampler = FftResampler::new(
                self.config.width,
                self.config.height,
                init.actual_width,
                init.actual_height,
            );
            let small_cells = init.actual_width * init.actual_height;
            match imaginary {
                Some(imaginary) => {
                    let mut re = self.allocator.allocate(small_cells);
                    let mut im = self.allocator.allocate(small_cells);
                    resampler.run_pair(real, imaginary, &mut re, &mut im);
                    real_small = re;
                    imaginary_small = Some(im);
                }
                None => {
                    let mut re = self.allocator.allocate(small_cells);
                    resampler.run_single(real, &mut re);
                    real_small = re;
                    imaginary_small = None;
                }
            }
            real_plane = &*real_small;
            imaginary_plane = imaginary_small.as_deref();
        } else {
            real_plane = real;
            imaginary_plane = imaginary;
        }

        for pass in 0..gridder.n_passes() {
            info!("Fourier transforms for pass {pass}...");
            gridder.initialize_prediction(real_plane, imaginary_plane)?;
            gridder.start_prediction_pass(pass);
            info!("Predicting...");
            for (entry, ms) in self.sets.iter_mut().zip(ms_data.iter_mut()) {
                gridder.prepare_band(&ms.selected_band);
                let rows = prediction::process_pass(
                    &gridder,
                    &mut *entry.provider,
                    &ms.selected_band,
                    init.thread_count.get(),
                );
                debug!("Rows that were required: {}/{}", rows, ms.matching_rows);
                ms.total_rows_processed += rows;
            }
        }
        log_row_totals("written", &ms_data);
        Ok(())
    }

    fn layer_mem_budget(&self) -> u64 {
        (self.config.mem_size as f64 * self.config.mem_fraction_for_layers) as u64
    }

    fn make_gridder(&self, init: &InitState) -> Result<WStackingGridder, GridderError> {
        let gridder_config = GridderConfig {
            width: init.actual_width,
            height: init.actual_height,
            pixel_scale_x: init.actual_pixel_x,
            pixel_scale_y: init.actual_pixel_y,
            grid_mode: self.config.grid_mode,
            kernel_size: self.config.kernel_size,
            oversampling: self.config.oversampling,
            thread_count: init.thread_count,
            is_complex: self.config.is_complex,
            phase_centre_dl: init.phase_centre_dl,
            phase_centre_dm: init.phase_centre_dm,
        };
        WStackingGridder::new(gridder_config, self.allocator.clone())
    }

    /// The single streaming pre-pass over every measurement set: per-set w
    /// range, beam size, the small-inversion grid reduction and the
    /// suggested w-layer count.
    fn initialize_measurement_sets(&mut self) -> Result<(Vec<MsData>, InitState), SetupError> {
        if self.sets.is_empty() {
            return Err(SetupError::NoMeasurementSets);
        }
        let thread_count = self.config.thread_count.unwrap_or_else(|| {
            thread::available_parallelism().unwrap_or_else(|_| NonZeroUsize::new(1).unwrap())
        });
        let mut state = InitState {
            beam_size: 0.0,
            phase_centre_dl: 0.0,
            phase_centre_dm: 0.0,
            freq_low: f64::INFINITY,
            freq_high: f64::NEG_INFINITY,
            start_time: None,
            actual_width: self.config.width,
            actual_height: self.config.height,
            actual_pixel_x: self.config.pixel_scale_x,
            actual_pixel_y: self.config.pixel_scale_y,
            w_grid_size: self.config.w_grid_size,
            thread_count,
        };
        let config = &self.config;
        let weights = self.weights;
        let ms_data = self
            .sets
            .iter_mut()
            .map(|entry| {
                initialize_measurement_set(
                    config,
                    weights,
                    entry.provider,
                    &entry.selection,
                    &mut state,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "Frequency range {:.3} -- {:.3} MHz, first epoch {}",
            state.freq_low / 1e6,
            state.freq_high / 1e6,
            state.start_time.map_or_else(String::new, |t| t.to_string()),
        );
        Ok((ms_data, state))
    }
}

fn initialize_measurement_set(
    config: &ImagerConfig,
    weights: &dyn ImageWeights,
    provider: &mut dyn MsProvider,
    selection: &Selection,
    state: &mut InitState,
) -> Result<MsData, SetupError> {
    if provider.row_count() == 0 {
        return Err(SetupError::NoRows);
    }
    let meta = provider.observation_meta().clone();
    if meta.antenna_count == 0 {
        return Err(SetupError::NoAntennae);
    }

    let band_data = provider.multi_band_data();
    let channel_count = band_data.first_band().channel_count();
    let (start_channel, end_channel) = match &selection.channel_range {
        Some(range) => {
            info!("Selected channels: {}-{}", range.start, range.end);
            (range.start, range.end)
        }
        None => (0, channel_count),
    };
    let selected_band = band_data.selected(start_channel..end_channel)?;

    state.freq_low = state.freq_low.min(selected_band.lowest_frequency());
    state.freq_high = state.freq_high.max(selected_band.highest_frequency());
    let start_time = provider.start_time();
    state.start_time = Some(match state.start_time {
        Some(t) if t <= start_time => t,
        _ => start_time,
    });

    let centre = meta
        .phase_centres
        .as_slice()
        .get(selection.field_id)
        .copied()
        .ok_or(SetupError::BadFieldId {
            field_id: selection.field_id,
        })?;
    debug!(
        "Phase centre: ra={:.6} rad, dec={:.6} rad",
        centre.ra, centre.dec
    );
    state.phase_centre_dl = meta.phase_centre_dl;
    state.phase_centre_dm = meta.phase_centre_dm;
    if meta.phase_centre_dl != 0.0 || meta.phase_centre_dm != 0.0 {
        info!(
            "Set has denormal phase centre: dl={}, dm={}",
            meta.phase_centre_dl, meta.phase_centre_dm
        );
    }

    info!("Determining min and max w & theoretical beam size...");
    let mut max_w = 0.0f64;
    let mut min_w = 1e100f64;
    let mut max_baseline = 0.0f64;
    let half_width = 0.5 * config.width as f64;
    let half_height = 0.5 * config.height as f64;
    let mut weight_buffer = vec![0.0f32; selected_band.max_channels()];
    provider.reset();
    while provider.current_row_available() {
        let row = provider.read_meta();
        let cur_band = selected_band.band(row.data_desc_id);
        let w_hi = (row.w / cur_band.smallest_wavelength()).abs();
        let w_lo = (row.w / cur_band.longest_wavelength()).abs();
        let baseline_m = (row.u * row.u + row.v * row.v + row.w * row.w).sqrt();
        // Only rows that could widen the envelope are worth the weight read.
        if w_hi > max_w
            || w_lo < min_w
            || baseline_m / cur_band.smallest_wavelength() > max_baseline
        {
            let n = cur_band.channel_count();
            provider.read_weights(&mut weight_buffer[..n]);
            for ch in 0..n {
                if weight_buffer[ch] != 0.0 {
                    let wavelength = cur_band.channel_wavelength(ch);
                    let u_l = row.u / wavelength;
                    let v_l = row.v / wavelength;
                    let w_l = row.w / wavelength;
                    let x = u_l * config.pixel_scale_x * config.width as f64;
                    let y = v_l * config.pixel_scale_y * config.height as f64;
                    let imaging_weight = weights.weight(u_l, v_l);
                    if imaging_weight != 0.0
                        && x.floor() > -half_width
                        && x.ceil() < half_width
                        && y.floor() > -half_height
                        && y.ceil() < half_height
                    {
                        max_w = max_w.max(w_l.abs());
                        min_w = min_w.min(w_l.abs());
                        max_baseline = max_baseline.max(baseline_m / wavelength);
                    }
                }
            }
        }
        provider.next_row();
    }
    if min_w == 1e100 {
        min_w = 0.0;
        max_w = 0.0;
    }
    state.beam_size = 1.0 / max_baseline;
    info!(
        "w=[{:.6}:{:.6}] lambdas, maxuvw={:.1} lambda, beam={}",
        min_w,
        max_w,
        max_baseline,
        angle_to_nice_string(state.beam_size)
    );
    if let Some(w_limit) = config.w_limit {
        max_w *= 1.0 - w_limit;
        if max_w < min_w {
            max_w = min_w;
        }
    }

    state.actual_width = config.width;
    state.actual_height = config.height;
    state.actual_pixel_x = config.pixel_scale_x;
    state.actual_pixel_y = config.pixel_scale_y;
    if config.small_inversion {
        let total_width = state.actual_width as f64 * state.actual_pixel_x;
        let total_height = state.actual_height as f64 * state.actual_pixel_y;
        // Minimum resolution at the Nyquist sampling rate.
        let mut min_res_x = (total_width * 2.0 / state.beam_size).ceil() as usize;
        if min_res_x % 4 != 0 {
            min_res_x += 4 - min_res_x % 4;
        }
        let mut min_res_y = (total_height * 2.0 / state.beam_size).ceil() as usize;
        if min_res_y % 4 != 0 {
            min_res_y += 4 - min_res_y % 4;
        }
        if min_res_x < state.actual_width || min_res_y < state.actual_height {
            state.actual_width = min_res_x.min(state.actual_width).max(32);
            state.actual_height = min_res_y.min(state.actual_height).max(32);
            info!(
                "Setting small inversion image size of {} x {}",
                state.actual_width, state.actual_height
            );
            state.actual_pixel_x = total_width / state.actual_width as f64;
            state.actual_pixel_y = total_height / state.actual_height as f64;
        } else {
            info!("Small inversion enabled, but inversion resolution already smaller than beam size: not using optimization.");
        }
    }

    if log_enabled!(Level::Debug) || state.w_grid_size.is_none() {
        let max_l = config.width as f64 * config.pixel_scale_x * 0.5 + meta.phase_centre_dl.abs();
        let max_m =
            config.height as f64 * config.pixel_scale_y * 0.5 + meta.phase_centre_dm.abs();
        let lm_sq = max_l * max_l + max_m * max_m;
        let c_min_w = if config.is_complex { -max_w } else { min_w };
        let radians_for_all_layers = if lm_sq < 1.0 {
            TAU * (max_w - c_min_w) * (1.0 - (1.0 - lm_sq).sqrt())
        } else {
            TAU * (max_w - c_min_w)
        };
        let mut suggested = (radians_for_all_layers.ceil() as usize).max(1);
        let threads = state.thread_count.get();
        if suggested < threads {
            // Fewer layers than cores parallelise poorly, but extra layers
            // are only worth it when memory is plentiful.
            let memory_required = threads as f64
                * std::mem::size_of::<f64>() as f64
                * (state.actual_width * state.actual_height) as f64;
            if 4.0 * memory_required < config.mem_size as f64 {
                info!(
                    "The theoretically suggested number of w-layers ({suggested}) is less than the number of available cores ({threads}). Changing suggested number of w-layers to {threads}."
                );
                suggested = threads;
            } else {
                warn!(
                    "The theoretically suggested number of w-layers ({suggested}) is less than the number of available cores ({threads}), but there is not enough memory available to increase the number of w-layers. Not all cores can be used efficiently."
                );
            }
        }
        debug!("Suggested number of w-layers: {suggested}");
        if state.w_grid_size.is_none() {
            state.w_grid_size = Some(suggested);
        }
    }

    Ok(MsData {
        selected_band,
        start_channel,
        end_channel,
        min_w,
        max_w,
        matching_rows: 0,
        total_rows_processed: 0,
    })
}

/// Per-layer visibility histogram, logged when debugging. Also counts the
/// matching rows used by the overhead report.
fn count_samples_per_layer(provider: &mut dyn MsProvider, ms: &mut MsData, plan: &WLayerPlan) {
    debug!(
        "Counting samples per layer for channels {}-{}",
        ms.start_channel, ms.end_channel
    );
    let mut counts = vec![0u64; plan.n_layers];
    ms.matching_rows = 0;
    provider.reset();
    while provider.current_row_available() {
        let row = provider.read_meta();
        let band = ms.selected_band.band(row.data_desc_id);
        for ch in 0..band.channel_count() {
            let w = row.w / band.channel_wavelength(ch);
            counts[plan.w_to_layer(w)] += 1;
        }
        ms.matching_rows += 1;
        provider.next_row();
    }
    debug!("Visibility count per layer: {}", counts.iter().join(" "));
}

fn log_row_totals(verb: &str, ms_data: &[MsData]) {
    let total_rows: u64 = ms_data.iter().map(|m| m.total_rows_processed).sum();
    let total_matching: u64 = ms_data.iter().map(|m| m.matching_rows).sum();
    if total_matching != 0 {
        let overhead =
            (total_rows as f64 * 100.0 / total_matching as f64 - 100.0).round().max(0.0);
        info!("Total rows {verb}: {total_rows} (overhead: {overhead}%)");
    } else {
        info!("Total rows {verb}: {total_rows}");
    }
}
