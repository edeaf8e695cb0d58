// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The w-stacking gridder: owns the layer grids and the accumulated image,
//! schedules layers into memory-bounded passes, and performs the
//! convolutional gridding and degridding.

mod error;

pub use error::GridderError;

use std::f64::consts::TAU;
use std::num::NonZeroUsize;
use std::sync::Arc;

use log::debug;
use num_complex::Complex;
use rayon::prelude::*;

use crate::bands::MultiBandData;
use crate::buffer::{ComplexBuffer, ImageBuffer, ImageBufferAllocator};
use crate::fourier::{Direction, Fft2d};
use crate::kernel::{GridMode, GriddingKernel};
use crate::math::{cexp, div_ceil};

/// Everything the gridder needs to know at construction. Mutation between
/// [`WStackingGridder::prepare_w_layers`] and
/// [`WStackingGridder::finalize_image`] is not possible: the gridder takes
/// the config by value and exposes no setters.
#[derive(Debug, Clone)]
pub struct GridderConfig {
    pub width: usize,
    pub height: usize,
    /// \[radians per pixel\]
    pub pixel_scale_x: f64,
    pub pixel_scale_y: f64,
    pub grid_mode: GridMode,
    /// Antialiasing kernel support \[cells\], odd.
    pub kernel_size: usize,
    pub oversampling: usize,
    /// The number of gridding lanes handed out per pass.
    pub thread_count: NonZeroUsize,
    /// Keep the imaginary part of the inversion; layers then span
    /// `[-max_w, max_w]` because conjugation cannot fold negative w.
    pub is_complex: bool,
    /// Image-centre offset from the phase centre, in direction cosines.
    pub phase_centre_dl: f64,
    pub phase_centre_dm: f64,
}

impl GridderConfig {
    pub fn new(width: usize, height: usize, pixel_scale_x: f64, pixel_scale_y: f64) -> Self {
        GridderConfig {
            width,
            height,
            pixel_scale_x,
            pixel_scale_y,
            grid_mode: GridMode::default(),
            kernel_size: crate::constants::DEFAULT_KERNEL_SIZE,
            oversampling: crate::constants::DEFAULT_OVERSAMPLING,
            thread_count: NonZeroUsize::new(1).unwrap(),
            is_complex: false,
            phase_centre_dl: 0.0,
            phase_centre_dm: 0.0,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), GridderError> {
        if self.width == 0 || self.height == 0 || self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(GridderError::BadImageSize {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.pixel_scale_x > 0.0) || !(self.pixel_scale_y > 0.0) {
            return Err(GridderError::BadPixelScale {
                x: self.pixel_scale_x,
                y: self.pixel_scale_y,
            });
        }
        if self.kernel_size % 2 != 1 || self.kernel_size < 3 {
            return Err(GridderError::BadKernelSize {
                size: self.kernel_size,
            });
        }
        if self.oversampling < 1 {
            return Err(GridderError::BadOversampling);
        }
        Ok(())
    }
}

/// The w-layer discretisation and its split into memory-bounded passes.
/// Layer `i` covers `w` in `[min_w + i dw, min_w + (i+1) dw)`; the last
/// layer's upper edge is closed.
#[derive(Debug, Clone)]
pub struct WLayerPlan {
    pub min_w: f64,
    pub max_w: f64,
    /// Layer thickness \[wavelengths\]; 0 when all w are identical.
    pub dw: f64,
    pub n_layers: usize,
    pub layers_per_pass: usize,
    pub n_passes: usize,
    pub is_complex: bool,
    /// The layer window `[pass_first, pass_end)` of the running pass.
    pub(crate) pass_first: usize,
    pub(crate) pass_end: usize,
}

impl WLayerPlan {
    /// Negative w folds onto its conjugate sample for Hermitian sets.
    #[inline]
    fn canonical_w(&self, w: f64) -> f64 {
        if self.is_complex {
            w
        } else {
            w.abs()
        }
    }

    /// The layer index of a w value \[wavelengths\], clamped to the layer
    /// domain.
    pub fn w_to_layer(&self, w_lambda: f64) -> usize {
        if self.dw <= 0.0 {
            return 0;
        }
        let idx = ((self.canonical_w(w_lambda) - self.min_w) / self.dw).floor();
        (idx.max(0.0) as usize).min(self.n_layers - 1)
    }

    /// The w value at the centre of a layer.
    pub fn layer_centre_w(&self, layer: usize) -> f64 {
        self.min_w + (layer as f64 + 0.5) * self.dw
    }

    /// Does the closed w interval spanned by a row (its extreme channels)
    /// intersect the running pass's layer window? Both ends must be tested
    /// because one row covers a range of `w / lambda`.
    pub fn is_in_layer_range(&self, w1_lambda: f64, w2_lambda: f64) -> bool {
        let a = self.canonical_w(w1_lambda);
        let b = self.canonical_w(w2_lambda);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let window_lo = self.min_w + self.pass_first as f64 * self.dw;
        let window_hi = self.min_w + self.pass_end as f64 * self.dw;
        hi >= window_lo && lo <= window_hi
    }

    #[inline]
    fn layer_in_window(&self, layer: usize) -> bool {
        layer >= self.pass_first && layer < self.pass_end
    }
}

/// One in-memory w-layer of the running pass.
struct LayerSlot {
    index: usize,
    grid: ComplexBuffer,
    /// Summed kernel weight deposited on this layer.
    weight: f64,
}

/// The layers of the running inversion pass that one worker thread owns:
/// lane `t` holds the in-window layers whose index is `t` modulo the lane
/// count. Exclusive ownership is what makes `add_data_sample` lock-free.
pub struct GridderLane {
    lane_index: usize,
    plan: WLayerPlan,
    geometry: GridGeometry,
    kernel: Arc<GriddingKernel>,
    layers: Vec<LayerSlot>,
    samples: u64,
}

#[derive(Debug, Clone, Copy)]
struct GridGeometry {
    width: usize,
    height: usize,
    pixel_scale_x: f64,
    pixel_scale_y: f64,
}

impl GridGeometry {
    /// Grid position of (u, v) \[wavelengths\]; the origin sits at pixel
    /// `(width/2, height/2)`.
    #[inline]
    fn uv_to_grid(&self, u: f64, v: f64) -> (f64, f64) {
        (
            u * self.pixel_scale_x * self.width as f64 + (self.width / 2) as f64,
            v * self.pixel_scale_y * self.height as f64 + (self.height / 2) as f64,
        )
    }
}

impl GridderLane {
    pub fn lane_index(&self) -> usize {
        self.lane_index
    }

    pub fn plan(&self) -> &WLayerPlan {
        &self.plan
    }

    /// Convolve one single-channel sample into its layer. Samples outside
    /// the planned w domain (e.g. trimmed away by a w limit), outside the
    /// running pass window, or belonging to another lane's layer are
    /// silently skipped.
    pub fn add_data_sample(&mut self, sample: Complex<f32>, u_lambda: f64, v_lambda: f64, w_lambda: f64) {
        let (mut u, mut v, w) = (u_lambda, v_lambda, w_lambda);
        let mut sample = Complex::new(f64::from(sample.re), f64::from(sample.im));
        if !self.plan.is_complex && w < 0.0 {
            u = -u;
            v = -v;
            sample = sample.conj();
        }
        let w = self.plan.canonical_w(w);
        if w < self.plan.min_w || w > self.plan.max_w {
            return;
        }
        let layer = self.plan.w_to_layer(w);
        if !self.plan.layer_in_window(layer) {
            return;
        }
        let slot = match self.layers.iter_mut().find(|s| s.index == layer) {
            Some(slot) => slot,
            None => return,
        };

        let (xf, yf) = self.geometry.uv_to_grid(u, v);
        let xi = xf.round() as isize;
        let yi = yf.round() as isize;
        let h = self.kernel.half_support() as isize;
        if xi - h < 0
            || xi + h >= self.geometry.width as isize
            || yi - h < 0
            || yi + h >= self.geometry.height as isize
        {
            return;
        }
        let taps_x = self.kernel.taps(xf - xi as f64);
        let taps_y = self.kernel.taps(yf - yi as f64);

        let width = self.geometry.width;
        let mut kernel_sum = 0.0;
        for (ky, ty) in taps_y.iter().enumerate() {
            let row = (yi - h) as usize + ky;
            for (kx, tx) in taps_x.iter().enumerate() {
                let col = (xi - h) as usize + kx;
                let k = tx * ty;
                slot.grid[row * width + col] += sample * k;
                kernel_sum += k;
            }
        }
        slot.weight += kernel_sum;
        self.samples += 1;
    }

    /// Samples gridded through this lane so far.
    pub fn sample_count(&self) -> u64 {
        self.samples
    }
}

/// See the [module docs](self). The expected call sequence is
/// `prepare_w_layers`, then per pass either `start_inversion_pass` /
/// `finish_inversion_pass` (with `add_data_sample` on the handed-out lanes
/// in between) or `initialize_prediction` / `start_prediction_pass` (with
/// `sample_data`), then `finalize_image` for inversions.
pub struct WStackingGridder {
    config: GridderConfig,
    geometry: GridGeometry,
    kernel: Arc<GriddingKernel>,
    allocator: ImageBufferAllocator,
    plan: Option<WLayerPlan>,
    bands: Option<MultiBandData>,
    /// Per-pixel `sqrt(1 - l^2 - m^2) - 1`, with the denormal phase-centre
    /// offset folded in.
    sqrt_lm_minus_one: Arc<Vec<f64>>,
    fft_forward: Option<Arc<Fft2d>>,
    fft_backward: Option<Arc<Fft2d>>,
    real_image: Option<ImageBuffer>,
    imaginary_image: Option<ImageBuffer>,
    /// Taper-corrected complex copy of the model image during prediction.
    prediction_image: Option<Vec<Complex<f64>>>,
    /// The forward-transformed layers of the running prediction pass,
    /// contiguous from `plan.pass_first`.
    prediction_layers: Vec<LayerSlot>,
    samples_gridded: u64,
}

impl WStackingGridder {
    pub fn new(
        config: GridderConfig,
        allocator: ImageBufferAllocator,
    ) -> Result<WStackingGridder, GridderError> {
        config.validate()?;
        let kernel = Arc::new(GriddingKernel::new(
            config.grid_mode,
            config.kernel_size,
            config.oversampling,
        ));
        let geometry = GridGeometry {
            width: config.width,
            height: config.height,
            pixel_scale_x: config.pixel_scale_x,
            pixel_scale_y: config.pixel_scale_y,
        };
        Ok(WStackingGridder {
            config,
            geometry,
            kernel,
            allocator,
            plan: None,
            bands: None,
            sqrt_lm_minus_one: Arc::new(vec![]),
            fft_forward: None,
            fft_backward: None,
            real_image: None,
            imaginary_image: None,
            prediction_image: None,
            prediction_layers: vec![],
            samples_gridded: 0,
        })
    }

    /// Split `n_layers` w-layers over passes that fit `mem_budget` bytes and
    /// reset the accumulated image. Each layer is costed at two
    /// double-precision planes plus double-sided buffering for the Fourier
    /// stage.
    pub fn prepare_w_layers(
        &mut self,
        n_layers: usize,
        mem_budget: u64,
        min_w: f64,
        max_w: f64,
    ) -> Result<(), GridderError> {
        if n_layers == 0 {
            return Err(GridderError::NoLayers);
        }
        if !(max_w >= min_w) {
            return Err(GridderError::BadWRange { min_w, max_w });
        }
        let min_w = if self.config.is_complex { -max_w } else { min_w };

        let bytes_per_layer =
            (self.config.width * self.config.height) as u64 * std::mem::size_of::<Complex<f64>>() as u64 * 2;
        let layers_per_pass = ((mem_budget / bytes_per_layer) as usize).min(n_layers);
        if layers_per_pass == 0 {
            return Err(GridderError::MemTooSmall {
                required: bytes_per_layer,
                available: mem_budget,
            });
        }
        let n_passes = div_ceil(n_layers, layers_per_pass);
        debug!(
            "w-layer plan: {} layers of dw={:.6}, {} per pass, {} passes",
            n_layers,
            (max_w - min_w) / n_layers as f64,
            layers_per_pass,
            n_passes
        );

        self.plan = Some(WLayerPlan {
            min_w,
            max_w,
            dw: (max_w - min_w) / n_layers as f64,
            n_layers,
            layers_per_pass,
            n_passes,
            is_complex: self.config.is_complex,
            pass_first: 0,
            pass_end: n_layers.min(layers_per_pass),
        });

        let (width, height) = (self.config.width, self.config.height);
        let (dl, dm) = (self.config.phase_centre_dl, self.config.phase_centre_dm);
        let (psx, psy) = (self.config.pixel_scale_x, self.config.pixel_scale_y);
        let mut lookup = Vec::with_capacity(width * height);
        for y in 0..height {
            let m = (y as f64 - (height / 2) as f64) * psy + dm;
            for x in 0..width {
                let l = (x as f64 - (width / 2) as f64) * psx + dl;
                let lm2 = l * l + m * m;
                lookup.push(if lm2 < 1.0 { (1.0 - lm2).sqrt() - 1.0 } else { -1.0 });
            }
        }
        self.sqrt_lm_minus_one = Arc::new(lookup);

        self.fft_forward = Some(Arc::new(Fft2d::new(Direction::Forward, width, height)));
        self.fft_backward = Some(Arc::new(Fft2d::new(Direction::Backward, width, height)));

        self.real_image = Some(self.allocator.allocate(width * height));
        self.imaginary_image = if self.config.is_complex {
            Some(self.allocator.allocate(width * height))
        } else {
            None
        };
        self.prediction_image = None;
        self.prediction_layers.clear();
        self.samples_gridded = 0;
        Ok(())
    }

    /// Cache the channel tables used by `sample_data`.
    pub fn prepare_band(&mut self, bands: &MultiBandData) {
        self.bands = Some(bands.clone());
    }

    pub fn plan(&self) -> &WLayerPlan {
        self.plan.as_ref().expect("prepare_w_layers was not called")
    }

    pub fn n_passes(&self) -> usize {
        self.plan().n_passes
    }

    pub fn w_to_layer(&self, w_lambda: f64) -> usize {
        self.plan().w_to_layer(w_lambda)
    }

    pub fn is_in_layer_range(&self, w1_lambda: f64, w2_lambda: f64) -> bool {
        self.plan().is_in_layer_range(w1_lambda, w2_lambda)
    }

    pub fn kernel(&self) -> &GriddingKernel {
        &self.kernel
    }

    fn set_pass_window(&mut self, pass: usize) {
        let plan = self.plan.as_mut().expect("prepare_w_layers was not called");
        assert!(pass < plan.n_passes, "pass {pass} out of range");
        plan.pass_first = pass * plan.layers_per_pass;
        plan.pass_end = plan.n_layers.min((pass + 1) * plan.layers_per_pass);
    }

    /// Begin an inversion pass: zero the pass's layers and hand them out as
    /// per-thread lanes. Lane `t` owns the in-window layers with index
    /// `t mod thread_count`, so each layer has exactly one writer.
    pub fn start_inversion_pass(&mut self, pass: usize) -> Vec<GridderLane> {
        self.set_pass_window(pass);
        let plan = self.plan.as_ref().unwrap();
        let n_lanes = self.config.thread_count.get();
        let cells = self.config.width * self.config.height;
        (0..n_lanes)
            .map(|lane_index| {
                let layers = (plan.pass_first..plan.pass_end)
                    .filter(|layer| layer % n_lanes == lane_index)
                    .map(|index| LayerSlot {
                        index,
                        grid: self.allocator.allocate_complex(cells),
                        weight: 0.0,
                    })
                    .collect();
                GridderLane {
                    lane_index,
                    plan: plan.clone(),
                    geometry: self.geometry,
                    kernel: Arc::clone(&self.kernel),
                    layers,
                    samples: 0,
                }
            })
            .collect()
    }

    /// End an inversion pass: take the lanes back, inverse-transform every
    /// layer, apply its w-term and accumulate it into the image.
    pub fn finish_inversion_pass(&mut self, lanes: Vec<GridderLane>) {
        let mut slots: Vec<LayerSlot> = Vec::new();
        for lane in lanes {
            self.samples_gridded += lane.samples;
            slots.extend(lane.layers);
        }
        slots.sort_unstable_by_key(|s| s.index);
        for slot in &slots {
            debug!("layer {}: gridded weight {:.3}", slot.index, slot.weight);
        }

        let fft = Arc::clone(self.fft_backward.as_ref().expect("prepare_w_layers was not called"));
        let plan = self.plan.as_ref().unwrap().clone();
        let lookup = Arc::clone(&self.sqrt_lm_minus_one);
        slots.par_iter_mut().for_each(|slot| {
            fft.process(&mut slot.grid);
            let w_centre = plan.layer_centre_w(slot.index);
            if w_centre != 0.0 {
                for (cell, nm1) in slot.grid.iter_mut().zip(lookup.iter()) {
                    *cell *= cexp(TAU * w_centre * nm1);
                }
            }
        });

        let real = self.real_image.as_mut().expect("prepare_w_layers was not called");
        let imag = self.imaginary_image.as_mut();
        for slot in &slots {
            for (dst, cell) in real.iter_mut().zip(slot.grid.iter()) {
                *dst += cell.re;
            }
        }
        if let Some(imag) = imag {
            for slot in &slots {
                for (dst, cell) in imag.iter_mut().zip(slot.grid.iter()) {
                    *dst += cell.im;
                }
            }
        }
        // Dropping the slots returns the grids to the pool for the next pass.
    }

    /// Adopt the model image(s) a prediction run will degrid from. The taper
    /// of the gridding kernel is divided out here, mirroring
    /// `finalize_image`.
    pub fn initialize_prediction(
        &mut self,
        real: &[f64],
        imaginary: Option<&[f64]>,
    ) -> Result<(), GridderError> {
        if self.config.is_complex && imaginary.is_none() {
            return Err(GridderError::MissingImaginary);
        }
        if !self.config.is_complex && imaginary.is_some() {
            return Err(GridderError::UnexpectedImaginary);
        }
        let (width, height) = (self.config.width, self.config.height);
        assert_eq!(real.len(), width * height);

        let corr_x = self.kernel.correction(width);
        let corr_y = self.kernel.correction(height);
        let mut image = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let corr = corr_x[x] * corr_y[y];
                let i = y * width + x;
                let im = imaginary.map_or(0.0, |b| b[i]);
                image.push(Complex::new(real[i] / corr, im / corr));
            }
        }
        self.prediction_image = Some(image);
        Ok(())
    }

    /// Begin a prediction pass: build each in-window layer as the model
    /// image under the layer's forward w-term, Fourier transformed, ready
    /// for degridding.
    pub fn start_prediction_pass(&mut self, pass: usize) {
        self.set_pass_window(pass);
        let plan = self.plan.as_ref().unwrap().clone();
        let image = self
            .prediction_image
            .as_ref()
            .expect("initialize_prediction was not called");
        let fft = Arc::clone(self.fft_forward.as_ref().unwrap());
        let lookup = Arc::clone(&self.sqrt_lm_minus_one);
        let cells = self.config.width * self.config.height;

        let mut slots: Vec<LayerSlot> = (plan.pass_first..plan.pass_end)
            .map(|index| LayerSlot {
                index,
                grid: self.allocator.allocate_complex(cells),
                weight: 0.0,
            })
            .collect();
        slots.par_iter_mut().for_each(|slot| {
            let w_centre = plan.layer_centre_w(slot.index);
            for ((cell, src), nm1) in slot.grid.iter_mut().zip(image.iter()).zip(lookup.iter()) {
                *cell = src * cexp(-TAU * w_centre * nm1);
            }
            fft.process(&mut slot.grid);
        });
        self.prediction_layers = slots;
    }

    /// Degrid one row: for every channel of its band, sample the two layers
    /// adjacent in w and blend them by the channel's position between the
    /// layer centres. Layers outside the running pass window are clamped to
    /// its edge.
    pub fn sample_data(&self, buf: &mut [Complex<f32>], data_desc_id: usize, u: f64, v: f64, w: f64) {
        let plan = self.plan();
        let band = self
            .bands
            .as_ref()
            .expect("prepare_band was not called")
            .band(data_desc_id);
        debug_assert_eq!(buf.len(), band.channel_count());

        for (ch, out) in buf.iter_mut().enumerate() {
            let lambda = band.channel_wavelength(ch);
            let (mut ul, mut vl, wl) = (u / lambda, v / lambda, w / lambda);
            let conjugate = !plan.is_complex && wl < 0.0;
            if conjugate {
                ul = -ul;
                vl = -vl;
            }
            let wl = if conjugate { -wl } else { wl };

            let pos = if plan.dw > 0.0 {
                (wl - plan.min_w) / plan.dw - 0.5
            } else {
                0.0
            };
            let lo = plan.pass_first as f64;
            let hi = (plan.pass_end - 1) as f64;
            let j0 = pos.floor().clamp(lo, hi) as usize;
            let j1 = (j0 + 1).min(plan.pass_end - 1);
            let t = (pos - j0 as f64).clamp(0.0, 1.0);

            let v0 = self.degrid(j0, ul, vl);
            let value = if j1 == j0 {
                v0
            } else {
                let v1 = self.degrid(j1, ul, vl);
                v0 * (1.0 - t) + v1 * t
            };
            let value = if conjugate { value.conj() } else { value };
            *out = Complex::new(value.re as f32, value.im as f32);
        }
    }

    /// Kernel-interpolated read of one prediction layer at (u, v)
    /// \[wavelengths\].
    fn degrid(&self, layer: usize, u_lambda: f64, v_lambda: f64) -> Complex<f64> {
        let plan = self.plan.as_ref().unwrap();
        let slot = &self.prediction_layers[layer - plan.pass_first];
        let (xf, yf) = self.geometry.uv_to_grid(u_lambda, v_lambda);
        let xi = xf.round() as isize;
        let yi = yf.round() as isize;
        let h = self.kernel.half_support() as isize;
        if xi - h < 0
            || xi + h >= self.geometry.width as isize
            || yi - h < 0
            || yi + h >= self.geometry.height as isize
        {
            return Complex::new(0.0, 0.0);
        }
        let taps_x = self.kernel.taps(xf - xi as f64);
        let taps_y = self.kernel.taps(yf - yi as f64);
        let width = self.geometry.width;
        let mut acc = Complex::new(0.0, 0.0);
        for (ky, ty) in taps_y.iter().enumerate() {
            let row = (yi - h) as usize + ky;
            for (kx, tx) in taps_x.iter().enumerate() {
                let col = (xi - h) as usize + kx;
                acc += slot.grid[row * width + col] * (tx * ty);
            }
        }
        acc
    }

    /// Scale the accumulated image (unless normalisation is skipped) and
    /// divide out the kernel's image-domain taper.
    pub fn finalize_image(&mut self, scale: f64, skip_normalization: bool) {
        let (width, height) = (self.config.width, self.config.height);
        let corr_x = self.kernel.correction(width);
        let corr_y = self.kernel.correction(height);
        let mut planes: Vec<&mut ImageBuffer> = Vec::new();
        if let Some(real) = self.real_image.as_mut() {
            planes.push(real);
        }
        if let Some(imag) = self.imaginary_image.as_mut() {
            planes.push(imag);
        }
        for plane in planes {
            for y in 0..height {
                for x in 0..width {
                    let i = y * width + x;
                    if !skip_normalization {
                        plane[i] *= scale;
                    }
                    plane[i] /= corr_x[x] * corr_y[y];
                }
            }
        }
    }

    pub fn real_image(&self) -> &[f64] {
        self.real_image.as_deref().expect("prepare_w_layers was not called")
    }

    pub fn imaginary_image(&self) -> Option<&[f64]> {
        self.imaginary_image.as_deref()
    }

    /// Move the accumulated real plane out of the gridder.
    pub fn take_real_image(&mut self) -> ImageBuffer {
        self.real_image.take().expect("prepare_w_layers was not called")
    }

    pub fn take_imaginary_image(&mut self) -> Option<ImageBuffer> {
        self.imaginary_image.take()
    }

    /// Adopt a replacement plane, e.g. after external resampling, so that
    /// downstream consumers observe the final size.
    pub fn replace_real_image_buffer(&mut self, buffer: ImageBuffer) {
        self.real_image = Some(buffer);
    }

    pub fn replace_imaginary_image_buffer(&mut self, buffer: ImageBuffer) {
        self.imaginary_image = Some(buffer);
    }

    /// Samples gridded over all finished passes.
    pub fn samples_gridded(&self) -> u64 {
        self.samples_gridded
    }
}
