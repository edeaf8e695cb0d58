// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! One inversion pass over one measurement set: a producer row scan feeding
//! a bounded work queue, a fan-out stage expanding rows to per-channel
//! samples, and one gridding worker per lane.

use std::mem;
use std::thread;

use crossbeam_channel::bounded;
use crossbeam_utils::atomic::AtomicCell;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::debug;
use num_complex::Complex;
use num_traits::Zero;
use scopeguard::defer_on_unwind;

use super::{rotate_visibilities, InversionWorkItem, InversionWorkSample};
use crate::bands::MultiBandData;
use crate::constants::INVERSION_WORK_LANE_CAPACITY;
use crate::gridder::GridderLane;
use crate::io::{ImageWeights, MsProvider, VisibilityWeightingMode, WeightMode};
use crate::PROGRESS_BARS;

/// The per-run settings the producer needs to turn rows into work items.
pub(crate) struct InversionContext<'a> {
    pub(crate) do_image_psf: bool,
    pub(crate) do_subtract_model: bool,
    pub(crate) visibility_weighting: VisibilityWeightingMode,
    pub(crate) weight_mode: WeightMode,
    pub(crate) phase_centre_dl: f64,
    pub(crate) phase_centre_dm: f64,
    pub(crate) weights: &'a dyn ImageWeights,
}

pub(crate) struct PassStats {
    pub(crate) rows_read: u64,
    pub(crate) weight_sum: f64,
}

/// Stream every accepted row of `provider` through the lanes and give the
/// lanes back. The producer runs on the calling thread; the fan-out stage
/// and one worker per lane run on their own threads, connected by bounded
/// queues so a slow gridder applies backpressure instead of growing memory.
pub(crate) fn process_pass(
    lanes: Vec<GridderLane>,
    provider: &mut dyn MsProvider,
    band: &MultiBandData,
    ctx: &InversionContext,
) -> (Vec<GridderLane>, PassStats) {
    let plan = lanes[0].plan().clone();
    let n_lanes = lanes.len();
    // Samples of the same lane are batched before they touch the channel;
    // the channel operation was the dominant hotspot without this.
    let lane_buffer_size = 2 * n_lanes;
    let batch_size = band.first_band().channel_count().max(lane_buffer_size);

    let (work_tx, work_rx) = bounded::<InversionWorkItem>(INVERSION_WORK_LANE_CAPACITY);
    let error = AtomicCell::new(false);

    thread::scope(|scope| {
        let error = &error;

        // Gridding workers, one per lane. Each owns its lane for the
        // duration of the pass and hands it back through its join result.
        let mut sample_txs = Vec::with_capacity(n_lanes);
        let mut worker_handles = Vec::with_capacity(n_lanes);
        for lane in lanes {
            let (tx, rx) = bounded::<Vec<InversionWorkSample>>(lane_buffer_size.max(4));
            sample_txs.push(tx);
            let handle = thread::Builder::new()
                .name(format!("grid-{}", lane.lane_index()))
                .spawn_scoped(scope, move || {
                    defer_on_unwind! { error.store(true); }
                    let mut lane = lane;
                    for samples in rx {
                        for s in samples {
                            lane.add_data_sample(s.sample, s.u_lambda, s.v_lambda, s.w_lambda);
                        }
                    }
                    lane
                })
                .expect("OS can create threads");
            worker_handles.push(handle);
        }

        // Fan-out stage: expand items to per-channel samples and route each
        // to the lane owning its layer. `layer mod lanes` is what guarantees
        // a single writer per layer.
        let fanout_plan = plan.clone();
        let fanout_handle = thread::Builder::new()
            .name("fan-out".to_string())
            .spawn_scoped(scope, move || {
                defer_on_unwind! { error.store(true); }
                let mut buffers: Vec<Vec<InversionWorkSample>> =
                    (0..n_lanes).map(|_| Vec::with_capacity(batch_size)).collect();
                for item in work_rx {
                    if error.load() {
                        break;
                    }
                    let cur_band = band.band(item.data_desc_id);
                    for ch in 0..cur_band.channel_count() {
                        let lambda = cur_band.channel_wavelength(ch);
                        let sample = InversionWorkSample {
                            sample: item.data[ch],
                            u_lambda: item.u / lambda,
                            v_lambda: item.v / lambda,
                            w_lambda: item.w / lambda,
                        };
                        let dest = fanout_plan.w_to_layer(sample.w_lambda) % n_lanes;
                        buffers[dest].push(sample);
                        if buffers[dest].len() >= batch_size {
                            let full =
                                mem::replace(&mut buffers[dest], Vec::with_capacity(batch_size));
                            if sample_txs[dest].send(full).is_err() {
                                return;
                            }
                        }
                    }
                    // The item (and its channel buffer) is released here.
                }
                for (dest, buffer) in buffers.into_iter().enumerate() {
                    if !buffer.is_empty() {
                        let _ = sample_txs[dest].send(buffer);
                    }
                }
                // Dropping the senders closes all lanes.
            })
            .expect("OS can create threads");

        // Producer: scan the measurement set on this thread (the provider is
        // not assumed thread-safe).
        let stats = produce_rows(work_tx, provider, band, &plan, ctx, error);

        fanout_handle.join().unwrap();
        let lanes = worker_handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();
        (lanes, stats)
    })
}

fn produce_rows(
    work_tx: crossbeam_channel::Sender<InversionWorkItem>,
    provider: &mut dyn MsProvider,
    band: &MultiBandData,
    plan: &crate::gridder::WLayerPlan,
    ctx: &InversionContext,
    error: &AtomicCell<bool>,
) -> PassStats {
    let denormal_centre = ctx.phase_centre_dl != 0.0 || ctx.phase_centre_dm != 0.0;
    let max_channels = band.max_channels();
    let mut model_buffer = vec![Complex::<f32>::zero(); max_channels];
    let mut weight_buffer = vec![0.0f32; max_channels];
    let mut rows_read = 0u64;
    let mut weight_sum = 0.0f64;

    let progress = ProgressBar::with_draw_target(
        Some(provider.row_count()),
        if PROGRESS_BARS.load() {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template("{msg:16}: [{wide_bar:.blue}] {pos}/{len} rows")
            .unwrap()
            .progress_chars("=> "),
    )
    .with_message("Gridding");

    provider.reset();
    while provider.current_row_available() {
        if error.load() {
            break;
        }
        let meta = provider.read_meta();
        let cur_band = band.band(meta.data_desc_id);
        let w1 = meta.w / cur_band.longest_wavelength();
        let w2 = meta.w / cur_band.smallest_wavelength();
        if plan.is_in_layer_range(w1, w2) {
            let n = cur_band.channel_count();
            let mut item = InversionWorkItem {
                u: meta.u,
                v: meta.v,
                w: meta.w,
                data_desc_id: meta.data_desc_id,
                data: vec![Complex::zero(); n],
            };

            if ctx.do_image_psf {
                provider.read_weights(&mut weight_buffer[..n]);
                for (vis, &wt) in item.data.iter_mut().zip(&weight_buffer[..n]) {
                    *vis = Complex::new(wt, 0.0);
                }
                if denormal_centre {
                    let lm_sqrt = (1.0
                        - ctx.phase_centre_dl * ctx.phase_centre_dl
                        - ctx.phase_centre_dm * ctx.phase_centre_dm)
                        .sqrt();
                    let shift_factor = std::f64::consts::TAU * meta.w * (lm_sqrt - 1.0);
                    rotate_visibilities(cur_band, shift_factor, &mut item.data);
                }
            } else {
                provider.read_data(&mut item.data);
            }

            if ctx.do_subtract_model {
                provider.read_model(&mut model_buffer[..n]);
                for (vis, &model) in item.data.iter_mut().zip(&model_buffer[..n]) {
                    *vis -= model;
                }
            }

            provider.read_weights(&mut weight_buffer[..n]);
            match ctx.visibility_weighting {
                // The provider has already pre-weighted the visibilities.
                VisibilityWeightingMode::Normal => (),
                VisibilityWeightingMode::Squared => {
                    for (vis, &wt) in item.data.iter_mut().zip(&weight_buffer[..n]) {
                        *vis *= wt;
                    }
                }
                VisibilityWeightingMode::Unit => {
                    for (vis, &wt) in item.data.iter_mut().zip(&weight_buffer[..n]) {
                        if wt == 0.0 {
                            *vis = Complex::zero();
                        } else {
                            *vis /= wt;
                        }
                    }
                }
            }

            match ctx.weight_mode {
                WeightMode::Natural | WeightMode::Uniform | WeightMode::Briggs => {
                    for ch in 0..n {
                        let lambda = cur_band.channel_wavelength(ch);
                        let weight = ctx.weights.weight(item.u / lambda, item.v / lambda);
                        item.data[ch] *= weight as f32;
                        weight_sum += weight * f64::from(weight_buffer[ch]);
                    }
                }
                WeightMode::Distance => {
                    let baseline =
                        (item.u * item.u + item.v * item.v + item.w * item.w).sqrt();
                    for &wt in &weight_buffer[..n] {
                        weight_sum += f64::from(wt) * baseline;
                    }
                }
            }

            if work_tx.send(item).is_err() {
                // The fan-out stage is gone; it only exits early on error.
                break;
            }
            rows_read += 1;
        }
        provider.next_row();
        progress.inc(1);
    }
    progress.finish_and_clear();
    debug!("Rows sent to the gridding lanes this pass: {rows_read}");
    // Closing the work queue is the end-of-stream signal downstream.
    drop(work_tx);

    PassStats {
        rows_read,
        weight_sum,
    }
}
