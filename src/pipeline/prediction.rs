// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! One prediction pass over one measurement set: a meta pre-scan (no data
//! reads), bounded calc workers degridding rows, and a single writer thread
//! owning all model I/O.

use std::thread;

use crossbeam_channel::bounded;
use crossbeam_utils::atomic::AtomicCell;
use log::debug;
use num_complex::Complex;
use num_traits::Zero;
use scopeguard::defer_on_unwind;

use super::PredictionWorkItem;
use crate::bands::MultiBandData;
use crate::gridder::WStackingGridder;
use crate::io::{MsProvider, RowMeta};

/// Degrid every row of `provider` that falls in the running pass window and
/// write the model visibilities back. Returns the number of rows processed.
pub(crate) fn process_pass(
    gridder: &WStackingGridder,
    provider: &mut dyn MsProvider,
    band: &MultiBandData,
    n_threads: usize,
) -> u64 {
    provider.reopen_rw();

    // Read all metadata up front so the writer thread contends only with
    // itself on measurement-set I/O.
    let plan = gridder.plan();
    let mut metas: Vec<(RowMeta, u64)> = Vec::new();
    provider.reset();
    while provider.current_row_available() {
        let meta = provider.read_meta();
        let cur_band = band.band(meta.data_desc_id);
        let w1 = meta.w / cur_band.longest_wavelength();
        let w2 = meta.w / cur_band.smallest_wavelength();
        if plan.is_in_layer_range(w1, w2) {
            metas.push((meta, provider.row_id()));
        }
        provider.next_row();
    }
    let rows_processed = metas.len() as u64;

    let lane_buffer_size = 2 * n_threads;
    let (calc_tx, calc_rx) = bounded::<PredictionWorkItem>(lane_buffer_size + n_threads);
    let (write_tx, write_rx) = bounded::<PredictionWorkItem>(lane_buffer_size);
    let error = AtomicCell::new(false);

    thread::scope(|scope| {
        let error = &error;

        // The single writer thread takes over the provider.
        let writer_handle = thread::Builder::new()
            .name("write".to_string())
            .spawn_scoped(scope, move || {
                defer_on_unwind! { error.store(true); }
                for item in write_rx {
                    provider.write_model(item.row_id, &item.data);
                    // The item's buffer is released here.
                }
            })
            .expect("OS can create threads");

        // Calc workers: degrid into the item's buffer, pass it on.
        let mut calc_handles = Vec::with_capacity(n_threads);
        for i in 0..n_threads {
            let calc_rx = calc_rx.clone();
            let write_tx = write_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("predict-{i}"))
                .spawn_scoped(scope, move || {
                    defer_on_unwind! { error.store(true); }
                    for mut item in calc_rx {
                        gridder.sample_data(
                            &mut item.data,
                            item.data_desc_id,
                            item.u,
                            item.v,
                            item.w,
                        );
                        if write_tx.send(item).is_err() {
                            return;
                        }
                    }
                })
                .expect("OS can create threads");
            calc_handles.push(handle);
        }
        // Workers hold the only clones now; the writer's queue closes when
        // the last worker exits.
        drop(calc_rx);
        drop(write_tx);

        for (meta, row_id) in &metas {
            if error.load() {
                break;
            }
            let n = band.band(meta.data_desc_id).channel_count();
            let item = PredictionWorkItem {
                u: meta.u,
                v: meta.v,
                w: meta.w,
                data_desc_id: meta.data_desc_id,
                row_id: *row_id,
                data: vec![Complex::zero(); n],
            };
            if calc_tx.send(item).is_err() {
                break;
            }
        }
        drop(calc_tx);

        for handle in calc_handles {
            handle.join().unwrap();
        }
        writer_handle.join().unwrap();
    });

    debug!("Rows degridded this pass: {rows_processed}");
    rows_processed
}
