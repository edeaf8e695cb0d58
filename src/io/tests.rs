// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use num_complex::Complex;

use super::*;
use crate::bands::BandData;

fn four_channel_provider() -> MemoryMsProvider {
    let band = BandData::new(vec![100e6, 110e6, 120e6, 130e6]).unwrap();
    let rows = (0..3)
        .map(|i| MsRow {
            u: 10.0 * i as f64,
            v: -5.0,
            w: 1.0,
            data_desc_id: 0,
            data: (0..4).map(|ch| Complex::new(i as f32, ch as f32)).collect(),
            model: vec![Complex::new(0.0, 0.0); 4],
            weights: vec![1.0; 4],
        })
        .collect();
    MemoryMsProvider::new(
        MemoryMsProvider::simple_meta(2),
        MultiBandData::from_single(band),
        rows,
    )
}

#[test]
fn rows_iterate_in_storage_order() {
    let mut ms = four_channel_provider();
    ms.reset();
    let mut seen = vec![];
    while ms.current_row_available() {
        seen.push(ms.read_meta().u);
        ms.next_row();
    }
    assert_eq!(seen, vec![0.0, 10.0, 20.0]);
    // Reset rewinds.
    ms.reset();
    assert!(ms.current_row_available());
    assert_eq!(ms.row_id(), 0);
}

#[test]
fn channel_selection_narrows_reads_and_writes() {
    let mut ms = four_channel_provider().with_channel_range(1..3);
    ms.reset();
    ms.next_row();
    let mut buf = vec![Complex::new(0.0f32, 0.0); 2];
    ms.read_data(&mut buf);
    assert_abs_diff_eq!(buf[0].im, 1.0);
    assert_abs_diff_eq!(buf[1].im, 2.0);

    ms.reopen_rw();
    ms.write_model(1, &[Complex::new(9.0, 0.0), Complex::new(8.0, 0.0)]);
    assert_abs_diff_eq!(ms.rows()[1].model[1].re, 9.0);
    assert_abs_diff_eq!(ms.rows()[1].model[2].re, 8.0);
    // Channels outside the window are untouched.
    assert_abs_diff_eq!(ms.rows()[1].model[0].re, 0.0);
    assert_abs_diff_eq!(ms.rows()[1].model[3].re, 0.0);
}

#[test]
fn natural_weights_are_unit() {
    assert_abs_diff_eq!(NaturalWeights.weight(123.0, -456.0), 1.0);
}
