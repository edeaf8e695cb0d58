// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pooled allocation of large image buffers.
//!
//! A multi-pass inversion allocates and releases the same large planes once
//! per pass; recycling them through a pool keeps the pages warm instead of
//! paying the fault cost on every pass.


use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use num_complex::Complex;

#[derive(Default)]
struct Pools {
    real: Mutex<Vec<Vec<f64>>>,
    complex: Mutex<Vec<Vec<Complex<f64>>>>,
}

/// Thread-safe pooled allocator for image planes and layer grids. Cheap to
/// clone; clones share the pool.
#[derive(Clone, Default)]
pub struct ImageBufferAllocator {
    pools: Arc<Pools>,
}

impl ImageBufferAllocator {
    pub fn new() -> ImageBufferAllocator {
        ImageBufferAllocator::default()
    }

    /// Allocate a zeroed plane of `len` doubles, reusing a pooled buffer of
    /// the same length when one is available.
    pub fn allocate(&self, len: usize) -> ImageBuffer {
        let mut pool = self.pools.real.lock().unwrap();
        let data = match pool.iter().position(|b| b.len() == len) {
            Some(i) => {
                let mut data = pool.swap_remove(i);
                data.fill(0.0);
                data
            }
            None => vec![0.0; len],
        };
        drop(pool);
        ImageBuffer {
            data,
            pools: Arc::clone(&self.pools),
        }
    }

    /// Allocate a zeroed complex grid of `len` cells.
    pub fn allocate_complex(&self, len: usize) -> ComplexBuffer {
        let mut pool = self.pools.complex.lock().unwrap();
        let data = match pool.iter().position(|b| b.len() == len) {
            Some(i) => {
                let mut data = pool.swap_remove(i);
                data.fill(Complex::new(0.0, 0.0));
                data
            }
            None => vec![Complex::new(0.0, 0.0); len],
        };
        drop(pool);
        ComplexBuffer {
            data,
            pools: Arc::clone(&self.pools),
        }
    }

    #[cfg(test)]
    fn pooled_real_count(&self) -> usize {
        self.pools.real.lock().unwrap().len()
    }
}

/// A pooled plane of doubles. Returns to the pool on drop.
pub struct ImageBuffer {
    data: Vec<f64>,
    pools: Arc<Pools>,
}

impl Drop for ImageBuffer {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.pools.real.lock().unwrap().push(data);
    }
}

impl Deref for ImageBuffer {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.data
    }
}

impl DerefMut for ImageBuffer {
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

/// A pooled complex grid. Returns to the pool on drop.
pub struct ComplexBuffer {
    data: Vec<Complex<f64>>,
    pools: Arc<Pools>,
}

impl Drop for ComplexBuffer {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.pools.complex.lock().unwrap().push(data);
    }
}

impl Deref for ComplexBuffer {
    type Target = [Complex<f64>];

    fn deref(&self) -> &[Complex<f64>] {
        &self.data
    }
}

impl DerefMut for ComplexBuffer {
    fn deref_mut(&mut self) -> &mut [Complex<f64>] {
        &mut self.data
    }
}
