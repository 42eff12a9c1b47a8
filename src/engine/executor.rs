// src/engine/executor.rs
//
// Intra-stage parallel decomposition.
//
// Two strategies:
// - Static row chunking: the output is split into contiguous row ranges, one
//   rayon task per range. Each task owns a disjoint `&mut` slice.
// - Dynamic work items: every destination coordinate goes through a bounded
//   flume channel drained by a fixed set of scoped worker threads. Results
//   land in per-pixel atomic slots, so workers never share a write target.
//
// Both fall back to a plain loop on the calling thread for small canvases or
// when parallelism is disabled. Output does not depend on the path taken.

use super::pool::get_pool;
use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_MIN_PARALLEL_PIXELS, MAX_CONCURRENCY};
use image::{ImageBuffer, Pixel, Rgba, RgbaImage};
use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::trace;

/// Execution settings shared by every algorithm built from one config.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Workers per stage. Values outside `1..=MAX_CONCURRENCY` are clamped
    /// when work is dispatched.
    pub concurrency: usize,
    pub parallel: bool,
    pub min_parallel_pixels: u64,
    /// Work channel window for the dynamic strategy. `None` sizes the channel
    /// to the whole canvas.
    pub work_queue_capacity: Option<usize>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            parallel: true,
            min_parallel_pixels: DEFAULT_MIN_PARALLEL_PIXELS,
            work_queue_capacity: None,
        }
    }
}

impl ExecutionOptions {
    pub fn sequential() -> Self {
        Self {
            concurrency: 1,
            parallel: false,
            ..Self::default()
        }
    }

    /// Whether a canvas of `pixels` is worth splitting across workers.
    pub fn runs_parallel(&self, pixels: u64) -> bool {
        self.parallel && self.concurrency > 1 && pixels >= self.min_parallel_pixels
    }

    /// Worker count actually used for a stage.
    pub fn workers(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }
}

/// One destination coordinate for the dynamic strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkItem {
    pub x: u32,
    pub y: u32,
}

/// Split `height` rows into at most `workers` contiguous ranges.
///
/// Chunk size is `max(1, height / workers)`; the last range takes the
/// remainder and empty ranges are dropped. There are never more ranges than
/// rows.
pub fn row_ranges(height: u32, workers: usize) -> Vec<Range<u32>> {
    let workers = u32::try_from(workers.max(1))
        .unwrap_or(u32::MAX)
        .min(height.max(1));
    let chunk = (height / workers).max(1);
    let mut ranges = Vec::with_capacity(workers as usize);
    for i in 0..workers {
        let start = i.saturating_mul(chunk);
        if start >= height {
            break;
        }
        let end = if i == workers - 1 {
            height
        } else {
            (start + chunk).min(height)
        };
        ranges.push(start..end);
    }
    ranges
}

/// Run `f` over disjoint row ranges of `out`.
///
/// `f` receives the range of rows it owns and the matching raw subpixel
/// slice (`rows.len() * width * channels` bytes).
pub fn for_each_row_chunk<P, F>(out: &mut ImageBuffer<P, Vec<u8>>, exec: &ExecutionOptions, f: F)
where
    P: Pixel<Subpixel = u8>,
    F: Fn(Range<u32>, &mut [u8]) + Sync,
{
    let (width, height) = out.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let row_len = width as usize * P::CHANNEL_COUNT as usize;
    let data: &mut [u8] = &mut **out;

    let pool = match get_pool() {
        Some(pool) if exec.runs_parallel(width as u64 * height as u64) => pool,
        _ => {
            f(0..height, data);
            return;
        }
    };

    let ranges = row_ranges(height, exec.workers());
    trace!(chunks = ranges.len(), height, "row-chunk dispatch");
    let f = &f;
    pool.scope(|s| {
        let mut rest = data;
        for range in ranges {
            let len = (range.end - range.start) as usize * row_len;
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
            rest = tail;
            s.spawn(move |_| f(range, head));
        }
    });
}

/// Compute every pixel of a `width` x `height` RGBA canvas with `compute`.
///
/// In parallel mode the coordinates go through a bounded channel. With the
/// default capacity all items are queued before any worker starts; a smaller
/// `work_queue_capacity` runs the producer alongside the workers instead.
pub fn distribute_pixels<F>(width: u32, height: u32, exec: &ExecutionOptions, compute: F) -> RgbaImage
where
    F: Fn(WorkItem) -> [u8; 4] + Sync,
{
    let mut out = RgbaImage::new(width, height);
    let pixels = width as u64 * height as u64;
    if pixels == 0 {
        return out;
    }

    if !exec.runs_parallel(pixels) {
        for (x, y, px) in out.enumerate_pixels_mut() {
            *px = Rgba(compute(WorkItem { x, y }));
        }
        return out;
    }

    let total = pixels as usize;
    let capacity = exec.work_queue_capacity.unwrap_or(total).clamp(1, total);
    let workers = exec.workers().min(total);
    let slots: Vec<AtomicU32> = (0..total).map(|_| AtomicU32::new(0)).collect();
    let (tx, rx) = flume::bounded::<WorkItem>(capacity);
    trace!(capacity, workers, total, "work-item dispatch");

    std::thread::scope(|s| {
        if capacity == total {
            enqueue_all(tx, width, height);
        } else {
            s.spawn(move || enqueue_all(tx, width, height));
        }

        for _ in 0..workers {
            let rx = rx.clone();
            let slots = &slots;
            let compute = &compute;
            s.spawn(move || {
                for item in rx.iter() {
                    let idx = item.y as usize * width as usize + item.x as usize;
                    slots[idx].store(u32::from_le_bytes(compute(item)), Ordering::Relaxed);
                }
            });
        }
        // Workers hold their own receivers. Dropping ours lets a windowed
        // producer stop if every worker is gone.
        drop(rx);
    });

    for (px, slot) in out.pixels_mut().zip(slots) {
        *px = Rgba(slot.into_inner().to_le_bytes());
    }
    out
}

fn enqueue_all(tx: flume::Sender<WorkItem>, width: u32, height: u32) {
    for y in 0..height {
        for x in 0..width {
            if tx.send(WorkItem { x, y }).is_err() {
                return;
            }
        }
    }
}
