#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use image::{Rgba, RgbaImage};
use manuscript_raster::engine::{run_pipeline, Algorithm, ExecutionOptions, RasterBuffer};
use manuscript_raster::ops::Operation;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct OperationSeed {
    kind: u8,
    a: i16,
    b: i16,
}

#[derive(Arbitrary, Debug)]
struct ExecSeed {
    concurrency: u8,
    parallel: bool,
    window: Option<u16>,
}

fn build_image(data: &[u8]) -> RasterBuffer {
    let width = data.first().copied().unwrap_or(0) as u32 % 48 + 1;
    let height = data.get(1).copied().unwrap_or(0) as u32 % 48 + 1;
    RasterBuffer::Rgba(RgbaImage::from_fn(width, height, |x, y| {
        let i = (y * width + x) as usize * 3;
        let at = |k: usize| data.get((i + k) % data.len().max(1)).copied().unwrap_or(0);
        Rgba([at(0), at(1), at(2), 255])
    }))
}

fn seeds_to_ops(seeds: Vec<OperationSeed>) -> Vec<Operation> {
    seeds
        .into_iter()
        .take(6)
        .map(|seed| match seed.kind % 7 {
            0 => Operation::Grayscale,
            1 => Operation::BoxBlur {
                size: (seed.a % 9) as i32,
            },
            2 => Operation::GaussianBlur {
                sigma: seed.b as f64 / 100.0,
                size: (seed.a % 9) as i32,
            },
            3 => Operation::EdgeDetect {
                threshold: seed.a as u8,
            },
            4 => Operation::Rotate {
                degrees: seed.a as f64 + seed.b as f64 / 1000.0,
            },
            5 => Operation::ShearRotate {
                degrees: (seed.a % 8) as f64 * 90.0,
            },
            _ => Operation::FlipVertical,
        })
        .collect()
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);
    let exec: ExecSeed = match ExecSeed::arbitrary(&mut unstructured) {
        Ok(v) => v,
        Err(_) => return,
    };
    let seeds: Vec<OperationSeed> = match Vec::arbitrary(&mut unstructured) {
        Ok(v) => v,
        Err(_) => return,
    };

    let options = ExecutionOptions {
        concurrency: exec.concurrency as usize % 8 + 1,
        parallel: exec.parallel,
        min_parallel_pixels: 0,
        work_queue_capacity: exec.window.map(usize::from),
    };
    let sequential = ExecutionOptions::sequential();

    let ops = seeds_to_ops(seeds);
    let img = build_image(data);
    let par: Vec<Algorithm> = ops.iter().map(|op| Algorithm::from_operation(op, options)).collect();
    let seq: Vec<Algorithm> = ops.iter().map(|op| Algorithm::from_operation(op, sequential)).collect();

    let a = run_pipeline(img.clone(), &par).map(|out| out.buffer);
    let b = run_pipeline(img, &seq).map(|out| out.buffer);
    if let (Ok(a), Ok(b)) = (a, b) {
        assert_eq!(a, b, "worker count changed the output for {ops:?}");
    }
});
