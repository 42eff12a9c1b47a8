use image::{GrayImage, Luma, Rgba, RgbaImage};
use manuscript_raster::engine::{
    run_pipeline, Algorithm, ExecutionOptions, GaussianKernel, PipelineAssembler, RasterBuffer,
};
use manuscript_raster::ops::{Operation, TransformRequest};
use manuscript_raster::ProcessingConfig;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn create_test_image(width: u32, height: u32, seed: u8) -> RasterBuffer {
    RasterBuffer::Rgba(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x.wrapping_mul(37) as u8).wrapping_add(seed),
            (y.wrapping_mul(53) as u8) ^ seed,
            ((x + y) as u8).wrapping_mul(7),
            255,
        ])
    }))
}

fn create_gray_image(width: u32, height: u32, seed: u8) -> RasterBuffer {
    RasterBuffer::Luma(GrayImage::from_fn(width, height, |x, y| {
        Luma([((x * 31 + y * 17) as u8).wrapping_add(seed)])
    }))
}

fn sequential() -> ExecutionOptions {
    ExecutionOptions::sequential()
}

fn parallel(concurrency: usize, window: Option<usize>) -> ExecutionOptions {
    ExecutionOptions {
        concurrency,
        parallel: true,
        min_parallel_pixels: 0,
        work_queue_capacity: window,
    }
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::Grayscale),
        (-2i32..=7).prop_map(|size| Operation::BoxBlur { size }),
        (0.1f64..3.0, -1i32..=7).prop_map(|(sigma, size)| Operation::GaussianBlur { sigma, size }),
        any::<u8>().prop_map(|threshold| Operation::EdgeDetect { threshold }),
        (-360.0f64..360.0).prop_map(|degrees| Operation::Rotate { degrees }),
        prop_oneof![Just(90.0), Just(180.0), Just(270.0), Just(-90.0), Just(450.0)]
            .prop_map(|degrees| Operation::ShearRotate { degrees }),
        Just(Operation::FlipVertical),
    ]
}

fn image_strategy() -> impl Strategy<Value = RasterBuffer> {
    (1u32..=24, 1u32..=24, any::<u8>(), any::<bool>()).prop_map(|(w, h, seed, gray)| {
        if gray {
            create_gray_image(w, h, seed)
        } else {
            create_test_image(w, h, seed)
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn grayscale_is_idempotent(img in image_strategy()) {
        let gray = Algorithm::from_operation(&Operation::Grayscale, sequential());
        let once = gray.process(&img);
        let twice = gray.process(&once);
        prop_assert!(once.is_luma());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn flip_is_involutive(img in image_strategy()) {
        let flip = Algorithm::from_operation(&Operation::FlipVertical, sequential());
        let back = flip.process(&flip.process(&img));
        prop_assert_eq!(back, img);
    }

    #[test]
    fn blurs_preserve_dimensions(
        img in image_strategy(),
        size in -3i32..=9,
        sigma in 0.0f64..4.0,
    ) {
        for op in [Operation::BoxBlur { size }, Operation::GaussianBlur { sigma, size }] {
            let out = Algorithm::from_operation(&op, sequential()).process(&img);
            prop_assert_eq!(out.dimensions(), img.dimensions());
            prop_assert!(!out.is_luma());
        }
    }

    #[test]
    fn gaussian_kernel_sums_to_one(sigma in 0.01f64..20.0, half in 0i32..=7) {
        let kernel = GaussianKernel::new(sigma, half * 2 + 1);
        let sum: f64 = kernel.weights().iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-6);
        prop_assert!(kernel.weights().iter().all(|w| *w >= 0.0));
    }

    #[test]
    fn sobel_output_is_binary(img in image_strategy(), threshold in any::<u8>()) {
        let out = Algorithm::from_operation(&Operation::EdgeDetect { threshold }, sequential())
            .process(&img);
        match out {
            RasterBuffer::Luma(gray) => {
                prop_assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
            }
            RasterBuffer::Rgba(_) => prop_assert!(false, "sobel must produce luma"),
        }
    }

    #[test]
    fn parallel_matches_sequential(
        op in operation_strategy(),
        img in image_strategy(),
        concurrency in 2usize..=6,
        window in prop::option::of(1usize..=16),
    ) {
        let seq = Algorithm::from_operation(&op, sequential()).process(&img);
        let par = Algorithm::from_operation(&op, parallel(concurrency, window)).process(&img);
        prop_assert_eq!(seq, par);
    }

    #[test]
    fn rotate_zero_is_identity(w in 1u32..=20, h in 1u32..=20, seed in any::<u8>()) {
        let img = create_test_image(w, h, seed);
        let out = Algorithm::from_operation(&Operation::Rotate { degrees: 0.0 }, sequential())
            .process(&img);
        prop_assert_eq!(out, img);
    }

    #[test]
    fn four_quarter_shears_preserve_dimensions(w in 1u32..=20, h in 1u32..=20, seed in any::<u8>()) {
        let img = create_test_image(w, h, seed);
        let quarter = Algorithm::from_operation(&Operation::ShearRotate { degrees: 90.0 }, sequential());
        let mut out = img.clone();
        for _ in 0..4 {
            out = quarter.process(&out);
            prop_assert_eq!(out.dimensions(), (w, h));
        }
    }

    #[test]
    fn shears_only_move_or_drop_pixels(
        half in 0u32..=10,
        degrees in prop::sample::select(vec![90.0, -90.0, 270.0, 30.0, 135.0]),
        seed in any::<u8>(),
    ) {
        let side = half * 2 + 1;
        let img = create_test_image(side, side, seed);
        let out = Algorithm::from_operation(&Operation::ShearRotate { degrees }, sequential())
            .process(&img);
        let source: std::collections::HashSet<[u8; 4]> = (0..side)
            .flat_map(|y| (0..side).map(move |x| (x, y)))
            .map(|(x, y)| img.rgba_at(x, y))
            .collect();
        for y in 0..side {
            for x in 0..side {
                let px = out.rgba_at(x, y);
                prop_assert!(px == [0, 0, 0, 0] || source.contains(&px));
            }
        }
        // the center pixel of an odd square never moves
        prop_assert_eq!(out.rgba_at(half, half), img.rgba_at(half, half));
    }

    #[test]
    fn pipeline_matches_stage_by_stage(
        ops in prop::collection::vec(operation_strategy(), 0..5),
        img in image_strategy(),
    ) {
        let algorithms: Vec<Algorithm> = ops
            .iter()
            .map(|op| Algorithm::from_operation(op, parallel(3, None)))
            .collect();
        let mut expected = img.clone();
        for algorithm in &algorithms {
            expected = algorithm.process(&expected);
        }
        let out = run_pipeline(img, &algorithms).unwrap();
        prop_assert_eq!(out.buffer, expected);
        prop_assert_eq!(out.timings.len(), algorithms.len());
    }

    #[test]
    fn request_key_order_does_not_matter(
        flags in prop::collection::vec(any::<bool>(), 6),
        angle in prop_oneof![Just(None), Just(Some(90.0)), Just(Some(33.0))],
    ) {
        let keys = ["upsideDown", "grayscale", "boxBlur", "gaussianBlur", "edgeDetection"];
        let mut entries: Vec<(String, Value)> = keys
            .iter()
            .zip(&flags)
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        if let Some(a) = angle {
            entries.push(("rotationAngle".to_string(), json!(a)));
        }

        let forward: Map<String, Value> = entries.iter().cloned().collect();
        let reverse: Map<String, Value> = entries.iter().rev().cloned().collect();

        let assembler = PipelineAssembler::new(&ProcessingConfig::default());
        let a = assembler.for_request(&TransformRequest::from_map(&forward)).names();
        let b = assembler.for_request(&TransformRequest::from_map(&reverse)).names();
        prop_assert_eq!(&a, &b);

        let order = ["Upside Down", "Rotate", "Shear Rotate", "Grayscale", "Box Blur", "Gaussian Blur", "Sobel Edge Detection"];
        let positions: Vec<usize> = a
            .iter()
            .map(|name| order.iter().position(|o| o == name).unwrap())
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
