#![no_main]

use manuscript_raster::engine::decode_image;
use manuscript_raster::{ImageProcessor, ProcessingConfig, TransformRequest};
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

fn processor() -> &'static ImageProcessor {
    static PROCESSOR: OnceLock<ImageProcessor> = OnceLock::new();
    PROCESSOR.get_or_init(|| {
        ImageProcessor::new(&ProcessingConfig {
            optimize_png: false,
            ..ProcessingConfig::default()
        })
    })
}

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must come back as an error, never a panic.
    if decode_image(data).is_err() {
        return;
    }
    let _ = processor().apply_transformations(data, &TransformRequest::default());
});
