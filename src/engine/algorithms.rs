// src/engine/algorithms.rs
//
// Concrete transform algorithms.
//
// Each variant is built once from an `Operation` descriptor plus the shared
// execution options, normalizes its parameters at construction, and is then
// stateless per call. All variants are `Send + Sync` and can be shared across
// requests.

mod blur;
mod flip;
mod grayscale;
mod rotate;
mod sobel;

pub use blur::{BoxBlur, GaussianBlur, GaussianKernel};
pub use flip::UpsideDown;
pub use grayscale::Grayscale;
pub use rotate::{Rotate, ShearRotate};
pub use sobel::SobelEdgeDetector;

use super::executor::ExecutionOptions;
use super::raster::RasterBuffer;
use crate::ops::{Operation, OperationContract};

/// Smallest sigma a gaussian kernel is built with. At this value every
/// off-center weight underflows and the kernel is the identity.
pub const MIN_SIGMA: f64 = 1e-3;

/// Name and execution settings embedded in every algorithm.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessorBase {
    name: &'static str,
    exec: ExecutionOptions,
}

impl ProcessorBase {
    pub fn new(name: &'static str, exec: ExecutionOptions) -> Self {
        Self { name, exec }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn exec(&self) -> &ExecutionOptions {
        &self.exec
    }
}

/// Largest kernel side. Larger requests are lowered to it. At this size the
/// box blur accumulator (`size² × 0xffff`) still fits in a u32.
pub const MAX_KERNEL_SIZE: u32 = 255;

/// Kernel sizes are odd and in `1..=MAX_KERNEL_SIZE`: `<= 0` becomes 1, even
/// sizes grow by one.
pub fn normalize_kernel_size(size: i32) -> u32 {
    if size <= 0 {
        1
    } else if size as u32 >= MAX_KERNEL_SIZE {
        MAX_KERNEL_SIZE
    } else if size % 2 == 0 {
        size as u32 + 1
    } else {
        size as u32
    }
}

/// Non-positive or non-finite sigma becomes `MIN_SIGMA`.
pub fn normalize_sigma(sigma: f64) -> f64 {
    if sigma.is_finite() && sigma > MIN_SIGMA {
        sigma
    } else {
        MIN_SIGMA
    }
}

#[derive(Clone, Debug)]
pub enum Algorithm {
    Grayscale(Grayscale),
    BoxBlur(BoxBlur),
    GaussianBlur(GaussianBlur),
    Sobel(SobelEdgeDetector),
    Rotate(Rotate),
    ShearRotate(ShearRotate),
    UpsideDown(UpsideDown),
}

impl Algorithm {
    pub fn from_operation(op: &Operation, exec: ExecutionOptions) -> Self {
        match *op {
            Operation::Grayscale => Algorithm::Grayscale(Grayscale::new(exec)),
            Operation::BoxBlur { size } => Algorithm::BoxBlur(BoxBlur::new(size, exec)),
            Operation::GaussianBlur { sigma, size } => {
                Algorithm::GaussianBlur(GaussianBlur::new(sigma, size, exec))
            }
            Operation::EdgeDetect { threshold } => {
                Algorithm::Sobel(SobelEdgeDetector::new(threshold, exec))
            }
            Operation::Rotate { degrees } => Algorithm::Rotate(Rotate::new(degrees, exec)),
            Operation::ShearRotate { degrees } => {
                Algorithm::ShearRotate(ShearRotate::new(degrees, exec))
            }
            Operation::FlipVertical => Algorithm::UpsideDown(UpsideDown::new(exec)),
        }
    }

    pub fn process(&self, input: &RasterBuffer) -> RasterBuffer {
        match self {
            Algorithm::Grayscale(a) => a.process(input),
            Algorithm::BoxBlur(a) => a.process(input),
            Algorithm::GaussianBlur(a) => a.process(input),
            Algorithm::Sobel(a) => a.process(input),
            Algorithm::Rotate(a) => a.process(input),
            Algorithm::ShearRotate(a) => a.process(input),
            Algorithm::UpsideDown(a) => a.process(input),
        }
    }

    fn base(&self) -> &ProcessorBase {
        match self {
            Algorithm::Grayscale(a) => &a.base,
            Algorithm::BoxBlur(a) => &a.base,
            Algorithm::GaussianBlur(a) => &a.base,
            Algorithm::Sobel(a) => &a.base,
            Algorithm::Rotate(a) => &a.base,
            Algorithm::ShearRotate(a) => &a.base,
            Algorithm::UpsideDown(a) => &a.base,
        }
    }

    pub fn name(&self) -> &'static str {
        self.base().name()
    }

    pub fn exec(&self) -> &ExecutionOptions {
        self.base().exec()
    }

    /// Descriptor with the normalized parameters this instance runs with.
    pub fn operation(&self) -> Operation {
        match self {
            Algorithm::Grayscale(_) => Operation::Grayscale,
            Algorithm::BoxBlur(a) => Operation::BoxBlur {
                size: a.size() as i32,
            },
            Algorithm::GaussianBlur(a) => Operation::GaussianBlur {
                sigma: a.kernel().sigma(),
                size: a.kernel().size() as i32,
            },
            Algorithm::Sobel(a) => Operation::EdgeDetect {
                threshold: a.threshold(),
            },
            Algorithm::Rotate(a) => Operation::Rotate {
                degrees: a.degrees(),
            },
            Algorithm::ShearRotate(a) => Operation::ShearRotate {
                degrees: a.degrees(),
            },
            Algorithm::UpsideDown(_) => Operation::FlipVertical,
        }
    }

    pub fn contract(&self) -> OperationContract {
        self.operation().contract()
    }
}
