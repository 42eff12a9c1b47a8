// src/engine/common.rs
//
// Common utilities shared across engine modules.

use crate::error::RasterError;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

pub type EngineResult<T> = std::result::Result<T, RasterError>;

/// Run `f`, turning a panic into `RasterError::InternalPanic`.
///
/// `context` names the step (a codec call or a pipeline stage) so the error
/// tells the caller where it died. Codec crates and algorithm stages both run
/// under this wrapper; nothing in the engine lets a panic unwind into the
/// caller.
pub fn run_with_panic_policy<T, F>(context: &str, f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(RasterError::internal_panic(format!(
            "{context} panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_results_through() {
        let ok: EngineResult<u8> = run_with_panic_policy("noop", || Ok(7));
        assert_eq!(ok.unwrap(), 7);

        let err: EngineResult<u8> =
            run_with_panic_policy("decode", || Err(RasterError::decode_failed("bad header")));
        assert!(matches!(err, Err(RasterError::DecodeFailed { .. })));
    }

    #[test]
    fn panic_becomes_internal_error() {
        let result: EngineResult<()> =
            run_with_panic_policy("stage 1 (Box Blur)", || panic!("kernel exploded"));
        match result {
            Err(RasterError::InternalPanic { message }) => {
                assert!(message.contains("stage 1 (Box Blur)"));
                assert!(message.contains("kernel exploded"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
