// src/engine/pipeline.rs
//
// Staged pipeline runner.
//
// Every algorithm becomes one stage on its own scoped thread. Stages are
// chained by single-slot channels: stage i blocks until stage i-1 hands over
// its finished buffer, processes it, passes the result on and exits. The
// caller blocks on the last channel. Inside a stage the algorithm spreads its
// work across the executor; across stages execution is strictly sequential.

use super::algorithms::Algorithm;
use super::common::{run_with_panic_policy, EngineResult};
use super::raster::RasterBuffer;
use crate::error::RasterError;
use crate::ops::{OperationContract, OperationEffect};
use std::time::Instant;
use tracing::debug;

/// Wall time spent in one stage.
#[derive(Clone, Debug, PartialEq)]
pub struct StageTiming {
    pub name: &'static str,
    pub duration_ms: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOutput {
    pub buffer: RasterBuffer,
    pub timings: Vec<StageTiming>,
}

/// Pixel layout tracked through the stage contracts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    Rgba,
    Luma,
}

impl PixelLayout {
    pub fn of(buffer: &RasterBuffer) -> Self {
        if buffer.is_luma() {
            PixelLayout::Luma
        } else {
            PixelLayout::Rgba
        }
    }

    fn after(self, contract: &OperationContract) -> Self {
        if contract.effects.contains(OperationEffect::PRODUCES_LUMA) {
            PixelLayout::Luma
        } else if contract.effects.contains(OperationEffect::PRODUCES_RGBA) {
            PixelLayout::Rgba
        } else {
            // PRESERVES_LAYOUT
            self
        }
    }
}

/// Ordered list of algorithms. Order is significant.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    stages: Vec<Algorithm>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, algorithm: Algorithm) {
        self.stages.push(algorithm);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[Algorithm] {
        &self.stages
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Algorithm::name).collect()
    }

    pub fn run(&self, input: RasterBuffer) -> EngineResult<PipelineOutput> {
        run_pipeline(input, &self.stages)
    }
}

impl From<Vec<Algorithm>> for Pipeline {
    fn from(stages: Vec<Algorithm>) -> Self {
        Self { stages }
    }
}

impl FromIterator<Algorithm> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Algorithm>>(iter: I) -> Self {
        Self {
            stages: iter.into_iter().collect(),
        }
    }
}

type Handoff = EngineResult<(RasterBuffer, Vec<StageTiming>)>;

/// Run `algorithms` over `input` as a chain of stages.
///
/// An empty list hands the input back untouched without spawning anything.
/// A stage that panics ends the run with `RasterError::InternalPanic` naming
/// it; later stages forward the error without processing.
pub fn run_pipeline(input: RasterBuffer, algorithms: &[Algorithm]) -> EngineResult<PipelineOutput> {
    if algorithms.is_empty() {
        debug!(target: "manuscript_raster::pipeline", "empty pipeline, returning input");
        return Ok(PipelineOutput {
            buffer: input,
            timings: Vec::new(),
        });
    }

    let (width, height) = input.dimensions();
    let predicted = predicted_layout(&input, algorithms);
    debug!(
        target: "manuscript_raster::pipeline",
        stages = algorithms.len(),
        width,
        height,
        input = input.layout(),
        output = ?predicted,
        "starting pipeline"
    );

    let mut input = Some(input);
    let result: Handoff = std::thread::scope(|s| {
        let mut upstream: Option<flume::Receiver<Handoff>> = None;

        for (index, algorithm) in algorithms.iter().enumerate() {
            let (tx, rx) = flume::bounded::<Handoff>(1);
            let inbound = upstream.replace(rx);
            let owned = input.take();

            s.spawn(move || {
                let received = match (owned, inbound) {
                    (Some(buffer), _) => Ok((buffer, Vec::with_capacity(algorithms.len()))),
                    (None, Some(rx)) => rx.recv().unwrap_or_else(|_| {
                        Err(RasterError::internal_panic(format!(
                            "stage {index} ({}) lost its input channel",
                            algorithm.name()
                        )))
                    }),
                    (None, None) => Err(RasterError::internal_panic(format!(
                        "stage {index} ({}) has no input",
                        algorithm.name()
                    ))),
                };
                let outcome = received.and_then(|(buffer, timings)| run_stage(index, algorithm, buffer, timings));
                // Only fails if the receiving side is gone, in which case
                // nobody is waiting for the result.
                let _ = tx.send(outcome);
            });
        }

        match upstream {
            Some(last) => last.recv().unwrap_or_else(|_| {
                Err(RasterError::internal_panic("final stage closed without output"))
            }),
            None => Err(RasterError::internal_panic("pipeline has no stages")),
        }
    });

    let (buffer, timings) = result?;
    debug!(
        target: "manuscript_raster::pipeline",
        total_ms = timings.iter().map(|t| t.duration_ms).sum::<f64>(),
        width = buffer.width(),
        height = buffer.height(),
        "pipeline complete"
    );
    Ok(PipelineOutput { buffer, timings })
}

/// Layout `algorithms` will leave `input` in, from their contracts alone.
fn predicted_layout(input: &RasterBuffer, algorithms: &[Algorithm]) -> PixelLayout {
    algorithms
        .iter()
        .fold(PixelLayout::of(input), |layout, a| layout.after(&a.contract()))
}

fn run_stage(
    index: usize,
    algorithm: &Algorithm,
    buffer: RasterBuffer,
    mut timings: Vec<StageTiming>,
) -> Handoff {
    let name = algorithm.name();
    let started = Instant::now();
    let output = run_with_panic_policy(&format!("stage {index} ({name})"), || {
        Ok(algorithm.process(&buffer))
    })?;
    drop(buffer);

    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
    debug!(
        target: "manuscript_raster::pipeline",
        stage = index,
        name,
        duration_ms,
        width = output.width(),
        height = output.height(),
        layout = output.layout(),
        "stage complete"
    );
    timings.push(StageTiming { name, duration_ms });
    Ok((output, timings))
}
