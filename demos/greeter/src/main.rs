//! Greeter Example
//!
//! Declares a plain service type and a consumer, then registers their
//! implementations with `#[implementation]`. The crate depends on `sluice`
//! only, so every path the attribute expands to goes through the facade.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package greeter -- potato Hello -91
//! ```

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use sluice::prelude::*;
use sluice::runtime::prelude::*;

// ============================================================================
// Service types
// ============================================================================

/// Scores a name.
struct Greeting;

impl ServiceType for Greeting {
    type Context = String;
    type Result = i32;
    type Mode = Plain;
}

/// Receives every score handed out.
struct Scoreboard;

impl ServiceType for Scoreboard {
    type Context = i32;
    type Result = State;
    type Mode = Consumer;
}

// ============================================================================
// Implementations
// ============================================================================

#[implementation(Greeting, order = First, filter = is_potato)]
fn potato(_: &String) -> Option<i32> {
    Some(999)
}

#[implementation(Greeting, filter = is_negative, name = "negative")]
fn negative(_: &String) -> Option<i32> {
    Some(-91)
}

fn is_potato(name: &String) -> bool {
    name == "potato"
}

fn is_negative(name: &String) -> bool {
    name.starts_with("-91")
}

static HIGH_SCORES: AtomicUsize = AtomicUsize::new(0);

#[implementation(Scoreboard, order = Last)]
fn high_scores(score: &i32) -> ControlFlow<()> {
    if *score > 100 {
        HIGH_SCORES.fetch_add(1, Ordering::SeqCst);
    }
    ControlFlow::Continue(())
}

// ============================================================================
// Wiring
// ============================================================================

fn declare(pipeline: &Pipeline) -> PipelineResult<usize> {
    pipeline
        .register_service_type::<Greeting>(
            service_fn(|name: &String| Some(name.len() as i32)).named("length"),
        )?
        .register_service_type::<Scoreboard>(consumer_fn(|_: &i32| ControlFlow::Continue(())))?;
    pipeline.register_collected()
}

fn score(pipeline: &Pipeline, name: &str) -> PipelineResult<i32> {
    let pump = pipeline
        .pump(name.to_string())
        .through::<Greeting>()
        .forward()?;
    let score = *pump.context();
    pump.through::<Scoreboard>().result()?;
    Ok(score)
}

fn main() -> Result<()> {
    let pipeline = SluiceRuntime::builder().build()?.into_pipeline();
    let collected = declare(&pipeline)?;
    info!(collected, "Greeter ready");

    for name in std::env::args().skip(1) {
        let score = score(&pipeline, &name)?;
        info!(name = %name, score, "Greeted");
    }
    info!(high_scores = HIGH_SCORES.load(Ordering::SeqCst), "Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice::core::InlineExecutor;

    fn pipeline() -> Pipeline {
        let pipeline = Pipeline::builder().executor(InlineExecutor).build();
        assert_eq!(declare(&pipeline).unwrap(), 3);
        pipeline
    }

    #[test]
    fn test_collected_through_facade() {
        let pipeline = pipeline();
        let names: Vec<_> = pipeline
            .implementations::<Greeting>()
            .unwrap()
            .into_iter()
            .map(|info| info.name)
            .collect();
        assert_eq!(names, vec!["greeter::potato", "negative", "length"]);

        assert_eq!(score(&pipeline, "potato").unwrap(), 999);
        assert_eq!(score(&pipeline, "-91").unwrap(), -91);
        assert_eq!(score(&pipeline, "Hello").unwrap(), 5);
    }

    #[test]
    fn test_scoreboard_sees_forwarded_scores() {
        let pipeline = pipeline();
        let before = HIGH_SCORES.load(Ordering::SeqCst);
        score(&pipeline, "potato").unwrap();
        assert!(HIGH_SCORES.load(Ordering::SeqCst) > before);
    }
}
