//! Ordering properties of the chain walker over arbitrary chains.

use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use relay::{Flow, Handler, HandlerError, Request, Response, Router, error_fn, from_fn};

#[derive(Clone, Copy, Debug)]
enum Step {
    /// Normal handler that continues.
    Next,
    /// Normal handler that fails.
    Fail,
    /// Normal handler that responds.
    Respond,
    /// Error handler that forwards.
    Forward,
    /// Error handler that responds.
    Render,
}

impl Step {
    fn is_error(self) -> bool {
        matches!(self, Self::Forward | Self::Render)
    }
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => Just(Step::Next),
        1 => Just(Step::Fail),
        1 => Just(Step::Respond),
        2 => Just(Step::Forward),
        1 => Just(Step::Render),
    ]
}

fn handler(position: usize, kind: Step, trace: &Arc<Mutex<Vec<usize>>>) -> Handler {
    let trace = Arc::clone(trace);
    match kind {
        Step::Next => from_fn(move |_| {
            trace.lock().unwrap().push(position);
            Ok(Flow::Next)
        }),
        Step::Fail => from_fn(move |_| {
            trace.lock().unwrap().push(position);
            Err(HandlerError::validation(position.to_string()))
        }),
        Step::Respond => from_fn(move |_| {
            trace.lock().unwrap().push(position);
            Ok(Flow::respond(position.to_string()))
        }),
        Step::Forward => error_fn(move |err, _| {
            trace.lock().unwrap().push(position);
            Err(err)
        }),
        Step::Render => error_fn(move |_, _| {
            trace.lock().unwrap().push(position);
            Ok(Response::text(position.to_string()))
        }),
    }
}

/// Reference model of the walk: the positions that should run.
fn expected(steps: &[Step]) -> Vec<usize> {
    let mut ran = Vec::new();
    let mut failed = false;
    for (position, step) in steps.iter().enumerate() {
        if step.is_error() != failed {
            continue;
        }
        ran.push(position);
        match step {
            Step::Next | Step::Forward => {}
            Step::Fail => failed = true,
            Step::Respond | Step::Render => break,
        }
    }
    ran
}

fn run(steps: &[Step]) -> Vec<usize> {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Router::new()
        .get("/", steps.iter().enumerate().map(|(i, s)| handler(i, *s, &trace)))
        .build();

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    rt.block_on(pipeline.dispatch(Request::get("/")));

    let ran = trace.lock().unwrap().clone();
    ran
}

proptest! {
    #[test]
    fn positions_strictly_increase(steps in prop::collection::vec(step(), 0..16)) {
        let ran = run(&steps);
        prop_assert!(ran.windows(2).all(|w| w[0] < w[1]), "{ran:?}");
    }

    #[test]
    fn walk_matches_the_reference_model(steps in prop::collection::vec(step(), 0..16)) {
        prop_assert_eq!(run(&steps), expected(&steps));
    }

    #[test]
    fn no_normal_handler_runs_after_an_error(
        prefix in prop::collection::vec(Just(Step::Next), 0..6),
        suffix in prop::collection::vec(step(), 0..10),
    ) {
        let mut steps = prefix;
        let failed_at = steps.len();
        steps.push(Step::Fail);
        steps.extend(suffix);

        for position in run(&steps).into_iter().filter(|p| *p > failed_at) {
            prop_assert!(steps[position].is_error(), "normal handler {position} ran in error mode");
        }
    }
}
