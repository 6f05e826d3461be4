//! Runs atlas stitch jobs off the event loop and posts their outcomes back
//! as [`AppEvent::AtlasStitched`].

#[cfg(not(target_family = "wasm"))]
use log::error;
use log::{debug, warn};
use winit::event_loop::EventLoopProxy;

#[cfg(not(target_family = "wasm"))]
use crate::engine_state::error::AtlasBuildError;
use crate::engine_state::rendering::atlas::{StitchJob, StitchOutcome, StitchScheduler};

use super::AppEvent;

/// A worker thread per job on native targets, a local task on the web.
pub struct EventLoopStitchScheduler {
    proxy: EventLoopProxy<AppEvent>,
}

impl EventLoopStitchScheduler {
    pub fn new(proxy: EventLoopProxy<AppEvent>) -> Self {
        Self { proxy }
    }
}

fn post(proxy: &EventLoopProxy<AppEvent>, outcome: StitchOutcome) {
    let generation = outcome.generation;
    if proxy.send_event(AppEvent::AtlasStitched(outcome)).is_err() {
        warn!("Event loop closed before atlas stitch #{generation} was delivered");
    }
}

/// A job whose worker never started fails like any other stitch.
#[cfg(not(target_family = "wasm"))]
fn unstarted_outcome(generation: u64, err: &std::io::Error) -> StitchOutcome {
    StitchOutcome {
        generation,
        result: Err(AtlasBuildError::Stitch(format!(
            "could not start stitch worker: {err}"
        ))),
    }
}

impl StitchScheduler for EventLoopStitchScheduler {
    fn schedule(&mut self, job: StitchJob) {
        let proxy = self.proxy.clone();
        let generation = job.generation;
        debug!("Scheduling atlas stitch #{generation}");

        let deliver = move || post(&proxy, job.run());

        cfg_if::cfg_if! {
            if #[cfg(target_family = "wasm")] {
                wasm_bindgen_futures::spawn_local(async move { deliver() });
            } else {
                let spawned = std::thread::Builder::new()
                    .name(format!("atlas-stitch-{generation}"))
                    .spawn(deliver);
                if let Err(err) = spawned {
                    error!("Failed to start atlas stitch #{generation}: {err}");
                    post(&self.proxy, unstarted_outcome(generation, &err));
                }
            }
        }
    }
}
