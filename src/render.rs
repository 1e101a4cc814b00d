//! Frame composition and invalidation-driven scheduling.
//!
//! A frame is a [`FramePlan`]: the ordered list of passes to record. The
//! shadow pass only runs while the light's shadow map is stale; the main
//! pass always runs. Frames are never driven by a clock: [`FrameScheduler`]
//! holds at most one pending frame, queued by `resume()`.
//!
//! # Key types
//!
//! - [`Pass`] names one of the two render passes
//! - [`FramePlan`] is the pass sequence of one frame
//! - [`FrameScheduler`] tracks whether a frame has been requested
//! - [`AnimationClock`] is advanced once per rendered frame
//! - [`PassRecorder`] is implemented by whatever turns passes into GPU work
//!

use instant::{Duration, Instant};

use crate::scene::Scene;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    /// Depth only, rendered from the light into the shadow map.
    Shadow,
    /// Lit pass into the window surface.
    Main,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePlan {
    passes: Vec<Pass>,
}

impl FramePlan {
    /// The plan for a frame given the light's dirty flag.
    ///
    /// Without depth-texture sampling there is no shadow pass at all.
    pub fn new(needs_shadow_pass: bool, shadows_enabled: bool) -> Self {
        let passes = if needs_shadow_pass && shadows_enabled {
            vec![Pass::Shadow, Pass::Main]
        } else {
            vec![Pass::Main]
        };
        Self { passes }
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn has_shadow_pass(&self) -> bool {
        self.passes.contains(&Pass::Shadow)
    }
}

/// Holds at most one pending frame.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    frame_pending: bool,
    frames_rendered: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a frame. Returns `true` if the caller has to ask the host for
    /// a redraw, `false` if a frame is already pending.
    pub fn resume(&mut self) -> bool {
        if self.frame_pending {
            return false;
        }
        self.frame_pending = true;
        true
    }

    /// Called when a frame starts. Clears the pending request so that a
    /// `resume()` during the frame schedules the next one.
    pub fn begin_frame(&mut self) {
        self.frame_pending = false;
        self.frames_rendered += 1;
    }

    pub fn is_pending(&self) -> bool {
        self.frame_pending
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

/// Wall-clock bookkeeping, advanced once per rendered frame.
#[derive(Debug, Clone)]
pub struct AnimationClock {
    start: Instant,
    current: Instant,
}

impl AnimationClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            current: now,
        }
    }

    pub fn advance(&mut self) -> Duration {
        self.current = Instant::now();
        self.elapsed()
    }

    pub fn elapsed(&self) -> Duration {
        self.current.duration_since(self.start)
    }
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns the passes of a frame into GPU work.
pub trait PassRecorder {
    /// Whether the shadow map can be rendered and sampled.
    fn shadows_enabled(&self) -> bool;

    fn record(&mut self, pass: Pass, scene: &Scene);
}

/// Run one frame: advance the clock, plan the passes, record them in order
/// and clear the shadow flag once its pass is recorded.
pub fn render_frame<R: PassRecorder>(scene: &mut Scene, recorder: &mut R) -> FramePlan {
    scene.scheduler.begin_frame();
    scene.clock.advance();

    let plan = FramePlan::new(scene.light.needs_shadow_pass(), recorder.shadows_enabled());
    for &pass in plan.passes() {
        recorder.record(pass, scene);
        if pass == Pass::Shadow {
            scene.light.shadow_pass_done();
        }
    }
    log::debug!("Frame {}: {:?}", scene.scheduler.frames_rendered(), plan.passes());
    plan
}
