use table_ngin::{
    camera::{CameraController, CameraState},
    pipelines::{
        light::{LightState, LitGlobals, UnlitGlobals},
        program::{
            Attribute, AttributeStream, DIFFUSE_GROUP, ENTITY_GROUP, GLOBALS_GROUP, ProgramKind,
            Uniform,
        },
        shadow_map_size,
    },
    render::{FramePlan, FrameScheduler, Pass, PassRecorder, render_frame},
    scene::Scene,
};

/// Remembers the passes it was asked to record.
struct RecordingPasses {
    shadows: bool,
    frames: Vec<Vec<Pass>>,
    current: Vec<Pass>,
}

impl RecordingPasses {
    fn new(shadows: bool) -> Self {
        Self {
            shadows,
            frames: Vec::new(),
            current: Vec::new(),
        }
    }

    fn frame(&mut self, scene: &mut Scene) -> Vec<Pass> {
        let plan = render_frame(scene, self);
        let recorded = std::mem::take(&mut self.current);
        assert_eq!(plan.passes(), recorded.as_slice());
        self.frames.push(recorded.clone());
        recorded
    }
}

impl PassRecorder for RecordingPasses {
    fn shadows_enabled(&self) -> bool {
        self.shadows
    }

    fn record(&mut self, pass: Pass, scene: &Scene) {
        if pass == Pass::Main {
            assert!(
                !self.shadows || !scene.light.needs_shadow_pass(),
                "main pass recorded before the shadow map was refreshed"
            );
        }
        self.current.push(pass);
    }
}

fn scene() -> Scene {
    let camera = CameraController::new(CameraState::default(), 4.0 / 3.0);
    Scene::new(camera, LightState::new([0.0, 30.0, 0.0]))
}

#[test]
fn should_render_shadows_only_when_the_light_is_stale() {
    let mut scene = scene();
    let mut recorder = RecordingPasses::new(true);

    assert_eq!(recorder.frame(&mut scene), vec![Pass::Shadow, Pass::Main]);
    assert_eq!(recorder.frame(&mut scene), vec![Pass::Main]);
    assert_eq!(recorder.frame(&mut scene), vec![Pass::Main]);

    scene.set_light_position([5.0, 30.0, 0.0]);
    assert_eq!(recorder.frame(&mut scene), vec![Pass::Shadow, Pass::Main]);
    assert_eq!(recorder.frame(&mut scene), vec![Pass::Main]);
    assert_eq!(recorder.frames.len(), 5);
}

#[test]
fn should_not_rerender_shadows_for_camera_moves() {
    let mut scene = scene();
    let mut recorder = RecordingPasses::new(true);
    recorder.frame(&mut scene);

    scene.camera.begin_drag(0.0, 0.0);
    let update = scene.camera.drag_to(40.0, 10.0);
    assert!(scene.apply_camera(update));
    assert_eq!(recorder.frame(&mut scene), vec![Pass::Main]);

    let update = scene.camera.handle_wheel(1.0);
    assert!(scene.apply_camera(update));
    assert_eq!(recorder.frame(&mut scene), vec![Pass::Main]);
}

#[test]
fn should_skip_the_shadow_pass_without_depth_sampling() {
    let mut scene = scene();
    let mut recorder = RecordingPasses::new(false);
    assert_eq!(recorder.frame(&mut scene), vec![Pass::Main]);
    assert_eq!(recorder.frame(&mut scene), vec![Pass::Main]);

    assert_eq!(FramePlan::new(true, false).passes(), &[Pass::Main]);
    assert_eq!(FramePlan::new(false, true).passes(), &[Pass::Main]);
    assert_eq!(FramePlan::new(true, true).passes(), &[Pass::Shadow, Pass::Main]);
    assert!(FramePlan::new(true, true).has_shadow_pass());
}

#[test]
fn should_schedule_at_most_one_pending_frame() {
    let mut scheduler = FrameScheduler::new();
    assert!(!scheduler.is_pending());
    assert!(scheduler.resume());
    assert!(!scheduler.resume());
    assert!(!scheduler.resume());
    assert!(scheduler.is_pending());

    scheduler.begin_frame();
    assert!(!scheduler.is_pending());
    assert_eq!(scheduler.frames_rendered(), 1);

    // A resume during the frame schedules the next one.
    assert!(scheduler.resume());
    scheduler.begin_frame();
    assert!(!scheduler.is_pending());
    assert_eq!(scheduler.frames_rendered(), 2);
}

#[test]
fn should_schedule_the_first_frame_and_stay_idle_after_it() {
    let mut scene = scene();
    assert!(scene.scheduler.is_pending());
    assert!(!scene.resume());

    RecordingPasses::new(true).frame(&mut scene);
    assert!(!scene.scheduler.is_pending());
    assert_eq!(scene.scheduler.frames_rendered(), 1);

    assert!(scene.resume());
    assert!(!scene.resume());
}

#[test]
fn should_advance_the_clock_once_per_frame() {
    let mut scene = scene();
    let mut recorder = RecordingPasses::new(true);
    let before = scene.clock.elapsed();
    recorder.frame(&mut scene);
    let first = scene.clock.elapsed();
    recorder.frame(&mut scene);
    assert!(first >= before);
    assert!(scene.clock.elapsed() >= first);
}

#[test]
fn should_track_the_light_in_view_space() {
    let mut scene = scene();
    let before = scene.light_view_position();
    scene.camera.begin_drag(0.0, 0.0);
    let update = scene.camera.drag_to(0.0, 40.0);
    scene.apply_camera(update);
    assert_ne!(scene.light_view_position(), before);

    let expected = scene.light.view_space_position(scene.camera.view());
    assert_eq!(scene.light_view_position(), expected);
}

#[test]
fn should_ignore_empty_resizes() {
    let mut scene = scene();
    RecordingPasses::new(true).frame(&mut scene);
    assert!(!scene.resize(0, 600));
    assert!(!scene.scheduler.is_pending());
    assert!(scene.resize(800, 600));
    assert_eq!(scene.camera.aspect(), 800.0 / 600.0);
}

#[test]
fn should_size_the_shadow_map_by_device_limit() {
    assert_eq!(shadow_map_size(16384, 6144), 6144);
    assert_eq!(shadow_map_size(2048, 6144), 2048);
    assert_eq!(shadow_map_size(8192, 8192), 8192);
}

#[test]
fn should_declare_program_inputs() {
    assert_eq!(ProgramKind::Unlit.attributes(), &[Attribute::Position]);
    assert_eq!(
        ProgramKind::Unlit.uniforms(),
        &[Uniform::ModelView, Uniform::Projection, Uniform::Color]
    );
    assert_eq!(ProgramKind::Unlit.bind_group_count(), 2);
    assert_eq!(ProgramKind::Lit.bind_group_count(), 3);

    let lit = ProgramKind::Lit.attributes();
    assert_eq!(lit.len(), 7);
    for (i, attribute) in lit.iter().enumerate() {
        assert_eq!(attribute.location(), i as u32);
    }
    let instance: Vec<_> = lit
        .iter()
        .filter(|a| a.stream() == AttributeStream::Instance)
        .collect();
    assert_eq!(instance.len(), 4);
    assert_eq!(Attribute::MaterialShininess.offset(), 36);
    assert_eq!(Attribute::TexCoord.offset(), 24);

    assert_eq!(Uniform::ModelView.slot().group, ENTITY_GROUP);
    assert_eq!(Uniform::LightPosition.slot().group, GLOBALS_GROUP);
    assert_eq!(Uniform::DiffuseSampler.slot().group, DIFFUSE_GROUP);
    assert_ne!(Uniform::ShadowSampler.slot(), Uniform::ShadowBiasRatio.slot());
}

#[test]
fn should_keep_uniform_blocks_16_byte_aligned() {
    assert_eq!(std::mem::size_of::<LitGlobals>() % 16, 0);
    assert_eq!(std::mem::size_of::<UnlitGlobals>() % 16, 0);
}
