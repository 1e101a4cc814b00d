use cgmath::{Deg, Matrix4, Point3, Transform, Vector3};

use crate::camera::OPENGL_TO_WGPU_MATRIX;

/// The single point light of the scene.
///
/// The light's view and projection are derived whenever it moves. Moving
/// it also marks the shadow map stale so the next frame re-renders it.
#[derive(Debug, Clone)]
pub struct LightState {
    position: Point3<f32>,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    needs_shadow_pass: bool,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
}

impl LightState {
    pub fn new(position: [f32; 3]) -> Self {
        let position = Point3::from(position);
        Self {
            position,
            view: light_view(position),
            projection: light_projection(),
            needs_shadow_pass: true,
            ambient: [0.4; 3],
            diffuse: [0.6; 3],
            specular: [1.0; 3],
        }
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn set_position(&mut self, position: [f32; 3]) {
        self.position = Point3::from(position);
        self.view = light_view(self.position);
        self.needs_shadow_pass = true;
    }

    /// Forces a shadow pass, e.g. after the shadow map was recreated or the
    /// scene's entities changed.
    pub fn mark_dirty(&mut self) {
        self.needs_shadow_pass = true;
    }

    pub fn needs_shadow_pass(&self) -> bool {
        self.needs_shadow_pass
    }

    pub fn shadow_pass_done(&mut self) {
        self.needs_shadow_pass = false;
    }

    pub fn view(&self) -> Matrix4<f32> {
        self.view
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    /// Projection times view: world space to light clip space.
    pub fn matrix(&self) -> Matrix4<f32> {
        self.projection * self.view
    }

    /// The light position as seen from a camera with the given view.
    pub fn view_space_position(&self, view: Matrix4<f32>) -> Vector3<f32> {
        let p = view.transform_point(self.position);
        Vector3::new(p.x, p.y, p.z)
    }
}

fn light_view(position: Point3<f32>) -> Matrix4<f32> {
    Matrix4::look_at_rh(position, Point3::new(0.0, 0.0, 0.0), Vector3::unit_z())
}

fn light_projection() -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * cgmath::perspective(Deg(90.0), 1.0, 0.5, 100.0)
}

/// Frame-global values of the lit program, bind group 0 binding 0.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LitGlobals {
    pub projection: [[f32; 4]; 4],
    pub light_position: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: u32,
    pub ambient: [f32; 3],
    _padding2: u32,
    pub diffuse: [f32; 3],
    _padding3: u32,
    pub specular: [f32; 3],
    _padding4: u32,
    /// x: shadow bias ratio, y: 1.0 when the shadow map holds valid depth.
    pub shadow: [f32; 4],
}

impl LitGlobals {
    pub fn new(
        projection: Matrix4<f32>,
        light: &LightState,
        light_view_position: Vector3<f32>,
        bias_ratio: f32,
        shadows_enabled: bool,
    ) -> Self {
        Self {
            projection: projection.into(),
            light_position: light_view_position.into(),
            _padding: 0,
            ambient: light.ambient,
            _padding2: 0,
            diffuse: light.diffuse,
            _padding3: 0,
            specular: light.specular,
            _padding4: 0,
            shadow: [bias_ratio, if shadows_enabled { 1.0 } else { 0.0 }, 0.0, 0.0],
        }
    }
}

/// Frame-global values of the unlit program.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UnlitGlobals {
    pub projection: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl UnlitGlobals {
    pub fn new(projection: Matrix4<f32>, color: [f32; 4]) -> Self {
        Self {
            projection: projection.into(),
            color,
        }
    }
}
