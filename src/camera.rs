//! Orbit camera around the tabletop.
//!
//! The camera circles the world origin. Pointer drags change azimuth and
//! elevation relative to where the gesture started, the wheel steps the
//! zoom scale. Every state change reports which matrices went stale so the
//! caller can refresh the light's view-space position and request a frame.

use cgmath::{Deg, Matrix4, Point3, Rad, Vector3};

/// Converts GL-style clip space (z in [-1, 1]) to wgpu's z in [0, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

pub const MIN_SCALE: f32 = 1.0;
pub const MAX_SCALE: f32 = 30.0;
pub const MIN_ELEVATION: f32 = -15.0;
pub const MAX_ELEVATION: f32 = 195.0;

/// Degrees of rotation per pixel of pointer travel.
const DRAG_SENSITIVITY: f32 = 0.5;

const FOVY: Deg<f32> = Deg(45.0);
const ZNEAR: f32 = 0.5;
const ZFAR: f32 = 100.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProjectionMode {
    #[default]
    Perspective,
    /// Debug view. Lighting is not meant to look right in this mode.
    Orthographic,
}

/// Point of view: zoom scale plus azimuth and elevation in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub scale: f32,
    pub azimuth: f32,
    pub elevation: f32,
    pub mode: ProjectionMode,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            scale: MAX_SCALE,
            azimuth: -11.25,
            elevation: 22.5,
            mode: ProjectionMode::Perspective,
        }
    }
}

impl CameraState {
    pub fn eye(&self) -> Point3<f32> {
        let (sin_az, cos_az) = Rad::from(Deg(self.azimuth)).0.sin_cos();
        let (sin_el, cos_el) = Rad::from(Deg(self.elevation)).0.sin_cos();
        Point3::new(
            self.scale * sin_az * cos_el,
            self.scale * sin_el,
            self.scale * cos_az * cos_el,
        )
    }

    pub fn view(&self) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Orthographic => {
                Matrix4::from_angle_y(Deg(self.azimuth)) * Matrix4::from_angle_x(Deg(self.elevation))
            }
            ProjectionMode::Perspective => {
                Matrix4::look_at_rh(self.eye(), Point3::new(0.0, 0.0, 0.0), self.up())
            }
        }
    }

    pub fn projection(&self, aspect: f32) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Orthographic => {
                let s = self.scale;
                OPENGL_TO_WGPU_MATRIX * cgmath::ortho(-aspect * s, aspect * s, -s, s, -s, s)
            }
            ProjectionMode::Perspective => {
                OPENGL_TO_WGPU_MATRIX * cgmath::perspective(FOVY, aspect, ZNEAR, ZFAR)
            }
        }
    }

    fn up(&self) -> Vector3<f32> {
        let (sin_el, cos_el) = Rad::from(Deg(self.elevation)).0.sin_cos();
        if cos_el.abs() > 1e-6 {
            return Vector3::new(0.0, cos_el, 0.0);
        }
        // Straight overhead the eye is parallel to +Y; use the limit of the
        // up vector as the elevation approaches the pole.
        let (sin_az, cos_az) = Rad::from(Deg(self.azimuth)).0.sin_cos();
        Vector3::new(-sin_az, 0.0, -cos_az) * sin_el.signum()
    }
}

/// Which cached matrices a camera operation invalidated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraUpdate {
    None,
    View,
    Projection,
    ViewAndProjection,
}

impl CameraUpdate {
    pub fn view_changed(self) -> bool {
        matches!(self, CameraUpdate::View | CameraUpdate::ViewAndProjection)
    }

    pub fn projection_changed(self) -> bool {
        matches!(self, CameraUpdate::Projection | CameraUpdate::ViewAndProjection)
    }

    pub fn is_none(self) -> bool {
        self == CameraUpdate::None
    }
}

#[derive(Clone, Copy, Debug)]
struct DragStart {
    x: f32,
    y: f32,
    azimuth: f32,
    elevation: f32,
}

#[derive(Debug)]
pub struct CameraController {
    state: CameraState,
    drag: Option<DragStart>,
    aspect: f32,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
}

impl CameraController {
    pub fn new(state: CameraState, aspect: f32) -> Self {
        let aspect = sanitize_aspect(aspect);
        Self {
            view: state.view(),
            projection: state.projection(aspect),
            state,
            drag: None,
            aspect,
        }
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn view(&self) -> Matrix4<f32> {
        self.view
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Pointer or touch went down at `(x, y)`.
    pub fn begin_drag(&mut self, x: f32, y: f32) {
        self.drag = Some(DragStart {
            x,
            y,
            azimuth: self.state.azimuth,
            elevation: self.state.elevation,
        });
    }

    /// Pointer moved to `(x, y)`. Ignored unless a drag is in progress.
    pub fn drag_to(&mut self, x: f32, y: f32) -> CameraUpdate {
        let Some(start) = self.drag else {
            return CameraUpdate::None;
        };
        self.state.azimuth = start.azimuth - DRAG_SENSITIVITY * (x - start.x);
        self.state.elevation = (start.elevation + DRAG_SENSITIVITY * (y - start.y))
            .clamp(MIN_ELEVATION, MAX_ELEVATION);
        self.refresh_view();
        CameraUpdate::View
    }

    /// Pointer released, left the window or the touch was cancelled.
    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn zoom_in(&mut self, step: f32) -> CameraUpdate {
        self.state.scale = (self.state.scale - step).max(MIN_SCALE);
        self.refresh_all()
    }

    pub fn zoom_out(&mut self, step: f32) -> CameraUpdate {
        self.state.scale = (self.state.scale + step).min(MAX_SCALE);
        self.refresh_all()
    }

    /// A wheel event in DOM convention: positive `delta_y` scrolls down.
    ///
    /// Only the sign matters; every event zooms by one step.
    pub fn handle_wheel(&mut self, delta_y: f32) -> CameraUpdate {
        let t = (-delta_y).clamp(-1.0, 1.0);
        if t < 0.0 {
            self.zoom_in(1.0)
        } else if t > 0.0 {
            self.zoom_out(1.0)
        } else {
            CameraUpdate::None
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) -> CameraUpdate {
        self.aspect = sanitize_aspect(aspect);
        self.projection = self.state.projection(self.aspect);
        CameraUpdate::Projection
    }

    pub fn set_mode(&mut self, mode: ProjectionMode) -> CameraUpdate {
        if self.state.mode == mode {
            return CameraUpdate::None;
        }
        self.state.mode = mode;
        self.refresh_all()
    }

    fn refresh_view(&mut self) {
        self.view = self.state.view();
    }

    fn refresh_all(&mut self) -> CameraUpdate {
        self.refresh_view();
        self.projection = self.state.projection(self.aspect);
        CameraUpdate::ViewAndProjection
    }
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 }
}
