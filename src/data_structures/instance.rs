//! Per-entity data handed to the GPU for every draw.
//!
//! Matrices travel in a small uniform buffer per entity and pass. The
//! material travels as a one-instance vertex stream, the wgpu counterpart of
//! setting constant vertex attributes right before a draw call.

use cgmath::{Matrix, Matrix4, SquareMatrix};

/**
 * The per-entity uniform block shared by the unlit and lit programs.
 *
 * The unlit program only reads `model_view`. For the shadow pass that
 * matrix is the light's view composed with the model transform.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EntityUniform {
    pub model_view: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub model_light: [[f32; 4]; 4],
}

impl EntityUniform {
    /// Matrices for the lit pass.
    ///
    /// `light` is the light's projection times its view, so `model_light`
    /// takes a model-space position straight into light clip space.
    pub fn lit(model: Matrix4<f32>, view: Matrix4<f32>, light: Matrix4<f32>) -> Self {
        let model_view = view * model;
        Self {
            model_view: model_view.into(),
            normal: normal_matrix(model_view).into(),
            model_light: (light * model).into(),
        }
    }

    /// Matrices for the depth-only pass rendered from the light.
    pub fn unlit(model: Matrix4<f32>, light_view: Matrix4<f32>) -> Self {
        Self {
            model_view: (light_view * model).into(),
            normal: Matrix4::identity().into(),
            model_light: Matrix4::identity().into(),
        }
    }
}

/// The inverse-transpose of a model-view matrix.
///
/// Falls back to identity for a singular matrix; the lit pass never sees
/// one since every entity transform is a rotation, translation and
/// non-zero scale.
pub fn normal_matrix(model_view: Matrix4<f32>) -> Matrix4<f32> {
    model_view
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or_else(|| {
            log::warn!("Singular model-view matrix, using identity as normal matrix");
            Matrix4::identity()
        })
}

/**
 * Material terms consumed by the lit program as per-instance attributes.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialRaw {
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
}

impl MaterialRaw {
    pub const STRIDE: wgpu::BufferAddress = std::mem::size_of::<MaterialRaw>() as wgpu::BufferAddress;
}
