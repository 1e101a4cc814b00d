//! Compiled geometry and the GPU assets built from it.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::data_structures::texture::TextureId;

/// One interleaved vertex record: 9 floats, 36 bytes.
///
/// `tex_coords[2]` is padding carried over from the fixed 3-float texcoord
/// slot. Its value is unspecified and no shader reads it.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 3],
}

impl ModelVertex {
    pub const STRIDE: wgpu::BufferAddress = std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress;
}

/// A flat, draw-ready vertex stream produced by the geometry compiler.
///
/// Every three consecutive vertices form one triangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompiledGeometry {
    pub(crate) vertices: Vec<ModelVertex>,
}

impl CompiledGeometry {
    pub fn vertices(&self) -> &[ModelVertex] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// The raw interleaved floats, 9 per vertex.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Index of an [`Asset`] inside the scene's asset table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AssetId(pub usize);

/// Compiled geometry living in a GPU vertex buffer plus the texture it is
/// drawn with unless an entity overrides it.
#[derive(Debug)]
pub struct Asset {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub vertex_count: u32,
    pub texture: TextureId,
}

impl Asset {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        geometry: &CompiledGeometry,
        texture: TextureId,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(geometry.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            name: name.to_string(),
            vertex_buffer,
            vertex_count: geometry.vertex_count() as u32,
            texture,
        }
    }
}

pub trait DrawAsset<'a> {
    fn draw_asset(&mut self, asset: &'a Asset);
    fn draw_asset_instanced(&mut self, asset: &'a Asset, instances: Range<u32>);
}

impl<'a, 'b> DrawAsset<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_asset(&mut self, asset: &'b Asset) {
        self.draw_asset_instanced(asset, 0..1);
    }

    fn draw_asset_instanced(&mut self, asset: &'b Asset, instances: Range<u32>) {
        self.set_vertex_buffer(0, asset.vertex_buffer.slice(..));
        self.draw(0..asset.vertex_count, instances);
    }
}
