use std::sync::Arc;

use cgmath::{Matrix4, SquareMatrix};

use crate::data_structures::{
    material::Material,
    model::{Asset, AssetId},
    texture::TextureId,
};

/// One drawable entity: an asset placed in the world with a material.
///
/// The texture override, when set, replaces the asset's own texture.
#[derive(Clone, Debug)]
pub struct Thing {
    pub asset: AssetId,
    pub material: Arc<Material>,
    pub model: Matrix4<f32>,
    pub texture: Option<TextureId>,
}

impl Thing {
    pub fn new(asset: AssetId, material: Arc<Material>) -> Self {
        Self {
            asset,
            material,
            model: Matrix4::identity(),
            texture: None,
        }
    }

    pub fn with_model(mut self, model: Matrix4<f32>) -> Self {
        self.model = model;
        self
    }

    pub fn with_texture(mut self, texture: Option<TextureId>) -> Self {
        self.texture = texture;
        self
    }

    pub fn texture_or(&self, asset: &Asset) -> TextureId {
        self.texture.unwrap_or(asset.texture)
    }
}
