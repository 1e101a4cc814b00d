use anyhow::Context as _;

use crate::data_structures::raw_mesh::RawMesh;

/**
 * This module contains all logic for loading meshes and textures from external files
 * and compiling meshes into draw-ready geometry.
 */
pub mod mesh;
pub mod texture;

/// Load a mesh in the condensed JSON schema from the asset root.
pub async fn load_raw_mesh(file_name: &str) -> anyhow::Result<RawMesh> {
    let json = texture::load_string(file_name).await?;
    RawMesh::from_json(&json).with_context(|| format!("decoding mesh {}", file_name))
}
