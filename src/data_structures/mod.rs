//! Scene data structures: meshes, assets, materials, textures and entities.
//!
//! - `raw_mesh` is the polygon mesh input schema
//! - `model` holds compiled geometry and the GPU assets built from it
//! - `material` holds Phong surface materials
//! - `texture` contains the GPU texture wrapper and the texture registry
//! - `instance` holds the per-entity data uploaded for each draw
//! - `thing` is a drawable entity placed in the scene

pub mod instance;
pub mod material;
pub mod model;
pub mod raw_mesh;
pub mod texture;
pub mod thing;
