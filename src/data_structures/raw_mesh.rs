//! The polygon mesh input schema.
//!
//! Meshes arrive as the condensed JSON produced by the offline `.obj`
//! conversion step: flat `v`, `vn` and `vt` streams plus a list of faces,
//! each face being `3 * arity` one-based indices.

use serde::Deserialize;
use thiserror::Error;

/// A polygonal mesh as delivered by the conversion step.
///
/// The three attribute streams are flat: `positions` and `normals` hold
/// xyz triples, `tex_coords` holds uv pairs. Faces reference them with
/// one-based indices.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct RawMesh {
    #[serde(rename = "v")]
    pub positions: Vec<f32>,
    #[serde(rename = "vn")]
    pub normals: Vec<f32>,
    #[serde(rename = "vt")]
    pub tex_coords: Vec<f32>,
    #[serde(rename = "f")]
    pub faces: Vec<Face>,
}

impl RawMesh {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn normal_count(&self) -> usize {
        self.normals.len() / 3
    }

    pub fn tex_coord_count(&self) -> usize {
        self.tex_coords.len() / 2
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FaceError {
    #[error("a face needs position/texcoord/normal triples but has {len} indices")]
    IncompleteTriple { len: usize },
}

/// One corner of a face, still in the one-based numbering of the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Corner {
    pub position: u32,
    pub tex_coord: u32,
    pub normal: u32,
}

/// A polygon given as `(position, texcoord, normal)` index triples.
///
/// Decoding rejects index lists whose length is not a multiple of three.
/// The arity itself is validated by the geometry compiler.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Vec<u32>")]
pub struct Face(Vec<u32>);

impl Face {
    pub fn new(indices: Vec<u32>) -> Result<Self, FaceError> {
        Self::try_from(indices)
    }

    pub fn arity(&self) -> usize {
        self.0.len() / 3
    }

    /// The `n`th corner of the polygon.
    pub fn corner(&self, n: usize) -> Corner {
        let i = n * 3;
        Corner {
            position: self.0[i],
            tex_coord: self.0[i + 1],
            normal: self.0[i + 2],
        }
    }
}

impl TryFrom<Vec<u32>> for Face {
    type Error = FaceError;

    fn try_from(indices: Vec<u32>) -> Result<Self, Self::Error> {
        if indices.len() % 3 != 0 {
            return Err(FaceError::IncompleteTriple { len: indices.len() });
        }
        Ok(Face(indices))
    }
}
