//! Compiles raw polygon meshes into flat, interleaved vertex streams.
//!
//! Faces of any arity are fan-triangulated around their first corner. The
//! optional model transform is applied to positions and, through its
//! inverse-transpose, to normals; the optional texcoord transform is a 2D
//! affine map applied to every `(u, v)`.

use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector3};
use thiserror::Error;

use crate::data_structures::{
    model::{CompiledGeometry, ModelVertex},
    raw_mesh::{Face, RawMesh},
};

/// Which attribute stream an index points into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
    Position,
    TexCoord,
    Normal,
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stream::Position => "position",
            Stream::TexCoord => "texcoord",
            Stream::Normal => "normal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("face {face} has {arity} corners, at least 3 are needed")]
    DegenerateFace { face: usize, arity: usize },
    #[error("face {face} references {stream} {index} but the mesh has {len}")]
    IndexOutOfRange {
        face: usize,
        stream: Stream,
        index: u32,
        len: usize,
    },
    #[error("face subset selects face {face} but the mesh has {len} faces")]
    FaceSubsetOutOfRange { face: usize, len: usize },
    #[error("model transform is singular, normals cannot be transformed")]
    SingularTransform,
}

/// The faces of a mesh that take part in a compilation.
#[derive(Clone, Copy, Debug, Default)]
pub enum FaceSubset<'a> {
    #[default]
    All,
    Only(&'a [usize]),
}

/// Bulk transforms applied while compiling.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeshTransform {
    pub model: Option<Matrix4<f32>>,
    pub tex_coords: Option<Matrix3<f32>>,
    /// Flip normals, used for surfaces seen from the inside such as room walls.
    pub invert_normals: bool,
}

impl MeshTransform {
    pub fn model(model: Matrix4<f32>) -> Self {
        Self {
            model: Some(model),
            ..Default::default()
        }
    }

    pub fn with_tex_coords(mut self, tex_coords: Matrix3<f32>) -> Self {
        self.tex_coords = Some(tex_coords);
        self
    }

    pub fn inverted(mut self) -> Self {
        self.invert_normals = true;
        self
    }
}

/// One mesh with its own transform, used for combined geometry.
#[derive(Clone, Copy, Debug)]
pub struct MeshPart<'a> {
    pub mesh: &'a RawMesh,
    pub faces: FaceSubset<'a>,
    pub transform: MeshTransform,
}

/// Turns [`RawMesh`]es into [`CompiledGeometry`].
///
/// Fan index tables are memoized per arity, so compiling many meshes with
/// the same polygon sizes builds each table once.
#[derive(Debug, Default)]
pub struct GeometryCompiler {
    fans: Vec<Vec<usize>>,
}

impl GeometryCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Corner indices of the triangles covering a convex polygon with
    /// `arity` corners: `(0, i, i + 1)` for `i` in `1..arity - 1`.
    pub fn fan(&mut self, arity: usize) -> &[usize] {
        let slot = arity.saturating_sub(3);
        if self.fans.len() <= slot {
            self.fans.resize_with(slot + 1, Vec::new);
        }
        if self.fans[slot].is_empty() && arity >= 3 {
            self.fans[slot] = (1..arity - 1).flat_map(|i| [0, i, i + 1]).collect();
        }
        &self.fans[slot]
    }

    pub fn compile(
        &mut self,
        mesh: &RawMesh,
        faces: FaceSubset<'_>,
        transform: &MeshTransform,
    ) -> Result<CompiledGeometry, MeshError> {
        self.compile_instanced(&[MeshPart {
            mesh,
            faces,
            transform: *transform,
        }])
    }

    /// Compile several meshes into one geometry, concatenated in input order.
    pub fn compile_instanced(&mut self, parts: &[MeshPart<'_>]) -> Result<CompiledGeometry, MeshError> {
        let mut selections = Vec::with_capacity(parts.len());
        let mut vertex_count = 0;
        for part in parts {
            let selected = select_faces(part.mesh, part.faces)?;
            for &(index, face) in &selected {
                let arity = face.arity();
                if arity < 3 {
                    return Err(MeshError::DegenerateFace { face: index, arity });
                }
                vertex_count += (arity - 2) * 3;
            }
            selections.push(selected);
        }

        let mut vertices = Vec::with_capacity(vertex_count);
        for (part, selected) in parts.iter().zip(selections) {
            let transforms = PartTransforms::new(&part.transform)?;
            for (index, face) in selected {
                for &corner in self.fan(face.arity()) {
                    vertices.push(emit_vertex(part.mesh, index, face, corner, &transforms)?);
                }
            }
        }
        debug_assert_eq!(vertices.len(), vertex_count);

        Ok(CompiledGeometry { vertices })
    }
}

fn select_faces<'m>(mesh: &'m RawMesh, faces: FaceSubset<'_>) -> Result<Vec<(usize, &'m Face)>, MeshError> {
    match faces {
        FaceSubset::All => Ok(mesh.faces.iter().enumerate().collect()),
        FaceSubset::Only(indices) => indices
            .iter()
            .map(|&i| {
                mesh.faces
                    .get(i)
                    .map(|face| (i, face))
                    .ok_or(MeshError::FaceSubsetOutOfRange {
                        face: i,
                        len: mesh.faces.len(),
                    })
            })
            .collect(),
    }
}

struct PartTransforms {
    model: Option<Matrix4<f32>>,
    normal: Option<Matrix3<f32>>,
    tex_coords: Option<Matrix3<f32>>,
}

impl PartTransforms {
    fn new(transform: &MeshTransform) -> Result<Self, MeshError> {
        let normal = match transform.model {
            Some(model) => {
                let linear = linear_part(&model);
                let linear = if transform.invert_normals { -linear } else { linear };
                let inverse = linear.invert().ok_or(MeshError::SingularTransform)?;
                Some(inverse.transpose())
            }
            None if transform.invert_normals => Some(-Matrix3::identity()),
            None => None,
        };
        Ok(Self {
            model: transform.model,
            normal,
            tex_coords: transform.tex_coords,
        })
    }
}

fn linear_part(m: &Matrix4<f32>) -> Matrix3<f32> {
    Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate())
}

fn emit_vertex(
    mesh: &RawMesh,
    face_index: usize,
    face: &Face,
    corner: usize,
    transforms: &PartTransforms,
) -> Result<ModelVertex, MeshError> {
    let corner = face.corner(corner);
    let position = lookup3(&mesh.positions, face_index, Stream::Position, corner.position)?;
    let normal = lookup3(&mesh.normals, face_index, Stream::Normal, corner.normal)?;
    let uv = lookup2(&mesh.tex_coords, face_index, corner.tex_coord)?;

    let position = match transforms.model {
        Some(model) => (model * position.extend(1.0)).truncate(),
        None => position,
    };
    let normal = match transforms.normal {
        Some(normal_matrix) => normal_matrix * normal,
        None => normal,
    };
    let uv = match transforms.tex_coords {
        Some(m) => {
            let v = m * Vector3::new(uv[0], uv[1], 1.0);
            [v.x, v.y]
        }
        None => uv,
    };

    Ok(ModelVertex {
        position: position.into(),
        normal: normal.into(),
        tex_coords: [uv[0], uv[1], 0.0],
    })
}

fn resolve(index: u32, len: usize, face: usize, stream: Stream) -> Result<usize, MeshError> {
    // One-based in the source schema; zero is as invalid as a too-large index.
    match (index as usize).checked_sub(1) {
        Some(i) if i < len => Ok(i),
        _ => Err(MeshError::IndexOutOfRange {
            face,
            stream,
            index,
            len,
        }),
    }
}

fn lookup3(data: &[f32], face: usize, stream: Stream, index: u32) -> Result<Vector3<f32>, MeshError> {
    let i = resolve(index, data.len() / 3, face, stream)? * 3;
    Ok(Vector3::new(data[i], data[i + 1], data[i + 2]))
}

fn lookup2(data: &[f32], face: usize, index: u32) -> Result<[f32; 2], MeshError> {
    let i = resolve(index, data.len() / 2, face, Stream::TexCoord)? * 2;
    Ok([data[i], data[i + 1]])
}

/// Direction of a compiled normal, for callers comparing orientations.
pub fn unit_normal(vertex: &ModelVertex) -> Vector3<f32> {
    Vector3::from(vertex.normal).normalize()
}
