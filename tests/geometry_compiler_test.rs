use approx::assert_relative_eq;
use cgmath::{Matrix4, Vector3};
use table_ngin::{
    data_structures::raw_mesh::{Face, FaceError, RawMesh},
    resources::mesh::{
        FaceSubset, GeometryCompiler, MeshError, MeshPart, MeshTransform, Stream, unit_normal,
    },
    scene::tex_scale,
};

const CUBE: &str = include_str!("../assets/meshes/cube.json");

fn cube() -> RawMesh {
    RawMesh::from_json(CUBE).expect("cube mesh decodes")
}

/// A convex polygon with `n` corners on the unit circle in the xz plane.
fn polygon(n: usize) -> RawMesh {
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    for i in 0..n {
        let a = i as f32 / n as f32 * std::f32::consts::TAU;
        positions.extend_from_slice(&[a.cos(), 0.0, a.sin()]);
        indices.extend_from_slice(&[i as u32 + 1, 1, 1]);
    }
    RawMesh {
        positions,
        normals: vec![0.0, 1.0, 0.0],
        tex_coords: vec![0.5, 0.5],
        faces: vec![Face::new(indices).expect("whole triples")],
    }
}

#[test]
fn should_fan_triangulate_convex_polygons() {
    let mut compiler = GeometryCompiler::new();
    for n in 3..=9 {
        let mesh = polygon(n);
        let geometry = compiler
            .compile(&mesh, FaceSubset::All, &MeshTransform::default())
            .expect("polygon compiles");
        assert_eq!(geometry.triangle_count(), n - 2);
        assert_eq!(geometry.vertex_count(), 3 * (n - 2));

        let corner = |i: usize| [mesh.positions[i * 3], mesh.positions[i * 3 + 1], mesh.positions[i * 3 + 2]];
        for (t, triangle) in geometry.vertices().chunks(3).enumerate() {
            assert_eq!(triangle[0].position, corner(0));
            assert_eq!(triangle[1].position, corner(t + 1));
            assert_eq!(triangle[2].position, corner(t + 2));
        }
    }
}

#[test]
fn should_memoize_fan_tables_per_arity() {
    let mut compiler = GeometryCompiler::new();
    assert_eq!(compiler.fan(3), &[0, 1, 2]);
    assert_eq!(compiler.fan(5), &[0, 1, 2, 0, 2, 3, 0, 3, 4]);
    assert_eq!(compiler.fan(4), &[0, 1, 2, 0, 2, 3]);
    assert_eq!(compiler.fan(5), &[0, 1, 2, 0, 2, 3, 0, 3, 4]);
}

#[test]
fn should_reuse_fan_tables_while_compiling() {
    let mesh = cube();
    let mut compiler = GeometryCompiler::new();
    let quad = compiler.fan(4).as_ptr();
    for _ in 0..3 {
        let geometry = compiler
            .compile(&mesh, FaceSubset::All, &MeshTransform::default())
            .expect("cube compiles");
        assert_eq!(geometry.vertex_count(), 36);
    }
    assert_eq!(compiler.fan(4).as_ptr(), quad);
    assert_eq!(compiler.fan(4), &[0, 1, 2, 0, 2, 3]);
}

#[test]
fn should_compile_six_vertices_per_cube_face() {
    let mesh = cube();
    let mut compiler = GeometryCompiler::new();
    let all: Vec<usize> = (0..6).collect();
    for k in 0..=6 {
        let geometry = compiler
            .compile(&mesh, FaceSubset::Only(&all[..k]), &MeshTransform::default())
            .expect("cube compiles");
        assert_eq!(geometry.vertex_count(), 6 * k);
    }
    let whole = compiler
        .compile(&mesh, FaceSubset::All, &MeshTransform::default())
        .expect("cube compiles");
    assert_eq!(whole.vertex_count(), 36);
    assert_eq!(whole.as_floats().len(), 36 * 9);
}

#[test]
fn should_keep_normal_direction_under_uniform_scale() {
    let mesh = cube();
    let mut compiler = GeometryCompiler::new();
    let plain = compiler
        .compile(&mesh, FaceSubset::All, &MeshTransform::default())
        .expect("cube compiles");
    let scaled = compiler
        .compile(
            &mesh,
            FaceSubset::All,
            &MeshTransform::model(Matrix4::from_scale(2.5)),
        )
        .expect("cube compiles");

    for (a, b) in plain.vertices().iter().zip(scaled.vertices()) {
        for axis in 0..3 {
            assert_relative_eq!(b.position[axis], a.position[axis] * 2.5, epsilon = 1e-5);
        }
        let (na, nb) = (unit_normal(a), unit_normal(b));
        assert_relative_eq!(na.x, nb.x, epsilon = 1e-5);
        assert_relative_eq!(na.y, nb.y, epsilon = 1e-5);
        assert_relative_eq!(na.z, nb.z, epsilon = 1e-5);
    }
}

#[test]
fn should_use_inverse_transpose_for_normals_under_nonuniform_scale() {
    let mut slanted = polygon(4);
    slanted.normals = vec![1.0, 1.0, 0.0];
    let mut compiler = GeometryCompiler::new();
    let geometry = compiler
        .compile(
            &slanted,
            FaceSubset::All,
            &MeshTransform::model(Matrix4::from_nonuniform_scale(2.0, 1.0, 1.0)),
        )
        .expect("quad compiles");
    let n = unit_normal(&geometry.vertices()[0]);
    let expected = Vector3::new(0.5_f32, 1.0, 0.0);
    let len = (expected.x * expected.x + expected.y * expected.y).sqrt();
    assert_relative_eq!(n.x, expected.x / len, epsilon = 1e-5);
    assert_relative_eq!(n.y, expected.y / len, epsilon = 1e-5);
    assert_relative_eq!(n.z, 0.0, epsilon = 1e-5);
}

#[test]
fn should_flip_normals_of_inverted_meshes() {
    let mesh = cube();
    let mut compiler = GeometryCompiler::new();
    let outward = compiler
        .compile(&mesh, FaceSubset::All, &MeshTransform::default())
        .expect("cube compiles");
    let inward = compiler
        .compile(
            &mesh,
            FaceSubset::All,
            &MeshTransform::model(Matrix4::from_scale(3.0)).inverted(),
        )
        .expect("cube compiles");
    for (a, b) in outward.vertices().iter().zip(inward.vertices()) {
        let (na, nb) = (unit_normal(a), unit_normal(b));
        assert_relative_eq!(na.x, -nb.x, epsilon = 1e-5);
        assert_relative_eq!(na.y, -nb.y, epsilon = 1e-5);
        assert_relative_eq!(na.z, -nb.z, epsilon = 1e-5);
    }
}

#[test]
fn should_transform_tex_coords_and_leave_the_pad_alone() {
    let mesh = cube();
    let mut compiler = GeometryCompiler::new();
    let plain = compiler
        .compile(&mesh, FaceSubset::Only(&[0]), &MeshTransform::default())
        .expect("cube compiles");
    let tiled = compiler
        .compile(
            &mesh,
            FaceSubset::Only(&[0]),
            &MeshTransform::default().with_tex_coords(tex_scale(2.0, 3.0)),
        )
        .expect("cube compiles");
    for (a, b) in plain.vertices().iter().zip(tiled.vertices()) {
        assert_relative_eq!(b.tex_coords[0], a.tex_coords[0] * 2.0);
        assert_relative_eq!(b.tex_coords[1], a.tex_coords[1] * 3.0);
        assert_eq!(b.tex_coords[2], 0.0);
        assert_eq!(a.position, b.position);
    }
}

#[test]
fn should_concatenate_parts_in_input_order() {
    let mesh = cube();
    let mut compiler = GeometryCompiler::new();
    let shifted = Matrix4::from_translation(Vector3::new(10.0, 0.0, 0.0));
    let geometry = compiler
        .compile_instanced(&[
            MeshPart {
                mesh: &mesh,
                faces: FaceSubset::Only(&[0, 1]),
                transform: MeshTransform::default(),
            },
            MeshPart {
                mesh: &mesh,
                faces: FaceSubset::All,
                transform: MeshTransform::model(shifted),
            },
        ])
        .expect("parts compile");
    assert_eq!(geometry.vertex_count(), 12 + 36);
    assert!(geometry.vertices()[..12].iter().all(|v| v.position[0] <= 1.0));
    assert!(geometry.vertices()[12..].iter().all(|v| v.position[0] >= 9.0));
}

#[test]
fn should_reject_faces_with_fewer_than_three_corners() {
    let mut mesh = cube();
    mesh.faces.push(Face::new(vec![1, 1, 1, 2, 2, 1]).expect("whole triples"));
    let err = GeometryCompiler::new()
        .compile(&mesh, FaceSubset::All, &MeshTransform::default())
        .unwrap_err();
    assert_eq!(err, MeshError::DegenerateFace { face: 6, arity: 2 });
}

#[test]
fn should_reject_zero_and_out_of_range_indices() {
    let mut mesh = cube();
    mesh.faces[0] = Face::new(vec![0, 1, 1, 5, 2, 1, 8, 3, 1]).expect("whole triples");
    let err = GeometryCompiler::new()
        .compile(&mesh, FaceSubset::All, &MeshTransform::default())
        .unwrap_err();
    assert_eq!(
        err,
        MeshError::IndexOutOfRange {
            face: 0,
            stream: Stream::Position,
            index: 0,
            len: 8,
        }
    );

    let mut mesh = cube();
    mesh.faces[2] = Face::new(vec![1, 1, 7, 2, 2, 3, 3, 3, 3]).expect("whole triples");
    let err = GeometryCompiler::new()
        .compile(&mesh, FaceSubset::All, &MeshTransform::default())
        .unwrap_err();
    assert_eq!(
        err,
        MeshError::IndexOutOfRange {
            face: 2,
            stream: Stream::Normal,
            index: 7,
            len: 6,
        }
    );
}

#[test]
fn should_reject_face_subsets_past_the_end() {
    let mesh = cube();
    let err = GeometryCompiler::new()
        .compile(&mesh, FaceSubset::Only(&[1, 6]), &MeshTransform::default())
        .unwrap_err();
    assert_eq!(err, MeshError::FaceSubsetOutOfRange { face: 6, len: 6 });
}

#[test]
fn should_reject_singular_model_transforms() {
    let mesh = cube();
    let err = GeometryCompiler::new()
        .compile(
            &mesh,
            FaceSubset::All,
            &MeshTransform::model(Matrix4::from_nonuniform_scale(1.0, 0.0, 1.0)),
        )
        .unwrap_err();
    assert_eq!(err, MeshError::SingularTransform);
}

#[test]
fn should_reject_json_faces_that_are_not_whole_triples() {
    let json = r#"{"v":[0,0,0],"vn":[0,1,0],"vt":[0,0],"f":[[1,1,1,1]]}"#;
    let err = RawMesh::from_json(json).unwrap_err();
    assert!(err.to_string().contains("has 4 indices"), "{}", err);
    assert_eq!(Face::new(vec![1, 1, 1, 1]), Err(FaceError::IncompleteTriple { len: 4 }));
    assert_eq!(Face::new(vec![]).map(|f| f.arity()), Ok(0));

    let json = r#"{"v":[0,0,0],"vn":[0,1,0],"vt":[0,0],"f":[[1,1,1,1,1,1,1,1,1]]}"#;
    let mesh = RawMesh::from_json(json).expect("whole triples decode");
    assert_eq!(mesh.faces[0].arity(), 3);
    assert_eq!(mesh.position_count(), 1);
}

#[test]
fn should_decode_the_bundled_cube() {
    let mesh = cube();
    assert_eq!(mesh.position_count(), 8);
    assert_eq!(mesh.normal_count(), 6);
    assert_eq!(mesh.tex_coord_count(), 4);
    assert_eq!(mesh.faces.len(), 6);
    assert!(mesh.faces.iter().all(|f| f.arity() == 4));
}
