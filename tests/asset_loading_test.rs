#![cfg(not(target_arch = "wasm32"))]

use table_ngin::resources::{
    load_raw_mesh,
    texture::{asset_path, asset_roots},
};

#[test]
fn should_search_the_build_copy_of_the_assets() {
    let roots = asset_roots();
    let built = roots.last().expect("built-in roots");
    assert!(built.ends_with("assets"));
    assert!(built.join("meshes/cube.json").is_file());

    assert!(asset_path("meshes/cube.json").is_file());
    assert!(asset_path("meshes/d100.json").starts_with(built));
}

#[tokio::test]
async fn should_load_meshes_from_the_asset_roots() {
    let mesh = load_raw_mesh("meshes/cube.json").await.expect("cube loads");
    assert_eq!(mesh.faces.len(), 6);

    let err = load_raw_mesh("meshes/d100.json").await.unwrap_err();
    assert!(format!("{:#}", err).contains("d100.json"), "{:#}", err);
}
