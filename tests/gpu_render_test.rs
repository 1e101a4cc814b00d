#![cfg(feature = "integration-tests")]

use std::sync::Arc;

use cgmath::{Matrix4, Vector3};
use table_ngin::{
    camera::{CameraController, CameraState},
    data_structures::{
        material::Material,
        model::Asset,
        raw_mesh::RawMesh,
        texture::{Interpolation, Texture, TextureId, TextureRegistry},
        thing::Thing,
    },
    pipelines::{Renderer, light::LightState},
    render::Pass,
    resources::mesh::{FaceSubset, GeometryCompiler, MeshTransform},
    scene::Scene,
};

const CUBE: &str = include_str!("../assets/meshes/cube.json");
const SIZE: u32 = 64;

fn device() -> Option<(wgpu::Device, wgpu::Queue, bool)> {
    futures::executor::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()?;
        let depth_sampling = adapter
            .get_texture_format_features(Texture::DEPTH_FORMAT)
            .allowed_usages
            .contains(wgpu::TextureUsages::TEXTURE_BINDING);
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .ok()?;
        Some((device, queue, depth_sampling))
    })
}

fn target(device: &wgpu::Device) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("test target"),
            size: wgpu::Extent3d {
                width: SIZE,
                height: SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

#[test]
fn should_render_a_lit_cube_with_shadows() {
    let Some((device, queue, depth_sampling)) = device() else {
        eprintln!("No adapter available, skipping");
        return;
    };
    let mut renderer = Renderer::new(
        &device,
        &queue,
        wgpu::TextureFormat::Rgba8UnormSrgb,
        depth_sampling,
        1024,
    )
    .expect("programs compile");
    assert_eq!(renderer.shadows_enabled(), depth_sampling);
    if depth_sampling {
        assert_eq!(renderer.shadow_size(), 1024.min(device.limits().max_texture_dimension_2d));
    }

    let camera = CameraController::new(CameraState::default(), 1.0);
    let mut scene = Scene::new(camera, LightState::new([0.0, 30.0, 0.0]));
    let mesh = RawMesh::from_json(CUBE).expect("cube decodes");
    let geometry = GeometryCompiler::new()
        .compile(&mesh, FaceSubset::All, &MeshTransform::model(Matrix4::from_scale(3.0)))
        .expect("cube compiles");
    let white = scene.textures.solid(&device, &queue, [255, 255, 255], "white");
    let cube = scene.add_asset(Asset::new(&device, "cube", &geometry, white));
    scene.add_thing(
        Thing::new(cube, Arc::new(Material::default()))
            .with_model(Matrix4::from_translation(Vector3::new(0.0, 2.0, 0.0))),
    );

    let color = target(&device);
    let depth = Texture::create_depth_texture(&device, [SIZE, SIZE], "test depth");

    let first = renderer.render(&device, &queue, &mut scene, &color, &depth.view, wgpu::Color::BLACK);
    if depth_sampling {
        assert_eq!(first.passes(), &[Pass::Shadow, Pass::Main]);
    } else {
        assert_eq!(first.passes(), &[Pass::Main]);
    }
    let second = renderer.render(&device, &queue, &mut scene, &color, &depth.view, wgpu::Color::BLACK);
    assert_eq!(second.passes(), &[Pass::Main]);
}

fn extent(registry: &TextureRegistry, id: TextureId) -> (u32, u32) {
    let texture = &registry.texture(id).expect("slot exists").texture;
    (texture.width(), texture.height())
}

#[test]
fn should_swap_placeholders_for_delivered_images() {
    let Some((device, queue, _)) = device() else {
        eprintln!("No adapter available, skipping");
        return;
    };
    let mut registry = TextureRegistry::new();
    let wood = registry.load(&device, &queue, "textures/wood.png", Interpolation::Linear, [128, 96, 64]);
    let felt = registry.load(&device, &queue, "textures/felt.png", Interpolation::Nearest, [0, 96, 0]);
    assert_eq!(registry.take_requests().len(), 2);
    assert_eq!(extent(&registry, wood), (1, 1));
    assert_eq!(extent(&registry, felt), (1, 1));

    registry.deliver(wood, image::DynamicImage::new_rgba8(4, 2));
    // An image without pixels cannot be uploaded.
    registry.deliver(felt, image::DynamicImage::new_rgba8(0, 0));
    registry.deliver(TextureId(99), image::DynamicImage::new_rgba8(1, 1));
    assert_eq!(registry.upload_pending(&device, &queue), 1);

    assert_eq!(extent(&registry, wood), (4, 2));
    assert_eq!(extent(&registry, felt), (1, 1));
    assert!(registry.bind_group(felt).is_some());
    assert_eq!(registry.upload_pending(&device, &queue), 0);
}

#[test]
fn should_upload_delivered_images_on_the_next_frame() {
    let Some((device, queue, depth_sampling)) = device() else {
        eprintln!("No adapter available, skipping");
        return;
    };
    let mut renderer = Renderer::new(
        &device,
        &queue,
        wgpu::TextureFormat::Rgba8UnormSrgb,
        depth_sampling,
        256,
    )
    .expect("programs compile");
    let camera = CameraController::new(CameraState::default(), 1.0);
    let mut scene = Scene::new(camera, LightState::new([0.0, 30.0, 0.0]));
    let wood = scene
        .textures
        .load(&device, &queue, "textures/wood.png", Interpolation::Linear, [128, 96, 64]);

    let color = target(&device);
    let depth = Texture::create_depth_texture(&device, [SIZE, SIZE], "test depth");
    renderer.render(&device, &queue, &mut scene, &color, &depth.view, wgpu::Color::BLACK);
    assert!(!scene.scheduler.is_pending());

    assert!(scene.deliver_texture(wood, image::DynamicImage::new_rgba8(8, 8)));
    assert_eq!(extent(&scene.textures, wood), (1, 1));
    let plan = renderer.render(&device, &queue, &mut scene, &color, &depth.view, wgpu::Color::BLACK);
    assert_eq!(plan.passes(), &[Pass::Main]);
    assert_eq!(extent(&scene.textures, wood), (8, 8));
    assert!(!scene.scheduler.is_pending());
}
