use std::{collections::HashMap, sync::Arc};

use rand::{SeedableRng, rngs::StdRng};
use table_ngin::{
    camera::{CameraController, CameraState},
    config::TableConfig,
    data_structures::{material::Material, model::AssetId, texture::TextureId},
    pipelines::light::LightState,
    placement::{DieKind, PlacementKind, plan_census},
    render::{Pass, PassRecorder, render_frame},
    scene::{CensusAssets, NPC_MATERIAL, Scene},
};

const DRAGON: AssetId = AssetId(100);
const PERSON: AssetId = AssetId(101);
const WOOD: TextureId = TextureId(7);

fn census(config: &TableConfig) -> CensusAssets {
    let dice = DieKind::SET
        .iter()
        .enumerate()
        .map(|(i, die)| (*die, AssetId(i)))
        .collect::<HashMap<_, _>>();
    CensusAssets {
        dice,
        dragon_token: DRAGON,
        person_token: PERSON,
        npc_texture: WOOD,
        npc_material: Arc::new(NPC_MATERIAL),
        player_materials: (0..config.players)
            .map(|player| Arc::new(config.player_material(player)))
            .collect(),
    }
}

fn scene() -> Scene {
    let camera = CameraController::new(CameraState::default(), 1.0);
    Scene::new(camera, LightState::new([0.0, 30.0, 0.0]))
}

struct Discard;

impl PassRecorder for Discard {
    fn shadows_enabled(&self) -> bool {
        true
    }

    fn record(&mut self, _: Pass, _: &Scene) {}
}

#[test]
fn should_share_one_material_per_player() {
    let config = TableConfig::default();
    let assets = census(&config);
    let placements = plan_census(&config, StdRng::seed_from_u64(1)).expect("default census fits");
    let mut scene = scene();
    scene.spawn(&placements, &assets);
    assert_eq!(scene.things.len(), placements.len());

    for (placement, thing) in placements.iter().zip(&scene.things) {
        match placement.kind {
            PlacementKind::Die { die, player } => {
                assert_eq!(thing.asset, assets.dice[&die]);
                assert!(Arc::ptr_eq(&thing.material, &assets.player_materials[player]));
                assert_eq!(thing.texture, None);
            }
            PlacementKind::PlayerToken(player) => {
                assert_eq!(thing.asset, PERSON);
                assert!(Arc::ptr_eq(&thing.material, &assets.player_materials[player]));
                assert_eq!(thing.texture, None);
            }
            PlacementKind::NpcToken => {
                assert_eq!(thing.asset, PERSON);
                assert!(Arc::ptr_eq(&thing.material, &assets.npc_material));
                assert_eq!(thing.texture, Some(WOOD));
            }
            PlacementKind::DragonToken => {
                assert_eq!(thing.asset, DRAGON);
                assert!(Arc::ptr_eq(&thing.material, &assets.npc_material));
                assert_eq!(thing.texture, None);
            }
        }
        assert_eq!(thing.model, placement.transform);
    }
}

#[test]
fn should_build_player_materials_from_the_palette() {
    let config = TableConfig::default();
    let material = config.player_material(0);
    let colors = config.player_colors(0);
    assert_eq!(material, Material::from_rgb(colors.ambient_diffuse, colors.specular, 20.0));
    assert_eq!(material.ambient, material.diffuse);

    let wrapped = config.player_material(config.palette.len());
    assert_eq!(wrapped, material);
}

#[test]
fn should_skip_dice_without_an_asset() {
    let config = TableConfig::default();
    let mut assets = census(&config);
    assets.dice.remove(&DieKind::D4);
    let placements = plan_census(&config, StdRng::seed_from_u64(2)).expect("default census fits");
    let d4 = placements
        .iter()
        .filter(|p| matches!(p.kind, PlacementKind::Die { die: DieKind::D4, .. }))
        .count();
    assert_eq!(d4, config.players * config.dice_sets_per_player);

    let mut scene = scene();
    scene.spawn(&placements, &assets);
    assert_eq!(scene.things.len(), placements.len() - d4);
}

#[test]
fn should_refresh_shadows_and_schedule_a_frame_on_spawn() {
    let config = TableConfig::default();
    let assets = census(&config);
    let mut scene = scene();
    render_frame(&mut scene, &mut Discard);
    assert!(!scene.light.needs_shadow_pass());
    assert!(!scene.scheduler.is_pending());

    let placements = plan_census(&config, StdRng::seed_from_u64(3)).expect("default census fits");
    assert!(scene.spawn(&placements, &assets));
    assert!(scene.light.needs_shadow_pass());
    assert!(scene.scheduler.is_pending());
}

#[test]
fn should_schedule_one_frame_per_arriving_texture_batch() {
    let mut scene = scene();
    render_frame(&mut scene, &mut Discard);
    assert!(!scene.scheduler.is_pending());

    let image = image::DynamicImage::new_rgba8(2, 2);
    assert!(scene.deliver_texture(WOOD, image.clone()));
    assert!(scene.scheduler.is_pending());
    // A second image before the frame runs rides along with it.
    assert!(!scene.deliver_texture(TextureId(8), image));
    assert!(scene.scheduler.is_pending());

    render_frame(&mut scene, &mut Discard);
    assert!(!scene.scheduler.is_pending());
    assert_eq!(scene.scheduler.frames_rendered(), 2);
}

#[test]
fn should_fall_back_to_a_default_material_without_players() {
    let config = TableConfig {
        players: 0,
        ..TableConfig::default()
    };
    let assets = census(&config);
    assert_eq!(*assets.player_material(3), Material::default());
}
