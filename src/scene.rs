//! The tabletop scene: room, table, battlemap, dice and tokens.
//!
//! [`Scene`] owns every entity together with the camera, the light and the
//! GPU assets they are drawn with. Input handlers mutate it and call
//! [`Scene::resume`]; the render step reads it.

use std::{collections::HashMap, sync::Arc};

use cgmath::{Deg, Matrix3, Matrix4, SquareMatrix, Vector3};

use crate::{
    camera::{CameraController, CameraState, CameraUpdate},
    config::TableConfig,
    data_structures::{
        material::Material,
        model::{Asset, AssetId},
        raw_mesh::RawMesh,
        texture::{Interpolation, TextureId, TextureRegistry},
        thing::Thing,
    },
    pipelines::light::LightState,
    placement::{DieKind, Placement, PlacementKind},
    render::{AnimationClock, FrameScheduler},
    resources::{
        load_raw_mesh,
        mesh::{FaceSubset, GeometryCompiler, MeshPart, MeshTransform},
    },
};

const fn grey(v: f32) -> [f32; 3] {
    [v, v, v]
}

pub const WALLS_MATERIAL: Material = Material::new(grey(1.5), grey(3.0), grey(1.0), 0.0);
pub const TABLE_MATERIAL: Material = Material::new(grey(1.0), grey(1.25), grey(1.0), 0.0);
pub const BATTLEMAP_MATERIAL: Material = Material::new(grey(0.9), grey(1.0), grey(0.25), 200.0);
pub const NPC_MATERIAL: Material = Material::new(grey(0.5), grey(0.75), grey(1.0), 0.0);

/// Cube faces used for the room and the battlemap.
const CUBE_NEG_X: usize = 0;
const CUBE_WALLS: [usize; 4] = [0, 1, 2, 3];
const CUBE_FLOOR: usize = 4;
const CUBE_CEILING: usize = 5;

const ROOM_SCALE: [f32; 3] = [40.0, 30.0, 50.0];
const TEXTURE_ASPECT: f32 = 1.66667;
const DICE_SCALE: f32 = 0.005;
const TOKEN_SCALE: f32 = 0.03;

/// Assets and shared materials the census is built from.
#[derive(Clone, Debug)]
pub struct CensusAssets {
    pub dice: HashMap<DieKind, AssetId>,
    pub dragon_token: AssetId,
    pub person_token: AssetId,
    pub npc_texture: TextureId,
    pub npc_material: Arc<Material>,
    /// One per player, shared by the player's token and dice.
    pub player_materials: Vec<Arc<Material>>,
}

impl CensusAssets {
    pub fn player_material(&self, player: usize) -> Arc<Material> {
        match self.player_materials.len() {
            0 => Arc::new(Material::default()),
            n => self.player_materials[player % n].clone(),
        }
    }

    /// The entity for one placement.
    ///
    /// Returns `None` for a die whose asset is missing.
    pub fn thing(&self, placement: &Placement) -> Option<Thing> {
        let thing = match placement.kind {
            PlacementKind::Die { die, player } => {
                Thing::new(*self.dice.get(&die)?, self.player_material(player))
            }
            PlacementKind::DragonToken => Thing::new(self.dragon_token, self.npc_material.clone()),
            PlacementKind::NpcToken => Thing::new(self.person_token, self.npc_material.clone())
                .with_texture(Some(self.npc_texture)),
            PlacementKind::PlayerToken(player) => {
                Thing::new(self.person_token, self.player_material(player))
            }
        };
        Some(thing.with_model(placement.transform))
    }
}

pub struct Scene {
    pub things: Vec<Thing>,
    pub camera: CameraController,
    pub light: LightState,
    pub clock: AnimationClock,
    pub scheduler: FrameScheduler,
    pub assets: Vec<Asset>,
    pub textures: TextureRegistry,
    asset_names: HashMap<String, AssetId>,
    light_view_position: Vector3<f32>,
}

impl Scene {
    /// An empty scene. The first frame is already scheduled and the shadow
    /// map is marked stale.
    pub fn new(camera: CameraController, light: LightState) -> Self {
        let light_view_position = light.view_space_position(camera.view());
        let mut scheduler = FrameScheduler::new();
        scheduler.resume();
        Self {
            things: Vec::new(),
            camera,
            light,
            clock: AnimationClock::new(),
            scheduler,
            assets: Vec::new(),
            textures: TextureRegistry::new(),
            asset_names: HashMap::new(),
            light_view_position,
        }
    }

    /// Request a frame. Returns `true` when the host has to be asked for a
    /// redraw.
    pub fn resume(&mut self) -> bool {
        self.scheduler.resume()
    }

    pub fn light_view_position(&self) -> Vector3<f32> {
        self.light_view_position
    }

    /// Refresh what depends on the camera and schedule a frame.
    pub fn apply_camera(&mut self, update: CameraUpdate) -> bool {
        if update.is_none() {
            return false;
        }
        if update.view_changed() {
            self.light_view_position = self.light.view_space_position(self.camera.view());
        }
        self.resume()
    }

    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        let update = self.camera.set_aspect(width as f32 / height as f32);
        self.apply_camera(update)
    }

    pub fn set_light_position(&mut self, position: [f32; 3]) -> bool {
        self.light.set_position(position);
        self.light_view_position = self.light.view_space_position(self.camera.view());
        self.resume()
    }

    /// Queue a decoded image for its texture slot and schedule the frame
    /// that uploads it.
    pub fn deliver_texture(&mut self, id: TextureId, image: image::DynamicImage) -> bool {
        self.textures.deliver(id, image);
        self.resume()
    }

    pub fn add_asset(&mut self, asset: Asset) -> AssetId {
        let id = AssetId(self.assets.len());
        self.asset_names.insert(asset.name.clone(), id);
        self.assets.push(asset);
        id
    }

    pub fn asset_id(&self, name: &str) -> Option<AssetId> {
        self.asset_names.get(name).copied()
    }

    pub fn asset(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(id.0)
    }

    pub fn add_thing(&mut self, thing: Thing) {
        self.things.push(thing);
        self.light.mark_dirty();
    }

    /// Append the entities of a spawn round and schedule a frame with a
    /// fresh shadow map.
    pub fn spawn(&mut self, placements: &[Placement], census: &CensusAssets) -> bool {
        let before = self.things.len();
        for placement in placements {
            match census.thing(placement) {
                Some(thing) => self.things.push(thing),
                None => log::warn!("No asset for {:?}, skipping it", placement.kind),
            }
        }
        log::info!("Spawned {} things", self.things.len() - before);
        self.light.mark_dirty();
        self.resume()
    }

    /// Build the full tabletop: load and compile every mesh, register the
    /// textures, set up the room and spawn a random census.
    pub async fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &TableConfig,
        aspect: f32,
    ) -> anyhow::Result<Self> {
        let camera = CameraController::new(CameraState::default(), aspect);
        let mut scene = Scene::new(camera, LightState::new(config.light_position));
        let census = scene.build_assets(device, queue, config).await?;
        scene.build_fixtures(config);

        let placements = crate::placement::plan_census(config, rand::thread_rng())?;
        scene.spawn(&placements, &census);
        Ok(scene)
    }

    async fn build_assets(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &TableConfig,
    ) -> anyhow::Result<CensusAssets> {
        let mut compiler = GeometryCompiler::new();
        let empty = self.textures.solid(device, queue, [255, 255, 255], "empty");
        let wood = self
            .textures
            .load(device, queue, "textures/wood.jpg", Interpolation::Linear, [245, 177, 107]);

        let cube = load_raw_mesh("meshes/cube.json").await?;
        let room = Matrix4::from_nonuniform_scale(ROOM_SCALE[0], ROOM_SCALE[1], ROOM_SCALE[2]);
        let room_surfaces = [
            ("ceiling", &[CUBE_CEILING][..], 4.0, "textures/ceiling.jpg", [201, 194, 178]),
            ("walls", &CUBE_WALLS[..], 2.0, "textures/walls.jpg", [198, 198, 198]),
            ("floor", &[CUBE_FLOOR][..], 4.0, "textures/floor.jpg", [148, 89, 45]),
        ];
        for (name, faces, repeat, file, fallback) in room_surfaces {
            let transform = MeshTransform::model(room)
                .with_tex_coords(tex_scale(repeat, repeat * TEXTURE_ASPECT))
                .inverted();
            let geometry = compiler.compile(&cube, FaceSubset::Only(faces), &transform)?;
            let texture = self
                .textures
                .load(device, queue, file, Interpolation::Linear, fallback);
            self.add_asset(Asset::new(device, name, &geometry, texture));
        }

        let table = load_raw_mesh("meshes/table.json").await?;
        let transform = MeshTransform::model(
            Matrix4::from_translation(Vector3::new(0.0, -10.3, 0.0))
                * Matrix4::from_scale(0.1)
                * Matrix4::from_angle_y(Deg(90.0)),
        );
        let geometry = compiler.compile(&table, FaceSubset::All, &transform)?;
        let texture = self.textures.load(
            device,
            queue,
            "textures/table-composite.jpg",
            Interpolation::Linear,
            [194, 159, 121],
        );
        self.add_asset(Asset::new(device, "table", &geometry, texture));

        let transform = MeshTransform::model(Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0)))
            .with_tex_coords(tex_scale(32.0, 32.0));
        let geometry = compiler.compile(&cube, FaceSubset::Only(&[CUBE_NEG_X]), &transform)?;
        let texture = self
            .textures
            .load(device, queue, "textures/grid.gif", Interpolation::Nearest, [255, 255, 255]);
        self.add_asset(Asset::new(device, "battlemap", &geometry, texture));

        let mut dice = HashMap::new();
        let transform = MeshTransform::model(Matrix4::from_scale(DICE_SCALE));
        for die in DieKind::SET {
            let mesh = load_raw_mesh(&format!("meshes/{}.json", die.name())).await?;
            let geometry = compiler.compile(&mesh, FaceSubset::All, &transform)?;
            let texture = self.textures.load(
                device,
                queue,
                &format!("textures/{}.png", die.name()),
                Interpolation::Linear,
                [255, 255, 255],
            );
            dice.insert(die, self.add_asset(Asset::new(device, die.name(), &geometry, texture)));
        }

        let half = Matrix4::from_scale(TOKEN_SCALE);
        let mirrored = half * Matrix4::from_nonuniform_scale(1.0, 1.0, -1.0) * Matrix4::from_angle_y(Deg(180.0));
        let mut token = |mesh: &RawMesh| {
            compiler.compile_instanced(&[
                MeshPart {
                    mesh,
                    faces: FaceSubset::All,
                    transform: MeshTransform::model(half),
                },
                MeshPart {
                    mesh,
                    faces: FaceSubset::All,
                    transform: MeshTransform::model(mirrored),
                },
            ])
        };
        let person = token(&load_raw_mesh("meshes/token-person-half.json").await?)?;
        let dragon = token(&load_raw_mesh("meshes/token-dragon-half.json").await?)?;
        let person_token = self.add_asset(Asset::new(device, "person-token", &person, empty));
        let dragon_token = self.add_asset(Asset::new(device, "dragon-token", &dragon, wood));

        log::info!(
            "Loaded {} assets and {} textures",
            self.assets.len(),
            self.textures.len()
        );

        Ok(CensusAssets {
            dice,
            dragon_token,
            person_token,
            npc_texture: wood,
            npc_material: Arc::new(NPC_MATERIAL),
            player_materials: (0..config.players)
                .map(|player| Arc::new(config.player_material(player)))
                .collect(),
        })
    }

    /// Room, table and battlemap, in draw order.
    fn build_fixtures(&mut self, config: &TableConfig) {
        let default = Arc::new(Material::default());
        let fixtures = [
            ("ceiling", Arc::new(WALLS_MATERIAL), Matrix4::identity()),
            ("walls", default.clone(), Matrix4::identity()),
            ("floor", default, Matrix4::identity()),
            ("table", Arc::new(TABLE_MATERIAL), Matrix4::identity()),
            (
                "battlemap",
                Arc::new(BATTLEMAP_MATERIAL),
                Matrix4::from_translation(Vector3::new(0.0, -6.05, 0.0))
                    * Matrix4::from_scale(config.battlemap_size as f32)
                    * Matrix4::from_angle_z(Deg(-90.0)),
            ),
        ];
        for (name, material, model) in fixtures {
            match self.asset_id(name) {
                Some(asset) => self.add_thing(Thing::new(asset, material).with_model(model)),
                None => log::warn!("No asset named {}", name),
            }
        }
    }
}

/// 2D texcoord scale as a homogeneous 3x3 matrix.
pub fn tex_scale(u: f32, v: f32) -> Matrix3<f32> {
    #[rustfmt::skip]
    let m = Matrix3::new(
        u, 0.0, 0.0,
        0.0, v, 0.0,
        0.0, 0.0, 1.0,
    );
    m
}
