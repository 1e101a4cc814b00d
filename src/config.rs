//! Scene configuration: census counts, player palettes and table geometry.

use std::ops::RangeInclusive;

use crate::data_structures::material::Material;

/// Ambient/diffuse and specular colour of one player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerColors {
    pub ambient_diffuse: [u8; 3],
    pub specular: [u8; 3],
}

impl PlayerColors {
    pub const fn new(ambient_diffuse: [u8; 3], specular: [u8; 3]) -> Self {
        Self {
            ambient_diffuse,
            specular,
        }
    }
}

pub const PLAYER_SHININESS: f32 = 20.0;

pub const DEFAULT_PALETTE: [PlayerColors; 5] = [
    PlayerColors::new([237, 112, 20], [253, 167, 35]),
    PlayerColors::new([115, 81, 224], [171, 129, 249]),
    PlayerColors::new([40, 217, 69], [69, 247, 112]),
    PlayerColors::new([222, 70, 70], [249, 114, 114]),
    PlayerColors::new([70, 123, 222], [114, 179, 249]),
];

/// An inclusive integer range on the tabletop grid.
///
/// The ends may be given in either order; `min <= max` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    min_x: i32,
    max_x: i32,
    min_z: i32,
    max_z: i32,
}

impl Bounds {
    pub fn new(x: (i32, i32), z: (i32, i32)) -> Self {
        Self {
            min_x: x.0.min(x.1),
            max_x: x.0.max(x.1),
            min_z: z.0.min(z.1),
            max_z: z.0.max(z.1),
        }
    }

    /// A square of `±half_extent` around the origin.
    pub fn centered(half_extent: i32) -> Self {
        Self::new((-half_extent, half_extent), (-half_extent, half_extent))
    }

    pub fn contains(&self, x: i32, z: i32) -> bool {
        self.x_range().contains(&x) && self.z_range().contains(&z)
    }

    pub fn x_range(&self) -> RangeInclusive<i32> {
        self.min_x..=self.max_x
    }

    pub fn z_range(&self) -> RangeInclusive<i32> {
        self.min_z..=self.max_z
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableConfig {
    pub players: usize,
    pub npcs: usize,
    pub dragons: usize,
    pub dice_sets_per_player: usize,
    /// Indexed by player; players beyond its length wrap around.
    pub palette: Vec<PlayerColors>,
    /// Half extent of the square battlemap in grid units.
    pub battlemap_size: i32,
    pub dice_bounds: Bounds,
    pub dragon_y: f32,
    pub person_y: f32,
    pub light_position: [f32; 3],
    /// Upper bound on the shadow map edge length, also capped by the device.
    pub shadow_map_cap: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            players: 5,
            npcs: 2,
            dragons: 3,
            dice_sets_per_player: 2,
            palette: DEFAULT_PALETTE.to_vec(),
            battlemap_size: 8,
            dice_bounds: Bounds::new((-10, 10), (19, -19)),
            dragon_y: -5.45,
            person_y: -6.066,
            light_position: [0.0, 30.0, 0.0],
            shadow_map_cap: 6144,
        }
    }
}

impl TableConfig {
    /// Dragons keep two cells from the battlemap edge.
    pub fn dragon_bounds(&self) -> Bounds {
        Bounds::centered(self.battlemap_size - 2)
    }

    /// People keep one cell from the battlemap edge.
    pub fn person_bounds(&self) -> Bounds {
        Bounds::centered(self.battlemap_size - 1)
    }

    pub fn player_colors(&self, player: usize) -> PlayerColors {
        if self.palette.is_empty() {
            return PlayerColors::new([255, 255, 255], [255, 255, 255]);
        }
        self.palette[player % self.palette.len()]
    }

    pub fn player_material(&self, player: usize) -> Material {
        let colors = self.player_colors(player);
        Material::from_rgb(colors.ambient_diffuse, colors.specular, PLAYER_SHININESS)
    }
}
