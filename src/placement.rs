//! Procedural placement of dice and tokens on the tabletop grid.
//!
//! Every object draws a cell uniformly from its bounds and redraws while the
//! cell is excluded: dice stay off the battlemap, tokens keep a one-cell
//! margin around dragons, and no two objects of a category share a cell.
//! Once everything is placed, dragons turn towards people and people turn
//! towards dragons.

use cgmath::{Deg, InnerSpace, Matrix4, Rad, SquareMatrix, Vector3};
use rand::Rng;
use thiserror::Error;

use crate::config::{Bounds, TableConfig};

/// Redraws allowed for one object before placement gives up.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 4096;

/// Half extent of the square kept clear around each dragon token.
const DRAGON_CLEARANCE: i32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridPos {
    pub x: i32,
    pub z: i32,
}

impl GridPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn distance2(self, other: GridPos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dz * dz
    }
}

/// An axis-aligned square on the grid, edges included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Square {
    pub center: GridPos,
    pub half_extent: i32,
}

impl Square {
    pub const fn new(center: GridPos, half_extent: i32) -> Self {
        Self {
            center,
            half_extent,
        }
    }

    pub fn contains(&self, p: GridPos) -> bool {
        (p.x - self.center.x).abs() <= self.half_extent && (p.z - self.center.z).abs() <= self.half_extent
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Die,
    Dragon,
    /// NPC and player tokens share one category.
    Person,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("no free cell for {category:?} after {attempts} attempts")]
    Exhausted { category: Category, attempts: usize },
}

/// Occupied cells per category for one spawn round.
#[derive(Clone, Debug, Default)]
pub struct PlacementState {
    pub dice: Vec<GridPos>,
    pub dragons: Vec<GridPos>,
    pub persons: Vec<GridPos>,
}

impl PlacementState {
    fn occupied(&self, category: Category) -> &[GridPos] {
        match category {
            Category::Die => &self.dice,
            Category::Dragon => &self.dragons,
            Category::Person => &self.persons,
        }
    }

    fn occupied_mut(&mut self, category: Category) -> &mut Vec<GridPos> {
        match category {
            Category::Die => &mut self.dice,
            Category::Dragon => &mut self.dragons,
            Category::Person => &mut self.persons,
        }
    }

    fn near_dragon(&self, p: GridPos) -> bool {
        self.dragons
            .iter()
            .any(|&d| Square::new(d, DRAGON_CLEARANCE).contains(p))
    }
}

pub struct PlacementPlanner<'c, R> {
    config: &'c TableConfig,
    rng: R,
    state: PlacementState,
}

impl<'c, R: Rng> PlacementPlanner<'c, R> {
    pub fn new(config: &'c TableConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            state: PlacementState::default(),
        }
    }

    pub fn state(&self) -> &PlacementState {
        &self.state
    }

    pub fn place_die(&mut self) -> Result<GridPos, PlacementError> {
        let battlemap = Square::new(GridPos::new(0, 0), self.config.battlemap_size);
        let bounds = self.config.dice_bounds;
        self.sample(Category::Die, bounds, |_, p| battlemap.contains(p))
    }

    pub fn place_dragon(&mut self) -> Result<GridPos, PlacementError> {
        let bounds = self.config.dragon_bounds();
        self.sample(Category::Dragon, bounds, |state, p| state.near_dragon(p))
    }

    pub fn place_person(&mut self) -> Result<GridPos, PlacementError> {
        let bounds = self.config.person_bounds();
        self.sample(Category::Person, bounds, |state, p| state.near_dragon(p))
    }

    fn sample(
        &mut self,
        category: Category,
        bounds: Bounds,
        excluded: impl Fn(&PlacementState, GridPos) -> bool,
    ) -> Result<GridPos, PlacementError> {
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let p = GridPos::new(
                self.rng.gen_range(bounds.x_range()),
                self.rng.gen_range(bounds.z_range()),
            );
            if excluded(&self.state, p) || self.state.occupied(category).contains(&p) {
                continue;
            }
            self.state.occupied_mut(category).push(p);
            return Ok(p);
        }
        log::error!(
            "Giving up on placing a {:?} after {} attempts",
            category,
            MAX_PLACEMENT_ATTEMPTS
        );
        Err(PlacementError::Exhausted {
            category,
            attempts: MAX_PLACEMENT_ATTEMPTS,
        })
    }

    /// Picks the nearest candidate twice as often as the second nearest.
    pub fn pick_target(&mut self, from: GridPos, candidates: &[GridPos]) -> Option<GridPos> {
        let (nearest, second) = nearest_two(from, candidates)?;
        match self.rng.gen_range(0..3) {
            2 => Some(second),
            _ => Some(nearest),
        }
    }
}

/// The nearest and second-nearest candidate by squared planar distance.
///
/// With a single candidate both are the same cell.
pub fn nearest_two(from: GridPos, candidates: &[GridPos]) -> Option<(GridPos, GridPos)> {
    let mut nearest: Option<GridPos> = None;
    let mut second: Option<GridPos> = None;
    for &c in candidates {
        let d = from.distance2(c);
        match nearest {
            Some(n) if d >= from.distance2(n) => {
                if second.is_none_or(|s| d < from.distance2(s)) {
                    second = Some(c);
                }
            }
            _ => {
                second = nearest;
                nearest = Some(c);
            }
        }
    }
    let nearest = nearest?;
    Some((nearest, second.unwrap_or(nearest)))
}

/// Rotation about +Y that turns a token at `from` towards `to`, before the
/// model's own quarter-turn offset is added.
pub fn facing_angle(from: GridPos, to: GridPos) -> Rad<f32> {
    let dx = (from.x - to.x) as f32;
    let dz = (from.z - to.z) as f32;
    Rad(-dz.atan2(dx))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DieKind {
    D20,
    D12,
    D10,
    D8,
    D6,
    D4,
}

impl DieKind {
    /// One full set, in spawn and draw order.
    pub const SET: [DieKind; 6] = [
        DieKind::D20,
        DieKind::D12,
        DieKind::D10,
        DieKind::D8,
        DieKind::D6,
        DieKind::D4,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DieKind::D20 => "d20",
            DieKind::D12 => "d12",
            DieKind::D10 => "d10",
            DieKind::D8 => "d8",
            DieKind::D6 => "d6",
            DieKind::D4 => "d4",
        }
    }

    /// Height at which the die rests on the table.
    pub fn resting_height(self) -> f32 {
        match self {
            DieKind::D20 => -5.67,
            DieKind::D12 => -5.708,
            DieKind::D10 => -5.767,
            DieKind::D8 => -5.774,
            DieKind::D6 => -5.81,
            DieKind::D4 => -5.865,
        }
    }

    /// Rotation that puts a face flat on the table.
    pub fn resting_rotation(self) -> Matrix4<f32> {
        let about = |angle: f32, axis: [f32; 3]| {
            Matrix4::from_axis_angle(Vector3::from(axis).normalize(), Deg(angle))
        };
        match self {
            DieKind::D20 => Matrix4::from_angle_x(Deg(21.0)),
            DieKind::D12 => Matrix4::from_angle_x(Deg(32.0)),
            DieKind::D10 => about(67.8981, [0.575152, -0.291944, 0.764178]),
            DieKind::D8 => about(57.0373, [0.762294, 0.247684, 0.597963]),
            DieKind::D6 => Matrix4::identity(),
            DieKind::D4 => about(56.4445, [0.771784, -0.243343, -0.587481]),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlacementKind {
    Die { die: DieKind, player: usize },
    DragonToken,
    NpcToken,
    PlayerToken(usize),
}

impl PlacementKind {
    pub fn category(&self) -> Category {
        match self {
            PlacementKind::Die { .. } => Category::Die,
            PlacementKind::DragonToken => Category::Dragon,
            PlacementKind::NpcToken | PlacementKind::PlayerToken(_) => Category::Person,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub kind: PlacementKind,
    pub cell: GridPos,
    pub transform: Matrix4<f32>,
}

fn translation(cell: GridPos, y: f32) -> Matrix4<f32> {
    Matrix4::from_translation(Vector3::new(cell.x as f32, y, cell.z as f32))
}

/// Places the whole census and returns it in draw order: dice, dragons,
/// then NPC and player tokens.
pub fn plan_census<R: Rng>(config: &TableConfig, rng: R) -> Result<Vec<Placement>, PlacementError> {
    let mut planner = PlacementPlanner::new(config, rng);

    let mut dragons = Vec::with_capacity(config.dragons);
    for _ in 0..config.dragons {
        let cell = planner.place_dragon()?;
        dragons.push(Placement {
            kind: PlacementKind::DragonToken,
            cell,
            transform: translation(cell, config.dragon_y),
        });
    }

    let mut persons = Vec::with_capacity(config.npcs + config.players);
    for _ in 0..config.npcs {
        let cell = planner.place_person()?;
        persons.push(Placement {
            kind: PlacementKind::NpcToken,
            cell,
            transform: translation(cell, config.person_y),
        });
    }
    for player in 0..config.players {
        let cell = planner.place_person()?;
        persons.push(Placement {
            kind: PlacementKind::PlayerToken(player),
            cell,
            transform: translation(cell, config.person_y),
        });
    }

    let sets = config.players * config.dice_sets_per_player;
    let mut dice = Vec::with_capacity(sets * DieKind::SET.len());
    for set in 0..sets {
        let player = set % config.players.max(1);
        for die in DieKind::SET {
            let cell = planner.place_die()?;
            dice.push(Placement {
                kind: PlacementKind::Die { die, player },
                cell,
                transform: translation(cell, die.resting_height()) * die.resting_rotation(),
            });
        }
    }

    if !dragons.is_empty() {
        let dragon_cells: Vec<GridPos> = dragons.iter().map(|p| p.cell).collect();
        let person_cells: Vec<GridPos> = persons.iter().map(|p| p.cell).collect();
        for dragon in &mut dragons {
            if let Some(target) = planner.pick_target(dragon.cell, &person_cells) {
                let angle = facing_angle(dragon.cell, target) + Rad::from(Deg(90.0));
                dragon.transform = dragon.transform * Matrix4::from_angle_y(angle);
            }
        }
        for person in &mut persons {
            if let Some(target) = planner.pick_target(person.cell, &dragon_cells) {
                let angle = facing_angle(person.cell, target) - Rad::from(Deg(90.0));
                person.transform = person.transform * Matrix4::from_angle_y(angle);
            }
        }
    }

    log::info!(
        "Placed {} dice, {} dragons and {} people",
        dice.len(),
        dragons.len(),
        persons.len()
    );

    let mut placements = dice;
    placements.append(&mut dragons);
    placements.append(&mut persons);
    Ok(placements)
}
