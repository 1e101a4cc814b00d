//! Surface materials.

use crate::data_structures::instance::MaterialRaw;

/// Phong reflectance of a surface.
///
/// Materials are immutable and shared: every die of one player points at
/// the same `Arc<Material>`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
}

impl Material {
    pub const fn new(ambient: [f32; 3], diffuse: [f32; 3], specular: [f32; 3], shininess: f32) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
            shininess,
        }
    }

    /// A material whose ambient and diffuse terms share one 0-255 colour.
    pub fn from_rgb(ambient_diffuse: [u8; 3], specular: [u8; 3], shininess: f32) -> Self {
        let colour = rgb(ambient_diffuse);
        Self::new(colour, colour, rgb(specular), shininess)
    }

    pub fn to_raw(&self) -> MaterialRaw {
        MaterialRaw {
            ambient: self.ambient,
            diffuse: self.diffuse,
            specular: self.specular,
            shininess: self.shininess,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new([1.0; 3], [1.0; 3], [1.0; 3], 0.0)
    }
}

/// Converts a 0-255 colour to 0-1 floats.
pub fn rgb([r, g, b]: [u8; 3]) -> [f32; 3] {
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
}
