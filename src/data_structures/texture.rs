//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources,
//! helpers for depth and shadow-map targets, and the [`TextureRegistry`]
//! that hands out placeholder textures and swaps in decoded images once
//! they arrive.

use anyhow::*;
use image::GenericImageView;

use crate::resources::texture::diffuse_layout;

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

/// How a texture is magnified when a texel covers several pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    #[default]
    Linear,
    Nearest,
}

impl From<Interpolation> for wgpu::FilterMode {
    fn from(interpolation: Interpolation) -> Self {
        match interpolation {
            Interpolation::Linear => wgpu::FilterMode::Linear,
            Interpolation::Nearest => wgpu::FilterMode::Nearest,
        }
    }
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create the depth buffer used by the main pass.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Create a square depth target that is rendered from the light and
    /// later sampled with a comparison sampler.
    pub fn create_shadow_map(device: &wgpu::Device, size: u32) -> Self {
        let size = size.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow_map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        }));

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Create a 1x1 texture of a single colour.
    ///
    /// Used as the stand-in for images that are still loading, and kept
    /// for good if the load fails.
    pub fn create_solid_colour(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgb: [u8; 3],
        label: &str,
    ) -> Texture {
        let size = wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        };
        let data = [rgb[0], rgb[1], rgb[2], 255];

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_sampler(device, Interpolation::Linear));
        Texture {
            texture,
            view,
            sampler,
        }
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        interpolation: Interpolation,
    ) -> Result<Self> {
        let dimensions = img.dimensions();
        ensure!(
            dimensions.0 > 0 && dimensions.1 > 0,
            "image {:?} has no pixels",
            label
        );
        let rgba = img.to_rgba8();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_sampler(device, interpolation));

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }
}

pub fn create_sampler(device: &wgpu::Device, interpolation: Interpolation) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: interpolation.into(),
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

/// Handle of a texture slot in the [`TextureRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// An image that should be fetched and decoded off the render path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureRequest {
    pub id: TextureId,
    pub file: String,
}

struct TextureSlot {
    texture: Texture,
    bind_group: wgpu::BindGroup,
    interpolation: Interpolation,
    label: String,
}

/// Owns every diffuse texture of the scene.
///
/// Entities refer to textures by [`TextureId`]. A slot starts out as a
/// solid-colour placeholder; a decoded image delivered later replaces the
/// slot's texture and bind group in one step during the next render, so the
/// placeholder stays valid GPU state until then. Every bind group shares
/// one diffuse layout, built on first use.
#[derive(Default)]
pub struct TextureRegistry {
    layout: Option<wgpu::BindGroupLayout>,
    slots: Vec<TextureSlot>,
    requests: Vec<TextureRequest>,
    pending: Vec<(TextureId, image::DynamicImage)>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Register a solid-colour texture that is never replaced.
    pub fn solid(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgb: [u8; 3],
        label: &str,
    ) -> TextureId {
        let texture = Texture::create_solid_colour(device, queue, rgb, label);
        self.push(device, texture, Interpolation::Linear, label)
    }

    /// Register a placeholder of colour `fallback` and queue `file` for loading.
    pub fn load(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        file: &str,
        interpolation: Interpolation,
        fallback: [u8; 3],
    ) -> TextureId {
        let texture = Texture::create_solid_colour(device, queue, fallback, file);
        let id = self.push(device, texture, interpolation, file);
        self.requests.push(TextureRequest {
            id,
            file: file.to_string(),
        });
        id
    }

    /// Drain the images that still have to be fetched.
    pub fn take_requests(&mut self) -> Vec<TextureRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Queue a decoded image for upload on the next render step.
    pub fn deliver(&mut self, id: TextureId, image: image::DynamicImage) {
        self.pending.push((id, image));
    }

    /// Upload queued images, replacing their placeholders.
    ///
    /// An image that cannot be uploaded leaves its placeholder in place.
    pub fn upload_pending(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> usize {
        let layout = self.layout.get_or_insert_with(|| diffuse_layout(device));
        let mut uploaded = 0;
        for (id, image) in std::mem::take(&mut self.pending) {
            let Some(slot) = self.slots.get_mut(id.0) else {
                log::warn!("Dropping image for unknown texture slot {}", id.0);
                continue;
            };
            match Texture::from_image(device, queue, &image, Some(&slot.label), slot.interpolation) {
                Result::Ok(texture) => {
                    slot.bind_group = mk_bind_group(device, layout, &texture, &slot.label);
                    slot.texture = texture;
                    uploaded += 1;
                }
                Err(e) => log::warn!("Keeping placeholder for {}: {}", slot.label, e),
            }
        }
        uploaded
    }

    pub fn bind_group(&self, id: TextureId) -> Option<&wgpu::BindGroup> {
        self.slots.get(id.0).map(|slot| &slot.bind_group)
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.slots.get(id.0).map(|slot| &slot.texture)
    }

    fn push(
        &mut self,
        device: &wgpu::Device,
        texture: Texture,
        interpolation: Interpolation,
        label: &str,
    ) -> TextureId {
        let layout = self.layout.get_or_insert_with(|| diffuse_layout(device));
        let bind_group = mk_bind_group(device, layout, &texture, label);
        self.slots.push(TextureSlot {
            texture,
            bind_group,
            interpolation,
            label: label.to_string(),
        });
        TextureId(self.slots.len() - 1)
    }
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &Texture,
    label: &str,
) -> wgpu::BindGroup {
    let fallback_sampler;
    let sampler = match &texture.sampler {
        Some(sampler) => sampler,
        None => {
            fallback_sampler = create_sampler(device, Interpolation::Linear);
            &fallback_sampler
        }
    };
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some(label),
    })
}
