//! GPU side of the two-pass shadow-mapped renderer.
//!
//! - `program` has the typed unlit and lit programs and their layouts
//! - `light` has the light state and the frame-global uniform blocks
//!
//! [`Renderer`] owns both programs, the shadow map and the per-entity
//! uniform buffers, and records the passes of a [`FramePlan`].

use cgmath::{Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::{EntityUniform, MaterialRaw},
        model::DrawAsset,
        texture::Texture,
    },
    pipelines::{
        light::{LitGlobals, UnlitGlobals},
        program::{
            DIFFUSE_GROUP, ENTITY_GROUP, GLOBALS_GROUP, Program, ProgramKind, lit_globals_layout,
            uniform_layout,
        },
    },
    render::{FramePlan, Pass, PassRecorder, render_frame},
    resources::texture::diffuse_layout,
    scene::Scene,
};

pub mod light;
pub mod program;

/// Colour written by the unlit program; only depth is kept.
const SHADOW_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Both uniform buffers of one entity, one per pass.
struct EntityBindings {
    main_buffer: wgpu::Buffer,
    main_group: wgpu::BindGroup,
    shadow_buffer: wgpu::Buffer,
    shadow_group: wgpu::BindGroup,
}

impl EntityBindings {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, index: usize) -> Self {
        let (main_buffer, main_group) =
            mk_uniform(device, layout, &format!("entity {} main", index));
        let (shadow_buffer, shadow_group) =
            mk_uniform(device, layout, &format!("entity {} shadow", index));
        Self {
            main_buffer,
            main_group,
            shadow_buffer,
            shadow_group,
        }
    }
}

fn mk_uniform(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<EntityUniform>() as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
        label: Some(label),
    });
    (buffer, group)
}

/// Size of the square shadow map for a device limit and a configured cap.
pub fn shadow_map_size(max_texture_dimension_2d: u32, cap: u32) -> u32 {
    max_texture_dimension_2d.min(cap).max(1)
}

pub struct Renderer {
    unlit: Program,
    lit: Program,
    unlit_globals: wgpu::Buffer,
    unlit_group: wgpu::BindGroup,
    lit_globals: wgpu::Buffer,
    lit_group: wgpu::BindGroup,
    entity_layout: wgpu::BindGroupLayout,
    entities: Vec<EntityBindings>,
    materials: wgpu::Buffer,
    material_capacity: usize,
    shadow_map: Texture,
    shadow_size: u32,
    shadows_enabled: bool,
}

impl Renderer {
    /// Build both programs and the shadow map.
    ///
    /// With `depth_sampling == false` the shadow map is a 1x1 texture
    /// cleared to the far plane and the shadow pass never runs.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        depth_sampling: bool,
        shadow_map_cap: u32,
    ) -> anyhow::Result<Self> {
        let entity_layout = uniform_layout(device, "entity_bind_group_layout");
        let unlit_layout = uniform_layout(device, "unlit_globals_bind_group_layout");
        let lit_layout = lit_globals_layout(device);
        let diffuse = diffuse_layout(device);

        let unlit = Program::new(
            device,
            ProgramKind::Unlit,
            None,
            &[&unlit_layout, &entity_layout],
        )?;
        let lit = Program::new(
            device,
            ProgramKind::Lit,
            Some(color_format),
            &[&lit_layout, &entity_layout, &diffuse],
        )?;

        let shadow_size = if depth_sampling {
            shadow_map_size(device.limits().max_texture_dimension_2d, shadow_map_cap)
        } else {
            log::warn!("Depth textures cannot be sampled on this adapter, shadows are disabled");
            1
        };
        let shadow_map = Texture::create_shadow_map(device, shadow_size);
        if !depth_sampling {
            clear_shadow_map(device, queue, &shadow_map);
        }
        log::info!("Shadow map is {0}x{0}", shadow_size);

        let unlit_globals = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Unlit Globals Buffer"),
            contents: bytemuck::cast_slice(&[UnlitGlobals::new(
                Matrix4::identity(),
                SHADOW_COLOR,
            )]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let unlit_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &unlit_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: unlit_globals.as_entire_binding(),
            }],
            label: Some("unlit_globals_bind_group"),
        });

        let lit_globals = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lit Globals Buffer"),
            size: std::mem::size_of::<LitGlobals>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lit_group = mk_lit_group(device, &lit_layout, &lit_globals, &shadow_map)?;

        let material_capacity = 64;
        let materials = mk_material_buffer(device, material_capacity);

        Ok(Self {
            unlit,
            lit,
            unlit_globals,
            unlit_group,
            lit_globals,
            lit_group,
            entity_layout,
            entities: Vec::new(),
            materials,
            material_capacity,
            shadow_map,
            shadow_size,
            shadows_enabled: depth_sampling,
        })
    }

    pub fn shadows_enabled(&self) -> bool {
        self.shadows_enabled
    }

    pub fn shadow_size(&self) -> u32 {
        self.shadow_size
    }

    /// Depth comparison spread used by the lit program's shadow lookup.
    pub fn bias_ratio(&self) -> f32 {
        1.5 / self.shadow_size as f32
    }

    /// Upload everything the frame needs and record its passes into one
    /// encoder.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &mut Scene,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        clear: wgpu::Color,
    ) -> FramePlan {
        let uploaded = scene.textures.upload_pending(device, queue);
        if uploaded > 0 {
            log::info!("Uploaded {} textures", uploaded);
        }
        self.sync_entities(device, queue, scene);

        let globals = LitGlobals::new(
            scene.camera.projection(),
            &scene.light,
            scene.light_view_position(),
            self.bias_ratio(),
            self.shadows_enabled,
        );
        queue.write_buffer(&self.lit_globals, 0, bytemuck::cast_slice(&[globals]));
        let unlit = UnlitGlobals::new(scene.light.projection(), SHADOW_COLOR);
        queue.write_buffer(&self.unlit_globals, 0, bytemuck::cast_slice(&[unlit]));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        let plan = {
            let mut frame = GpuFrame {
                renderer: self,
                encoder: &mut encoder,
                color_view,
                depth_view,
                clear,
            };
            render_frame(scene, &mut frame)
        };
        queue.submit(std::iter::once(encoder.finish()));
        plan
    }

    fn sync_entities(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene) {
        let count = scene.things.len();
        while self.entities.len() < count {
            let index = self.entities.len();
            self.entities.push(EntityBindings::new(device, &self.entity_layout, index));
        }
        if count > self.material_capacity {
            self.material_capacity = count.next_power_of_two();
            self.materials = mk_material_buffer(device, self.material_capacity);
        }

        let view = scene.camera.view();
        let light = scene.light.matrix();
        let light_view = scene.light.view();
        let mut materials = Vec::with_capacity(count);
        for (thing, bindings) in scene.things.iter().zip(&self.entities) {
            let main = EntityUniform::lit(thing.model, view, light);
            queue.write_buffer(&bindings.main_buffer, 0, bytemuck::cast_slice(&[main]));
            let shadow = EntityUniform::unlit(thing.model, light_view);
            queue.write_buffer(&bindings.shadow_buffer, 0, bytemuck::cast_slice(&[shadow]));
            materials.push(thing.material.to_raw());
        }
        if !materials.is_empty() {
            queue.write_buffer(&self.materials, 0, bytemuck::cast_slice(&materials));
        }
    }
}

fn mk_material_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Material Instance Buffer"),
        size: MaterialRaw::STRIDE * capacity.max(1) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn mk_lit_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    globals: &wgpu::Buffer,
    shadow_map: &Texture,
) -> anyhow::Result<wgpu::BindGroup> {
    let sampler = shadow_map
        .sampler
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("shadow map has no comparison sampler"))?;
    Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: globals.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("lit_globals_bind_group"),
    }))
}

fn clear_shadow_map(device: &wgpu::Device, queue: &wgpu::Queue, shadow_map: &Texture) {
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Shadow Map Clear Encoder"),
    });
    {
        let _pass = encoder.begin_render_pass(&shadow_pass_descriptor(&shadow_map.view));
    }
    queue.submit(std::iter::once(encoder.finish()));
}

fn shadow_pass_descriptor(view: &wgpu::TextureView) -> wgpu::RenderPassDescriptor<'_> {
    wgpu::RenderPassDescriptor {
        label: Some("Shadow Pass"),
        color_attachments: &[],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        occlusion_query_set: None,
        timestamp_writes: None,
        multiview_mask: None,
    }
}

/// Records the passes of one frame into a shared encoder.
struct GpuFrame<'f> {
    renderer: &'f Renderer,
    encoder: &'f mut wgpu::CommandEncoder,
    color_view: &'f wgpu::TextureView,
    depth_view: &'f wgpu::TextureView,
    clear: wgpu::Color,
}

impl GpuFrame<'_> {
    fn record_shadow(&mut self, scene: &Scene) {
        let renderer = self.renderer;
        let mut pass = self
            .encoder
            .begin_render_pass(&shadow_pass_descriptor(&renderer.shadow_map.view));
        pass.set_pipeline(&renderer.unlit.pipeline);
        pass.set_bind_group(GLOBALS_GROUP, &renderer.unlit_group, &[]);
        for (thing, bindings) in scene.things.iter().zip(&renderer.entities) {
            let Some(asset) = scene.asset(thing.asset) else {
                continue;
            };
            pass.set_bind_group(ENTITY_GROUP, &bindings.shadow_group, &[]);
            pass.draw_asset(asset);
        }
    }

    fn record_main(&mut self, scene: &Scene) {
        let renderer = self.renderer;
        let mut pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&renderer.lit.pipeline);
        pass.set_bind_group(GLOBALS_GROUP, &renderer.lit_group, &[]);
        pass.set_vertex_buffer(1, renderer.materials.slice(..));
        for (index, (thing, bindings)) in scene.things.iter().zip(&renderer.entities).enumerate() {
            let Some(asset) = scene.asset(thing.asset) else {
                log::warn!("Thing {} refers to a missing asset", index);
                continue;
            };
            let Some(texture) = scene.textures.bind_group(thing.texture_or(asset)) else {
                log::warn!("Thing {} refers to a missing texture", index);
                continue;
            };
            pass.set_bind_group(ENTITY_GROUP, &bindings.main_group, &[]);
            pass.set_bind_group(DIFFUSE_GROUP, texture, &[]);
            // The instance index selects the entity's material record.
            let instance = index as u32;
            pass.draw_asset_instanced(asset, instance..instance + 1);
        }
    }
}

impl PassRecorder for GpuFrame<'_> {
    fn shadows_enabled(&self) -> bool {
        self.renderer.shadows_enabled
    }

    fn record(&mut self, pass: Pass, scene: &Scene) {
        match pass {
            Pass::Shadow => self.record_shadow(scene),
            Pass::Main => self.record_main(scene),
        }
    }
}
