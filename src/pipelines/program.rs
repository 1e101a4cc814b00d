//! Typed shader programs.
//!
//! Vertex attributes and uniforms are named by enums that map once to
//! shader locations and bind-group slots. [`ProgramKind`] lists what each of
//! the two programs consumes; [`Program`] owns the compiled pipeline.

use crate::data_structures::{instance::MaterialRaw, model::ModelVertex, texture::Texture};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attribute {
    Position,
    Normal,
    TexCoord,
    MaterialAmbient,
    MaterialDiffuse,
    MaterialSpecular,
    MaterialShininess,
}

/// Which vertex buffer an attribute is read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeStream {
    /// Slot 0: the compiled geometry, stepped per vertex.
    Vertex,
    /// Slot 1: the entity's material, stepped per instance.
    Instance,
}

impl Attribute {
    pub const fn location(self) -> u32 {
        match self {
            Attribute::Position => 0,
            Attribute::Normal => 1,
            Attribute::TexCoord => 2,
            Attribute::MaterialAmbient => 3,
            Attribute::MaterialDiffuse => 4,
            Attribute::MaterialSpecular => 5,
            Attribute::MaterialShininess => 6,
        }
    }

    pub const fn format(self) -> wgpu::VertexFormat {
        match self {
            Attribute::MaterialShininess => wgpu::VertexFormat::Float32,
            _ => wgpu::VertexFormat::Float32x3,
        }
    }

    /// Byte offset inside the attribute's stream.
    pub const fn offset(self) -> wgpu::BufferAddress {
        match self {
            Attribute::Position | Attribute::MaterialAmbient => 0,
            Attribute::Normal | Attribute::MaterialDiffuse => 12,
            Attribute::TexCoord | Attribute::MaterialSpecular => 24,
            Attribute::MaterialShininess => 36,
        }
    }

    pub const fn stream(self) -> AttributeStream {
        match self {
            Attribute::Position | Attribute::Normal | Attribute::TexCoord => AttributeStream::Vertex,
            _ => AttributeStream::Instance,
        }
    }

    fn to_wgpu(self) -> wgpu::VertexAttribute {
        wgpu::VertexAttribute {
            offset: self.offset(),
            shader_location: self.location(),
            format: self.format(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Uniform {
    ModelView,
    Projection,
    NormalMatrix,
    ModelLight,
    Color,
    LightAmbient,
    LightDiffuse,
    LightSpecular,
    LightPosition,
    DiffuseSampler,
    ShadowSampler,
    ShadowBiasRatio,
}

/// Bind group and binding a uniform lives in.
///
/// Several uniforms share one slot when they are fields of the same
/// uniform buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformSlot {
    pub group: u32,
    pub binding: u32,
}

pub const GLOBALS_GROUP: u32 = 0;
pub const ENTITY_GROUP: u32 = 1;
pub const DIFFUSE_GROUP: u32 = 2;

impl Uniform {
    pub const fn slot(self) -> UniformSlot {
        let (group, binding) = match self {
            Uniform::Projection
            | Uniform::Color
            | Uniform::LightAmbient
            | Uniform::LightDiffuse
            | Uniform::LightSpecular
            | Uniform::LightPosition
            | Uniform::ShadowBiasRatio => (GLOBALS_GROUP, 0),
            Uniform::ShadowSampler => (GLOBALS_GROUP, 1),
            Uniform::ModelView | Uniform::NormalMatrix | Uniform::ModelLight => (ENTITY_GROUP, 0),
            Uniform::DiffuseSampler => (DIFFUSE_GROUP, 0),
        };
        UniformSlot { group, binding }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramKind {
    /// Flat colour, position only. Renders the shadow map.
    Unlit,
    /// Phong lighting with diffuse texture and shadow lookup.
    Lit,
}

impl ProgramKind {
    pub const fn attributes(self) -> &'static [Attribute] {
        match self {
            ProgramKind::Unlit => &[Attribute::Position],
            ProgramKind::Lit => &[
                Attribute::Position,
                Attribute::Normal,
                Attribute::TexCoord,
                Attribute::MaterialAmbient,
                Attribute::MaterialDiffuse,
                Attribute::MaterialSpecular,
                Attribute::MaterialShininess,
            ],
        }
    }

    pub const fn uniforms(self) -> &'static [Uniform] {
        match self {
            ProgramKind::Unlit => &[Uniform::ModelView, Uniform::Projection, Uniform::Color],
            ProgramKind::Lit => &[
                Uniform::ModelView,
                Uniform::Projection,
                Uniform::NormalMatrix,
                Uniform::ModelLight,
                Uniform::LightAmbient,
                Uniform::LightDiffuse,
                Uniform::LightSpecular,
                Uniform::LightPosition,
                Uniform::DiffuseSampler,
                Uniform::ShadowSampler,
                Uniform::ShadowBiasRatio,
            ],
        }
    }

    /// Number of bind groups the program's pipeline layout declares.
    pub fn bind_group_count(self) -> u32 {
        self.uniforms()
            .iter()
            .map(|u| u.slot().group + 1)
            .max()
            .unwrap_or(0)
    }

    pub const fn label(self) -> &'static str {
        match self {
            ProgramKind::Unlit => "unlit",
            ProgramKind::Lit => "lit",
        }
    }

    fn source(self) -> &'static str {
        match self {
            ProgramKind::Unlit => include_str!("unlit.wgsl"),
            ProgramKind::Lit => include_str!("lit.wgsl"),
        }
    }

    fn stream_attributes(self, stream: AttributeStream) -> Vec<wgpu::VertexAttribute> {
        self.attributes()
            .iter()
            .filter(|a| a.stream() == stream)
            .map(|a| a.to_wgpu())
            .collect()
    }
}

/// A compiled program: the render pipeline built from a [`ProgramKind`]'s
/// attribute tables.
#[derive(Debug)]
pub struct Program {
    pub pipeline: wgpu::RenderPipeline,
}

impl Program {
    /// Build the pipeline for `kind`.
    ///
    /// `layouts` are the bind group layouts in group order. With no
    /// `color_format` the pipeline writes depth only.
    pub fn new(
        device: &wgpu::Device,
        kind: ProgramKind,
        color_format: Option<wgpu::TextureFormat>,
        layouts: &[&wgpu::BindGroupLayout],
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            layouts.len() as u32 == kind.bind_group_count(),
            "{} program needs {} bind group layouts, got {}",
            kind.label(),
            kind.bind_group_count(),
            layouts.len()
        );

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", kind.label())),
            bind_group_layouts: layouts,
            immediate_size: 0,
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} Shader", kind.label())),
            source: wgpu::ShaderSource::Wgsl(kind.source().into()),
        });

        let vertex_attributes = kind.stream_attributes(AttributeStream::Vertex);
        let instance_attributes = kind.stream_attributes(AttributeStream::Instance);
        let mut buffers = vec![wgpu::VertexBufferLayout {
            array_stride: ModelVertex::STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &vertex_attributes,
        }];
        if !instance_attributes.is_empty() {
            buffers.push(wgpu::VertexBufferLayout {
                array_stride: MaterialRaw::STRIDE,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &instance_attributes,
            });
        }

        let targets = [color_format.map(|format| wgpu::ColorTargetState {
            format,
            blend: Some(wgpu::BlendState::REPLACE),
            write_mask: wgpu::ColorWrites::ALL,
        })];
        let fragment = color_format.map(|_| wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &targets,
            compilation_options: Default::default(),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            cache: None,
            label: Some(&format!("{} Render Pipeline", kind.label())),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &buffers,
                compilation_options: Default::default(),
            },
            fragment,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Room surfaces are seen from inside and token halves are mirrored.
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Texture::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: match kind {
                    ProgramKind::Unlit => wgpu::DepthBiasState {
                        constant: 1,
                        slope_scale: 1.0,
                        clamp: 0.0,
                    },
                    ProgramKind::Lit => wgpu::DepthBiasState::default(),
                },
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
        });
        log::info!("Built {} program", kind.label());

        Ok(Self { pipeline })
    }
}

/// Uniform buffer layout shared by the globals and entity groups.
pub fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some(label),
    })
}

/// Globals of the lit program: the uniform buffer plus the shadow map and
/// its comparison sampler.
pub fn lit_globals_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("lit_globals_bind_group_layout"),
    })
}
