use wgpu::util::DeviceExt;

/// Fullscreen blit shader — presents the interpreter framebuffer as
/// grayscale.
///
/// The vertex stage passes a clip-space corner through at zero depth and
/// derives the texture coordinate as `pos / 2 + (0.5, 0.5)`, so `(-1, -1)`
/// maps to `(0, 0)` and `(1, 1)` to `(1, 1)`. The fragment stage samples the
/// single-channel framebuffer with the vertical axis flipped (texture rows
/// are stored top-first) and replicates the red channel into RGB with alpha
/// fixed at 1.
pub const BLIT_WGSL: &str = r#"
struct VertexOut {
    @builtin(position) pos: vec4<f32>,
    @location(0)       uv:  vec2<f32>,
};

@vertex
fn vs_main(@location(0) pos: vec2<f32>) -> VertexOut {
    var out: VertexOut;
    out.pos = vec4(pos, 0.0, 1.0);
    out.uv  = pos * 0.5 + vec2(0.5, 0.5);
    return out;
}

@group(0) @binding(0) var t_frame: texture_2d<f32>;
@group(0) @binding(1) var s_frame: sampler;

@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
    let r = textureSample(t_frame, s_frame, vec2(in.uv.x, 1.0 - in.uv.y)).r;
    return vec4(r, r, r, 1.0);
}
"#;

/// One quad corner: a 2D position in normalized device coordinates.
/// `repr(C)` + `bytemuck` ensures safe casting to `&[u8]` for the vertex
/// buffer upload.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub pos: [f32; 2],
}

/// Two triangles covering clip space.
pub const QUAD_VERTICES: [Vertex; 6] = [
    Vertex { pos: [-1.0, 1.0] },
    Vertex { pos: [1.0, 1.0] },
    Vertex { pos: [1.0, -1.0] },
    Vertex { pos: [1.0, -1.0] },
    Vertex { pos: [-1.0, -1.0] },
    Vertex { pos: [-1.0, 1.0] },
];

impl Vertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            }],
        }
    }
}

/// The render pipeline that draws the framebuffer texture onto a fullscreen
/// quad, plus the resources it shares across frames: the quad vertex buffer,
/// the texture/sampler bind group layout and a nearest-filtering sampler
/// (nearest keeps the 64×32 pixels crisp when magnified).
pub struct BlitPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    vertex_buf: wgpu::Buffer,
}

impl BlitPipeline {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        // binding 0 : framebuffer texture (r8unorm, sampled)
        // binding 1 : sampler
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blit_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("blit_sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blit_quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blit_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit"),
            source: wgpu::ShaderSource::Wgsl(BLIT_WGSL.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("blit_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::debug!("Blit pipeline built for surface format {surface_format:?}");

        Self {
            pipeline,
            bind_group_layout,
            sampler,
            vertex_buf,
        }
    }

    /// Bind a framebuffer texture view to the pipeline's layout. The bind
    /// group stays valid for the lifetime of the view, so callers create it
    /// once and reuse it every frame.
    pub fn bind(&self, device: &wgpu::Device, frame_view: &wgpu::TextureView) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blit_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(frame_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// Record the fullscreen pass into `encoder`, clearing `target` to black
    /// first.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        bind_group: &wgpu::BindGroup,
    ) {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("blit_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buf.slice(..));
        rpass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed() -> naga::Module {
        naga::front::wgsl::parse_str(BLIT_WGSL).expect("blit shader should parse")
    }

    #[test]
    fn blit_shader_validates() {
        let module = parsed();
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .expect("blit shader should validate");
    }

    #[test]
    fn blit_shader_has_both_entry_points() {
        let module = parsed();
        let names: Vec<&str> = module.entry_points.iter().map(|ep| ep.name.as_str()).collect();
        assert!(names.contains(&"vs_main"), "missing vertex entry: {names:?}");
        assert!(names.contains(&"fs_main"), "missing fragment entry: {names:?}");
    }

    // The uv derivation the vertex stage performs, mirrored on the CPU.
    fn uv_for(pos: [f32; 2]) -> [f32; 2] {
        [pos[0] * 0.5 + 0.5, pos[1] * 0.5 + 0.5]
    }

    #[test]
    fn quad_corners_map_onto_the_unit_square() {
        assert_eq!(uv_for([-1.0, -1.0]), [0.0, 0.0]);
        assert_eq!(uv_for([1.0, 1.0]), [1.0, 1.0]);
        assert_eq!(uv_for([0.0, 0.0]), [0.5, 0.5]);
    }

    #[test]
    fn quad_covers_all_of_clip_space() {
        let xs: Vec<f32> = QUAD_VERTICES.iter().map(|v| v.pos[0]).collect();
        let ys: Vec<f32> = QUAD_VERTICES.iter().map(|v| v.pos[1]).collect();
        for c in [&xs, &ys] {
            assert_eq!(c.iter().cloned().fold(f32::INFINITY, f32::min), -1.0);
            assert_eq!(c.iter().cloned().fold(f32::NEG_INFINITY, f32::max), 1.0);
        }
    }

    #[test]
    fn vertex_layout_is_one_vec2_attribute() {
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 8);
        assert_eq!(layout.attributes.len(), 1);
        assert_eq!(layout.attributes[0].format, wgpu::VertexFormat::Float32x2);
        assert_eq!(layout.attributes[0].offset, 0);
    }
}
