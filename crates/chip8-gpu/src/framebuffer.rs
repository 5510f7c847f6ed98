use chip8_core::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// The interpreter screen on the GPU: a single-channel `r8unorm` texture,
/// one texel per pixel, re-uploaded from the expanded framebuffer each frame.
/// The blit fragment shader reads the red channel and spreads it to gray.
pub struct FramebufferTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl FramebufferTexture {
    pub fn new(device: &wgpu::Device) -> Self {
        let width = SCREEN_WIDTH as u32;
        let height = SCREEN_HEIGHT as u32;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("chip8_framebuffer"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Upload one byte per pixel, row-major from the top row. `pixels` must
    /// be exactly width × height bytes.
    pub fn upload(&self, queue: &wgpu::Queue, pixels: &[u8]) {
        debug_assert_eq!(pixels.len(), (self.width * self.height) as usize);
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }
}
