pub mod blit;
pub mod framebuffer;

pub use blit::BlitPipeline;
pub use framebuffer::FramebufferTexture;
