pub mod opcode;
pub mod system;

pub use opcode::Opcode;
pub use system::{System, SystemError};

// ---------------------------------------------------------------------------
// Machine geometry
// ---------------------------------------------------------------------------

/// Framebuffer width in pixels.
pub const SCREEN_WIDTH: usize = 64;
/// Framebuffer height in pixels.
pub const SCREEN_HEIGHT: usize = 32;

/// Total addressable memory.
pub const MEM_SIZE: usize = 4096;
/// Programs load here; everything below is reserved for the interpreter
/// (in practice: the builtin font).
pub const PROGRAM_START: u16 = 0x200;
/// Largest ROM image that fits between `PROGRAM_START` and the end of memory.
pub const MAX_ROM_SIZE: usize = MEM_SIZE - PROGRAM_START as usize;
