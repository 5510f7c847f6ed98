use thiserror::Error;

use crate::opcode::Opcode;
use crate::{MAX_ROM_SIZE, MEM_SIZE, PROGRAM_START, SCREEN_HEIGHT, SCREEN_WIDTH};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("ROM image of {len} bytes does not fit into memory")]
    ProgramTooLarge { len: usize },
    #[error("invalid memory access at {addr:#06X}")]
    InvalidMemoryAccess { addr: u16 },
    #[error("invalid register V{reg:X}")]
    InvalidRegister { reg: u8 },
    #[error("call stack overflow")]
    StackOverflow,
    #[error("return with an empty call stack")]
    StackUnderflow,
    #[error("unknown opcode {word:#06X} at {addr:#06X}")]
    UnknownOpcode { word: u16, addr: u16 },
    #[error("failed to read ROM")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Builtin font
// ---------------------------------------------------------------------------

/// Where the 16 builtin glyphs live; `Fx29` resolves into this block.
pub const FONT_START: u16 = 0x000;
/// Bytes per glyph (8×5 pixels, left-aligned).
pub const GLYPH_LEN: u16 = 5;

#[rustfmt::skip]
const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

// ---------------------------------------------------------------------------
// Machine state
// ---------------------------------------------------------------------------

pub struct Registers {
    pub reg: [u8; 16],
    pub index: u16,
    pub pc: u16,
}

impl Registers {
    pub fn read(&self, reg: u8) -> Result<u8, SystemError> {
        self.reg
            .get(reg as usize)
            .copied()
            .ok_or(SystemError::InvalidRegister { reg })
    }

    pub fn write(&mut self, reg: u8, value: u8) -> Result<(), SystemError> {
        *self
            .reg
            .get_mut(reg as usize)
            .ok_or(SystemError::InvalidRegister { reg })? = value;
        Ok(())
    }

    /// VF, the carry/borrow/collision flag.
    pub fn flag(&self) -> u8 {
        self.reg[0xF]
    }

    fn set_flag(&mut self, value: u8) {
        self.reg[0xF] = value;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Registers {
            reg: [0; 16],
            index: 0,
            pc: PROGRAM_START,
        }
    }
}

#[derive(Default)]
pub struct Timers {
    pub delay: u8,
    pub sound: u8,
}

#[derive(Default)]
struct Stack {
    frames: [u16; 16],
    sp: usize,
}

impl Stack {
    fn push(&mut self, addr: u16) -> Result<(), SystemError> {
        if self.sp == self.frames.len() {
            return Err(SystemError::StackOverflow);
        }
        self.frames[self.sp] = addr;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<u16, SystemError> {
        if self.sp == 0 {
            return Err(SystemError::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.frames[self.sp])
    }
}

#[derive(Default)]
struct Keys {
    down: [bool; 16],
}

impl Keys {
    fn set(&mut self, key: u8, pressed: bool) {
        self.down[(key & 0xF) as usize] = pressed;
    }

    fn is_down(&self, key: u8) -> bool {
        self.down[(key & 0xF) as usize]
    }

    /// Lowest-numbered key currently held, for the Fx0A wait.
    fn first_down(&self) -> Option<u8> {
        self.down.iter().position(|&d| d).map(|k| k as u8)
    }
}

const SCREEN_LEN: usize = SCREEN_WIDTH * SCREEN_HEIGHT / 8;

/// A byte source for the Cxkk instruction. Injectable so tests run
/// deterministically; the default reads host entropy.
pub type RandSource = Box<dyn FnMut() -> u8 + Send>;

fn os_random_byte() -> u8 {
    let mut buf = [0u8; 1];
    // The OS entropy source failing is as fatal as a missing GPU adapter.
    getrandom::getrandom(&mut buf).expect("OS entropy source unavailable");
    buf[0]
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// The whole machine: memory, the packed 1-bit framebuffer, registers,
/// timers, call stack and keypad.
///
/// Drive it with [`load`](System::load) then repeated [`tick`](System::tick)
/// calls; read the display back with [`framebuffer`](System::framebuffer).
pub struct System {
    mem: [u8; MEM_SIZE],
    /// 1 bit per pixel, MSB-first within each byte, row-major from the top.
    screen: [u8; SCREEN_LEN],
    pub registers: Registers,
    pub timers: Timers,
    stack: Stack,
    keys: Keys,
    rand: RandSource,
}

impl Default for System {
    fn default() -> Self {
        let mut mem = [0; MEM_SIZE];
        mem[FONT_START as usize..FONT_START as usize + FONT.len()].copy_from_slice(&FONT);
        System {
            mem,
            screen: [0; SCREEN_LEN],
            registers: Registers::default(),
            timers: Timers::default(),
            stack: Stack::default(),
            keys: Keys::default(),
            rand: Box::new(os_random_byte),
        }
    }
}

impl System {
    /// Replace the random source (tests inject a fixed sequence here).
    pub fn with_rand(mut self, rand: RandSource) -> Self {
        self.rand = rand;
        self
    }

    /// Back to power-on state. The font is re-seeded and any loaded ROM is
    /// discarded.
    pub fn reset(&mut self) {
        let rand = std::mem::replace(&mut self.rand, Box::new(os_random_byte));
        *self = System::default().with_rand(rand);
    }

    pub fn load_from_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), SystemError> {
        self.load(std::fs::File::open(path)?)
    }

    /// Copy a ROM image into memory at [`PROGRAM_START`].
    pub fn load(&mut self, mut src: impl std::io::Read) -> Result<(), SystemError> {
        let mut buf = Vec::new();
        src.read_to_end(&mut buf)?;

        if buf.len() > MAX_ROM_SIZE {
            return Err(SystemError::ProgramTooLarge { len: buf.len() });
        }

        let start = PROGRAM_START as usize;
        self.mem[start..start + buf.len()].copy_from_slice(&buf);
        Ok(())
    }

    pub fn press_key(&mut self, key: u8) {
        self.keys.set(key, true);
    }

    pub fn release_key(&mut self, key: u8) {
        self.keys.set(key, false);
    }

    /// One pixel of the packed framebuffer. Out-of-range coordinates read as
    /// off.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return false;
        }
        self.screen[y * SCREEN_WIDTH / 8 + x / 8] & (0x80 >> (x % 8)) != 0
    }

    /// Expand the packed framebuffer to one byte per pixel, `0x00` off and
    /// `0xFF` on, top row first. This is the byte plane the display layer
    /// uploads as a single-channel texture.
    pub fn framebuffer(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SCREEN_WIDTH * SCREEN_HEIGHT);
        for byte in &self.screen {
            for bit in (0..8).rev() {
                out.push(if byte >> bit & 1 != 0 { 0xFF } else { 0x00 });
            }
        }
        out
    }

    /// Execute one instruction: fetch at PC, advance PC, run, then tick both
    /// timers down by one.
    pub fn tick(&mut self) -> Result<(), SystemError> {
        let pc = self.registers.pc;
        let word = self.read_mem_pair(pc)?;
        let op =
            Opcode::decode(word).ok_or(SystemError::UnknownOpcode { word, addr: pc })?;

        self.registers.pc = pc.wrapping_add(2);
        self.execute(op)?;

        self.timers.delay = self.timers.delay.saturating_sub(1);
        self.timers.sound = self.timers.sound.saturating_sub(1);
        Ok(())
    }

    fn execute(&mut self, op: Opcode) -> Result<(), SystemError> {
        match op {
            Opcode::ClearScreen => self.screen = [0; SCREEN_LEN],
            Opcode::Return => self.registers.pc = self.stack.pop()?,
            Opcode::Jump { addr } => self.registers.pc = addr,
            Opcode::Call { addr } => {
                self.stack.push(self.registers.pc)?;
                self.registers.pc = addr;
            }
            Opcode::SkipIfEq { x, byte } => {
                if self.registers.read(x)? == byte {
                    self.skip();
                }
            }
            Opcode::SkipIfNeq { x, byte } => {
                if self.registers.read(x)? != byte {
                    self.skip();
                }
            }
            Opcode::SkipIfRegEq { x, y } => {
                if self.registers.read(x)? == self.registers.read(y)? {
                    self.skip();
                }
            }
            Opcode::SetReg { x, byte } => self.registers.write(x, byte)?,
            Opcode::AddImm { x, byte } => {
                let vx = self.registers.read(x)?;
                self.registers.write(x, vx.wrapping_add(byte))?;
            }
            Opcode::Mov { x, y } => {
                let vy = self.registers.read(y)?;
                self.registers.write(x, vy)?;
            }
            Opcode::Or { x, y } => {
                let value = self.registers.read(x)? | self.registers.read(y)?;
                self.registers.write(x, value)?;
            }
            Opcode::And { x, y } => {
                let value = self.registers.read(x)? & self.registers.read(y)?;
                self.registers.write(x, value)?;
            }
            Opcode::Xor { x, y } => {
                let value = self.registers.read(x)? ^ self.registers.read(y)?;
                self.registers.write(x, value)?;
            }
            // For the flag-writing group VF is written after the result, so
            // the flag survives even when x == 0xF.
            Opcode::Add { x, y } => {
                let (sum, carry) = self.registers.read(x)?.overflowing_add(self.registers.read(y)?);
                self.registers.write(x, sum)?;
                self.registers.set_flag(carry as u8);
            }
            Opcode::Sub { x, y } => {
                let (diff, borrow) =
                    self.registers.read(x)?.overflowing_sub(self.registers.read(y)?);
                self.registers.write(x, diff)?;
                self.registers.set_flag(!borrow as u8);
            }
            Opcode::ShiftRight { x } => {
                let vx = self.registers.read(x)?;
                self.registers.write(x, vx >> 1)?;
                self.registers.set_flag(vx & 1);
            }
            Opcode::RSub { x, y } => {
                let (diff, borrow) =
                    self.registers.read(y)?.overflowing_sub(self.registers.read(x)?);
                self.registers.write(x, diff)?;
                self.registers.set_flag(!borrow as u8);
            }
            Opcode::ShiftLeft { x } => {
                let vx = self.registers.read(x)?;
                self.registers.write(x, vx << 1)?;
                self.registers.set_flag(vx >> 7);
            }
            Opcode::SkipIfRegNeq { x, y } => {
                if self.registers.read(x)? != self.registers.read(y)? {
                    self.skip();
                }
            }
            Opcode::SetIndex { addr } => self.registers.index = addr,
            Opcode::JumpPlus { addr } => {
                self.registers.pc = addr.wrapping_add(self.registers.read(0)? as u16);
            }
            Opcode::Rand { x, mask } => {
                let byte = (self.rand)() & mask;
                self.registers.write(x, byte)?;
            }
            Opcode::Draw { x, y, height } => {
                let x0 = self.registers.read(x)? as usize;
                let y0 = self.registers.read(y)? as usize;
                let mut collision = false;
                for row in 0..height as usize {
                    let bits = self.read_mem(self.registers.index.wrapping_add(row as u16))?;
                    for col in 0..8 {
                        if bits >> (7 - col) & 1 != 0 {
                            collision |= self.flip_pixel(x0 + col, y0 + row);
                        }
                    }
                }
                self.registers.set_flag(collision as u8);
            }
            Opcode::SkipIfKeyPressed { x } => {
                if self.keys.is_down(self.registers.read(x)?) {
                    self.skip();
                }
            }
            Opcode::SkipIfKeyNotPressed { x } => {
                if !self.keys.is_down(self.registers.read(x)?) {
                    self.skip();
                }
            }
            Opcode::GetDelay { x } => {
                let delay = self.timers.delay;
                self.registers.write(x, delay)?;
            }
            Opcode::WaitKey { x } => match self.keys.first_down() {
                Some(key) => self.registers.write(x, key)?,
                // Re-run this instruction next tick until a key is down.
                None => self.registers.pc = self.registers.pc.wrapping_sub(2),
            },
            Opcode::SetDelay { x } => self.timers.delay = self.registers.read(x)?,
            Opcode::SetSound { x } => self.timers.sound = self.registers.read(x)?,
            Opcode::AddIndex { x } => {
                self.registers.index =
                    self.registers.index.wrapping_add(self.registers.read(x)? as u16);
            }
            Opcode::FontSprite { x } => {
                let glyph = (self.registers.read(x)? & 0xF) as u16;
                self.registers.index = FONT_START + glyph * GLYPH_LEN;
            }
            Opcode::StoreBcd { x } => {
                let vx = self.registers.read(x)?;
                let i = self.registers.index;
                self.write_mem(i, vx / 100)?;
                self.write_mem(i.wrapping_add(1), vx / 10 % 10)?;
                self.write_mem(i.wrapping_add(2), vx % 10)?;
            }
            Opcode::DumpRegs { x } => {
                for r in 0..=x {
                    let value = self.registers.read(r)?;
                    self.write_mem(self.registers.index.wrapping_add(r as u16), value)?;
                }
            }
            Opcode::LoadRegs { x } => {
                for r in 0..=x {
                    let value = self.read_mem(self.registers.index.wrapping_add(r as u16))?;
                    self.registers.write(r, value)?;
                }
            }
        }
        Ok(())
    }

    fn skip(&mut self) {
        self.registers.pc = self.registers.pc.wrapping_add(2);
    }

    /// XOR one pixel on. Returns true when an already-lit pixel was cleared
    /// (the Dxyn collision condition). Off-screen pixels are clipped.
    fn flip_pixel(&mut self, x: usize, y: usize) -> bool {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return false;
        }
        let idx = y * SCREEN_WIDTH / 8 + x / 8;
        let mask = 0x80 >> (x % 8);
        let was_set = self.screen[idx] & mask != 0;
        self.screen[idx] ^= mask;
        was_set
    }

    fn read_mem_pair(&self, ptr: u16) -> Result<u16, SystemError> {
        let hi = self.read_mem(ptr)?;
        let lo = self.read_mem(ptr.wrapping_add(1))?;
        Ok((hi as u16) << 8 | lo as u16)
    }

    fn read_mem(&self, ptr: u16) -> Result<u8, SystemError> {
        self.mem
            .get(ptr as usize)
            .copied()
            .ok_or(SystemError::InvalidMemoryAccess { addr: ptr })
    }

    fn write_mem(&mut self, ptr: u16, data: u8) -> Result<(), SystemError> {
        *self
            .mem
            .get_mut(ptr as usize)
            .ok_or(SystemError::InvalidMemoryAccess { addr: ptr })? = data;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
