// ---------------------------------------------------------------------------
// Opcode — decoded CHIP-8 instructions
// ---------------------------------------------------------------------------

/// A decoded CHIP-8 instruction.
///
/// `x`/`y` name V registers, `addr` is a 12-bit memory address, `byte` an
/// 8-bit immediate and `height` the row count of a sprite. Decoding is a pure
/// function of the 16-bit instruction word; execution lives on
/// [`System`](crate::System).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// 00E0 — blank the framebuffer.
    ClearScreen,
    /// 00EE — return from subroutine.
    Return,
    /// 1nnn — jump to `addr`.
    Jump { addr: u16 },
    /// 2nnn — call subroutine at `addr`.
    Call { addr: u16 },
    /// 3xkk — skip next instruction if Vx == byte.
    SkipIfEq { x: u8, byte: u8 },
    /// 4xkk — skip next instruction if Vx != byte.
    SkipIfNeq { x: u8, byte: u8 },
    /// 5xy0 — skip next instruction if Vx == Vy.
    SkipIfRegEq { x: u8, y: u8 },
    /// 6xkk — Vx = byte.
    SetReg { x: u8, byte: u8 },
    /// 7xkk — Vx += byte, carry flag untouched.
    AddImm { x: u8, byte: u8 },
    /// 8xy0 — Vx = Vy.
    Mov { x: u8, y: u8 },
    /// 8xy1 — Vx |= Vy.
    Or { x: u8, y: u8 },
    /// 8xy2 — Vx &= Vy.
    And { x: u8, y: u8 },
    /// 8xy3 — Vx ^= Vy.
    Xor { x: u8, y: u8 },
    /// 8xy4 — Vx += Vy, VF = carry.
    Add { x: u8, y: u8 },
    /// 8xy5 — Vx -= Vy, VF = no-borrow.
    Sub { x: u8, y: u8 },
    /// 8xy6 — VF = Vx & 1, then Vx >>= 1.
    ShiftRight { x: u8 },
    /// 8xy7 — Vx = Vy - Vx, VF = no-borrow.
    RSub { x: u8, y: u8 },
    /// 8xyE — VF = top bit of Vx, then Vx <<= 1.
    ShiftLeft { x: u8 },
    /// 9xy0 — skip next instruction if Vx != Vy.
    SkipIfRegNeq { x: u8, y: u8 },
    /// Annn — I = addr.
    SetIndex { addr: u16 },
    /// Bnnn — jump to addr + V0.
    JumpPlus { addr: u16 },
    /// Cxkk — Vx = random byte AND mask.
    Rand { x: u8, mask: u8 },
    /// Dxyn — XOR an 8×`height` sprite at (Vx, Vy), VF = collision.
    Draw { x: u8, y: u8, height: u8 },
    /// Ex9E — skip next instruction if the key in Vx is down.
    SkipIfKeyPressed { x: u8 },
    /// ExA1 — skip next instruction if the key in Vx is up.
    SkipIfKeyNotPressed { x: u8 },
    /// Fx07 — Vx = delay timer.
    GetDelay { x: u8 },
    /// Fx0A — halt until a key is down, store it in Vx.
    WaitKey { x: u8 },
    /// Fx15 — delay timer = Vx.
    SetDelay { x: u8 },
    /// Fx18 — sound timer = Vx.
    SetSound { x: u8 },
    /// Fx1E — I += Vx.
    AddIndex { x: u8 },
    /// Fx29 — I = address of the builtin glyph for the low nibble of Vx.
    FontSprite { x: u8 },
    /// Fx33 — store Vx as three decimal digits at I, I+1, I+2.
    StoreBcd { x: u8 },
    /// Fx55 — store V0..=Vx at I onward.
    DumpRegs { x: u8 },
    /// Fx65 — load V0..=Vx from I onward.
    LoadRegs { x: u8 },
}

impl Opcode {
    /// Decode a big-endian instruction word. Returns `None` for words outside
    /// the instruction set (including the 0nnn machine-code escape, which no
    /// modern interpreter supports).
    pub fn decode(word: u16) -> Option<Opcode> {
        let x = ((word >> 8) & 0xF) as u8;
        let y = ((word >> 4) & 0xF) as u8;
        let n = (word & 0xF) as u8;
        let byte = (word & 0xFF) as u8;
        let addr = word & 0x0FFF;

        let op = match word >> 12 {
            0x0 => match word {
                0x00E0 => Opcode::ClearScreen,
                0x00EE => Opcode::Return,
                _ => return None,
            },
            0x1 => Opcode::Jump { addr },
            0x2 => Opcode::Call { addr },
            0x3 => Opcode::SkipIfEq { x, byte },
            0x4 => Opcode::SkipIfNeq { x, byte },
            0x5 if n == 0 => Opcode::SkipIfRegEq { x, y },
            0x6 => Opcode::SetReg { x, byte },
            0x7 => Opcode::AddImm { x, byte },
            0x8 => match n {
                0x0 => Opcode::Mov { x, y },
                0x1 => Opcode::Or { x, y },
                0x2 => Opcode::And { x, y },
                0x3 => Opcode::Xor { x, y },
                0x4 => Opcode::Add { x, y },
                0x5 => Opcode::Sub { x, y },
                0x6 => Opcode::ShiftRight { x },
                0x7 => Opcode::RSub { x, y },
                0xE => Opcode::ShiftLeft { x },
                _ => return None,
            },
            0x9 if n == 0 => Opcode::SkipIfRegNeq { x, y },
            0xA => Opcode::SetIndex { addr },
            0xB => Opcode::JumpPlus { addr },
            0xC => Opcode::Rand { x, mask: byte },
            0xD => Opcode::Draw { x, y, height: n },
            0xE => match byte {
                0x9E => Opcode::SkipIfKeyPressed { x },
                0xA1 => Opcode::SkipIfKeyNotPressed { x },
                _ => return None,
            },
            0xF => match byte {
                0x07 => Opcode::GetDelay { x },
                0x0A => Opcode::WaitKey { x },
                0x15 => Opcode::SetDelay { x },
                0x18 => Opcode::SetSound { x },
                0x1E => Opcode::AddIndex { x },
                0x29 => Opcode::FontSprite { x },
                0x33 => Opcode::StoreBcd { x },
                0x55 => Opcode::DumpRegs { x },
                0x65 => Opcode::LoadRegs { x },
                _ => return None,
            },
            _ => return None,
        };
        Some(op)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- Fixed words ----------------------------------------------------------

    #[test]
    fn decodes_clear_and_return() {
        assert_eq!(Opcode::decode(0x00E0), Some(Opcode::ClearScreen));
        assert_eq!(Opcode::decode(0x00EE), Some(Opcode::Return));
    }

    // --- Address-carrying instructions ----------------------------------------

    #[test]
    fn decodes_address_forms() {
        assert_eq!(Opcode::decode(0x1ABC), Some(Opcode::Jump { addr: 0xABC }));
        assert_eq!(Opcode::decode(0x2123), Some(Opcode::Call { addr: 0x123 }));
        assert_eq!(
            Opcode::decode(0xA555),
            Some(Opcode::SetIndex { addr: 0x555 })
        );
        assert_eq!(
            Opcode::decode(0xB0FF),
            Some(Opcode::JumpPlus { addr: 0x0FF })
        );
    }

    // --- Register + immediate forms --------------------------------------------

    #[test]
    fn decodes_immediate_forms() {
        assert_eq!(
            Opcode::decode(0x3A42),
            Some(Opcode::SkipIfEq { x: 0xA, byte: 0x42 })
        );
        assert_eq!(
            Opcode::decode(0x4A42),
            Some(Opcode::SkipIfNeq { x: 0xA, byte: 0x42 })
        );
        assert_eq!(
            Opcode::decode(0x60FF),
            Some(Opcode::SetReg { x: 0, byte: 0xFF })
        );
        assert_eq!(
            Opcode::decode(0x7C01),
            Some(Opcode::AddImm { x: 0xC, byte: 0x01 })
        );
        assert_eq!(
            Opcode::decode(0xC10F),
            Some(Opcode::Rand { x: 1, mask: 0x0F })
        );
    }

    // --- ALU group -------------------------------------------------------------

    #[test]
    fn decodes_alu_forms() {
        assert_eq!(Opcode::decode(0x8120), Some(Opcode::Mov { x: 1, y: 2 }));
        assert_eq!(Opcode::decode(0x8121), Some(Opcode::Or { x: 1, y: 2 }));
        assert_eq!(Opcode::decode(0x8122), Some(Opcode::And { x: 1, y: 2 }));
        assert_eq!(Opcode::decode(0x8123), Some(Opcode::Xor { x: 1, y: 2 }));
        assert_eq!(Opcode::decode(0x8124), Some(Opcode::Add { x: 1, y: 2 }));
        assert_eq!(Opcode::decode(0x8125), Some(Opcode::Sub { x: 1, y: 2 }));
        assert_eq!(Opcode::decode(0x8126), Some(Opcode::ShiftRight { x: 1 }));
        assert_eq!(Opcode::decode(0x8127), Some(Opcode::RSub { x: 1, y: 2 }));
        assert_eq!(Opcode::decode(0x812E), Some(Opcode::ShiftLeft { x: 1 }));
    }

    #[test]
    fn decodes_draw() {
        assert_eq!(
            Opcode::decode(0xD015),
            Some(Opcode::Draw { x: 0, y: 1, height: 5 })
        );
    }

    // --- Key and timer group ----------------------------------------------------

    #[test]
    fn decodes_key_and_timer_forms() {
        assert_eq!(
            Opcode::decode(0xE29E),
            Some(Opcode::SkipIfKeyPressed { x: 2 })
        );
        assert_eq!(
            Opcode::decode(0xE2A1),
            Some(Opcode::SkipIfKeyNotPressed { x: 2 })
        );
        assert_eq!(Opcode::decode(0xF307), Some(Opcode::GetDelay { x: 3 }));
        assert_eq!(Opcode::decode(0xF30A), Some(Opcode::WaitKey { x: 3 }));
        assert_eq!(Opcode::decode(0xF315), Some(Opcode::SetDelay { x: 3 }));
        assert_eq!(Opcode::decode(0xF318), Some(Opcode::SetSound { x: 3 }));
        assert_eq!(Opcode::decode(0xF31E), Some(Opcode::AddIndex { x: 3 }));
        assert_eq!(Opcode::decode(0xF329), Some(Opcode::FontSprite { x: 3 }));
        assert_eq!(Opcode::decode(0xF333), Some(Opcode::StoreBcd { x: 3 }));
        assert_eq!(Opcode::decode(0xF355), Some(Opcode::DumpRegs { x: 3 }));
        assert_eq!(Opcode::decode(0xF365), Some(Opcode::LoadRegs { x: 3 }));
    }

    // --- Invalid words ----------------------------------------------------------

    #[test]
    fn rejects_words_outside_the_set() {
        for word in [0x0000u16, 0x00E1, 0x0123, 0x5121, 0x8128, 0x812F, 0x9121, 0xE000, 0xE2FF, 0xF000, 0xF3FF] {
            assert_eq!(Opcode::decode(word), None, "{word:#06X} should not decode");
        }
    }
}
