// ---------------------------------------------------------------------------
// Key — windowing-library-independent key representation
// ---------------------------------------------------------------------------

/// A keyboard key, independent of any windowing library.
///
/// `main.rs` maps `winit::keyboard::PhysicalKey` → `Key`; everything else in
/// the input pipeline works purely with this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Q,
    W,
    E,
    R,
    A,
    S,
    D,
    F,
    Z,
    X,
    C,
    V,
    P,
    F5,
    Escape,
}

// ---------------------------------------------------------------------------
// InputAction — what the app does in response to input
// ---------------------------------------------------------------------------

/// High-level action produced by a key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Forward a hex keypad key state change to the interpreter.
    Keypad { key: u8, pressed: bool },
    TogglePause,
    Reset,
    Quit,
}

// ---------------------------------------------------------------------------
// Keypad layout
// ---------------------------------------------------------------------------

/// Hex keypad nibble for a key, using the classic left-hand mapping:
///
/// ```text
///   1 2 3 4        1 2 3 C
///   Q W E R   →    4 5 6 D
///   A S D F        7 8 9 E
///   Z X C V        A 0 B F
/// ```
pub fn keypad_code(key: Key) -> Option<u8> {
    let code = match key {
        Key::Digit1 => 0x1,
        Key::Digit2 => 0x2,
        Key::Digit3 => 0x3,
        Key::Digit4 => 0xC,

        Key::Q => 0x4,
        Key::W => 0x5,
        Key::E => 0x6,
        Key::R => 0xD,

        Key::A => 0x7,
        Key::S => 0x8,
        Key::D => 0x9,
        Key::F => 0xE,

        Key::Z => 0xA,
        Key::X => 0x0,
        Key::C => 0xB,
        Key::V => 0xF,

        _ => return None,
    };
    Some(code)
}

// ---------------------------------------------------------------------------
// InputState
// ---------------------------------------------------------------------------

pub struct InputState;

impl InputState {
    pub fn new() -> Self {
        Self
    }

    /// Translate a key state change into an `InputAction`, if the key is
    /// mapped. Keypad keys react to both presses and releases; everything
    /// else fires on press only.
    pub fn on_key(&self, key: Key, pressed: bool) -> Option<InputAction> {
        if let Some(code) = keypad_code(key) {
            return Some(InputAction::Keypad { key: code, pressed });
        }
        if !pressed {
            return None;
        }
        match key {
            Key::P => Some(InputAction::TogglePause),
            Key::F5 => Some(InputAction::Reset),
            Key::Escape => Some(InputAction::Quit),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> InputState {
        InputState::new()
    }

    const KEYPAD_KEYS: [Key; 16] = [
        Key::Digit1,
        Key::Digit2,
        Key::Digit3,
        Key::Digit4,
        Key::Q,
        Key::W,
        Key::E,
        Key::R,
        Key::A,
        Key::S,
        Key::D,
        Key::F,
        Key::Z,
        Key::X,
        Key::C,
        Key::V,
    ];

    // --- Keypad mapping --------------------------------------------------------

    #[test]
    fn top_row_maps_to_1_2_3_c() {
        assert_eq!(keypad_code(Key::Digit1), Some(0x1));
        assert_eq!(keypad_code(Key::Digit2), Some(0x2));
        assert_eq!(keypad_code(Key::Digit3), Some(0x3));
        assert_eq!(keypad_code(Key::Digit4), Some(0xC));
    }

    #[test]
    fn home_rows_map_to_middle_of_keypad() {
        assert_eq!(keypad_code(Key::Q), Some(0x4));
        assert_eq!(keypad_code(Key::R), Some(0xD));
        assert_eq!(keypad_code(Key::A), Some(0x7));
        assert_eq!(keypad_code(Key::F), Some(0xE));
    }

    #[test]
    fn bottom_row_maps_to_a_0_b_f() {
        assert_eq!(keypad_code(Key::Z), Some(0xA));
        assert_eq!(keypad_code(Key::X), Some(0x0));
        assert_eq!(keypad_code(Key::C), Some(0xB));
        assert_eq!(keypad_code(Key::V), Some(0xF));
    }

    #[test]
    fn keypad_codes_cover_all_sixteen_nibbles() {
        let mut seen = [false; 16];
        for key in KEYPAD_KEYS {
            let code = keypad_code(key).expect("keypad key must map");
            assert!(!seen[code as usize], "nibble {code:#X} mapped twice");
            seen[code as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn non_keypad_keys_have_no_code() {
        assert_eq!(keypad_code(Key::P), None);
        assert_eq!(keypad_code(Key::F5), None);
        assert_eq!(keypad_code(Key::Escape), None);
    }

    // --- Action translation -----------------------------------------------------

    #[test]
    fn keypad_press_and_release_both_forward() {
        assert_eq!(
            input().on_key(Key::W, true),
            Some(InputAction::Keypad { key: 0x5, pressed: true })
        );
        assert_eq!(
            input().on_key(Key::W, false),
            Some(InputAction::Keypad { key: 0x5, pressed: false })
        );
    }

    #[test]
    fn p_toggles_pause_on_press_only() {
        assert_eq!(input().on_key(Key::P, true), Some(InputAction::TogglePause));
        assert_eq!(input().on_key(Key::P, false), None);
    }

    #[test]
    fn f5_resets() {
        assert_eq!(input().on_key(Key::F5, true), Some(InputAction::Reset));
        assert_eq!(input().on_key(Key::F5, false), None);
    }

    #[test]
    fn escape_quits() {
        assert_eq!(input().on_key(Key::Escape, true), Some(InputAction::Quit));
    }
}
