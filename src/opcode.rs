use core::fmt;

/// An enum representing the decoded instructions of the chip-8 architecture
///
/// Based on [chip8 mastering](http://mattmik.com/files/chip8/mastering/chip8.html)
///
/// Decoding refines the instruction word one nibble group at a time: the
/// highest nibble selects the family, and the 0x0/0x8/0xE/0xF families are
/// further resolved by their low nibble or low byte. Words that resolve to
/// no instruction decode to `None` and are executed as no-ops.
///
/// Examples:
/// ```
/// use crisp8::opcode::OpCode;
///
/// let instruction = 0x00E0;
/// let opcode = OpCode::decode(instruction);
///
/// assert_eq!(opcode, Some(OpCode::_00E0));
/// assert_eq!(OpCode::decode(0x8AB8), None);
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OpCode {
    /// Clear the screen
    _00E0,
    /// Return from a subroutine
    _00EE,
    /// Jump to address NNN
    _1NNN { nnn: u16 },
    /// Execute subroutine starting at address NNN
    _2NNN { nnn: u16 },
    /// Skip the following instruction if the value of register VX equals NN
    _3XNN { x: u8, nn: u8 },
    /// Skip the following instruction if the value of register VX is not equal to NN
    _4XNN { x: u8, nn: u8 },
    /// Skip the following instruction if the value of register VX is equal to the value of register VY
    _5XY0 { x: u8, y: u8 },
    /// Store number NN in register VX
    _6XNN { x: u8, nn: u8 },
    /// Add the value NN to register VX, no flag is affected
    _7XNN { x: u8, nn: u8 },
    /// Store the value of register VY in register VX
    _8XY0 { x: u8, y: u8 },
    /// Set VX to VX OR VY
    _8XY1 { x: u8, y: u8 },
    /// Set VX to VX AND VY
    _8XY2 { x: u8, y: u8 },
    /// Set VX to VX XOR VY
    _8XY3 { x: u8, y: u8 },
    /// Add the value of register VY to register VX, Set VF to 01 if a carry occurs, Set VF to 00 if a carry does not occur
    _8XY4 { x: u8, y: u8 },
    /// Subtract the value of register VY from register VX, Set VF to 01 if VX was greater than VY, Set VF to 00 otherwise
    _8XY5 { x: u8, y: u8 },
    /// Shift VX right one bit, Set register VF to the least significant bit prior to the shift
    _8XY6 { x: u8, y: u8 },
    /// Set register VX to the value of VY minus VX, Set VF to 01 if VY was greater than VX, Set VF to 00 otherwise
    _8XY7 { x: u8, y: u8 },
    /// Shift VX left one bit, Set register VF to the most significant bit prior to the shift
    _8XYE { x: u8, y: u8 },
    /// Skip the following instruction if the value of register VX is not equal to the value of register VY
    _9XY0 { x: u8, y: u8 },
    /// Store memory address NNN in register I
    _ANNN { nnn: u16 },
    /// Jump to address NNN + V0
    _BNNN { nnn: u16 },
    /// Set VX to a random number with a mask of NN
    _CXNN { x: u8, nn: u8 },
    /// Draw a sprite at position VX, VY with N bytes of sprite data starting at the address stored in I, Set VF to 01 if any set pixels are changed to unset, and 00 otherwise
    _DXYN { x: u8, y: u8, n: u8 },
    /// Skip the following instruction if the key corresponding to the hex value currently stored in register VX is pressed
    _EX9E { x: u8 },
    /// Skip the following instruction if the key corresponding to the hex value currently stored in register VX is not pressed
    _EXA1 { x: u8 },
    /// Store the current value of the delay timer in register VX
    _FX07 { x: u8 },
    /// Wait for a keypress and store the result in register VX
    _FX0A { x: u8 },
    /// Set the delay timer to the value of register VX
    _FX15 { x: u8 },
    /// Set the sound timer to the value of register VX
    _FX18 { x: u8 },
    /// Add the value stored in register VX to register I
    _FX1E { x: u8 },
    /// Set I to the memory address of the sprite data corresponding to the hexadecimal digit stored in register VX
    _FX29 { x: u8 },
    /// Store the binary-coded decimal equivalent of the value stored in register VX at addresses I, I+1, and I+2
    _FX33 { x: u8 },
    /// Store the values of registers V0 to VX inclusive in memory starting at address I
    _FX55 { x: u8 },
    /// Fill registers V0 to VX inclusive with the values stored in memory starting at address I
    _FX65 { x: u8 },
}

impl OpCode {
    fn read_first(raw: u16) -> u8 {
        (raw >> 12 & 0x000Fu16) as u8
    }

    fn read_last(raw: u16) -> u8 {
        (raw & 0x000Fu16) as u8
    }

    fn read_x(raw: u16) -> u8 {
        (raw >> 8 & 0x000Fu16) as u8
    }

    fn read_y(raw: u16) -> u8 {
        (raw >> 4 & 0x000Fu16) as u8
    }

    fn read_nn(raw: u16) -> u8 {
        (raw & 0x00FFu16) as u8
    }

    fn read_nnn(raw: u16) -> u16 {
        raw & 0x0FFFu16
    }

    /// Resolve a raw instruction word to exactly one instruction, or to
    /// `None` for words with no assigned instruction (including the 0NNN
    /// machine-language subroutine, which this interpreter ignores).
    pub fn decode(raw: u16) -> Option<Self> {
        let decoded = match Self::read_first(raw) {
            0x0u8 => match Self::read_nnn(raw) {
                0x0E0u16 => OpCode::_00E0,
                0x0EEu16 => OpCode::_00EE,
                _ => return None,
            },
            0x1u8 => OpCode::_1NNN {
                nnn: Self::read_nnn(raw),
            },
            0x2u8 => OpCode::_2NNN {
                nnn: Self::read_nnn(raw),
            },
            0x3u8 => OpCode::_3XNN {
                x: Self::read_x(raw),
                nn: Self::read_nn(raw),
            },
            0x4u8 => OpCode::_4XNN {
                x: Self::read_x(raw),
                nn: Self::read_nn(raw),
            },
            0x5u8 => OpCode::_5XY0 {
                x: Self::read_x(raw),
                y: Self::read_y(raw),
            },
            0x6u8 => OpCode::_6XNN {
                x: Self::read_x(raw),
                nn: Self::read_nn(raw),
            },
            0x7u8 => OpCode::_7XNN {
                x: Self::read_x(raw),
                nn: Self::read_nn(raw),
            },
            0x8u8 => {
                let x = Self::read_x(raw);
                let y = Self::read_y(raw);
                match Self::read_last(raw) {
                    0x0u8 => OpCode::_8XY0 { x, y },
                    0x1u8 => OpCode::_8XY1 { x, y },
                    0x2u8 => OpCode::_8XY2 { x, y },
                    0x3u8 => OpCode::_8XY3 { x, y },
                    0x4u8 => OpCode::_8XY4 { x, y },
                    0x5u8 => OpCode::_8XY5 { x, y },
                    0x6u8 => OpCode::_8XY6 { x, y },
                    0x7u8 => OpCode::_8XY7 { x, y },
                    0xEu8 => OpCode::_8XYE { x, y },
                    _ => return None,
                }
            }
            0x9u8 => OpCode::_9XY0 {
                x: Self::read_x(raw),
                y: Self::read_y(raw),
            },
            0xAu8 => OpCode::_ANNN {
                nnn: Self::read_nnn(raw),
            },
            0xBu8 => OpCode::_BNNN {
                nnn: Self::read_nnn(raw),
            },
            0xCu8 => OpCode::_CXNN {
                x: Self::read_x(raw),
                nn: Self::read_nn(raw),
            },
            0xDu8 => OpCode::_DXYN {
                x: Self::read_x(raw),
                y: Self::read_y(raw),
                n: Self::read_last(raw),
            },
            0xEu8 => {
                let x = Self::read_x(raw);
                match Self::read_nn(raw) {
                    0x9Eu8 => OpCode::_EX9E { x },
                    0xA1u8 => OpCode::_EXA1 { x },
                    _ => return None,
                }
            }
            0xFu8 => {
                let x = Self::read_x(raw);
                match Self::read_nn(raw) {
                    0x07u8 => OpCode::_FX07 { x },
                    0x0Au8 => OpCode::_FX0A { x },
                    0x15u8 => OpCode::_FX15 { x },
                    0x18u8 => OpCode::_FX18 { x },
                    0x1Eu8 => OpCode::_FX1E { x },
                    0x29u8 => OpCode::_FX29 { x },
                    0x33u8 => OpCode::_FX33 { x },
                    0x55u8 => OpCode::_FX55 { x },
                    0x65u8 => OpCode::_FX65 { x },
                    _ => return None,
                }
            }
            _ => unreachable!(),
        };
        Some(decoded)
    }
}

/// Cowgod-style mnemonic with operand values, used as the engine's
/// last-instruction trace.
impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use OpCode::*;
        match *self {
            _00E0 => write!(f, "CLS"),
            _00EE => write!(f, "RET"),
            _1NNN { nnn } => write!(f, "JP {:#05X}", nnn),
            _2NNN { nnn } => write!(f, "CALL {:#05X}", nnn),
            _3XNN { x, nn } => write!(f, "SE V{:X}, {:#04X}", x, nn),
            _4XNN { x, nn } => write!(f, "SNE V{:X}, {:#04X}", x, nn),
            _5XY0 { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            _6XNN { x, nn } => write!(f, "LD V{:X}, {:#04X}", x, nn),
            _7XNN { x, nn } => write!(f, "ADD V{:X}, {:#04X}", x, nn),
            _8XY0 { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            _8XY1 { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            _8XY2 { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            _8XY3 { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            _8XY4 { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            _8XY5 { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            _8XY6 { x, .. } => write!(f, "SHR V{:X}", x),
            _8XY7 { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            _8XYE { x, .. } => write!(f, "SHL V{:X}", x),
            _9XY0 { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            _ANNN { nnn } => write!(f, "LD I, {:#05X}", nnn),
            _BNNN { nnn } => write!(f, "JP V0, {:#05X}", nnn),
            _CXNN { x, nn } => write!(f, "RND V{:X}, {:#04X}", x, nn),
            _DXYN { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            _EX9E { x } => write!(f, "SKP V{:X}", x),
            _EXA1 { x } => write!(f, "SKNP V{:X}", x),
            _FX07 { x } => write!(f, "LD V{:X}, DT", x),
            _FX0A { x } => write!(f, "LD V{:X}, K", x),
            _FX15 { x } => write!(f, "LD DT, V{:X}", x),
            _FX18 { x } => write!(f, "LD ST, V{:X}", x),
            _FX1E { x } => write!(f, "ADD I, V{:X}", x),
            _FX29 { x } => write!(f, "LD F, V{:X}", x),
            _FX33 { x } => write!(f, "LD B, V{:X}", x),
            _FX55 { x } => write!(f, "LD [I], V{:X}", x),
            _FX65 { x } => write!(f, "LD V{:X}, [I]", x),
        }
    }
}
