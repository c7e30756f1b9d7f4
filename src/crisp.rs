use core::fmt::Write as _;

use heapless::{String, Vec};
use log::{debug, warn};

use crate::context::Context;
use crate::error::Error;
use crate::frame::{Frame, FrameView};
use crate::opcode::OpCode;
use crate::timer::{Timer, TimerState};

pub(crate) const MEMORY_SIZE: usize = 4096;
pub(crate) const PROGRAM_START: u16 = 0x200;
pub(crate) const PROGRAM_CAPACITY: usize = MEMORY_SIZE - PROGRAM_START as usize;
const FONT_START: u16 = 0x050;

/// 16 glyphs, 5 bytes each, copied to `FONT_START` on construction and reset.
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

/// Pure arithmetic helpers returning the result together with the flag
/// value destined for VF, keeping the side channel visible at the call
/// site instead of burying it in the handlers.
mod alu {
    /// 9-bit sum, flag set on carry out of bit 7.
    pub fn add(a: u8, b: u8) -> (u8, u8) {
        let sum = a as u16 + b as u16;
        (sum as u8, (sum > 0xFF) as u8)
    }

    /// Truncating difference, flag set iff `a > b`.
    pub fn sub(a: u8, b: u8) -> (u8, u8) {
        (a.wrapping_sub(b), (a > b) as u8)
    }

    /// Shift right, flag is the shifted-out least significant bit.
    pub fn shr(a: u8) -> (u8, u8) {
        (a >> 1, a & 0x01)
    }

    /// Shift left, flag is the shifted-out most significant bit.
    pub fn shl(a: u8) -> (u8, u8) {
        (a << 1, a >> 7)
    }
}

fn first_pressed(keys: &[bool; 16]) -> Option<u8> {
    keys.iter().position(|&key| key).map(|idx| idx as u8)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mode {
    Running,
    /// A wait-for-key instruction is stalling; `x` is its destination
    /// register. Timers keep ticking, nothing else makes progress.
    AwaitingKey { x: u8 },
}

pub struct Crisp8<C: Context + Sized> {
    ctx: C,
    v: [u8; 16],
    i: u16,
    pc: u16,
    opcode: u16,
    frame: Frame,
    memory: [u8; MEMORY_SIZE],
    stack: Vec<u16, 16>,
    delay_timer: Timer,
    sound_timer: Timer,
    mode: Mode,
    trace: String<32>,
    program: [u8; PROGRAM_CAPACITY],
    program_len: usize,
}

impl<C: Context + Sized> Crisp8<C> {
    /// Build an engine around `ctx` with `prog` loaded at 0x200.
    ///
    /// Rejects images that would not fit between the program base and the
    /// end of memory, before copying anything.
    pub fn load(ctx: C, prog: &[u8]) -> Result<Self, Error> {
        if prog.len() > PROGRAM_CAPACITY {
            return Err(Error::ProgramTooLarge { len: prog.len() });
        }
        let mut chip = Self {
            ctx,
            v: [0; 16],
            i: 0,
            pc: PROGRAM_START,
            opcode: 0,
            frame: Frame::new(),
            memory: [0; MEMORY_SIZE],
            stack: Vec::new(),
            delay_timer: Timer::new(),
            sound_timer: Timer::new(),
            mode: Mode::Running,
            trace: String::new(),
            program: [0; PROGRAM_CAPACITY],
            program_len: prog.len(),
        };
        chip.program[..prog.len()].copy_from_slice(prog);
        chip.reset();
        Ok(chip)
    }

    /// Return to the freshly-loaded state: memory re-zeroed with font and
    /// program re-copied, registers, stack, timers and display cleared,
    /// pc back at the program base.
    pub fn reset(&mut self) {
        self.v = [0; 16];
        self.i = 0;
        self.pc = PROGRAM_START;
        self.opcode = 0;
        self.stack.clear();
        self.memory = [0; MEMORY_SIZE];
        self.frame.clear();
        self.delay_timer.set(0);
        self.sound_timer.set(0);
        self.mode = Mode::Running;
        self.trace.clear();

        let font_start = FONT_START as usize;
        self.memory[font_start..font_start + FONT.len()].copy_from_slice(&FONT);
        let prog_start = PROGRAM_START as usize;
        self.memory[prog_start..prog_start + self.program_len]
            .copy_from_slice(&self.program[..self.program_len]);

        self.ctx.sound_off();
        self.ctx.on_frame(self.frame.view());
    }

    /// Execute one fetch/decode/execute/timer cycle.
    ///
    /// Returns `WouldBlock` while a wait-for-key instruction is stalling
    /// (timers still tick); any `Other` error is terminal for the emulated
    /// program and leaves the engine state as it was at the fault.
    pub fn tick(&mut self) -> nb::Result<(), Error> {
        if let Mode::AwaitingKey { x } = self.mode {
            return self.poll_key(x);
        }

        let raw = self.fetch().map_err(nb::Error::Other)?;
        self.opcode = raw;
        self.pc += 2;

        match OpCode::decode(raw) {
            Some(op) => {
                self.trace.clear();
                write!(self.trace, "{}", op).ok();
                debug!("{:#06X}: {}", raw, &self.trace[..]);
                self.execute(op).map_err(nb::Error::Other)?;
            }
            None => {
                self.trace.clear();
                write!(self.trace, "NOP ({:#06X})", raw).ok();
                warn!("ignoring unassigned opcode {:#06X}", raw);
            }
        }
        self.tick_timers();

        match self.mode {
            Mode::AwaitingKey { .. } => Err(nb::Error::WouldBlock),
            Mode::Running => Ok(()),
        }
    }

    fn poll_key(&mut self, x: u8) -> nb::Result<(), Error> {
        let result = match first_pressed(self.ctx.get_keys()) {
            Some(key) => {
                self.v[x as usize] = key;
                self.mode = Mode::Running;
                Ok(())
            }
            None => Err(nb::Error::WouldBlock),
        };
        self.tick_timers();
        result
    }

    /// Big-endian assembly of the two bytes at pc.
    fn fetch(&self) -> Result<u16, Error> {
        let pc = self.pc as usize;
        if pc + 1 >= MEMORY_SIZE {
            return Err(Error::AddressOutOfRange { addr: self.pc });
        }
        Ok((self.memory[pc] as u16) << 8 | self.memory[pc + 1] as u16)
    }

    fn tick_timers(&mut self) {
        self.delay_timer.tick();
        if self.sound_timer.tick() == TimerState::Finished {
            self.ctx.sound_off();
        }
    }
}

// Read accessors for the render/debug collaborators
impl<C: Context + Sized> Crisp8<C> {
    pub fn registers(&self) -> &[u8; 16] {
        &self.v
    }

    /// Return addresses currently on the stack, bottom first.
    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn sp(&self) -> u8 {
        self.stack.len() as u8
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// The raw instruction word fetched by the most recent cycle.
    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer.get()
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer.get()
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Human-readable description of the most recently executed
    /// instruction, operands included.
    pub fn trace(&self) -> &str {
        &self.trace
    }

    pub fn frame(&self) -> FrameView<'_> {
        self.frame.view()
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }
}

// OpCode impls
impl<C: Context + Sized> Crisp8<C> {
    #[rustfmt::skip]
    fn execute(&mut self, opcode: OpCode) -> Result<(), Error> {
        match opcode {
            OpCode::_00E0             => self.clear_screen(),
            OpCode::_00EE             => self.subroutine_return(),
            OpCode::_1NNN { nnn }     => self.jump_to(nnn),
            OpCode::_2NNN { nnn }     => self.exec_subroutine_at(nnn),
            OpCode::_3XNN { x, nn }   => self.skip_if_vx_eq_nn(x, nn),
            OpCode::_4XNN { x, nn }   => self.skip_if_vx_ne_nn(x, nn),
            OpCode::_5XY0 { x, y }    => self.skip_if_vx_eq_vy(x, y),
            OpCode::_6XNN { x, nn }   => self.assign_vx_nn(x, nn),
            OpCode::_7XNN { x, nn }   => self.assign_add_vx_nn(x, nn),
            OpCode::_8XY0 { x, y }    => self.assign_vx_vy(x, y),
            OpCode::_8XY1 { x, y }    => self.assign_or_vx_vy(x, y),
            OpCode::_8XY2 { x, y }    => self.assign_and_vx_vy(x, y),
            OpCode::_8XY3 { x, y }    => self.assign_xor_vx_vy(x, y),
            OpCode::_8XY4 { x, y }    => self.assign_add_vx_vy(x, y),
            OpCode::_8XY5 { x, y }    => self.assign_sub_vx_vy(x, y),
            OpCode::_8XY6 { x, .. }   => self.assign_vx_shifted_r(x),
            OpCode::_8XY7 { x, y }    => self.assign_vx_vy_sub_vx(x, y),
            OpCode::_8XYE { x, .. }   => self.assign_vx_shifted_l(x),
            OpCode::_9XY0 { x, y }    => self.skip_if_vx_ne_vy(x, y),
            OpCode::_ANNN { nnn }     => self.assign_i_nnn(nnn),
            OpCode::_BNNN { nnn }     => self.jump_to_nnn_add_v0(nnn),
            OpCode::_CXNN { x, nn }   => self.assign_vx_random_and_nn(x, nn),
            OpCode::_DXYN { x, y, n } => self.draw_n_at_vx_vy(x, y, n),
            OpCode::_EX9E { x }       => self.skip_if_vx_in_keys(x),
            OpCode::_EXA1 { x }       => self.skip_if_vx_not_in_keys(x),
            OpCode::_FX07 { x }       => self.assign_vx_delay_t(x),
            OpCode::_FX0A { x }       => self.assign_vx_wait_for_key(x),
            OpCode::_FX15 { x }       => self.assign_delay_t_vx(x),
            OpCode::_FX18 { x }       => self.assign_sound_t_vx(x),
            OpCode::_FX1E { x }       => self.assign_add_i_vx(x),
            OpCode::_FX29 { x }       => self.assign_i_addr_of_sprite_vx(x),
            OpCode::_FX33 { x }       => self.assign_mem_at_i_bcd_of_vx(x),
            OpCode::_FX55 { x }       => self.assign_mem_at_i_v0_to_vx(x),
            OpCode::_FX65 { x }       => self.assign_v0_to_vx_mem_at_i(x),
        }
    }

    /// Clear the screen
    /// 00E0
    fn clear_screen(&mut self) -> Result<(), Error> {
        self.frame.clear();
        self.ctx.on_frame(self.frame.view());
        Ok(())
    }

    /// Return from a subroutine
    /// 00EE
    fn subroutine_return(&mut self) -> Result<(), Error> {
        self.stack
            .pop()
            .ok_or(Error::StackUnderflow)
            .map(|addr| self.pc = addr)
    }

    /// Jump to address NNN
    /// 1NNN { nnn: u16 }
    fn jump_to(&mut self, nnn: u16) -> Result<(), Error> {
        self.pc = nnn;
        Ok(())
    }

    /// Execute subroutine starting at address NNN
    /// 2NNN { nnn: u16 }
    fn exec_subroutine_at(&mut self, nnn: u16) -> Result<(), Error> {
        // push before touching pc, so a full stack leaves state intact
        self.stack.push(self.pc).or(Err(Error::StackOverflow))?;
        self.pc = nnn;
        Ok(())
    }

    /// Skip the following instruction if the value of register VX equals NN
    /// 3XNN { x: u8, nn: u8 }
    fn skip_if_vx_eq_nn(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        if self.v[x as usize] == nn {
            self.pc += 2;
        }
        Ok(())
    }

    /// Skip the following instruction if the value of register VX is not equal to NN
    /// 4XNN { x: u8, nn: u8 }
    fn skip_if_vx_ne_nn(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        if self.v[x as usize] != nn {
            self.pc += 2;
        }
        Ok(())
    }

    /// Skip the following instruction if the value of register VX is equal to the value of register VY
    /// 5XY0 { x: u8, y: u8 }
    fn skip_if_vx_eq_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        if self.v[x as usize] == self.v[y as usize] {
            self.pc += 2;
        }
        Ok(())
    }

    /// Store number NN in register VX
    /// 6XNN { x: u8, nn: u8 }
    fn assign_vx_nn(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        self.v[x as usize] = nn;
        Ok(())
    }

    /// Add the value NN to register VX, leaving VF alone
    /// 7XNN { x: u8, nn: u8 }
    fn assign_add_vx_nn(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        self.v[x as usize] = self.v[x as usize].wrapping_add(nn);
        Ok(())
    }

    /// Store the value of register VY in register VX
    /// 8XY0 { x: u8, y: u8 }
    fn assign_vx_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        self.v[x as usize] = self.v[y as usize];
        Ok(())
    }

    /// Set VX to VX OR VY
    /// 8XY1 { x: u8, y: u8 }
    fn assign_or_vx_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        self.v[x as usize] |= self.v[y as usize];
        Ok(())
    }

    /// Set VX to VX AND VY
    /// 8XY2 { x: u8, y: u8 }
    fn assign_and_vx_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        self.v[x as usize] &= self.v[y as usize];
        Ok(())
    }

    /// Set VX to VX XOR VY
    /// 8XY3 { x: u8, y: u8 }
    fn assign_xor_vx_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        self.v[x as usize] ^= self.v[y as usize];
        Ok(())
    }

    /// Add the value of register VY to register VX, VF reports the carry
    /// 8XY4 { x: u8, y: u8 }
    fn assign_add_vx_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        let (value, flag) = alu::add(self.v[x as usize], self.v[y as usize]);
        self.v[x as usize] = value;
        self.v[0xF] = flag;
        Ok(())
    }

    /// Subtract the value of register VY from register VX, VF set iff VX was greater
    /// 8XY5 { x: u8, y: u8 }
    fn assign_sub_vx_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        let (value, flag) = alu::sub(self.v[x as usize], self.v[y as usize]);
        self.v[x as usize] = value;
        self.v[0xF] = flag;
        Ok(())
    }

    /// Shift VX right one bit, VF receives the shifted-out bit
    /// 8XY6 { x: u8, .. }
    fn assign_vx_shifted_r(&mut self, x: u8) -> Result<(), Error> {
        let (value, flag) = alu::shr(self.v[x as usize]);
        self.v[x as usize] = value;
        self.v[0xF] = flag;
        Ok(())
    }

    /// Set register VX to the value of VY minus VX, VF set iff VY was greater
    /// 8XY7 { x: u8, y: u8 }
    fn assign_vx_vy_sub_vx(&mut self, x: u8, y: u8) -> Result<(), Error> {
        let (value, flag) = alu::sub(self.v[y as usize], self.v[x as usize]);
        self.v[x as usize] = value;
        self.v[0xF] = flag;
        Ok(())
    }

    /// Shift VX left one bit, VF receives the shifted-out bit
    /// 8XYE { x: u8, .. }
    fn assign_vx_shifted_l(&mut self, x: u8) -> Result<(), Error> {
        let (value, flag) = alu::shl(self.v[x as usize]);
        self.v[x as usize] = value;
        self.v[0xF] = flag;
        Ok(())
    }

    /// Skip the following instruction if the value of register VX is not equal to the value of register VY
    /// 9XY0 { x: u8, y: u8 }
    fn skip_if_vx_ne_vy(&mut self, x: u8, y: u8) -> Result<(), Error> {
        if self.v[x as usize] != self.v[y as usize] {
            self.pc += 2;
        }
        Ok(())
    }

    /// Store memory address NNN in register I
    /// ANNN { nnn: u16 }
    fn assign_i_nnn(&mut self, nnn: u16) -> Result<(), Error> {
        self.i = nnn;
        Ok(())
    }

    /// Jump to address NNN + V0
    /// BNNN { nnn: u16 }
    fn jump_to_nnn_add_v0(&mut self, nnn: u16) -> Result<(), Error> {
        let addr = nnn + self.v[0] as u16;
        if addr < MEMORY_SIZE as u16 {
            self.pc = addr;
            Ok(())
        } else {
            Err(Error::AddressOutOfRange { addr })
        }
    }

    /// Set VX to a random number with a mask of NN
    /// CXNN { x: u8, nn: u8 }
    fn assign_vx_random_and_nn(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        self.v[x as usize] = self.ctx.gen_random() & nn;
        Ok(())
    }

    /// Draw a sprite at position VX, VY with N bytes of sprite data starting
    /// at the address stored in I, VF reports collision
    /// DXYN { x: u8, y: u8, n: u8 }
    fn draw_n_at_vx_vy(&mut self, x: u8, y: u8, n: u8) -> Result<(), Error> {
        let start = self.i as usize;
        let end = start + n as usize;
        if end > MEMORY_SIZE {
            return Err(Error::AddressOutOfRange {
                addr: (end - 1) as u16,
            });
        }
        let collision = self.frame.blit(
            self.v[x as usize],
            self.v[y as usize],
            &self.memory[start..end],
        );
        self.v[0xF] = collision as u8;
        self.ctx.on_frame(self.frame.view());
        Ok(())
    }

    /// Skip the following instruction if the key corresponding to the hex value currently stored in register VX is pressed
    /// EX9E { x: u8 }
    fn skip_if_vx_in_keys(&mut self, x: u8) -> Result<(), Error> {
        let key = (self.v[x as usize] & 0xF) as usize;
        if self.ctx.get_keys()[key] {
            self.pc += 2;
        }
        Ok(())
    }

    /// Skip the following instruction if the key corresponding to the hex value currently stored in register VX is not pressed
    /// EXA1 { x: u8 }
    fn skip_if_vx_not_in_keys(&mut self, x: u8) -> Result<(), Error> {
        let key = (self.v[x as usize] & 0xF) as usize;
        if !self.ctx.get_keys()[key] {
            self.pc += 2;
        }
        Ok(())
    }

    /// Store the current value of the delay timer in register VX
    /// FX07 { x: u8 }
    fn assign_vx_delay_t(&mut self, x: u8) -> Result<(), Error> {
        self.v[x as usize] = self.delay_timer.get();
        Ok(())
    }

    /// Wait for a keypress and store the result in register VX
    ///
    /// With no key down this switches the engine into the awaiting-key
    /// mode: following cycles poll the keypad and tick timers without
    /// executing anything until a key arrives. Lowest index wins a tie.
    /// FX0A { x: u8 }
    fn assign_vx_wait_for_key(&mut self, x: u8) -> Result<(), Error> {
        match first_pressed(self.ctx.get_keys()) {
            Some(key) => self.v[x as usize] = key,
            None => self.mode = Mode::AwaitingKey { x },
        }
        Ok(())
    }

    /// Set the delay timer to the value of register VX
    /// FX15 { x: u8 }
    fn assign_delay_t_vx(&mut self, x: u8) -> Result<(), Error> {
        self.delay_timer.set(self.v[x as usize]);
        Ok(())
    }

    /// Set the sound timer to the value of register VX
    /// FX18 { x: u8 }
    fn assign_sound_t_vx(&mut self, x: u8) -> Result<(), Error> {
        let value = self.v[x as usize];
        self.sound_timer.set(value);
        if value > 0 {
            self.ctx.sound_on();
        } else {
            self.ctx.sound_off();
        }
        Ok(())
    }

    /// Add the value stored in register VX to register I, no flag is affected
    /// FX1E { x: u8 }
    fn assign_add_i_vx(&mut self, x: u8) -> Result<(), Error> {
        let addr = self.i + self.v[x as usize] as u16;
        if addr < MEMORY_SIZE as u16 {
            self.i = addr;
            Ok(())
        } else {
            Err(Error::AddressOutOfRange { addr })
        }
    }

    /// Set I to the memory address of the sprite data corresponding to the hexadecimal digit stored in register VX
    /// FX29 { x: u8 }
    fn assign_i_addr_of_sprite_vx(&mut self, x: u8) -> Result<(), Error> {
        self.i = FONT_START + 5 * (self.v[x as usize] & 0xF) as u16;
        Ok(())
    }

    /// Store the binary-coded decimal equivalent of the value stored in register VX at addresses I, I+1, and I+2
    /// FX33 { x: u8 }
    fn assign_mem_at_i_bcd_of_vx(&mut self, x: u8) -> Result<(), Error> {
        let i = self.i as usize;
        if i + 2 >= MEMORY_SIZE {
            return Err(Error::AddressOutOfRange {
                addr: (i + 2) as u16,
            });
        }
        let value = self.v[x as usize];
        self.memory[i] = value / 100;
        self.memory[i + 1] = value % 100 / 10;
        self.memory[i + 2] = value % 10;
        Ok(())
    }

    /// Store the values of registers V0 to VX inclusive in memory starting
    /// at address I; I itself is left unchanged
    /// FX55 { x: u8 }
    fn assign_mem_at_i_v0_to_vx(&mut self, x: u8) -> Result<(), Error> {
        let start = self.i as usize;
        let last = start + x as usize;
        if last >= MEMORY_SIZE {
            return Err(Error::AddressOutOfRange { addr: last as u16 });
        }
        for idx in 0..=x as usize {
            self.memory[start + idx] = self.v[idx];
        }
        Ok(())
    }

    /// Fill registers V0 to VX inclusive with the values stored in memory
    /// starting at address I; I itself is left unchanged
    /// FX65 { x: u8 }
    fn assign_v0_to_vx_mem_at_i(&mut self, x: u8) -> Result<(), Error> {
        let start = self.i as usize;
        let last = start + x as usize;
        if last >= MEMORY_SIZE {
            return Err(Error::AddressOutOfRange { addr: last as u16 });
        }
        for idx in 0..=x as usize {
            self.v[idx] = self.memory[start + idx];
        }
        Ok(())
    }
}



#[cfg(test)]
mod cycle_tests {
    use super::*;
    use crate::context::testing::TestingContext;

    fn load(prog: &[u8]) -> Crisp8<TestingContext> {
        match Crisp8::load(TestingContext::new(0), prog) {
            Ok(chip) => chip,
            Err(e) => panic!("program must load: {}", e),
        }
    }

    #[test]
    fn rejects_oversized_program_before_copying() {
        let image = [0u8; PROGRAM_CAPACITY + 1];
        assert_eq!(
            Crisp8::load(TestingContext::new(0), &image[..]).err(),
            Some(Error::ProgramTooLarge {
                len: PROGRAM_CAPACITY + 1
            }),
        );
    }

    #[test]
    fn largest_possible_program_loads() {
        let image = [0u8; PROGRAM_CAPACITY];
        let chip = load(&image[..]);
        assert_eq!(chip.memory()[MEMORY_SIZE - 1], 0);
    }

    #[test]
    fn fetch_assembles_big_endian_and_preincrements_pc() {
        // LD V0, 0x05; ADD V0, 0x03
        let mut chip = load(&[0x60, 0x05, 0x70, 0x03]);
        chip.tick().unwrap();
        assert_eq!(chip.v[0], 5);
        assert_eq!(chip.pc(), PROGRAM_START + 2);
        assert_eq!(chip.opcode(), 0x6005);

        chip.tick().unwrap();
        assert_eq!(chip.v[0], 8);
        assert_eq!(chip.pc(), PROGRAM_START + 4);
        assert_eq!(chip.opcode(), 0x7003);
    }

    #[test]
    fn skips_jump_over_the_following_instruction() {
        // LD V0, 0x05; SE V0, 0x05; LD V1, 0xAA; LD V2, 0xBB
        let mut chip = load(&[0x60, 0x05, 0x30, 0x05, 0x61, 0xAA, 0x62, 0xBB]);
        for _ in 0..3 {
            chip.tick().unwrap();
        }
        assert_eq!(chip.v[1], 0x00); // skipped
        assert_eq!(chip.v[2], 0xBB);
        assert_eq!(chip.pc(), PROGRAM_START + 8);
    }

    #[test]
    fn unknown_opcode_executes_as_noop() {
        // 0x0123 is an ignored machine-language subroutine
        let mut chip = load(&[0x01, 0x23, 0x60, 0x07]);
        chip.tick().unwrap();
        assert_eq!(chip.pc(), PROGRAM_START + 2);
        assert_eq!(chip.registers(), &[0u8; 16]);
        assert_eq!(chip.trace(), "NOP (0x0123)");

        chip.tick().unwrap();
        assert_eq!(chip.v[0], 0x07);
    }

    #[test]
    fn trace_describes_last_executed_instruction() {
        let mut chip = load(&[0x6A, 0x12, 0xA3, 0x00]);
        assert_eq!(chip.trace(), "");
        chip.tick().unwrap();
        assert_eq!(chip.trace(), "LD VA, 0x12");
        chip.tick().unwrap();
        assert_eq!(chip.trace(), "LD I, 0x300");
    }

    #[test]
    fn timers_decrement_once_per_cycle_while_positive() {
        // LD V0, 5; LD DT, V0; then two harmless loads
        let mut chip = load(&[0x60, 0x05, 0xF0, 0x15, 0x61, 0x00, 0x62, 0x00]);
        chip.tick().unwrap();
        assert_eq!(chip.delay_timer(), 0);

        // the setting cycle itself already ticks the timer down
        chip.tick().unwrap();
        assert_eq!(chip.delay_timer(), 4);

        chip.tick().unwrap();
        assert_eq!(chip.delay_timer(), 3);
        chip.tick().unwrap();
        assert_eq!(chip.delay_timer(), 2);
    }

    #[test]
    fn sound_timer_runs_the_beeper_until_it_finishes() {
        // LD V0, 2; LD ST, V0; two harmless loads
        let mut chip = load(&[0x60, 0x02, 0xF0, 0x18, 0x61, 0x00, 0x62, 0x00]);
        chip.tick().unwrap();
        assert!(!chip.context().is_sound_on());

        chip.tick().unwrap(); // ST := 2, same cycle ticks it to 1
        assert_eq!(chip.sound_timer(), 1);
        assert!(chip.context().is_sound_on());

        chip.tick().unwrap(); // 1 -> 0, beeper off
        assert_eq!(chip.sound_timer(), 0);
        assert!(!chip.context().is_sound_on());
    }

    #[test]
    fn await_key_stalls_with_timers_running() {
        // LD V0, 5; LD DT, V0; LD V2, K; LD V3, 0x77
        let mut chip = load(&[0x60, 0x05, 0xF0, 0x15, 0xF2, 0x0A, 0x63, 0x77]);
        chip.tick().unwrap();
        chip.tick().unwrap();
        assert_eq!(chip.delay_timer(), 4);

        // no key: stalled, pc stays past the wait instruction, timers tick
        assert!(matches!(chip.tick(), Err(nb::Error::WouldBlock)));
        assert_eq!(chip.pc(), PROGRAM_START + 6);
        assert_eq!(chip.delay_timer(), 3);
        assert!(matches!(chip.tick(), Err(nb::Error::WouldBlock)));
        assert_eq!(chip.delay_timer(), 2);

        // key arrives: stored, execution resumes on following cycles
        chip.context_mut().set_key(0x0A);
        chip.tick().unwrap();
        assert_eq!(chip.v[2], 0x0A);
        assert_eq!(chip.delay_timer(), 1);

        chip.tick().unwrap();
        assert_eq!(chip.v[3], 0x77);
        assert_eq!(chip.pc(), PROGRAM_START + 8);
    }

    #[test]
    fn call_and_return_round_trip_through_the_stack() {
        // 0x200: CALL 0x204; 0x202: LD V1, 0x11; 0x204: RET
        let mut chip = load(&[0x22, 0x04, 0x61, 0x11, 0x00, 0xEE]);
        chip.tick().unwrap();
        assert_eq!(chip.pc(), 0x204);
        assert_eq!(chip.stack(), &[0x202u16]);
        assert_eq!(chip.sp(), 1);

        chip.tick().unwrap();
        assert_eq!(chip.pc(), 0x202);
        assert_eq!(chip.sp(), 0);

        chip.tick().unwrap();
        assert_eq!(chip.v[1], 0x11);
    }

    #[test]
    fn recursion_without_return_overflows_the_stack() {
        // 0x200: CALL 0x200
        let mut chip = load(&[0x22, 0x00]);
        for _ in 0..16 {
            chip.tick().unwrap();
        }
        assert_eq!(chip.sp(), 16);
        match chip.tick() {
            Err(nb::Error::Other(e)) => assert_eq!(e, Error::StackOverflow),
            other => panic!("expected stack overflow, got {:?}", other),
        }
        assert_eq!(chip.sp(), 16);
    }

    #[test]
    fn returning_from_top_level_underflows_the_stack() {
        let mut chip = load(&[0x00, 0xEE]);
        match chip.tick() {
            Err(nb::Error::Other(e)) => assert_eq!(e, Error::StackUnderflow),
            other => panic!("expected stack underflow, got {:?}", other),
        }
    }

    #[test]
    fn running_past_the_address_space_is_an_error() {
        // JP 0xFFE; the word at 0xFFE is zeroed memory, a no-op
        let mut chip = load(&[0x1F, 0xFE]);
        chip.tick().unwrap();
        chip.tick().unwrap();
        assert_eq!(chip.pc(), 0x1000);
        match chip.tick() {
            Err(nb::Error::Other(e)) => {
                assert_eq!(e, Error::AddressOutOfRange { addr: 0x1000 })
            }
            other => panic!("expected address error, got {:?}", other),
        }
    }

    #[test]
    fn reset_restores_the_freshly_loaded_state() {
        let prog = [0x60, 0x05, 0xF0, 0x15, 0x22, 0x08, 0x00, 0x00, 0x00, 0xEE];
        let mut chip = load(&prog);
        chip.tick().unwrap();
        chip.tick().unwrap();
        chip.tick().unwrap();
        assert_ne!(chip.pc(), PROGRAM_START);

        chip.reset();
        assert_eq!(chip.pc(), PROGRAM_START);
        assert_eq!(chip.registers(), &[0u8; 16]);
        assert_eq!(chip.sp(), 0);
        assert_eq!(chip.index(), 0);
        assert_eq!(chip.delay_timer(), 0);
        assert_eq!(chip.sound_timer(), 0);
        assert_eq!(chip.trace(), "");

        // program image and font are back in place and runnable
        let prog_start = PROGRAM_START as usize;
        assert_eq!(&chip.memory()[prog_start..prog_start + prog.len()], &prog);
        assert_eq!(&chip.memory()[0x050..0x055], &FONT[..5]);
        chip.tick().unwrap();
        assert_eq!(chip.registers()[0], 0x05);
    }
}
