//! Context for accessing functionalities of the platform that `Crisp8` is
//! emulated on.
//!
//! The keypad and the random byte source live on the host side of this
//! seam: the core only ever reads key states and consumes random bytes, so
//! a test can script both. If several engines run on parallel threads, each
//! must own its own context, the core does no synchronization.

use crate::frame::FrameView;

/// Trait aggregating platform functionalities
pub trait Context {
    /// Receive the current frame after the display has changed
    ///
    /// Called whenever a cycle mutated the framebuffer
    fn on_frame(&mut self, frame: FrameView<'_>);
    /// Turn sound on
    ///
    /// Called when the sound timer is loaded with a nonzero value
    fn sound_on(&mut self);
    /// Turn sound off
    ///
    /// Called when the sound timer counts down to zero or is loaded with zero
    fn sound_off(&mut self);
    /// Get state of each key on the 4x4 keypad
    ///
    /// Read during skip-on-key and wait-for-key instructions
    fn get_keys(&mut self) -> &[bool; 16];
    /// Generate a random 8-bit number
    ///
    /// Consumed only by the random-byte instruction
    fn gen_random(&mut self) -> u8;
}
