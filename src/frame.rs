use bitvec::prelude::*;

#[cfg(feature = "embedded-graphics")]
use embedded_graphics::{image::ImageRaw, pixelcolor::BinaryColor};

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;
pub(crate) const MEM_LENGTH: usize = WIDTH * HEIGHT / 8;

/// The 64x32 monochrome framebuffer
///
/// Internally, the data is stored as concatenated rows from top to bottom,
/// one bit per pixel, most significant bit leftmost. Mutation happens only
/// through `clear` and the XOR sprite `blit`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Frame([u8; MEM_LENGTH]);

/// A shared view over a `Frame`
///
/// Has different accessors for the content of frames, which can be used
/// independently to fulfill the needs: the raw byte buffer for renderers,
/// bit-level lookup for tests and debuggers.
///
/// #Note:
/// Can return an ImageRaw instance with the `embedded-graphics` feature on.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct FrameView<'a>(&'a [u8; MEM_LENGTH]);

impl<'a> FrameView<'a> {
    /// View the raw memory of a frame
    pub fn as_raw(&self) -> &[u8] {
        self.0
    }

    /// Create an immutable copy of a frame
    pub fn copy_frame(self) -> Frame {
        Frame(*self.0)
    }

    /// Read a single pixel, `None` outside the 64x32 grid
    pub fn get_bit(&self, x: usize, y: usize) -> Option<bool> {
        self.iter_rows_as_bitslices()
            .nth(y)
            .and_then(|row| row.get(x))
            .copied()
    }

    /// Get iterator over rows in a form of `BitSlice`s
    pub fn iter_rows_as_bitslices(&self) -> impl Iterator<Item = &'a BitSlice<Msb0, u8>> {
        self.0.chunks(WIDTH / 8).map(|row| row.view_bits::<_>())
    }

    /// Get an `ImageRaw` structure from the frame's data
    #[cfg(feature = "embedded-graphics")]
    pub fn as_raw_image(&self) -> ImageRaw<'a, BinaryColor> {
        ImageRaw::new(self.0, WIDTH as u32, HEIGHT as u32)
    }
}

impl Frame {
    pub(crate) fn new() -> Self {
        Self([0; MEM_LENGTH])
    }

    /// Get view over frame
    pub fn view(&self) -> FrameView<'_> {
        FrameView(&self.0)
    }

    /// Turn every pixel off
    pub(crate) fn clear(&mut self) {
        self.0 = [0; MEM_LENGTH];
    }

    /// XOR-composite a sprite whose rows are `sprite` bytes (8 pixels wide,
    /// leftmost pixel in the most significant bit) with its top-left corner
    /// at `(x, y)`.
    ///
    /// The origin and every drawn pixel wrap modulo the grid size, so
    /// sprites drawn near an edge continue on the opposite side. Returns
    /// true if any drawn bit turned an already-lit pixel off.
    pub(crate) fn blit(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let x = x as usize % WIDTH;
        let y = y as usize % HEIGHT;
        let mut collision = false;
        for (row, &byte) in sprite.iter().enumerate() {
            for col in 0..8 {
                if byte & (0x80u8 >> col) != 0 {
                    collision |= self.toggle((x + col) % WIDTH, (y + row) % HEIGHT);
                }
            }
        }
        collision
    }

    /// Flip one pixel, returning its previous state.
    fn toggle(&mut self, x: usize, y: usize) -> bool {
        self.iter_rows_as_bitslices_mut()
            .nth(y)
            .and_then(|row| {
                row.get_mut(x).map(|mut bit| {
                    let was_lit = *bit;
                    *bit = !was_lit;
                    was_lit
                })
            })
            .unwrap_or(false)
    }

    fn iter_rows_as_bitslices_mut(&mut self) -> impl Iterator<Item = &mut BitSlice<Msb0, u8>> {
        self.0
            .chunks_mut(WIDTH / 8)
            .map(|row| row.view_bits_mut::<_>())
    }
}

#[cfg(test)]
impl Frame {
    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}
