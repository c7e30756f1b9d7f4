#![no_std]
pub mod builder;
pub mod context;
pub mod crisp;
pub mod error;
pub mod frame;
pub mod opcode;

mod timer;

pub use builder::Builder;
pub use context::Context;
pub use crisp::Crisp8;
pub use error::Error;
pub use frame::{Frame, FrameView};
pub use opcode::OpCode;

#[cfg(feature = "embedded-graphics")]
pub use embedded_graphics;
