use core::fmt;

/// Faults that end the emulated program's execution.
///
/// None of these are retried internally; the driver decides whether to
/// `reset` or report. An unknown opcode is deliberately *not* represented
/// here, it executes as a no-op.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// A call was attempted with all 16 stack slots in use.
    StackOverflow,
    /// A return was attempted with no call frame to return to.
    StackUnderflow,
    /// The program image does not fit between 0x200 and the end of memory.
    ProgramTooLarge { len: usize },
    /// An address outside 0x000..=0xFFF was about to be accessed.
    AddressOutOfRange { addr: u16 },
    /// `Builder::build` was called without a context.
    MissingContext,
    /// `Builder::build` was called without a program image.
    MissingProgram,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackOverflow => write!(f, "Call stack is full"),
            Self::StackUnderflow => write!(f, "Can't return, not in subroutine"),
            Self::ProgramTooLarge { len } => {
                write!(f, "Program image of {} bytes does not fit in memory", len)
            }
            Self::AddressOutOfRange { addr } => {
                write!(f, "Address {:#05X} out of address space", addr)
            }
            Self::MissingContext => write!(f, "Context not provided"),
            Self::MissingProgram => write!(f, "Program not provided"),
        }
    }
}
