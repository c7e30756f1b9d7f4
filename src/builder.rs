//! Builder pattern implementation for `Crisp8` struct

use crate::context::Context;
use crate::crisp::Crisp8;
use crate::error::Error;

/// Assembles an engine from a context and a program image.
///
/// ## Example:
/// ```ignore
/// let chip = Builder::new()
///     .with_context(ctx)
///     .with_program(&program[..])
///     .build()?;
/// ```
pub struct Builder<'a, C: Context> {
    context: Option<C>,
    program: Option<&'a [u8]>,
}

impl<'a, C: Context> Builder<'a, C> {
    pub fn new() -> Self {
        Self {
            context: None,
            program: None,
        }
    }

    pub fn with_context(mut self, context: C) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_program(mut self, program: &'a [u8]) -> Self {
        self.program = Some(program);
        self
    }

    /// Fails when either part is missing, or when the program image does
    /// not fit in memory.
    pub fn build(self) -> Result<Crisp8<C>, Error> {
        let context = self.context.ok_or(Error::MissingContext)?;
        let program = self.program.ok_or(Error::MissingProgram)?;
        Crisp8::load(context, program)
    }
}

impl<'a, C: Context> Default for Builder<'a, C> {
    fn default() -> Self {
        Self::new()
    }
}
