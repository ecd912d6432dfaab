//! zevm: a bytecode compiler and virtual machine for the Ze expression language.
//!
//! Source text goes through the [scanner], gets compiled in a single pass by
//! [compiler::compile] into a [chunk::Chunk], and is executed by [vm::VM].

pub mod chunk;
pub mod compiler;
pub mod debug;
pub mod error;
pub mod object;
pub mod scanner;
pub mod value;
pub mod vm;
mod with_try_from_u8;

pub use error::{InterpretationError, RuntimeError, RuntimeErrorKind};

/// The result type returned by the compile and interpret entry points.
pub type Result<T> = std::result::Result<T, InterpretationError>;

/// Re-exports common items.
pub mod prelude {
    pub use crate::chunk::{Chunk, OpCode};
    pub use crate::error::{InterpretationError, RuntimeError, RuntimeErrorKind};
    pub use crate::scanner::{Lexeme, Scanner, Token};
    pub use crate::value::Value;
    pub use crate::vm::VM;
}
