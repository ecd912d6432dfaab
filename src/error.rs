//! Provides [InterpretationError], the error that most things return.

use std::fmt;

use thiserror::Error;

/// Any error that can occur during interpretation.
#[derive(Debug, Error)]
pub enum InterpretationError {
    /// A compile-time error, such as a syntax error. The diagnostics themselves have already
    /// been printed to the error channel by the time this is returned.
    #[error("compile-time error")]
    CompileError,
    /// A runtime error, such as a type error or a stack overflow.
    #[error(transparent)]
    RuntimeError(#[from] RuntimeError),
}

/// An error raised while the VM was executing a chunk.
///
/// Carries what went wrong and, when the chunk's line table can supply it, the 1-based source
/// line of the offending instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    kind: RuntimeErrorKind,
    line: Option<usize>,
}

/// What kind of runtime error occurred.
///
/// [RuntimeErrorKind::InternalError] is reserved for invariant violations --- states that are
/// unreachable when the compiler and VM are correct, such as popping an empty value stack.
/// It must never be reported for bad user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeErrorKind {
    /// An operand had the wrong type for the instruction, e.g., `true + 1`.
    #[error("type error: {0}")]
    TypeError(&'static str),
    /// The value stack exceeded its fixed maximum depth.
    #[error("stack overflow")]
    StackOverflow,
    /// The VM reached a state that well-formed bytecode cannot produce.
    #[error("internal error: {0}")]
    InternalError(&'static str),
}

impl RuntimeError {
    /// A type error at the given source line.
    pub fn type_error(message: &'static str, line: Option<usize>) -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::TypeError(message),
            line,
        }
    }

    /// A stack overflow at the given source line.
    pub fn stack_overflow(line: Option<usize>) -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::StackOverflow,
            line,
        }
    }

    /// An invariant violation. See [RuntimeErrorKind::InternalError].
    pub fn internal(message: &'static str, line: Option<usize>) -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::InternalError(message),
            line,
        }
    }

    /// What kind of error this is.
    pub fn kind(&self) -> &RuntimeErrorKind {
        &self.kind
    }

    /// The 1-based source line of the offending instruction, when available.
    pub fn line(&self) -> Option<usize> {
        self.line
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "[line {line}] {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn runtime_errors_format_with_line_numbers() {
        let error = RuntimeError::type_error("operand must be a number", Some(3));
        assert_eq!(
            "[line 3] type error: operand must be a number",
            error.to_string()
        );

        let error = RuntimeError::internal("popped an empty value stack", None);
        assert_eq!(
            "internal error: popped an empty value stack",
            error.to_string()
        );
    }

    #[test]
    fn runtime_errors_convert_to_interpretation_errors() {
        let error: InterpretationError = RuntimeError::stack_overflow(Some(1)).into();
        assert!(matches!(error, InterpretationError::RuntimeError(_)));
    }
}
