//! The bytecode virtual machine.

use crate::compiler;
use crate::error::RuntimeError;
use crate::prelude::{Chunk, OpCode, Value};

/// The fixed maximum depth of the value stack. Pushing past this is a runtime error, not
/// undefined behavior.
pub const STACK_MAX: usize = 256;

/// Maintains state for the Ze virtual machine.
///
/// A VM executes one chunk at a time; the instruction pointer and value stack are reset at
/// the start of every [VM::run] and never outlive it meaningfully.
pub struct VM {
    /// Instruction pointer --- index into the chunk for the next opcode to be executed.
    ip: usize,
    /// Value stack --- modified as elements are pushed and popped from the stack.
    stack: Vec<Value>,
}

/// Fetches the next bytecode in the chunk, **AND** increments the instruction pointer.
///
/// Note: use [current_ip] to get the "current" value of the instruction pointer being executed
/// right now.
macro_rules! next_bytecode {
    ($self: ident, $chunk: ident) => {{
        let byte = $chunk.get($self.ip);
        $self.ip += 1;
        byte
    }};
}

/// Gets the value of the current instruction pointer. To be used in conjunction with
/// [next_bytecode].
macro_rules! current_ip {
    ($self: ident) => {
        $self.ip - 1
    };
}

impl VM {
    /// Compile and run the given Ze source code, returning its final value.
    pub fn interpret(&mut self, source: &str) -> crate::Result<Value> {
        let chunk = compiler::compile(source)?;
        Ok(self.run(&chunk)?)
    }

    /// The main opcode interpreter loop. Executes the chunk from offset 0 on a fresh stack,
    /// returning the final value or the first runtime error.
    pub fn run(&mut self, chunk: &Chunk) -> Result<Value, RuntimeError> {
        self.ip = 0;
        self.stack.clear();

        loop {
            if cfg!(feature = "trace_execution") {
                use crate::debug::disassemble_instruction;

                // Prints the current stack:
                print!("        ");
                for value in self.stack.iter() {
                    print!("[ {value} ]")
                }
                println!();

                // Print the next instruction:
                disassemble_instruction(chunk, self.ip);
            }

            let entry = match next_bytecode!(self, chunk) {
                Some(entry) => entry,
                None => {
                    // Well-formed chunks always end in Return before this can happen.
                    return Err(RuntimeError::internal(
                        "instruction pointer ran past the end of the chunk",
                        None,
                    ));
                }
            };
            let line = chunk.line_number_for(current_ip!(self));

            let opcode = match entry.as_opcode() {
                Some(opcode) => opcode,
                None => {
                    return Err(RuntimeError::internal(
                        "fetched a byte that is not an opcode",
                        line,
                    ))
                }
            };

            match opcode {
                OpCode::Constant => {
                    let operand = next_bytecode!(self, chunk).ok_or_else(|| {
                        RuntimeError::internal("constant instruction is missing its operand", line)
                    })?;
                    let value = operand.resolve_constant().ok_or_else(|| {
                        RuntimeError::internal("constant operand is not a valid pool index", line)
                    })?;
                    self.push(value, line)?;
                }
                OpCode::Add => self.binary_op(line, |a, b| a + b)?,
                OpCode::Subtract => self.binary_op(line, |a, b| a - b)?,
                OpCode::Multiply => self.binary_op(line, |a, b| a * b)?,
                OpCode::Divide => self.binary_op(line, |a, b| a / b)?,
                OpCode::Negate => {
                    let value = self.pop(line)?;
                    match value.as_number() {
                        Some(num) => self.push((-num).into(), line)?,
                        None => {
                            return Err(RuntimeError::type_error(
                                "operand to '-' must be a number",
                                line,
                            ))
                        }
                    }
                }
                OpCode::Return => {
                    // An empty stack here means the program produced nothing: yield none.
                    return Ok(self.stack.pop().unwrap_or(Value::None));
                }
            }
        }
    }

    /// Pops two operands off the stack to perform an arithmetic operation.
    ///
    /// The right operand is on top, and order matters: this computes `left op right`, exactly
    /// as the operands were pushed. Arithmetic follows IEEE 754, so dividing by zero yields an
    /// infinity or NaN rather than an error.
    fn binary_op<F>(&mut self, line: Option<usize>, op: F) -> Result<(), RuntimeError>
    where
        F: Fn(f64, f64) -> f64,
    {
        let rhs = self.pop(line)?;
        let lhs = self.pop(line)?;

        match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => self.push(op(a, b).into(), line),
            _ => Err(RuntimeError::type_error(
                "operands to an arithmetic operator must be numbers",
                line,
            )),
        }
    }

    /// Pushes a [Value] on to the value stack, failing if the stack is at its maximum depth.
    fn push(&mut self, value: Value, line: Option<usize>) -> Result<(), RuntimeError> {
        if self.stack.len() >= STACK_MAX {
            return Err(RuntimeError::stack_overflow(line));
        }
        self.stack.push(value);
        Ok(())
    }

    /// Pops and returns the top [Value] on the value stack.
    ///
    /// Given well-formed bytecode, a pop cannot occur while the value stack is empty, so an
    /// empty stack here is an invariant violation, never a user-facing type error.
    #[inline(always)]
    fn pop(&mut self, line: Option<usize>) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::internal("popped an empty value stack", line))
    }
}

impl Default for VM {
    fn default() -> Self {
        // Create a VM with the value stack pre-allocated to its full depth.
        VM {
            ip: 0,
            stack: Vec::with_capacity(STACK_MAX),
        }
    }
}
