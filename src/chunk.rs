//! Contains a [Chunk] of [OpCode].

use crate::value::{Value, ValueArray};

crate::with_try_from_u8! {
    /// A one-byte operation code for Ze.
    ///
    /// [OpCode::Constant] is followed by a one-byte index into the chunk's constant pool;
    /// every other opcode stands alone.
    #[repr(u8)]
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub enum OpCode {
        /// Push a value from the constant pool. Operand: pool index.
        Constant,
        /// Pop two numbers, push their sum.
        Add,
        /// Pop two numbers, push left minus right.
        Subtract,
        /// Pop two numbers, push their product.
        Multiply,
        /// Pop two numbers, push left divided by right.
        Divide,
        /// Pop one number, push its arithmetic negation.
        Negate,
        /// Halt, yielding the top of the stack as the final value.
        Return,
    }
}

/// A chunk of compiled bytecode, with metadata.
///
/// Holds the instruction stream, a parallel line table (one source line per instruction byte,
/// used only for diagnostics), and the constant pool. Invariant: the line table is always
/// exactly as long as the instruction stream.
///
/// A chunk is filled by exactly one compilation pass and read-only afterwards; the VM never
/// writes to it.
#[derive(Default)]
pub struct Chunk {
    code: Vec<u8>,
    lines: Vec<usize>,
    constants: ValueArray,
}

/// A valid byte from a chunk. This byte can then be interpreted as required.
#[derive(Clone, Copy)]
pub struct BytecodeEntry<'a> {
    byte: u8,
    provenance: &'a Chunk,
}

/// An [OpCode] that has already been written to the bytestream.
///
/// This opcode can be augmented with an additional operand.
pub struct WrittenOpcode<'a> {
    line: usize,
    provenance: &'a mut Chunk,
}

///////////////////////////////////////// Implementation //////////////////////////////////////////

impl Chunk {
    /// Return a new, empty [Chunk].
    pub fn new() -> Self {
        Chunk::default()
    }

    /// Get an entry from the bytecode stream.
    ///
    /// Returns `Some(entry)` when the offset is in [0, self.len()).
    pub fn get(&self, offset: usize) -> Option<BytecodeEntry> {
        self.code.get(offset).copied().map(|byte| BytecodeEntry {
            byte,
            provenance: self,
        })
    }

    /// Append a single [OpCode] to the chunk.
    pub fn write_opcode(&mut self, opcode: OpCode, line: usize) -> WrittenOpcode {
        self.write(opcode as u8, line);

        WrittenOpcode {
            line,
            provenance: self,
        }
    }

    /// Adds a constant to the constant pool, and returns its index.
    ///
    /// Returns `None` when the pool already holds 256 constants, since an index past that
    /// cannot be encoded in the one-byte operand of [OpCode::Constant]. The caller must treat
    /// that as a compile error, never truncate.
    #[must_use]
    pub fn add_constant(&mut self, value: Value) -> Option<u8> {
        let index = u8::try_from(self.constants.len()).ok()?;
        self.constants.write(value);
        Some(index)
    }

    /// Overwrites one already-written byte of the instruction stream, leaving the line table
    /// untouched. This exists for backpatching operand placeholders (e.g., jump offsets);
    /// it cannot append.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is past the end of the instruction stream.
    pub fn patch_byte(&mut self, offset: usize, byte: u8) {
        assert!(offset < self.code.len(), "patch past the end of the chunk");
        self.code[offset] = byte;
    }

    /// Returns the source line for whatever is at the given offset.
    pub fn line_number_for(&self, offset: usize) -> Option<usize> {
        self.lines.get(offset).copied()
    }

    /// Read access to the constant pool.
    pub fn constants(&self) -> &ValueArray {
        &self.constants
    }

    /// Returns the length of the byte stream.
    #[inline]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Returns true if nothing has been appended to the byte stream.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Actually writes to the byte stream and the parallel line table.
    fn write(&mut self, payload: u8, line_number: usize) {
        self.code.push(payload);
        self.lines.push(line_number);
        debug_assert_eq!(self.code.len(), self.lines.len());
    }
}

impl<'a> BytecodeEntry<'a> {
    /// Returns the raw byte.
    #[inline(always)]
    pub fn as_byte(self) -> u8 {
        self.byte
    }

    /// Returns the byte as an index into the constant pool.
    #[inline(always)]
    pub fn as_constant_index(self) -> usize {
        self.byte as usize
    }

    /// Returns the byte decoded as an [OpCode].
    /// Returns `None` if the byte is not a valid opcode.
    #[inline]
    pub fn as_opcode(self) -> Option<OpCode> {
        self.byte.try_into().ok()
    }

    /// Yanks out a constant from the constant pool.
    #[inline]
    pub fn resolve_constant(self) -> Option<Value> {
        self.provenance.constants.get(self.as_constant_index())
    }
}

impl<'a> WrittenOpcode<'a> {
    /// Consumes `self` and appends the operand to the byte stream for the last written
    /// instruction, on the same line.
    #[inline]
    pub fn with_operand(self, index: u8) {
        self.provenance.write(index, self.line);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mess_around_with_bytecode() {
        let mut c = Chunk::new();
        let i = c.add_constant(1.0.into()).unwrap();
        c.write_opcode(OpCode::Constant, 123).with_operand(i);
        c.write_opcode(OpCode::Return, 123);

        assert_eq!(3, c.len());

        // Constant
        assert_eq!(Some(OpCode::Constant), c.get(0).unwrap().as_opcode());
        assert_eq!(Some(0), c.get(1).map(|b| b.as_constant_index()));
        assert_eq!(
            Some(Value::from(1.0)),
            c.get(1).and_then(|b| b.resolve_constant())
        );

        // Return
        assert_eq!(Some(OpCode::Return), c.get(2).unwrap().as_opcode());

        // Reads are bounds-checked.
        assert!(c.get(3).is_none());
    }

    #[test]
    fn line_table_stays_parallel_to_code() {
        let mut c = Chunk::new();
        let idx = c.add_constant(1.2.into()).unwrap();

        c.write_opcode(OpCode::Constant, 1).with_operand(idx);
        c.write_opcode(OpCode::Constant, 1).with_operand(idx);
        c.write_opcode(OpCode::Negate, 2);
        c.write_opcode(OpCode::Return, 4);

        assert_eq!(6, c.len());

        // One line entry per instruction byte, operands included.
        assert_eq!(Some(1), c.line_number_for(0));
        assert_eq!(Some(1), c.line_number_for(3));
        assert_eq!(Some(2), c.line_number_for(4));
        assert_eq!(Some(4), c.line_number_for(c.len() - 1));
        assert_eq!(None, c.line_number_for(c.len()));
    }

    #[test]
    fn constant_pool_overflows_at_256() {
        let mut c = Chunk::new();
        for i in 0..256 {
            assert_eq!(Some(i as u8), c.add_constant(f64::from(i).into()));
        }

        // The 257th constant cannot be indexed by a one-byte operand.
        assert_eq!(None, c.add_constant(256.0.into()));
        assert_eq!(256, c.constants().len());
    }

    #[test]
    fn patching_rewrites_code_but_not_lines() {
        let mut c = Chunk::new();
        let a = c.add_constant(1.0.into()).unwrap();
        let b = c.add_constant(2.0.into()).unwrap();
        c.write_opcode(OpCode::Constant, 7).with_operand(a);

        c.patch_byte(1, b);

        assert_eq!(Some(b as usize), c.get(1).map(|e| e.as_constant_index()));
        assert_eq!(2, c.len());
        assert_eq!(Some(7), c.line_number_for(1));
    }

    #[test]
    fn every_byte_decodes_back_to_its_opcode() {
        use OpCode::*;
        for opcode in [Constant, Add, Subtract, Multiply, Divide, Negate, Return] {
            assert_eq!(Ok(opcode), OpCode::try_from(opcode as u8));
        }
        assert_eq!(Err(255), OpCode::try_from(255u8));
    }
}
