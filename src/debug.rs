//! Human-readable listings of compiled bytecode.

use crate::chunk::{Chunk, OpCode};

/// Print a listing of every instruction in the chunk, under the given header.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) {
    println!("== {name} ==");

    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset);
    }
}

/// Print the instruction at the given offset. Returns the offset of the next instruction.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> usize {
    print!("{offset:04} ");

    let line = chunk.line_number_for(offset);
    if offset > 0 && line == chunk.line_number_for(offset - 1) {
        print!("   | ");
    } else {
        match line {
            Some(line) => print!("{line:4} "),
            None => print!("   ? "),
        }
    }

    let entry = chunk.get(offset).expect("offset is within the chunk");
    match entry.as_opcode() {
        Some(OpCode::Constant) => constant_instruction("OP_CONSTANT", chunk, offset),
        Some(OpCode::Add) => simple_instruction("OP_ADD", offset),
        Some(OpCode::Subtract) => simple_instruction("OP_SUBTRACT", offset),
        Some(OpCode::Multiply) => simple_instruction("OP_MULTIPLY", offset),
        Some(OpCode::Divide) => simple_instruction("OP_DIVIDE", offset),
        Some(OpCode::Negate) => simple_instruction("OP_NEGATE", offset),
        Some(OpCode::Return) => simple_instruction("OP_RETURN", offset),
        None => {
            println!("Unknown opcode {:#04x}", entry.as_byte());
            offset + 1
        }
    }
}

fn simple_instruction(name: &str, offset: usize) -> usize {
    println!("{name:>14}");
    offset + 1
}

fn constant_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    print!("{name:>14}");

    match chunk.get(offset + 1) {
        Some(operand) => {
            let index = operand.as_constant_index();
            match operand.resolve_constant() {
                Some(value) => println!("{index:4} '{value}'"),
                None => println!("{index:4} <invalid constant index>"),
            }
        }
        None => println!(" <missing operand>"),
    }

    offset + 2
}
