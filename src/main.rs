use std::env;
use std::fs;
use std::io;
use std::io::Write;

use zevm::prelude::*;

/// The conventional exit codes in BSD Unixes.
/// See: man 3 sysexits
mod ex {
    /// The conventional exit code for usage error.
    pub const USAGE: i32 = 64;
    /// When the input data is incorrect -- for example, a compile-time error.
    pub const DATAERR: i32 = 65;
    /// An internal software error occurred.
    pub const SOFTWARE: i32 = 70;
    /// An error occurred while doing I/O on a file.
    pub const IOERR: i32 = 74;
}

fn main() {
    let args: Vec<_> = env::args().collect();

    if args.len() <= 1 {
        repl()
    } else if args.len() == 2 {
        let filename = args.get(1).unwrap();
        run_file(filename)
    } else {
        eprintln!("Usage: zevm [path]");
        std::process::exit(ex::USAGE);
    }
}

/// Use Ze interactively using the read-evaluate-print loop.
fn repl() {
    let mut vm = VM::default();
    let mut line = String::with_capacity(1024);

    let stdin = io::stdin();

    loop {
        line.clear();

        print!("> ");
        let _ = io::stdout().flush();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => {
                println!();
                break;
            }
            Ok(_) => {
                // Diagnostics have already been printed; keep the loop alive either way.
                match vm.interpret(&line) {
                    Ok(value) => println!("{value}"),
                    Err(InterpretationError::CompileError) => (),
                    Err(InterpretationError::RuntimeError(error)) => eprintln!("{error}"),
                }
            }
        }
    }
}

fn run_file(filename: &str) {
    let source = match fs::read_to_string(filename) {
        Ok(s) => s,
        Err(_) => {
            eprintln!("Could not read file: {filename}");
            std::process::exit(ex::IOERR);
        }
    };
    let mut vm = VM::default();

    let status = match vm.interpret(&source) {
        Ok(value) => {
            println!("{value}");
            0
        }
        Err(InterpretationError::CompileError) => ex::DATAERR,
        Err(InterpretationError::RuntimeError(error)) => {
            eprintln!("{error}");
            ex::SOFTWARE
        }
    };

    std::process::exit(status)
}
