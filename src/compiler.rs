//! Contains the Ze parser and bytecode compiler.
//!
//! The compiler is single-pass: it pulls tokens from the [Scanner] and emits bytecode into a
//! [Chunk] as it parses, never materializing a syntax tree. Operator precedence and
//! associativity are handled by Pratt parsing over a fixed rule table.

use crate::chunk::WrittenOpcode;
use crate::prelude::*;

/////////////////////////////////////////// Public API ////////////////////////////////////////////

/// Compiles one Ze expression and, if successful, returns its bytecode [Chunk].
///
/// On failure, one diagnostic per error region has already been printed to stderr (with the
/// 1-based source line), and the partially emitted chunk is discarded: a failed compilation
/// never hands back anything executable.
pub fn compile(source: &str) -> crate::Result<Chunk> {
    let parser = Parser::new(source);
    let compiler = Compiler::new(parser);
    compiler.compile()
}

///////////////////////////////////// Implementation details //////////////////////////////////////

/// Precedence rules for [Token]s in Ze.
///
/// Precedence rules have a well-defined ordering ([PartialOrd]), which is required for use in
/// the Pratt parsing algorithm.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq)]
enum Precedence {
    None,
    /// `+` `-`
    Term,
    /// `*` `/`
    Factor,
    /// unary `-`
    Unary,
    /// Literals, and groupings
    Primary,
}

/// A rule in the Pratt parser table. See [Compiler::parse_precedence()] for usage.
#[derive(Copy, Clone)]
struct ParserRule {
    prefix: Option<ParserFn>,
    infix: Option<ParserFn>,
    precedence: Precedence,
}

/// Any possible action taken from the parsing table. Actions take the entire compiler state,
/// and convert it, usually emitting bytecode.
type ParserFn = fn(&mut Compiler) -> ();

/// Contains the parser state, including the error status for this compilation pass.
///
/// All of this state is created per call to [compile] and dropped at its end; nothing is
/// shared between compilations.
#[derive(Debug)]
struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Lexeme<'a>,
    previous: Lexeme<'a>,
    had_error: bool,
    panic_mode: bool,
}

/// Contains the compiler state, which includes the [Parser] and the current chunk being
/// produced.
struct Compiler<'a> {
    parser: Parser<'a>,
    compiling_chunk: Chunk,
}

impl Precedence {
    /// Returns the next higher level of precedence.
    ///
    /// Parsing a left-associative operator's right operand one level higher is what stops
    /// `1 - 2 - 3` from grouping as `1 - (2 - 3)`.
    ///
    /// # Panics
    ///
    /// Panics if trying to obtain a higher level of precedence than the maximum,
    /// [Precedence::Primary], which is the precedence of literals.
    #[inline]
    fn higher_precedence(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Primary,
            Primary => panic!("Tried to get higher precedence than primary"),
        }
    }
}

impl ParserRule {
    /// Returns one level of precedence higher than the rule's precedence.
    /// See [Precedence::higher_precedence()].
    #[inline(always)]
    fn higher_precedence(&self) -> Precedence {
        self.precedence.higher_precedence()
    }
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    fn new(source: &'a str) -> Parser<'a> {
        let mut scanner = Scanner::new(source);
        let first_token = scanner.scan_token();
        let sentinel = scanner.make_sentinel("<before first token>");

        let mut parser = Parser {
            scanner,
            previous: sentinel,
            current: first_token,
            had_error: false,
            panic_mode: false,
        };

        // The first token may already be a scan error.
        if parser.current.token() == Token::Error {
            parser.error_at_current(parser.current.text());
            parser.advance();
        }

        parser
    }

    /// Update self.previous and self.current such that they move one token further in the
    /// token stream.
    fn advance(&mut self) {
        self.previous = self.current.clone();

        // Get tokens until we get a non-error token. Scan errors are reported here, so the
        // rest of the parser only ever sees well-formed tokens.
        loop {
            self.current = self.scanner.scan_token();
            if self.current.token() != Token::Error {
                break;
            }

            self.error_at_current(self.current.text())
        }
    }

    /// Scan the next token. If the token is not of the desired type, an error message is
    /// printed.
    fn consume(&mut self, desired_token: Token, message: &'static str) {
        if self.current.token() == desired_token {
            return self.advance();
        }

        self.error_at_current(message);
    }

    /// Emit a compiler error, located at the previous [Lexeme]. In Pratt parsing, this is the
    /// handler you usually want to call, because the previous lexeme decided which
    /// [ParserRule] was accepted.
    fn error(&mut self, message: &str) {
        self.error_at(self.previous.clone(), message)
    }

    /// Emit a compiler error, located at the current [Lexeme].
    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current.clone(), message)
    }

    /// Emit a compiler error, located at the given [Lexeme].
    fn error_at(&mut self, lexeme: Lexeme<'a>, message: &str) {
        // *Attempt* to prevent a deluge of spurious syntax errors:
        if self.panic_mode {
            return;
        }

        self.panic_mode = true;
        self.had_error = true;

        // Print the actual message:
        eprint!("[line {}] Error", lexeme.line());
        if lexeme.token() == Token::Eof {
            eprint!(" at end");
        } else if lexeme.token() == Token::Error {
            // Nothing
        } else {
            eprint!(" at '{}'", lexeme.text());
        }
        eprintln!(": {message}");
    }

    /// Synchronize after being in panic mode.
    ///
    /// The grammar is a single expression, so the only synchronization point is the end of
    /// input: gobble up and discard tokens until we get there. Scan errors encountered along
    /// the way are suppressed by panic mode; leaving panic mode here is what lets a later
    /// error region report again.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.token() != Token::Eof {
            self.advance();
        }
    }
}

impl<'a> Compiler<'a> {
    /// Creates a new compiler with the given [Parser].
    fn new(parser: Parser) -> Compiler {
        Compiler {
            parser,
            compiling_chunk: Chunk::default(),
        }
    }

    /// Takes ownership of the compiler, and returns the chunk.
    fn compile(mut self) -> crate::Result<Chunk> {
        self.expression();

        if self.parser.panic_mode {
            self.parser.synchronize();
        }
        self.parser
            .consume(Token::Eof, "expected end of expression");

        self.end_compiler();

        if self.parser.had_error {
            return Err(InterpretationError::CompileError);
        }

        Ok(self.compiling_chunk)
    }

    /// Signal the end of compilation.
    fn end_compiler(&mut self) {
        self.emit_return();

        // Print a listing of the bytecode to manually inspect compiled output.
        if cfg!(feature = "print_code") && !self.parser.had_error {
            crate::debug::disassemble_chunk(self.current_chunk(), "code");
        }
    }

    /// The core of the Pratt parsing algorithm.
    ///
    /// Parse a prefix term, then keep consuming infix operators of at least the given
    /// precedence, emitting each operator's opcode only after both of its operands have been
    /// emitted. That ordering is exactly what makes the output a valid postfix program for
    /// the stack machine, with no tree in between.
    ///
    /// See: <https://en.wikipedia.org/wiki/Operator-precedence_parser#Pratt_parsing>
    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();

        // First, figure out how to parse the prefix.
        if let Some(parse_prefix) = self.rule_from_previous().prefix {
            parse_prefix(self);
        } else {
            self.parser.error("expected an expression");
            return;
        }

        while precedence <= self.rule_from_current().precedence {
            // current is now previous:
            self.advance();
            let parse_infix = self
                .rule_from_previous()
                .infix
                .expect("a rule with a defined precedence must always have an infix rule");

            parse_infix(self);
        }
    }

    /// Parse an expression.
    fn expression(&mut self) {
        self.parse_precedence(Precedence::Term);
    }

    /// Appends [OpCode::Return] to the current [Chunk].
    fn emit_return(&mut self) {
        self.emit_instruction(OpCode::Return);
    }

    /// Appends [OpCode::Constant] to the current [Chunk], pushing the given value.
    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_instruction(OpCode::Constant).with_operand(index);
    }

    /// Appends a new constant to the current [Chunk]'s pool.
    ///
    /// # Error
    ///
    /// When the constant index can no longer be represented as a u8, this signals a compiler
    /// error and returns `0u8`. The current [Chunk] can still be appended to, however, it is
    /// invalid, and will never be handed to a caller.
    fn make_constant(&mut self, value: Value) -> u8 {
        if let Some(index) = self.current_chunk().add_constant(value) {
            index
        } else {
            self.parser.error("Too many constants in one chunk");
            0
        }
    }

    /// Writes an [OpCode] to the current [Chunk].
    /// Returns a [WrittenOpcode], with which you can write an operand.
    fn emit_instruction(&mut self, opcode: OpCode) -> WrittenOpcode {
        let line = self.line_number_of_prefix();
        self.current_chunk().write_opcode(opcode, line)
    }

    ///////////////////////////////////////// Aliases /////////////////////////////////////////////

    /// Returns the current [Chunk].
    #[inline(always)]
    fn current_chunk(&mut self) -> &mut Chunk {
        &mut self.compiling_chunk
    }

    /// Advance one token in scanner, such that:
    /// ```text
    /// (previous, current) = (current, scanner.next_token())
    /// ```
    #[inline(always)]
    fn advance(&mut self) {
        self.parser.advance()
    }

    /// Returns the line number of the prefix token, a.k.a., `self.parser.previous`.
    #[inline(always)]
    fn line_number_of_prefix(&self) -> usize {
        self.parser.previous.line()
    }

    /// Returns the rule for the prefix in the process of being parsed.
    #[inline(always)]
    fn rule_from_previous(&self) -> ParserRule {
        get_rule(self.previous_token())
    }

    /// Returns the rule for the token about to be parsed.
    #[inline(always)]
    fn rule_from_current(&self) -> ParserRule {
        get_rule(self.parser.current.token())
    }

    /// Return the token (type) of the previous lexeme. This is useful in prefix parser
    /// functions.
    #[inline(always)]
    fn previous_token(&self) -> Token {
        self.parser.previous.token()
    }
}

////////////////////////////////////////// Parser rules ///////////////////////////////////////////

/// Makes defining [ParserRule]s a bit cleaner looking.
macro_rules! rule {
    ($prefix:expr, $infix:expr, $precedence:expr) => {
        ParserRule {
            prefix: $prefix,
            infix: $infix,
            precedence: $precedence,
        }
    };
}

// Note: spelled Token::* out in full, because a glob import would make the table's `None`
// cells ambiguous with [Token::None].
#[rustfmt::skip]
fn get_rule(token: Token) -> ParserRule {
    match token {
        //                          Prefix          Infix         Precedence
        Token::LeftParen  => rule!{ Some(grouping), None,         Precedence::None },
        Token::RightParen => rule!{ None,           None,         Precedence::None },
        Token::Minus      => rule!{ Some(unary),    Some(binary), Precedence::Term },
        Token::Plus       => rule!{ None,           Some(binary), Precedence::Term },
        Token::Slash      => rule!{ None,           Some(binary), Precedence::Factor },
        Token::Star       => rule!{ None,           Some(binary), Precedence::Factor },
        Token::Identifier => rule!{ None,           None,         Precedence::None },
        Token::Number     => rule!{ Some(number),   None,         Precedence::None },
        Token::True       => rule!{ Some(literal),  None,         Precedence::None },
        Token::False      => rule!{ Some(literal),  None,         Precedence::None },
        Token::None       => rule!{ Some(literal),  None,         Precedence::None },
        Token::Error      => rule!{ None,           None,         Precedence::None },
        Token::Eof        => rule!{ None,           None,         Precedence::None },
    }
}

/// Parse '(' as a prefix. Assumes '(' has been consumed.
fn grouping(compiler: &mut Compiler) {
    debug_assert_eq!(Token::LeftParen, compiler.previous_token());
    compiler.expression();
    compiler
        .parser
        .consume(Token::RightParen, "Expect ')' after expression");
}

/// Parse a number literal as a prefix. Assumes the number has been consumed.
fn number(compiler: &mut Compiler) {
    debug_assert_eq!(Token::Number, compiler.previous_token());
    let value = compiler
        .parser
        .previous
        .text()
        .parse::<f64>()
        .expect("Internal error: Token::Number MUST parse as a float, but didn't?");
    compiler.emit_constant(value.into());
}

/// Parse an unary operator as a prefix. Assumes the operator has been consumed.
fn unary(compiler: &mut Compiler) {
    let operator = compiler.previous_token();

    // Compile the operand, so that it's placed on the stack.
    compiler.parse_precedence(Precedence::Unary);

    match operator {
        Token::Minus => compiler.emit_instruction(OpCode::Negate),
        _ => unreachable!(),
    };
}

/// Parse a binary operator as an infix. Assumes the operator has been consumed, and its left
/// operand has already been emitted.
fn binary(compiler: &mut Compiler) {
    let operator = compiler.previous_token();
    let rule = get_rule(operator);

    // One level higher makes every binary operator left-associative.
    compiler.parse_precedence(rule.higher_precedence());
    match operator {
        Token::Plus => compiler.emit_instruction(OpCode::Add),
        Token::Minus => compiler.emit_instruction(OpCode::Subtract),
        Token::Star => compiler.emit_instruction(OpCode::Multiply),
        Token::Slash => compiler.emit_instruction(OpCode::Divide),
        _ => unreachable!(),
    };
}

/// Parse a keyword literal as a prefix. Assumes the keyword has been consumed.
///
/// There are no dedicated opcodes for these in this instruction set, so they go through the
/// constant pool like any number.
fn literal(compiler: &mut Compiler) {
    match compiler.previous_token() {
        Token::True => compiler.emit_constant(true.into()),
        Token::False => compiler.emit_constant(false.into()),
        Token::None => compiler.emit_constant(Value::None),
        _ => unreachable!(),
    };
}

////////////////////////////////////////////// Tests //////////////////////////////////////////////

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    /// The raw instruction stream of a chunk.
    fn bytes_of(chunk: &Chunk) -> Vec<u8> {
        (0..chunk.len())
            .map(|offset| chunk.get(offset).unwrap().as_byte())
            .collect()
    }

    /// The line table of a chunk.
    fn lines_of(chunk: &Chunk) -> Vec<usize> {
        (0..chunk.len())
            .map(|offset| chunk.line_number_for(offset).unwrap())
            .collect()
    }

    /// The constant pool of a chunk.
    fn constants_of(chunk: &Chunk) -> Vec<Value> {
        (0..chunk.constants().len())
            .map(|index| chunk.constants().get(index).unwrap())
            .collect()
    }

    #[test]
    fn precedence_confidence_check() {
        // */ binds tighter than +-, and unary tighter still.
        assert!(Precedence::Factor > Precedence::Term);
        assert!(Precedence::Unary > Precedence::Factor);
        assert!(Precedence::Primary > Precedence::Unary);

        assert_eq!(Precedence::Factor, Precedence::Term.higher_precedence());
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let chunk = compile("1 + 2 * 3").unwrap();

        use OpCode::*;
        let expected = vec![
            Constant as u8, 0,
            Constant as u8, 1,
            Constant as u8, 2,
            Multiply as u8,
            Add as u8,
            Return as u8,
        ];
        assert_eq!(expected, bytes_of(&chunk));
        assert_eq!(
            vec![Value::from(1.0), 2.0.into(), 3.0.into()],
            constants_of(&chunk)
        );
    }

    #[test]
    fn grouping_overrides_precedence() {
        let chunk = compile("(1 + 2) * 3").unwrap();

        use OpCode::*;
        let expected = vec![
            Constant as u8, 0,
            Constant as u8, 1,
            Add as u8,
            Constant as u8, 2,
            Multiply as u8,
            Return as u8,
        ];
        assert_eq!(expected, bytes_of(&chunk));
    }

    #[test]
    fn unary_minus_emits_negate_after_its_operand() {
        let chunk = compile("-(2 + 3)").unwrap();

        use OpCode::*;
        let expected = vec![
            Constant as u8, 0,
            Constant as u8, 1,
            Add as u8,
            Negate as u8,
            Return as u8,
        ];
        assert_eq!(expected, bytes_of(&chunk));
    }

    #[test]
    fn keyword_literals_go_through_the_constant_pool() {
        let chunk = compile("true").unwrap();
        assert_eq!(
            vec![OpCode::Constant as u8, 0, OpCode::Return as u8],
            bytes_of(&chunk)
        );
        assert_eq!(vec![Value::from(true)], constants_of(&chunk));

        let chunk = compile("none").unwrap();
        assert_eq!(vec![Value::None], constants_of(&chunk));
    }

    #[test]
    fn compilation_is_deterministic() {
        let source = "(1 + 2.5) * -3 / 4";
        let first = compile(source).unwrap();
        let second = compile(source).unwrap();

        assert_eq!(bytes_of(&first), bytes_of(&second));
        assert_eq!(lines_of(&first), lines_of(&second));
        assert_eq!(constants_of(&first), constants_of(&second));
    }

    #[test]
    fn every_instruction_byte_has_a_line() {
        let chunk = compile("1 +\n2 *\n3").unwrap();
        assert_eq!(chunk.len(), lines_of(&chunk).len());

        // The Multiply emitted for line 2's operator comes after its line-3 right operand,
        // but still reports a real line.
        for offset in 0..chunk.len() {
            assert!(chunk.line_number_for(offset).unwrap() >= 1);
        }
    }

    #[test]
    fn every_constant_operand_is_a_valid_pool_index() {
        let chunk = compile("1 + 2 * 3 - 4 / -5").unwrap();

        let mut offset = 0;
        while offset < chunk.len() {
            match chunk.get(offset).unwrap().as_opcode().unwrap() {
                OpCode::Constant => {
                    let operand = chunk.get(offset + 1).expect("operand byte must exist");
                    assert!(operand.resolve_constant().is_some());
                    offset += 2;
                }
                _ => offset += 1,
            }
        }
    }

    #[test]
    fn syntax_errors_fail_the_compile() {
        assert!(compile("1 + + 2").is_err());
        assert!(compile("(1 + 2").is_err());
        assert!(compile("").is_err());
        assert!(compile("1 2").is_err());
        assert!(compile("1.2.3").is_err());
        assert!(compile("@").is_err());
        // Identifiers scan, but nothing can be done with them yet.
        assert!(compile("soup").is_err());
    }

    #[test]
    fn a_failed_region_does_not_hide_a_scan_error() {
        // Both the unexpected '+' and the malformed number should fail the compile, and
        // neither should cascade into a panic.
        assert!(compile("+ 1.2.3").is_err());
    }

    #[test]
    fn too_many_constants_is_a_compile_error() {
        // 257 literals, each a fresh constant-pool entry (no deduplication).
        let source = vec!["1"; 257].join(" + ");
        assert!(compile(&source).is_err());

        // 256 is still fine.
        let source = vec!["1"; 256].join(" + ");
        assert!(compile(&source).is_ok());
    }
}
