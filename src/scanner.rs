//! Handles Ze's lexical analysis.
//!
//! Contains the [Scanner] which implements an [Iterator] that yields [Lexeme]s, each of which
//! represents a [Token].
//!
//! # Example
//!
//! ```
//! use zevm::scanner::{Scanner, Lexeme, Token};
//! let scanner = Scanner::new("1 + 2 * 3");
//! let tokens: Vec<_> = scanner
//!     .map(|lexeme| lexeme.token())
//!     .take_while(|&token| token != Token::Eof) // scanner will yield Eof forever...
//!     .collect();
//!
//! use Token::*;
//! assert_eq!(
//!     vec![Number, Plus, Number, Star, Number],
//!     tokens
//! );
//! ```

use enum_map::Enum;

/// A lexeme from one contiguous string of Ze source code.
#[derive(Clone, Debug)]
pub struct Lexeme<'a> {
    /// The [Token] of this lexeme.
    token: Token,
    /// The actual text from the source code. For [Token::Error], this is the diagnostic
    /// message instead.
    text: &'a str,
    /// The line where this lexeme came from.
    line: usize,
}

/// What _type_ of [Lexeme] you have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[rustfmt::skip]
pub enum Token {
    // Single-character tokens.
    LeftParen, RightParen,
    Minus, Plus,
    Star, Slash,
    // Literals
    Identifier, Number,
    // Keywords
    True, False, None,

    // Others
    Error, Eof,
}

/// Scans Ze source code and iteratively yields [Lexeme]s.
///
/// The scanner is stateful, and therefore can only be used to do one pass over the source code
/// string. Every compilation call creates its own scanner; none of its state outlives the
/// call. Once the whole source code has been scanned, the scanner will forever yield
/// [Token::Eof].
#[derive(Debug)]
pub struct Scanner<'a> {
    start: &'a str,
    current: &'a str,
    line: usize,
}

impl<'a> Scanner<'a> {
    /// Start scanning the given string of source code.
    pub fn new(source: &'a str) -> Self {
        Scanner {
            start: source,
            current: source,
            line: 1,
        }
    }

    /// Yield the next [Lexeme] from the string. Once the scanner has reached the end of input,
    /// this function will always return an end-of-input lexeme.
    pub fn scan_token(&mut self) -> Lexeme<'a> {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return self.make_lexeme(Token::Eof);
        }

        match self.advance() {
            c if is_id_start(c) => self.identifier(),
            c if c.is_ascii_digit() => self.number(),
            '(' => self.make_lexeme(Token::LeftParen),
            ')' => self.make_lexeme(Token::RightParen),
            '-' => self.make_lexeme(Token::Minus),
            '+' => self.make_lexeme(Token::Plus),
            '/' => self.make_lexeme(Token::Slash),
            '*' => self.make_lexeme(Token::Star),
            _ => self.error_token("Unexpected character"),
        }
    }

    /// Returns `true` if we've reached the end of the source code.
    pub fn is_at_end(&self) -> bool {
        self.current.is_empty()
    }

    /// Returns a placeholder [Token::Error] lexeme, for parser state that does not correspond
    /// to any real token yet.
    pub fn make_sentinel(&self, message: &'static str) -> Lexeme<'a> {
        Lexeme {
            token: Token::Error,
            text: message,
            line: 0,
        }
    }

    /// Advances self.current, s.t., self.start < self.current are a reference to the same str.
    /// Returns the next valid char.
    ///
    /// # Panics
    ///
    /// If this is called at the end of string.
    fn advance(&mut self) -> char {
        let c = match self.current.chars().next() {
            Some(c) => c,
            None => panic!("called advance() at end of input"),
        };

        let len = c.len_utf8();
        self.current = &self.current[len..];
        assert!(self.current.len() < self.start.len());

        c
    }

    /// Peek at the first char in self.current.
    fn peek(&self) -> char {
        self.current.chars().next().unwrap_or('\0')
    }

    /// Peek at the second char in self.current.
    fn peek_next(&self) -> char {
        let mut chars = self.current.chars();
        chars.next();
        chars.next().unwrap_or('\0')
    }

    /// Skips whitespace and comments, counting every newline consumed.
    fn skip_whitespace(&mut self) {
        loop {
            let c = self.peek();
            match c {
                ' ' | '\r' | '\t' => {
                    self.advance();
                }
                '\n' => {
                    // Count the newline
                    self.line += 1;
                    self.advance();
                }
                // Comments are "whitespace"
                '/' => {
                    if self.peek_next() == '/' {
                        while self.peek() != '\n' && !self.is_at_end() {
                            self.advance();
                        }
                    } else {
                        return;
                    }
                }
                _ => return,
            };
        }
    }

    /// Scan an identifier or keyword.
    fn identifier(&mut self) -> Lexeme<'a> {
        while is_id_continue(self.peek()) {
            self.advance();
        }

        self.make_lexeme(self.identifier_type())
    }

    /// Scan a number literal. Expects the first digit to have already been consumed.
    fn number(&mut self) -> Lexeme<'a> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            // Consume the decimal point
            self.advance();

            // Consume the digits after the decimal point
            while self.peek().is_ascii_digit() {
                self.advance();
            }

            // A literal like 1.2.3 is malformed, not two adjacent tokens.
            if self.peek() == '.' {
                self.advance();
                return self.error_token("Too many decimal points in number");
            }
        }

        self.make_lexeme(Token::Number)
    }

    /// Check if the identifier is a keyword, or a normal identifier.
    fn identifier_type(&self) -> Token {
        let mut chars = self.start.chars();

        match chars.next().unwrap_or('\0') {
            'f' => self.check_keyword("false", Token::False),
            'n' => self.check_keyword("none", Token::None),
            't' => self.check_keyword("true", Token::True),
            _ => Token::Identifier,
        }
    }

    /// Confirms that the current lexeme is the given keyword.
    fn check_keyword(&self, keyword_text: &'static str, keyword: Token) -> Token {
        let token_length = self.start.len() - self.current.len();
        let lexeme = &self.start[..token_length];

        if lexeme == keyword_text {
            keyword
        } else {
            Token::Identifier
        }
    }

    /// Returns a lexeme with [Token::Error] as its token.
    fn error_token(&self, message: &'a str) -> Lexeme<'a> {
        assert_ne!(self.start, self.current);
        Lexeme {
            token: Token::Error,
            text: message,
            line: self.line,
        }
    }

    /// Returns a [Lexeme] from the span between self.start and self.current with the given
    /// [Token].
    fn make_lexeme(&self, token: Token) -> Lexeme<'a> {
        assert!(self.current.len() <= self.start.len());
        let extent = self.start.len() - self.current.len();
        let text = &self.start[..extent];

        Lexeme {
            token,
            text,
            line: self.line,
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Lexeme<'a>;

    fn next(&mut self) -> Option<Lexeme<'a>> {
        Some(self.scan_token())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // This iterator is infinite.
        (usize::MAX, None)
    }
}

impl<'a> Lexeme<'a> {
    /// Return the line number this token was found on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Return the literal text of this token, or the diagnostic message for an error token.
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Return the [Token] of this lexeme.
    pub fn token(&self) -> Token {
        self.token
    }
}

///////////////////////////////////////////// Helpers /////////////////////////////////////////////

/// Returns true if this char can start an identifier or keyword.
fn is_id_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Returns true if this char can be used after the first character of an identifier or keyword.
fn is_id_continue(c: char) -> bool {
    is_id_start(c) || c.is_ascii_digit()
}

////////////////////////////////////////////// Tests //////////////////////////////////////////////

#[cfg(test)]
mod test {
    use super::*;

    fn tokens_of(source: &str) -> Vec<Token> {
        Scanner::new(source)
            .map(|lexeme| lexeme.token())
            .take_while(|&token| token != Token::Eof)
            .collect()
    }

    #[test]
    fn scanning_every_token() {
        use Token::*;

        let source_code = "(1 + 2.5) * -3 / soup
            true false none";

        #[rustfmt::skip]
        let expected_tokens = vec![
            LeftParen, Number, Plus, Number, RightParen, Star, Minus, Number, Slash, Identifier,
            True, False, None,
        ];

        assert_eq!(expected_tokens, tokens_of(source_code));
    }

    #[test]
    fn number_lexemes_keep_their_text() {
        let mut scanner = Scanner::new("12.25 7");
        let first = scanner.scan_token();
        assert_eq!(Token::Number, first.token());
        assert_eq!("12.25", first.text());

        let second = scanner.scan_token();
        assert_eq!(Token::Number, second.token());
        assert_eq!("7", second.text());
    }

    #[test]
    fn two_decimal_points_is_a_scan_error() {
        let mut scanner = Scanner::new("1.2.3");
        let lexeme = scanner.scan_token();
        assert_eq!(Token::Error, lexeme.token());
        assert_eq!("Too many decimal points in number", lexeme.text());
        assert_eq!(1, lexeme.line());
    }

    #[test]
    fn unexpected_bytes_produce_error_tokens_and_scanning_continues() {
        let mut scanner = Scanner::new("@ 1");
        let error = scanner.scan_token();
        assert_eq!(Token::Error, error.token());
        assert_eq!("Unexpected character", error.text());

        // The next token is still retrievable.
        assert_eq!(Token::Number, scanner.scan_token().token());
    }

    #[test]
    fn newlines_are_counted_even_inside_skipped_whitespace() {
        let source = "1 // trailing comment\n\n  +\n2";
        let mut scanner = Scanner::new(source);

        assert_eq!(1, scanner.scan_token().line());
        assert_eq!(3, scanner.scan_token().line()); // +
        assert_eq!(4, scanner.scan_token().line()); // 2
    }

    #[test]
    fn eof_repeats_forever() {
        let mut scanner = Scanner::new("");
        assert_eq!(Token::Eof, scanner.scan_token().token());
        assert_eq!(Token::Eof, scanner.scan_token().token());
        assert_eq!(Token::Eof, scanner.scan_token().token());
    }

    #[test]
    fn keyword_prefixes_are_identifiers() {
        use Token::*;
        assert_eq!(vec![Identifier, Identifier, Identifier], tokens_of("truely nones f"));
    }
}
