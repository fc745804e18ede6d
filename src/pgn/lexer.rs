use std::io::Read;

use thiserror::Error;

use super::buffer::BufferedCharSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Integer,
    String,
    Symbol,
    Dot,
    Nag,
    OpenSBracket,
    CloseSBracket,
    Termination,
    UnknownToken,
    Comment,
    Eof,
}

/// One lexical unit: kind, position, and the integer/text payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Absolute byte offset of the first character.
    pub start: u64,
    /// Byte length of the consumed text.
    pub size: u32,
    /// Decimal value for [TokenKind::Integer] and [TokenKind::Nag].
    pub value: i64,
    /// Payload for string, symbol, termination and unknown tokens.
    pub text: String,
}

impl Token {
    fn simple(kind: TokenKind, start: u64, size: u32) -> Self {
        Self {
            kind,
            start,
            size,
            value: 0,
            text: String::new(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexicalError {
    #[error("numeric annotation glyph without digits at offset {0}")]
    InvalidNag(u64),
    #[error("string starting at offset {0} is not terminated")]
    UnterminatedString(u64),
    #[error("no newline allowed inside the string starting at offset {0}")]
    NewLineInString(u64),
    #[error("unexpected '/' in the symbol at offset {0}")]
    UnexpectedSlash(u64),
    #[error("unexpected character {1:?} at offset {0}")]
    UnknownChar(u64, char),
}

const fn is_symbol_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(byte, b'_' | b'+' | b'#' | b'=' | b':' | b'-' | b'/')
}

/// Produces tokens on demand over a [BufferedCharSource]. Supports one
/// pushed-back token; pushing a second is a programmer error.
pub struct Lexer<R: Read> {
    source: BufferedCharSource<R>,
    pushed_token: Option<Token>,
}

impl<R: Read> Lexer<R> {
    #[must_use]
    pub fn new(source: BufferedCharSource<R>) -> Self {
        Self {
            source,
            pushed_token: None,
        }
    }

    #[must_use]
    pub fn source(&self) -> &BufferedCharSource<R> {
        &self.source
    }

    /// Quotes up to `length` bytes of already-read input around `start`,
    /// for error context.
    #[must_use]
    pub fn context(&self, start: u64, length: usize) -> String {
        self.source.slice(start, length)
    }

    /// The next token, honoring a pushed-back one first. Comments and
    /// variations are consumed internally and never surface here.
    pub fn get_token(&mut self) -> Result<Token, LexicalError> {
        if let Some(token) = self.pushed_token.take() {
            return Ok(token);
        }
        loop {
            let token = self.scan_token()?;
            if token.kind != TokenKind::Comment {
                return Ok(token);
            }
        }
    }

    /// Stores one token for the next [Self::get_token] call.
    ///
    /// # Panics
    /// When a token is already pushed back.
    pub fn push_token(&mut self, token: Token) {
        assert!(self.pushed_token.is_none(), "double token push-back");
        self.pushed_token = Some(token);
    }

    /// Consumes blanks and line comments, returning the first
    /// significant byte. A ';' opens a rest-of-line comment; a '%' does
    /// the same only in the first column. Both are handled down here at
    /// the character level, invisible to the token layer.
    fn skip_blanks(&mut self) -> u8 {
        loop {
            let at_line_start = self.source.is_first_char_in_line();
            let byte = self.source.get();
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' => continue,
                b';' => self.skip_line(),
                b'%' if at_line_start => self.skip_line(),
                _ => return byte,
            }
        }
    }

    fn skip_line(&mut self) {
        loop {
            match self.source.get() {
                0 | b'\r' | b'\n' => return,
                _ => {}
            }
        }
    }

    fn scan_token(&mut self) -> Result<Token, LexicalError> {
        let byte = self.skip_blanks();
        if byte == 0 {
            return Ok(Token::simple(TokenKind::Eof, self.source.offset(), 0));
        }
        let start = self.source.offset() - 1;

        match byte {
            b'"' => self.scan_string(start),
            b'.' => {
                // a run of dots folds into one token; the ellipsis
                // before a black move reads the same as a single dot
                loop {
                    let byte = self.source.get();
                    if byte == b'.' {
                        continue;
                    }
                    if byte != 0 {
                        self.source.push_back(byte);
                    }
                    break;
                }
                Ok(Token::simple(TokenKind::Dot, start, (self.source.offset() - start) as u32))
            }
            b'$' => self.scan_nag(start),
            b'[' => Ok(Token::simple(TokenKind::OpenSBracket, start, 1)),
            b']' => Ok(Token::simple(TokenKind::CloseSBracket, start, 1)),
            b'{' => self.scan_brace_comment(start),
            b'(' => self.scan_variation(start),
            b'*' => Ok(Token {
                kind: TokenKind::Termination,
                start,
                size: 1,
                value: 0,
                text: String::from("*"),
            }),
            b'-' => {
                // stray dash: hand the whole dash-led symbol back as an
                // unknown token
                let text = self.read_symbol_text(byte);
                Ok(Token {
                    kind: TokenKind::UnknownToken,
                    start,
                    size: (self.source.offset() - start) as u32,
                    value: 0,
                    text,
                })
            }
            b if b.is_ascii_alphanumeric() => self.scan_symbol(start, b),
            b => Err(LexicalError::UnknownChar(start, b as char)),
        }
    }

    fn scan_string(&mut self, start: u64) -> Result<Token, LexicalError> {
        let mut bytes = vec![];
        loop {
            match self.source.get() {
                0 => return Err(LexicalError::UnterminatedString(start)),
                b'\r' => return Err(LexicalError::NewLineInString(start)),
                b'"' => break,
                b'\\' => match self.source.get() {
                    0 => return Err(LexicalError::UnterminatedString(start)),
                    b'\r' => return Err(LexicalError::NewLineInString(start)),
                    b'"' => bytes.push(b'"'),
                    escaped => {
                        bytes.push(b'\\');
                        bytes.push(escaped);
                    }
                },
                byte => bytes.push(byte),
            }
        }
        Ok(Token {
            kind: TokenKind::String,
            start,
            size: (self.source.offset() - start) as u32,
            value: 0,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    fn scan_nag(&mut self, start: u64) -> Result<Token, LexicalError> {
        let mut value: i64 = 0;
        let mut digits = 0;
        loop {
            let byte = self.source.get();
            if byte.is_ascii_digit() {
                value = value * 10 + i64::from(byte - b'0');
                digits += 1;
                continue;
            }
            if byte != 0 {
                self.source.push_back(byte);
            }
            break;
        }
        if digits == 0 {
            return Err(LexicalError::InvalidNag(start));
        }
        Ok(Token {
            kind: TokenKind::Nag,
            start,
            size: (self.source.offset() - start) as u32,
            value,
            text: String::new(),
        })
    }

    fn scan_brace_comment(&mut self, start: u64) -> Result<Token, LexicalError> {
        let mut bytes = vec![];
        loop {
            match self.source.get() {
                0 | b'}' => break,
                byte => bytes.push(byte),
            }
        }
        Ok(Token {
            kind: TokenKind::Comment,
            start,
            size: (self.source.offset() - start) as u32,
            value: 0,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// A parenthesized variation is a comment to this parser. Nesting is
    /// balanced and brace comments inside may hide parentheses.
    fn scan_variation(&mut self, start: u64) -> Result<Token, LexicalError> {
        let mut depth = 1;
        while depth > 0 {
            match self.source.get() {
                0 => break,
                b'(' => depth += 1,
                b')' => depth -= 1,
                b'{' => loop {
                    match self.source.get() {
                        0 | b'}' => break,
                        _ => {}
                    }
                },
                _ => {}
            }
        }
        Ok(Token::simple(TokenKind::Comment, start, (self.source.offset() - start) as u32))
    }

    fn read_symbol_text(&mut self, first: u8) -> String {
        let mut bytes = vec![first];
        loop {
            let byte = self.source.get();
            if byte == 0 {
                break;
            }
            if !is_symbol_char(byte) {
                self.source.push_back(byte);
                break;
            }
            bytes.push(byte);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn scan_symbol(&mut self, start: u64, first: u8) -> Result<Token, LexicalError> {
        let mut bytes = vec![first];
        let mut all_digits = first.is_ascii_digit();
        let mut has_slash = false;
        loop {
            let byte = self.source.get();
            if byte == 0 {
                break;
            }
            if !is_symbol_char(byte) {
                self.source.push_back(byte);
                break;
            }
            all_digits &= byte.is_ascii_digit();
            has_slash |= byte == b'/';
            bytes.push(byte);
        }

        let size = (self.source.offset() - start) as u32;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        if all_digits {
            return Ok(Token {
                kind: TokenKind::Integer,
                start,
                size,
                value: text.parse::<i64>().unwrap_or(i64::MAX),
                text,
            });
        }
        if text == "1-0" || text == "0-1" || text == "1/2-1/2" {
            return Ok(Token {
                kind: TokenKind::Termination,
                start,
                size,
                value: 0,
                text,
            });
        }
        if has_slash {
            return Err(LexicalError::UnexpectedSlash(start));
        }
        Ok(Token {
            kind: TokenKind::Symbol,
            start,
            size,
            value: 0,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexer_of(text: &str) -> Lexer<&[u8]> {
        Lexer::new(BufferedCharSource::new(text.as_bytes()).expect("readable"))
    }

    fn kinds_of(text: &str) -> Vec<TokenKind> {
        let mut lexer = lexer_of(text);
        let mut kinds = vec![];
        loop {
            let token = lexer.get_token().expect("lexes");
            if token.kind == TokenKind::Eof {
                return kinds;
            }
            kinds.push(token.kind);
        }
    }

    #[test]
    fn test_lexer_tag_pair_tokens() {
        let mut lexer = lexer_of("[Event \"F/S Return Match\"]");
        assert_eq!(lexer.get_token().unwrap().kind, TokenKind::OpenSBracket);

        let name = lexer.get_token().unwrap();
        assert_eq!(name.kind, TokenKind::Symbol);
        assert_eq!(name.text, "Event");

        let value = lexer.get_token().unwrap();
        assert_eq!(value.kind, TokenKind::String);
        assert_eq!(value.text, "F/S Return Match");

        assert_eq!(lexer.get_token().unwrap().kind, TokenKind::CloseSBracket);
        assert_eq!(lexer.get_token().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_lexer_string_escapes() {
        let mut lexer = lexer_of("\"he said \\\"hi\\\" to\\day\"");
        let token = lexer.get_token().unwrap();
        assert_eq!(token.kind, TokenKind::String);
        assert_eq!(token.text, "he said \"hi\" to\\day");
    }

    #[test]
    fn test_lexer_move_list_tokens() {
        let kinds = kinds_of("1.e4 e5 2.Nf3 Nc6 *");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Integer,
                TokenKind::Dot,
                TokenKind::Symbol,
                TokenKind::Symbol,
                TokenKind::Integer,
                TokenKind::Dot,
                TokenKind::Symbol,
                TokenKind::Symbol,
                TokenKind::Termination,
            ]
        );
    }

    #[test]
    fn test_lexer_dot_run_folds() {
        let mut lexer = lexer_of("1... e5");
        assert_eq!(lexer.get_token().unwrap().kind, TokenKind::Integer);
        let dots = lexer.get_token().unwrap();
        assert_eq!(dots.kind, TokenKind::Dot);
        assert_eq!(dots.size, 3);
        assert_eq!(lexer.get_token().unwrap().kind, TokenKind::Symbol);
    }

    #[test]
    fn test_lexer_integer_value() {
        let mut lexer = lexer_of("42 e4");
        let token = lexer.get_token().unwrap();
        assert_eq!(token.kind, TokenKind::Integer);
        assert_eq!(token.value, 42);
    }

    #[test]
    fn test_lexer_nag() {
        let mut lexer = lexer_of("$14");
        let token = lexer.get_token().unwrap();
        assert_eq!(token.kind, TokenKind::Nag);
        assert_eq!(token.value, 14);

        let mut lexer = lexer_of("$x");
        assert_eq!(lexer.get_token(), Err(LexicalError::InvalidNag(0)));
    }

    #[test]
    fn test_lexer_terminations() {
        for text in ["1-0", "0-1", "1/2-1/2", "*"] {
            let mut lexer = lexer_of(text);
            let token = lexer.get_token().unwrap();
            assert_eq!(token.kind, TokenKind::Termination, "for {text}");
            assert_eq!(token.text, text);
        }
    }

    #[test]
    fn test_lexer_stray_slash_rejected() {
        let mut lexer = lexer_of("1/2-0");
        assert_eq!(lexer.get_token(), Err(LexicalError::UnexpectedSlash(0)));
    }

    #[test]
    fn test_lexer_brace_comment_invisible() {
        let kinds = kinds_of("e4 {a fine move} e5");
        assert_eq!(kinds, vec![TokenKind::Symbol, TokenKind::Symbol]);
    }

    #[test]
    fn test_lexer_variation_invisible_and_balanced() {
        let kinds = kinds_of("d5 (1...Nf6 2.c4 (2.g3 {with (fianchetto)})) c4");
        assert_eq!(kinds, vec![TokenKind::Symbol, TokenKind::Symbol]);
    }

    #[test]
    fn test_lexer_line_comments() {
        // ';' cuts the rest of the line anywhere, '%' only in column 0
        let kinds = kinds_of("e4 ; the king's pawn\ne5\r\n% escape line [junk\nNf3");
        assert_eq!(kinds, vec![TokenKind::Symbol, TokenKind::Symbol, TokenKind::Symbol]);
    }

    #[test]
    fn test_lexer_percent_mid_line_is_error() {
        let mut lexer = lexer_of("e4 % not a comment");
        assert_eq!(lexer.get_token().unwrap().kind, TokenKind::Symbol);
        assert!(matches!(lexer.get_token(), Err(LexicalError::UnknownChar(_, '%'))));
    }

    #[test]
    fn test_lexer_unterminated_string() {
        let mut lexer = lexer_of("\"no end");
        assert_eq!(lexer.get_token(), Err(LexicalError::UnterminatedString(0)));

        let mut lexer = lexer_of("\"line\rbreak\"");
        assert_eq!(lexer.get_token(), Err(LexicalError::NewLineInString(0)));
    }

    #[test]
    fn test_lexer_unknown_dash_token() {
        let mut lexer = lexer_of("-- e4");
        let token = lexer.get_token().unwrap();
        assert_eq!(token.kind, TokenKind::UnknownToken);
        assert_eq!(token.text, "--");
    }

    #[test]
    fn test_lexer_unknown_char() {
        let mut lexer = lexer_of("!");
        assert!(matches!(lexer.get_token(), Err(LexicalError::UnknownChar(0, '!'))));
    }

    #[test]
    fn test_lexer_push_token_round_trip() {
        let mut lexer = lexer_of("e4 e5");
        let first = lexer.get_token().unwrap();
        lexer.push_token(first.clone());
        let again = lexer.get_token().unwrap();
        assert_eq!(first, again);
        assert_eq!(lexer.get_token().unwrap().text, "e5");
    }

    #[test]
    #[should_panic(expected = "double token push-back")]
    fn test_lexer_double_push_token_panics() {
        let mut lexer = lexer_of("e4 e5");
        let first = lexer.get_token().unwrap();
        lexer.push_token(first.clone());
        lexer.push_token(first);
    }

    #[test]
    fn test_lexer_token_positions() {
        let mut lexer = lexer_of("  e4 {x} e5");
        let first = lexer.get_token().unwrap();
        assert_eq!(first.start, 2);
        assert_eq!(first.size, 2);
        let second = lexer.get_token().unwrap();
        assert_eq!(second.start, 9);
        assert_eq!(second.size, 2);
    }
}
