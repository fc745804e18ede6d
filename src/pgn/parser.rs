use std::collections::HashMap;
use std::io::Read;

use thiserror::Error;
use tracing::{debug, warn};

use super::buffer::BufferedCharSource;
use super::lexer::{Lexer, LexicalError, Token, TokenKind};
use super::san;
use crate::chess_move::Move;
use crate::engine::board::fen::{FenError, STARTPOS_FEN};
use crate::engine::board::Board;

/// Fatal parser failures; everything else is recovered per game and
/// surfaced through [ParseDiagnostics].
#[derive(Debug, Error)]
pub enum PgnError {
    #[error("could not read the input: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a game was abandoned. Internal; games affected by these bump the
/// skipped counter and parsing resumes at the next termination.
#[derive(Debug, Error)]
enum GameError {
    #[error(transparent)]
    Lex(#[from] LexicalError),
    #[error("bad FEN tag: {0}")]
    Fen(#[from] FenError),
    #[error("unexpected {kind:?} token at offset {start}")]
    Unexpected { kind: TokenKind, start: u64 },
}

impl GameError {
    fn unexpected(token: &Token) -> Self {
        Self::Unexpected {
            kind: token.kind,
            start: token.start,
        }
    }
}

/// One fully assembled game record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedGame {
    pub tags: HashMap<String, String>,
    /// Set when a FEN tag re-seeded the starting position.
    pub starting_fen: Option<String>,
    /// The replayed moves, SAN already resolved against the engine.
    pub moves: Vec<Move>,
    /// `1-0`, `0-1`, `1/2-1/2` or `*`; empty when the input ended or the
    /// next game began before a termination showed up.
    pub termination: String,
    /// True when SAN resolution failed mid-game and the tail was
    /// dropped.
    pub truncated: bool,
}

/// Running totals across one parser instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseDiagnostics {
    /// Games abandoned wholesale (lexical/syntax/FEN trouble).
    pub skipped: u32,
    /// Games kept but cut short at an unresolvable SAN.
    pub truncated: u32,
}

/// Drives the lexer into [ParsedGame] records. Tag pairs are collected
/// first; a FEN tag re-seeds the board; move numbers, dots, annotation
/// glyphs and comments are discarded; each remaining symbol is resolved
/// as SAN and replayed. A termination closes the game, and consecutive
/// games continue from a fresh board.
pub struct PgnParser<R: Read> {
    lexer: Lexer<R>,
    board: Board,
    /// Skip move replay when the caller only wants tags plus FEN.
    pub ignore_move_list_if_fen: bool,
    skipped: u32,
    truncated: u32,
}

impl<R: Read> PgnParser<R> {
    /// Wraps a byte source. Failing to read the first chunk is the one
    /// fatal error of the parser.
    pub fn new(reader: R) -> Result<Self, PgnError> {
        Ok(Self {
            lexer: Lexer::new(BufferedCharSource::new(reader)?),
            board: Board::new(),
            ignore_move_list_if_fen: false,
            skipped: 0,
            truncated: 0,
        })
    }

    #[must_use]
    pub fn diagnostics(&self) -> ParseDiagnostics {
        ParseDiagnostics {
            skipped: self.skipped,
            truncated: self.truncated,
        }
    }

    /// The board the last game finished on.
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Parses the next game, recovering from broken ones by skipping to
    /// their termination. `None` once the input is exhausted.
    pub fn next_game(&mut self) -> Option<ParsedGame> {
        loop {
            match self.try_next_game() {
                Ok(game) => return game,
                Err(err) => {
                    self.skipped += 1;
                    let near = self.lexer.source().offset().saturating_sub(24);
                    warn!(
                        "skipping game ({err}) near: {}",
                        self.lexer.context(near, 24)
                    );
                    let _ = self.skim_to_termination();
                }
            }
        }
    }

    /// Every remaining game in the input.
    pub fn parse_all(&mut self) -> Vec<ParsedGame> {
        let mut games = vec![];
        while let Some(game) = self.next_game() {
            games.push(game);
        }
        games
    }

    fn try_next_game(&mut self) -> Result<Option<ParsedGame>, GameError> {
        let mut game = ParsedGame::default();
        self.board
            .parse_fen(STARTPOS_FEN)
            .expect("the standard start position parses");

        let mut token = self.lexer.get_token()?;
        if token.kind == TokenKind::Eof {
            return Ok(None);
        }

        // tag block
        while token.kind == TokenKind::OpenSBracket {
            let name = self.lexer.get_token()?;
            if name.kind != TokenKind::Symbol {
                return Err(GameError::unexpected(&name));
            }
            let value = self.lexer.get_token()?;
            if value.kind != TokenKind::String {
                return Err(GameError::unexpected(&value));
            }
            let close = self.lexer.get_token()?;
            if close.kind != TokenKind::CloseSBracket {
                return Err(GameError::unexpected(&close));
            }

            if name.text == "FEN" {
                self.board.parse_fen(&value.text)?;
                game.starting_fen = Some(value.text.clone());
            }
            game.tags.insert(name.text, value.text);

            token = self.lexer.get_token()?;
        }

        // move list
        let replay = !(self.ignore_move_list_if_fen && game.starting_fen.is_some());
        loop {
            match token.kind {
                // move numbers and ellipses carry no content
                TokenKind::Integer | TokenKind::Dot | TokenKind::Nag => {}
                TokenKind::Termination => {
                    game.termination = token.text;
                    return Ok(Some(game));
                }
                TokenKind::Eof => {
                    // input ended mid-game; close what we have
                    return Ok(Some(game));
                }
                TokenKind::OpenSBracket => {
                    // the next game's tag block starts; close this game
                    self.lexer.push_token(token);
                    return Ok(Some(game));
                }
                TokenKind::Symbol => {
                    if replay {
                        match san::resolve_san(&mut self.board, &token.text) {
                            Ok(m) => {
                                let _ = self.board.do_move(m);
                                game.moves.push(m);
                            }
                            Err(err) => {
                                self.truncated += 1;
                                game.truncated = true;
                                debug!("game truncated at '{}': {err}", token.text);
                                game.termination = self.skim_to_termination();
                                return Ok(Some(game));
                            }
                        }
                    }
                }
                TokenKind::String | TokenKind::UnknownToken | TokenKind::CloseSBracket => {
                    return Err(GameError::unexpected(&token));
                }
                TokenKind::Comment => unreachable!("comments never leave the lexer"),
            }
            token = self.lexer.get_token()?;
        }
    }

    /// Reads forward to the next termination (or the end of input) so
    /// the following game stays parseable. Lexical trouble on the way
    /// is swallowed, the lexer always makes progress.
    fn skim_to_termination(&mut self) -> String {
        loop {
            match self.lexer.get_token() {
                Ok(token) if token.kind == TokenKind::Termination => return token.text,
                Ok(token) if token.kind == TokenKind::Eof => return String::new(),
                Ok(_) | Err(_) => {}
            }
        }
    }
}
