use super::Board;

use thiserror::Error;

use crate::board_helper::BoardHelper;
use crate::piece::{Piece, PieceColor, PieceKind};

#[allow(dead_code)]
pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
#[allow(dead_code)]
pub const STARTPOS_FEN_BLACK: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("no white king on the board")]
    NoWhiteKing,
    #[error("no black king on the board")]
    NoBlackKing,
    #[error("a side has more than one king")]
    DuplicateKing,
    #[error("the side not on move is in check")]
    OpponentInCheck,
    #[error("unexpected character {0:?} in the board field")]
    InvalidChar(char),
    #[error("side to move must be 'w' or 'b'")]
    InvalidSideToMove,
    #[error("malformed en-passant square")]
    InvalidEnPassant,
}

impl Board {
    pub fn parse_fen(&mut self, fen_whole: &str) -> Result<(), FenError> {
        let mut args: Vec<&str> = fen_whole.split_whitespace().rev().collect();

        self.clear();

        // Parse position
        if let Some(fen_position) = args.pop() {
            let mut col = 7i32; // the a-file is column 7
            let mut row = 7i32;

            for ch in fen_position.chars() {
                if ch == '/' {
                    row -= 1;
                    col = 7;
                    continue;
                }
                if ch.is_ascii_digit() {
                    col -= ch.to_digit(10).unwrap() as i32;
                    continue;
                }

                let piece = Piece::from_char(ch);
                if piece.is_none() || !(0..8).contains(&col) || !(0..8).contains(&row) {
                    self.clear();
                    return Err(FenError::InvalidChar(ch));
                }
                let _ = self.set_piece(row * 8 + col, piece);
                col -= 1;
            }
        }

        // Parse turn
        if let Some(fen_turn) = args.pop() {
            match fen_turn {
                "w" => self.set_turn(PieceColor::White),
                "b" => self.set_turn(PieceColor::Black),
                _ => {
                    self.clear();
                    return Err(FenError::InvalidSideToMove);
                }
            }
        }

        // Parse castling rights; a missing right is recorded as a spent
        // rook move so the counters keep carrying the state.
        if let Some(castling) = args.pop() {
            self.kill_castling_right(0, !castling.contains('K'));
            self.kill_castling_right(1, !castling.contains('Q'));
            self.kill_castling_right(2, !castling.contains('k'));
            self.kill_castling_right(3, !castling.contains('q'));
        }

        // Parse en passant square
        if let Some(en_passant) = args.pop() {
            if en_passant != "-" {
                let square = BoardHelper::square_id_from_pgn(en_passant);
                if square == -1 {
                    self.clear();
                    return Err(FenError::InvalidEnPassant);
                }
                self.set_ep_target(square);
            }
        }

        // Parse half move clock
        let mut half_move = 0u16;
        if let Some(text) = args.pop() {
            if let Ok(parsed) = text.parse::<u16>() {
                half_move = parsed;
            }
        }

        // Parse full move number
        if let Some(text) = args.pop() {
            if let Ok(parsed) = text.parse::<u16>() {
                self.set_full_move(parsed);
            }
        }

        // Error checking
        match self.count(PieceKind::King, PieceColor::White) {
            0 => {
                self.clear();
                return Err(FenError::NoWhiteKing);
            }
            1 => {}
            _ => {
                self.clear();
                return Err(FenError::DuplicateKing);
            }
        }
        match self.count(PieceKind::King, PieceColor::Black) {
            0 => {
                self.clear();
                return Err(FenError::NoBlackKing);
            }
            1 => {}
            _ => {
                self.clear();
                return Err(FenError::DuplicateKing);
            }
        }

        if self.is_in_check(self.get_turn().flipped()) {
            self.clear();
            return Err(FenError::OpponentInCheck);
        }

        self.seal_position(half_move);
        Ok(())
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();

        let mut empty_counter = 0u8;

        // Board, eight ranks top-to-bottom, the a-file first
        for row in (0..8).rev() {
            for col in (0..8).rev() {
                let piece = self.get_piece(row * 8 + col);

                if piece.is_none() {
                    empty_counter += 1;
                } else {
                    if empty_counter != 0 {
                        fen.push((b'0' + empty_counter) as char);
                        empty_counter = 0;
                    }
                    fen.push(piece.to_char());
                }
            }
            if empty_counter != 0 {
                fen.push((b'0' + empty_counter) as char);
                empty_counter = 0;
            }
            fen.push('/');
        }
        fen.pop().unwrap(); // pop last '/'

        // Turn
        fen.push(' ');
        fen.push(if self.get_turn() == PieceColor::White { 'w' } else { 'b' });

        // Castling rights
        fen.push(' ');
        let (wk, wq) = self.castling_rights(PieceColor::White);
        let (bk, bq) = self.castling_rights(PieceColor::Black);
        if wk || wq || bk || bq {
            if wk { fen.push('K'); }
            if wq { fen.push('Q'); }
            if bk { fen.push('k'); }
            if bq { fen.push('q'); }
        } else {
            fen.push('-');
        }

        // En passant square
        fen.push(' ');
        if self.get_ep_target() != 0 {
            let (file, rank) = BoardHelper::square_to_chars(self.get_ep_target());
            fen.push(file);
            fen.push(rank);
        } else {
            fen.push('-');
        }

        // Half & full move counters
        fen.push(' ');
        fen.push_str(&self.get_half_move().to_string());
        fen.push(' ');
        fen.push_str(&self.get_full_move().to_string());

        fen
    }
}
