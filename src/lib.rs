#![allow(clippy::inline_always)]

#![doc = include_str!("../README.md")]

mod engine;

mod board_helper;
pub use board_helper::*;

mod piece;
pub use piece::*;

mod chess_move;
pub use chess_move::*;

mod tables;

pub mod pgn;

pub mod prelude {
    pub use super::board_helper::*;
    pub use super::engine::board::*;
    pub use super::engine::board::fen::*;
    pub use super::engine::board::history::*;
    pub use super::engine::board::movegen::*;
    pub use super::chess_move::*;
    pub use super::piece::*;
    pub use super::pgn::buffer::*;
    pub use super::pgn::lexer::*;
    pub use super::pgn::parser::*;
    pub use super::pgn::san::*;
}
