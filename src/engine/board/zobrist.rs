// https://www.chessprogramming.org/Zobrist_Hashing

use super::Board;
use crate::piece::{Piece, PieceColor};

use lazy_static::lazy_static;

const ZOBRIST_SEED: u64 = 784319246355081;

/// Index of the side-to-move key, right after the 64 x 16 piece keys.
const ZOBRIST_TURN: usize = 64 * 16;

lazy_static! {
    /// One key per square and piece nibble plus the side-to-move key.
    /// The seed is fixed so the table is identical across runs, which
    /// keeps packed-history comparisons valid after persistence.
    pub static ref ZOBRIST_KEYS: [u64; 64 * 16 + 1] = {
        fastrand::seed(ZOBRIST_SEED);
        [0; 64 * 16 + 1].map(|_| fastrand::u64(..))
    };
}

#[must_use]
#[inline(always)]
pub fn turn_key() -> u64 {
    ZOBRIST_KEYS[ZOBRIST_TURN]
}

impl Piece {
    #[must_use]
    #[inline(always)]
    pub fn get_hash(self, square: i32) -> u64 {
        assert!(!self.is_none());
        ZOBRIST_KEYS[(square as usize) * 16 + self.code()]
    }
}

impl Board {
    /// Computes the hash from scratch, independent of the incrementally
    /// maintained member. The two must agree at every ply.
    #[must_use]
    pub fn create_zobrist_hash(&self) -> u64 {
        let mut hash = 0u64;

        for square in 0..64 {
            let piece = self.get_piece(square);
            if !piece.is_none() {
                hash ^= piece.get_hash(square);
            }
        }

        if self.get_turn() == PieceColor::Black {
            hash ^= turn_key();
        }

        hash
    }
}
