use const_for::const_for;
use lazy_static::lazy_static;

// Deltas are (column, row) steps; the column axis runs h -> a, which is
// symmetric, so the usual compass deltas work unchanged.
const KNIGHT_DELTAS: [(i32, i32); 8] = [
    (-2, -1), (-2, 1), (-1, -2), (-1, 2),
    (1, -2), (1, 2), (2, -1), (2, 1),
];

const KING_DELTAS: [(i32, i32); 8] = [
    (-1, -1), (-1, 0), (-1, 1), (0, -1),
    (0, 1), (1, -1), (1, 0), (1, 1),
];

const BISHOP_DELTAS: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
const ROOK_DELTAS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Knight destinations for every square, -1 terminated.
pub const KNIGHT_MOVES: [[i32; 9]; 64] = {
    let mut map = [[-1i32; 9]; 64];
    const_for!(square in 0..64 => {
        let col = square & 7;
        let row = square >> 3;
        let mut n = 0;
        const_for!(d in 0..8 => {
            let c = col + KNIGHT_DELTAS[d].0;
            let r = row + KNIGHT_DELTAS[d].1;
            if c >= 0 && c < 8 && r >= 0 && r < 8 {
                map[square as usize][n] = r * 8 + c;
                n += 1;
            }
        });
    });
    map
};

/// King destinations for every square, -1 terminated.
pub const KING_MOVES: [[i32; 9]; 64] = {
    let mut map = [[-1i32; 9]; 64];
    const_for!(square in 0..64 => {
        let col = square & 7;
        let row = square >> 3;
        let mut n = 0;
        const_for!(d in 0..8 => {
            let c = col + KING_DELTAS[d].0;
            let r = row + KING_DELTAS[d].1;
            if c >= 0 && c < 8 && r >= 0 && r < 8 {
                map[square as usize][n] = r * 8 + c;
                n += 1;
            }
        });
    });
    map
};

/// For every target square, the squares a white pawn could capture onto
/// it from (one row below, adjacent columns). -1 terminated.
pub const WHITE_PAWN_ORIGINS: [[i32; 3]; 64] = {
    let mut map = [[-1i32; 3]; 64];
    const_for!(square in 0..64 => {
        let col = square & 7;
        let row = square >> 3;
        let mut n = 0;
        const_for!(dc in 0..2 => {
            let c = col + (dc * 2 - 1);
            let r = row - 1;
            if c >= 0 && c < 8 && r >= 0 {
                map[square as usize][n] = r * 8 + c;
                n += 1;
            }
        });
    });
    map
};

/// For every target square, the squares a black pawn could capture onto
/// it from (one row above, adjacent columns). -1 terminated.
pub const BLACK_PAWN_ORIGINS: [[i32; 3]; 64] = {
    let mut map = [[-1i32; 3]; 64];
    const_for!(square in 0..64 => {
        let col = square & 7;
        let row = square >> 3;
        let mut n = 0;
        const_for!(dc in 0..2 => {
            let c = col + (dc * 2 - 1);
            let r = row + 1;
            if c >= 0 && c < 8 && r < 8 {
                map[square as usize][n] = r * 8 + c;
                n += 1;
            }
        });
    });
    map
};

/// The sliding-piece rays of one square, bundled per direction so a scan
/// can stop at the first occupied square.
#[derive(Debug)]
pub struct SquareRays {
    pub bishop: Vec<Vec<i32>>,
    pub rook: Vec<Vec<i32>>,
    pub queen: Vec<Vec<i32>>,
}

#[derive(Debug)]
pub struct MoveTables {
    rays: Vec<SquareRays>,
}

impl MoveTables {
    /// Walks each delta from `square`, collecting squares until the walk
    /// leaves the 8x8 grid. With `can_repeat` false each direction holds
    /// at most one square.
    fn walk_directions(square: i32, deltas: &[(i32, i32)], can_repeat: bool) -> Vec<Vec<i32>> {
        let mut directions = vec![];
        for &(dc, dr) in deltas {
            let mut ray = vec![];
            let mut col = (square & 7) + dc;
            let mut row = (square >> 3) + dr;
            while (0..8).contains(&col) && (0..8).contains(&row) {
                ray.push(row * 8 + col);
                if !can_repeat {
                    break;
                }
                col += dc;
                row += dr;
            }
            if !ray.is_empty() {
                directions.push(ray);
            }
        }
        directions
    }

    fn build() -> Self {
        let mut rays = Vec::with_capacity(64);
        for square in 0..64 {
            let bishop = Self::walk_directions(square, &BISHOP_DELTAS, true);
            let rook = Self::walk_directions(square, &ROOK_DELTAS, true);
            let mut queen = Vec::with_capacity(bishop.len() + rook.len());
            queen.extend(bishop.iter().cloned());
            queen.extend(rook.iter().cloned());
            rays.push(SquareRays { bishop, rook, queen });
        }
        Self { rays }
    }

    #[must_use]
    #[inline(always)]
    pub fn rays(&self, square: i32) -> &SquareRays {
        &self.rays[square as usize]
    }
}

lazy_static! {
    /// Built once, read-only afterwards, shared by every board.
    pub static ref MOVE_TABLES: MoveTables = MoveTables::build();
}
