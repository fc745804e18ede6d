pub mod fen;
pub mod history;
pub mod movegen;
pub mod zobrist;

use history::{MoveHistory, RepeatResult};

use crate::board_helper::{BoardHelper, Square};
use crate::chess_move::{Move, MoveKind, ReversibleMove};
use crate::piece::{Piece, PieceColor, PieceKind, EMPTY};

/// White rook home corners are index 0 (h1) and 1 (a1), black are
/// index 2 (h8) and 3 (a8).
const ROOK_HOMES: [i32; 4] = [Square::H1 as i32, Square::A1 as i32, Square::H8 as i32, Square::A8 as i32];
const KING_HOMES: [i32; 2] = [Square::E1 as i32, Square::E8 as i32];

#[derive(Clone, Debug)]
pub struct Board {
    // Board representation
    board: [Piece; 64],
    /// Piece counts per nibble code, kept for insufficient-material tests.
    piece_counts: [u8; 16],
    king_square: [i32; 2],

    // flags
    turn: PieceColor,
    /// How often each king has left its home square. Zero keeps the
    /// castling right alive.
    king_move_count: [u16; 2],
    /// Same, per rook home corner (see [ROOK_HOMES]).
    rook_move_count: [u16; 4],
    castled: [bool; 2],
    /// The square behind a pawn that just advanced two ranks, 0 if none.
    ep_target: i32,
    ep_stack: Vec<i32>,
    full_move: u16,
    pub zobrist_hash: u64,
    design_mode: bool,

    history: MoveHistory,
    undo_stack: Vec<ReversibleMove>,
}

impl PartialEq for Board {
    /// The undo stack and history list are deliberately left out; two
    /// boards are equal when they describe the same position.
    fn eq(&self, other: &Self) -> bool {
        self.board == other.board
            && self.piece_counts == other.piece_counts
            && self.king_square == other.king_square
            && self.turn == other.turn
            && self.king_move_count == other.king_move_count
            && self.rook_move_count == other.rook_move_count
            && self.castled == other.castled
            && self.ep_target == other.ep_target
            && self.full_move == other.full_move
            && self.zobrist_hash == other.zobrist_hash
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut str = String::from("");

        str.push_str("   a b c d e f g h\n");
        for row in (0..8).rev() {
            str.push_str((row + 1).to_string().as_str());
            str.push(' ');
            str.push('|');
            // column 7 is the a-file
            for col in (0..8).rev() {
                let piece = self.get_piece(row * 8 + col);
                str.push(piece.to_char());
                str.push('|');
            }
            str.push(' ');
            str.push_str((row + 1).to_string().as_str());
            str.push('\n');
        }
        str.push_str("   a b c d e f g h\n\n");

        str.push_str(format!("turn: {:?}\n", self.turn).as_str());
        str.push_str(format!("is in check: {}\n", self.is_in_check(self.turn)).as_str());
        let ep_text = if self.ep_target != 0 {
            BoardHelper::square_to_string(self.ep_target)
        } else {
            String::from("-")
        };
        str.push_str(format!("ep_target: {} {}\n", self.ep_target, ep_text).as_str());
        str.push_str(format!("half move: {}\n", self.history.fifty_counter()).as_str());
        str.push_str(format!("full move: {}\n", self.full_move).as_str());
        str.push_str(format!("zobrist: {}\n", self.zobrist_hash).as_str());

        formatter.pad(str.as_str())
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    #[must_use]
    pub fn new() -> Self {
        let mut x = Self {
            board: [EMPTY; 64],
            piece_counts: [0; 16],
            king_square: [-1; 2],

            turn: PieceColor::White,
            king_move_count: [0; 2],
            rook_move_count: [0; 4],
            castled: [false; 2],
            ep_target: 0,
            ep_stack: vec![],
            full_move: 1,
            zobrist_hash: 0,
            design_mode: false,

            history: MoveHistory::new(),
            undo_stack: vec![],
        };
        x.clear();
        x
    }

    pub fn clear(&mut self) {
        self.board = [EMPTY; 64];
        self.piece_counts = [0; 16];
        self.piece_counts[0] = 64;
        self.king_square = [-1; 2];

        self.turn = PieceColor::White;
        self.king_move_count = [0; 2];
        self.rook_move_count = [0; 4];
        self.castled = [false; 2];
        self.ep_target = 0;
        self.ep_stack.clear();
        self.full_move = 1;
        self.zobrist_hash = 0;

        self.undo_stack.clear();
        self.history.reset(self.pack_board(), 0, 0);
    }

    /// Opens design mode: the one-king-per-side invariant is suspended
    /// while the caller edits the position.
    pub fn open_design_mode(&mut self) {
        self.design_mode = true;
    }

    /// Leaves design mode. Fails when a side does not have exactly one
    /// king; the board stays in design mode in that case.
    pub fn close_design_mode(&mut self) -> bool {
        if self.count(PieceKind::King, PieceColor::White) != 1
            || self.count(PieceKind::King, PieceColor::Black) != 1
        {
            return false;
        }
        self.design_mode = false;
        self.seal_position(0);
        true
    }

    #[must_use]
    #[inline(always)]
    pub const fn is_design_mode(&self) -> bool {
        self.design_mode
    }

    /// Places `piece` and returns the piece that was on the square
    /// before. Counts, king cache, zobrist and the in-flight history
    /// snapshot all follow from here.
    #[must_use]
    pub fn set_piece(&mut self, square: i32, piece: Piece) -> Piece {
        let displaced = self.board[square as usize];
        if !displaced.is_none() {
            self.zobrist_hash ^= displaced.get_hash(square);
            if displaced.kind() == PieceKind::King {
                self.king_square[displaced.color() as usize] = -1;
            }
        }
        self.piece_counts[displaced.code()] -= 1;

        self.board[square as usize] = piece;
        self.piece_counts[piece.code()] += 1;
        if !piece.is_none() {
            self.zobrist_hash ^= piece.get_hash(square);
            if piece.kind() == PieceKind::King {
                self.king_square[piece.color() as usize] = square;
            }
        }

        self.history.update_current_piece(square, piece);
        displaced
    }

    #[must_use]
    #[inline(always)]
    pub const fn get_piece(&self, square: i32) -> Piece {
        self.board[square as usize]
    }

    #[inline(always)]
    pub fn set_turn(&mut self, turn: PieceColor) {
        self.turn = turn;
    }

    #[must_use]
    #[inline(always)]
    pub const fn get_turn(&self) -> PieceColor {
        self.turn
    }

    #[must_use]
    #[inline(always)]
    pub const fn get_king_square(&self, color: PieceColor) -> i32 {
        self.king_square[color as usize]
    }

    #[must_use]
    #[inline(always)]
    pub const fn get_ep_target(&self) -> i32 {
        self.ep_target
    }

    #[must_use]
    #[inline(always)]
    pub const fn get_full_move(&self) -> u16 {
        self.full_move
    }

    #[must_use]
    #[inline(always)]
    pub fn get_half_move(&self) -> u16 {
        self.history.fifty_counter()
    }

    #[must_use]
    #[inline(always)]
    pub const fn count(&self, kind: PieceKind, color: PieceColor) -> u8 {
        self.piece_counts[Piece::new(kind, color).code()]
    }

    #[must_use]
    #[inline(always)]
    pub fn history(&self) -> &MoveHistory {
        &self.history
    }

    /// Both castling rights of `color`, kingside first.
    #[must_use]
    pub fn castling_rights(&self, color: PieceColor) -> (bool, bool) {
        let base = color as usize * 2;
        let king_ok = !self.castled[color as usize]
            && self.king_move_count[color as usize] == 0
            && self.king_square[color as usize] == KING_HOMES[color as usize];
        let rook = Piece::new(PieceKind::Rook, color);
        let kingside = king_ok
            && self.rook_move_count[base] == 0
            && self.board[ROOK_HOMES[base] as usize] == rook;
        let queenside = king_ok
            && self.rook_move_count[base + 1] == 0
            && self.board[ROOK_HOMES[base + 1] as usize] == rook;
        (kingside, queenside)
    }

    /// Castling and en-passant state packed into one mask: castling
    /// rights in bits 0-3, en-passant column + 1 in bits 4-7.
    #[must_use]
    pub fn board_extra_info(&self) -> u32 {
        let mut extra = 0u32;
        let (wk, wq) = self.castling_rights(PieceColor::White);
        let (bk, bq) = self.castling_rights(PieceColor::Black);
        extra |= wk as u32;
        extra |= (wq as u32) << 1;
        extra |= (bk as u32) << 2;
        extra |= (bq as u32) << 3;
        if self.ep_target != 0 {
            extra |= ((BoardHelper::get_col(self.ep_target) + 1) as u32) << 4;
        }
        extra
    }

    /// How often the current position occurred before, shifted into the
    /// repetition bits of the extra-info mask. Kept separate from
    /// [Self::board_extra_info] so callers pick what they need.
    #[must_use]
    pub fn repetition_extra_info(&self) -> u32 {
        (self.history.same_board_count(self.zobrist_hash) as u32) << 8
    }

    #[must_use]
    pub fn pack_board(&self) -> history::PackedBoard {
        let mut packed = history::PackedBoard::default();
        for square in 0..64 {
            packed.set_piece(square, self.board[square as usize]);
        }
        packed
    }

    /// Neither side can mate when no pawn, rook or queen remains and at
    /// most one minor piece is on the board.
    #[must_use]
    pub fn is_insufficient_material(&self) -> bool {
        for color in [PieceColor::White, PieceColor::Black] {
            if self.count(PieceKind::Pawn, color) != 0
                || self.count(PieceKind::Rook, color) != 0
                || self.count(PieceKind::Queen, color) != 0
            {
                return false;
            }
        }
        let minors = self.count(PieceKind::Knight, PieceColor::White)
            + self.count(PieceKind::Bishop, PieceColor::White)
            + self.count(PieceKind::Knight, PieceColor::Black)
            + self.count(PieceKind::Bishop, PieceColor::Black);
        minors <= 1
    }

    /// Applies a legal move and reports the draw state of the resulting
    /// position. Feeding an illegal move is a programmer error.
    pub fn do_move(&mut self, chess_move: Move) -> RepeatResult {
        let from = chess_move.get_from_idx();
        let to = chess_move.get_to_idx();
        let mover = self.board[from as usize];
        assert!(!mover.is_none(), "no piece on {}", BoardHelper::square_to_string(from));

        let pre_kind = mover.kind();
        let color = mover.color();
        let zobrist_before = self.zobrist_hash;
        let kind = chess_move.get_kind();

        self.ep_stack.push(self.ep_target);
        self.ep_target = 0;

        let dest_piece = self.board[to as usize];
        let pawn_move_or_capture =
            pre_kind == PieceKind::Pawn || !dest_piece.is_none() || kind == MoveKind::EnPassant;

        let mut captured = dest_piece;
        let mut captured_square = to;

        match kind {
            MoveKind::Castle => {
                let king = self.set_piece(from, EMPTY);
                let _ = self.set_piece(to, king);
                let (rook_from, rook_to) = Self::castle_rook_squares(to);
                let rook = self.set_piece(rook_from, EMPTY);
                let _ = self.set_piece(rook_to, rook);
                self.castled[color as usize] = true;
            }
            MoveKind::EnPassant => {
                let pawn = self.set_piece(from, EMPTY);
                let _ = self.set_piece(to, pawn);
                // same column as the destination, same row as the origin
                captured_square = (from & !7) | (to & 7);
                captured = self.set_piece(captured_square, EMPTY);
            }
            MoveKind::PromoteQueen
            | MoveKind::PromoteRook
            | MoveKind::PromoteBishop
            | MoveKind::PromoteKnight => {
                let mut pawn = self.set_piece(from, EMPTY);
                pawn.set_kind(kind.promotion_kind().expect("promotion kind"));
                captured = self.set_piece(to, pawn);
            }
            MoveKind::Normal => {
                let piece = self.set_piece(from, EMPTY);
                captured = self.set_piece(to, piece);
            }
        }

        self.bump_move_counters(pre_kind, color, from, true);

        if pre_kind == PieceKind::Pawn && (from - to).abs() == 16 {
            self.ep_target = (from + to) / 2;
        }

        self.turn.flip();
        self.zobrist_hash ^= zobrist::turn_key();
        if color == PieceColor::Black {
            self.full_move += 1;
        }

        let extra = self.board_extra_info();
        self.history.update_current_extra(extra);
        let result = self.history.add_current(self.zobrist_hash, pawn_move_or_capture);

        self.undo_stack
            .push(ReversibleMove::new(chess_move, captured, captured_square, zobrist_before));
        result
    }

    /// Takes back the last move made with [Self::do_move].
    #[must_use]
    pub fn undo_move(&mut self) -> Option<Move> {
        let record = self.undo_stack.pop()?;
        let chess_move = record.board_move;
        let from = chess_move.get_from_idx();
        let to = chess_move.get_to_idx();

        self.turn.flip();
        let color = self.turn;
        if color == PieceColor::Black {
            self.full_move -= 1;
        }

        match chess_move.get_kind() {
            MoveKind::Castle => {
                let king = self.set_piece(to, EMPTY);
                let _ = self.set_piece(from, king);
                let (rook_from, rook_to) = Self::castle_rook_squares(to);
                let rook = self.set_piece(rook_to, EMPTY);
                let _ = self.set_piece(rook_from, rook);
                self.castled[color as usize] = false;
            }
            MoveKind::EnPassant => {
                let pawn = self.set_piece(to, EMPTY);
                let _ = self.set_piece(from, pawn);
                let _ = self.set_piece(record.captured_square, record.captured);
            }
            MoveKind::PromoteQueen
            | MoveKind::PromoteRook
            | MoveKind::PromoteBishop
            | MoveKind::PromoteKnight => {
                let _ = self.set_piece(to, record.captured);
                let _ = self.set_piece(from, Piece::new(PieceKind::Pawn, color));
            }
            MoveKind::Normal => {
                let piece = self.set_piece(to, record.captured);
                let _ = self.set_piece(from, piece);
            }
        }

        self.bump_move_counters(chess_move.original_piece().kind(), color, from, false);
        self.ep_target = self.ep_stack.pop().unwrap_or(0);
        self.history.pop_entry();
        self.zobrist_hash = record.zobrist_before;

        Some(chess_move)
    }

    /// The rook transfer belonging to a castle, keyed by the king's
    /// destination square.
    const fn castle_rook_squares(king_to: i32) -> (i32, i32) {
        match king_to {
            // white kingside: e1 -> g1, rook h1 -> f1
            1 => (Square::H1 as i32, Square::F1 as i32),
            // white queenside: e1 -> c1, rook a1 -> d1
            5 => (Square::A1 as i32, Square::D1 as i32),
            // black kingside: e8 -> g8, rook h8 -> f8
            57 => (Square::H8 as i32, Square::F8 as i32),
            // black queenside: e8 -> c8, rook a8 -> d8
            61 => (Square::A8 as i32, Square::D8 as i32),
            _ => panic!("not a castle destination"),
        }
    }

    fn bump_move_counters(&mut self, pre_kind: PieceKind, color: PieceColor, from: i32, increment: bool) {
        let delta = |count: &mut u16| {
            if increment {
                *count += 1;
            } else {
                *count -= 1;
            }
        };

        match pre_kind {
            PieceKind::King => {
                if from == KING_HOMES[color as usize] {
                    delta(&mut self.king_move_count[color as usize]);
                }
            }
            PieceKind::Rook => {
                let base = color as usize * 2;
                if from == ROOK_HOMES[base] {
                    delta(&mut self.rook_move_count[base]);
                } else if from == ROOK_HOMES[base + 1] {
                    delta(&mut self.rook_move_count[base + 1]);
                }
            }
            _ => {}
        }
    }

    /// Marks a castling right as spent by charging the rook's move
    /// counter. Index order matches [ROOK_HOMES].
    pub(crate) fn kill_castling_right(&mut self, index: usize, kill: bool) {
        self.rook_move_count[index] = kill as u16;
    }

    pub(crate) fn set_ep_target(&mut self, square: i32) {
        self.ep_target = square;
    }

    pub(crate) fn set_full_move(&mut self, full_move: u16) {
        self.full_move = full_move;
    }

    /// Recomputes the hash and restarts the history from the current
    /// position. Called once a loaded position has been validated.
    pub(crate) fn seal_position(&mut self, half_move: u16) {
        self.zobrist_hash = self.create_zobrist_hash();
        let mut packed = self.pack_board();
        packed.set_extra(self.board_extra_info());
        self.history.reset(packed, half_move, self.zobrist_hash);
    }

    // Raw array access for the in-place self-check probe; counts, hash
    // and history must not see these.
    #[inline(always)]
    pub(crate) fn probe_get(&self, square: i32) -> Piece {
        self.board[square as usize]
    }

    #[inline(always)]
    pub(crate) fn probe_set(&mut self, square: i32, piece: Piece) {
        self.board[square as usize] = piece;
    }
}
