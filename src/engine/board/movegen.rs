use super::Board;

use crate::chess_move::{Move, MoveKind};
use crate::piece::{Piece, PieceColor, PieceKind, EMPTY};
use crate::tables::{BLACK_PAWN_ORIGINS, KING_MOVES, KNIGHT_MOVES, MOVE_TABLES, WHITE_PAWN_ORIGINS};

/// Attack/defence tallies collected while enumerating; computed for
/// external evaluation, unused by the core itself.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AttackPosInfo {
    pub attacked: i32,
    pub defending: i32,
}

// King origin, kingside/queenside destinations and the squares that must
// be empty or unattacked, per color.
const KING_FROM: [i32; 2] = [3, 59];
const KINGSIDE_TO: [i32; 2] = [1, 57];
const QUEENSIDE_TO: [i32; 2] = [5, 61];
const KINGSIDE_EMPTIES: [[i32; 2]; 2] = [[1, 2], [57, 58]];
const QUEENSIDE_EMPTIES: [[i32; 3]; 2] = [[4, 5, 6], [60, 61, 62]];
const KINGSIDE_CROSSINGS: [[i32; 2]; 2] = [[3, 2], [59, 58]];
const QUEENSIDE_CROSSINGS: [[i32; 2]; 2] = [[3, 4], [59, 60]];

impl Board {
    #[must_use]
    #[inline(always)]
    pub fn is_in_check(&self, color: PieceColor) -> bool {
        let king_square = self.get_king_square(color);
        king_square >= 0 && self.is_square_attacked(color, king_square)
    }

    /// True when any piece of the enemy of `color` attacks `square`.
    /// Walks the square's precomputed rays and leaper tables instead of
    /// scanning the enemy pieces.
    #[must_use]
    pub fn is_square_attacked(&self, color: PieceColor, square: i32) -> bool {
        let enemy = color.flipped();
        let rays = MOVE_TABLES.rays(square);

        for ray in &rays.bishop {
            for &sq in ray {
                let piece = self.get_piece(sq);
                if piece.is_none() {
                    continue;
                }
                if piece.color() == enemy
                    && matches!(piece.kind(), PieceKind::Bishop | PieceKind::Queen)
                {
                    return true;
                }
                break;
            }
        }

        for ray in &rays.rook {
            for &sq in ray {
                let piece = self.get_piece(sq);
                if piece.is_none() {
                    continue;
                }
                if piece.color() == enemy
                    && matches!(piece.kind(), PieceKind::Rook | PieceKind::Queen)
                {
                    return true;
                }
                break;
            }
        }

        let enemy_knight = Piece::new(PieceKind::Knight, enemy);
        for &sq in &KNIGHT_MOVES[square as usize] {
            if sq < 0 {
                break;
            }
            if self.get_piece(sq) == enemy_knight {
                return true;
            }
        }

        let enemy_king = Piece::new(PieceKind::King, enemy);
        for &sq in &KING_MOVES[square as usize] {
            if sq < 0 {
                break;
            }
            if self.get_piece(sq) == enemy_king {
                return true;
            }
        }

        // an enemy pawn attacks `square` if it stands on a square its
        // color captures onto `square` from
        let origins = match enemy {
            PieceColor::White => &WHITE_PAWN_ORIGINS[square as usize],
            PieceColor::Black => &BLACK_PAWN_ORIGINS[square as usize],
        };
        let enemy_pawn = Piece::new(PieceKind::Pawn, enemy);
        for &sq in origins {
            if sq < 0 {
                break;
            }
            if self.get_piece(sq) == enemy_pawn {
                return true;
            }
        }

        false
    }

    /// Enumerates every legal move of `color`: pseudo-legal generation
    /// filtered through the self-check probe.
    pub fn enum_legal_moves(&mut self, color: PieceColor) -> (Vec<Move>, AttackPosInfo) {
        let mut moves = Vec::with_capacity(48);
        let mut info = AttackPosInfo::default();

        for from in 0..64 {
            let piece = self.get_piece(from);
            if piece.is_none() || piece.color() != color {
                continue;
            }
            match piece.kind() {
                PieceKind::Pawn => self.gen_pawn_moves(color, from, &mut moves, &mut info),
                PieceKind::Knight => {
                    self.gen_leaper_moves(color, from, &KNIGHT_MOVES[from as usize], &mut moves, &mut info)
                }
                PieceKind::King => {
                    self.gen_leaper_moves(color, from, &KING_MOVES[from as usize], &mut moves, &mut info)
                }
                PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen => {
                    self.gen_slider_moves(color, from, piece.kind(), &mut moves, &mut info)
                }
                PieceKind::None => unreachable!(),
            }
        }

        self.gen_castling_moves(color, &mut moves, &mut info);
        self.gen_en_passant_moves(color, &mut moves, &mut info);

        (moves, info)
    }

    /// Legal moves for the side to move.
    #[must_use]
    #[inline(always)]
    pub fn get_legal_moves(&mut self) -> Vec<Move> {
        let turn = self.get_turn();
        self.enum_legal_moves(turn).0
    }

    #[must_use]
    pub fn get_legal_moves_for_square(&mut self, square: i32) -> Vec<Move> {
        self.get_legal_moves()
            .into_iter()
            .filter(|m| m.get_from_idx() == square)
            .collect()
    }

    #[must_use]
    pub fn is_check_mate(&mut self) -> bool {
        let turn = self.get_turn();
        self.is_in_check(turn) && self.get_legal_moves().is_empty()
    }

    #[must_use]
    pub fn is_stale_mate(&mut self) -> bool {
        let turn = self.get_turn();
        !self.is_in_check(turn) && self.get_legal_moves().is_empty()
    }

    fn gen_pawn_moves(&mut self, color: PieceColor, from: i32, moves: &mut Vec<Move>, info: &mut AttackPosInfo) {
        let (dir, row_dir, start_row) = match color {
            PieceColor::White => (8, 1, 1),
            PieceColor::Black => (-8, -1, 6),
        };
        let row = from >> 3;
        let col = from & 7;

        let one = from + dir;
        if (0..64).contains(&one) && self.get_piece(one).is_none() {
            self.add_pawn_move(color, from, one, moves, info);

            let two = from + dir * 2;
            if row == start_row && self.get_piece(two).is_none() {
                self.add_if_not_check(color, from, two, MoveKind::Normal, moves, info);
            }
        }

        for dc in [-1, 1] {
            let capture_col = col + dc;
            let capture_row = row + row_dir;
            if !(0..8).contains(&capture_col) || !(0..8).contains(&capture_row) {
                continue;
            }
            let to = capture_row * 8 + capture_col;
            let target = self.get_piece(to);
            if target.is_none() {
                continue;
            }
            if target.color() == color {
                info.defending += 1;
                continue;
            }
            self.add_pawn_move(color, from, to, moves, info);
        }
    }

    /// Pawn arrivals on the last row fan out into the four promotions.
    fn add_pawn_move(&mut self, color: PieceColor, from: i32, to: i32, moves: &mut Vec<Move>, info: &mut AttackPosInfo) {
        let to_row = to >> 3;
        if to_row == 0 || to_row == 7 {
            for kind in [
                MoveKind::PromoteQueen,
                MoveKind::PromoteRook,
                MoveKind::PromoteBishop,
                MoveKind::PromoteKnight,
            ] {
                self.add_if_not_check(color, from, to, kind, moves, info);
            }
        } else {
            self.add_if_not_check(color, from, to, MoveKind::Normal, moves, info);
        }
    }

    fn gen_leaper_moves(&mut self, color: PieceColor, from: i32, table: &[i32; 9], moves: &mut Vec<Move>, info: &mut AttackPosInfo) {
        for &to in table {
            if to < 0 {
                break;
            }
            let target = self.get_piece(to);
            if !target.is_none() && target.color() == color {
                info.defending += 1;
                continue;
            }
            self.add_if_not_check(color, from, to, MoveKind::Normal, moves, info);
        }
    }

    fn gen_slider_moves(&mut self, color: PieceColor, from: i32, kind: PieceKind, moves: &mut Vec<Move>, info: &mut AttackPosInfo) {
        let rays = MOVE_TABLES.rays(from);
        let directions = match kind {
            PieceKind::Bishop => &rays.bishop,
            PieceKind::Rook => &rays.rook,
            _ => &rays.queen,
        };

        for ray in directions {
            for &to in ray {
                let target = self.get_piece(to);
                if target.is_none() {
                    self.add_if_not_check(color, from, to, MoveKind::Normal, moves, info);
                    continue;
                }
                if target.color() == color {
                    info.defending += 1;
                } else {
                    self.add_if_not_check(color, from, to, MoveKind::Normal, moves, info);
                }
                break;
            }
        }
    }

    fn gen_castling_moves(&mut self, color: PieceColor, moves: &mut Vec<Move>, info: &mut AttackPosInfo) {
        let (kingside, queenside) = self.castling_rights(color);
        let side = color as usize;

        if kingside
            && KINGSIDE_EMPTIES[side].iter().all(|&sq| self.get_piece(sq).is_none())
            && KINGSIDE_CROSSINGS[side].iter().all(|&sq| !self.is_square_attacked(color, sq))
        {
            self.add_if_not_check(color, KING_FROM[side], KINGSIDE_TO[side], MoveKind::Castle, moves, info);
        }

        if queenside
            && QUEENSIDE_EMPTIES[side].iter().all(|&sq| self.get_piece(sq).is_none())
            && QUEENSIDE_CROSSINGS[side].iter().all(|&sq| !self.is_square_attacked(color, sq))
        {
            self.add_if_not_check(color, KING_FROM[side], QUEENSIDE_TO[side], MoveKind::Castle, moves, info);
        }
    }

    fn gen_en_passant_moves(&mut self, color: PieceColor, moves: &mut Vec<Move>, info: &mut AttackPosInfo) {
        let target = self.get_ep_target();
        if target == 0 {
            return;
        }

        let dir = match color {
            PieceColor::White => 8,
            PieceColor::Black => -8,
        };
        let victim_square = target - dir;
        if !(0..64).contains(&victim_square) {
            return;
        }
        let victim = self.get_piece(victim_square);
        if victim.is_none() || victim.color() == color || victim.kind() != PieceKind::Pawn {
            return;
        }

        let victim_row = victim_square >> 3;
        let victim_col = victim_square & 7;
        let own_pawn = Piece::new(PieceKind::Pawn, color);

        for dc in [-1, 1] {
            let origin_col = victim_col + dc;
            if !(0..8).contains(&origin_col) {
                continue;
            }
            let origin = victim_row * 8 + origin_col;
            if self.get_piece(origin) != own_pawn {
                continue;
            }
            // lift the victim so the probe sees the post-capture board,
            // otherwise a discovered check slips through
            self.probe_set(victim_square, EMPTY);
            self.add_if_not_check(color, origin, target, MoveKind::EnPassant, moves, info);
            self.probe_set(victim_square, victim);
        }
    }

    /// The self-check filter. Applies the move in place on the raw
    /// array, asks whether the mover's king is attacked, reverts, and
    /// appends only safe moves. The capture flag comes from the
    /// pre-move destination.
    fn add_if_not_check(&mut self, color: PieceColor, from: i32, to: i32, kind: MoveKind, moves: &mut Vec<Move>, info: &mut AttackPosInfo) {
        let mover = self.probe_get(from);
        let dest = self.probe_get(to);
        let eaten = !dest.is_none() || kind == MoveKind::EnPassant;

        self.probe_set(to, mover);
        self.probe_set(from, EMPTY);
        let king_square = if mover.kind() == PieceKind::King {
            to
        } else {
            self.get_king_square(color)
        };
        let in_check = king_square >= 0 && self.is_square_attacked(color, king_square);
        self.probe_set(from, mover);
        self.probe_set(to, dest);

        if !in_check {
            let mut chess_move = Move::new(from, to, kind, mover);
            if eaten {
                chess_move = chess_move.with_eaten();
                info.attacked += 1;
            }
            moves.push(chess_move);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::fen::STARTPOS_FEN;
    use crate::board_helper::BoardHelper;

    fn legal_coord_texts(fen: &str) -> Vec<String> {
        let mut board = Board::new();
        board.parse_fen(fen).expect("valid fen");
        let turn = board.get_turn();
        board
            .enum_legal_moves(turn)
            .0
            .iter()
            .map(|m| m.to_coord_text())
            .collect()
    }

    #[test]
    fn test_movegen_startpos_counts() {
        let mut board = Board::new();
        board.parse_fen(STARTPOS_FEN).expect("valid fen");
        assert_eq!(board.get_legal_moves().len(), 20);
    }

    #[test]
    fn test_movegen_never_leaves_own_king_in_check() {
        let fens = [
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        ];
        for fen in fens {
            let mut board = Board::new();
            board.parse_fen(fen).expect("valid fen");
            let turn = board.get_turn();
            let (moves, _) = board.enum_legal_moves(turn);
            for m in moves {
                let _ = board.do_move(m);
                assert!(
                    !board.is_in_check(turn),
                    "{} leaves the king in check in {}",
                    m.to_coord_text(),
                    fen
                );
                let _ = board.undo_move();
            }
        }
    }

    #[test]
    fn test_movegen_pinned_piece_cannot_move() {
        // pinned along the file by the e8 rook, the e4 pawn may still push
        let moves = legal_coord_texts("4r2k/8/8/8/4P3/8/8/4K3 w - - 0 1");
        assert!(moves.contains(&String::from("e4e5")));

        // a diagonally pinned knight has no moves at all
        let moves = legal_coord_texts("7k/8/8/8/7b/8/5N2/4K3 w - - 0 1");
        assert!(moves.iter().all(|m| !m.starts_with("f2")));
    }

    #[test]
    fn test_movegen_en_passant_allowed_when_resolving_check() {
        let moves = legal_coord_texts("8/8/3p4/1Pp4r/1K3p2/6k1/4P1P1/1R6 w - c6 0 3");
        assert!(moves.contains(&String::from("b5c6")));
    }

    #[test]
    fn test_movegen_en_passant_discovered_check_rejected() {
        // capturing en passant would clear the rank between the rook and
        // the king
        let moves = legal_coord_texts("8/8/8/1kqpP1K1/8/8/8/8 w - d6 0 1");
        assert!(!moves.contains(&String::from("e5d6")));

        let moves = legal_coord_texts("8/8/8/8/1k1pPQK1/8/8/8 b - e3 0 1");
        assert!(!moves.contains(&String::from("d4e3")));
    }

    #[test]
    fn test_movegen_en_passant_diagonal_pin_rejected() {
        let moves = legal_coord_texts("qk6/8/8/3pP3/8/5K2/8/8 w - d6 0 1");
        assert!(!moves.contains(&String::from("e5d6")));
    }

    #[test]
    fn test_movegen_castling_both_sides() {
        let moves = legal_coord_texts("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert!(moves.contains(&String::from("e1g1")));
        assert!(moves.contains(&String::from("e1c1")));

        let moves = legal_coord_texts("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1");
        assert!(moves.contains(&String::from("e8g8")));
        assert!(moves.contains(&String::from("e8c8")));
    }

    #[test]
    fn test_movegen_castling_through_check_rejected() {
        // black queen on the f-file covers f1, the square the king
        // crosses
        let moves = legal_coord_texts("4kq2/8/8/8/8/8/8/4K2R w K - 0 1");
        assert!(!moves.contains(&String::from("e1g1")));

        // queen on the d-file covers d1 on the long side
        let moves = legal_coord_texts("3qk3/8/8/8/8/8/8/R3K3 w Q - 0 1");
        assert!(!moves.contains(&String::from("e1c1")));
    }

    #[test]
    fn test_movegen_castling_blocked_or_spent() {
        // a knight parks on g1
        let moves = legal_coord_texts("4k3/8/8/8/8/8/8/4K1NR w K - 0 1");
        assert!(!moves.contains(&String::from("e1g1")));

        // rights already gone
        let moves = legal_coord_texts("r3k2r/8/8/8/8/8/8/R3K2R w - - 0 1");
        assert!(!moves.contains(&String::from("e1g1")));
        assert!(!moves.contains(&String::from("e1c1")));
    }

    #[test]
    fn test_movegen_castling_in_check_rejected() {
        let moves = legal_coord_texts("4k3/8/8/8/8/8/4r3/4K2R w K - 0 1");
        assert!(!moves.contains(&String::from("e1g1")));

        // a queen on d2 attacks e1 diagonally, same verdict
        let moves = legal_coord_texts("4k3/8/8/8/8/8/3q4/4K2R w K - 0 1");
        assert!(!moves.contains(&String::from("e1g1")));
    }

    #[test]
    fn test_movegen_promotion_expands_four_ways() {
        let moves = legal_coord_texts("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let promotions: Vec<&String> = moves.iter().filter(|m| m.starts_with("a7a8")).collect();
        assert_eq!(promotions.len(), 4);
        assert!(moves.contains(&String::from("a7a8q")));
        assert!(moves.contains(&String::from("a7a8n")));
    }

    #[test]
    fn test_movegen_attack_info_counts_captures() {
        let mut board = Board::new();
        board.parse_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").expect("valid fen");
        let (moves, info) = board.enum_legal_moves(PieceColor::White);
        assert_eq!(info.attacked, 1); // exd5 is the only capture
        assert_eq!(moves.iter().filter(|m| m.is_piece_eaten()).count(), 1);
    }

    #[test]
    fn test_movegen_defending_counts_guarded_pieces() {
        let mut board = Board::new();
        board.parse_fen("4k3/8/8/8/8/3P4/4P3/4K3 w - - 0 1").expect("valid fen");
        let (_, info) = board.enum_legal_moves(PieceColor::White);
        // e2 guards d3, the king guards e2 and d2 is empty
        assert!(info.defending >= 2);
    }

    #[test]
    fn test_movegen_is_square_attacked_tables() {
        let mut board = Board::new();
        board.parse_fen("4k3/8/8/8/8/8/3n4/4K2R w - - 0 1").expect("valid fen");
        // the knight on d2 covers f1
        let f1 = BoardHelper::square_id_from_pgn("f1");
        assert!(board.is_square_attacked(PieceColor::White, f1));
        // ...but not g1
        let g1 = BoardHelper::square_id_from_pgn("g1");
        assert!(!board.is_square_attacked(PieceColor::White, g1));
    }

    #[test]
    fn test_movegen_checkmate_and_stalemate() {
        let mut board = Board::new();
        board
            .parse_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
            .expect("valid fen");
        assert!(board.is_check_mate());
        assert!(!board.is_stale_mate());

        board.parse_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").expect("valid fen");
        assert!(board.is_stale_mate());
        assert!(!board.is_check_mate());
    }

    /* perft: the classic cross-check of generator and make/unmake */
    // https://www.chessprogramming.org/Perft_Results

    fn perft(board: &mut Board, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }

        let moves = board.get_legal_moves();
        let mut positions = 0u64;
        for m in moves {
            let _ = board.do_move(m);
            positions += perft(board, depth - 1);
            let _ = board.undo_move();
        }
        positions
    }

    fn _test_do_perft(fen: &str, depth: u32) -> u64 {
        let mut board = Board::new();
        board.parse_fen(fen).expect("valid fen");
        perft(&mut board, depth)
    }

    #[test]
    fn test_movegen_perft_startpos() {
        assert_eq!(_test_do_perft(STARTPOS_FEN, 1), 20);
        assert_eq!(_test_do_perft(STARTPOS_FEN, 2), 400);
        assert_eq!(_test_do_perft(STARTPOS_FEN, 3), 8902);
    }

    #[test]
    #[ignore = "SLOW"]
    fn test_movegen_perft_startpos_deep() {
        assert_eq!(_test_do_perft(STARTPOS_FEN, 4), 197281);
        assert_eq!(_test_do_perft(STARTPOS_FEN, 5), 4865609);
    }

    const POSITION_2: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - ";

    #[test]
    fn test_movegen_perft_position2() {
        assert_eq!(_test_do_perft(POSITION_2, 1), 48);
        assert_eq!(_test_do_perft(POSITION_2, 2), 2039);
    }

    #[test]
    #[ignore = "SLOW"]
    fn test_movegen_perft_position2_deep() {
        assert_eq!(_test_do_perft(POSITION_2, 3), 97862);
    }

    const POSITION_3: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - ";

    #[test]
    fn test_movegen_perft_position3() {
        assert_eq!(_test_do_perft(POSITION_3, 1), 14);
        assert_eq!(_test_do_perft(POSITION_3, 2), 191);
        assert_eq!(_test_do_perft(POSITION_3, 3), 2812);
    }
}
