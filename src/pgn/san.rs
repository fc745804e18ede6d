use thiserror::Error;

use crate::board_helper::BoardHelper;
use crate::chess_move::{Move, MoveKind};
use crate::engine::board::Board;
use crate::piece::PieceKind;
#[cfg(test)]
use crate::piece::PieceColor;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanError {
    #[error("'{0}' is not a readable move")]
    Malformed(String),
    #[error("'{0}' is not legal in this position")]
    Illegal(String),
    #[error("'{0}' matches more than one legal move")]
    Ambiguous(String),
}

/// Castle destinations per color, kingside then queenside.
const KINGSIDE_TO: [i32; 2] = [1, 57];
const QUEENSIDE_TO: [i32; 2] = [5, 61];

/// Resolves one SAN word against the legal moves of the side to move.
///
/// Exactly one legal move may match the described piece kind,
/// destination, promotion and origin hints; none means the move is
/// illegal here, several mean the text was ambiguous.
pub fn resolve_san(board: &mut Board, san: &str) -> Result<Move, SanError> {
    // trailing check/mate markers carry no information for replay
    let stripped = san.trim_end_matches(['+', '#']);
    if stripped.len() < 2 {
        return Err(SanError::Malformed(san.to_string()));
    }

    let turn = board.get_turn();
    let legal = board.enum_legal_moves(turn).0;

    if let Some(kingside) = castle_side(stripped) {
        let to = if kingside {
            KINGSIDE_TO[turn as usize]
        } else {
            QUEENSIDE_TO[turn as usize]
        };
        return legal
            .iter()
            .find(|m| m.get_kind() == MoveKind::Castle && m.get_to_idx() == to)
            .copied()
            .ok_or_else(|| SanError::Illegal(san.to_string()));
    }

    let mut rest = stripped;

    // promotion suffix
    let mut promotion = None;
    if let Some(eq) = rest.find('=') {
        let kind = match rest[eq + 1..].as_bytes() {
            [b'Q'] => PieceKind::Queen,
            [b'R'] => PieceKind::Rook,
            [b'B'] => PieceKind::Bishop,
            [b'N'] => PieceKind::Knight,
            _ => return Err(SanError::Malformed(san.to_string())),
        };
        promotion = Some(kind);
        rest = &rest[..eq];
    }

    // leading piece letter, pawn when absent
    let bytes = rest.as_bytes();
    let (piece_kind, body) = match bytes.first() {
        Some(b'N') => (PieceKind::Knight, &rest[1..]),
        Some(b'B') => (PieceKind::Bishop, &rest[1..]),
        Some(b'R') => (PieceKind::Rook, &rest[1..]),
        Some(b'Q') => (PieceKind::Queen, &rest[1..]),
        Some(b'K') => (PieceKind::King, &rest[1..]),
        Some(_) => (PieceKind::Pawn, rest),
        None => return Err(SanError::Malformed(san.to_string())),
    };

    if body.len() < 2 {
        return Err(SanError::Malformed(san.to_string()));
    }
    let to = BoardHelper::square_id_from_pgn(&body[body.len() - 2..]);
    if to == -1 {
        return Err(SanError::Malformed(san.to_string()));
    }

    // whatever sits between the piece letter and the destination is a
    // file hint, a rank hint, or the capture marker
    let mut from_col = -1;
    let mut from_row = -1;
    for ch in body[..body.len() - 2].chars() {
        match ch {
            'a'..='h' => from_col = BoardHelper::file_to_col(ch),
            '1'..='8' => from_row = BoardHelper::rank_to_row(ch),
            'x' => {}
            _ => return Err(SanError::Malformed(san.to_string())),
        }
    }

    let mut matches = legal.iter().filter(|m| {
        m.get_kind() != MoveKind::Castle
            && m.get_to_idx() == to
            && m.original_piece().kind() == piece_kind
            && m.get_kind().promotion_kind() == promotion
            && (from_col == -1 || BoardHelper::get_col(m.get_from_idx()) == from_col)
            && (from_row == -1 || BoardHelper::get_row(m.get_from_idx()) == from_row)
    });

    let found = matches.next().ok_or_else(|| SanError::Illegal(san.to_string()))?;
    if matches.next().is_some() {
        return Err(SanError::Ambiguous(san.to_string()));
    }
    Ok(*found)
}

fn castle_side(text: &str) -> Option<bool> {
    match text {
        "O-O" | "0-0" => Some(true),
        "O-O-O" | "0-0-0" => Some(false),
        _ => None,
    }
}

/// Renders a move the board could make right now back into SAN,
/// disambiguating against the other legal moves. The inverse of
/// [resolve_san] up to check markers, which are not emitted.
pub fn san_of_move(board: &mut Board, chess_move: Move) -> String {
    if chess_move.get_kind() == MoveKind::Castle {
        return match chess_move.get_to_idx() {
            1 | 57 => String::from("O-O"),
            _ => String::from("O-O-O"),
        };
    }

    let piece = chess_move.original_piece();
    let from = chess_move.get_from_idx();
    let to = chess_move.get_to_idx();

    // which other pieces of the same kind could land there?
    let legal = board.enum_legal_moves(piece.color()).0;
    let mut shares_col = false;
    let mut shares_row = false;
    let mut twins = false;
    for other in legal.iter().filter(|o| {
        o.get_kind() != MoveKind::Castle
            && o.get_from_idx() != from
            && o.get_to_idx() == to
            && o.original_piece().kind() == piece.kind()
    }) {
        twins = true;
        if BoardHelper::get_col(other.get_from_idx()) == BoardHelper::get_col(from) {
            shares_row = true;
        }
        if BoardHelper::get_row(other.get_from_idx()) == BoardHelper::get_row(from) {
            shares_col = true;
        }
    }

    let (file, rank) = BoardHelper::square_to_chars(from);
    let mut san = String::new();

    if piece.kind() == PieceKind::Pawn {
        // a capturing pawn always names its file
        if chess_move.is_piece_eaten() {
            san.push(file);
        }
    } else {
        san.push(piece.kind().to_char().to_ascii_uppercase());
        // by default the file disambiguates, even when the twins only
        // share a destination (knight forks of one square)
        let add_file = shares_col || (twins && !shares_row);
        if add_file {
            san.push(file);
        }
        if shares_row {
            san.push(rank);
        }
    }

    if chess_move.is_piece_eaten() {
        san.push('x');
    }
    san.push_str(&BoardHelper::square_to_string(to));

    if let Some(kind) = chess_move.get_kind().promotion_kind() {
        san.push('=');
        san.push(kind.to_char().to_ascii_uppercase());
    }

    san
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::board::fen::STARTPOS_FEN;

    fn board_of(fen: &str) -> Board {
        let mut board = Board::new();
        board.parse_fen(fen).expect("valid fen");
        board
    }

    #[test]
    fn test_san_resolve_simple_moves() {
        let mut board = board_of(STARTPOS_FEN);
        let m = resolve_san(&mut board, "e4").expect("legal");
        assert_eq!(m.to_coord_text(), "e2e4");

        let m = resolve_san(&mut board, "Nf3").expect("legal");
        assert_eq!(m.to_coord_text(), "g1f3");
    }

    #[test]
    fn test_san_resolve_capture_and_check_markers() {
        let mut board = board_of("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
        let m = resolve_san(&mut board, "exd5+").expect("legal");
        assert_eq!(m.to_coord_text(), "e4d5");
        assert!(m.is_piece_eaten());
    }

    #[test]
    fn test_san_resolve_file_disambiguation() {
        // both knights can reach d7
        let mut board = board_of("rnbq1rk1/2p1bppp/p2p1n2/1p2p3/3PP3/1BP2N1P/PP3PP1/RNBQR1K1 b - - 0 10");
        let m = resolve_san(&mut board, "Nbd7").expect("legal");
        assert_eq!(m.to_coord_text(), "b8d7");
        let m = resolve_san(&mut board, "Nfd7").expect("legal");
        assert_eq!(m.to_coord_text(), "f6d7");
    }

    #[test]
    fn test_san_resolve_rank_and_double_disambiguation() {
        let mut board = board_of("3r3r/2k5/8/R7/4Q2Q/8/1K6/R6Q w - - 0 1");
        let m = resolve_san(&mut board, "R1a3").expect("legal");
        assert_eq!(m.to_coord_text(), "a1a3");
        let m = resolve_san(&mut board, "Qh4e1").expect("legal");
        assert_eq!(m.to_coord_text(), "h4e1");
    }

    #[test]
    fn test_san_resolve_ambiguous_is_rejected() {
        let mut board = board_of("3r3r/2k5/8/R7/4Q2Q/8/1K6/R6Q w - - 0 1");
        assert_eq!(
            resolve_san(&mut board, "Ra3"),
            Err(SanError::Ambiguous(String::from("Ra3")))
        );
        assert_eq!(
            resolve_san(&mut board, "Qe1"),
            Err(SanError::Ambiguous(String::from("Qe1")))
        );
    }

    #[test]
    fn test_san_resolve_illegal_is_rejected() {
        let mut board = board_of(STARTPOS_FEN);
        assert_eq!(
            resolve_san(&mut board, "Ke2"),
            Err(SanError::Illegal(String::from("Ke2")))
        );
        assert_eq!(
            resolve_san(&mut board, "O-O"),
            Err(SanError::Illegal(String::from("O-O")))
        );
    }

    #[test]
    fn test_san_resolve_malformed() {
        let mut board = board_of(STARTPOS_FEN);
        assert!(matches!(resolve_san(&mut board, "e"), Err(SanError::Malformed(_))));
        assert!(matches!(resolve_san(&mut board, "Pz9"), Err(SanError::Malformed(_))));
        assert!(matches!(resolve_san(&mut board, "e8=X"), Err(SanError::Malformed(_))));
    }

    #[test]
    fn test_san_resolve_castling() {
        let mut board = board_of("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let m = resolve_san(&mut board, "O-O").expect("legal");
        assert_eq!(m.get_kind(), MoveKind::Castle);
        assert_eq!(m.to_coord_text(), "e1g1");

        let m = resolve_san(&mut board, "O-O-O").expect("legal");
        assert_eq!(m.to_coord_text(), "e1c1");

        board.set_turn(PieceColor::Black);
        let m = resolve_san(&mut board, "0-0").expect("legal");
        assert_eq!(m.to_coord_text(), "e8g8");
    }

    #[test]
    fn test_san_resolve_promotion() {
        let mut board = board_of("8/P7/8/8/8/8/8/k6K w - - 0 1");
        let m = resolve_san(&mut board, "a8=Q+").expect("legal");
        assert_eq!(m.get_kind(), MoveKind::PromoteQueen);

        let m = resolve_san(&mut board, "a8=N").expect("legal");
        assert_eq!(m.get_kind(), MoveKind::PromoteKnight);

        // a promotion may not be silent about its piece
        assert_eq!(
            resolve_san(&mut board, "a8"),
            Err(SanError::Illegal(String::from("a8")))
        );
    }

    #[test]
    fn test_san_render_round_trip() {
        let cases = [
            (STARTPOS_FEN, "e4"),
            (STARTPOS_FEN, "Nf3"),
            ("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2", "exd5"),
            ("rnbq1rk1/2p1bppp/p2p1n2/1p2p3/3PP3/1BP2N1P/PP3PP1/RNBQR1K1 b - - 0 10", "Nbd7"),
            ("3r3r/2k5/8/R7/4Q2Q/8/1K6/R6Q w - - 0 1", "R1a3"),
            ("3r3r/2k5/8/R7/4Q2Q/8/1K6/R6Q w - - 0 1", "Qh4e1"),
            ("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", "O-O"),
            ("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", "O-O-O"),
            ("8/P7/8/8/8/8/8/k6K w - - 0 1", "a8=Q"),
        ];
        for (fen, san) in cases {
            let mut board = board_of(fen);
            let resolved = resolve_san(&mut board, san).expect("legal");
            assert_eq!(san_of_move(&mut board, resolved), san, "render of {san} in {fen}");
        }
    }

    #[test]
    fn test_san_render_rook_pair_disambiguation() {
        // rooks on d8 and h8, both reach f8: the file disambiguates
        let mut board = board_of("3r3r/2k5/8/R7/4Q2Q/8/1K6/R6Q b - - 0 1");
        let resolved = resolve_san(&mut board, "Rdf8").expect("legal");
        assert_eq!(san_of_move(&mut board, resolved), "Rdf8");
    }
}
