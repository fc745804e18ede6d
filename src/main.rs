#![allow(clippy::inline_always)]

use std::fs::File;

use pgnboard::prelude::*;

fn main() {
    tracing_subscriber::fmt().init();

    let mut board = Board::new();
    println!("Welcome to pgnboard's interface!");

    board.parse_fen(STARTPOS_FEN).expect("valid fen");

    loop {
        let line = match std::io::stdin().lines().next() {
            Some(Ok(line)) => line,
            _ => break,
        };
        let args: Vec<&str> = line.split(' ').collect();

        if &line == "exit" || &line == "quit" {
            break;
        } else if &line == "board" {
            println!("{board}");
        } else if &line == "fen" {
            println!("FEN: {}", board.to_fen());
        } else if &line == "undo" {
            match board.undo_move() {
                Some(made_move) => println!("undid {}", made_move.to_coord_text()),
                None => println!("nothing to undo"),
            }
        } else if args.len() == 2 && args[0] == "open" {
            open_and_summarize(args[1]);
        } else if args.len() == 2 && args[0] == "moves" {
            let square = BoardHelper::square_id_from_pgn(args[1]);
            if square == -1 {
                println!("not a square: {}", args[1]);
                continue;
            }
            let moves = board.get_legal_moves_for_square(square);
            if moves.is_empty() {
                println!("no moves from {}", args[1]);
            } else {
                let texts: Vec<String> = moves.iter().map(|m| m.to_coord_text()).collect();
                println!("{}", texts.join(" "));
            }
        } else if !line.is_empty() {
            // anything else is tried as a SAN move
            match resolve_san(&mut board, &line) {
                Ok(chess_move) => {
                    let _ = board.do_move(chess_move);
                    println!("made move '{line}'");
                }
                Err(err) => println!("{err}"),
            }
        }
    }
}

fn open_and_summarize(path: &str) {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            println!("could not open {path}: {err}");
            return;
        }
    };

    let mut parser = match PgnParser::new(file) {
        Ok(parser) => parser,
        Err(err) => {
            println!("{err}");
            return;
        }
    };

    let games = parser.parse_all();
    for (index, game) in games.iter().enumerate() {
        println!(
            "game {}: {} vs {}, {} moves, {}{}",
            index + 1,
            game.tags.get("White").map_or("?", |s| s.as_str()),
            game.tags.get("Black").map_or("?", |s| s.as_str()),
            game.moves.len(),
            if game.termination.is_empty() {
                "unterminated"
            } else {
                game.termination.as_str()
            },
            if game.truncated { " [truncated]" } else { "" },
        );
    }

    let diagnostics = parser.diagnostics();
    println!(
        "{} games, {} skipped, {} truncated",
        games.len(),
        diagnostics.skipped,
        diagnostics.truncated
    );
}
