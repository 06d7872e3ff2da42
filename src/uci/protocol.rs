use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::Result;

use crate::board::position::Position;
use crate::movegen::magic::init_attack_tables;
use crate::movegen::moves::{generate_moves, MoveList};
use crate::search::alphabeta::{SearchEngine, MAX_PLY};
use crate::search::time_management::calculate_time_allocation;

const ENGINE_NAME: &str = "Ferrite";
const ENGINE_VERSION: &str = "0.1";
const ENGINE_AUTHOR: &str = "the Ferrite authors";

const DEFAULT_TT_SIZE_MB: usize = 64;
const MIN_TT_SIZE_MB: usize = 1;
const MAX_TT_SIZE_MB: usize = 4096;
const DEFAULT_SEARCH_DEPTH: u32 = MAX_PLY as u32;

/// Line-oriented UCI dispatcher. The search runs on its own thread so a
/// `stop` arriving mid-search can flip the shared atomic the search polls.
pub struct UciEngine {
    position: Position,
    engine: Arc<Mutex<SearchEngine>>,
    stop_flag: Arc<AtomicBool>,
    search_thread: Option<thread::JoinHandle<()>>,
    tt_size_mb: usize,
}

impl UciEngine {
    pub fn new() -> Result<Self> {
        init_attack_tables();

        let engine = SearchEngine::new(DEFAULT_TT_SIZE_MB)?;
        let stop_flag = engine.stop_handle();

        Ok(Self {
            position: Position::startpos(),
            engine: Arc::new(Mutex::new(engine)),
            stop_flag,
            search_thread: None,
            tt_size_mb: DEFAULT_TT_SIZE_MB,
        })
    }

    pub fn run(&mut self) {
        let stdin = io::stdin();

        for line in stdin.lock().lines() {
            let command = match line {
                Ok(command) => command,
                Err(_) => break,
            };

            let trimmed = command.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !self.handle_command(trimmed) {
                break;
            }

            io::stdout().flush().ok();
        }

        self.ensure_search_stopped();
    }

    fn handle_command(&mut self, command: &str) -> bool {
        let tokens: Vec<&str> = command.split_whitespace().collect();

        match tokens[0] {
            "uci" => self.uci_command(),
            "isready" => {
                self.ensure_search_stopped();
                println!("readyok");
            }
            "ucinewgame" => self.ucinewgame_command(),
            "position" => self.position_command(&tokens),
            "go" => self.go_command(&tokens),
            "setoption" => self.setoption_command(&tokens),
            "stop" => self.stop_search(),
            "d" | "display" => self.position.print(),
            "quit" => {
                self.stop_search();
                return false;
            }
            _ => println!("info string unknown command: {}", tokens[0]),
        }

        true
    }

    fn uci_command(&self) {
        println!("id name {} {}", ENGINE_NAME, ENGINE_VERSION);
        println!("id author {}", ENGINE_AUTHOR);
        println!(
            "option name Hash type spin default {} min {} max {}",
            DEFAULT_TT_SIZE_MB, MIN_TT_SIZE_MB, MAX_TT_SIZE_MB
        );
        println!("option name Clear Hash type button");
        println!("uciok");
    }

    fn ucinewgame_command(&mut self) {
        self.ensure_search_stopped();
        self.position = Position::startpos();

        let mut engine = self.engine.lock().unwrap();
        engine.reset_repetition();
        engine.clear_tt();
    }

    fn position_command(&mut self, tokens: &[&str]) {
        if tokens.len() < 2 {
            return;
        }

        self.ensure_search_stopped();

        let moves_index = tokens.iter().position(|&token| token == "moves");

        match tokens[1] {
            "startpos" => self.position = Position::startpos(),
            "fen" => {
                let fen_end = moves_index.unwrap_or(tokens.len());
                let fen = tokens[2..fen_end].join(" ");
                match Position::from_fen(&fen) {
                    Some(position) => self.position = position,
                    None => {
                        println!("info string invalid fen: {}", fen);
                        return;
                    }
                }
            }
            _ => return,
        }

        self.engine.lock().unwrap().reset_repetition();

        if let Some(index) = moves_index {
            for &move_string in &tokens[index + 1..] {
                self.apply_uci_move(move_string);
            }
        }
    }

    /// Plays a move given in long algebraic form by matching it against
    /// the generated legal moves; unknown strings are silently ignored.
    fn apply_uci_move(&mut self, move_string: &str) {
        let mut moves = MoveList::new();
        generate_moves(&self.position, &mut moves);

        for i in 0..moves.len() {
            let mv = moves.get(i);
            if mv.to_uci() == move_string {
                let hash = self.position.hash;
                if self.position.make_move(mv) {
                    self.engine.lock().unwrap().push_repetition(hash);
                }
                return;
            }
        }
    }

    fn go_command(&mut self, tokens: &[&str]) {
        self.ensure_search_stopped();

        let mut white_time = 0i64;
        let mut black_time = 0i64;
        let mut white_increment = 0i64;
        let mut black_increment = 0i64;
        let mut moves_to_go = 0i64;
        let mut move_time = None;
        let mut depth = DEFAULT_SEARCH_DEPTH;
        let mut infinite = false;

        let mut index = 1;
        while index < tokens.len() {
            let value = tokens.get(index + 1).and_then(|v| v.parse::<i64>().ok());

            match tokens[index] {
                "infinite" => infinite = true,
                "wtime" => white_time = value.unwrap_or(0),
                "btime" => black_time = value.unwrap_or(0),
                "winc" => white_increment = value.unwrap_or(0),
                "binc" => black_increment = value.unwrap_or(0),
                "movestogo" => moves_to_go = value.unwrap_or(0),
                "movetime" => move_time = value,
                "depth" => depth = value.unwrap_or(DEFAULT_SEARCH_DEPTH as i64) as u32,
                _ => {}
            }

            index += if tokens[index] == "infinite" { 1 } else { 2 };
        }

        let white_to_move = self.position.side_to_move == crate::board::position::Side::White;
        let (player_time, opponent_time) = if white_to_move {
            (white_time, black_time)
        } else {
            (black_time, white_time)
        };
        let (player_increment, opponent_increment) = if white_to_move {
            (white_increment, black_increment)
        } else {
            (black_increment, white_increment)
        };

        let budget = match move_time {
            Some(ms) => ms,
            None => calculate_time_allocation(
                player_time,
                opponent_time,
                player_increment,
                opponent_increment,
                moves_to_go,
                infinite,
            ),
        };

        let depth = depth.clamp(1, MAX_PLY as u32);

        self.stop_flag.store(false, Ordering::Relaxed);

        let engine = Arc::clone(&self.engine);
        let mut position = self.position;

        self.search_thread = Some(thread::spawn(move || {
            let mut engine = engine.lock().unwrap();
            engine.set_time_budget(budget);
            engine.find_best_move(&mut position, depth);
            io::stdout().flush().ok();
        }));
    }

    fn setoption_command(&mut self, tokens: &[&str]) {
        self.ensure_search_stopped();

        let mut name_parts = Vec::new();
        let mut value_parts = Vec::new();
        let mut parsing_name = false;
        let mut parsing_value = false;

        for &token in &tokens[1..] {
            match token {
                "name" => {
                    parsing_name = true;
                    parsing_value = false;
                }
                "value" => {
                    parsing_name = false;
                    parsing_value = true;
                }
                _ => {
                    if parsing_name {
                        name_parts.push(token);
                    } else if parsing_value {
                        value_parts.push(token);
                    }
                }
            }
        }

        let option_name = name_parts.join(" ");
        let option_value = value_parts.join(" ");

        match option_name.as_str() {
            "Hash" => {
                if let Ok(size) = option_value.parse::<usize>() {
                    self.tt_size_mb = size.clamp(MIN_TT_SIZE_MB, MAX_TT_SIZE_MB);
                    let mut engine = self.engine.lock().unwrap();
                    if let Err(e) = engine.set_tt_size(self.tt_size_mb) {
                        println!("info string hash resize failed: {:#}", e);
                    }
                }
            }
            "Clear Hash" => {
                self.engine.lock().unwrap().clear_tt();
            }
            _ => println!("info string unknown option: {}", option_name),
        }
    }

    fn stop_search(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.search_thread.take() {
            handle.join().ok();
        }
    }

    fn ensure_search_stopped(&mut self) {
        if self.search_thread.is_some() {
            self.stop_search();
        }
    }
}
