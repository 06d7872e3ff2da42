use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use crate::board::bitboard::has_bit;
use crate::board::position::{piece_index, Move, Position};
use crate::eval::evaluate::evaluate;
use crate::movegen::moves::{generate_moves, MoveList, MAX_MOVES};
use crate::search::time_management::NO_TIME_LIMIT;
use crate::search::transposition::{
    HashFlag, TranspositionTable, MATE_SCORE, MATE_VALUE, NO_HASH_ENTRY,
};

pub const INFINITY: i32 = 500_000;
pub const MAX_PLY: usize = 64;

const FULL_DEPTH_MOVES: u32 = 4;
const REDUCTION_LIMIT: u32 = 3;
const ASPIRATION_WINDOW: i32 = 50;
const TIME_CHECK_INTERVAL: u64 = 2048;
const REPETITION_TABLE_SIZE: usize = 1024;

const PV_MOVE_SCORE: i32 = 20_000;
const CAPTURE_SCORE_BONUS: i32 = 10_000;
const FIRST_KILLER_SCORE: i32 = 9_000;
const SECOND_KILLER_SCORE: i32 = 8_000;

const MVV_PIECE_VALUES: [i32; 6] = [100, 200, 300, 400, 500, 600];
const LVA_ATTACKER_PENALTIES: [i32; 6] = [5, 4, 3, 2, 1, 0];

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub score: i32,
    pub depth: u32,
    pub nodes: u64,
    pub pv: Vec<Move>,
}

pub struct SearchEngine {
    tt: TranspositionTable,

    stop_flag: Arc<AtomicBool>,
    stopped: bool,
    start_time: Instant,
    time_budget: i64,
    nodes: u64,
    ply: usize,

    killers: [[Move; MAX_PLY]; 2],
    history: [[i32; 64]; 12],

    repetition_table: [u64; REPETITION_TABLE_SIZE],
    repetition_index: usize,

    // Triangular PV table; one extra row so a node at the ply ceiling can
    // still run its prologue.
    pv_table: [[Move; MAX_PLY + 1]; MAX_PLY + 1],
    pv_length: [usize; MAX_PLY + 1],
    follow_pv: bool,
    score_pv: bool,
}

impl SearchEngine {
    pub fn new(tt_size_mb: usize) -> Result<Self> {
        Ok(Self {
            tt: TranspositionTable::new(tt_size_mb)?,
            stop_flag: Arc::new(AtomicBool::new(false)),
            stopped: false,
            start_time: Instant::now(),
            time_budget: NO_TIME_LIMIT,
            nodes: 0,
            ply: 0,
            killers: [[Move::NULL; MAX_PLY]; 2],
            history: [[0; 64]; 12],
            repetition_table: [0; REPETITION_TABLE_SIZE],
            repetition_index: 0,
            pv_table: [[Move::NULL; MAX_PLY + 1]; MAX_PLY + 1],
            pv_length: [0; MAX_PLY + 1],
            follow_pv: false,
            score_pv: false,
        })
    }

    /// The flag the protocol thread sets to abort the running search; it
    /// is read at the periodic node-count checkpoint.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    pub fn set_time_budget(&mut self, budget_ms: i64) {
        self.time_budget = budget_ms;
    }

    pub fn set_tt_size(&mut self, size_mb: usize) -> Result<()> {
        self.tt = TranspositionTable::new(size_mb)?;
        Ok(())
    }

    pub fn clear_tt(&mut self) {
        self.tt.clear();
    }

    pub fn reset_repetition(&mut self) {
        self.repetition_table = [0; REPETITION_TABLE_SIZE];
        self.repetition_index = 0;
    }

    /// Records a game-history hash the same way search nodes record
    /// theirs, leaving headroom for the search stack on top.
    pub fn push_repetition(&mut self, hash: u64) {
        if self.repetition_index < REPETITION_TABLE_SIZE - 2 * MAX_PLY {
            self.repetition_table[self.repetition_index] = hash;
            self.repetition_index += 1;
        }
    }

    fn is_repeated(&self, hash: u64) -> bool {
        // Twofold: a single prior occurrence anywhere on the stack counts
        // as a draw inside the tree.
        self.repetition_table[..self.repetition_index]
            .iter()
            .any(|&entry| entry == hash)
    }

    fn check_time(&mut self) {
        if (self.nodes & (TIME_CHECK_INTERVAL - 1)) == 0
            && (self.stop_flag.load(Ordering::Relaxed)
                || (self.time_budget != NO_TIME_LIMIT
                    && self.start_time.elapsed().as_millis() as i64 > self.time_budget))
        {
            self.stopped = true;
        }
    }

    fn score_move(&self, mv: Move, pos: &Position) -> i32 {
        if self.score_pv && self.pv_table[0][self.ply] == mv {
            return PV_MOVE_SCORE;
        }

        if !mv.is_capture() {
            if self.killers[0][self.ply] == mv {
                return FIRST_KILLER_SCORE;
            }
            if self.killers[1][self.ply] == mv {
                return SECOND_KILLER_SCORE;
            }
            return self.history[piece_index(mv.piece(), mv.side())][mv.to() as usize];
        }

        // Scan the enemy boards for the victim. When nothing sits on the
        // target square the index stays at the pawn row, which is exactly
        // right for en passant.
        let mut victim = 0;
        let start = pos.side_to_move.opposite() as usize * 6;
        for offset in 0..6 {
            if has_bit(pos.pieces[start + offset], mv.to()) {
                victim = offset;
                break;
            }
        }

        MVV_PIECE_VALUES[victim]
            + LVA_ATTACKER_PENALTIES[mv.piece() as usize]
            + CAPTURE_SCORE_BONUS
    }

    fn sort_moves(&self, moves: &mut MoveList, pos: &Position) {
        let mut scores = [0i32; MAX_MOVES];
        for i in 0..moves.len() {
            scores[i] = self.score_move(moves.get(i), pos);
        }

        for i in 0..moves.len() {
            for j in i + 1..moves.len() {
                if scores[i] < scores[j] {
                    moves.swap(i, j);
                    scores.swap(i, j);
                }
            }
        }
    }

    /// If the previous iteration's PV move exists at this ply, order it
    /// first and keep following the PV below it.
    fn enable_pv_scoring(&mut self, moves: &MoveList) {
        self.follow_pv = false;

        for i in 0..moves.len() {
            if self.pv_table[0][self.ply] == moves.get(i) {
                self.score_pv = true;
                self.follow_pv = true;
                break;
            }
        }
    }

    fn quiescence(&mut self, mut alpha: i32, beta: i32, pos: &mut Position) -> i32 {
        self.check_time();
        self.nodes += 1;

        let stand_pat = evaluate(pos);

        if self.ply > MAX_PLY - 1 {
            return stand_pat;
        }

        if stand_pat >= beta {
            return beta;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let mut moves = MoveList::new();
        generate_moves(pos, &mut moves);
        self.sort_moves(&mut moves, pos);

        for i in 0..moves.len() {
            let mv = moves.get(i);
            if !mv.is_capture() {
                continue;
            }

            let snapshot = *pos;
            self.ply += 1;
            self.repetition_table[self.repetition_index] = pos.hash;
            self.repetition_index += 1;

            if !pos.make_move(mv) {
                self.ply -= 1;
                self.repetition_index -= 1;
                continue;
            }

            let score = -self.quiescence(-beta, -alpha, pos);

            self.ply -= 1;
            self.repetition_index -= 1;
            *pos = snapshot;

            if self.stopped {
                return 0;
            }

            if score > alpha {
                alpha = score;
                if score >= beta {
                    return beta;
                }
            }
        }

        alpha
    }

    fn negamax(&mut self, mut alpha: i32, beta: i32, mut depth: u32, pos: &mut Position) -> i32 {
        self.pv_length[self.ply] = self.ply;

        let mut hash_flag = HashFlag::Alpha;

        if self.ply > 0 && (self.is_repeated(pos.hash) || pos.is_fifty_move_rule_draw()) {
            return 0;
        }

        let is_pv_node = beta - alpha > 1;

        if !is_pv_node && self.ply > 0 {
            let score = self.tt.probe(alpha, beta, depth, pos.hash, self.ply);
            if score != NO_HASH_ENTRY {
                return score;
            }
        }

        self.check_time();

        if depth == 0 {
            return self.quiescence(alpha, beta, pos);
        }

        if self.ply > MAX_PLY - 1 {
            return evaluate(pos);
        }

        self.nodes += 1;

        let side = pos.side_to_move;
        let enemy = side.opposite();
        let in_check = pos.is_square_attacked(pos.king_square(side), enemy);

        if in_check {
            depth += 1;
        }

        // Null move: hand the opponent a free shot with a reduced window;
        // a fail-high proves the position is already good enough.
        if depth >= REDUCTION_LIMIT && !in_check && self.ply > 0 {
            let snapshot = *pos;
            self.ply += 1;
            self.repetition_table[self.repetition_index] = pos.hash;
            self.repetition_index += 1;

            pos.make_null_move();

            let score = -self.negamax(-beta, -beta + 1, depth - 3, pos);

            self.ply -= 1;
            self.repetition_index -= 1;
            *pos = snapshot;

            if self.stopped {
                return 0;
            }
            if score >= beta {
                return beta;
            }
        }

        let mut moves = MoveList::new();
        generate_moves(pos, &mut moves);

        if self.follow_pv {
            self.enable_pv_scoring(&moves);
        }

        self.sort_moves(&mut moves, pos);

        let mut legal_moves = 0;
        let mut moves_searched = 0;

        for i in 0..moves.len() {
            let mv = moves.get(i);

            let snapshot = *pos;
            self.ply += 1;
            self.repetition_table[self.repetition_index] = pos.hash;
            self.repetition_index += 1;

            if !pos.make_move(mv) {
                self.ply -= 1;
                self.repetition_index -= 1;
                continue;
            }

            legal_moves += 1;

            let mut score;
            if moves_searched == 0 {
                score = -self.negamax(-beta, -alpha, depth - 1, pos);
            } else {
                // Late quiet moves get a reduced probe first; anything
                // else forces the zero-window re-search below.
                if moves_searched >= FULL_DEPTH_MOVES
                    && depth >= REDUCTION_LIMIT
                    && !in_check
                    && !mv.is_capture()
                    && !mv.is_promotion()
                {
                    score = -self.negamax(-alpha - 1, -alpha, depth - 2, pos);
                } else {
                    score = alpha + 1;
                }

                if score > alpha {
                    score = -self.negamax(-alpha - 1, -alpha, depth - 1, pos);
                    if score > alpha && score < beta {
                        score = -self.negamax(-beta, -alpha, depth - 1, pos);
                    }
                }
            }

            self.ply -= 1;
            self.repetition_index -= 1;
            *pos = snapshot;

            if self.stopped {
                return 0;
            }

            moves_searched += 1;

            if score > alpha {
                hash_flag = HashFlag::Exact;

                if !mv.is_capture() {
                    self.history[piece_index(mv.piece(), mv.side())][mv.to() as usize] +=
                        depth as i32;
                }

                alpha = score;

                self.pv_table[self.ply][self.ply] = mv;
                for next_ply in self.ply + 1..self.pv_length[self.ply + 1] {
                    self.pv_table[self.ply][next_ply] = self.pv_table[self.ply + 1][next_ply];
                }
                self.pv_length[self.ply] = self.pv_length[self.ply + 1];

                if score >= beta {
                    self.tt.store(beta, depth, HashFlag::Beta, pos.hash, self.ply);

                    if !mv.is_capture() {
                        self.killers[1][self.ply] = self.killers[0][self.ply];
                        self.killers[0][self.ply] = mv;
                    }

                    return beta;
                }
            }
        }

        if legal_moves == 0 {
            if in_check {
                return -MATE_VALUE + self.ply as i32;
            }
            return 0;
        }

        self.tt.store(alpha, depth, hash_flag, pos.hash, self.ply);
        alpha
    }

    /// Iterative deepening driver. Prints `info` lines per completed
    /// iteration and a final `bestmove`, and returns the same data.
    pub fn find_best_move(&mut self, pos: &mut Position, max_depth: u32) -> SearchResult {
        self.start_time = Instant::now();
        self.nodes = 0;
        self.stopped = false;
        self.follow_pv = false;
        self.score_pv = false;

        self.killers = [[Move::NULL; MAX_PLY]; 2];
        self.history = [[0; 64]; 12];
        self.pv_table = [[Move::NULL; MAX_PLY + 1]; MAX_PLY + 1];
        self.pv_length = [0; MAX_PLY + 1];

        let mut result = SearchResult {
            best_move: None,
            score: 0,
            depth: 0,
            nodes: 0,
            pv: Vec::new(),
        };

        let mut alpha = -INFINITY;
        let mut beta = INFINITY;

        let mut depth = 1;
        while depth <= max_depth {
            self.follow_pv = true;

            let score = self.negamax(alpha, beta, depth, pos);

            if self.stopped {
                break;
            }

            // Outside the aspiration window: rerun this depth full-width.
            if score <= alpha || score >= beta {
                alpha = -INFINITY;
                beta = INFINITY;
                continue;
            }

            alpha = score - ASPIRATION_WINDOW;
            beta = score + ASPIRATION_WINDOW;

            if self.pv_length[0] > 0 {
                result.best_move = Some(self.pv_table[0][0]);
                result.score = score;
                result.depth = depth;
                result.pv = self.pv_table[0][..self.pv_length[0]].to_vec();

                print!("info depth {} nodes {} score ", depth, self.nodes);
                if score > -MATE_VALUE && score < -MATE_SCORE {
                    print!("mate {}", -(score + MATE_VALUE) / 2 - 1);
                } else if score > MATE_SCORE && score < MATE_VALUE {
                    print!("mate {}", (MATE_VALUE - score) / 2 + 1);
                } else {
                    print!("cp {}", score);
                }
                print!(" pv");
                for mv in &result.pv {
                    print!(" {}", mv.to_uci());
                }
                println!();
            }

            depth += 1;
        }

        result.nodes = self.nodes;

        match result.best_move {
            Some(mv) => println!("bestmove {}", mv.to_uci()),
            None => println!("bestmove none"),
        }

        result
    }
}
