use once_cell::sync::Lazy;

/// Hash keys for every piece/square pair plus the castling, en-passant and
/// side-to-move state. Drawn from a fixed-seed generator so every build
/// produces the same keys.
pub struct ZobristKeys {
    pub side_key: u64,
    pub en_passant: [u64; 64],
    pub castling: [u64; 16],
    pub pieces: [[u64; 64]; 12],
}

struct XorShiftMul {
    state: u64,
}

impl XorShiftMul {
    const SEED: u64 = 1_070_372;
    const MULTIPLIER: u64 = 2_685_821_657_736_338_717;

    const fn new() -> Self {
        Self { state: Self::SEED }
    }

    fn next(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state = self.state.wrapping_mul(Self::MULTIPLIER);
        self.state
    }
}

// Draw order is part of the format: side key first, then en-passant,
// castling and piece keys. Changing it changes every hash.
pub static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(|| {
    let mut rng = XorShiftMul::new();

    let side_key = rng.next();

    let mut en_passant = [0u64; 64];
    for key in en_passant.iter_mut() {
        *key = rng.next();
    }

    let mut castling = [0u64; 16];
    for key in castling.iter_mut() {
        *key = rng.next();
    }

    let mut pieces = [[0u64; 64]; 12];
    for piece_keys in pieces.iter_mut() {
        for key in piece_keys.iter_mut() {
            *key = rng.next();
        }
    }

    ZobristKeys {
        side_key,
        en_passant,
        castling,
        pieces,
    }
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_deterministic() {
        let mut rng = XorShiftMul::new();
        assert_eq!(rng.next(), ZOBRIST.side_key);
    }

    #[test]
    fn test_keys_are_nonzero() {
        assert_ne!(ZOBRIST.side_key, 0);
        assert!(ZOBRIST.en_passant.iter().all(|&k| k != 0));
        assert!(ZOBRIST.castling.iter().all(|&k| k != 0));
        assert!(ZOBRIST.pieces.iter().flatten().all(|&k| k != 0));
    }

    #[test]
    fn test_keys_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for piece_keys in ZOBRIST.pieces.iter() {
            for &key in piece_keys.iter() {
                assert!(seen.insert(key));
            }
        }
    }
}
