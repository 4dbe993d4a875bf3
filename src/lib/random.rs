use std::time::{SystemTime, UNIX_EPOCH};

/// Source of randomness for the randomized split and group-code helpers.
///
/// Callers own the source and pass it in, so a fixed seed replays the same sequence.
pub trait RandomSource {
    fn next_u64(&mut self) -> u64;

    /// Uniform value in `0..bound`. `bound` must be non-zero.
    fn next_below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}

/// xorshift64* generator. Not suitable for anything security related.
#[derive(Clone, Debug)]
pub struct SeededRandom {
    state: u64,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        // zero is a fixed point of xorshift
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { state }
    }

    /// Seeds from the wall clock, for when no reproducibility is wanted.
    pub fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::new(nanos)
    }
}

impl RandomSource for SeededRandom {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }
}
