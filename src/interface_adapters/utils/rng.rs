use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static STATE: AtomicU64 = AtomicU64::new(0);

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

fn seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

// splitmix64 finalizer; a bijection, so distinct inputs give distinct ids.
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Process-unique identifier for connections, tokens and generated player ids.
///
/// Consecutive ids do not look sequential, so generated player ids are not
/// trivially guessable from one another.
pub fn rand_id() -> u64 {
    if STATE.load(Ordering::Relaxed) == 0 {
        let _ = STATE.compare_exchange(0, seed() | 1, Ordering::Relaxed, Ordering::Relaxed);
    }
    mix(STATE.fetch_add(GOLDEN_GAMMA, Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn when_ids_are_drawn_then_they_do_not_repeat() {
        let ids: HashSet<u64> = (0..10_000).map(|_| rand_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }
}
