//! Deterministic weekly rotation of the cyclable quest pool.
//!
//! Every device must agree on which cyclable quests are active in a given
//! week without any shared state, so the selection is a seeded shuffle:
//! the seed is a polynomial hash of the week key plus the pool identity,
//! a small LCG drives a Fisher-Yates pass, and the first `k` ids win.
//! Do not swap in a platform RNG here; cross-client determinism is a hard
//! requirement, not an optimization.

const HASH_MODULUS: u64 = 2_147_483_647;
const LCG_MULTIPLIER: u64 = 1_103_515_245;
const LCG_INCREMENT: u64 = 12_345;
const LCG_MODULUS: u64 = 1 << 31;

/// Select this week's active subset of the cyclable pool.
///
/// Same week key and same pool always yield the same subset, in shuffle
/// order. A `k` of zero or an empty pool yields an empty selection.
pub fn weekly_rotation(week_key: &str, pool: &[String], k: usize) -> Vec<String> {
    if pool.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut material = String::with_capacity(week_key.len() + pool.len() * 8);
    material.push_str(week_key);
    for id in pool {
        material.push('|');
        material.push_str(id);
    }

    let mut rng = Lcg::new(poly_hash(&material));
    let mut shuffled: Vec<String> = pool.to_vec();
    fisher_yates(&mut shuffled, &mut rng);
    shuffled.truncate(k.min(shuffled.len()));
    shuffled
}

/// Polynomial-31 string hash mod a large prime. Non-cryptographic; only
/// spread matters.
fn poly_hash(input: &str) -> u64 {
    let mut hash: u64 = 0;
    for ch in input.chars() {
        hash = (hash * 31 + ch as u64) % HASH_MODULUS;
    }
    hash
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed % LCG_MODULUS }
    }

    fn next(&mut self) -> u64 {
        self.state = (self.state.wrapping_mul(LCG_MULTIPLIER) + LCG_INCREMENT) % LCG_MODULUS;
        self.state
    }
}

fn fisher_yates(items: &mut [String], rng: &mut Lcg) {
    for i in (1..items.len()).rev() {
        let j = (rng.next() % (i as u64 + 1)) as usize;
        items.swap(i, j);
    }
}
