//! Runtime selection between PEXT and multiply-shift indexing.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use super::magics::hardware_pext_available;
use super::tables;

/// How sliding-piece attack lookups are indexed.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PextMode {
    /// Benchmark both paths once at initialization and pick the faster.
    Auto,
    /// Use PEXT if the CPU supports it, multiply-shift otherwise.
    Force,
    /// Always use multiply-shift.
    #[default]
    Disable,
}

impl FromStr for PextMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(PextMode::Auto),
            "force" => Ok(PextMode::Force),
            "disable" => Ok(PextMode::Disable),
            _ => Err(()),
        }
    }
}

/// Whether lookups currently go through the PEXT table.
static USE_PEXT: AtomicBool = AtomicBool::new(false);

/// Memoized benchmark verdict; the measurement runs at most once per
/// process (double-checked by `OnceLock`, so concurrent callers block on
/// the single run).
static AUTO_VERDICT: OnceLock<bool> = OnceLock::new();

/// Apply an indexing mode. Called by the engine when the option changes
/// and once during engine construction.
pub fn set_indexing_mode(mode: PextMode) {
    let use_pext = match mode {
        PextMode::Disable => false,
        PextMode::Force => hardware_pext_available(),
        PextMode::Auto => {
            hardware_pext_available() && *AUTO_VERDICT.get_or_init(benchmark_prefers_pext)
        }
    };
    USE_PEXT.store(use_pext, Ordering::Relaxed);
    log::debug!(
        "slider indexing: {} (mode {mode:?})",
        if use_pext { "pext" } else { "multiply-shift" }
    );
}

#[inline]
pub(crate) fn use_pext() -> bool {
    USE_PEXT.load(Ordering::Relaxed)
}

const WARMUP_LOOKUPS: usize = 10_000;
const TIMED_LOOKUPS: usize = 100_000;

/// Four squares spread over the board and four blocker patterns give the
/// benchmark a realistic index mix.
const BENCH_SQUARES: [usize; 4] = [0, 27, 36, 63];
const BENCH_OCCUPANCIES: [u64; 4] = [
    0,
    0x00FF_0000_0000_FF00,
    0x0042_2400_0024_4200,
    0x55AA_55AA_55AA_55AA,
];

/// Time both lookup paths and return true if PEXT won. Only called when
/// hardware PEXT is available.
fn benchmark_prefers_pext() -> bool {
    let t = tables();

    let run = |pext: bool, rounds: usize| -> std::time::Duration {
        let start = Instant::now();
        let mut acc = 0u64;
        for i in 0..rounds {
            let sq = BENCH_SQUARES[i & 3];
            let occ = BENCH_OCCUPANCIES[(i >> 2) & 3] ^ acc;
            if pext {
                acc ^= t.rook_attacks_pext(sq, occ) ^ t.bishop_attacks_pext(sq, occ);
            } else {
                acc ^= t.rook_attacks_magic(sq, occ) ^ t.bishop_attacks_magic(sq, occ);
            }
        }
        std::hint::black_box(acc);
        start.elapsed()
    };

    run(true, WARMUP_LOOKUPS);
    run(false, WARMUP_LOOKUPS);
    let pext_time = run(true, TIMED_LOOKUPS);
    let magic_time = run(false, TIMED_LOOKUPS);

    log::debug!("pext benchmark: pext {pext_time:?} vs multiply-shift {magic_time:?}");
    pext_time < magic_time
}
