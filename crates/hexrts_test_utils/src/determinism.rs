//! Harness for checking that identical setups produce identical games.
//!
//! Lockstep play and command-log replays both rely on two simulations fed
//! the same setup and command stream agreeing on every tick. The core keeps
//! that property by construction:
//!
//! - **No floats in state**: positions are cube coordinates; fixed-point
//!   [`hexrts_core::math::Fixed`] only feeds presentation positions.
//! - **Ordered containers**: entities, ledger entries and command buckets
//!   live in ordered maps, so iteration never depends on a random hasher.
//! - **No randomness**: the core never draws random numbers.
//!
//! The helpers here check it from the outside, at four strengths: final
//! hash over repeated runs, first diverging tick, byte-identical snapshots
//! and parallel runs on scoped threads.

use std::thread;

use hexrts_core::simulation::Simulation;

/// Final hashes from a set of runs of the same setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHashes {
    /// One hash per run, in run order.
    pub hashes: Vec<u64>,
    /// Ticks each run simulated.
    pub ticks: u64,
}

impl RunHashes {
    /// Every run ended on the same hash.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|pair| pair[0] == pair[1])
    }

    /// Sorted distinct hashes; a single entry when deterministic.
    #[must_use]
    pub fn distinct(&self) -> Vec<u64> {
        let mut distinct = self.hashes.clone();
        distinct.sort_unstable();
        distinct.dedup();
        distinct
    }

    /// # Panics
    ///
    /// Panics with every hash listed if the runs disagree.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic(),
            "{} runs of {} ticks ended on {} distinct hashes: {:?}",
            self.hashes.len(),
            self.ticks,
            self.distinct().len(),
            self.hashes
        );
    }
}

/// Run any state machine `runs` times and collect its final hashes.
///
/// # Example
///
/// ```
/// use hexrts_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);
/// result.assert_deterministic();
/// assert_eq!(result.hashes, vec![100, 100, 100]);
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> RunHashes
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let hashes = (0..runs)
        .map(|_| {
            let mut state = setup();
            (0..ticks).for_each(|_| step(&mut state));
            hash(&state)
        })
        .collect();
    RunHashes { hashes, ticks }
}

/// Two runs of a simulation fixture end on the same state hash.
///
/// Commands the setup function schedules are part of the run.
pub fn verify_simulation_determinism<F>(setup: F, ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        ticks,
        &setup,
        |sim| {
            sim.tick();
        },
        Simulation::state_hash,
    )
    .is_deterministic()
}

/// Run `runs` simulations on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(setup: F, runs: usize, ticks: u64) -> RunHashes
where
    F: Fn() -> Simulation + Sync,
{
    let setup = &setup;
    let hashes = thread::scope(|scope| {
        let workers: Vec<_> = (0..runs)
            .map(|_| {
                scope.spawn(move || {
                    let mut sim = setup();
                    (0..ticks).for_each(|_| {
                        sim.tick();
                    });
                    sim.state_hash()
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().expect("simulation thread panicked"))
            .collect()
    });
    RunHashes { hashes, ticks }
}

/// Step two copies in lockstep and return the first tick count after
/// which their hashes differ.
///
/// `Some(0)` means the setups already differ; `None` means the runs agree
/// for all `ticks`.
pub fn find_first_divergence<F>(setup: F, ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut left = setup();
    let mut right = setup();
    if left.state_hash() != right.state_hash() {
        return Some(0);
    }

    (1..=ticks).find(|&ran| {
        left.tick();
        right.tick();
        let diverged = left.state_hash() != right.state_hash();
        if diverged {
            tracing::warn!(ticks = ran, "Simulations diverged");
        }
        diverged
    })
}

/// Two runs serialize to byte-identical snapshots.
///
/// Stricter than comparing hashes: it also covers state the hash skips,
/// such as presentation positions.
pub fn verify_snapshot_determinism<F>(setup: F, ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let run = || {
        let mut sim = setup();
        (0..ticks).for_each(|_| {
            sim.tick();
        });
        sim.snapshot_bytes()
    };

    match (run(), run()) {
        (Ok(a), Ok(b)) => a == b,
        (Err(err), _) | (_, Err(err)) => {
            tracing::error!(%err, "Snapshot serialization failed");
            false
        }
    }
}
