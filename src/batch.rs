use std::ops::RangeInclusive;

use rayon::prelude::*;

use crate::error::Result;
use crate::machine::Machine;
use crate::memory::Memory;
use crate::trace::NoTrace;

/// A set of direct writes applied to a fresh copy of a program before it runs.
pub type Pokes = Vec<(i64, i64)>;

/// Run `program` once per entry of `pokes`, each on its own copy of memory.
///
/// Runs execute in parallel. Results come back in the same order as `pokes`;
/// a run that fails does not affect the others.
pub fn run_all(program: &Memory, pokes: &[Pokes], step_limit: usize) -> Vec<Result<Memory>> {
    pokes
        .par_iter()
        .map(|set| run_one(program, set, step_limit))
        .collect()
}

fn run_one(program: &Memory, pokes: &[(i64, i64)], step_limit: usize) -> Result<Memory> {
    let mut machine = Machine::new(program.clone());
    for &(address, value) in pokes {
        machine.write(address, value)?;
    }
    machine.run_bounded(step_limit, &mut NoTrace)?;
    Ok(machine.into_memory())
}

/// Configuration for an input search.
///
/// Every pair `(first, second)` drawn from `range` is written to
/// `first_address` and `second_address`, the program is run, and the value
/// left at `output_address` is compared with `target`.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub first_address: i64,
    pub second_address: i64,
    pub output_address: i64,
    pub range: RangeInclusive<i64>,
    pub target: i64,
    /// Max instructions per candidate run.
    pub step_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            first_address: 1,
            second_address: 2,
            output_address: 0,
            range: 0..=99,
            target: 0,
            step_limit: 1 << 16,
        }
    }
}

/// The inputs that produced the target output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchHit {
    pub first: i64,
    pub second: i64,
}

/// Search every input pair in parallel for one that halts with the target
/// output.
///
/// Candidates are ordered by `first`, then `second`; the earliest match
/// wins regardless of which thread finds it. Candidate runs that fail are
/// skipped. Returns `Ok(None)` when nothing matches, or an error if the
/// configured addresses do not exist in `program`.
pub fn search(program: &Memory, config: &SearchConfig) -> Result<Option<SearchHit>> {
    for address in [
        config.first_address,
        config.second_address,
        config.output_address,
    ] {
        program.read(address)?;
    }

    let seconds = &config.range;
    let hit = config
        .range
        .clone()
        .into_par_iter()
        .flat_map_iter(|first| seconds.clone().map(move |second| (first, second)))
        .find_first(|&(first, second)| matches_target(program, config, first, second))
        .map(|(first, second)| SearchHit { first, second });

    match hit {
        Some(h) => log::info!("search hit: first={} second={}", h.first, h.second),
        None => log::info!("search found no inputs producing {}", config.target),
    }
    Ok(hit)
}

fn matches_target(program: &Memory, config: &SearchConfig, first: i64, second: i64) -> bool {
    let pokes = [(config.first_address, first), (config.second_address, second)];
    match run_one(program, &pokes, config.step_limit) {
        Ok(memory) => memory.read(config.output_address).ok() == Some(config.target),
        Err(e) if e.is_runtime() => {
            log::debug!("candidate ({first}, {second}) failed: {e}");
            false
        }
        Err(e) => {
            log::warn!("candidate ({first}, {second}) could not run: {e}");
            false
        }
    }
}

/// Run a single candidate and return its output, surfacing any failure
/// instead of skipping it.
pub fn try_inputs(program: &Memory, config: &SearchConfig, first: i64, second: i64) -> Result<i64> {
    let pokes = [(config.first_address, first), (config.second_address, second)];
    let memory = run_one(program, &pokes, config.step_limit)?;
    memory.read(config.output_address)
}
