use anyhow::Result;
use log::debug;

use crate::{
    cache::{Cache, CacheConfig, CacheStats, OperationOutcome},
    trace::Operation,
};

/// Feeds `operations` through `cache` in order, handing each operation and
/// its outcome to `observer`. Stops at the first reader error.
pub fn run_trace<I, F>(cache: &mut Cache, operations: I, mut observer: F) -> Result<CacheStats>
where
    I: IntoIterator<Item = Result<Operation>>,
    F: FnMut(&Operation, &OperationOutcome) -> Result<()>,
{
    let mut count = 0u64;
    for op in operations {
        let op = op?;
        let outcome = cache.apply(&op);
        observer(&op, &outcome)?;
        count += 1;
    }
    debug!(
        "trace finished after {count} operations, clock at {}",
        cache.clock()
    );
    Ok(cache.stats().clone())
}

/// Builds a fresh cache for `config` and runs `operations` through it.
pub fn simulate<I>(config: CacheConfig, operations: I) -> Result<CacheStats>
where
    I: IntoIterator<Item = Result<Operation>>,
{
    let mut cache = Cache::new(config)?;
    run_trace(&mut cache, operations, |_, _| Ok(()))
}
