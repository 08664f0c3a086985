//! Trace-driven simulator of a single-level set-associative cache with LRU
//! replacement.
//!
//! ```
//! use lru_csim::{CacheConfig, Operation, OpKind, simulate};
//!
//! let ops = [
//!     Operation::new(OpKind::Load, 0x10, 1),
//!     Operation::new(OpKind::Modify, 0x20, 1),
//! ];
//! let ops = ops.into_iter().map(Ok::<_, anyhow::Error>);
//! let stats = simulate(CacheConfig::new(4, 1, 4), ops).unwrap();
//! assert_eq!((stats.hits, stats.misses, stats.evictions), (1, 2, 0));
//! ```

pub mod address;
pub mod cache;
pub mod driver;
pub mod report;
pub mod trace;

pub use cache::{AccessOutcome, Cache, CacheConfig, CacheStats, ConfigError, OperationOutcome};
pub use driver::{run_trace, simulate};
pub use trace::{OpKind, Operation, TraceReader, parse_operation};
