use std::fmt;

use log::{debug, trace};
use thiserror::Error;

use crate::address;
use crate::trace::{OpKind, Operation};

/// Geometry of the simulated cache: `2^s` sets of `E` lines with `2^b`-byte blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub set_bits: u32,
    pub lines_per_set: usize,
    pub block_bits: u32,
}

/// Largest accepted `s`. Every set is allocated up front.
pub const MAX_SET_BITS: u32 = 24;

/// Largest accepted total line count, `2^s * E`.
pub const MAX_LINES: usize = 1 << 26;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("lines per set must be at least 1")]
    NoLines,
    #[error("{set_bits} set index bits exceed the supported maximum of {MAX_SET_BITS}")]
    TooManySets { set_bits: u32 },
    #[error("{set_bits} set index bits plus {block_bits} block bits exceed a 64-bit address")]
    AddressTooNarrow { set_bits: u32, block_bits: u32 },
    #[error("{sets} sets of {lines_per_set} lines exceed the limit of {MAX_LINES} lines")]
    TooLarge { sets: usize, lines_per_set: usize },
}

impl CacheConfig {
    pub fn new(set_bits: u32, lines_per_set: usize, block_bits: u32) -> Self {
        Self {
            set_bits,
            lines_per_set,
            block_bits,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lines_per_set == 0 {
            return Err(ConfigError::NoLines);
        }
        if self.set_bits > MAX_SET_BITS {
            return Err(ConfigError::TooManySets {
                set_bits: self.set_bits,
            });
        }
        if self.set_bits.saturating_add(self.block_bits) > u64::BITS {
            return Err(ConfigError::AddressTooNarrow {
                set_bits: self.set_bits,
                block_bits: self.block_bits,
            });
        }
        match self.num_sets().checked_mul(self.lines_per_set) {
            Some(lines) if lines <= MAX_LINES => Ok(()),
            _ => Err(ConfigError::TooLarge {
                sets: self.num_sets(),
                lines_per_set: self.lines_per_set,
            }),
        }
    }

    pub fn num_sets(&self) -> usize {
        1usize << self.set_bits
    }

    /// Block size in bytes, saturating at `u64::MAX` for `b = 64`.
    pub fn block_size(&self) -> u64 {
        1u64.checked_shl(self.block_bits).unwrap_or(u64::MAX)
    }

    pub fn capacity_bytes(&self) -> u128 {
        self.num_sets() as u128 * self.lines_per_set as u128 * self.block_size() as u128
    }
}

impl fmt::Display for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "s={} E={} b={} ({} sets, {}-byte blocks)",
            self.set_bits,
            self.lines_per_set,
            self.block_bits,
            self.num_sets(),
            self.block_size()
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub loads: u64,
    pub stores: u64,
    pub modifies: u64,
    pub instructions: u64,
}

impl CacheStats {
    /// Line touches: one per Load/Store, two per Modify.
    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        if self.accesses() == 0 {
            0.0
        } else {
            self.hits as f64 / self.accesses() as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        if self.accesses() == 0 {
            0.0
        } else {
            self.misses as f64 / self.accesses() as f64
        }
    }
}

/// What a single line touch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit,
    Miss,
    /// A miss that displaced a resident line.
    Eviction,
}

impl AccessOutcome {
    pub fn is_hit(self) -> bool {
        matches!(self, AccessOutcome::Hit)
    }

    pub fn label(self) -> &'static str {
        match self {
            AccessOutcome::Hit => "hit",
            AccessOutcome::Miss => "miss",
            AccessOutcome::Eviction => "miss eviction",
        }
    }
}

impl fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcomes of one operation: none for `I`, one for `L`/`S`, two for `M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperationOutcome {
    first: Option<AccessOutcome>,
    second: Option<AccessOutcome>,
}

impl OperationOutcome {
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn single(outcome: AccessOutcome) -> Self {
        Self {
            first: Some(outcome),
            second: None,
        }
    }

    pub fn pair(first: AccessOutcome, second: AccessOutcome) -> Self {
        Self {
            first: Some(first),
            second: Some(second),
        }
    }

    pub fn is_ignored(&self) -> bool {
        self.first.is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = AccessOutcome> + '_ {
        self.first.iter().chain(self.second.iter()).copied()
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, outcome) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{outcome}")?;
        }
        Ok(())
    }
}

pub struct Cache {
    config: CacheConfig,
    sets: Vec<CacheSet>,
    stats: CacheStats,
    clock: u64,
}

impl Cache {
    pub fn new(config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let sets = (0..config.num_sets())
            .map(|_| CacheSet::new(config.lines_per_set))
            .collect();
        debug!("allocated cache {config}");
        Ok(Self {
            config,
            sets,
            stats: CacheStats::default(),
            clock: 0,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Logical time of the next line touch.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn num_sets(&self) -> usize {
        self.sets.len()
    }

    /// Tags currently valid in `set_index`, in line order. `None` if the set
    /// does not exist.
    pub fn resident_tags(&self, set_index: usize) -> Option<Vec<u64>> {
        self.sets.get(set_index).map(|set| {
            set.lines
                .iter()
                .filter(|line| line.valid)
                .map(|line| line.tag)
                .collect()
        })
    }

    /// Applies one trace operation. Modify is a load followed by a store to the
    /// same address; instruction fetches leave the cache untouched.
    pub fn apply(&mut self, op: &Operation) -> OperationOutcome {
        match op.kind {
            OpKind::Instruction => {
                self.stats.instructions += 1;
                OperationOutcome::ignored()
            }
            OpKind::Load => {
                self.stats.loads += 1;
                OperationOutcome::single(self.access_one(op.address))
            }
            OpKind::Store => {
                self.stats.stores += 1;
                OperationOutcome::single(self.access_one(op.address))
            }
            OpKind::Modify => {
                self.stats.modifies += 1;
                let load = self.access_one(op.address);
                let store = self.access_one(op.address);
                debug_assert!(store.is_hit(), "store half of modify must hit");
                OperationOutcome::pair(load, store)
            }
        }
    }

    /// Touches the line holding `address`, filling or evicting on a miss.
    pub fn access_one(&mut self, addr: u64) -> AccessOutcome {
        let set_index = address::set_index(addr, self.config.set_bits, self.config.block_bits);
        let tag = address::tag(addr, self.config.set_bits, self.config.block_bits);
        // set_index < 2^s == sets.len(), guaranteed by validate()
        let set = &mut self.sets[set_index as usize];

        let (idx, outcome) = if let Some(idx) = set.find_match(tag) {
            self.stats.hits += 1;
            (idx, AccessOutcome::Hit)
        } else {
            self.stats.misses += 1;
            let (idx, outcome) = match set.find_free() {
                Some(idx) => (idx, AccessOutcome::Miss),
                None => {
                    self.stats.evictions += 1;
                    let idx = set.find_victim();
                    trace!(
                        "set {set_index}: evicting tag {:#x} for {tag:#x}",
                        set.lines[idx].tag
                    );
                    (idx, AccessOutcome::Eviction)
                }
            };
            set.install(idx, tag);
            (idx, outcome)
        };

        set.touch(idx, self.clock);
        self.clock += 1;
        outcome
    }
}

#[derive(Debug, Clone, Default)]
struct CacheLine {
    valid: bool,
    tag: u64,
    last_used: u64,
}

struct CacheSet {
    lines: Vec<CacheLine>,
}

impl CacheSet {
    fn new(ways: usize) -> Self {
        Self {
            lines: vec![CacheLine::default(); ways],
        }
    }

    fn find_match(&self, tag: u64) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.valid && line.tag == tag)
    }

    fn find_free(&self) -> Option<usize> {
        self.lines.iter().position(|line| !line.valid)
    }

    /// Least recently used line. Only meaningful on a full set; ties go to the
    /// lowest index, but a global clock never produces them.
    fn find_victim(&self) -> usize {
        let idx = self
            .lines
            .iter()
            .enumerate()
            .min_by_key(|(_, line)| line.last_used)
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        debug_assert!(self.lines.iter().all(|line| line.valid));
        debug_assert_eq!(
            self.lines
                .iter()
                .filter(|line| line.last_used == self.lines[idx].last_used)
                .count(),
            1,
            "duplicate LRU timestamps in one set"
        );
        idx
    }

    fn install(&mut self, idx: usize, tag: u64) {
        let line = &mut self.lines[idx];
        line.valid = true;
        line.tag = tag;
    }

    fn touch(&mut self, idx: usize, tick: u64) {
        self.lines[idx].last_used = tick;
    }
}
