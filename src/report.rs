use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result};

use crate::{
    cache::{CacheStats, OperationOutcome},
    trace::Operation,
};

pub fn summary_line(stats: &CacheStats) -> String {
    format!(
        "hits:{} misses:{} evictions:{}",
        stats.hits, stats.misses, stats.evictions
    )
}

/// Verbose line for one operation, e.g. `M 20,1 miss eviction hit`.
/// Instruction fetches produce nothing.
pub fn verbose_line(op: &Operation, outcome: &OperationOutcome) -> Option<String> {
    if outcome.is_ignored() {
        return None;
    }
    Some(format!("{op} {outcome}"))
}

pub fn write_verbose(
    out: &mut impl Write,
    op: &Operation,
    outcome: &OperationOutcome,
) -> Result<()> {
    if let Some(line) = verbose_line(op, outcome) {
        writeln!(out, "{line}").context("Failed to write verbose output")?;
    }
    Ok(())
}

/// Writes `<hits> <misses> <evictions>` for graders that read counts from a file.
pub fn write_results(path: impl AsRef<Path>, stats: &CacheStats) -> Result<()> {
    let path = path.as_ref();
    fs::write(
        path,
        format!("{} {} {}\n", stats.hits, stats.misses, stats.evictions),
    )
    .with_context(|| format!("Unable to write results file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::AccessOutcome::{Eviction, Hit, Miss},
        trace::OpKind,
    };

    #[test]
    fn summary_format() {
        let stats = CacheStats {
            hits: 4,
            misses: 5,
            evictions: 3,
            ..CacheStats::default()
        };
        assert_eq!(summary_line(&stats), "hits:4 misses:5 evictions:3");
    }

    #[test]
    fn verbose_lines() {
        let m = Operation::new(OpKind::Modify, 0x20, 1);
        assert_eq!(
            verbose_line(&m, &OperationOutcome::pair(Eviction, Hit)).as_deref(),
            Some("M 20,1 miss eviction hit")
        );
        let l = Operation::new(OpKind::Load, 0x10, 1);
        assert_eq!(
            verbose_line(&l, &OperationOutcome::single(Miss)).as_deref(),
            Some("L 10,1 miss")
        );
        let i = Operation::new(OpKind::Instruction, 0x400, 4);
        assert_eq!(verbose_line(&i, &OperationOutcome::ignored()), None);
    }

    #[test]
    fn write_verbose_appends_newline() {
        let mut out = Vec::new();
        let s = Operation::new(OpKind::Store, 0x18, 1);
        write_verbose(&mut out, &s, &OperationOutcome::single(Hit)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "S 18,1 hit\n");
    }
}
