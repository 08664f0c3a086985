use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Instruction,
    Load,
    Store,
    Modify,
}

impl OpKind {
    fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'I' => Some(OpKind::Instruction),
            'L' => Some(OpKind::Load),
            'S' => Some(OpKind::Store),
            'M' => Some(OpKind::Modify),
            _ => None,
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Instruction => write!(f, "I"),
            OpKind::Load => write!(f, "L"),
            OpKind::Store => write!(f, "S"),
            OpKind::Modify => write!(f, "M"),
        }
    }
}

/// One decoded trace entry. `size` is kept for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub kind: OpKind,
    pub address: u64,
    pub size: u32,
}

impl Operation {
    pub fn new(kind: OpKind, address: u64, size: u32) -> Self {
        Self {
            kind,
            address,
            size,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:x},{}", self.kind, self.address, self.size)
    }
}

/// Parses one trace line. Blank lines yield `Ok(None)`.
///
/// `I` lines are accepted whatever follows the tag; their address and size
/// are kept when they parse and default to 0 otherwise.
pub fn parse_operation(line: &str) -> Result<Option<Operation>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let mut chars = trimmed.chars();
    let tag = chars.next().context("missing operation")?;
    let kind = match OpKind::from_tag(tag) {
        Some(kind) => kind,
        None => bail!("invalid operation '{tag}'"),
    };
    let rest = chars.as_str();
    if kind == OpKind::Instruction {
        let (address, size) = parse_operands(rest).unwrap_or((0, 0));
        return Ok(Some(Operation::new(kind, address, size)));
    }
    if !rest.starts_with(char::is_whitespace) {
        bail!("expected whitespace after '{tag}'");
    }
    let (address, size) = parse_operands(rest)?;
    Ok(Some(Operation::new(kind, address, size)))
}

fn parse_operands(rest: &str) -> Result<(u64, u32)> {
    let rest = rest.trim();
    let (addr, size) = rest
        .split_once(',')
        .with_context(|| format!("expected '<address>,<size>', got '{rest}'"))?;
    let address = parse_address(addr.trim())
        .with_context(|| format!("invalid address literal '{}'", addr.trim()))?;
    let size = size
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid size literal '{}'", size.trim()))?;
    Ok((address, size))
}

fn parse_address(token: &str) -> Result<u64> {
    let hex = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    Ok(u64::from_str_radix(hex, 16)?)
}

/// Lazy reader over a trace: one `Operation` per non-blank line.
pub struct TraceReader<R> {
    reader: R,
    line_no: usize,
    buf: String,
}

impl TraceReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Unable to open trace file {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<Operation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            self.line_no += 1;
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    let line_no = self.line_no;
                    return Some(
                        Err(e).with_context(|| format!("Failed to read trace line {line_no}")),
                    );
                }
            }
            match parse_operation(&self.buf) {
                Ok(Some(op)) => return Some(Ok(op)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e.context(format!("Trace line {}", self.line_no)))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_kind() {
        assert_eq!(
            parse_operation(" L 10,1").unwrap(),
            Some(Operation::new(OpKind::Load, 0x10, 1))
        );
        assert_eq!(
            parse_operation(" S 7ff000388,8\n").unwrap(),
            Some(Operation::new(OpKind::Store, 0x7ff000388, 8))
        );
        assert_eq!(
            parse_operation("M 0x20,4").unwrap(),
            Some(Operation::new(OpKind::Modify, 0x20, 4))
        );
        assert_eq!(
            parse_operation("I  0400d7d4,8").unwrap(),
            Some(Operation::new(OpKind::Instruction, 0x0400d7d4, 8))
        );
    }

    #[test]
    fn instruction_lines_need_no_operands() {
        assert_eq!(
            parse_operation("I").unwrap(),
            Some(Operation::new(OpKind::Instruction, 0, 0))
        );
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(parse_operation("").unwrap(), None);
        assert_eq!(parse_operation("   \t\n").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_operation("X 10,1").is_err());
        assert!(parse_operation("L10,1").is_err());
        assert!(parse_operation("L 10").is_err());
        assert!(parse_operation("L zz,1").is_err());
        assert!(parse_operation("S 10,-1").is_err());
    }

    #[test]
    fn display_matches_trace_syntax() {
        let op = Operation::new(OpKind::Modify, 0x7ff0005c8, 8);
        assert_eq!(op.to_string(), "M 7ff0005c8,8");
    }

    #[test]
    fn reader_reports_line_numbers() {
        let input = " L 10,1\n\n S 18,1\n bogus\n";
        let mut reader = TraceReader::new(input.as_bytes());
        assert_eq!(reader.next().unwrap().unwrap().kind, OpKind::Load);
        assert_eq!(reader.next().unwrap().unwrap().kind, OpKind::Store);
        let err = reader.next().unwrap().unwrap_err();
        assert!(format!("{err:#}").contains("Trace line 4"));
    }
}
