use anyhow::{bail, Context, Result};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Inclusive window of TCP ports to probe.
///
/// A window whose `start` is greater than its `end` is empty. Such windows can be
/// built directly but are rejected by [`parse_port_window`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortWindow {
    pub start: u16,
    pub end: u16,
}

impl PortWindow {
    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Number of ports in the window.
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            u64::from(self.end - self.start) + 1
        }
    }

    pub fn contains(&self, port: u16) -> bool {
        self.range().contains(&port)
    }

    pub fn range(&self) -> RangeInclusive<u16> {
        self.start..=self.end
    }
}

impl IntoIterator for PortWindow {
    type Item = u16;
    type IntoIter = RangeInclusive<u16>;

    fn into_iter(self) -> Self::IntoIter {
        self.range()
    }
}

impl fmt::Display for PortWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for PortWindow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_port_window(s)
    }
}

/// Parse a port window from the command line.
///
/// Supported forms:
/// - inclusive range: `33000-48000`
/// - single port: `5555` (a window of one)
/// - surrounding whitespace is ignored
pub fn parse_port_window(s: &str) -> Result<PortWindow> {
    let s = s.trim();
    if s.is_empty() {
        bail!("empty port window");
    }

    if let Some((a, b)) = s.split_once('-') {
        let start = parse_port_str(a.trim())
            .with_context(|| format!("invalid start in range: {a}"))?;
        let end = parse_port_str(b.trim())
            .with_context(|| format!("invalid end in range: {b}"))?;
        if start > end {
            bail!("invalid range {start}-{end} (start > end)");
        }
        return Ok(PortWindow::new(start, end));
    }

    let p = parse_port_str(s).with_context(|| format!("invalid port value: {s}"))?;
    Ok(PortWindow::new(p, p))
}

fn parse_port_str(s: &str) -> Result<u16> {
    let val: u32 = s.parse::<u32>().map_err(|e| anyhow::anyhow!(e))?;
    if val == 0 || val > 65535 {
        bail!("port out of range: {val}");
    }
    Ok(val as u16)
}
