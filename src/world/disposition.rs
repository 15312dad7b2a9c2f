//! Declarative placement of frames on the wallpaper grid.
//!
//! A template is written as `x1xy1:x2xy2[~flags]` entries joined by `|`.
//! End coordinates are inclusive, so `0x0:1x1` covers a 2x2 block, and the
//! optional flags are a decimal bitmask of [`DispositionFlags`].

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, de};

use crate::error::DispositionError;

/// Capabilities of a frame slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DispositionFlags(u8);

impl DispositionFlags {
    pub const NONE: Self = Self(0x00);
    /// The frame is drawn as part of the wallpaper background.
    pub const BACKGROUND: Self = Self(0x01);
    /// The frame takes part in the transition rotation.
    pub const TRANSITION: Self = Self(0x02);
    pub const EFFECT: Self = Self(0x04);
    /// The frame is outlined with the configured border colour.
    pub const BORDER: Self = Self(0x08);
    pub const ALL: Self = Self(0x0F);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL.0 != 0 {
            None
        } else {
            Some(Self(bits))
        }
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for DispositionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// One frame slot in grid units.
///
/// The derived ordering compares `x`, `y`, `w`, `h` and then the flags, which
/// is the canonical order of entries inside a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Disposition {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub flags: DispositionFlags,
}

impl Disposition {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            flags: DispositionFlags::ALL,
        }
    }

    pub const fn with_flags(mut self, flags: DispositionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub const fn has(&self, flags: DispositionFlags) -> bool {
        self.flags.contains(flags)
    }

    fn parse_entry(raw: &str) -> Result<Self, DispositionError> {
        let malformed = || DispositionError::Malformed(raw.to_string());
        let (rect, flags) = match raw.split_once('~') {
            Some((rect, flags)) => {
                let bits: u8 = flags
                    .trim()
                    .parse()
                    .map_err(|_| DispositionError::Flags(flags.to_string()))?;
                let flags = DispositionFlags::from_bits(bits)
                    .ok_or_else(|| DispositionError::Flags(bits.to_string()))?;
                (rect, flags)
            }
            None => (raw, DispositionFlags::ALL),
        };
        let (start, end) = rect.split_once(':').ok_or_else(malformed)?;
        let (x1, y1) = parse_corner(start).ok_or_else(malformed)?;
        let (x2, y2) = parse_corner(end).ok_or_else(malformed)?;
        if x2 < x1 || y2 < y1 {
            return Err(DispositionError::Inverted(raw.to_string()));
        }
        Ok(Self {
            x: x1,
            y: y1,
            w: (x2 - x1).checked_add(1).ok_or_else(malformed)?,
            h: (y2 - y1).checked_add(1).ok_or_else(malformed)?,
            flags,
        })
    }
}

fn parse_corner(raw: &str) -> Option<(u32, u32)> {
    let (x, y) = raw.trim().split_once('x')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}:{}x{}",
            self.x,
            self.y,
            self.x.saturating_add(self.w.saturating_sub(1)),
            self.y.saturating_add(self.h.saturating_sub(1))
        )?;
        if self.flags != DispositionFlags::ALL {
            write!(f, "~{}", self.flags.bits())?;
        }
        Ok(())
    }
}

/// An ordered set of frame slots covering (part of) a grid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispositionTemplate {
    entries: Vec<Disposition>,
}

impl DispositionTemplate {
    pub fn new(mut entries: Vec<Disposition>) -> Self {
        entries.sort();
        Self { entries }
    }

    /// A single frame spanning the whole grid.
    pub fn full(cols: u32, rows: u32) -> Self {
        Self::new(vec![Disposition::new(0, 0, cols, rows)])
    }

    pub fn entries(&self) -> &[Disposition] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Occupancy matrix indexed `[row][col]`.
    pub fn coverage(&self, cols: u32, rows: u32) -> Result<Vec<Vec<bool>>, DispositionError> {
        let mut matrix = vec![vec![false; cols as usize]; rows as usize];
        for d in &self.entries {
            let fits = |start: u32, len: u32, limit: u32| {
                len > 0 && start.checked_add(len).is_some_and(|end| end <= limit)
            };
            if !fits(d.x, d.w, cols) || !fits(d.y, d.h, rows) {
                return Err(DispositionError::OutOfBounds {
                    x: d.x,
                    y: d.y,
                    w: d.w,
                    h: d.h,
                    cols,
                    rows,
                });
            }
            for y in d.y..d.y + d.h {
                for x in d.x..d.x + d.w {
                    let cell = &mut matrix[y as usize][x as usize];
                    if *cell {
                        return Err(DispositionError::Overlap { x, y });
                    }
                    *cell = true;
                }
            }
        }
        Ok(matrix)
    }

    pub fn validate(&self, cols: u32, rows: u32) -> Result<(), DispositionError> {
        if self.entries.is_empty() {
            return Err(DispositionError::Empty);
        }
        self.coverage(cols, rows).map(|_| ())
    }
}

impl FromStr for DispositionTemplate {
    type Err = DispositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let entries = s
            .split('|')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(Disposition::parse_entry)
            .collect::<Result<Vec<_>, _>>()?;
        if entries.is_empty() {
            return Err(DispositionError::Empty);
        }
        Ok(Self::new(entries))
    }
}

impl fmt::Display for DispositionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for DispositionTemplate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
