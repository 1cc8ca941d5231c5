//! Vertical level model and level code conversion.
//!
//! Record stores encode vertical levels as integers. Two encodings are in
//! circulation: the primary one stores the level value (scaled for the
//! fractional coordinate types) inside a per-type band, the alternate one
//! stores the value times 100 in the upper half of the same band. Files
//! may use either, so lookups try both in order (see
//! [`ENCODING_STRATEGIES`]).

use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FieldResult};

/// Vertical coordinate type of a level set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelType {
    /// Isobaric levels in hPa.
    Pressure,
    /// Height above ground in metres.
    Height,
    /// Terrain-following sigma coordinate, 0..1.
    Sigma,
    /// Eta coordinate, 0..1.
    Eta,
    /// Hybrid model level number.
    Hybrid,
}

impl LevelType {
    /// Get the level type as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pressure => "pressure",
            Self::Height => "height",
            Self::Sigma => "sigma",
            Self::Eta => "eta",
            Self::Hybrid => "hybrid",
        }
    }

    /// The equivalent type used when comparing grid signatures.
    ///
    /// Sigma and eta level sets are interchangeable for definition
    /// sharing; the normalization applies nowhere else.
    pub fn signature_equivalent(self) -> Self {
        match self {
            Self::Sigma => Self::Eta,
            other => other,
        }
    }

    fn band_index(self) -> i32 {
        match self {
            Self::Pressure => 0,
            Self::Height => 1,
            Self::Sigma => 2,
            Self::Eta => 3,
            Self::Hybrid => 4,
        }
    }

    fn from_band(band: i32) -> Option<Self> {
        match band {
            0 => Some(Self::Pressure),
            1 => Some(Self::Height),
            2 => Some(Self::Sigma),
            3 => Some(Self::Eta),
            4 => Some(Self::Hybrid),
            _ => None,
        }
    }

    /// Scale applied to level values under the primary encoding.
    fn primary_scale(self) -> f64 {
        match self {
            Self::Sigma | Self::Eta => 10_000.0,
            _ => 1.0,
        }
    }
}

impl std::fmt::Display for LevelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which of the two level encodings a code is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelEncoding {
    /// Level value stored directly (scaled for fractional types).
    Primary,
    /// Level value times 100, offset into the upper half of the band.
    Alternate,
}

impl LevelEncoding {
    /// Get the encoding as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Alternate => "alternate",
        }
    }
}

impl std::fmt::Display for LevelEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lookup order when resolving a level against a record store.
pub const ENCODING_STRATEGIES: [LevelEncoding; 2] =
    [LevelEncoding::Primary, LevelEncoding::Alternate];

/// Width of the per-type code band.
const BAND: i32 = 1_000_000;
/// Offset of alternate-encoded values within a band.
const ALTERNATE_OFFSET: i32 = 500_000;

/// Encode a level value as an integer code.
pub fn level_to_code(level: f64, level_type: LevelType, encoding: LevelEncoding) -> i32 {
    let band = level_type.band_index() * BAND;
    match encoding {
        LevelEncoding::Primary => band + (level * level_type.primary_scale()).round() as i32,
        LevelEncoding::Alternate => band + ALTERNATE_OFFSET + (level * 100.0).round() as i32,
    }
}

/// Decode an integer level code into value, type, and encoding.
pub fn code_to_level(code: i32) -> FieldResult<(f64, LevelType, LevelEncoding)> {
    if code < 0 {
        return Err(FieldError::InvalidLevelCode(code));
    }
    let level_type =
        LevelType::from_band(code / BAND).ok_or(FieldError::InvalidLevelCode(code))?;
    let rem = code % BAND;
    if rem >= ALTERNATE_OFFSET {
        Ok((
            (rem - ALTERNATE_OFFSET) as f64 / 100.0,
            level_type,
            LevelEncoding::Alternate,
        ))
    } else {
        Ok((
            rem as f64 / level_type.primary_scale(),
            level_type,
            LevelEncoding::Primary,
        ))
    }
}

/// Ordered, de-duplicated level list of a grid, with its level type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalReference {
    levels: Vec<f64>,
    level_type: LevelType,
}

impl VerticalReference {
    /// Relative tolerance when matching level values.
    const LEVEL_EPS: f64 = 1e-6;

    /// Build from explicit level values; sorts ascending and drops
    /// duplicates.
    pub fn new(mut levels: Vec<f64>, level_type: LevelType) -> Self {
        levels.sort_by(|a, b| a.total_cmp(b));
        levels.dedup_by(|a, b| Self::levels_equal(*a, *b));
        Self { levels, level_type }
    }

    /// Build from the level codes of a record set.
    ///
    /// All codes must decode to the same level type regardless of which
    /// encoding each is expressed in.
    pub fn from_codes(codes: &[i32]) -> FieldResult<Self> {
        let mut levels = Vec::with_capacity(codes.len());
        let mut level_type: Option<LevelType> = None;
        for &code in codes {
            let (level, ltype, _) = code_to_level(code)?;
            match level_type {
                None => level_type = Some(ltype),
                Some(seen) if seen != ltype => {
                    return Err(FieldError::MixedLevelTypes(format!(
                        "{} and {}",
                        seen, ltype
                    )));
                }
                Some(_) => {}
            }
            levels.push(level);
        }
        let level_type = level_type.ok_or_else(|| {
            FieldError::invalid_metadata("record set has no levels")
        })?;
        Ok(Self::new(levels, level_type))
    }

    /// The sorted unique level values.
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// The vertical coordinate type.
    pub fn level_type(&self) -> LevelType {
        self.level_type
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the level list is empty.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Lowest level value.
    pub fn first(&self) -> Option<f64> {
        self.levels.first().copied()
    }

    /// Highest level value.
    pub fn last(&self) -> Option<f64> {
        self.levels.last().copied()
    }

    /// Index of a level value, within tolerance.
    pub fn index_of(&self, level: f64) -> Option<usize> {
        self.levels
            .iter()
            .position(|&l| Self::levels_equal(l, level))
    }

    /// Whether the reference contains a level value.
    pub fn contains(&self, level: f64) -> bool {
        self.index_of(level).is_some()
    }

    fn levels_equal(a: f64, b: f64) -> bool {
        (a - b).abs() <= Self::LEVEL_EPS * a.abs().max(b.abs()).max(1.0)
    }
}
