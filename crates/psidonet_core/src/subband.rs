//! Wavelet subband identifiers and the composite filter key.
//!
//! A filter dictionary maps a `(source subband, target subband)` pair to one
//! convolution kernel. Strings only appear at serialization boundaries via
//! `Display` / `FromStr`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PsidoError, Result};

/// Orientation of a wavelet subband.
///
/// `Vertical` is the band that is high-pass along axis 0 (rows) and
/// `Horizontal` the band that is high-pass along axis 1 (columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "h")]
    Horizontal,
    #[serde(rename = "v")]
    Vertical,
    #[serde(rename = "d")]
    Diagonal,
    #[serde(rename = "l")]
    LowPass,
}

impl Orientation {
    /// One-letter code used in filter keys.
    pub fn code(self) -> char {
        match self {
            Orientation::Horizontal => 'h',
            Orientation::Vertical => 'v',
            Orientation::Diagonal => 'd',
            Orientation::LowPass => 'l',
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "h" => Some(Orientation::Horizontal),
            "v" => Some(Orientation::Vertical),
            "d" => Some(Orientation::Diagonal),
            "l" => Some(Orientation::LowPass),
            _ => None,
        }
    }
}

/// Order in which source subbands are visited when building bowties.
pub const SOURCE_ORDER: [Orientation; 4] = [
    Orientation::LowPass,
    Orientation::Vertical,
    Orientation::Diagonal,
    Orientation::Horizontal,
];

/// Order in which target blocks are extracted from a bowtie response.
pub const TARGET_ORDER: [Orientation; 4] = [
    Orientation::Vertical,
    Orientation::Horizontal,
    Orientation::Diagonal,
    Orientation::LowPass,
];

/// Order used for parameter allocation (seed assignment) and splitting.
pub const PARAMETER_ORDER: [Orientation; 4] = [
    Orientation::Horizontal,
    Orientation::Diagonal,
    Orientation::Vertical,
    Orientation::LowPass,
];

/// One subband of a dyadic 2D wavelet decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Subband {
    pub level: usize,
    pub orientation: Orientation,
}

impl Subband {
    pub fn new(level: usize, orientation: Orientation) -> Self {
        Self { level, orientation }
    }

    /// Check the subband against a decomposition of depth `decomp_levels`:
    /// the level must lie in `1..=decomp_levels` and low-pass is only allowed
    /// at the coarsest level.
    pub fn validate(&self, decomp_levels: usize) -> Result<()> {
        if self.level == 0 || self.level > decomp_levels {
            return Err(PsidoError::InvalidLevel(format!(
                "subband level {} outside 1..={}",
                self.level, decomp_levels
            )));
        }
        if self.orientation == Orientation::LowPass && self.level != decomp_levels {
            return Err(PsidoError::InvalidSubband(format!(
                "low-pass band requested at level {} but the coarsest level is {}",
                self.level, decomp_levels
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Subband {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.level, self.orientation.code())
    }
}

/// Subbands kept by the low-pass skip rule, visited level by level (finest
/// first) and, within a level, in `order`.
pub fn kept_subbands(decomp_levels: usize, order: &[Orientation]) -> Vec<Subband> {
    let mut kept = Vec::new();
    for level in 1..=decomp_levels {
        for &orientation in order {
            if level < decomp_levels && orientation == Orientation::LowPass {
                continue;
            }
            kept.push(Subband::new(level, orientation));
        }
    }
    kept
}

/// Key of one filter block inside a dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKey {
    /// The single filter of an undecomposed (level 0) dictionary.
    Image,
    /// Filter mapping `source` coefficients onto the `target` subband.
    Subbands { source: Subband, target: Subband },
}

impl FilterKey {
    pub fn pair(source: Subband, target: Subband) -> Self {
        FilterKey::Subbands { source, target }
    }

    /// Every key of a dictionary of depth `decomp_levels`, in the given
    /// orientation orders.
    pub fn all(
        decomp_levels: usize,
        source_order: &[Orientation],
        target_order: &[Orientation],
    ) -> Vec<FilterKey> {
        if decomp_levels == 0 {
            return vec![FilterKey::Image];
        }
        let targets = kept_subbands(decomp_levels, target_order);
        kept_subbands(decomp_levels, source_order)
            .into_iter()
            .flat_map(|source| {
                targets
                    .iter()
                    .map(move |&target| FilterKey::pair(source, target))
            })
            .collect()
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKey::Image => write!(f, "F_0_0_0"),
            FilterKey::Subbands { source, target } => write!(f, "F_{}_{}", source, target),
        }
    }
}

impl FromStr for FilterKey {
    type Err = PsidoError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "F_0_0_0" {
            return Ok(FilterKey::Image);
        }
        let invalid = || PsidoError::InvalidKey(s.to_string());
        let parts: Vec<&str> = s.split('_').collect();
        if parts.len() != 5 || parts[0] != "F" {
            return Err(invalid());
        }
        let subband = |level: &str, code: &str| -> Result<Subband> {
            let level = level.parse::<usize>().map_err(|_| invalid())?;
            let orientation = Orientation::from_code(code).ok_or_else(invalid)?;
            Ok(Subband::new(level, orientation))
        };
        Ok(FilterKey::pair(
            subband(parts[1], parts[2])?,
            subband(parts[3], parts[4])?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kept_subbands_skip_rule() {
        let kept = kept_subbands(2, &TARGET_ORDER);
        let names: Vec<String> = kept.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, ["1_v", "1_h", "1_d", "2_v", "2_h", "2_d", "2_l"]);
    }

    #[test]
    fn test_kept_subband_count() {
        for levels in 1..6 {
            assert_eq!(
                kept_subbands(levels, &SOURCE_ORDER).len(),
                3 * (levels - 1) + 4
            );
        }
        assert!(kept_subbands(0, &SOURCE_ORDER).is_empty());
    }

    #[test]
    fn test_key_display() {
        let key = FilterKey::pair(
            Subband::new(1, Orientation::Vertical),
            Subband::new(2, Orientation::LowPass),
        );
        assert_eq!(key.to_string(), "F_1_v_2_l");
        assert_eq!(FilterKey::Image.to_string(), "F_0_0_0");
    }

    #[test]
    fn test_key_parse() {
        let key: FilterKey = "F_3_d_1_h".parse().unwrap();
        assert_eq!(
            key,
            FilterKey::pair(
                Subband::new(3, Orientation::Diagonal),
                Subband::new(1, Orientation::Horizontal)
            )
        );
        assert_eq!("F_0_0_0".parse::<FilterKey>().unwrap(), FilterKey::Image);
    }

    #[test]
    fn test_key_parse_rejects_garbage() {
        for bad in ["", "F_1_v_2", "G_1_v_2_h", "F_1_x_2_h", "F_a_v_2_h", "F_1_v_2_h_3"] {
            assert!(
                matches!(bad.parse::<FilterKey>(), Err(PsidoError::InvalidKey(_))),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn test_all_keys() {
        assert_eq!(FilterKey::all(0, &SOURCE_ORDER, &TARGET_ORDER), [FilterKey::Image]);
        assert_eq!(FilterKey::all(2, &SOURCE_ORDER, &TARGET_ORDER).len(), 49);
        assert_eq!(FilterKey::all(3, &PARAMETER_ORDER, &PARAMETER_ORDER).len(), 100);
    }

    #[test]
    fn test_subband_validate() {
        assert!(Subband::new(2, Orientation::LowPass).validate(2).is_ok());
        assert!(Subband::new(1, Orientation::Diagonal).validate(2).is_ok());
        assert!(matches!(
            Subband::new(1, Orientation::LowPass).validate(2),
            Err(PsidoError::InvalidSubband(_))
        ));
        assert!(matches!(
            Subband::new(3, Orientation::Vertical).validate(2),
            Err(PsidoError::InvalidLevel(_))
        ));
        assert!(matches!(
            Subband::new(0, Orientation::Vertical).validate(2),
            Err(PsidoError::InvalidLevel(_))
        ));
    }
}
