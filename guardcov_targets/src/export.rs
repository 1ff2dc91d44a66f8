//! Narrowing of the `u32` guards into byte maps, as expected by a harness' shared coverage map.

use libafl_bolts::Error;
use strum_macros::{Display, EnumString};

/// How a `u32` guard is written into a single byte of the map.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ExportMode {
    /// Keep the low byte of the counter, so `256` hits read as `0`.
    #[default]
    Truncate,
    /// Clamp the counter to `u8::MAX`.
    Saturate,
    /// `1` for every guard that was hit at least once, `0` otherwise.
    Edges,
}

impl ExportMode {
    /// Narrows a single guard.
    #[inline]
    #[must_use]
    pub fn narrow(self, guard: u32) -> u8 {
        match self {
            Self::Truncate => guard as u8,
            Self::Saturate => u8::try_from(guard).unwrap_or(u8::MAX),
            Self::Edges => u8::from(guard != 0),
        }
    }
}

/// Copies all `guards` into `map`, narrowing each one according to `mode`.
///
/// The map has to hold exactly one byte per guard; on a size mismatch nothing is written.
pub fn copy_guards_to_map(guards: &[u32], map: &mut [u8], mode: ExportMode) -> Result<(), Error> {
    if guards.len() != map.len() {
        return Err(Error::illegal_argument(format!(
            "Memory sizes don't match. map: {}, guards: {}",
            map.len(),
            guards.len()
        )));
    }
    for (byte, &guard) in map.iter_mut().zip(guards) {
        *byte = mode.narrow(guard);
    }
    Ok(())
}

/// The number of guards that were hit at least once.
#[must_use]
pub fn count_hit_guards(guards: &[u32]) -> usize {
    guards.iter().filter(|&&guard| guard != 0).count()
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use core::str::FromStr;

    use super::{copy_guards_to_map, count_hit_guards, ExportMode};

    const GUARDS: [u32; 6] = [0, 1, 255, 256, 300, u32::MAX];

    #[test]
    fn test_truncate() {
        let mut map = [0xaa; 6];
        copy_guards_to_map(&GUARDS, &mut map, ExportMode::Truncate).unwrap();
        assert_eq!(map, [0, 1, 255, 0, 44, 255]);
    }

    #[test]
    fn test_saturate() {
        let mut map = [0; 6];
        copy_guards_to_map(&GUARDS, &mut map, ExportMode::Saturate).unwrap();
        assert_eq!(map, [0, 1, 255, 255, 255, 255]);
    }

    #[test]
    fn test_edges() {
        let mut map = [0; 6];
        copy_guards_to_map(&GUARDS, &mut map, ExportMode::Edges).unwrap();
        assert_eq!(map, [0, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_size_mismatch() {
        let mut map = [7; 5];
        let err = copy_guards_to_map(&GUARDS, &mut map, ExportMode::default()).unwrap_err();
        assert!(err.to_string().contains("map: 5, guards: 6"));
        assert_eq!(map, [7; 5]);
    }

    #[test]
    fn test_empty() {
        let mut map: [u8; 0] = [];
        copy_guards_to_map(&[], &mut map, ExportMode::Edges).unwrap();
        assert_eq!(count_hit_guards(&[]), 0);
    }

    #[test]
    fn test_count_hit_guards() {
        assert_eq!(count_hit_guards(&GUARDS), 5);
        assert_eq!(count_hit_guards(&[0, 0, 0]), 0);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(ExportMode::from_str("truncate").unwrap(), ExportMode::Truncate);
        assert_eq!(ExportMode::from_str("saturate").unwrap(), ExportMode::Saturate);
        assert_eq!(ExportMode::from_str("edges").unwrap(), ExportMode::Edges);
        assert!(ExportMode::from_str("bitmap").is_err());
        assert_eq!(ExportMode::Saturate.to_string(), "saturate");
    }
}
