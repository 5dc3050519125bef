//! Landmark-pair distance deltas between two frames.
//!
//! A [`DeltaCatalog`] is an explicit table of named index pairs. For each
//! entry the delta is `distance(current pair) - distance(previous pair)`.
//! Entries store the pair measured on each frame separately so that the
//! historical table can be reproduced exactly, anomalies included.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geometry::{distance, Point2D};
use crate::landmarks::{FrameRole, LandmarkSet, LANDMARK_COUNT};

/// One named landmark pair in a delta catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaPair {
    /// Table key, e.g. `"21to33"`.
    pub key: &'static str,
    /// Action unit group this pair feeds, e.g. `"AU1"`.
    pub group: &'static str,
    /// Indices measured on the current frame.
    pub current: (usize, usize),
    /// Indices measured on the previous frame.
    pub previous: (usize, usize),
}

impl DeltaPair {
    const fn same(key: &'static str, group: &'static str, a: usize, b: usize) -> Self {
        Self {
            key,
            group,
            current: (a, b),
            previous: (a, b),
        }
    }

    const fn skewed(
        key: &'static str,
        group: &'static str,
        current: (usize, usize),
        previous: (usize, usize),
    ) -> Self {
        Self {
            key,
            group,
            current,
            previous,
        }
    }

    /// Whether both frames are measured on the same index pair.
    pub fn is_symmetric(&self) -> bool {
        self.current == self.previous
    }

    fn max_index(&self) -> usize {
        self.current
            .0
            .max(self.current.1)
            .max(self.previous.0)
            .max(self.previous.1)
    }

    /// Signed distance change for this pair. Both sets must already be
    /// checked against [`DeltaCatalog::required_len`].
    fn delta_unchecked(&self, current: &[Point2D], previous: &[Point2D]) -> f32 {
        let now = distance(current[self.current.0], current[self.current.1]);
        let before = distance(previous[self.previous.0], previous[self.previous.1]);
        now - before
    }

    /// Signed distance change for this pair, with bounds checks.
    pub fn delta(&self, current: &LandmarkSet, previous: &LandmarkSet) -> Result<f32, CoreError> {
        let required = self.max_index() + 1;
        check_len(FrameRole::Current, current, required)?;
        check_len(FrameRole::Previous, previous, required)?;
        Ok(self.delta_unchecked(current.points(), previous.points()))
    }
}

/// The historical pair table, reproduced literally.
///
/// Three entries do not measure what their key says:
/// `23to33` compares (27,33) now against (23,33) before, `26to45` repeats
/// the (17,36) measurement, and `33to44` measures (44,44) now, which is
/// always zero, against (33,44) before.
pub const REFERENCE_PAIRS: &[DeltaPair] = &[
    // AU1 inner brow raiser
    DeltaPair::same("21to33", "AU1", 21, 33),
    DeltaPair::same("22to33", "AU1", 22, 33),
    DeltaPair::same("20to33", "AU1", 20, 33),
    DeltaPair::skewed("23to33", "AU1", (27, 33), (23, 33)),
    // AU2 outer brow raiser
    DeltaPair::same("17to36", "AU2", 17, 36),
    DeltaPair::skewed("26to45", "AU2", (17, 36), (17, 36)),
    // AU4 brow lowerer
    DeltaPair::same("21to22", "AU4", 21, 22),
    DeltaPair::same("20to23", "AU4", 20, 23),
    // AU5 upper lid raiser
    DeltaPair::same("33to38", "AU5", 33, 38),
    DeltaPair::same("33to37", "AU5", 33, 37),
    DeltaPair::same("33to43", "AU5", 33, 43),
    DeltaPair::skewed("33to44", "AU5", (44, 44), (33, 44)),
    // AU7 lid tightener
    DeltaPair::same("27to40", "AU7", 27, 40),
    DeltaPair::same("27to47", "AU7", 27, 47),
    // AU12 lip corner puller
    DeltaPair::same("36to48", "AU12", 36, 48),
    DeltaPair::same("45to54", "AU12", 45, 54),
    // AU15 lip corner depressor
    DeltaPair::same("5to48", "AU15", 5, 48),
    DeltaPair::same("11to54", "AU15", 11, 54),
    // AU16 lower lip depressor
    DeltaPair::same("33to57", "AU16", 33, 57),
    DeltaPair::same("33to56", "AU16", 33, 56),
    DeltaPair::same("33to58", "AU16", 33, 58),
    // AU24 lip pressor
    DeltaPair::same("50to61", "AU24", 50, 61),
    DeltaPair::same("51to62", "AU24", 51, 62),
    DeltaPair::same("52to63", "AU24", 52, 63),
    // AU25/AU26 lips part, jaw drop
    DeltaPair::same("61to67", "AU26", 61, 67),
    DeltaPair::same("62to66", "AU26", 62, 66),
    DeltaPair::same("63to65", "AU26", 63, 65),
    // AU27 mouth stretch
    DeltaPair::same("8to33", "AU27", 8, 33),
    DeltaPair::same("7to33", "AU27", 7, 33),
    DeltaPair::same("9to33", "AU27", 9, 33),
];

/// The reference table with every key measuring the pair it names.
pub const CORRECTED_PAIRS: &[DeltaPair] = &[
    DeltaPair::same("21to33", "AU1", 21, 33),
    DeltaPair::same("22to33", "AU1", 22, 33),
    DeltaPair::same("20to33", "AU1", 20, 33),
    DeltaPair::same("23to33", "AU1", 23, 33),
    DeltaPair::same("17to36", "AU2", 17, 36),
    DeltaPair::same("26to45", "AU2", 26, 45),
    DeltaPair::same("21to22", "AU4", 21, 22),
    DeltaPair::same("20to23", "AU4", 20, 23),
    DeltaPair::same("33to38", "AU5", 33, 38),
    DeltaPair::same("33to37", "AU5", 33, 37),
    DeltaPair::same("33to43", "AU5", 33, 43),
    DeltaPair::same("33to44", "AU5", 33, 44),
    DeltaPair::same("27to40", "AU7", 27, 40),
    DeltaPair::same("27to47", "AU7", 27, 47),
    DeltaPair::same("36to48", "AU12", 36, 48),
    DeltaPair::same("45to54", "AU12", 45, 54),
    DeltaPair::same("5to48", "AU15", 5, 48),
    DeltaPair::same("11to54", "AU15", 11, 54),
    DeltaPair::same("33to57", "AU16", 33, 57),
    DeltaPair::same("33to56", "AU16", 33, 56),
    DeltaPair::same("33to58", "AU16", 33, 58),
    DeltaPair::same("50to61", "AU24", 50, 61),
    DeltaPair::same("51to62", "AU24", 51, 62),
    DeltaPair::same("52to63", "AU24", 52, 63),
    DeltaPair::same("61to67", "AU26", 61, 67),
    DeltaPair::same("62to66", "AU26", 62, 66),
    DeltaPair::same("63to65", "AU26", 63, 65),
    DeltaPair::same("8to33", "AU27", 8, 33),
    DeltaPair::same("7to33", "AU27", 7, 33),
    DeltaPair::same("9to33", "AU27", 9, 33),
];

/// Which shipped pair table to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    #[default]
    Reference,
    Corrected,
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogKind::Reference => f.write_str("reference"),
            CatalogKind::Corrected => f.write_str("corrected"),
        }
    }
}

impl FromStr for CatalogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reference" => Ok(CatalogKind::Reference),
            "corrected" => Ok(CatalogKind::Corrected),
            other => Err(format!(
                "unknown catalog {other:?} (expected \"reference\" or \"corrected\")"
            )),
        }
    }
}

/// An inspectable table of named landmark pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaCatalog {
    kind: CatalogKind,
    pairs: &'static [DeltaPair],
}

impl DeltaCatalog {
    pub fn reference() -> Self {
        Self {
            kind: CatalogKind::Reference,
            pairs: REFERENCE_PAIRS,
        }
    }

    pub fn corrected() -> Self {
        Self {
            kind: CatalogKind::Corrected,
            pairs: CORRECTED_PAIRS,
        }
    }

    pub fn from_kind(kind: CatalogKind) -> Self {
        match kind {
            CatalogKind::Reference => Self::reference(),
            CatalogKind::Corrected => Self::corrected(),
        }
    }

    pub fn kind(&self) -> CatalogKind {
        self.kind
    }

    pub fn pairs(&self) -> &'static [DeltaPair] {
        self.pairs
    }

    pub fn pair(&self, key: &str) -> Option<&'static DeltaPair> {
        self.pairs.iter().find(|p| p.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pair(key).is_some()
    }

    /// Minimum landmark set length accepted by [`DeltaCatalog::compute`].
    pub fn required_len(&self) -> usize {
        let max_referenced = self
            .pairs
            .iter()
            .map(|p| p.max_index() + 1)
            .max()
            .unwrap_or(0);
        max_referenced.max(LANDMARK_COUNT)
    }

    /// Compute the delta for every catalog entry.
    pub fn compute(
        &self,
        current: &LandmarkSet,
        previous: &LandmarkSet,
    ) -> Result<DeltaTable, CoreError> {
        let required = self.required_len();
        check_len(FrameRole::Current, current, required)?;
        check_len(FrameRole::Previous, previous, required)?;

        let entries = self
            .pairs
            .iter()
            .map(|pair| {
                (
                    pair.key,
                    pair.delta_unchecked(current.points(), previous.points()),
                )
            })
            .collect();

        Ok(DeltaTable { entries })
    }
}

impl Default for DeltaCatalog {
    fn default() -> Self {
        Self::reference()
    }
}

fn check_len(role: FrameRole, set: &LandmarkSet, required: usize) -> Result<(), CoreError> {
    if set.len() < required {
        return Err(CoreError::InsufficientLandmarks {
            role,
            found: set.len(),
            required,
        });
    }
    Ok(())
}

/// Signed per-pair distance changes for one frame transition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeltaTable {
    entries: Vec<(&'static str, f32)>,
}

impl DeltaTable {
    /// Build a table directly, e.g. for exercising rules without landmarks.
    pub fn from_entries(entries: Vec<(&'static str, f32)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Result<f32, CoreError> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .ok_or_else(|| CoreError::UnknownDeltaKey(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::neutral_face;

    #[test]
    fn test_identical_sets_give_zero_deltas() {
        let face = neutral_face();
        let table = DeltaCatalog::corrected().compute(&face, &face).unwrap();
        assert_eq!(table.len(), CORRECTED_PAIRS.len());
        for (key, value) in table.iter() {
            assert_eq!(value, 0.0, "{key} should not move");
        }
    }

    #[test]
    fn test_reference_identical_sets_only_skewed_entries_move() {
        let face = neutral_face();
        let table = DeltaCatalog::reference().compute(&face, &face).unwrap();
        for pair in REFERENCE_PAIRS {
            let value = table.get(pair.key).unwrap();
            if pair.is_symmetric() {
                assert_eq!(value, 0.0, "{} should not move", pair.key);
            }
        }

        // (44,44) is always zero, so this is minus the previous (33,44) distance.
        let expected = -distance(face.get(33).unwrap(), face.get(44).unwrap());
        assert_eq!(table.get("33to44").unwrap(), expected);

        let expected = distance(face.get(27).unwrap(), face.get(33).unwrap())
            - distance(face.get(23).unwrap(), face.get(33).unwrap());
        assert_eq!(table.get("23to33").unwrap(), expected);
    }

    #[test]
    fn test_reference_anomalies_are_literal() {
        let catalog = DeltaCatalog::reference();
        let p = catalog.pair("23to33").unwrap();
        assert_eq!((p.current, p.previous), ((27, 33), (23, 33)));
        let p = catalog.pair("26to45").unwrap();
        assert_eq!((p.current, p.previous), ((17, 36), (17, 36)));
        let p = catalog.pair("33to44").unwrap();
        assert_eq!((p.current, p.previous), ((44, 44), (33, 44)));

        let skewed: Vec<_> = REFERENCE_PAIRS
            .iter()
            .filter(|p| !p.is_symmetric())
            .map(|p| p.key)
            .collect();
        assert_eq!(skewed, vec!["23to33", "33to44"]);
    }

    #[test]
    fn test_catalogs_share_keys_in_order() {
        let reference: Vec<_> = REFERENCE_PAIRS.iter().map(|p| (p.key, p.group)).collect();
        let corrected: Vec<_> = CORRECTED_PAIRS.iter().map(|p| (p.key, p.group)).collect();
        assert_eq!(reference, corrected);
        assert_eq!(reference.len(), 30);
    }

    #[test]
    fn test_corrected_keys_name_their_indices() {
        for pair in CORRECTED_PAIRS {
            let (a, b) = pair.current;
            assert_eq!(pair.key, format!("{a}to{b}"));
            assert!(pair.is_symmetric());
        }
    }

    #[test]
    fn test_single_pair_delta() {
        let previous = neutral_face();
        let a = previous.get(36).unwrap();
        let current = previous.with_point(48, a);
        let pair = DeltaCatalog::corrected().pair("36to48").unwrap();
        let delta = pair.delta(&current, &previous).unwrap();
        assert_eq!(delta, -distance(a, previous.get(48).unwrap()));
    }

    #[test]
    fn test_order_independent() {
        let previous = neutral_face();
        let current = previous
            .with_point(21, Point2D::new(10.0, 12.0))
            .with_point(57, Point2D::new(300.0, 410.0))
            .with_point(63, Point2D::new(290.0, 380.0));

        for catalog in [DeltaCatalog::reference(), DeltaCatalog::corrected()] {
            let table = catalog.compute(&current, &previous).unwrap();
            for pair in catalog.pairs().iter().rev() {
                let alone = pair.delta(&current, &previous).unwrap();
                assert_eq!(table.get(pair.key).unwrap(), alone);
            }
        }
    }

    #[test]
    fn test_short_current_set_rejected() {
        let previous = neutral_face();
        let current = LandmarkSet::new(previous.points()[..40].to_vec());
        let err = DeltaCatalog::reference()
            .compute(&current, &previous)
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientLandmarks {
                role: FrameRole::Current,
                found: 40,
                required: LANDMARK_COUNT,
            }
        );
    }

    #[test]
    fn test_empty_previous_set_rejected() {
        let current = neutral_face();
        let err = DeltaCatalog::corrected()
            .compute(&current, &LandmarkSet::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientLandmarks {
                role: FrameRole::Previous,
                found: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_pair_delta_checks_bounds() {
        let short = LandmarkSet::new(vec![Point2D::new(0.0, 0.0); 30]);
        let pair = DeltaCatalog::reference().pair("36to48").unwrap();
        let err = pair.delta(&short, &short).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientLandmarks { required: 49, .. }
        ));
    }

    #[test]
    fn test_unknown_key() {
        let table = DeltaTable::from_entries(vec![("21to33", 1.0)]);
        assert_eq!(table.get("21to33").unwrap(), 1.0);
        assert_eq!(
            table.get("99to100").unwrap_err(),
            CoreError::UnknownDeltaKey("99to100".to_string())
        );
    }

    #[test]
    fn test_catalog_kind_parse() {
        assert_eq!("reference".parse::<CatalogKind>(), Ok(CatalogKind::Reference));
        assert_eq!(" Corrected ".parse::<CatalogKind>(), Ok(CatalogKind::Corrected));
        assert!("fixed".parse::<CatalogKind>().is_err());
        assert_eq!(DeltaCatalog::default().kind(), CatalogKind::Reference);
    }
}
