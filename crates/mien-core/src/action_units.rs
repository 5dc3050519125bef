//! Action unit predicates over a [`DeltaTable`].
//!
//! Each unit is a static [`Condition`] tree whose leaves are sign tests on
//! named deltas. The same tree type, with units as leaves, describes the
//! decision rules in [`crate::classifier`].

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::delta::{DeltaCatalog, DeltaTable};
use crate::error::CoreError;

/// A boolean expression over leaves of type `L`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition<L: 'static> {
    Leaf(L),
    All(&'static [Condition<L>]),
    Any(&'static [Condition<L>]),
}

impl<L: Copy> Condition<L> {
    /// Evaluate the tree. Every operand is visited, so a leaf error surfaces
    /// no matter how the other operands turn out.
    pub fn evaluate<F, E>(&self, leaf: &mut F) -> Result<bool, E>
    where
        F: FnMut(L) -> Result<bool, E>,
    {
        match self {
            Condition::Leaf(l) => leaf(*l),
            Condition::All(operands) => operands
                .iter()
                .try_fold(true, |acc, c| c.evaluate(&mut *leaf).map(|v| acc && v)),
            Condition::Any(operands) => operands
                .iter()
                .try_fold(false, |acc, c| c.evaluate(&mut *leaf).map(|v| acc || v)),
        }
    }

    /// All leaves in depth-first order.
    pub fn leaves(&self) -> Vec<L> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<L>) {
        match self {
            Condition::Leaf(l) => out.push(*l),
            Condition::All(operands) | Condition::Any(operands) => {
                for c in operands.iter() {
                    c.collect_leaves(out);
                }
            }
        }
    }
}

/// Sign test on one named delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaSign {
    /// `delta > 0`
    Rises(&'static str),
    /// `delta < 0`
    Falls(&'static str),
}

impl DeltaSign {
    pub fn key(&self) -> &'static str {
        match self {
            DeltaSign::Rises(key) | DeltaSign::Falls(key) => key,
        }
    }

    pub fn test(&self, table: &DeltaTable) -> Result<bool, CoreError> {
        match self {
            DeltaSign::Rises(key) => Ok(table.get(key)? > 0.0),
            DeltaSign::Falls(key) => Ok(table.get(key)? < 0.0),
        }
    }
}

use Condition::{All, Leaf};
use DeltaSign::{Falls, Rises};

const AU1: Condition<DeltaSign> = All(&[
    Leaf(Rises("21to33")),
    Leaf(Rises("22to33")),
    Leaf(Rises("20to33")),
    Leaf(Rises("23to33")),
]);

const AU2: Condition<DeltaSign> = All(&[Leaf(Rises("17to36")), Leaf(Rises("26to45"))]);

const AU4: Condition<DeltaSign> = All(&[Leaf(Falls("21to22")), Leaf(Falls("20to23"))]);

const AU5: Condition<DeltaSign> = All(&[
    Leaf(Rises("33to38")),
    Leaf(Rises("33to37")),
    Leaf(Rises("33to43")),
    Leaf(Rises("33to44")),
]);

const AU7: Condition<DeltaSign> = All(&[Leaf(Falls("27to40")), Leaf(Falls("27to47"))]);

// Nose wrinkler: brows pulled together and down toward the nose.
const AU9: Condition<DeltaSign> = All(&[AU4, Leaf(Falls("21to33")), Leaf(Falls("22to33"))]);

const AU12: Condition<DeltaSign> = All(&[Leaf(Falls("36to48")), Leaf(Falls("45to54"))]);

const AU15: Condition<DeltaSign> = All(&[Leaf(Falls("5to48")), Leaf(Falls("11to54"))]);

const AU16: Condition<DeltaSign> = All(&[
    Leaf(Rises("33to56")),
    Leaf(Rises("33to57")),
    Leaf(Rises("33to58")),
]);

const AU23: Condition<DeltaSign> = All(&[
    Leaf(Falls("61to67")),
    Leaf(Falls("62to66")),
    Leaf(Falls("63to65")),
]);

const AU24: Condition<DeltaSign> = All(&[
    Leaf(Falls("50to61")),
    Leaf(Falls("51to62")),
    Leaf(Falls("52to63")),
]);

const AU26: Condition<DeltaSign> = All(&[
    Leaf(Rises("61to67")),
    Leaf(Rises("62to66")),
    Leaf(Rises("63to65")),
]);

const AU27: Condition<DeltaSign> = All(&[
    Leaf(Rises("8to33")),
    Leaf(Rises("7to33")),
    Leaf(Rises("9to33")),
]);

/// Heuristic facial action units, named after their FACS numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionUnit {
    AU1,
    AU2,
    AU4,
    AU5,
    AU7,
    AU9,
    AU12,
    AU15,
    AU16,
    AU23,
    AU24,
    AU26,
    AU27,
}

impl ActionUnit {
    pub const ALL: [ActionUnit; 13] = [
        ActionUnit::AU1,
        ActionUnit::AU2,
        ActionUnit::AU4,
        ActionUnit::AU5,
        ActionUnit::AU7,
        ActionUnit::AU9,
        ActionUnit::AU12,
        ActionUnit::AU15,
        ActionUnit::AU16,
        ActionUnit::AU23,
        ActionUnit::AU24,
        ActionUnit::AU26,
        ActionUnit::AU27,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionUnit::AU1 => "AU1",
            ActionUnit::AU2 => "AU2",
            ActionUnit::AU4 => "AU4",
            ActionUnit::AU5 => "AU5",
            ActionUnit::AU7 => "AU7",
            ActionUnit::AU9 => "AU9",
            ActionUnit::AU12 => "AU12",
            ActionUnit::AU15 => "AU15",
            ActionUnit::AU16 => "AU16",
            ActionUnit::AU23 => "AU23",
            ActionUnit::AU24 => "AU24",
            ActionUnit::AU26 => "AU26",
            ActionUnit::AU27 => "AU27",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ActionUnit::AU1 => "inner brow raiser",
            ActionUnit::AU2 => "outer brow raiser",
            ActionUnit::AU4 => "brow lowerer",
            ActionUnit::AU5 => "upper lid raiser",
            ActionUnit::AU7 => "lid tightener",
            ActionUnit::AU9 => "nose wrinkler",
            ActionUnit::AU12 => "lip corner puller",
            ActionUnit::AU15 => "lip corner depressor",
            ActionUnit::AU16 => "lower lip depressor",
            ActionUnit::AU23 => "lip tightener",
            ActionUnit::AU24 => "lip pressor",
            ActionUnit::AU26 => "jaw drop",
            ActionUnit::AU27 => "mouth stretch",
        }
    }

    pub fn condition(self) -> Condition<DeltaSign> {
        match self {
            ActionUnit::AU1 => AU1,
            ActionUnit::AU2 => AU2,
            ActionUnit::AU4 => AU4,
            ActionUnit::AU5 => AU5,
            ActionUnit::AU7 => AU7,
            ActionUnit::AU9 => AU9,
            ActionUnit::AU12 => AU12,
            ActionUnit::AU15 => AU15,
            ActionUnit::AU16 => AU16,
            ActionUnit::AU23 => AU23,
            ActionUnit::AU24 => AU24,
            ActionUnit::AU26 => AU26,
            ActionUnit::AU27 => AU27,
        }
    }

    pub fn evaluate(self, table: &DeltaTable) -> Result<bool, CoreError> {
        self.condition().evaluate(&mut |sign: DeltaSign| sign.test(table))
    }

    /// Fail with [`CoreError::UnknownDeltaKey`] if any unit reads a key the
    /// catalog does not provide.
    pub fn check_catalog(catalog: &DeltaCatalog) -> Result<(), CoreError> {
        for unit in Self::ALL {
            for sign in unit.condition().leaves() {
                if !catalog.contains(sign.key()) {
                    return Err(CoreError::UnknownDeltaKey(sign.key().to_string()));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for ActionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of action units that hold for one frame transition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveUnits {
    units: BTreeSet<ActionUnit>,
}

impl ActiveUnits {
    /// Evaluate every unit against `table`.
    pub fn evaluate(table: &DeltaTable) -> Result<Self, CoreError> {
        let mut units = BTreeSet::new();
        for unit in ActionUnit::ALL {
            if unit.evaluate(table)? {
                units.insert(unit);
            }
        }
        Ok(Self { units })
    }

    pub fn from_units(units: &[ActionUnit]) -> Self {
        Self {
            units: units.iter().copied().collect(),
        }
    }

    pub fn is_active(&self, unit: ActionUnit) -> bool {
        self.units.contains(&unit)
    }

    pub fn iter(&self) -> impl Iterator<Item = ActionUnit> + '_ {
        self.units.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::neutral_face;
    use crate::Point2D;

    /// Every catalog key at zero, then the given overrides.
    fn table_with(overrides: &[(&'static str, f32)]) -> DeltaTable {
        let entries = DeltaCatalog::reference()
            .pairs()
            .iter()
            .map(|p| {
                let value = overrides
                    .iter()
                    .find(|(k, _)| *k == p.key)
                    .map(|(_, v)| *v)
                    .unwrap_or(0.0);
                (p.key, value)
            })
            .collect();
        DeltaTable::from_entries(entries)
    }

    #[test]
    fn test_zero_deltas_activate_nothing() {
        let active = ActiveUnits::evaluate(&table_with(&[])).unwrap();
        assert!(active.is_empty());
    }

    #[test]
    fn test_identical_frames_activate_nothing() {
        let face = neutral_face();
        for catalog in [DeltaCatalog::reference(), DeltaCatalog::corrected()] {
            let table = catalog.compute(&face, &face).unwrap();
            let active = ActiveUnits::evaluate(&table).unwrap();
            assert!(active.is_empty(), "{:?}", active);
        }
    }

    #[test]
    fn test_au1_needs_all_four_brows() {
        let raised = [
            ("21to33", 1.0),
            ("22to33", 0.5),
            ("20to33", 2.0),
            ("23to33", 0.1),
        ];
        assert!(ActionUnit::AU1.evaluate(&table_with(&raised)).unwrap());

        let mut partial = raised;
        partial[3].1 = 0.0;
        assert!(!ActionUnit::AU1.evaluate(&table_with(&partial)).unwrap());
    }

    #[test]
    fn test_reference_catalog_never_raises_upper_lids() {
        // 33to44 measures (44,44) on the current frame, so it can only fall.
        let previous = neutral_face();
        let nose = previous.get(33).unwrap();
        let mut current = previous.clone();
        for lid in [37, 38, 43, 44] {
            let p = previous.get(lid).unwrap();
            let wide = Point2D::new(nose.x + (p.x - nose.x) * 3.0, nose.y + (p.y - nose.y) * 3.0);
            current = current.with_point(lid, wide);
        }

        let reference = DeltaCatalog::reference().compute(&current, &previous).unwrap();
        assert!(reference.get("33to44").unwrap() < 0.0);
        assert!(reference.get("33to38").unwrap() > 0.0);
        assert!(!ActionUnit::AU5.evaluate(&reference).unwrap());

        let corrected = DeltaCatalog::corrected().compute(&current, &previous).unwrap();
        assert!(corrected.get("33to44").unwrap() > 0.0);
        assert!(ActionUnit::AU5.evaluate(&corrected).unwrap());
    }

    #[test]
    fn test_au9_includes_brow_lowerer() {
        let brows_down = [("21to33", -1.0), ("22to33", -1.0)];
        assert!(!ActionUnit::AU9.evaluate(&table_with(&brows_down)).unwrap());

        let with_au4 = [
            ("21to33", -1.0),
            ("22to33", -1.0),
            ("21to22", -0.5),
            ("20to23", -0.5),
        ];
        let table = table_with(&with_au4);
        assert!(ActionUnit::AU9.evaluate(&table).unwrap());
        assert!(ActionUnit::AU4.evaluate(&table).unwrap());
    }

    #[test]
    fn test_au23_and_au26_are_opposites() {
        let opening = table_with(&[("61to67", 1.0), ("62to66", 1.0), ("63to65", 1.0)]);
        assert!(ActionUnit::AU26.evaluate(&opening).unwrap());
        assert!(!ActionUnit::AU23.evaluate(&opening).unwrap());

        let closing = table_with(&[("61to67", -1.0), ("62to66", -1.0), ("63to65", -1.0)]);
        assert!(ActionUnit::AU23.evaluate(&closing).unwrap());
        assert!(!ActionUnit::AU26.evaluate(&closing).unwrap());
    }

    #[test]
    fn test_missing_key_is_reported_even_after_false_operand() {
        // 21to33 is false, 22to33 is missing: evaluation must still fail.
        let table = DeltaTable::from_entries(vec![("21to33", -1.0)]);
        let err = ActionUnit::AU1.evaluate(&table).unwrap_err();
        assert_eq!(err, CoreError::UnknownDeltaKey("22to33".to_string()));
    }

    #[test]
    fn test_any_evaluates_every_operand() {
        const EITHER: Condition<DeltaSign> =
            Condition::Any(&[Condition::Leaf(Rises("a")), Condition::Leaf(Rises("b"))]);
        let table = DeltaTable::from_entries(vec![("a", 1.0)]);
        assert!(EITHER.evaluate(&mut |s: DeltaSign| s.test(&table)).is_err());

        let table = DeltaTable::from_entries(vec![("a", 1.0), ("b", -1.0)]);
        assert!(EITHER.evaluate(&mut |s: DeltaSign| s.test(&table)).unwrap());
    }

    #[test]
    fn test_shipped_catalogs_cover_every_unit() {
        ActionUnit::check_catalog(&DeltaCatalog::reference()).unwrap();
        ActionUnit::check_catalog(&DeltaCatalog::corrected()).unwrap();
    }

    #[test]
    fn test_leaves_in_order() {
        let keys: Vec<_> = ActionUnit::AU9
            .condition()
            .leaves()
            .iter()
            .map(|s| s.key())
            .collect();
        assert_eq!(keys, vec!["21to22", "20to23", "21to33", "22to33"]);
    }

    #[test]
    fn test_active_units_are_ordered() {
        let active = ActiveUnits::from_units(&[ActionUnit::AU12, ActionUnit::AU1]);
        let names: Vec<_> = active.iter().map(|u| u.to_string()).collect();
        assert_eq!(names, vec!["AU1", "AU12"]);
    }
}
