//! The emotion decision list.
//!
//! Rules are tried top to bottom and the first satisfied one wins. Order is
//! part of the contract: Fear's condition is a superset of Surprise's, so
//! with this list Fear can only be reported if Surprise is moved below it.

use std::convert::Infallible;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action_units::{ActionUnit, ActiveUnits, Condition};
use crate::delta::{DeltaCatalog, DeltaTable};
use crate::error::CoreError;
use crate::landmarks::LandmarkSet;

/// Coarse expression label produced for one frame transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmotionLabel {
    Surprise,
    Sadness,
    Fear,
    Disgust,
    Angry,
    Happiness,
    NoEmotion,
    NoFaceDetected,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 8] = [
        EmotionLabel::Surprise,
        EmotionLabel::Sadness,
        EmotionLabel::Fear,
        EmotionLabel::Disgust,
        EmotionLabel::Angry,
        EmotionLabel::Happiness,
        EmotionLabel::NoEmotion,
        EmotionLabel::NoFaceDetected,
    ];

    /// Text drawn on the frame overlay.
    pub fn as_str(self) -> &'static str {
        match self {
            EmotionLabel::Surprise => "Surprise",
            EmotionLabel::Sadness => "Sadness",
            EmotionLabel::Fear => "Fear",
            EmotionLabel::Disgust => "Disgust",
            EmotionLabel::Angry => "Angry",
            EmotionLabel::Happiness => "Happiness",
            EmotionLabel::NoEmotion => "No emotion detected",
            EmotionLabel::NoFaceDetected => "No faces detected",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the decision list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionRule {
    pub name: &'static str,
    pub condition: Condition<ActionUnit>,
    pub label: EmotionLabel,
}

impl DecisionRule {
    pub fn matches(&self, units: &ActiveUnits) -> bool {
        let result = self
            .condition
            .evaluate(&mut |unit: ActionUnit| Ok::<bool, Infallible>(units.is_active(unit)));
        match result {
            Ok(matched) => matched,
            Err(never) => match never {},
        }
    }
}

use ActionUnit::*;
use Condition::{All, Any, Leaf};

/// Ordered rules; anything that matches none of them is [`EmotionLabel::NoEmotion`].
pub const DECISION_LIST: &[DecisionRule] = &[
    DecisionRule {
        name: "surprise",
        condition: All(&[
            Leaf(AU1),
            Leaf(AU2),
            Leaf(AU5),
            All(&[Leaf(AU26), Leaf(AU27)]),
        ]),
        label: EmotionLabel::Surprise,
    },
    DecisionRule {
        name: "sadness",
        condition: All(&[Leaf(AU1), Leaf(AU4), Leaf(AU15)]),
        label: EmotionLabel::Sadness,
    },
    DecisionRule {
        name: "fear",
        condition: All(&[
            Leaf(AU1),
            Leaf(AU2),
            Leaf(AU4),
            Leaf(AU5),
            All(&[Leaf(AU26), Leaf(AU27)]),
        ]),
        label: EmotionLabel::Fear,
    },
    DecisionRule {
        name: "disgust",
        condition: All(&[Leaf(AU9), Leaf(AU16), Any(&[Leaf(AU15), Leaf(AU26)])]),
        label: EmotionLabel::Disgust,
    },
    DecisionRule {
        name: "angry",
        condition: All(&[
            Leaf(AU4),
            Leaf(AU5),
            Leaf(AU7),
            Any(&[Leaf(AU23), Leaf(AU24)]),
        ]),
        label: EmotionLabel::Angry,
    },
    DecisionRule {
        name: "happiness",
        condition: Leaf(AU12),
        label: EmotionLabel::Happiness,
    },
];

/// Everything computed for one frame transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: EmotionLabel,
    pub deltas: DeltaTable,
    pub active_units: ActiveUnits,
}

/// Stateless classifier bound to one delta catalog.
#[derive(Debug, Clone)]
pub struct EmotionClassifier {
    catalog: DeltaCatalog,
    rules: &'static [DecisionRule],
}

impl EmotionClassifier {
    /// Bind to `catalog`, failing if an action unit reads a key it lacks.
    pub fn new(catalog: DeltaCatalog) -> Result<Self, CoreError> {
        ActionUnit::check_catalog(&catalog)?;
        Ok(Self {
            catalog,
            rules: DECISION_LIST,
        })
    }

    pub fn catalog(&self) -> &DeltaCatalog {
        &self.catalog
    }

    pub fn rules(&self) -> &'static [DecisionRule] {
        self.rules
    }

    pub fn deltas(
        &self,
        current: &LandmarkSet,
        previous: &LandmarkSet,
    ) -> Result<DeltaTable, CoreError> {
        self.catalog.compute(current, previous)
    }

    /// First matching rule's label, or [`EmotionLabel::NoEmotion`].
    pub fn classify(&self, units: &ActiveUnits) -> EmotionLabel {
        self.rules
            .iter()
            .find(|rule| rule.matches(units))
            .map(|rule| rule.label)
            .unwrap_or(EmotionLabel::NoEmotion)
    }

    /// Deltas, action units and label for one frame pair.
    pub fn classify_transition(
        &self,
        current: &LandmarkSet,
        previous: &LandmarkSet,
    ) -> Result<Classification, CoreError> {
        let deltas = self.deltas(current, previous)?;
        let active_units = ActiveUnits::evaluate(&deltas)?;
        let label = self.classify(&active_units);
        tracing::trace!(
            label = %label,
            active = active_units.len(),
            catalog = %self.catalog.kind(),
            "frame transition classified"
        );
        Ok(Classification {
            label,
            deltas,
            active_units,
        })
    }
}

impl Default for EmotionClassifier {
    fn default() -> Self {
        Self {
            catalog: DeltaCatalog::reference(),
            rules: DECISION_LIST,
        }
    }
}
