use std::fmt;

use serde::{Deserialize, Serialize};

/// Tumour categories the classifier distinguishes, in model output order.
///
/// # Examples
///
/// ```
/// use tumor_cam::api::TumorClass;
///
/// assert_eq!(TumorClass::from_index(2), Some(TumorClass::NoTumor));
/// assert_eq!(TumorClass::Glioma.label(), "Glioma Tumor");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TumorClass {
    Glioma,
    Meningioma,
    NoTumor,
    Pituitary,
}

impl TumorClass {
    /// All classes, indexed by the position of their probability in the model output.
    pub const ALL: [Self; 4] = [Self::Glioma, Self::Meningioma, Self::NoTumor, Self::Pituitary];

    /// Look up the class for a model output index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Position of this class in the model output.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Glioma => 0,
            Self::Meningioma => 1,
            Self::NoTumor => 2,
            Self::Pituitary => 3,
        }
    }

    /// Human-readable label returned to clients and persisted with results.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Glioma => "Glioma Tumor",
            Self::Meningioma => "Meningioma Tumor",
            Self::NoTumor => "No Tumor",
            Self::Pituitary => "Pituitary Tumor",
        }
    }
}

impl fmt::Display for TumorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of classifying one scan.
///
/// `confidence` is the probability assigned to `class`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub class: TumorClass,
    pub confidence: f32,
}

impl Diagnosis {
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.class.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn index_round_trips_for_every_class() {
        for class in TumorClass::ALL {
            assert_eq!(TumorClass::from_index(class.index()), Some(class));
        }
    }

    #[rstest]
    #[case(4)]
    #[case(usize::MAX)]
    fn unknown_index_has_no_class(#[case] index: usize) {
        assert_eq!(TumorClass::from_index(index), None);
    }

    #[rstest]
    #[case(TumorClass::Meningioma, "Meningioma Tumor")]
    #[case(TumorClass::Pituitary, "Pituitary Tumor")]
    fn display_uses_label(#[case] class: TumorClass, #[case] expected: &str) {
        assert_eq!(class.to_string(), expected);
    }
}
