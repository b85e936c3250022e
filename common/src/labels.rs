//! Fashion-MNIST class labels, in the order of the model output.
//!
use serde::{Deserialize, Serialize};

/// Human readable class names, indexed by model output position.
pub const CLASSES: [&str; 10] = [
    "T-shirt/top",
    "Trouser",
    "Pullover",
    "Dress",
    "Coat",
    "Sandal",
    "Shirt",
    "Sneaker",
    "Bag",
    "Ankle boot",
];

/// Number of classes the model distinguishes.
pub const NUM_CLASSES: usize = CLASSES.len();

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum FashionClass {
    TShirtTop,
    Trouser,
    Pullover,
    Dress,
    Coat,
    Sandal,
    Shirt,
    Sneaker,
    Bag,
    AnkleBoot,
}

impl FashionClass {
    const ALL: [FashionClass; NUM_CLASSES] = [
        FashionClass::TShirtTop,
        FashionClass::Trouser,
        FashionClass::Pullover,
        FashionClass::Dress,
        FashionClass::Coat,
        FashionClass::Sandal,
        FashionClass::Shirt,
        FashionClass::Sneaker,
        FashionClass::Bag,
        FashionClass::AnkleBoot,
    ];

    /// All classes in model output order.
    pub fn all() -> &'static [FashionClass] {
        &Self::ALL
    }

    /// Map a model output position to its class.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        CLASSES[self.index()]
    }
}

impl std::fmt::Display for FashionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_index_label_consistency() {
        for (idx, class) in FashionClass::all().iter().enumerate() {
            assert_eq!(class.index(), idx);
            assert_eq!(FashionClass::from_index(idx), Some(*class));
            assert_eq!(class.label(), CLASSES[idx]);
        }
        assert_eq!(FashionClass::from_index(NUM_CLASSES), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(FashionClass::AnkleBoot.to_string(), "Ankle boot");
        assert_eq!(FashionClass::TShirtTop.to_string(), "T-shirt/top");
    }
}
