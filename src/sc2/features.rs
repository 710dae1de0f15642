//! Spatial feature layers exposed by the simulator

use std::collections::BTreeMap;
use std::fmt;

use ndarray::Array2;

/// `player_relative` cell labels
pub const PLAYER_BACKGROUND: u8 = 0;
pub const PLAYER_SELF: u8 = 1;
pub const PLAYER_ALLY: u8 = 2;
pub const PLAYER_NEUTRAL: u8 = 3;
pub const PLAYER_HOSTILE: u8 = 4;

/// Screen feature layers, discriminants are the layer indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScreenFeature {
    HeightMap = 0,
    VisibilityMap = 1,
    Creep = 2,
    Power = 3,
    PlayerId = 4,
    PlayerRelative = 5,
    UnitType = 6,
    Selected = 7,
}

impl ScreenFeature {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ScreenFeature::HeightMap => "height_map",
            ScreenFeature::VisibilityMap => "visibility_map",
            ScreenFeature::Creep => "creep",
            ScreenFeature::Power => "power",
            ScreenFeature::PlayerId => "player_id",
            ScreenFeature::PlayerRelative => "player_relative",
            ScreenFeature::UnitType => "unit_type",
            ScreenFeature::Selected => "selected",
        }
    }
}

impl fmt::Display for ScreenFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Screen and minimap resolution the agent interface is configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub screen: usize,
    pub minimap: usize,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            screen: 64,
            minimap: 32,
        }
    }
}

/// The `feature_screen` part of an observation: one 2D plane per layer
#[derive(Debug, Clone, Default)]
pub struct FeatureScreen {
    planes: BTreeMap<ScreenFeature, Array2<u8>>,
}

impl FeatureScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plane(mut self, feature: ScreenFeature, plane: Array2<u8>) -> Self {
        self.insert(feature, plane);
        self
    }

    pub fn insert(&mut self, feature: ScreenFeature, plane: Array2<u8>) {
        self.planes.insert(feature, plane);
    }

    pub fn get(&self, feature: ScreenFeature) -> Option<&Array2<u8>> {
        self.planes.get(&feature)
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_relative_index() {
        assert_eq!(ScreenFeature::PlayerRelative.index(), 5);
        assert_eq!(ScreenFeature::PlayerRelative.to_string(), "player_relative");
    }

    #[test]
    fn test_feature_screen_lookup() {
        let screen = FeatureScreen::new()
            .with_plane(ScreenFeature::PlayerRelative, Array2::from_elem((4, 4), PLAYER_HOSTILE));

        assert_eq!(screen.len(), 1);
        assert_eq!(
            screen.get(ScreenFeature::PlayerRelative).map(|p| p[[1, 2]]),
            Some(PLAYER_HOSTILE)
        );
        assert!(screen.get(ScreenFeature::UnitType).is_none());
    }
}
