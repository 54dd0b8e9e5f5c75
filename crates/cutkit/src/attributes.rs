//! Cut flags.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// What to keep from a cut and how to place it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CutAttributes: u32 {
        /// Keep the part above the cut.
        const KEEP_UPPER = 1 << 0;
        /// Keep the part below the cut.
        const KEEP_LOWER = 1 << 1;
        /// Link the results as parts of one assembly.
        const CUT_TO_PARTS = 1 << 2;
        /// Lay the upper part on its cut face.
        const PLACE_ON_CUT_UPPER = 1 << 3;
        /// Lay the lower part on its cut face.
        const PLACE_ON_CUT_LOWER = 1 << 4;
        /// Turn the upper part upside down.
        const FLIP_UPPER = 1 << 5;
        /// Turn the lower part upside down.
        const FLIP_LOWER = 1 << 6;
        /// Lay both parts on their cut faces.
        const PLACE_ON_CUT_FACE = Self::PLACE_ON_CUT_UPPER.bits() | Self::PLACE_ON_CUT_LOWER.bits();
    }
}

impl Default for CutAttributes {
    fn default() -> Self {
        Self::KEEP_UPPER | Self::KEEP_LOWER | Self::CUT_TO_PARTS
    }
}

impl CutAttributes {
    /// Is at least one side retained?
    pub fn keeps_anything(self) -> bool {
        self.intersects(Self::KEEP_UPPER | Self::KEEP_LOWER)
    }
}
