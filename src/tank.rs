//! Tank profiles used to turn a liquid height into a fill percentage.

use crate::geometry::percent_full;
use std::fmt;
use std::str::FromStr;

/// A known tank size and orientation.
///
/// Heights are the inside height of vertical tanks or the inside diameter of
/// horizontal tanks, in millimeters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum TankProfile {
    /// 20 lb vertical cylinder
    #[default]
    #[value(name = "20lb_v")]
    Lb20Vertical,
    /// 30 lb vertical cylinder
    #[value(name = "30lb_v")]
    Lb30Vertical,
    /// 40 lb vertical cylinder
    #[value(name = "40lb_v")]
    Lb40Vertical,
    /// 100 lb vertical cylinder
    #[value(name = "100lb_v")]
    Lb100Vertical,
    /// 500 gallon horizontal cylinder
    #[value(name = "500g_h")]
    Gal500Horizontal,
}

impl TankProfile {
    pub const ALL: [TankProfile; 5] = [
        TankProfile::Lb20Vertical,
        TankProfile::Lb30Vertical,
        TankProfile::Lb40Vertical,
        TankProfile::Lb100Vertical,
        TankProfile::Gal500Horizontal,
    ];

    /// Identifier used on the command line and in lookups, e.g. `20lb_v`.
    pub fn id(self) -> &'static str {
        match self {
            TankProfile::Lb20Vertical => "20lb_v",
            TankProfile::Lb30Vertical => "30lb_v",
            TankProfile::Lb40Vertical => "40lb_v",
            TankProfile::Lb100Vertical => "100lb_v",
            TankProfile::Gal500Horizontal => "500g_h",
        }
    }

    /// Reference height (vertical) or diameter (horizontal) in millimeters.
    pub fn height_mm(self) -> f64 {
        match self {
            TankProfile::Lb20Vertical => 302.84,
            TankProfile::Lb30Vertical => 400.0,
            TankProfile::Lb40Vertical => 498.62,
            TankProfile::Lb100Vertical => 1300.0,
            TankProfile::Gal500Horizontal => 939.8,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, TankProfile::Gal500Horizontal)
    }

    /// Fill percentage (0-100) for a liquid level measured from the tank bottom.
    pub fn fill_percent(self, level_mm: f64) -> f64 {
        let height = self.height_mm();

        if self.is_horizontal() {
            let radius = height / 2.0;
            return percent_full(level_mm.clamp(0.0, height), radius);
        }

        if level_mm < height {
            level_mm / height * 100.0
        } else {
            100.0
        }
    }

    /// Look up a profile by identifier, `None` for anything unknown.
    pub fn lookup(id: &str) -> Option<TankProfile> {
        TankProfile::ALL.into_iter().find(|p| p.id() == id)
    }
}

impl fmt::Display for TankProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TankProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TankProfile::lookup(s).ok_or_else(|| format!("Unknown tank profile: {s}"))
    }
}
