//! Unit newtype for energy volumes.
//!
//! Exchange programs, balances and KPIs are all megawatt-hours. Wrapping the
//! raw `f64` keeps signatures honest and gives one place for the scaled
//! MWh/GWh/TWh display used by reporting.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// An energy volume in megawatt-hours.
///
/// Positive values are exports (France → partner), negative values are
/// imports, matching the sign convention of net balances.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct MegawattHours(pub f64);

impl MegawattHours {
    #[inline]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Human-readable volume, scaled to MWh, GWh or TWh.
    pub fn scaled(self) -> String {
        let abs = self.0.abs();
        if abs >= 1e6 {
            format!("{:.1} TWh", self.0 / 1e6)
        } else if abs >= 1e3 {
            format!("{:.1} GWh", self.0 / 1e3)
        } else {
            format!("{:.0} MWh", self.0)
        }
    }
}

impl Add for MegawattHours {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for MegawattHours {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for MegawattHours {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<f64> for MegawattHours {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<f64> for MegawattHours {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        Self(self.0 / rhs)
    }
}

impl std::fmt::Display for MegawattHours {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.scaled())
    }
}
