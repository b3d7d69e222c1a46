// Copyright 2026 Boundless Foundation, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Integer helpers shared by the accounting components.

use std::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// One whole token, in wei.
pub const WEI: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Scale of every four-decimal fixed-point value in the ledger.
pub const RATIO_SCALE: u64 = 10_000;

/// Non-negative decimal with four fractional digits, held as ten-thousandths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Decimal4(u64);

impl Decimal4 {
    pub const ZERO: Decimal4 = Decimal4(0);
    pub const ONE: Decimal4 = Decimal4(RATIO_SCALE);

    /// Wrap a value already expressed in ten-thousandths.
    pub const fn from_scaled(scaled: u64) -> Self {
        Decimal4(scaled)
    }

    /// `numerator / denominator` truncated to four decimals, or `None` for a zero denominator.
    pub fn ratio(numerator: u64, denominator: u64) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        let scaled = u128::from(numerator) * u128::from(RATIO_SCALE) / u128::from(denominator);
        Some(Decimal4(u64::try_from(scaled).unwrap_or(u64::MAX)))
    }

    pub const fn scaled(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Decimal4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:04}", self.0 / RATIO_SCALE, self.0 % RATIO_SCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_truncates() {
        assert_eq!(Decimal4::ratio(1, 3), Some(Decimal4::from_scaled(3333)));
        assert_eq!(Decimal4::ratio(2, 3), Some(Decimal4::from_scaled(6666)));
        assert_eq!(Decimal4::ratio(5, 5), Some(Decimal4::ONE));
        assert_eq!(Decimal4::ratio(5, 0), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Decimal4::from_scaled(3333).to_string(), "0.3333");
        assert_eq!(Decimal4::from_scaled(25_050).to_string(), "2.5050");
    }
}
