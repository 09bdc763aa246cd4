//! Per-stage random generators.
//!
//! Every stochastic stage gets its own `StdRng`, seeded from the master seed and the
//! stage name: `splitmix64(master ^ fnv1a(name))`. Both mixes are fixed here, so a
//! seed reproduces the same draws on every toolchain. Running one stage in isolation (e.g. in a test) therefore draws exactly
//! what it would draw inside a full run.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A stochastic pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Households,
    Ranks,
    TopBand,
    Noise,
    Income,
    Split,
    Pareto,
    Dropout,
    Migration,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Households,
        Stage::Ranks,
        Stage::TopBand,
        Stage::Noise,
        Stage::Income,
        Stage::Split,
        Stage::Pareto,
        Stage::Dropout,
        Stage::Migration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Households => "households",
            Stage::Ranks => "ranks",
            Stage::TopBand => "top_band",
            Stage::Noise => "noise",
            Stage::Income => "income",
            Stage::Split => "split",
            Stage::Pareto => "pareto",
            Stage::Dropout => "dropout",
            Stage::Migration => "migration",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub master: u64,
    /// Explicit seeds by stage name; they replace the derived seed.
    pub overrides: BTreeMap<String, u64>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            master: 42,
            overrides: BTreeMap::new(),
        }
    }
}

impl SeedConfig {
    pub fn new(master: u64) -> Self {
        Self {
            master,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        for name in self.overrides.keys() {
            if !Stage::ALL.iter().any(|s| s.name() == name) {
                return Err(AppError::configuration(format!("Unknown seed stage '{name}'.")));
            }
        }
        Ok(())
    }

    pub fn stage_seed(&self, stage: Stage) -> u64 {
        if let Some(seed) = self.overrides.get(stage.name()) {
            return *seed;
        }
        splitmix64(self.master ^ fnv1a(stage.name().as_bytes()))
    }

    /// A fresh generator for `stage`.
    pub fn rng(&self, stage: Stage) -> StdRng {
        StdRng::seed_from_u64(self.stage_seed(stage))
    }
}

/// 64-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |h, &b| (h ^ u64::from(b)).wrapping_mul(PRIME))
}

/// SplitMix64 finalizer.
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn stages_get_distinct_streams() {
        let seeds = SeedConfig::new(42);
        let a: f64 = seeds.rng(Stage::Noise).r#gen();
        let b: f64 = seeds.rng(Stage::Split).r#gen();
        assert_ne!(a, b);

        let again: f64 = seeds.rng(Stage::Noise).r#gen();
        assert_eq!(a, again);
    }

    #[test]
    fn override_replaces_derived_seed() {
        let mut seeds = SeedConfig::new(1);
        seeds.overrides.insert("pareto".to_string(), 99);
        assert_eq!(seeds.stage_seed(Stage::Pareto), 99);
        assert_ne!(seeds.stage_seed(Stage::Split), 99);
    }

    #[test]
    fn mixes_match_reference_vectors() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(splitmix64(0), 0xe220_a839_7b1d_cdaf);
    }

    #[test]
    fn stage_seeds_are_pinned() {
        // master ^ fnv1a("split") == 0 leaves only the finalizer.
        assert_eq!(SeedConfig::new(0x5fdb_7a8a_c314_7783).stage_seed(Stage::Split), 0xe220_a839_7b1d_cdaf);
        assert_eq!(SeedConfig::new(42).stage_seed(Stage::Pareto), 0x338b_e6b7_410f_6738);
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let mut seeds = SeedConfig::new(1);
        seeds.overrides.insert("nope".to_string(), 1);
        assert!(seeds.validate().is_err());
    }
}
