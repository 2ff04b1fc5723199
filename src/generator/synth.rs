//! Synthetic value collaborator. Locale-aware fake data lives outside this crate;
//! the default synthesizer produces plain, plausible values from small word lists.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait ValueSynthesizer: Send {
    fn person_name(&mut self) -> String;

    fn word(&mut self) -> String;

    /// Uniform integer in `min..=max` (bounds may arrive in either order).
    fn integer(&mut self, min: i64, max: i64) -> i64;

    fn index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.integer(0, len as i64 - 1) as usize
    }

    fn date_between(&mut self, start: NaiveDate, end: NaiveDate) -> NaiveDate {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let span = (end - start).num_days();
        let offset = self.integer(0, span);
        start
            .checked_add_signed(Duration::days(offset))
            .unwrap_or(end)
    }
}

const FIRST_NAMES: &[&str] = &[
    "Aarav", "Ada", "Bruno", "Chen", "Dara", "Elena", "Farid", "Grace", "Hiro", "Imani", "Jonas",
    "Kavya", "Luis", "Mira", "Nadia", "Omar", "Priya", "Quinn", "Rafael", "Sana", "Tomas", "Uma",
    "Viktor", "Wen", "Yusuf", "Zara",
];

const LAST_NAMES: &[&str] = &[
    "Adeyemi", "Bianchi", "Costa", "Dubois", "Eriksen", "Fischer", "Gupta", "Haddad", "Ivanova",
    "Jensen", "Kim", "Lopez", "Mehta", "Nakamura", "Okafor", "Petrov", "Rossi", "Silva", "Tanaka",
    "Varga", "Weber", "Yilmaz",
];

const WORDS: &[&str] = &[
    "alpha", "beacon", "cedar", "delta", "ember", "falcon", "granite", "harbor", "iris", "juniper",
    "kestrel", "lumen", "meridian", "nimbus", "orbit", "prism", "quartz", "ridge", "summit",
    "tundra", "vector", "willow",
];

/// Default synthesizer backed by `rand`.
pub struct RandomSynthesizer {
    rng: StdRng,
}

impl RandomSynthesizer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible sequence of values.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn pick(&mut self, list: &[&str]) -> String {
        let i = self.index(list.len());
        list[i].to_string()
    }
}

impl Default for RandomSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueSynthesizer for RandomSynthesizer {
    fn person_name(&mut self) -> String {
        format!("{} {}", self.pick(FIRST_NAMES), self.pick(LAST_NAMES))
    }

    fn word(&mut self) -> String {
        self.pick(WORDS)
    }

    fn integer(&mut self, min: i64, max: i64) -> i64 {
        let (low, high) = if min <= max { (min, max) } else { (max, min) };
        self.rng.random_range(low..=high)
    }
}
