//! Filename-based drum categorization and randomized key assignment.

use std::collections::HashSet;

use rand::seq::IteratorRandom;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::catalog::Sample;
use crate::layout::{KEY_COUNT, Key, default_keys};

/// Drum category derived from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Kick,
    Snare,
    RimClap,
    ClosedHat,
    OpenHat,
    Tom,
    Cymbal,
    Perc,
    Other,
}

/// Categorize a file name. Matching is case-insensitive and the first rule wins.
pub fn categorize(name: &str) -> Category {
    let name = name.to_lowercase();
    let has = |needle: &str| name.contains(needle);
    if has("kick") {
        Category::Kick
    } else if has("snare") {
        Category::Snare
    } else if has("rim") || has("clap") {
        Category::RimClap
    } else if has("hihat") || has("hat") || has("hh") {
        if has("open") {
            Category::OpenHat
        } else {
            Category::ClosedHat
        }
    } else if has("shaker") {
        Category::ClosedHat
    } else if has("tom") {
        Category::Tom
    } else if has("cymbal") || has("crash") || has("ride") {
        Category::Cymbal
    } else if has("perc") {
        Category::Perc
    } else {
        Category::Other
    }
}

/// Categories a key accepts, plus one fallback tried when none of them is available.
#[derive(Debug, Clone, Copy)]
pub struct Slot {
    pub categories: &'static [Category],
    pub fallback: Option<Category>,
}

const fn slot(categories: &'static [Category], fallback: Option<Category>) -> Slot {
    Slot {
        categories,
        fallback,
    }
}

use Category::*;

/// Per-key category table, in layout order.
///
/// The five cymbal slots share keys 14-18 with the tom slots. Toms are primary
/// there and cymbals only fill keys the toms leave empty, so a kit with six or
/// more toms maps no cymbals.
pub const SLOTS: [Slot; KEY_COUNT] = [
    slot(&[Kick], None),
    slot(&[Kick], None),
    slot(&[Snare], Some(RimClap)),
    slot(&[Snare], Some(RimClap)),
    slot(&[RimClap], Some(Snare)),
    slot(&[RimClap], Some(Snare)),
    slot(&[ClosedHat], Some(OpenHat)),
    slot(&[ClosedHat], Some(OpenHat)),
    slot(&[ClosedHat], Some(OpenHat)),
    slot(&[ClosedHat], Some(OpenHat)),
    slot(&[OpenHat], Some(ClosedHat)),
    slot(&[Perc], Some(Other)),
    slot(&[Tom], Some(Perc)),
    slot(&[Tom], Some(Cymbal)),
    slot(&[Tom], Some(Cymbal)),
    slot(&[Tom], Some(Cymbal)),
    slot(&[Tom], Some(Cymbal)),
    slot(&[Tom], Some(Cymbal)),
    slot(&[Perc, Other], None),
    slot(&[Perc, Other], None),
    slot(&[Perc, Other], None),
    slot(&[Perc, Other], None),
    slot(&[Perc, Other], None),
    slot(&[Perc, Other], None),
];

/// Keep samples whose known duration does not exceed `max_seconds`.
///
/// Samples without a duration are dropped.
pub fn filter_by_duration(samples: &[Sample], max_seconds: f64) -> Vec<Sample> {
    samples
        .iter()
        .filter(|sample| {
            sample
                .duration_seconds
                .is_some_and(|duration| duration <= max_seconds)
        })
        .cloned()
        .collect()
}

/// Randomized assignment of samples onto the key layout.
pub struct AutoMapper<R: Rng = StdRng> {
    rng: R,
}

impl AutoMapper<StdRng> {
    /// Mapper seeded from the thread RNG.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_rng(&mut rand::rng()))
    }

    /// Mapper with reproducible choices for `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for AutoMapper<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> AutoMapper<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Pick one sample per key, in layout order.
    ///
    /// A file name is used at most once; keys with no candidate stay `None`.
    pub fn select(&mut self, samples: &[Sample]) -> Vec<Option<Sample>> {
        let categorized: Vec<(Category, &Sample)> = samples
            .iter()
            .map(|sample| (categorize(&sample.name), sample))
            .collect();
        let mut used: HashSet<&str> = HashSet::new();
        let mut picks = Vec::with_capacity(KEY_COUNT);
        for slot in &SLOTS {
            let mut choice = self.pick(&categorized, &used, slot.categories);
            if choice.is_none()
                && let Some(fallback) = slot.fallback
                && !slot.categories.contains(&fallback)
            {
                choice = self.pick(&categorized, &used, &[fallback]);
            }
            if let Some(sample) = choice {
                used.insert(sample.name.as_str());
            }
            picks.push(choice.cloned());
        }
        picks
    }

    /// Build a fresh layout with the selected samples assigned.
    pub fn map_keys(&mut self, samples: &[Sample]) -> Vec<Key> {
        let mut keys = default_keys();
        for (key, pick) in keys.iter_mut().zip(self.select(samples)) {
            key.assigned_sample = pick;
        }
        keys
    }

    fn pick<'a>(
        &mut self,
        categorized: &[(Category, &'a Sample)],
        used: &HashSet<&str>,
        categories: &[Category],
    ) -> Option<&'a Sample> {
        categorized
            .iter()
            .filter(|(category, sample)| {
                categories.contains(category) && !used.contains(sample.name.as_str())
            })
            .map(|(_, sample)| *sample)
            .choose(&mut self.rng)
    }
}
