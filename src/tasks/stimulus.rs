//! Randomized stimulus generation for the three subtests.
//!
//! Pure given a random source: every function takes `&mut impl Rng` and
//! returns plain data, so engines can pre-generate a whole run up front and
//! tests can drive generation with a seeded rng.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Patterns shown in the processing-speed grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    Circle,
    Square,
    Triangle,
    Diamond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternColor {
    Red,
    Blue,
    Green,
    Yellow,
}

const SHAPES: [Shape; 4] = [Shape::Circle, Shape::Square, Shape::Triangle, Shape::Diamond];
const PATTERN_COLORS: [PatternColor; 4] = [
    PatternColor::Red,
    PatternColor::Blue,
    PatternColor::Green,
    PatternColor::Yellow,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub shape: Shape,
    pub color: PatternColor,
}

/// Patterns in one processing-speed display set.
pub const DISPLAY_SET_SIZE: usize = 8;
/// Possible target counts within a display set.
pub const MAX_MATCHES: u8 = 2;

/// One processing-speed round: a target pattern and a shuffled display set
/// holding exactly `match_count` copies of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRound {
    pub target: Pattern,
    pub display: Vec<Pattern>,
    pub match_count: u8,
}

fn random_pattern(rng: &mut impl Rng) -> Pattern {
    Pattern {
        shape: SHAPES[rng.gen_range(0..SHAPES.len())],
        color: PATTERN_COLORS[rng.gen_range(0..PATTERN_COLORS.len())],
    }
}

/// Build one round. The display set carries exactly `k` target copies with
/// `k` drawn uniformly from `0..=2`; every other slot is resampled until it
/// differs from the target in shape or color, then the set is shuffled.
pub fn pattern_round(rng: &mut impl Rng) -> PatternRound {
    let target = random_pattern(rng);
    let match_count = rng.gen_range(0..=MAX_MATCHES);

    let mut display = Vec::with_capacity(DISPLAY_SET_SIZE);
    for _ in 0..match_count {
        display.push(target);
    }
    while display.len() < DISPLAY_SET_SIZE {
        let candidate = random_pattern(rng);
        if candidate != target {
            display.push(candidate);
        }
    }
    display.shuffle(rng);

    PatternRound {
        target,
        display,
        match_count,
    }
}

/// Go/no-go stimulus classes for the decision-efficiency subtest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueClass {
    Go,
    NoGo,
    Distractor,
}

/// Cue colors. GO and NO-GO each own a single fixed color; distractors draw
/// from the remaining set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueColor {
    Green,
    Red,
    Blue,
    Yellow,
    Purple,
}

const DISTRACTOR_COLORS: [CueColor; 3] = [CueColor::Blue, CueColor::Yellow, CueColor::Purple];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    pub class: CueClass,
    pub color: CueColor,
}

/// Draw one cue: ~60% GO, ~25% NO-GO, ~15% DISTRACTOR. Draws are independent
/// per trial; there is no counterbalancing across a run.
pub fn draw_cue(rng: &mut impl Rng) -> Cue {
    let roll: f64 = rng.gen();
    if roll < 0.60 {
        Cue {
            class: CueClass::Go,
            color: CueColor::Green,
        }
    } else if roll < 0.85 {
        Cue {
            class: CueClass::NoGo,
            color: CueColor::Red,
        }
    } else {
        Cue {
            class: CueClass::Distractor,
            color: DISTRACTOR_COLORS[rng.gen_range(0..DISTRACTOR_COLORS.len())],
        }
    }
}

pub fn cue_sequence(rng: &mut impl Rng, trials: usize) -> Vec<Cue> {
    (0..trials).map(|_| draw_cue(rng)).collect()
}

/// Inset bounds keeping visual-motor targets away from the play-surface
/// edges, in percent of the surface dimension.
pub const TARGET_INSET_MIN: f64 = 15.0;
pub const TARGET_INSET_MAX: f64 = 85.0;

/// A target position in percent coordinates of the play surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetPoint {
    pub x: f64,
    pub y: f64,
}

impl TargetPoint {
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }
}

pub fn target_point(rng: &mut impl Rng) -> TargetPoint {
    TargetPoint {
        x: rng.gen_range(TARGET_INSET_MIN..=TARGET_INSET_MAX),
        y: rng.gen_range(TARGET_INSET_MIN..=TARGET_INSET_MAX),
    }
}
