//! Score → priority mapping.

use crate::model::Priority;
use crate::ruleset::ThresholdsCfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityClassifier {
    p1: u32,
    p2: u32,
    p3: u32,
    min_include: u32,
}

impl PriorityClassifier {
    pub fn new(t: &ThresholdsCfg) -> Self {
        Self {
            p1: t.p1,
            p2: t.p2,
            p3: t.p3,
            min_include: t.min_include,
        }
    }

    /// Highest threshold the score reaches.
    pub fn classify(&self, score: u32) -> Priority {
        if score >= self.p1 {
            Priority::P1
        } else if score >= self.p2 {
            Priority::P2
        } else if score >= self.p3 {
            Priority::P3
        } else {
            Priority::None
        }
    }

    /// An item is emitted only with a priority and at least `min_include` points.
    pub fn includes(&self, score: u32) -> bool {
        self.classify(score) != Priority::None && score >= self.min_include
    }
}
