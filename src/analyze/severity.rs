//! Weather severity tiers and the meteorological veto.
//!
//! Tier from keywords: red/severe/extreme → Red, orange/amber → Orange, yellow → Yellow.
//! Meteorological alerts below the policy minimum are vetoed outright; other
//! categories only pick up the tier value when a hazard keyword is present.

use anyhow::Result;
use regex::Regex;

use crate::model::Category;
use crate::ruleset::{compile_pattern, SeverityCfg, SeverityPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeverityTier {
    None,
    Yellow,
    Orange,
    Red,
}

impl SeverityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTier::None => "none",
            SeverityTier::Yellow => "yellow",
            SeverityTier::Orange => "orange",
            SeverityTier::Red => "red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityAssessment {
    /// Meteorological alert below the accepted tier: drop, whatever else matched.
    Veto { tier: SeverityTier },
    Contribution {
        tier: SeverityTier,
        value: u32,
        hazard_bonus: u32,
    },
}

#[derive(Debug)]
pub struct SeverityRules {
    policy: SeverityPolicy,
    red: Regex,
    orange: Regex,
    yellow: Regex,
    hazard: Regex,
    bonus_hazard: Regex,
    red_value: u32,
    orange_value: u32,
    yellow_value: u32,
    hazard_bonus: u32,
}

impl SeverityRules {
    pub fn new(cfg: &SeverityCfg) -> Result<Self> {
        Ok(Self {
            policy: cfg.policy,
            red: compile_pattern("severity", "red_pattern", &cfg.red_pattern)?,
            orange: compile_pattern("severity", "orange_pattern", &cfg.orange_pattern)?,
            yellow: compile_pattern("severity", "yellow_pattern", &cfg.yellow_pattern)?,
            hazard: compile_pattern("severity", "hazard_pattern", &cfg.hazard_pattern)?,
            bonus_hazard: compile_pattern(
                "severity",
                "bonus_hazard_pattern",
                &cfg.bonus_hazard_pattern,
            )?,
            red_value: cfg.red,
            orange_value: cfg.orange,
            yellow_value: cfg.yellow,
            hazard_bonus: cfg.hazard_bonus,
        })
    }

    /// Highest tier mentioned in the text.
    pub fn tier(&self, text: &str) -> SeverityTier {
        if self.red.is_match(text) {
            SeverityTier::Red
        } else if self.orange.is_match(text) {
            SeverityTier::Orange
        } else if self.yellow.is_match(text) {
            SeverityTier::Yellow
        } else {
            SeverityTier::None
        }
    }

    /// Yellow is worth something only when the policy accepts it.
    pub fn tier_value(&self, tier: SeverityTier) -> u32 {
        match tier {
            SeverityTier::Red => self.red_value,
            SeverityTier::Orange => self.orange_value,
            SeverityTier::Yellow => match self.policy {
                SeverityPolicy::YellowOrAbove => self.yellow_value,
                SeverityPolicy::OrangeOrAbove => 0,
            },
            SeverityTier::None => 0,
        }
    }

    pub fn min_tier(&self) -> SeverityTier {
        match self.policy {
            SeverityPolicy::OrangeOrAbove => SeverityTier::Orange,
            SeverityPolicy::YellowOrAbove => SeverityTier::Yellow,
        }
    }

    pub fn assess(&self, text: &str, category: Category) -> SeverityAssessment {
        let tier = self.tier(text);
        if category == Category::MeteorologicalAlert {
            if tier < self.min_tier() {
                return SeverityAssessment::Veto { tier };
            }
            return SeverityAssessment::Contribution {
                tier,
                value: self.tier_value(tier),
                hazard_bonus: 0,
            };
        }

        if !self.hazard.is_match(text) {
            return SeverityAssessment::Contribution {
                tier,
                value: 0,
                hazard_bonus: 0,
            };
        }
        let hazard_bonus = if self.bonus_hazard.is_match(text) {
            self.hazard_bonus
        } else {
            0
        };
        SeverityAssessment::Contribution {
            tier,
            value: self.tier_value(tier),
            hazard_bonus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::Ruleset;

    fn rules(policy: SeverityPolicy) -> SeverityRules {
        let mut cfg = Ruleset::builtin().unwrap().severity;
        cfg.policy = policy;
        SeverityRules::new(&cfg).unwrap()
    }

    const MET: Category = Category::MeteorologicalAlert;

    #[test]
    fn tiers_from_keywords() {
        let r = rules(SeverityPolicy::OrangeOrAbove);
        assert_eq!(r.tier("Red warning for rain"), SeverityTier::Red);
        assert_eq!(r.tier("Extreme heat expected"), SeverityTier::Red);
        assert_eq!(r.tier("Amber warning for wind"), SeverityTier::Orange);
        assert_eq!(r.tier("Yellow weather warning for Kent"), SeverityTier::Yellow);
        assert_eq!(r.tier("Weather update"), SeverityTier::None);
    }

    #[test]
    fn red_phrasings_reach_the_red_tier() {
        let r = rules(SeverityPolicy::OrangeOrAbove);
        for text in [
            "Red weather warning for Kent",
            "Red wind warning for Kent",
            "Level red: thunderstorm warning for Kent",
            "Red alert issued for coastal flooding",
        ] {
            assert_eq!(r.tier(text), SeverityTier::Red, "{text}");
        }
        assert!(matches!(
            r.assess("Red weather warning for Kent", MET),
            SeverityAssessment::Contribution {
                tier: SeverityTier::Red,
                value: 60,
                ..
            }
        ));
    }

    #[test]
    fn red_outside_an_alert_phrase_is_not_a_tier() {
        let r = rules(SeverityPolicy::OrangeOrAbove);
        assert_eq!(r.tier("Red Cross sends aid convoy"), SeverityTier::None);
        assert_eq!(r.tier("Red carpet rolled out in Cannes"), SeverityTier::None);
        assert_eq!(r.tier("Red Cross issues alert"), SeverityTier::None);
    }

    #[test]
    fn yellow_met_alert_is_vetoed_under_orange_policy() {
        let r = rules(SeverityPolicy::OrangeOrAbove);
        assert_eq!(
            r.assess("Yellow weather warning for Kent", MET),
            SeverityAssessment::Veto {
                tier: SeverityTier::Yellow
            }
        );
        // No tier at all is also below the minimum.
        assert!(matches!(
            r.assess("Weather bulletin", MET),
            SeverityAssessment::Veto { .. }
        ));
    }

    #[test]
    fn yellow_met_alert_passes_under_yellow_policy() {
        let r = rules(SeverityPolicy::YellowOrAbove);
        assert_eq!(
            r.assess("Yellow weather warning for Kent", MET),
            SeverityAssessment::Contribution {
                tier: SeverityTier::Yellow,
                value: 10,
                hazard_bonus: 0
            }
        );
    }

    #[test]
    fn non_met_hazard_gets_tier_value_and_flood_bonus() {
        let r = rules(SeverityPolicy::OrangeOrAbove);
        assert_eq!(
            r.assess("Severe flooding hits northern Italy", Category::News),
            SeverityAssessment::Contribution {
                tier: SeverityTier::Red,
                value: 60,
                hazard_bonus: 15
            }
        );
        assert_eq!(
            r.assess("Amber storm warning, ferries cancelled", Category::News),
            SeverityAssessment::Contribution {
                tier: SeverityTier::Orange,
                value: 35,
                hazard_bonus: 0
            }
        );
        // Tier keyword without hazard vocabulary contributes nothing.
        assert_eq!(
            r.assess("Severe delays on the M25", Category::News),
            SeverityAssessment::Contribution {
                tier: SeverityTier::Red,
                value: 0,
                hazard_bonus: 0
            }
        );
    }
}
