//! The closed effect vocabulary, its positive/negative split, and the
//! profit weights used by the objective-mode scorer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    HarvestBoost,
    ImprovedHarvestBoost,
    EffectSpread,
    ImprovedEffectSpread,
    Immunity,
    BonusDrops,
    WaterRetain,
    ImprovedWaterRetain,
    XpBoost,
    ImprovedXpBoost,
    HarvestLoss,
    WaterDrain,
    XpLoss,
}

impl Effect {
    pub fn parse(tag: &str) -> Option<Effect> {
        match tag {
            "harvest_boost" => Some(Self::HarvestBoost),
            "improved_harvest_boost" => Some(Self::ImprovedHarvestBoost),
            "effect_spread" => Some(Self::EffectSpread),
            "improved_effect_spread" => Some(Self::ImprovedEffectSpread),
            "immunity" => Some(Self::Immunity),
            "bonus_drops" => Some(Self::BonusDrops),
            "water_retain" => Some(Self::WaterRetain),
            "improved_water_retain" => Some(Self::ImprovedWaterRetain),
            "xp_boost" => Some(Self::XpBoost),
            "improved_xp_boost" => Some(Self::ImprovedXpBoost),
            "harvest_loss" => Some(Self::HarvestLoss),
            "water_drain" => Some(Self::WaterDrain),
            "xp_loss" => Some(Self::XpLoss),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HarvestBoost => "harvest_boost",
            Self::ImprovedHarvestBoost => "improved_harvest_boost",
            Self::EffectSpread => "effect_spread",
            Self::ImprovedEffectSpread => "improved_effect_spread",
            Self::Immunity => "immunity",
            Self::BonusDrops => "bonus_drops",
            Self::WaterRetain => "water_retain",
            Self::ImprovedWaterRetain => "improved_water_retain",
            Self::XpBoost => "xp_boost",
            Self::ImprovedXpBoost => "improved_xp_boost",
            Self::HarvestLoss => "harvest_loss",
            Self::WaterDrain => "water_drain",
            Self::XpLoss => "xp_loss",
        }
    }

    pub fn is_negative(self) -> bool {
        matches!(self, Self::HarvestLoss | Self::WaterDrain | Self::XpLoss)
    }

    pub fn is_spread(self) -> bool {
        matches!(self, Self::EffectSpread | Self::ImprovedEffectSpread)
    }

    /// Weight of this effect in the profit objective.
    pub fn profit_weight(self) -> f64 {
        match self {
            Self::ImprovedHarvestBoost => 100.0,
            Self::HarvestBoost => 60.0,
            Self::ImprovedWaterRetain => 40.0,
            Self::WaterRetain => 25.0,
            Self::ImprovedXpBoost => 35.0,
            Self::XpBoost => 20.0,
            Self::Immunity => 80.0,
            Self::BonusDrops => 70.0,
            Self::ImprovedEffectSpread => 50.0,
            Self::EffectSpread => 30.0,
            Self::HarvestLoss => -40.0,
            Self::WaterDrain => -30.0,
            Self::XpLoss => -20.0,
        }
    }

    /// The benefit family this effect provides, with `improved_X` counting
    /// as `X`. Negative effects provide none.
    pub fn benefit(self) -> Option<Benefit> {
        match self {
            Self::HarvestBoost | Self::ImprovedHarvestBoost => Some(Benefit::HarvestBoost),
            Self::WaterRetain | Self::ImprovedWaterRetain => Some(Benefit::WaterRetain),
            Self::XpBoost | Self::ImprovedXpBoost => Some(Benefit::XpBoost),
            Self::Immunity => Some(Benefit::Immunity),
            Self::BonusDrops => Some(Benefit::BonusDrops),
            Self::EffectSpread | Self::ImprovedEffectSpread => Some(Benefit::EffectSpread),
            Self::HarvestLoss | Self::WaterDrain | Self::XpLoss => None,
        }
    }
}

/// The six benefit families a godseed requires coverage of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Benefit {
    HarvestBoost,
    WaterRetain,
    XpBoost,
    Immunity,
    BonusDrops,
    EffectSpread,
}

pub const ALL_BENEFITS: [Benefit; 6] = [
    Benefit::HarvestBoost,
    Benefit::WaterRetain,
    Benefit::XpBoost,
    Benefit::Immunity,
    Benefit::BonusDrops,
    Benefit::EffectSpread,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_the_whole_vocabulary() {
        let tags = [
            "harvest_boost",
            "improved_harvest_boost",
            "effect_spread",
            "improved_effect_spread",
            "immunity",
            "bonus_drops",
            "water_retain",
            "improved_water_retain",
            "xp_boost",
            "improved_xp_boost",
            "harvest_loss",
            "water_drain",
            "xp_loss",
        ];
        for tag in tags {
            let effect = Effect::parse(tag).unwrap();
            assert_eq!(effect.as_str(), tag);
        }
        assert!(Effect::parse("sparkle").is_none());
    }

    #[test]
    fn improved_effects_cover_the_base_benefit() {
        assert_eq!(
            Effect::ImprovedHarvestBoost.benefit(),
            Some(Benefit::HarvestBoost)
        );
        assert_eq!(Effect::HarvestLoss.benefit(), None);
    }

    #[test]
    fn profit_weights_match_the_fixed_table() {
        assert_eq!(Effect::ImprovedHarvestBoost.profit_weight(), 100.0);
        assert_eq!(Effect::Immunity.profit_weight(), 80.0);
        assert_eq!(Effect::XpLoss.profit_weight(), -20.0);
    }
}
