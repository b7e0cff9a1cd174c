//! Match configuration: geometry, tunables, rule variants and controllers.
//!
//! Every struct here deserializes from RON with per-field defaults, so a
//! config file only has to name the values it changes. Multipliers are
//! integer percents so no float ever reaches the simulation.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::components::{Archetype, ArchetypeMap, Side};
use crate::error::{GameError, Result};
use crate::math::{Fixed, Vec2Fixed};

// ============================================================================
// Geometry
// ============================================================================

/// Battlefield and build-zone dimensions in pixels.
///
/// Both build zones are `zone_width` × `zone_height` with their own local
/// coordinates. The player's zone maps 1:1 onto the left end of the
/// battlefield; the AI's zone is mirrored onto the right end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Battlefield {
    /// Battlefield length along the lane.
    pub width: u32,
    /// Battlefield height across the lane.
    pub height: u32,
    /// Build zone width.
    pub zone_width: u32,
    /// Build zone height.
    pub zone_height: u32,
    /// Lowest y a battle unit may occupy.
    pub lane_min_y: u32,
    /// Highest y a battle unit may occupy.
    pub lane_max_y: u32,
    /// Distance from each edge at which a unit breaches the base.
    pub base_margin: u32,
}

impl Default for Battlefield {
    fn default() -> Self {
        Self {
            width: 800,
            height: 270,
            zone_width: 200,
            zone_height: 270,
            lane_min_y: 10,
            lane_max_y: 260,
            base_margin: 10,
        }
    }
}

impl Battlefield {
    /// Battlefield width as fixed-point.
    #[must_use]
    pub fn width_fixed(&self) -> Fixed {
        Fixed::from_num(self.width)
    }

    /// Clamp a y coordinate into the lane band.
    #[must_use]
    pub fn clamp_lane_y(&self, y: Fixed) -> Fixed {
        y.clamp(
            Fixed::from_num(self.lane_min_y),
            Fixed::from_num(self.lane_max_y),
        )
    }

    /// Whether a zone-local position lies inside a build zone.
    #[must_use]
    pub fn zone_contains(&self, pos: Vec2Fixed) -> bool {
        pos.x >= Fixed::ZERO
            && pos.y >= Fixed::ZERO
            && pos.x <= Fixed::from_num(self.zone_width)
            && pos.y <= Fixed::from_num(self.zone_height)
    }

    /// Battlefield position for a template placed at zone-local `pos`.
    #[must_use]
    pub fn deploy_position(&self, side: Side, pos: Vec2Fixed) -> Vec2Fixed {
        let x = match side {
            Side::Player => pos.x,
            Side::Ai => self.width_fixed() - (Fixed::from_num(self.zone_width) - pos.x),
        };
        Vec2Fixed::new(x, self.clamp_lane_y(pos.y))
    }

    /// Whether a unit of `side` at `pos` has reached the opposing base.
    #[must_use]
    pub fn breaches(&self, side: Side, pos: Vec2Fixed) -> bool {
        let margin = Fixed::from_num(self.base_margin);
        match side {
            Side::Player => pos.x >= self.width_fixed() - margin,
            Side::Ai => pos.x <= margin,
        }
    }
}

// ============================================================================
// Tunables
// ============================================================================

/// Projectile flight parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    /// Pixels per second.
    pub speed: u32,
    /// Lifetime in game milliseconds.
    pub max_age_ms: u64,
    /// Travel distance from the spawn point before despawning.
    pub max_distance: u32,
    /// A unit closer than this to the flight segment is hit.
    pub hit_radius: u32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            speed: 200,
            max_age_ms: 5000,
            max_distance: 800,
            hit_radius: 15,
        }
    }
}

/// Stuck detection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StuckConfig {
    /// Milliseconds between movement samples.
    pub sample_interval_ms: u64,
    /// Movement below this many pixels per sample counts as stuck.
    pub min_movement: u32,
    /// Consecutive stuck samples before the unit is nudged.
    pub samples: u32,
    /// A unit that attacked this recently is never stuck.
    pub attack_grace_ms: u64,
    /// Length of the random nudge.
    pub nudge_distance: u32,
}

impl Default for StuckConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 1000,
            min_movement: 3,
            samples: 3,
            attack_grace_ms: 3000,
            nudge_distance: 30,
        }
    }
}

/// Per-level multipliers for the leveled progression, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    /// Hp multiplier per level.
    pub hp_percent: u32,
    /// Damage and heal multiplier per level.
    pub damage_percent: u32,
    /// Cooldown multiplier per level.
    pub cooldown_percent: u32,
    /// Area radius multiplier per level.
    pub aoe_percent: u32,
    /// Cooldown multiplier floor.
    pub min_cooldown_percent: u32,
    /// Area radius multiplier cap.
    pub max_aoe_percent: u32,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            hp_percent: 105,
            damage_percent: 105,
            cooldown_percent: 95,
            aoe_percent: 105,
            min_cooldown_percent: 50,
            max_aoe_percent: 200,
        }
    }
}

/// Percent multipliers for each stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct StatScale {
    /// Hp multiplier.
    pub hp: u32,
    /// Damage multiplier.
    pub damage: u32,
    /// Speed multiplier.
    pub speed: u32,
    /// Range multiplier.
    pub range: u32,
    /// Cooldown multiplier.
    pub cooldown: u32,
}

impl Default for StatScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl StatScale {
    /// 100% everywhere.
    pub const IDENTITY: Self = Self {
        hp: 100,
        damage: 100,
        speed: 100,
        range: 100,
        cooldown: 100,
    };
}

/// Balance multipliers applied when a definition is resolved.
///
/// `tiers[0]` applies to tier 1 and so on; tiers past the end of the list
/// use the identity scale. The default is identity everywhere because the
/// default catalog already carries per-tier stats.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceTable {
    /// Per-tier scale.
    pub tiers: Vec<StatScale>,
    /// Per-archetype scale.
    pub archetypes: ArchetypeMap<StatScale>,
    /// Scale applied to every unit.
    pub global: StatScale,
}

impl BalanceTable {
    /// Scale for a tier.
    #[must_use]
    pub fn tier(&self, tier: u8) -> StatScale {
        usize::from(tier)
            .checked_sub(1)
            .and_then(|i| self.tiers.get(i))
            .copied()
            .unwrap_or(StatScale::IDENTITY)
    }

    /// Multipliers for catalogs that list a single base stat line per
    /// archetype and derive higher tiers from it.
    #[must_use]
    pub fn derived_tiers() -> Self {
        let scale = |hp, damage, speed, range, cooldown| StatScale {
            hp,
            damage,
            speed,
            range,
            cooldown,
        };
        let mut archetypes = ArchetypeMap::splat(StatScale::IDENTITY);
        archetypes.set(Archetype::Melee, scale(250, 60, 110, 80, 95));
        archetypes.set(Archetype::Ranged, scale(50, 300, 100, 120, 100));
        archetypes.set(Archetype::Caster, scale(40, 250, 85, 115, 120));
        archetypes.set(Archetype::Healer, scale(65, 0, 95, 100, 150));
        Self {
            tiers: vec![
                StatScale::IDENTITY,
                scale(200, 200, 115, 100, 100),
                scale(400, 400, 130, 100, 100),
            ],
            archetypes,
            global: StatScale::IDENTITY,
        }
    }
}

// ============================================================================
// Rule variants
// ============================================================================

/// Tier-unlock progression rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierRules {
    /// Purchase price of tier 2, 3, ...
    pub unlock_costs: Vec<u32>,
    /// Tier `t` unlocks for free at round `(t - 1) * every`; 0 disables.
    pub auto_unlock_every_rounds: u32,
    /// Bonus gold per tier step granted by a free unlock.
    pub unlock_bonus_gold: u32,
}

impl Default for TierRules {
    fn default() -> Self {
        Self {
            unlock_costs: vec![80, 150],
            auto_unlock_every_rounds: 5,
            unlock_bonus_gold: 50,
        }
    }
}

/// Per-archetype level progression rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelRules {
    /// Unit price increase per upgrade level.
    pub unit_cost_per_level: u32,
    /// Price of the first upgrade.
    pub upgrade_cost_base: u32,
    /// Upgrade price increase per level.
    pub upgrade_cost_per_level: u32,
    /// Free +1 level on every archetype every N rounds; 0 disables.
    pub auto_upgrade_every_rounds: u32,
}

impl Default for LevelRules {
    fn default() -> Self {
        Self {
            unit_cost_per_level: 2,
            upgrade_cost_base: 25,
            upgrade_cost_per_level: 15,
            auto_upgrade_every_rounds: 3,
        }
    }
}

/// Which progression model drives unit strength over a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressionMode {
    /// Higher tiers unlock over time or by purchase.
    Tiered(TierRules),
    /// Tier-1 units only, upgraded per archetype.
    Leveled(LevelRules),
}

/// Catch-up mechanic for the side that is losing lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComebackRule {
    /// No catch-up.
    Disabled,
    /// New units gain `percent_per_life`% hp and damage per life lost.
    StatBoost {
        /// Boost per life lost, in percent.
        percent_per_life: u32,
    },
    /// Every `every` lives lost grant +1 level on every archetype.
    LevelMilestone {
        /// Lives lost per milestone.
        every: u32,
    },
}

/// What happens when a core reaches zero health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndBehavior {
    /// Phase becomes finished; further ticks do nothing.
    Terminal,
    /// Simulation pauses with state intact until restarted.
    FreezeForRestart,
}

/// Mutually exclusive rule choices fixed at match start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameMode {
    /// Progression model.
    pub progression: ProgressionMode,
    /// Catch-up rule.
    pub comeback: ComebackRule,
    /// Game-over handling.
    pub end: EndBehavior,
    /// Never end the match.
    pub infinite: bool,
}

impl Default for GameMode {
    fn default() -> Self {
        Self::tiered()
    }
}

impl GameMode {
    /// Tier unlocks with a stat-boost comeback.
    #[must_use]
    pub fn tiered() -> Self {
        Self {
            progression: ProgressionMode::Tiered(TierRules::default()),
            comeback: ComebackRule::StatBoost {
                percent_per_life: 2,
            },
            end: EndBehavior::Terminal,
            infinite: false,
        }
    }

    /// Archetype levels with a milestone comeback.
    #[must_use]
    pub fn leveled() -> Self {
        Self {
            progression: ProgressionMode::Leveled(LevelRules::default()),
            comeback: ComebackRule::LevelMilestone { every: 5 },
            end: EndBehavior::FreezeForRestart,
            infinite: false,
        }
    }
}

/// AI difficulty, scaling the AI's income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// 80% income.
    Easy,
    /// 100% income.
    #[default]
    Normal,
    /// 120% income.
    Hard,
}

impl Difficulty {
    /// Income multiplier in percent.
    #[must_use]
    pub const fn income_percent(self) -> u32 {
        match self {
            Difficulty::Easy => 80,
            Difficulty::Normal => 100,
            Difficulty::Hard => 120,
        }
    }
}

impl FromStr for Difficulty {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" | "medium" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            other => Err(GameError::ConfigParse {
                what: "difficulty",
                message: format!("unknown difficulty '{other}'"),
            }),
        }
    }
}

// ============================================================================
// Controllers
// ============================================================================

/// Purchase strategy used by a computer-controlled side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Fills a target army composition.
    Balanced,
    /// Always reaches for the strongest affordable unit.
    Aggressive,
    /// Mostly strong picks with random variety.
    Random,
    /// Round-banded archetype weights.
    Scripted,
}

impl StrategyKind {
    /// All strategies.
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Balanced,
        StrategyKind::Aggressive,
        StrategyKind::Random,
        StrategyKind::Scripted,
    ];
}

impl FromStr for StrategyKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "balanced" => Ok(StrategyKind::Balanced),
            "aggressive" => Ok(StrategyKind::Aggressive),
            "random" => Ok(StrategyKind::Random),
            "scripted" => Ok(StrategyKind::Scripted),
            other => Err(GameError::ConfigParse {
                what: "strategy",
                message: format!("unknown strategy '{other}'"),
            }),
        }
    }
}

/// Who drives a side's purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    /// Actions come from the embedding application.
    Human,
    /// Built-in purchasing AI.
    Computer(StrategyKind),
}

/// Controllers for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controllers {
    /// Left side.
    pub player: Controller,
    /// Right side.
    pub ai: Controller,
}

impl Default for Controllers {
    fn default() -> Self {
        Self {
            player: Controller::Human,
            ai: Controller::Computer(StrategyKind::Balanced),
        }
    }
}

impl Controllers {
    /// Controller for a side.
    #[must_use]
    pub const fn get(&self, side: Side) -> Controller {
        match side {
            Side::Player => self.player,
            Side::Ai => self.ai,
        }
    }
}

/// Gradual AI income increase over a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeRamp {
    /// Rounds between steps.
    pub every_rounds: u32,
    /// Income percent added per step.
    pub percent: u32,
}

/// Computer purchasing cadence and placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Game milliseconds between purchase decisions.
    pub decision_interval_ms: u64,
    /// Decision chance added per round, per mille.
    pub chance_per_round_per_mille: u32,
    /// Decision chance cap, per mille.
    pub max_chance_per_mille: u32,
    /// Random spots tried before a placement is abandoned.
    pub placement_attempts: u32,
    /// Distance kept from build-zone edges.
    pub placement_margin: u32,
    /// AI income ramp; `None` keeps income flat.
    pub income_ramp: Option<IncomeRamp>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            decision_interval_ms: 250,
            chance_per_round_per_mille: 30,
            max_chance_per_mille: 900,
            placement_attempts: 30,
            placement_margin: 25,
            income_ramp: Some(IncomeRamp {
                every_rounds: 3,
                percent: 10,
            }),
        }
    }
}

// ============================================================================
// GameConfig
// ============================================================================

/// Complete match configuration.
///
/// # Example RON
///
/// ```ron
/// GameConfig(
///     seed: 7,
///     starting_gold: 80,
///     difficulty: Hard,
///     mode: (
///         progression: Leveled((upgrade_cost_base: 40)),
///         comeback: LevelMilestone(every: 5),
///         end: Terminal,
///         infinite: false,
///     ),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seed for every random decision in the match.
    pub seed: u64,
    /// Geometry.
    pub battlefield: Battlefield,
    /// Gold each side starts with.
    pub starting_gold: u32,
    /// Core health each side starts with.
    pub starting_health: u32,
    /// Build phase length.
    pub build_phase_ms: u64,
    /// Battle phase length.
    pub battle_phase_ms: u64,
    /// Frame deltas are clamped to this before speed scaling.
    pub max_frame_delta_ms: u64,
    /// Highest accepted speed multiplier.
    pub max_game_speed: u32,
    /// Passive income period.
    pub passive_gold_interval_ms: u64,
    /// Passive income per period before bonuses.
    pub passive_gold_amount: u32,
    /// Round bonus base.
    pub round_gold_base: u32,
    /// Round bonus growth per round.
    pub round_gold_per_round: u32,
    /// Kill bounty base.
    pub kill_gold_base: u32,
    /// Kill bounty per rank of the victim.
    pub kill_gold_per_tier: u32,
    /// First economy upgrade price.
    pub economy_upgrade_base_cost: u32,
    /// Economy upgrade price growth per level.
    pub economy_upgrade_cost_per_level: u32,
    /// Core damage per breaching or surviving unit.
    pub base_damage_to_core: u32,
    /// Template cap per build zone.
    pub max_units_per_zone: usize,
    /// Minimum spacing between templates in a zone.
    pub min_unit_distance: u32,
    /// Template lifetime in a build zone (wall-clock, pause excluded).
    pub template_ttl_ms: u64,
    /// Grace window after spawning during which a unit cannot be hit.
    pub invulnerability_ms: u64,
    /// Allies closer than this block movement.
    pub collision_radius: u32,
    /// Fallback step size when the full step is blocked, in percent.
    pub reduced_step_percent: u32,
    /// Projectile flight.
    pub projectile: ProjectileConfig,
    /// Stuck detection.
    pub stuck: StuckConfig,
    /// Level multipliers.
    pub upgrades: UpgradeConfig,
    /// Balance multipliers.
    pub balance: BalanceTable,
    /// Rule variants.
    pub mode: GameMode,
    /// AI income scaling.
    pub difficulty: Difficulty,
    /// Computer purchasing.
    pub ai: AiConfig,
    /// Who controls each side.
    pub controllers: Controllers,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            battlefield: Battlefield::default(),
            starting_gold: 50,
            starting_health: 100,
            build_phase_ms: 10_000,
            battle_phase_ms: 30_000,
            max_frame_delta_ms: 100,
            max_game_speed: 10,
            passive_gold_interval_ms: 1000,
            passive_gold_amount: 1,
            round_gold_base: 8,
            round_gold_per_round: 2,
            kill_gold_base: 1,
            kill_gold_per_tier: 2,
            economy_upgrade_base_cost: 50,
            economy_upgrade_cost_per_level: 25,
            base_damage_to_core: 1,
            max_units_per_zone: 999,
            min_unit_distance: 25,
            template_ttl_ms: 40_000,
            invulnerability_ms: 500,
            collision_radius: 8,
            reduced_step_percent: 30,
            projectile: ProjectileConfig::default(),
            stuck: StuckConfig::default(),
            upgrades: UpgradeConfig::default(),
            balance: BalanceTable::default(),
            mode: GameMode::default(),
            difficulty: Difficulty::default(),
            ai: AiConfig::default(),
            controllers: Controllers::default(),
        }
    }
}

impl GameConfig {
    /// Parse a config from RON text. Missing fields keep their defaults.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::ConfigParse {
            what: "game config",
            message: e.to_string(),
        })
    }

    /// Both sides computer controlled.
    #[must_use]
    pub fn ai_vs_ai(mut self, player: StrategyKind, ai: StrategyKind) -> Self {
        self.controllers = Controllers {
            player: Controller::Computer(player),
            ai: Controller::Computer(ai),
        };
        self
    }

    /// Replace the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replace the rule variants.
    #[must_use]
    pub fn with_mode(mut self, mode: GameMode) -> Self {
        self.mode = mode;
        self
    }
}
