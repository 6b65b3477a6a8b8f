//! Synthetic match scenarios.
//!
//! Deterministic, configurable action streams for property tests, demos, and
//! benchmarks. Same seed ⇒ same sequence of actions. Actions address players by
//! slot (position in the roster at replay time) so a stream stays meaningful as
//! players come and go; a slot on an empty match resolves to an unknown id.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::Match;
use crate::error::MatchError;
use crate::types::{PlayerId, TeamKey};

/// One operation against a match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Join { code: i64, source: String },
    Leave { slot: usize },
    Update { slot: usize, kills: Option<i64>, health: Option<i64> },
    Obtain { slot: usize },
    Capture { slot: usize },
    Attack { attacker: usize, target: usize, damage: Option<i64> },
    Heal { healer: Option<usize>, target: usize, amount: Option<i64> },
    ChangeTeam { slot: usize, team: TeamKey },
    Restart,
}

/// Relative weights of each action kind. Zero disables a kind.
#[derive(Clone, Debug)]
pub struct ActionMix {
    pub join: u32,
    pub leave: u32,
    pub update: u32,
    pub obtain: u32,
    pub capture: u32,
    pub attack: u32,
    pub heal: u32,
    pub change_team: u32,
    pub restart: u32,
}

impl ActionMix {
    /// Joins only; used to check team balancing.
    pub fn joins_only() -> Self {
        Self {
            join: 1,
            leave: 0,
            update: 0,
            obtain: 0,
            capture: 0,
            attack: 0,
            heal: 0,
            change_team: 0,
            restart: 0,
        }
    }

    fn weights(&self) -> [u32; 9] {
        [
            self.join,
            self.leave,
            self.update,
            self.obtain,
            self.capture,
            self.attack,
            self.heal,
            self.change_team,
            self.restart,
        ]
    }
}

impl Default for ActionMix {
    fn default() -> Self {
        Self {
            join: 20,
            leave: 5,
            update: 5,
            obtain: 10,
            capture: 10,
            attack: 35,
            heal: 10,
            change_team: 4,
            restart: 1,
        }
    }
}

/// Configuration for the scenario generator. Same config + seed ⇒ same stream.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub num_actions: usize,
    /// Distinct identity sources joins are drawn from.
    pub num_sources: usize,
    /// Join codes are drawn from `-5..=max_code`, so some fall outside 0..=99.
    pub max_code: i64,
    /// Probability that a numeric field is absent (non-numeric on the wire).
    pub junk_ratio: f64,
    pub max_damage: i64,
    pub mix: ActionMix,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_actions: 500,
            num_sources: 16,
            max_code: 110,
            junk_ratio: 0.1,
            max_damage: 120,
            mix: ActionMix::default(),
        }
    }
}

/// Deterministic action stream. Create with [`Generator::new`].
pub struct Generator {
    rng: StdRng,
    config: GeneratorConfig,
    next_source: usize,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            rng,
            config,
            next_source: 0,
        }
    }

    fn slot(&mut self) -> usize {
        self.rng.gen_range(0..64)
    }

    /// Signed number that may go negative, or `None` at `junk_ratio`.
    fn number(&mut self, max: i64) -> Option<i64> {
        if self.rng.gen::<f64>() < self.config.junk_ratio {
            return None;
        }
        Some(self.rng.gen_range(-max / 4..=max))
    }

    pub fn next_action(&mut self) -> Action {
        let weights = self.config.mix.weights();
        let total: u32 = weights.iter().sum();
        let mut pick = self.rng.gen_range(0..total.max(1));
        let mut kind = 0;
        for (i, w) in weights.iter().enumerate() {
            if pick < *w {
                kind = i;
                break;
            }
            pick -= *w;
        }
        let max_damage = self.config.max_damage;
        match kind {
            0 => {
                let code = self.rng.gen_range(-5..=self.config.max_code);
                let source = format!("10.0.0.{}", self.next_source % self.config.num_sources.max(1));
                self.next_source += 1;
                Action::Join { code, source }
            }
            1 => Action::Leave { slot: self.slot() },
            2 => Action::Update {
                slot: self.slot(),
                kills: self.number(20),
                health: self.number(150),
            },
            3 => Action::Obtain { slot: self.slot() },
            4 => Action::Capture { slot: self.slot() },
            5 => Action::Attack {
                attacker: self.slot(),
                target: self.slot(),
                damage: self.number(max_damage),
            },
            6 => Action::Heal {
                healer: if self.rng.gen_bool(0.5) { Some(self.slot()) } else { None },
                target: self.slot(),
                amount: self.number(60),
            },
            7 => Action::ChangeTeam {
                slot: self.slot(),
                team: if self.rng.gen_bool(0.5) { TeamKey::Blue } else { TeamKey::Red },
            },
            _ => Action::Restart,
        }
    }

    pub fn take_actions(&mut self, n: usize) -> Vec<Action> {
        (0..n).map(|_| self.next_action()).collect()
    }

    /// Returns the full stream as defined by `config.num_actions`.
    pub fn all_actions(&mut self) -> Vec<Action> {
        self.take_actions(self.config.num_actions)
    }
}

/// Player id in `slot` of the current roster (ordered by display number).
pub fn resolve_slot(game: &Match, slot: usize) -> PlayerId {
    let roster = game.roster(None);
    if roster.players.is_empty() {
        return PlayerId::from("missing");
    }
    roster.players[slot % roster.players.len()].id.clone()
}

/// Applies one action.
pub fn apply(game: &mut Match, action: &Action) -> Result<(), MatchError> {
    match action {
        Action::Join { code, source } => game.join(*code, source).map(|_| ()),
        Action::Leave { slot } => {
            let id = resolve_slot(game, *slot);
            game.remove(&id).map(|_| ())
        }
        Action::Update { slot, kills, health } => {
            let id = resolve_slot(game, *slot);
            game.update_stats(&id, *kills, *health).map(|_| ())
        }
        Action::Obtain { slot } => {
            let id = resolve_slot(game, *slot);
            game.obtain_flag(&id).map(|_| ())
        }
        Action::Capture { slot } => {
            let id = resolve_slot(game, *slot);
            game.capture_flag(&id).map(|_| ())
        }
        Action::Attack { attacker, target, damage } => {
            let attacker = resolve_slot(game, *attacker);
            let target = resolve_slot(game, *target);
            game.attack(&attacker, &target, *damage).map(|_| ())
        }
        Action::Heal { healer, target, amount } => {
            let healer = (*healer).map(|s| resolve_slot(game, s));
            let target = resolve_slot(game, *target);
            game.heal(healer.as_ref(), &target, *amount).map(|_| ())
        }
        Action::ChangeTeam { slot, team } => {
            let id = resolve_slot(game, *slot);
            game.change_team(&id, *team).map(|_| ())
        }
        Action::Restart => {
            game.restart();
            Ok(())
        }
    }
}

/// Outcome counts of a replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub applied: usize,
    pub rejected: usize,
}

/// Replays actions into the match. Rejections are counted, not returned.
pub fn replay(game: &mut Match, actions: impl IntoIterator<Item = Action>) -> ReplayStats {
    replay_checked(game, actions, |_, _| {})
}

/// Replays actions, calling `check` after each one with the match and the action.
pub fn replay_checked<F>(game: &mut Match, actions: impl IntoIterator<Item = Action>, mut check: F) -> ReplayStats
where
    F: FnMut(&Match, &Action),
{
    let mut stats = ReplayStats::default();
    for action in actions {
        match apply(game, &action) {
            Ok(()) => stats.applied += 1,
            Err(_) => stats.rejected += 1,
        }
        check(game, &action);
    }
    stats
}
