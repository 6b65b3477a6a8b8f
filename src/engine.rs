//! Match state engine.
//!
//! [`Match`] owns every piece of session state (players, teams, flag holder, event
//! log, display-number counter) and exposes the transition operations the API
//! calls. Callers serialize access (the server keeps it behind one mutex), so each
//! operation runs to completion on its own. Every operation validates before it
//! mutates: a returned error means nothing changed.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use log::info;

use crate::error::MatchError;
use crate::events::{Event, EventLog, DEFAULT_EVENT_CAPACITY};
use crate::types::{Player, PlayerId, Team, TeamKey, MAX_CODE, MAX_HEALTH};

/// First display number handed out after start or restart.
pub const FIRST_PLAYER_NUMBER: u32 = 4;
/// Damage used when an attack carries no usable number.
pub const DEFAULT_DAMAGE: i64 = 10;
/// Heal amount used when a heal carries no usable number.
pub const DEFAULT_HEAL: i64 = 20;

/// Result of a successful join.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinOutcome {
    pub player_id: PlayerId,
    pub player: Player,
}

/// Read-only view of the match for polling clients.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    pub players: Vec<Player>,
    pub teams: BTreeMap<TeamKey, Team>,
    pub flag_holder: Option<PlayerId>,
    pub my_player_id: Option<PlayerId>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObtainOutcome {
    pub obtained_by: PlayerId,
    pub previous_holder: Option<PlayerId>,
    pub flag_holder: Option<PlayerId>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOutcome {
    pub team: TeamKey,
    pub flags_captured: u32,
    pub flag_holder: Option<PlayerId>,
}

#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackOutcome {
    pub attacker: Player,
    pub target: Player,
    pub killed: bool,
    pub flag_holder: Option<PlayerId>,
}

fn fresh_teams() -> BTreeMap<TeamKey, Team> {
    TeamKey::ALL.iter().map(|&k| (k, Team::new(k))).collect()
}

/// The single authoritative match.
///
/// Players are keyed by id; `by_code` and `by_source` are secondary indexes kept in
/// step with `players` on every insert and removal.
#[derive(Debug)]
pub struct Match {
    players: HashMap<PlayerId, Player>,
    by_code: HashMap<u8, PlayerId>,
    by_source: HashMap<String, PlayerId>,
    teams: BTreeMap<TeamKey, Team>,
    flag_holder: Option<PlayerId>,
    events: EventLog,
    next_number: u32,
    /// Never reset, so ids stay unique across restarts.
    id_serial: u64,
}

impl Default for Match {
    fn default() -> Self {
        Self::new()
    }
}

impl Match {
    /// Creates an empty match retaining up to 2000 events.
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_event_capacity(capacity: usize) -> Self {
        Self {
            players: HashMap::new(),
            by_code: HashMap::new(),
            by_source: HashMap::new(),
            teams: fresh_teams(),
            flag_holder: None,
            events: EventLog::with_capacity(capacity),
            next_number: FIRST_PLAYER_NUMBER,
            id_serial: 0,
        }
    }

    /// Registers a new player for `identity_source`.
    ///
    /// Fails with `InvalidInput` when `code` is outside 0..=99 and with `Conflict`
    /// when the code or the identity already belongs to an active player.
    pub fn join(&mut self, code: i64, identity_source: &str) -> Result<JoinOutcome, MatchError> {
        let code = u8::try_from(code)
            .ok()
            .filter(|c| *c <= MAX_CODE)
            .ok_or_else(|| MatchError::InvalidInput(format!("code must be an integer between 0 and {}", MAX_CODE)))?;
        if self.by_code.contains_key(&code) {
            return Err(MatchError::Conflict(format!("Code {} is already in use", code)));
        }
        if self.by_source.contains_key(identity_source) {
            return Err(MatchError::Conflict(format!(
                "A player is already registered from {}",
                identity_source
            )));
        }

        let team = self.balanced_team();
        let now = Utc::now();
        let id = self.allocate_id(identity_source, now.timestamp_millis());
        let number = self.next_number;
        self.next_number += 1;
        let player = Player {
            id: id.clone(),
            number,
            code,
            name: format!("Player {}", number),
            identity_source: identity_source.to_string(),
            team,
            kills: 0,
            health: MAX_HEALTH,
            joined_at: now.timestamp_millis(),
        };

        info!(
            "player joined player_id={} number={} code={} team={} source={}",
            id, number, code, team, identity_source
        );
        let team_name = self.team_name(team);
        self.events.push(Event::at(
            now,
            format!("{} joined team {} with code {}", player.name, team_name, code),
        ));
        self.by_code.insert(code, id.clone());
        self.by_source.insert(identity_source.to_string(), id.clone());
        self.players.insert(id.clone(), player.clone());
        Ok(JoinOutcome { player_id: id, player })
    }

    /// Snapshot of all players (by display number), teams, and flag holder.
    /// `caller_source` resolves `my_player_id`.
    pub fn roster(&self, caller_source: Option<&str>) -> Roster {
        let mut players: Vec<Player> = self.players.values().cloned().collect();
        players.sort_by_key(|p| p.number);
        Roster {
            players,
            teams: self.teams.clone(),
            flag_holder: self.flag_holder.clone(),
            my_player_id: caller_source.and_then(|s| self.player_for_source(s).cloned()),
        }
    }

    /// Sets kills (clamped to ≥0) and/or health (clamped to 0..=100).
    ///
    /// Dropping a flag holder to zero health here also returns the flag to neutral;
    /// unlike an attack, no respawn happens.
    pub fn update_stats(
        &mut self,
        player_id: &PlayerId,
        kills: Option<i64>,
        health: Option<i64>,
    ) -> Result<Player, MatchError> {
        let player = self
            .players
            .get_mut(player_id)
            .ok_or_else(|| MatchError::player_not_found(player_id))?;
        if let Some(k) = kills {
            player.kills = k.clamp(0, u32::MAX as i64) as u32;
        }
        if let Some(h) = health {
            player.health = h.clamp(0, MAX_HEALTH as i64) as u8;
        }
        let updated = player.clone();
        info!(
            "player updated player_id={} kills={} health={}",
            player_id, updated.kills, updated.health
        );
        if !updated.is_alive() && self.flag_holder.as_ref() == Some(player_id) {
            info!("flag returned to neutral holder={}", player_id);
            self.flag_holder = None;
        }
        Ok(updated)
    }

    /// Removes a player, releasing its code, its identity, and the flag if held.
    pub fn remove(&mut self, player_id: &PlayerId) -> Result<Player, MatchError> {
        let player = self
            .players
            .remove(player_id)
            .ok_or_else(|| MatchError::player_not_found(player_id))?;
        self.by_code.remove(&player.code);
        self.by_source.remove(&player.identity_source);
        if self.flag_holder.as_ref() == Some(player_id) {
            self.flag_holder = None;
        }
        info!("player removed player_id={} number={}", player_id, player.number);
        self.events.record(format!("{} left the match", player.name));
        Ok(player)
    }

    /// Hands the flag to `player_id`, whoever held it before.
    pub fn obtain_flag(&mut self, player_id: &PlayerId) -> Result<ObtainOutcome, MatchError> {
        let name = self.require(player_id)?.name.clone();
        let previous = self.flag_holder.replace(player_id.clone());
        let previous_name = previous
            .as_ref()
            .and_then(|p| self.players.get(p))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "none".to_string());
        info!(
            "flag obtained holder={} previous={}",
            player_id,
            previous.as_ref().map(PlayerId::as_str).unwrap_or("none")
        );
        self.events
            .record(format!("{} obtained the flag (previous holder: {})", name, previous_name));
        Ok(ObtainOutcome {
            obtained_by: player_id.clone(),
            previous_holder: previous,
            flag_holder: self.flag_holder.clone(),
        })
    }

    /// Scores the held flag for the holder's team and returns the flag to neutral.
    pub fn capture_flag(&mut self, player_id: &PlayerId) -> Result<CaptureOutcome, MatchError> {
        let player = self.require(player_id)?;
        let (name, team_key) = (player.name.clone(), player.team);
        if !self.teams.contains_key(&team_key) {
            return Err(MatchError::BadState(format!("{} has no valid team", name)));
        }
        if self.flag_holder.as_ref() != Some(player_id) {
            return Err(MatchError::InvalidTransition(format!("{} is not holding the flag", name)));
        }
        let team = self
            .teams
            .get_mut(&team_key)
            .ok_or_else(|| MatchError::BadState(format!("{} has no valid team", name)))?;
        team.flags_captured += 1;
        let (team_name, flags_captured) = (team.name.clone(), team.flags_captured);
        self.flag_holder = None;
        info!(
            "flag captured holder={} team={} flags_captured={}",
            player_id, team_key, flags_captured
        );
        self.events.record(format!(
            "{} captured the flag for team {} ({} total)",
            name, team_name, flags_captured
        ));
        Ok(CaptureOutcome {
            team: team_key,
            flags_captured,
            flag_holder: None,
        })
    }

    /// Applies damage (default 10, negatives count as 0) from attacker to target.
    ///
    /// Reaching exactly 0 health is a kill: the attacker gains one kill, the target
    /// drops the flag if held and respawns at full health in the same call.
    pub fn attack(
        &mut self,
        attacker_id: &PlayerId,
        target_id: &PlayerId,
        damage: Option<i64>,
    ) -> Result<AttackOutcome, MatchError> {
        let damage = damage.unwrap_or(DEFAULT_DAMAGE).max(0);
        let attacker_name = self.require(attacker_id)?.name.clone();
        let target = self.require(target_id)?;
        if attacker_id == target_id {
            return Err(MatchError::InvalidTransition("A player cannot attack themselves".into()));
        }
        let target_name = target.name.clone();
        let remaining = (target.health as i64).saturating_sub(damage).max(0) as u8;

        self.events.record(format!(
            "{} attacked {} for {} damage ({} HP left)",
            attacker_name, target_name, damage, remaining
        ));
        let killed = remaining == 0;
        let mut dropped_flag = false;
        if killed {
            if let Some(attacker) = self.players.get_mut(attacker_id) {
                attacker.kills = attacker.kills.saturating_add(1);
            }
            if self.flag_holder.as_ref() == Some(target_id) {
                self.flag_holder = None;
                dropped_flag = true;
            }
        }
        if let Some(target) = self.players.get_mut(target_id) {
            target.health = if killed { MAX_HEALTH } else { remaining };
        }
        info!(
            "attack attacker={} target={} damage={} remaining={} killed={}",
            attacker_id, target_id, damage, remaining, killed
        );
        if killed {
            let suffix = if dropped_flag { " and dropped the flag" } else { "" };
            self.events
                .record(format!("{} eliminated {}{}", attacker_name, target_name, suffix));
            self.events
                .record(format!("{} respawned with {} HP", target_name, MAX_HEALTH));
        }

        Ok(AttackOutcome {
            attacker: self.require(attacker_id)?.clone(),
            target: self.require(target_id)?.clone(),
            killed,
            flag_holder: self.flag_holder.clone(),
        })
    }

    /// Raises target health by `amount` (default 20, negatives count as 0), capped at 100.
    /// Without a healer the heal is attributed to "System".
    pub fn heal(
        &mut self,
        healer_id: Option<&PlayerId>,
        target_id: &PlayerId,
        amount: Option<i64>,
    ) -> Result<Player, MatchError> {
        let amount = amount.unwrap_or(DEFAULT_HEAL).max(0);
        let target_name = self.require(target_id)?.name.clone();
        let healer_name = match healer_id {
            Some(id) => self.require(id)?.name.clone(),
            None => "System".to_string(),
        };
        let target = self
            .players
            .get_mut(target_id)
            .ok_or_else(|| MatchError::player_not_found(target_id))?;
        target.health = (target.health as i64).saturating_add(amount).min(MAX_HEALTH as i64) as u8;
        let healed = target.clone();
        info!(
            "heal healer={} target={} amount={} health={}",
            healer_id.map(PlayerId::as_str).unwrap_or("system"),
            target_id,
            amount,
            healed.health
        );
        self.events.record(format!(
            "{} healed {} for {} ({} HP)",
            healer_name, target_name, amount, healed.health
        ));
        Ok(healed)
    }

    /// Moves a player to `team`. No rebalancing follows a manual change.
    pub fn change_team(&mut self, player_id: &PlayerId, team: TeamKey) -> Result<Player, MatchError> {
        let team_name = self.team_name(team);
        let player = self
            .players
            .get_mut(player_id)
            .ok_or_else(|| MatchError::player_not_found(player_id))?;
        player.team = team;
        let changed = player.clone();
        info!("team changed player_id={} team={}", player_id, team);
        self.events
            .record(format!("{} switched to team {}", changed.name, team_name));
        Ok(changed)
    }

    /// Retained event log, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.events.to_vec()
    }

    /// Clears players, captures, flag, and log; numbering starts again at 4.
    pub fn restart(&mut self) {
        self.players.clear();
        self.by_code.clear();
        self.by_source.clear();
        self.teams = fresh_teams();
        self.flag_holder = None;
        self.events.clear();
        self.next_number = FIRST_PLAYER_NUMBER;
        info!("match restarted");
        self.events.record("Match restarted");
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Active player registered from `source`, if any.
    pub fn player_for_source(&self, source: &str) -> Option<&PlayerId> {
        self.by_source.get(source)
    }

    pub fn player_for_code(&self, code: u8) -> Option<&PlayerId> {
        self.by_code.get(&code)
    }

    pub fn team(&self, key: TeamKey) -> Option<&Team> {
        self.teams.get(&key)
    }

    pub fn teams(&self) -> &BTreeMap<TeamKey, Team> {
        &self.teams
    }

    pub fn flag_holder(&self) -> Option<&PlayerId> {
        self.flag_holder.as_ref()
    }

    pub fn next_number(&self) -> u32 {
        self.next_number
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn event_capacity(&self) -> usize {
        self.events.capacity()
    }

    /// Active players per team.
    pub fn team_counts(&self) -> BTreeMap<TeamKey, usize> {
        let mut counts: BTreeMap<TeamKey, usize> = TeamKey::ALL.iter().map(|&k| (k, 0)).collect();
        for p in self.players.values() {
            *counts.entry(p.team).or_insert(0) += 1;
        }
        counts
    }

    fn require(&self, player_id: &PlayerId) -> Result<&Player, MatchError> {
        self.players
            .get(player_id)
            .ok_or_else(|| MatchError::player_not_found(player_id))
    }

    /// Team with fewer active players; ties go to blue.
    fn balanced_team(&self) -> TeamKey {
        let counts = self.team_counts();
        let blue = counts.get(&TeamKey::Blue).copied().unwrap_or(0);
        let red = counts.get(&TeamKey::Red).copied().unwrap_or(0);
        if red < blue {
            TeamKey::Red
        } else {
            TeamKey::Blue
        }
    }

    fn team_name(&self, key: TeamKey) -> String {
        self.teams
            .get(&key)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| key.to_string())
    }

    /// Identity + join instant + process-wide serial.
    fn allocate_id(&mut self, identity_source: &str, millis: i64) -> PlayerId {
        let prefix: String = identity_source
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        self.id_serial += 1;
        PlayerId(format!("{}-{}-{}", prefix, millis, self.id_serial))
    }
}
