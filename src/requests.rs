//! Request bodies and their validation into typed commands.
//!
//! Clients send loosely typed JSON (numbers as strings, missing fields, junk).
//! Each body is deserialized leniently into `Option<Value>` fields and then
//! validated into a strongly typed request before the match is touched. The
//! first failing field rejects the whole request.

use serde::Deserialize;
use serde_json::Value;

use crate::error::MatchError;
use crate::types::{PlayerId, TeamKey};

/// Reads an integer-valued number. Fractions truncate toward zero; numeric strings
/// are accepted. Returns `None` for anything that is not a usable number.
pub fn lenient_number(value: Option<&Value>) -> Option<i64> {
    let n = match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))?
        }
        _ => return None,
    };
    Some(n)
}

/// Reads a strict integer: whole JSON numbers or strings holding an integer.
fn strict_integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn required_id(value: Option<&Value>, field: &str) -> Result<PlayerId, MatchError> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Ok(PlayerId(s.clone())),
        _ => Err(MatchError::InvalidInput(format!("{} is required", field))),
    }
}

fn optional_id(value: Option<&Value>, field: &str) -> Result<Option<PlayerId>, MatchError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        other => required_id(other, field).map(Some),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JoinBody {
    pub code: Option<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoinRequest {
    pub code: i64,
}

impl JoinBody {
    pub fn validate(&self) -> Result<JoinRequest, MatchError> {
        let code = strict_integer(self.code.as_ref())
            .ok_or_else(|| MatchError::InvalidInput("code must be an integer between 0 and 99".into()))?;
        Ok(JoinRequest { code })
    }
}

/// Body carrying only a player id (leave, obtain, capture).
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerBody {
    pub player_id: Option<Value>,
}

impl PlayerBody {
    pub fn validate(&self) -> Result<PlayerId, MatchError> {
        required_id(self.player_id.as_ref(), "playerId")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateBody {
    pub player_id: Option<Value>,
    pub kills: Option<Value>,
    pub health: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateRequest {
    pub player_id: PlayerId,
    pub kills: Option<i64>,
    pub health: Option<i64>,
}

impl UpdateBody {
    pub fn validate(&self) -> Result<UpdateRequest, MatchError> {
        Ok(UpdateRequest {
            player_id: required_id(self.player_id.as_ref(), "playerId")?,
            kills: lenient_number(self.kills.as_ref()),
            health: lenient_number(self.health.as_ref()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttackBody {
    pub attacker_id: Option<Value>,
    pub target_id: Option<Value>,
    pub damage: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttackRequest {
    pub attacker_id: PlayerId,
    pub target_id: PlayerId,
    pub damage: Option<i64>,
}

impl AttackBody {
    pub fn validate(&self) -> Result<AttackRequest, MatchError> {
        Ok(AttackRequest {
            attacker_id: required_id(self.attacker_id.as_ref(), "attackerId")?,
            target_id: required_id(self.target_id.as_ref(), "targetId")?,
            damage: lenient_number(self.damage.as_ref()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealBody {
    pub healer_id: Option<Value>,
    pub target_id: Option<Value>,
    pub amount: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealRequest {
    pub healer_id: Option<PlayerId>,
    pub target_id: PlayerId,
    pub amount: Option<i64>,
}

impl HealBody {
    pub fn validate(&self) -> Result<HealRequest, MatchError> {
        Ok(HealRequest {
            healer_id: optional_id(self.healer_id.as_ref(), "healerId")?,
            target_id: required_id(self.target_id.as_ref(), "targetId")?,
            amount: lenient_number(self.amount.as_ref()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangeTeamBody {
    pub player_id: Option<Value>,
    pub team: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeTeamRequest {
    pub player_id: PlayerId,
    pub team: TeamKey,
}

impl ChangeTeamBody {
    pub fn validate(&self) -> Result<ChangeTeamRequest, MatchError> {
        let player_id = required_id(self.player_id.as_ref(), "playerId")?;
        let team = self
            .team
            .as_ref()
            .and_then(Value::as_str)
            .and_then(TeamKey::parse)
            .ok_or_else(|| MatchError::InvalidInput("team must be \"blue\" or \"red\"".into()))?;
        Ok(ChangeTeamRequest { player_id, team })
    }
}
