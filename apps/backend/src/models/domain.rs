use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::errors::{Result, ScoreboardError};

// ============================================================================
// LIMITS
// ============================================================================

pub const MAX_CODE_LEN: usize = 10;
pub const MAX_NAME_LEN: usize = 50;
pub const MAX_LOGO_LEN: usize = 200;

/// Fields an operator may write through the update gateway
pub const UPDATABLE_FIELDS: &[&str] = &[
    "home_name",
    "away_name",
    "home_score",
    "away_score",
    "home_fouls",
    "away_fouls",
    "home_timeouts",
    "away_timeouts",
    "period",
    "game_clock",
    "shot_clock",
    "home_logo",
    "away_logo",
    "ended",
];

const READ_ONLY_FIELDS: &[&str] = &["code", "revision", "preset", "created_at"];

// ============================================================================
// SESSION CODE
// ============================================================================

/// Case-normalized session code, e.g. "ABC1"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionCode(String);

impl SessionCode {
    /// Trim and upper-case `raw`, then check length and alphabet
    pub fn parse(raw: &str) -> Result<Self> {
        let code = raw.trim().to_uppercase();

        if code.is_empty() {
            return Err(ScoreboardError::InvalidSessionCode {
                message: "code must not be empty".to_string(),
            });
        }
        if code.chars().count() > MAX_CODE_LEN {
            return Err(ScoreboardError::InvalidSessionCode {
                message: format!("code must be at most {} characters", MAX_CODE_LEN),
            });
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ScoreboardError::InvalidSessionCode {
                message: "code may only contain letters, digits, '-' and '_'".to_string(),
            });
        }

        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionCode {
    type Err = ScoreboardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for SessionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SessionCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SessionCode::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// GAME CLOCK
// ============================================================================

const MAX_CLOCK_MINUTE_DIGITS: usize = 3;

/// Whole-second countdown rendered as "mm:ss"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct GameClock {
    seconds: u32,
}

impl GameClock {
    pub const ZERO: GameClock = GameClock { seconds: 0 };
    /// 999:59, the largest value "mm:ss" can render and parse back
    pub const MAX: GameClock = GameClock {
        seconds: 999 * 60 + 59,
    };

    pub const fn from_seconds(seconds: u32) -> Self {
        Self { seconds }
    }

    /// Checked constructor for untrusted input
    pub fn try_from_seconds(seconds: u64) -> Result<Self> {
        u32::try_from(seconds)
            .ok()
            .filter(|&seconds| seconds <= Self::MAX.seconds)
            .map(Self::from_seconds)
            .ok_or_else(|| {
                ScoreboardError::invalid_value(
                    "game_clock",
                    format!("must be between 0 and {} seconds", Self::MAX.seconds),
                )
            })
    }

    pub fn seconds(self) -> u32 {
        self.seconds
    }

    pub fn is_zero(self) -> bool {
        self.seconds == 0
    }

    /// One second less, floored at 00:00
    pub fn tick(self) -> Self {
        Self {
            seconds: self.seconds.saturating_sub(1),
        }
    }
}

impl fmt::Display for GameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.seconds / 60, self.seconds % 60)
    }
}

impl FromStr for GameClock {
    type Err = ScoreboardError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || ScoreboardError::invalid_value("game_clock", format!("'{}' is not mm:ss", s));

        let (minutes, seconds) = s.trim().split_once(':').ok_or_else(malformed)?;
        if minutes.is_empty()
            || minutes.len() > MAX_CLOCK_MINUTE_DIGITS
            || seconds.len() != 2
            || !minutes.bytes().all(|b| b.is_ascii_digit())
            || !seconds.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }

        let minutes: u32 = minutes.parse().map_err(|_| malformed())?;
        let seconds: u32 = seconds.parse().map_err(|_| malformed())?;
        if seconds >= 60 {
            return Err(malformed());
        }

        Ok(Self::from_seconds(minutes * 60 + seconds))
    }
}

impl Serialize for GameClock {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GameClock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Seconds(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Repr::Seconds(seconds) => {
                GameClock::try_from_seconds(seconds).map_err(serde::de::Error::custom)
            }
        }
    }
}

// ============================================================================
// ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Home,
    Away,
}

impl Team {
    fn prefix(self) -> &'static str {
        match self {
            Team::Home => "home",
            Team::Away => "away",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClockAction {
    Start,
    Pause,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClockState {
    Idle,
    Running,
    /// Both clocks reached zero and no timer is live
    Expired,
}

/// Fan-out only events; they never touch session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Buzzer,
}

// ============================================================================
// DOMAIN TYPES
// ============================================================================

/// Starting values restored by a clock reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClockPreset {
    #[schema(value_type = String, example = "10:00")]
    pub game_clock: GameClock,
    pub shot_clock: u32,
}

impl Default for ClockPreset {
    fn default() -> Self {
        Self {
            game_clock: GameClock::from_seconds(10 * 60),
            shot_clock: 24,
        }
    }
}

/// One scoreboard. A clone of it is the snapshot every subscriber receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Session {
    #[schema(value_type = String, example = "ABC1")]
    pub code: SessionCode,
    pub home_name: String,
    pub away_name: String,
    pub home_score: u32,
    pub away_score: u32,
    pub home_fouls: u32,
    pub away_fouls: u32,
    pub home_timeouts: u32,
    pub away_timeouts: u32,
    pub period: u32,
    #[schema(value_type = String, example = "10:00")]
    pub game_clock: GameClock,
    pub shot_clock: u32,
    pub home_logo: Option<String>,
    pub away_logo: Option<String>,
    pub ended: bool,
    /// Bumped by every commit that changes a field
    pub revision: u64,
    pub preset: ClockPreset,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(code: SessionCode, preset: ClockPreset) -> Self {
        Self {
            code,
            home_name: "Home".to_string(),
            away_name: "Away".to_string(),
            home_score: 0,
            away_score: 0,
            home_fouls: 0,
            away_fouls: 0,
            home_timeouts: 0,
            away_timeouts: 0,
            period: 1,
            game_clock: preset.game_clock,
            shot_clock: preset.shot_clock,
            home_logo: None,
            away_logo: None,
            ended: false,
            revision: 0,
            preset,
            created_at: Utc::now(),
        }
    }

    /// Write one validated update. Returns true if the value changed.
    pub fn apply(&mut self, update: &FieldUpdate) -> bool {
        fn set<T: PartialEq>(slot: &mut T, value: T) -> bool {
            if *slot == value {
                false
            } else {
                *slot = value;
                true
            }
        }

        match update {
            FieldUpdate::TeamName(team, name) => {
                let slot = match team {
                    Team::Home => &mut self.home_name,
                    Team::Away => &mut self.away_name,
                };
                set(slot, name.clone())
            }
            FieldUpdate::Score(team, adjust) => {
                let slot = match team {
                    Team::Home => &mut self.home_score,
                    Team::Away => &mut self.away_score,
                };
                let value = adjust.resolve(*slot, 0);
                set(slot, value)
            }
            FieldUpdate::Fouls(team, adjust) => {
                let slot = match team {
                    Team::Home => &mut self.home_fouls,
                    Team::Away => &mut self.away_fouls,
                };
                let value = adjust.resolve(*slot, 0);
                set(slot, value)
            }
            FieldUpdate::Timeouts(team, adjust) => {
                let slot = match team {
                    Team::Home => &mut self.home_timeouts,
                    Team::Away => &mut self.away_timeouts,
                };
                let value = adjust.resolve(*slot, 0);
                set(slot, value)
            }
            FieldUpdate::Period(adjust) => {
                let period = adjust.resolve(self.period, 1);
                set(&mut self.period, period)
            }
            FieldUpdate::GameClock(clock) => set(&mut self.game_clock, *clock),
            FieldUpdate::ShotClock(seconds) => set(&mut self.shot_clock, *seconds),
            FieldUpdate::Logo(team, logo) => {
                let slot = match team {
                    Team::Home => &mut self.home_logo,
                    Team::Away => &mut self.away_logo,
                };
                set(slot, logo.clone())
            }
            FieldUpdate::Ended(ended) => set(&mut self.ended, *ended),
        }
    }

    /// Count both clocks down by one second. Returns true while either is still running.
    pub fn tick_clocks(&mut self) -> bool {
        self.game_clock = self.game_clock.tick();
        self.shot_clock = self.shot_clock.saturating_sub(1);
        !self.clocks_expired()
    }

    pub fn reset_clocks(&mut self) {
        self.game_clock = self.preset.game_clock;
        self.shot_clock = self.preset.shot_clock;
    }

    pub fn clocks_expired(&self) -> bool {
        self.game_clock.is_zero() && self.shot_clock == 0
    }
}

// ============================================================================
// FIELD UPDATES
// ============================================================================

/// Absolute or relative change to a counter field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    Set(i64),
    Delta(i64),
}

impl Adjust {
    /// Apply to `current`, clamping into `floor..=u32::MAX`
    pub fn resolve(self, current: u32, floor: u32) -> u32 {
        let target = match self {
            Adjust::Set(value) => value,
            Adjust::Delta(delta) => i64::from(current).saturating_add(delta),
        };
        target.clamp(i64::from(floor), i64::from(u32::MAX)) as u32
    }
}

/// A typed, validated write to exactly one session field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    TeamName(Team, String),
    Score(Team, Adjust),
    Fouls(Team, Adjust),
    Timeouts(Team, Adjust),
    Period(Adjust),
    GameClock(GameClock),
    ShotClock(u32),
    Logo(Team, Option<String>),
    Ended(bool),
}

impl FieldUpdate {
    /// Parse one `field: value` pair against the allow-list
    pub fn parse(field: &str, value: &Value) -> Result<Self> {
        let team = match field.split_once('_') {
            Some(("home", _)) => Some(Team::Home),
            Some(("away", _)) => Some(Team::Away),
            _ => None,
        };

        match (field, team) {
            ("home_name" | "away_name", Some(team)) => {
                Ok(FieldUpdate::TeamName(team, parse_text(field, value, MAX_NAME_LEN)?))
            }
            ("home_score" | "away_score", Some(team)) => {
                Ok(FieldUpdate::Score(team, parse_adjust(field, value)?))
            }
            ("home_fouls" | "away_fouls", Some(team)) => {
                Ok(FieldUpdate::Fouls(team, parse_adjust(field, value)?))
            }
            ("home_timeouts" | "away_timeouts", Some(team)) => {
                Ok(FieldUpdate::Timeouts(team, parse_adjust(field, value)?))
            }
            ("home_logo" | "away_logo", Some(team)) => {
                Ok(FieldUpdate::Logo(team, parse_logo(field, value)?))
            }
            ("period", _) => Ok(FieldUpdate::Period(parse_adjust(field, value)?)),
            ("game_clock", _) => Ok(FieldUpdate::GameClock(parse_game_clock(value)?)),
            ("shot_clock", _) => Ok(FieldUpdate::ShotClock(parse_shot_clock(value)?)),
            ("ended", _) => value
                .as_bool()
                .map(FieldUpdate::Ended)
                .ok_or_else(|| ScoreboardError::invalid_value(field, "expected a boolean")),
            _ if READ_ONLY_FIELDS.contains(&field) => Err(ScoreboardError::ReadOnlyField {
                field: field.to_string(),
            }),
            _ => Err(ScoreboardError::UnknownField {
                field: field.to_string(),
            }),
        }
    }

    /// Parse a whole update map. Any invalid entry rejects the entire map.
    pub fn parse_all(fields: &Map<String, Value>) -> Result<Vec<Self>> {
        if fields.is_empty() {
            return Err(ScoreboardError::EmptyUpdate);
        }
        fields
            .iter()
            .map(|(field, value)| Self::parse(field, value))
            .collect()
    }

    pub fn field_name(&self) -> String {
        match self {
            FieldUpdate::TeamName(team, _) => format!("{}_name", team.prefix()),
            FieldUpdate::Score(team, _) => format!("{}_score", team.prefix()),
            FieldUpdate::Fouls(team, _) => format!("{}_fouls", team.prefix()),
            FieldUpdate::Timeouts(team, _) => format!("{}_timeouts", team.prefix()),
            FieldUpdate::Logo(team, _) => format!("{}_logo", team.prefix()),
            FieldUpdate::Period(_) => "period".to_string(),
            FieldUpdate::GameClock(_) => "game_clock".to_string(),
            FieldUpdate::ShotClock(_) => "shot_clock".to_string(),
            FieldUpdate::Ended(_) => "ended".to_string(),
        }
    }
}

fn parse_text(field: &str, value: &Value, max_len: usize) -> Result<String> {
    let text = value
        .as_str()
        .ok_or_else(|| ScoreboardError::invalid_value(field, "expected a string"))?;
    if text.chars().count() > max_len {
        return Err(ScoreboardError::invalid_value(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }
    Ok(text.to_string())
}

fn parse_logo(field: &str, value: &Value) -> Result<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    let logo = parse_text(field, value, MAX_LOGO_LEN)?;
    Ok(if logo.is_empty() { None } else { Some(logo) })
}

fn parse_adjust(field: &str, value: &Value) -> Result<Adjust> {
    if let Some(value) = value.as_i64() {
        return Ok(Adjust::Set(value));
    }

    // {"delta": n}
    if let Some(object) = value.as_object() {
        if object.len() == 1 {
            if let Some(delta) = object.get("delta").and_then(Value::as_i64) {
                return Ok(Adjust::Delta(delta));
            }
        }
    }

    Err(ScoreboardError::invalid_value(
        field,
        "expected an integer or {\"delta\": integer}",
    ))
}

fn parse_game_clock(value: &Value) -> Result<GameClock> {
    match value {
        Value::String(text) => text.parse(),
        Value::Number(_) => value
            .as_u64()
            .ok_or_else(|| {
                ScoreboardError::invalid_value("game_clock", "expected non-negative seconds")
            })
            .and_then(GameClock::try_from_seconds),
        _ => Err(ScoreboardError::invalid_value(
            "game_clock",
            "expected \"mm:ss\" or seconds",
        )),
    }
}

fn parse_shot_clock(value: &Value) -> Result<u32> {
    let invalid = || ScoreboardError::invalid_value("shot_clock", "expected non-negative seconds");

    match value {
        Value::Number(_) => value
            .as_u64()
            .and_then(|seconds| u32::try_from(seconds).ok())
            .ok_or_else(invalid),
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            text.parse().map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

// ============================================================================
// OPERATION RESULTS
// ============================================================================

/// Result of a clock action; `applied == false` marks a no-op
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClockReport {
    pub state: ClockState,
    pub applied: bool,
    pub session: Session,
}

/// Already-authorized identity of whoever issued an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub operator: String,
}

impl Origin {
    pub fn new(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new("anonymous")
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.operator)
    }
}
