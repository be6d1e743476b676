use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::domain::{ClockPreset, GameClock, Session, SessionCode};

// ============================================================================
// DATABASE ROW TYPES
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub code: String,
    pub home_name: String,
    pub away_name: String,
    pub home_score: i64,
    pub away_score: i64,
    pub home_fouls: i64,
    pub away_fouls: i64,
    pub home_timeouts: i64,
    pub away_timeouts: i64,
    pub period: i64,
    pub game_clock_seconds: i64,
    pub shot_clock: i64,
    pub home_logo: Option<String>,
    pub away_logo: Option<String>,
    pub ended: bool,
    pub revision: i64,
    pub preset_game_clock_seconds: i64,
    pub preset_shot_clock: i64,
    pub created_at: DateTime<Utc>,
}

fn column<T, U>(name: &str, value: T) -> Result<U, sqlx::Error>
where
    U: TryFrom<T>,
    U::Error: std::error::Error + Send + Sync + 'static,
{
    U::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: name.to_string(),
        source: Box::new(e),
    })
}

impl TryFrom<SessionRow> for Session {
    type Error = sqlx::Error;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let code = SessionCode::parse(&row.code).map_err(|e| sqlx::Error::ColumnDecode {
            index: "code".to_string(),
            source: Box::new(e),
        })?;

        Ok(Session {
            code,
            home_name: row.home_name,
            away_name: row.away_name,
            home_score: column("home_score", row.home_score)?,
            away_score: column("away_score", row.away_score)?,
            home_fouls: column("home_fouls", row.home_fouls)?,
            away_fouls: column("away_fouls", row.away_fouls)?,
            home_timeouts: column("home_timeouts", row.home_timeouts)?,
            away_timeouts: column("away_timeouts", row.away_timeouts)?,
            period: column("period", row.period)?,
            game_clock: GameClock::from_seconds(column("game_clock_seconds", row.game_clock_seconds)?),
            shot_clock: column("shot_clock", row.shot_clock)?,
            home_logo: row.home_logo,
            away_logo: row.away_logo,
            ended: row.ended,
            revision: column("revision", row.revision)?,
            preset: ClockPreset {
                game_clock: GameClock::from_seconds(column(
                    "preset_game_clock_seconds",
                    row.preset_game_clock_seconds,
                )?),
                shot_clock: column("preset_shot_clock", row.preset_shot_clock)?,
            },
            created_at: row.created_at,
        })
    }
}
