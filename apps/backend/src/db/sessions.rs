use crate::db::Db;
use crate::errors::Result;
use crate::models::db::SessionRow;
use crate::models::domain::{Session, SessionCode};

const SESSION_COLUMNS: &str = r#"
    code, home_name, away_name, home_score, away_score, home_fouls, away_fouls,
    home_timeouts, away_timeouts, period, game_clock_seconds, shot_clock,
    home_logo, away_logo, ended, revision, preset_game_clock_seconds,
    preset_shot_clock, created_at
"#;

impl Db {
    /// Insert or overwrite a session record.
    /// A record with a higher revision is never replaced by an older snapshot.
    pub async fn upsert_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                code, home_name, away_name, home_score, away_score, home_fouls, away_fouls,
                home_timeouts, away_timeouts, period, game_clock_seconds, shot_clock,
                home_logo, away_logo, ended, revision, preset_game_clock_seconds,
                preset_shot_clock, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, NOW())
            ON CONFLICT (code)
            DO UPDATE SET
                home_name = EXCLUDED.home_name,
                away_name = EXCLUDED.away_name,
                home_score = EXCLUDED.home_score,
                away_score = EXCLUDED.away_score,
                home_fouls = EXCLUDED.home_fouls,
                away_fouls = EXCLUDED.away_fouls,
                home_timeouts = EXCLUDED.home_timeouts,
                away_timeouts = EXCLUDED.away_timeouts,
                period = EXCLUDED.period,
                game_clock_seconds = EXCLUDED.game_clock_seconds,
                shot_clock = EXCLUDED.shot_clock,
                home_logo = EXCLUDED.home_logo,
                away_logo = EXCLUDED.away_logo,
                ended = EXCLUDED.ended,
                revision = EXCLUDED.revision,
                updated_at = NOW()
            WHERE sessions.revision <= EXCLUDED.revision
            "#,
        )
        .bind(session.code.as_str())
        .bind(&session.home_name)
        .bind(&session.away_name)
        .bind(i64::from(session.home_score))
        .bind(i64::from(session.away_score))
        .bind(i64::from(session.home_fouls))
        .bind(i64::from(session.away_fouls))
        .bind(i64::from(session.home_timeouts))
        .bind(i64::from(session.away_timeouts))
        .bind(i64::from(session.period))
        .bind(i64::from(session.game_clock.seconds()))
        .bind(i64::from(session.shot_clock))
        .bind(session.home_logo.as_deref())
        .bind(session.away_logo.as_deref())
        .bind(session.ended)
        .bind(i64::try_from(session.revision).unwrap_or(i64::MAX))
        .bind(i64::from(session.preset.game_clock.seconds()))
        .bind(i64::from(session.preset.shot_clock))
        .bind(session.created_at)
        .execute(&self.postgres)
        .await?;

        Ok(())
    }

    /// Get one session record, if present
    pub async fn get_session(&self, code: &SessionCode) -> Result<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM sessions WHERE code = $1",
            SESSION_COLUMNS
        ))
        .bind(code.as_str())
        .fetch_optional(&self.postgres)
        .await?;

        Ok(row.map(Session::try_from).transpose()?)
    }

    /// Load every session record, oldest first
    pub async fn load_sessions(&self) -> Result<Vec<Session>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM sessions ORDER BY created_at",
            SESSION_COLUMNS
        ))
        .fetch_all(&self.postgres)
        .await?;

        let sessions = rows
            .into_iter()
            .map(Session::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }
}
