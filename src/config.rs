// config.rs
use clap::Parser;

#[derive(Clone, Debug, Parser)]
#[command(name = "attendance-poll-backend", about = "Attendance polling service")]
pub struct Config {
    /// Postgres connection string; the in-memory store is used when unset
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Port
    #[arg(long, env = "PORT", default_value_t = 3030)]
    pub port: u16,

    /// Maximum pooled database connections
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    pub db_max_connections: u32,

    /// Poll duration in minutes when the request omits one
    #[arg(long, env = "ATTENDANCE_DEFAULT_DURATION", default_value_t = 10)]
    pub default_duration_minutes: i64,

    /// Longest poll an instructor may open, in minutes
    #[arg(long, env = "ATTENDANCE_MAX_DURATION", default_value_t = 1440)]
    pub max_duration_minutes: i64,

    /// Attempts at drawing a code unused by any live poll
    #[arg(long, env = "ATTENDANCE_CODE_RETRIES", default_value_t = 5)]
    pub code_retries: u32,

    /// Origin allowed by CORS
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:3000")]
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            port: 3030,
            db_max_connections: 5,
            default_duration_minutes: 10,
            max_duration_minutes: 1440,
            code_retries: 5,
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}
