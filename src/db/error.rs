use thiserror::Error;
use tokio_postgres::error::SqlState;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Pool error: {0}")]
    PoolError(#[from] deadpool_postgres::PoolError),

    #[error("{}", describe(.0))]
    PostgresError(#[source] tokio_postgres::Error),

    /// A row collided with a primary key or unique constraint.
    #[error(
        "Unique constraint {} violated: {}",
        .constraint.as_deref().unwrap_or("<unnamed>"),
        .message
    )]
    UniqueViolation {
        constraint: Option<String>,
        message: String,
    },

    #[error("Build error: {0}")]
    BuildError(#[from] deadpool_postgres::BuildError),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),
}

impl DbError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }

    /// Name of the unique constraint a write collided with, if any.
    pub fn violated_constraint(&self) -> Option<&str> {
        match self {
            DbError::UniqueViolation { constraint, .. } => constraint.as_deref(),
            _ => None,
        }
    }
}

impl From<tokio_postgres::Error> for DbError {
    fn from(e: tokio_postgres::Error) -> Self {
        match e.as_db_error() {
            Some(db_err) if db_err.code() == &SqlState::UNIQUE_VIOLATION => {
                DbError::UniqueViolation {
                    constraint: db_err.constraint().map(str::to_string),
                    message: db_err
                        .detail()
                        .unwrap_or_else(|| db_err.message())
                        .to_string(),
                }
            }
            _ => DbError::PostgresError(e),
        }
    }
}

fn describe(e: &tokio_postgres::Error) -> String {
    let Some(db_err) = e.as_db_error() else {
        return format!("PostgreSQL error: {}", e);
    };

    let mut parts = vec![format!(
        "PostgreSQL error [{}]: {}",
        db_err.code().code(),
        db_err.message()
    )];
    let context = [
        ("Detail", db_err.detail()),
        ("Hint", db_err.hint()),
        ("Table", db_err.table()),
        ("Column", db_err.column()),
    ];
    parts.extend(
        context
            .into_iter()
            .filter_map(|(label, value)| value.map(|v| format!("{}: {}", label, v))),
    );
    parts.join("\n  ")
}
