use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string environment variable.
    #[serde(default = "default_database_url_env_var")]
    pub database_url_env_var: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_database_url_env_var() -> String {
    "DATABASE_URL".to_string()
}

fn default_max_connections() -> usize {
    16
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url_env_var: default_database_url_env_var(),
            max_connections: default_max_connections(),
        }
    }
}
