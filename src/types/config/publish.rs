use serde::Deserialize;

/// Block announcements over PostgreSQL `NOTIFY`.
///
/// Publishing is enabled when this config is present.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_channel() -> String {
    "blocks".to_string()
}
