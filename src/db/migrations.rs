use std::collections::HashSet;

use deadpool_postgres::Pool;

use super::error::DbError;

/// Schema migrations in the order they must be applied. Names are recorded in
/// `_migrations` once applied and must never change.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_create_blocks.sql",
        include_str!("../../migrations/001_create_blocks.sql"),
    ),
    (
        "002_create_balances.sql",
        include_str!("../../migrations/002_create_balances.sql"),
    ),
];

pub async fn run(pool: &Pool) -> Result<(), DbError> {
    let client = pool.get().await?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                id SERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )",
            &[],
        )
        .await?;

    let rows = client.query("SELECT name FROM _migrations", &[]).await?;
    let applied: HashSet<String> = rows.iter().map(|row| row.get(0)).collect();
    drop(client);

    let pending = pending(&applied);
    if pending.is_empty() {
        tracing::info!("All migrations up to date");
        return Ok(());
    }

    for (name, sql) in pending {
        let mut client = pool.get().await?;
        let tx = client.transaction().await?;

        tx.batch_execute(sql).await.map_err(|e| {
            DbError::MigrationError(format!("Failed to run migration {}: {}", name, e))
        })?;

        tx.execute("INSERT INTO _migrations (name) VALUES ($1)", &[&name])
            .await?;

        tx.commit().await?;

        tracing::info!("Applied migration: {}", name);
    }

    Ok(())
}

fn pending(applied: &HashSet<String>) -> Vec<(&'static str, &'static str)> {
    MIGRATIONS
        .iter()
        .filter(|(name, _)| !applied.contains(*name))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered_by_name() {
        let names: Vec<&str> = MIGRATIONS.iter().map(|(name, _)| *name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_pending_skips_applied() {
        let applied: HashSet<String> = ["001_create_blocks.sql".to_string()].into();
        let pending = pending(&applied);
        assert_eq!(pending.len(), MIGRATIONS.len() - 1);
        assert!(pending.iter().all(|(name, _)| *name != "001_create_blocks.sql"));
    }

    #[test]
    fn test_balance_tables_are_keyed_for_accumulation() {
        let (_, sql) = MIGRATIONS[1];
        assert!(sql.contains("PRIMARY KEY (account, asset, block_number)"));
        assert!(sql.contains("PRIMARY KEY (account, asset, to_block)"));
    }
}
