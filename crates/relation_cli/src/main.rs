//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `relation_core` wiring end to end: config, logging, storage.
//! - Run one upsert round-trip on a scratch relation and print each state.
//!
//! Usage: `relation_cli [config.toml]`. Without a config file the defaults
//! apply, which opens a private in-memory database.

use log::info;
use relation_core::{
    core_version, init_logging_from_config, CoreConfig, DataLock, DataState, Database, NativeKey,
    RelationKind, RelationRecord, RepoError, SqliteDataLock, SqliteRelationRepository,
    UpsertRepository,
};
use std::error::Error;
use std::process::ExitCode;
use uuid::Uuid;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("relation_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    init_logging_from_config(&config)?;

    let db = Database::connect(&config.database).await?;
    let relations = SqliteRelationRepository::new(db.clone());
    let locks = SqliteDataLock::new(db);

    let owner_id = Uuid::new_v4();
    let member_id = Uuid::new_v4();
    let scratch = RelationRecord::new(owner_id, member_id, RelationKind::SpaceEntity)
        .with_label("relation_cli scratch");

    if !locks.lock(owner_id, config.lock.default_ttl()).await? {
        return Err(format!("scratch owner {owner_id} is locked").into());
    }
    let rounds = upsert_twice(&relations, owner_id, member_id, scratch).await;
    locks.unlock(owner_id).await?;

    for (round, (state, revision)) in rounds?.into_iter().enumerate() {
        println!("relation_core upsert round={} state={state} revision={revision}", round + 1);
    }
    println!("relation_core version={}", core_version());
    info!("event=cli_smoke module=cli status=ok");
    Ok(())
}

async fn upsert_twice(
    relations: &SqliteRelationRepository,
    owner_id: Uuid,
    member_id: Uuid,
    scratch: RelationRecord,
) -> Result<Vec<(DataState, i64)>, RepoError> {
    let mut rounds = Vec::with_capacity(2);
    for _ in 0..2 {
        let result = relations
            .update_or_create(
                NativeKey::composite(owner_id, member_id),
                RelationRecord::bump_revision,
                scratch.clone(),
            )
            .await?;
        let (state, relation) = result.into_parts();
        rounds.push((state, relation.revision));
    }
    Ok(rounds)
}
