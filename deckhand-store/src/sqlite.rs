// SPDX-License-Identifier: MIT OR Apache-2.0

use deckhand_core::{
    Deck, DeckId, Invite, InviteId, Role, Timestamp, TokenHash, UserId,
};
use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, migrate, query};
use thiserror::Error;
use tracing::warn;

use crate::traits::{Contention, DeckStore, Snapshot, TransactError, WriteSet};

/// Optimistic commit attempts before a transaction gives up.
const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Create SQLite database if it doesn't already exist.
pub async fn create_database(url: &str) -> Result<(), SqliteStoreError> {
    if !Sqlite::database_exists(url).await? {
        Sqlite::create_database(url).await?
    }
    Ok(())
}

/// Drop SQLite database if it exists.
pub async fn drop_database(url: &str) -> Result<(), SqliteStoreError> {
    if Sqlite::database_exists(url).await? {
        Sqlite::drop_database(url).await?
    }
    Ok(())
}

/// Get migrations from folder without running them.
pub fn migrations() -> Migrator {
    migrate!()
}

/// Run any pending database migrations from inside the application.
pub async fn run_pending_migrations(pool: &SqlitePool) -> Result<(), SqliteStoreError> {
    migrations().run(pool).await?;
    Ok(())
}

pub struct SqliteStoreBuilder {
    url: String,
    max_connections: u32,
    create_database: bool,
    run_migrations: bool,
}

impl Default for SqliteStoreBuilder {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".into(),
            max_connections: 16,
            create_database: true,
            run_migrations: true,
        }
    }
}

impl SqliteStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(any(test, feature = "test_utils"))]
    pub fn random_memory_url(mut self) -> Self {
        // Shared in-memory databases leak between parallel Rust tests, so every temporary
        // database gets a random name and a private cache.
        //
        // See related issue: https://github.com/launchbadge/sqlx/issues/2510
        self.url = format!(
            "sqlite://dbmem{}?mode=memory&cache=private",
            rand::random::<u32>()
        );
        self
    }

    pub fn database_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn create_database(mut self, create_database: bool) -> Self {
        self.create_database = create_database;
        self
    }

    pub fn run_default_migrations(mut self, run_migrations: bool) -> Self {
        self.run_migrations = run_migrations;
        self
    }

    pub async fn build(self) -> Result<SqliteStore, SqliteStoreError> {
        if self.create_database {
            create_database(&self.url).await?;
        }

        let pool: SqlitePool = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.url)
            .await?;

        if self.run_migrations {
            run_pending_migrations(&pool).await?;
        }

        Ok(SqliteStore::new(pool))
    }
}

/// SQLite-backed store for persistent deployments.
///
/// Documents are normalized over four tables: deck rows, their role and
/// collaborator entries, and invite rows. Every document row carries a
/// version counter; `transact` snapshots documents together with their
/// counters and commits through conditional writes (`WHERE version = $n`)
/// inside one database transaction, which gives the same optimistic semantics
/// as the in-memory store. Clones share the same connection pool.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Shortcut building an in-memory SQLite database with a randomised name
    /// for testing purposes.
    #[cfg(any(test, feature = "test_utils"))]
    pub async fn temporary() -> Self {
        SqliteStoreBuilder::new()
            .random_memory_url()
            .max_connections(1)
            .build()
            .await
            .expect("migrations succeeded")
    }
}

impl DeckStore for SqliteStore {
    type Error = SqliteStoreError;

    async fn insert_deck(&self, deck: Deck) -> Result<bool, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let existing = current_deck_version(&mut tx, &deck.id).await?;
        upsert_deck(&mut tx, &deck).await?;
        replace_deck_entries(&mut tx, &deck).await?;
        tx.commit().await?;
        Ok(existing.is_none())
    }

    async fn deck(&self, id: &DeckId) -> Result<Option<Deck>, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let deck = fetch_deck(&mut tx, id).await?;
        tx.commit().await?;
        Ok(deck.map(|(document, _)| document))
    }

    async fn insert_invite(&self, invite: Invite) -> Result<bool, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let existing = current_invite_version(&mut tx, &invite.id).await?;
        upsert_invite(&mut tx, &invite).await?;
        tx.commit().await?;
        Ok(existing.is_none())
    }

    async fn invite(&self, id: &InviteId) -> Result<Option<Invite>, Self::Error> {
        let row = query(
            "
            SELECT
                id, deck_id, token_hash, role_requested, status,
                expires_at, accepted_by, accepted_at, created_at, updated_at
            FROM
                invites_v1
            WHERE
                id = $1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(decode_invite).transpose()
    }

    async fn find_invite(
        &self,
        deck_id: &DeckId,
        token_hash: &TokenHash,
    ) -> Result<Option<Invite>, Self::Error> {
        let rows = query(
            "
            SELECT
                id, deck_id, token_hash, role_requested, status,
                expires_at, accepted_by, accepted_at, created_at, updated_at
            FROM
                invites_v1
            WHERE
                deck_id = $1 AND token_hash = $2
            ORDER BY
                created_at ASC, id ASC
            ",
        )
        .bind(deck_id.as_str())
        .bind(token_hash.to_hex())
        .fetch_all(&self.pool)
        .await?;

        if rows.len() > 1 {
            // Unique by construction, finding more than one means the data
            // got corrupted somewhere else.
            warn!(
                deck_id = %deck_id,
                matches = rows.len(),
                "multiple invites share one token fingerprint"
            );
        }

        rows.first().map(decode_invite).transpose()
    }

    async fn invites_for_deck(&self, deck_id: &DeckId) -> Result<Vec<Invite>, Self::Error> {
        let rows = query(
            "
            SELECT
                id, deck_id, token_hash, role_requested, status,
                expires_at, accepted_by, accepted_at, created_at, updated_at
            FROM
                invites_v1
            WHERE
                deck_id = $1
            ORDER BY
                created_at ASC, id ASC
            ",
        )
        .bind(deck_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_invite).collect()
    }

    async fn transact<T, E, F>(
        &self,
        invite_id: &InviteId,
        deck_id: &DeckId,
        apply: F,
    ) -> Result<T, TransactError<Self::Error, E>>
    where
        F: Fn(Snapshot) -> Result<(WriteSet, T), E>,
        E: std::error::Error,
    {
        for _attempt in 0..MAX_COMMIT_ATTEMPTS {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|err| TransactError::Backend(err.into()))?;
            let invite = fetch_invite(&mut tx, invite_id)
                .await
                .map_err(TransactError::Backend)?;
            let deck = fetch_deck(&mut tx, deck_id)
                .await
                .map_err(TransactError::Backend)?;
            tx.commit()
                .await
                .map_err(|err| TransactError::Backend(err.into()))?;

            let invite_version = invite.as_ref().map(|(_, version)| *version);
            let deck_version = deck.as_ref().map(|(_, version)| *version);
            let snapshot = Snapshot {
                invite: invite.map(|(document, _)| document),
                deck: deck.map(|(document, _)| document),
            };

            let (writes, value) = apply(snapshot).map_err(TransactError::Aborted)?;

            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|err| TransactError::Backend(err.into()))?;
            let invite_current = match &writes.invite {
                Some(invite) => write_invite_guarded(&mut tx, invite, invite_version)
                    .await
                    .map_err(TransactError::Backend)?,
                None => {
                    current_invite_version(&mut tx, invite_id)
                        .await
                        .map_err(TransactError::Backend)?
                        == invite_version
                }
            };
            let deck_current = match &writes.deck {
                Some(deck) => write_deck_guarded(&mut tx, deck, deck_version)
                    .await
                    .map_err(TransactError::Backend)?,
                None => {
                    current_deck_version(&mut tx, deck_id)
                        .await
                        .map_err(TransactError::Backend)?
                        == deck_version
                }
            };

            if invite_current && deck_current {
                tx.commit()
                    .await
                    .map_err(|err| TransactError::Backend(err.into()))?;
                return Ok(value);
            }

            // Lost against a concurrent writer, take a fresh snapshot and
            // re-run the body.
            tx.rollback()
                .await
                .map_err(|err| TransactError::Backend(err.into()))?;
        }

        Err(Contention {
            attempts: MAX_COMMIT_ATTEMPTS,
        }
        .into())
    }
}

async fn current_deck_version(
    conn: &mut SqliteConnection,
    id: &DeckId,
) -> Result<Option<i64>, SqliteStoreError> {
    let row = query("SELECT version FROM decks_v1 WHERE id = $1")
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row
        .map(|row| row.try_get::<i64, _>("version"))
        .transpose()?)
}

async fn current_invite_version(
    conn: &mut SqliteConnection,
    id: &InviteId,
) -> Result<Option<i64>, SqliteStoreError> {
    let row = query("SELECT version FROM invites_v1 WHERE id = $1")
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row
        .map(|row| row.try_get::<i64, _>("version"))
        .transpose()?)
}

async fn fetch_deck(
    conn: &mut SqliteConnection,
    id: &DeckId,
) -> Result<Option<(Deck, i64)>, SqliteStoreError> {
    let Some(row) = query(
        "
        SELECT
            id, owner_id, title, created_at, updated_at, version
        FROM
            decks_v1
        WHERE
            id = $1
        ",
    )
    .bind(id.as_str())
    .fetch_optional(&mut *conn)
    .await?
    else {
        return Ok(None);
    };

    let version: i64 = row.try_get("version")?;
    let mut deck = Deck {
        id: DeckId::new(row.try_get::<String, _>("id")?)
            .map_err(|err| SqliteStoreError::decode("deck.id", err))?,
        owner_id: UserId::new(row.try_get::<String, _>("owner_id")?)
            .map_err(|err| SqliteStoreError::decode("deck.owner_id", err))?,
        title: row.try_get("title")?,
        roles: Default::default(),
        collaborator_ids: Default::default(),
        created_at: Timestamp::from_unix_millis(row.try_get::<i64, _>("created_at")? as u64),
        updated_at: Timestamp::from_unix_millis(row.try_get::<i64, _>("updated_at")? as u64),
    };

    let role_rows = query("SELECT user_id, role FROM deck_roles_v1 WHERE deck_id = $1")
        .bind(id.as_str())
        .fetch_all(&mut *conn)
        .await?;
    for row in role_rows {
        let user = UserId::new(row.try_get::<String, _>("user_id")?)
            .map_err(|err| SqliteStoreError::decode("deck.roles", err))?;
        let role: String = row.try_get("role")?;
        match role.parse::<Role>() {
            Ok(role) => {
                deck.roles.insert(user, role);
            }
            Err(err) => {
                // Unrecognized roles never grant access.
                warn!(
                    deck_id = %deck.id,
                    user_id = %user,
                    error = %err,
                    "dropping unparseable role entry"
                );
            }
        }
    }

    let collaborator_rows =
        query("SELECT user_id FROM deck_collaborators_v1 WHERE deck_id = $1")
            .bind(id.as_str())
            .fetch_all(&mut *conn)
            .await?;
    for row in collaborator_rows {
        let user = UserId::new(row.try_get::<String, _>("user_id")?)
            .map_err(|err| SqliteStoreError::decode("deck.collaborator_ids", err))?;
        deck.collaborator_ids.insert(user);
    }

    Ok(Some((deck, version)))
}

async fn fetch_invite(
    conn: &mut SqliteConnection,
    id: &InviteId,
) -> Result<Option<(Invite, i64)>, SqliteStoreError> {
    let Some(row) = query(
        "
        SELECT
            id, deck_id, token_hash, role_requested, status,
            expires_at, accepted_by, accepted_at, created_at, updated_at, version
        FROM
            invites_v1
        WHERE
            id = $1
        ",
    )
    .bind(id.as_str())
    .fetch_optional(&mut *conn)
    .await?
    else {
        return Ok(None);
    };

    let version: i64 = row.try_get("version")?;
    Ok(Some((decode_invite(&row)?, version)))
}

fn decode_invite(row: &SqliteRow) -> Result<Invite, SqliteStoreError> {
    Ok(Invite {
        id: InviteId::new(row.try_get::<String, _>("id")?)
            .map_err(|err| SqliteStoreError::decode("invite.id", err))?,
        deck_id: DeckId::new(row.try_get::<String, _>("deck_id")?)
            .map_err(|err| SqliteStoreError::decode("invite.deck_id", err))?,
        token_hash: row
            .try_get::<String, _>("token_hash")?
            .parse::<TokenHash>()
            .map_err(|err| SqliteStoreError::decode("invite.token_hash", err))?,
        // An invite whose requested role no longer parses can not be redeemed
        // safely, it is a corrupt record rather than a missing role entry.
        role_requested: row
            .try_get::<String, _>("role_requested")?
            .parse()
            .map_err(|err| SqliteStoreError::decode("invite.role_requested", err))?,
        status: row
            .try_get::<String, _>("status")?
            .parse()
            .map_err(|err| SqliteStoreError::decode("invite.status", err))?,
        expires_at: row
            .try_get::<Option<i64>, _>("expires_at")?
            .map(|millis| Timestamp::from_unix_millis(millis as u64)),
        accepted_by: row
            .try_get::<Option<String>, _>("accepted_by")?
            .map(UserId::new)
            .transpose()
            .map_err(|err| SqliteStoreError::decode("invite.accepted_by", err))?,
        accepted_at: row
            .try_get::<Option<i64>, _>("accepted_at")?
            .map(|millis| Timestamp::from_unix_millis(millis as u64)),
        created_at: Timestamp::from_unix_millis(row.try_get::<i64, _>("created_at")? as u64),
        updated_at: Timestamp::from_unix_millis(row.try_get::<i64, _>("updated_at")? as u64),
    })
}

/// Inserts or replaces the deck row unconditionally, bumping its version.
async fn upsert_deck(conn: &mut SqliteConnection, deck: &Deck) -> Result<(), SqliteStoreError> {
    query(
        "
        INSERT INTO
            decks_v1 (id, owner_id, title, created_at, updated_at, version)
        VALUES
            ($1, $2, $3, $4, $5, 0)
        ON CONFLICT(id) DO UPDATE SET
            owner_id = excluded.owner_id,
            title = excluded.title,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            version = decks_v1.version + 1
        ",
    )
    .bind(deck.id.as_str())
    .bind(deck.owner_id.as_str())
    .bind(deck.title.as_str())
    .bind(deck.created_at.as_unix_millis() as i64)
    .bind(deck.updated_at.as_unix_millis() as i64)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Inserts or replaces the invite row unconditionally, bumping its version.
async fn upsert_invite(
    conn: &mut SqliteConnection,
    invite: &Invite,
) -> Result<(), SqliteStoreError> {
    query(
        "
        INSERT INTO
            invites_v1 (
                id, deck_id, token_hash, role_requested, status,
                expires_at, accepted_by, accepted_at, created_at, updated_at, version
            )
        VALUES
            ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0)
        ON CONFLICT(id) DO UPDATE SET
            deck_id = excluded.deck_id,
            token_hash = excluded.token_hash,
            role_requested = excluded.role_requested,
            status = excluded.status,
            expires_at = excluded.expires_at,
            accepted_by = excluded.accepted_by,
            accepted_at = excluded.accepted_at,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            version = invites_v1.version + 1
        ",
    )
    .bind(invite.id.as_str())
    .bind(invite.deck_id.as_str())
    .bind(invite.token_hash.to_hex())
    .bind(invite.role_requested.as_str())
    .bind(invite.status.as_str())
    .bind(invite.expires_at.map(|at| at.as_unix_millis() as i64))
    .bind(invite.accepted_by.as_ref().map(|user| user.as_str()))
    .bind(invite.accepted_at.map(|at| at.as_unix_millis() as i64))
    .bind(invite.created_at.as_unix_millis() as i64)
    .bind(invite.updated_at.as_unix_millis() as i64)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Replaces the role and collaborator entries of a deck.
async fn replace_deck_entries(
    conn: &mut SqliteConnection,
    deck: &Deck,
) -> Result<(), SqliteStoreError> {
    query("DELETE FROM deck_roles_v1 WHERE deck_id = $1")
        .bind(deck.id.as_str())
        .execute(&mut *conn)
        .await?;
    for (user, role) in &deck.roles {
        query("INSERT INTO deck_roles_v1 (deck_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(deck.id.as_str())
            .bind(user.as_str())
            .bind(role.as_str())
            .execute(&mut *conn)
            .await?;
    }

    query("DELETE FROM deck_collaborators_v1 WHERE deck_id = $1")
        .bind(deck.id.as_str())
        .execute(&mut *conn)
        .await?;
    for user in &deck.collaborator_ids {
        query("INSERT INTO deck_collaborators_v1 (deck_id, user_id) VALUES ($1, $2)")
            .bind(deck.id.as_str())
            .bind(user.as_str())
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Writes the deck only if its row still carries the snapshotted version.
///
/// Returns `false` when the guard did not match, which means the commit lost
/// against a concurrent writer.
async fn write_deck_guarded(
    conn: &mut SqliteConnection,
    deck: &Deck,
    expected: Option<i64>,
) -> Result<bool, SqliteStoreError> {
    let written = match expected {
        Some(version) => {
            query(
                "
                UPDATE decks_v1 SET
                    owner_id = $1,
                    title = $2,
                    created_at = $3,
                    updated_at = $4,
                    version = version + 1
                WHERE
                    id = $5 AND version = $6
                ",
            )
            .bind(deck.owner_id.as_str())
            .bind(deck.title.as_str())
            .bind(deck.created_at.as_unix_millis() as i64)
            .bind(deck.updated_at.as_unix_millis() as i64)
            .bind(deck.id.as_str())
            .bind(version)
            .execute(&mut *conn)
            .await?
            .rows_affected()
                == 1
        }
        None => {
            query(
                "
                INSERT OR IGNORE INTO
                    decks_v1 (id, owner_id, title, created_at, updated_at, version)
                VALUES
                    ($1, $2, $3, $4, $5, 0)
                ",
            )
            .bind(deck.id.as_str())
            .bind(deck.owner_id.as_str())
            .bind(deck.title.as_str())
            .bind(deck.created_at.as_unix_millis() as i64)
            .bind(deck.updated_at.as_unix_millis() as i64)
            .execute(&mut *conn)
            .await?
            .rows_affected()
                == 1
        }
    };

    if written {
        replace_deck_entries(conn, deck).await?;
    }
    Ok(written)
}

/// Writes the invite only if its row still carries the snapshotted version.
async fn write_invite_guarded(
    conn: &mut SqliteConnection,
    invite: &Invite,
    expected: Option<i64>,
) -> Result<bool, SqliteStoreError> {
    let written = match expected {
        Some(version) => {
            query(
                "
                UPDATE invites_v1 SET
                    deck_id = $1,
                    token_hash = $2,
                    role_requested = $3,
                    status = $4,
                    expires_at = $5,
                    accepted_by = $6,
                    accepted_at = $7,
                    created_at = $8,
                    updated_at = $9,
                    version = version + 1
                WHERE
                    id = $10 AND version = $11
                ",
            )
            .bind(invite.deck_id.as_str())
            .bind(invite.token_hash.to_hex())
            .bind(invite.role_requested.as_str())
            .bind(invite.status.as_str())
            .bind(invite.expires_at.map(|at| at.as_unix_millis() as i64))
            .bind(invite.accepted_by.as_ref().map(|user| user.as_str()))
            .bind(invite.accepted_at.map(|at| at.as_unix_millis() as i64))
            .bind(invite.created_at.as_unix_millis() as i64)
            .bind(invite.updated_at.as_unix_millis() as i64)
            .bind(invite.id.as_str())
            .bind(version)
            .execute(&mut *conn)
            .await?
            .rows_affected()
                == 1
        }
        None => {
            query(
                "
                INSERT OR IGNORE INTO
                    invites_v1 (
                        id, deck_id, token_hash, role_requested, status,
                        expires_at, accepted_by, accepted_at, created_at, updated_at, version
                    )
                VALUES
                    ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0)
                ",
            )
            .bind(invite.id.as_str())
            .bind(invite.deck_id.as_str())
            .bind(invite.token_hash.to_hex())
            .bind(invite.role_requested.as_str())
            .bind(invite.status.as_str())
            .bind(invite.expires_at.map(|at| at.as_unix_millis() as i64))
            .bind(invite.accepted_by.as_ref().map(|user| user.as_str()))
            .bind(invite.accepted_at.map(|at| at.as_unix_millis() as i64))
            .bind(invite.created_at.as_unix_millis() as i64)
            .bind(invite.updated_at.as_unix_millis() as i64)
            .execute(&mut *conn)
            .await?
            .rows_affected()
                == 1
        }
    };
    Ok(written)
}

#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// SQLite database and connection error.
    #[error(transparent)]
    Sqlite(#[from] sqlx::Error),

    /// SQL table schema migration error.
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Invalid, corrupted data was found in the database. This is a critical
    /// error.
    #[error("could not decode corrupted '{0}' value from database: {1}")]
    Decode(&'static str, DecodeError),
}

impl SqliteStoreError {
    fn decode(column: &'static str, err: impl Into<DecodeError>) -> Self {
        Self::Decode(column, err.into())
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Id(#[from] deckhand_core::IdError),

    #[error(transparent)]
    Token(#[from] deckhand_core::TokenError),

    #[error(transparent)]
    Role(#[from] deckhand_core::UnknownRole),

    #[error(transparent)]
    Status(#[from] deckhand_core::UnknownStatus),
}

#[cfg(test)]
mod tests {
    use deckhand_core::test_utils::{deck_with_roles, pending_invite, user_id};
    use deckhand_core::{DeckId, Role};
    use sqlx::query;

    use crate::sqlite::{
        SqliteStore, current_invite_version, fetch_invite, write_invite_guarded,
    };
    use crate::traits::DeckStore;

    #[tokio::test]
    async fn document_roundtrip() {
        let store = SqliteStore::temporary().await;

        let deck = deck_with_roles("deck-1", "owner-1", &[("user-1", Role::Editor)]);
        assert!(store.insert_deck(deck.clone()).await.unwrap());
        assert_eq!(store.deck(&deck.id).await.unwrap(), Some(deck.clone()));

        let (invite, _) = pending_invite(&deck.id, Role::Viewer);
        assert!(store.insert_invite(invite.clone()).await.unwrap());
        assert_eq!(store.invite(&invite.id).await.unwrap(), Some(invite.clone()));
        assert_eq!(
            store
                .find_invite(&deck.id, &invite.token_hash)
                .await
                .unwrap(),
            Some(invite)
        );
    }

    #[tokio::test]
    async fn replacing_a_document_is_not_an_insert() {
        let store = SqliteStore::temporary().await;

        let mut deck = deck_with_roles("deck-1", "owner-1", &[]);
        assert!(store.insert_deck(deck.clone()).await.unwrap());

        deck.title = "Renamed".into();
        assert!(!store.insert_deck(deck.clone()).await.unwrap());
        assert_eq!(
            store.deck(&deck.id).await.unwrap().unwrap().title,
            "Renamed"
        );
    }

    #[tokio::test]
    async fn unknown_role_entries_grant_nothing() {
        let store = SqliteStore::temporary().await;

        let deck = deck_with_roles("deck-1", "owner-1", &[("user-1", Role::Viewer)]);
        store.insert_deck(deck.clone()).await.unwrap();

        // Simulate a row written by a different, newer system.
        query("INSERT INTO deck_roles_v1 (deck_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(deck.id.as_str())
            .bind("intruder")
            .bind("superuser")
            .execute(&store.pool)
            .await
            .unwrap();

        let loaded = store.deck(&deck.id).await.unwrap().unwrap();
        assert_eq!(loaded.role_of(&user_id("intruder")), None);
        assert_eq!(loaded.role_of(&user_id("user-1")), Some(Role::Viewer));
    }

    #[tokio::test]
    async fn lookup_returns_first_by_creation_order() {
        let store = SqliteStore::temporary().await;
        let deck_id = DeckId::new("deck-1").unwrap();

        let (mut first, token) = pending_invite(&deck_id, Role::Viewer);
        let mut second = first.clone();
        second.id = deckhand_core::InviteId::generate();
        second.created_at = second.created_at + std::time::Duration::from_secs(60);
        first.role_requested = Role::Editor;

        store.insert_invite(second).await.unwrap();
        store.insert_invite(first.clone()).await.unwrap();

        let found = store
            .find_invite(&deck_id, &token.fingerprint())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(found.role_requested, Role::Editor);
    }

    #[tokio::test]
    async fn guarded_write_detects_stale_versions() {
        let store = SqliteStore::temporary().await;
        let deck_id = DeckId::new("deck-1").unwrap();

        let (invite, _) = pending_invite(&deck_id, Role::Viewer);
        store.insert_invite(invite.clone()).await.unwrap();
        // Bump the version by replacing the document.
        store.insert_invite(invite.clone()).await.unwrap();

        let mut tx = store.pool.begin().await.unwrap();
        let current = current_invite_version(&mut tx, &invite.id).await.unwrap();
        assert_eq!(current, Some(1));

        // A write expecting the pre-replacement version must not stick.
        assert!(
            !write_invite_guarded(&mut tx, &invite, Some(0))
                .await
                .unwrap()
        );
        assert!(
            write_invite_guarded(&mut tx, &invite, Some(1))
                .await
                .unwrap()
        );
        tx.commit().await.unwrap();

        let (_, version) = {
            let mut tx = store.pool.begin().await.unwrap();
            let fetched = fetch_invite(&mut tx, &invite.id).await.unwrap().unwrap();
            tx.commit().await.unwrap();
            fetched
        };
        assert_eq!(version, 2);
    }
}
