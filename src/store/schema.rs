use rusqlite::Connection;

/// Idempotent migration, mirroring `api/db.rs::migrate` in the teacher:
/// one `CREATE TABLE IF NOT EXISTS` batch run on every startup.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                      TEXT PRIMARY KEY,
            display_code            TEXT NOT NULL,
            sponsor_id              TEXT REFERENCES users(id),
            placement_parent_id     TEXT REFERENCES users(id),
            placement_side          TEXT,
            left_child_id           TEXT,
            right_child_id          TEXT,
            active_package          TEXT,
            package_activated_at    INTEGER,
            rank_index_silver       INTEGER NOT NULL DEFAULT -1,
            rank_index_gold         INTEGER NOT NULL DEFAULT -1,
            rank_index_ruby         INTEGER NOT NULL DEFAULT -1,
            income_pairs_silver     INTEGER NOT NULL DEFAULT 0,
            income_pairs_gold       INTEGER NOT NULL DEFAULT 0,
            income_pairs_ruby       INTEGER NOT NULL DEFAULT 0,
            cutoff_pairs_silver     INTEGER NOT NULL DEFAULT 0,
            cutoff_pairs_gold       INTEGER NOT NULL DEFAULT 0,
            cutoff_pairs_ruby       INTEGER NOT NULL DEFAULT 0,
            total_royalty_received  REAL NOT NULL DEFAULT 0,
            created_at              INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS wallets (
            user_id         TEXT PRIMARY KEY REFERENCES users(id),
            balance         REAL NOT NULL DEFAULT 0,
            pending         REAL NOT NULL DEFAULT 0,
            total_credited  REAL NOT NULL DEFAULT 0,
            total_debited   REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS wallet_ledger (
            tx_id               TEXT PRIMARY KEY,
            user_id             TEXT NOT NULL REFERENCES users(id),
            direction           TEXT NOT NULL,
            amount              REAL NOT NULL,
            category            TEXT NOT NULL,
            balance_after       REAL NOT NULL,
            related_entry_ids   TEXT NOT NULL DEFAULT '[]',
            note                TEXT,
            created_at          INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_wallet_ledger_user ON wallet_ledger(user_id, created_at);

        CREATE TABLE IF NOT EXISTS bv_ledger (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL REFERENCES users(id),
            signed_amount   REAL NOT NULL,
            source          TEXT NOT NULL,
            created_at      INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS pv_entries (
            id                      TEXT PRIMARY KEY,
            owner_user_id           TEXT NOT NULL REFERENCES users(id),
            package_code            TEXT NOT NULL,
            side                    TEXT NOT NULL,
            pv                      REAL NOT NULL,
            state                   TEXT NOT NULL,
            created_at              INTEGER NOT NULL,
            matched_with_entry_id   TEXT,
            session_matched_index   INTEGER,
            matched_at              INTEGER,
            locked                  INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_pv_candidate
            ON pv_entries(package_code, state, owner_user_id, side, created_at);

        CREATE TABLE IF NOT EXISTS session_runs (
            id              TEXT PRIMARY KEY,
            date_key        TEXT NOT NULL,
            session_index   INTEGER NOT NULL,
            started_at      INTEGER NOT NULL,
            finished_at     INTEGER,
            finalized       INTEGER NOT NULL DEFAULT 0,
            UNIQUE(date_key, session_index)
        );

        CREATE TABLE IF NOT EXISTS processed_pairs (
            id                  TEXT PRIMARY KEY,
            session_run_id      TEXT NOT NULL REFERENCES session_runs(id),
            user_id             TEXT NOT NULL,
            package_code        TEXT NOT NULL,
            left_entry_id       TEXT NOT NULL,
            right_entry_id      TEXT NOT NULL,
            amount              REAL NOT NULL,
            credited_at         INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_processed_pairs_run
            ON processed_pairs(session_run_id, user_id, package_code);

        CREATE TABLE IF NOT EXISTS rank_history (
            user_id         TEXT NOT NULL,
            package_code    TEXT NOT NULL,
            rank_index      INTEGER NOT NULL,
            credited_amount REAL NOT NULL,
            created_at      INTEGER NOT NULL,
            PRIMARY KEY (user_id, package_code, rank_index)
        );

        CREATE TABLE IF NOT EXISTS fund_pool (
            id                  INTEGER PRIMARY KEY CHECK (id = 1),
            total_cto_bv        REAL NOT NULL DEFAULT 0,
            car_pool_monthly    REAL NOT NULL DEFAULT 0,
            house_pool_monthly  REAL NOT NULL DEFAULT 0,
            travel_fund         REAL NOT NULL DEFAULT 0
        );
        INSERT OR IGNORE INTO fund_pool (id) VALUES (1);

        CREATE TABLE IF NOT EXISTS fund_history (
            id          TEXT PRIMARY KEY,
            kind        TEXT NOT NULL,
            amount      REAL NOT NULL,
            note        TEXT NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS travel_allocations (
            id                      TEXT PRIMARY KEY,
            year                    INTEGER NOT NULL,
            national_amount         REAL NOT NULL,
            international_amount    REAL NOT NULL,
            created_at              INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS epins (
            code            TEXT PRIMARY KEY,
            package_code    TEXT NOT NULL,
            owner_user_id   TEXT,
            is_used         INTEGER NOT NULL DEFAULT 0,
            used_by_user_id TEXT,
            used_at         INTEGER,
            transfer_count  INTEGER NOT NULL DEFAULT 0,
            created_by      TEXT NOT NULL,
            created_at      INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS franchises (
            id                  TEXT PRIMARY KEY,
            owner_user_id       TEXT NOT NULL REFERENCES users(id),
            referrer_user_id    TEXT REFERENCES users(id),
            holder_percent      REAL NOT NULL,
            created_at          INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS franchise_products (
            id              TEXT PRIMARY KEY,
            franchise_id    TEXT NOT NULL REFERENCES franchises(id),
            name            TEXT NOT NULL,
            stock           INTEGER NOT NULL,
            sale_price      REAL NOT NULL,
            bv_equivalent   REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS franchise_sales (
            id                  TEXT PRIMARY KEY,
            franchise_id        TEXT NOT NULL REFERENCES franchises(id),
            product_id          TEXT NOT NULL REFERENCES franchise_products(id),
            buyer_user_id       TEXT NOT NULL REFERENCES users(id),
            sale_price          REAL NOT NULL,
            bv_equivalent       REAL NOT NULL,
            holder_commission   REAL NOT NULL,
            referrer_income     REAL NOT NULL,
            created_at          INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS royalty_log (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            amount      REAL NOT NULL,
            rate        REAL NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS pending_income (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL REFERENCES users(id),
            package_code    TEXT NOT NULL,
            amount          REAL NOT NULL,
            materialized    INTEGER NOT NULL DEFAULT 0,
            created_at      INTEGER NOT NULL
        );
        ",
    )
}
