pub const SCHEMA: &str = r#"
-- Accounts for all three roles
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(name) BETWEEN 20 AND 60),
    email TEXT NOT NULL UNIQUE,      -- stored lowercased
    address TEXT CHECK (address IS NULL OR length(address) <= 400),
    password_hash TEXT NOT NULL,     -- argon2id PHC string
    role TEXT NOT NULL DEFAULT 'USER' CHECK (role IN ('ADMIN', 'USER', 'OWNER')),
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Stores, optionally owned by one OWNER account
CREATE TABLE IF NOT EXISTS stores (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT,
    address TEXT CHECK (address IS NULL OR length(address) <= 400),
    owner_id TEXT REFERENCES users(id) ON DELETE CASCADE,

    -- Denormalized aggregate, recomputed after every rating write
    average_rating REAL NOT NULL DEFAULT 0,
    ratings_count INTEGER NOT NULL DEFAULT 0,

    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- One rating per (user, store)
CREATE TABLE IF NOT EXISTS ratings (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    store_id TEXT NOT NULL REFERENCES stores(id) ON DELETE CASCADE,
    value INTEGER NOT NULL CHECK (value BETWEEN 1 AND 5),
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),

    UNIQUE(user_id, store_id)
);

CREATE INDEX IF NOT EXISTS idx_stores_owner ON stores(owner_id);
CREATE INDEX IF NOT EXISTS idx_ratings_store ON ratings(store_id);
CREATE INDEX IF NOT EXISTS idx_ratings_user ON ratings(user_id);
"#;
