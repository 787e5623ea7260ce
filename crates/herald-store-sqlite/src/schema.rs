//! SQL schema for the Herald SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Local mirror of the user directory; only identifiers are kept.
CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,
    created_at  TEXT NOT NULL
);

-- Events are never deleted. The UNIQUE name settles get-or-create races.
CREATE TABLE IF NOT EXISTS events (
    event_id          TEXT PRIMARY KEY,
    name              TEXT NOT NULL UNIQUE,
    description       TEXT NOT NULL,
    category          TEXT NOT NULL,
    active            INTEGER NOT NULL DEFAULT 1,
    auto_subscription INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS subscriptions (
    subscription_id TEXT PRIMARY KEY,
    follower        TEXT NOT NULL,
    event_id        TEXT NOT NULL REFERENCES events(event_id),
    unfollow_actors TEXT NOT NULL DEFAULT '[]',  -- JSON array of user ids
    rules           TEXT NOT NULL DEFAULT '[]',  -- JSON array of SuppressionRule
    period          INTEGER NOT NULL DEFAULT 0,  -- seconds
    notify_channels TEXT,
    active          INTEGER NOT NULL DEFAULT 1
);

-- Written once by fan-out; only `read` changes afterwards.
CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL,
    event_id        TEXT NOT NULL REFERENCES events(event_id),
    actor           TEXT NOT NULL,
    object_type     TEXT NOT NULL,
    object_id       TEXT NOT NULL,
    extra_data      TEXT NOT NULL DEFAULT '{}',
    notify_channel  TEXT,
    read            INTEGER NOT NULL DEFAULT 0,
    dispatch_time   INTEGER NOT NULL             -- epoch seconds
);

CREATE INDEX IF NOT EXISTS events_category_idx         ON events(category);
CREATE INDEX IF NOT EXISTS subscriptions_follower_idx  ON subscriptions(follower, event_id);
CREATE INDEX IF NOT EXISTS subscriptions_event_idx     ON subscriptions(event_id);
CREATE INDEX IF NOT EXISTS notifications_pending_idx   ON notifications(user_id, read, dispatch_time);
CREATE INDEX IF NOT EXISTS notifications_event_idx     ON notifications(event_id);

PRAGMA user_version = 1;
";
