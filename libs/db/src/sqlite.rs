//! SQLite DSN helpers: path preparation and PRAGMA parameters.

use std::path::{Path, PathBuf};

/// SQLite journal modes accepted in the DSN.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum JournalMode {
    Delete,
    Wal,
    Memory,
    Truncate,
    Persist,
    Off,
}

impl JournalMode {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Wal => "WAL",
            JournalMode::Memory => "MEMORY",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Off => "OFF",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DELETE" => Some(JournalMode::Delete),
            "WAL" => Some(JournalMode::Wal),
            "MEMORY" => Some(JournalMode::Memory),
            "TRUNCATE" => Some(JournalMode::Truncate),
            "PERSIST" => Some(JournalMode::Persist),
            "OFF" => Some(JournalMode::Off),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SyncMode {
    Off,
    Normal,
    Full,
    Extra,
}

impl SyncMode {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            SyncMode::Off => "OFF",
            SyncMode::Normal => "NORMAL",
            SyncMode::Full => "FULL",
            SyncMode::Extra => "EXTRA",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OFF" => Some(SyncMode::Off),
            "NORMAL" => Some(SyncMode::Normal),
            "FULL" => Some(SyncMode::Full),
            "EXTRA" => Some(SyncMode::Extra),
            _ => None,
        }
    }
}

/// PRAGMA settings taken from DSN query parameters (strict whitelist).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pragmas {
    pub journal_mode: Option<JournalMode>,
    pub synchronous: Option<SyncMode>,
    pub busy_timeout_ms: Option<u64>,
}

const PRAGMA_KEYS: &[&str] = &["wal", "synchronous", "busy_timeout", "journal_mode"];

impl Pragmas {
    /// Parse whitelisted PRAGMA parameters. Invalid values are logged and ignored.
    /// `journal_mode` wins over the `wal=true|false` shorthand.
    pub(crate) fn from_dsn(dsn: &str) -> Self {
        let mut out = Pragmas::default();
        let mut wal_shorthand = None;

        let Ok(url) = url::Url::parse(dsn) else {
            return out;
        };

        for (key, value) in url.query_pairs() {
            let key = key.to_ascii_lowercase();
            let parsed = match key.as_str() {
                "wal" => match value.to_ascii_lowercase().as_str() {
                    "true" | "1" => {
                        wal_shorthand = Some(JournalMode::Wal);
                        true
                    }
                    "false" | "0" => {
                        wal_shorthand = Some(JournalMode::Delete);
                        true
                    }
                    _ => false,
                },
                "journal_mode" => {
                    out.journal_mode = JournalMode::parse(&value);
                    out.journal_mode.is_some()
                }
                "synchronous" => {
                    out.synchronous = SyncMode::parse(&value);
                    out.synchronous.is_some()
                }
                "busy_timeout" => {
                    out.busy_timeout_ms = value.parse::<u64>().ok();
                    out.busy_timeout_ms.is_some()
                }
                _ => continue,
            };
            if !parsed {
                tracing::warn!(key = %key, value = %value, "invalid SQLite PRAGMA value in DSN, ignoring");
            }
        }

        if out.journal_mode.is_none() {
            out.journal_mode = wal_shorthand;
        }
        out
    }
}

/// Drop the PRAGMA parameters sqlx does not understand; other parameters are kept.
pub(crate) fn strip_pragmas(dsn: &str) -> String {
    let Ok(mut url) = url::Url::parse(dsn) else {
        return dsn.to_string();
    };

    let kept: Vec<String> = url
        .query_pairs()
        .filter(|(k, _)| !PRAGMA_KEYS.contains(&k.to_ascii_lowercase().as_str()))
        .map(|(k, v)| format!("{k}={v}"))
        .collect();

    url.set_query(None);
    if !kept.is_empty() {
        url.set_query(Some(&kept.join("&")));
    }
    url.to_string()
}

pub(crate) fn is_memory_dsn(dsn: &str) -> bool {
    dsn.contains(":memory:") || dsn.contains("mode=memory")
}

/// Ensure the parent directory of a file-backed SQLite DSN exists.
pub(crate) fn prepare_sqlite_path(dsn: &str) -> std::io::Result<()> {
    if is_memory_dsn(dsn) {
        return Ok(());
    }
    let raw = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
        .unwrap_or(dsn);
    let path = raw.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with("file:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Expand a `sqlite://` DSN into an absolute-path DSN anchored at `base_dir`.
/// In-memory DSNs are normalized to `sqlite::memory:`; backslashes become forward slashes.
pub fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path) -> crate::Result<String> {
    if dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
    }
    let rest = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| crate::DbError::UnknownDsn(dsn.to_string()))?;

    let (path_str, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path_str.is_empty() {
        return Err(crate::DbError::UnknownDsn(dsn.to_string()));
    }

    let mut p = PathBuf::from(path_str);
    if p.is_relative() {
        p = base_dir.join(p);
    }

    let mut out = format!("sqlite://{}", p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pragmas_whitelist_and_validation() {
        let p = Pragmas::from_dsn(
            "sqlite://test.db?wal=true&synchronous=full&busy_timeout=10000&foo=bar",
        );
        assert_eq!(p.journal_mode, Some(JournalMode::Wal));
        assert_eq!(p.synchronous, Some(SyncMode::Full));
        assert_eq!(p.busy_timeout_ms, Some(10000));

        let bad = Pragmas::from_dsn("sqlite://test.db?wal=maybe&synchronous=yes&busy_timeout=-1");
        assert_eq!(bad, Pragmas::default());
    }

    #[test]
    fn journal_mode_beats_wal_shorthand() {
        let p = Pragmas::from_dsn("sqlite://test.db?journal_mode=truncate&wal=true");
        assert_eq!(p.journal_mode, Some(JournalMode::Truncate));
        assert_eq!(p.journal_mode.map(JournalMode::as_sql), Some("TRUNCATE"));
    }

    #[test]
    fn strip_pragmas_keeps_foreign_params() {
        let clean = strip_pragmas("sqlite://test.db?WAL=true&mode=rwc&busy_timeout=5000");
        assert!(clean.contains("mode=rwc"));
        assert!(!clean.to_ascii_lowercase().contains("wal"));
        assert!(!clean.contains("busy_timeout"));

        assert_eq!(
            strip_pragmas("sqlite://test.db?synchronous=NORMAL"),
            "sqlite://test.db"
        );
    }

    #[test]
    fn absolutize_relative_and_memory() {
        let base = Path::new("/srv/academy");
        assert_eq!(
            absolutize_sqlite_dsn("sqlite://database/academy.db?wal=true", base).unwrap(),
            "sqlite:///srv/academy/database/academy.db?wal=true"
        );
        assert_eq!(
            absolutize_sqlite_dsn("sqlite://:memory:", base).unwrap(),
            "sqlite::memory:"
        );
        assert!(absolutize_sqlite_dsn("postgres://x/y", base).is_err());
    }

    #[test]
    fn prepare_creates_parent_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("nested/dir/app.db");
        let dsn = format!("sqlite://{}", db.to_string_lossy());
        prepare_sqlite_path(&dsn).unwrap();
        assert!(db.parent().unwrap().exists());
        prepare_sqlite_path("sqlite::memory:").unwrap();
    }
}
