//! Database URL parsing.
//!
//! Accepts the sqlx-style forms (`sqlite://sales.db`, `sqlite::memory:`,
//! `postgres://...`) as well as SQLAlchemy-style URLs carrying a driver
//! suffix (`sqlite+aiosqlite:///./sales.db`, `postgresql+asyncpg://...`).
//! With three slashes the SQLite path is relative, with four it is absolute.

use std::fmt;
use std::path::PathBuf;

use si_core::{Error, Result};

/// A parsed database location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// SQLite database file on disk.
    Sqlite(PathBuf),
    /// Private in-memory SQLite database.
    SqliteMemory,
    /// PostgreSQL connection string, normalized to the `postgres://` scheme.
    Postgres(String),
}

impl DatabaseUrl {
    /// Parse a URL such as the value of `DATABASE_URL`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (scheme, rest) = raw
            .split_once(':')
            .ok_or_else(|| Error::Config(format!("database URL has no scheme: '{raw}'")))?;

        // Drop a "+driver" suffix such as "+aiosqlite" or "+asyncpg".
        let scheme = scheme
            .split('+')
            .next()
            .unwrap_or(scheme)
            .to_ascii_lowercase();

        match scheme.as_str() {
            "sqlite" => Ok(parse_sqlite(rest)),
            "postgres" | "postgresql" => {
                if !rest.starts_with("//") {
                    return Err(Error::Config(format!(
                        "postgres URL must look like postgres://host/db, got '{raw}'"
                    )));
                }
                Ok(Self::Postgres(format!("postgres:{rest}")))
            }
            other => Err(Error::Config(format!(
                "unsupported database scheme '{other}' (expected sqlite or postgres)"
            ))),
        }
    }

    /// Short backend name used in logs and the health endpoint.
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Sqlite(_) | Self::SqliteMemory => "sqlite",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Display form with any password replaced by `***`.
    pub fn redacted(&self) -> String {
        match self {
            Self::Sqlite(path) => format!("sqlite://{}", path.display()),
            Self::SqliteMemory => "sqlite::memory:".to_string(),
            Self::Postgres(url) => redact_password(url),
        }
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// `rest` is everything after `sqlite:`.
fn parse_sqlite(rest: &str) -> DatabaseUrl {
    let rest = rest.split('?').next().unwrap_or(rest);
    let path = match rest.strip_prefix("//") {
        Some(after) => after.strip_prefix('/').unwrap_or(after),
        None => rest,
    };

    if path.is_empty() || path == ":memory:" {
        DatabaseUrl::SqliteMemory
    } else {
        DatabaseUrl::Sqlite(PathBuf::from(path))
    }
}

fn redact_password(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let authority_start = scheme_end + 3;
    let authority_end = url[authority_start..]
        .find('/')
        .map(|i| authority_start + i)
        .unwrap_or(url.len());
    let authority = &url[authority_start..authority_end];

    let Some(at) = authority.rfind('@') else {
        return url.to_string();
    };
    let userinfo = &authority[..at];
    let Some(colon) = userinfo.find(':') else {
        return url.to_string();
    };

    format!(
        "{}{}:***{}",
        &url[..authority_start],
        &userinfo[..colon],
        &url[authority_start + at..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_relative_forms() {
        assert_eq!(
            DatabaseUrl::parse("sqlite://sales_insights.db").unwrap(),
            DatabaseUrl::Sqlite(PathBuf::from("sales_insights.db"))
        );
        assert_eq!(
            DatabaseUrl::parse("sqlite:data/sales.db").unwrap(),
            DatabaseUrl::Sqlite(PathBuf::from("data/sales.db"))
        );
        assert_eq!(
            DatabaseUrl::parse("sqlite+aiosqlite:///./sales_insights.db").unwrap(),
            DatabaseUrl::Sqlite(PathBuf::from("./sales_insights.db"))
        );
    }

    #[test]
    fn sqlite_absolute_form() {
        assert_eq!(
            DatabaseUrl::parse("sqlite:////var/lib/sales/sales.db").unwrap(),
            DatabaseUrl::Sqlite(PathBuf::from("/var/lib/sales/sales.db"))
        );
    }

    #[test]
    fn sqlite_memory_forms() {
        for url in ["sqlite::memory:", "sqlite://:memory:", "sqlite://"] {
            assert_eq!(DatabaseUrl::parse(url).unwrap(), DatabaseUrl::SqliteMemory, "{url}");
        }
    }

    #[test]
    fn sqlite_query_string_is_dropped() {
        assert_eq!(
            DatabaseUrl::parse("sqlite://sales.db?mode=rwc").unwrap(),
            DatabaseUrl::Sqlite(PathBuf::from("sales.db"))
        );
    }

    #[test]
    fn postgres_forms_normalize_scheme() {
        assert_eq!(
            DatabaseUrl::parse("postgresql+asyncpg://app:secret@db:5432/sales").unwrap(),
            DatabaseUrl::Postgres("postgres://app:secret@db:5432/sales".into())
        );
        let url = DatabaseUrl::parse("postgres://db/sales").unwrap();
        assert_eq!(url.backend(), "postgres");
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(DatabaseUrl::parse("mysql://db/sales").is_err());
        assert!(DatabaseUrl::parse("no-scheme-here").is_err());
        assert!(DatabaseUrl::parse("postgres:sales").is_err());
    }

    #[test]
    fn redacts_password() {
        let url = DatabaseUrl::parse("postgres://app:secret@db:5432/sales").unwrap();
        assert_eq!(url.redacted(), "postgres://app:***@db:5432/sales");
        assert!(!url.to_string().contains("secret"));

        let no_password = DatabaseUrl::parse("postgres://app@db/sales").unwrap();
        assert_eq!(no_password.redacted(), "postgres://app@db/sales");
    }
}
