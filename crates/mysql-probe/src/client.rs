//! Connection pool for the upstream probe.

use anyhow::{Context, Result};
use mysql_async::{OptsBuilder, Pool, PoolConstraints, PoolOpts, SslOpts};
use source_config::DbConfig;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Upper bound on open connections. Discovery runs its queries one at a time.
const MAX_POOL_CONNECTIONS: usize = 4;

/// Build a pool for `db`. No connection is opened until the first query.
pub fn new_mysql_pool(db: &DbConfig) -> Result<Pool> {
    let idle = db.raw.max_idle_conns.min(MAX_POOL_CONNECTIONS);
    let constraints = PoolConstraints::new(idle, MAX_POOL_CONNECTIONS)
        .context("Invalid connection pool constraints")?;

    let mut opts = OptsBuilder::default()
        .ip_or_hostname(db.host.clone())
        .tcp_port(db.port)
        .user(Some(db.user.clone()))
        .pass(Some(db.password.clone()))
        .init(session_statements(db))
        .pool_opts(PoolOpts::default().with_constraints(constraints));

    if let Some(max_allowed_packet) = db.max_allowed_packet {
        opts = opts.max_allowed_packet(Some(max_allowed_packet as usize));
    }

    if let Some(security) = &db.security {
        if !security.ssl_cert.is_empty() || !security.ssl_key.is_empty() {
            warn!("Client certificates are not used by the upstream probe");
        }
        let mut ssl = SslOpts::default();
        if !security.ssl_ca.is_empty() {
            ssl = ssl.with_root_certs(vec![PathBuf::from(&security.ssl_ca).into()]);
        }
        opts = opts.ssl_opts(Some(ssl));
    }

    debug!(address = %db.address(), "Created MySQL connection pool");
    Ok(Pool::new(opts))
}

/// `SET SESSION` statements for every configured session variable.
pub(crate) fn session_statements(db: &DbConfig) -> Vec<String> {
    db.session
        .iter()
        .map(|(name, value)| format!("SET SESSION {name} = '{}'", value.replace('\'', "''")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_statements() {
        let mut db = DbConfig::default();
        db.session.insert("sql_mode".to_string(), "ANSI_QUOTES".to_string());
        db.session.insert("time_zone".to_string(), "+00:00".to_string());

        assert_eq!(
            session_statements(&db),
            vec![
                "SET SESSION sql_mode = 'ANSI_QUOTES'".to_string(),
                "SET SESSION time_zone = '+00:00'".to_string(),
            ]
        );
    }

    #[test]
    fn test_session_values_are_quoted() {
        let mut db = DbConfig::default();
        db.session.insert("sql_mode".to_string(), "it's".to_string());
        assert_eq!(session_statements(&db), vec!["SET SESSION sql_mode = 'it''s'"]);
    }

    #[tokio::test]
    async fn test_pool_creation_does_not_connect() {
        let mut db = DbConfig::default();
        db.host = "db.invalid".to_string();
        let pool = new_mysql_pool(&db).unwrap();
        drop(pool);
    }
}
