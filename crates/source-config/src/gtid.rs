//! GTID set grammars for the two supported flavors.
//!
//! - MySQL: `3e11fa47-71ca-11e1-9e33-c80aa9429562:1-5:7,<uuid>:1`
//! - MariaDB: `0-1-100,1-2-5` (`domain-server-sequence`)
//!
//! Only syntax is checked here; sets are never compared or merged.

use crate::model::Flavor;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GtidParseError {
    #[error("invalid server uuid '{0}'")]
    InvalidUuid(String),

    #[error("invalid interval '{0}'")]
    InvalidInterval(String),

    #[error("missing interval for uuid '{0}'")]
    MissingInterval(String),

    #[error("invalid MariaDB GTID '{0}'")]
    InvalidMariadbGtid(String),

    #[error("duplicate MariaDB domain {0}")]
    DuplicateDomain(u32),

    #[error("not a valid GTID set for any supported flavor")]
    NoFlavorMatched,
}

/// Inclusive transaction number range within a MySQL UUID set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: u64,
    pub stop: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MysqlUuidSet {
    pub sid: String,
    pub intervals: Vec<Interval>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MariadbGtid {
    pub domain_id: u32,
    pub server_id: u32,
    pub sequence: u64,
}

/// A parsed GTID set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GtidSet {
    Mysql(Vec<MysqlUuidSet>),
    Mariadb(Vec<MariadbGtid>),
}

impl GtidSet {
    pub fn flavor(&self) -> Flavor {
        match self {
            GtidSet::Mysql(_) => Flavor::Mysql,
            GtidSet::Mariadb(_) => Flavor::Mariadb,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            GtidSet::Mysql(sets) => sets.is_empty(),
            GtidSet::Mariadb(gtids) => gtids.is_empty(),
        }
    }
}

/// Parse `s` under `flavor`'s grammar. With no flavor known yet, the set is
/// accepted if either grammar accepts it (MySQL is tried first).
pub fn parse_gtid_set(flavor: Option<Flavor>, s: &str) -> Result<GtidSet, GtidParseError> {
    match flavor {
        Some(Flavor::Mysql) => parse_mysql_gtid_set(s),
        Some(Flavor::Mariadb) => parse_mariadb_gtid_set(s),
        None => parse_mysql_gtid_set(s)
            .or_else(|_| parse_mariadb_gtid_set(s))
            .map_err(|_| GtidParseError::NoFlavorMatched),
    }
}

pub fn parse_mysql_gtid_set(s: &str) -> Result<GtidSet, GtidParseError> {
    let mut sets = Vec::new();
    for part in split_set(s) {
        let mut fields = part.split(':');
        let sid = fields.next().unwrap_or_default().trim();
        if !is_uuid(sid) {
            return Err(GtidParseError::InvalidUuid(sid.to_string()));
        }
        let intervals = fields
            .map(parse_interval)
            .collect::<Result<Vec<_>, _>>()?;
        if intervals.is_empty() {
            return Err(GtidParseError::MissingInterval(sid.to_string()));
        }
        sets.push(MysqlUuidSet {
            sid: sid.to_lowercase(),
            intervals,
        });
    }
    Ok(GtidSet::Mysql(sets))
}

pub fn parse_mariadb_gtid_set(s: &str) -> Result<GtidSet, GtidParseError> {
    let mut gtids: Vec<MariadbGtid> = Vec::new();
    for part in split_set(s) {
        let invalid = || GtidParseError::InvalidMariadbGtid(part.to_string());
        let mut fields = part.split('-');
        let (Some(domain), Some(server), Some(seq), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(invalid());
        };
        let gtid = MariadbGtid {
            domain_id: parse_digits(domain).ok_or_else(invalid)?,
            server_id: parse_digits(server).ok_or_else(invalid)?,
            sequence: parse_digits(seq).ok_or_else(invalid)?,
        };
        if gtids.iter().any(|g| g.domain_id == gtid.domain_id) {
            return Err(GtidParseError::DuplicateDomain(gtid.domain_id));
        }
        gtids.push(gtid);
    }
    Ok(GtidSet::Mariadb(gtids))
}

// Upstream status output may wrap long sets with newlines.
fn split_set(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|p| !p.is_empty())
}

fn parse_interval(s: &str) -> Result<Interval, GtidParseError> {
    let invalid = || GtidParseError::InvalidInterval(s.to_string());
    let (start, stop) = match s.split_once('-') {
        Some((a, b)) => (
            parse_digits::<u64>(a).ok_or_else(invalid)?,
            parse_digits::<u64>(b).ok_or_else(invalid)?,
        ),
        None => {
            let n = parse_digits::<u64>(s).ok_or_else(invalid)?;
            (n, n)
        }
    };
    if start == 0 || stop < start {
        return Err(invalid());
    }
    Ok(Interval { start, stop })
}

fn parse_digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn is_uuid(s: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let groups: Vec<&str> = s.split('-').collect();
    groups.len() == GROUPS.len()
        && groups
            .iter()
            .zip(GROUPS)
            .all(|(g, len)| g.len() == len && g.bytes().all(|b| b.is_ascii_hexdigit()))
}
