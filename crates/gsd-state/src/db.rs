use std::path::Path;

use gsd_core::error::GsdError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree,
};

/// Persistent indexer state backed by sled (pure-Rust, no C dependencies).
///
/// Named trees (analogous to tables):
///   rounds           : round address                → bincode(IdeaRound)
///   ideas            : idea address                 → bincode(Idea)
///   votes            : idea address / voter         → bincode(Vote)
///   deposits         : wallet                       → bincode(VoteDeposit)
///   delegations      : record address               → bincode(DelegationRecord)
///   delegators       : delegator wallet             → record address
///   revenue_events   : origin signature             → bincode(RevenueEvent)
///   revenue_addresses: event address                → origin signature
///   revenue_claims   : event address / claimant     → bincode(RevenueClaim)
///   pending_revenue  : transaction signature        → bincode(PendingRevenue)
///   reports          : report key                   → bincode(VerificationReport)
///   report_addresses : report address               → report key
///   report_tasks     : task_ref:wallet              → report key
///   peer_reviews     : report key / reviewer        → bincode(PeerReview)
///   reviewers        : wallet                       → bincode(ReviewerProfile)
///   contributions    : transaction signature        → bincode(Contribution)
///   receipts         : signature#index              → [] (applied increments)
///   meta             : utf8 key                     → u64 big-endian counters
///
/// Every write is either a single-key compare-and-swap or a sled
/// transaction spanning the trees it touches, so concurrent deliveries of
/// the same or related notifications never lose an increment.
pub struct StateDb {
    db: sled::Db,
    pub(crate) rounds: sled::Tree,
    pub(crate) ideas: sled::Tree,
    pub(crate) votes: sled::Tree,
    pub(crate) deposits: sled::Tree,
    pub(crate) delegations: sled::Tree,
    pub(crate) delegators: sled::Tree,
    pub(crate) revenue_events: sled::Tree,
    pub(crate) revenue_addresses: sled::Tree,
    pub(crate) revenue_claims: sled::Tree,
    pub(crate) pending_revenue: sled::Tree,
    pub(crate) reports: sled::Tree,
    pub(crate) report_addresses: sled::Tree,
    pub(crate) report_tasks: sled::Tree,
    pub(crate) peer_reviews: sled::Tree,
    pub(crate) reviewers: sled::Tree,
    pub(crate) contributions: sled::Tree,
    pub(crate) receipts: sled::Tree,
    pub(crate) meta: sled::Tree,
}

impl StateDb {
    /// Open or create the state database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GsdError> {
        let db = sled::open(path).map_err(storage)?;
        Self::from_db(db)
    }

    /// Throwaway in-memory database, removed on drop.
    pub fn temporary() -> Result<Self, GsdError> {
        let db = sled::Config::new().temporary(true).open().map_err(storage)?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, GsdError> {
        let tree = |name: &str| db.open_tree(name).map_err(storage);
        Ok(Self {
            rounds: tree("rounds")?,
            ideas: tree("ideas")?,
            votes: tree("votes")?,
            deposits: tree("deposits")?,
            delegations: tree("delegations")?,
            delegators: tree("delegators")?,
            revenue_events: tree("revenue_events")?,
            revenue_addresses: tree("revenue_addresses")?,
            revenue_claims: tree("revenue_claims")?,
            pending_revenue: tree("pending_revenue")?,
            reports: tree("reports")?,
            report_addresses: tree("report_addresses")?,
            report_tasks: tree("report_tasks")?,
            peer_reviews: tree("peer_reviews")?,
            reviewers: tree("reviewers")?,
            contributions: tree("contributions")?,
            receipts: tree("receipts")?,
            meta: tree("meta")?,
            db,
        })
    }

    // ── Meta counters ─────────────────────────────────────────────────────────

    /// Atomically add `by` to a named counter and return the new value.
    pub fn increment_counter(&self, name: &str, by: u64) -> Result<u64, GsdError> {
        let out = self
            .meta
            .update_and_fetch(name.as_bytes(), |old| {
                let next = old.map(read_u64).unwrap_or(0).saturating_add(by);
                Some(next.to_be_bytes().to_vec())
            })
            .map_err(storage)?;
        Ok(out.map(|b| read_u64(&b)).unwrap_or(0))
    }

    pub fn counter(&self, name: &str) -> Result<u64, GsdError> {
        Ok(self
            .meta
            .get(name.as_bytes())
            .map_err(storage)?
            .map(|b| read_u64(&b))
            .unwrap_or(0))
    }

    // ── Receipts ──────────────────────────────────────────────────────────────

    pub fn has_receipt(&self, receipt: &str) -> Result<bool, GsdError> {
        self.receipts.contains_key(receipt.as_bytes()).map_err(storage)
    }

    pub fn flush(&self) -> Result<(), GsdError> {
        self.db.flush().map_err(storage)?;
        Ok(())
    }
}

// ── Encoding helpers ──────────────────────────────────────────────────────────

pub(crate) fn storage<E: std::fmt::Display>(e: E) -> GsdError {
    GsdError::Storage(e.to_string())
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, GsdError> {
    bincode::serialize(value).map_err(|e| GsdError::Serialization(e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, GsdError> {
    bincode::deserialize(bytes).map_err(|e| GsdError::Serialization(e.to_string()))
}

fn read_u64(bytes: impl AsRef<[u8]>) -> u64 {
    let b = bytes.as_ref();
    let mut arr = [0u8; 8];
    let n = b.len().min(8);
    arr[8 - n..].copy_from_slice(&b[b.len() - n..]);
    u64::from_be_bytes(arr)
}

/// Composite key `a/b`. Base58 addresses and signatures never contain `/`.
pub(crate) fn pair_key(a: &str, b: &str) -> Vec<u8> {
    format!("{a}/{b}").into_bytes()
}

// ── Single-key operations ─────────────────────────────────────────────────────

pub(crate) fn get<T: DeserializeOwned>(tree: &sled::Tree, key: &[u8]) -> Result<Option<T>, GsdError> {
    match tree.get(key).map_err(storage)? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn put<T: Serialize>(tree: &sled::Tree, key: &[u8], value: &T) -> Result<(), GsdError> {
    tree.insert(key, encode(value)?).map_err(storage)?;
    Ok(())
}

pub(crate) fn list<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>, GsdError> {
    tree.iter()
        .values()
        .map(|v| decode(&v.map_err(storage)?))
        .collect()
}

pub(crate) fn list_prefix<T: DeserializeOwned>(tree: &sled::Tree, prefix: &str) -> Result<Vec<T>, GsdError> {
    tree.scan_prefix(format!("{prefix}/").as_bytes())
        .values()
        .map(|v| decode(&v.map_err(storage)?))
        .collect()
}

/// Insert only if the key is absent. Returns `true` when inserted.
pub(crate) fn insert_if_absent<T: Serialize>(
    tree: &sled::Tree,
    key: &[u8],
    value: &T,
) -> Result<bool, GsdError> {
    let bytes = encode(value)?;
    let swapped = tree
        .compare_and_swap(key, None as Option<&[u8]>, Some(bytes))
        .map_err(storage)?;
    Ok(swapped.is_ok())
}

/// Compare-and-swap update of an existing row. Returns the new value, or
/// `None` when the key is absent (nothing is created).
pub(crate) fn update<T, F>(tree: &sled::Tree, key: &[u8], mut f: F) -> Result<Option<T>, GsdError>
where
    T: Serialize + DeserializeOwned,
    F: FnMut(&mut T),
{
    let mut failure: Option<GsdError> = None;
    let out = tree
        .update_and_fetch(key, |old| {
            failure = None;
            let bytes = old?;
            match decode::<T>(bytes).and_then(|mut v| {
                f(&mut v);
                encode(&v)
            }) {
                Ok(next) => Some(next),
                Err(e) => {
                    failure = Some(e);
                    Some(bytes.to_vec())
                }
            }
        })
        .map_err(storage)?;
    if let Some(e) = failure {
        return Err(e);
    }
    out.map(|b| decode(&b)).transpose()
}

/// Compare-and-swap upsert: start from `create()` when the key is absent,
/// then apply `update`. Returns the stored value and whether it was created.
pub(crate) fn upsert<T, C, U>(
    tree: &sled::Tree,
    key: &[u8],
    create: C,
    mut update: U,
) -> Result<(T, bool), GsdError>
where
    T: Serialize + DeserializeOwned,
    C: Fn() -> T,
    U: FnMut(&mut T),
{
    let mut failure: Option<GsdError> = None;
    let mut created = false;
    let out = tree
        .update_and_fetch(key, |old| {
            failure = None;
            created = old.is_none();
            let result = match old {
                None => {
                    let mut v = create();
                    update(&mut v);
                    encode(&v)
                }
                Some(bytes) => decode::<T>(bytes).and_then(|mut v| {
                    update(&mut v);
                    encode(&v)
                }),
            };
            match result {
                Ok(next) => Some(next),
                Err(e) => {
                    failure = Some(e);
                    old.map(|b| b.to_vec())
                }
            }
        })
        .map_err(storage)?;
    if let Some(e) = failure {
        return Err(e);
    }
    match out {
        Some(bytes) => Ok((decode(&bytes)?, created)),
        None => Err(GsdError::Storage("upsert produced no value".into())),
    }
}

// ── Transactional helpers ─────────────────────────────────────────────────────

pub(crate) fn abort<T>(e: GsdError) -> ConflictableTransactionResult<T, GsdError> {
    Err(ConflictableTransactionError::Abort(e))
}

pub(crate) fn tx_get<T: DeserializeOwned>(
    tree: &TransactionalTree,
    key: &[u8],
) -> ConflictableTransactionResult<Option<T>, GsdError> {
    match tree.get(key)? {
        Some(bytes) => match decode(&bytes) {
            Ok(v) => Ok(Some(v)),
            Err(e) => abort(e),
        },
        None => Ok(None),
    }
}

pub(crate) fn tx_put<T: Serialize>(
    tree: &TransactionalTree,
    key: &[u8],
    value: &T,
) -> ConflictableTransactionResult<(), GsdError> {
    let bytes = match encode(value) {
        Ok(b) => b,
        Err(e) => return abort(e),
    };
    tree.insert(key, bytes)?;
    Ok(())
}

/// Read the next value of a sequence counter inside a transaction.
pub(crate) fn tx_next_seq(
    meta: &TransactionalTree,
    name: &str,
) -> ConflictableTransactionResult<u64, GsdError> {
    let current = meta.get(name.as_bytes())?.map(read_u64).unwrap_or(0);
    meta.insert(name.as_bytes(), (current + 1).to_be_bytes().to_vec())?;
    Ok(current)
}

pub(crate) fn from_tx(e: TransactionError<GsdError>) -> GsdError {
    match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => storage(e),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn temp_db(name: &str) -> StateDb {
        let dir = std::env::temp_dir().join(format!("gsd_state_test_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        StateDb::open(&dir).expect("open temp db")
    }

    #[test]
    fn counters_are_monotonic() {
        let db = temp_db("counters");
        assert_eq!(db.counter("processed").unwrap(), 0);
        assert_eq!(db.increment_counter("processed", 2).unwrap(), 2);
        assert_eq!(db.increment_counter("processed", 3).unwrap(), 5);
        assert_eq!(db.counter("processed").unwrap(), 5);
    }

    #[test]
    fn upsert_reports_creation_once() {
        let db = temp_db("upsert");
        let tree = &db.meta;
        let (v, created) = upsert(tree, b"k", || 1u32, |v| *v += 10).unwrap();
        assert_eq!((v, created), (11, true));
        let (v, created) = upsert(tree, b"k", || 1u32, |v| *v += 10).unwrap();
        assert_eq!((v, created), (21, false));
    }

    #[test]
    fn update_never_creates() {
        let db = temp_db("update");
        let out: Option<u32> = update(&db.meta, b"missing", |v: &mut u32| *v += 1).unwrap();
        assert!(out.is_none());
        assert!(db.meta.get(b"missing").unwrap().is_none());
    }

    #[test]
    fn insert_if_absent_keeps_first_value() {
        let db = temp_db("insert_once");
        assert!(insert_if_absent(&db.meta, b"k", &1u64).unwrap());
        assert!(!insert_if_absent(&db.meta, b"k", &2u64).unwrap());
        assert_eq!(get::<u64>(&db.meta, b"k").unwrap(), Some(1));
    }

    #[test]
    fn reopen_preserves_data() {
        let dir = std::env::temp_dir().join(format!("gsd_state_reopen_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        {
            let db = StateDb::open(&dir).unwrap();
            db.increment_counter("x", 7).unwrap();
            db.flush().unwrap();
        }
        let db = StateDb::open(&dir).unwrap();
        assert_eq!(db.counter("x").unwrap(), 7);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
