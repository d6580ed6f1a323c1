use std::collections::BTreeMap;

use crate::collection::{CollectionView, Keyed};
use crate::record::Delta;

/// Opaque handle for resolving one optimistic apply. Travels through the
/// effect runner and back; the snapshot itself stays in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationToken {
    record_id: String,
    serial: u64,
}

impl MutationToken {
    pub fn record_id(&self) -> &str {
        &self.record_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingMutation<R> {
    /// Snapshot of the record before the first apply in the current chain.
    origin: R,
    /// The value the view currently shows for this mutation.
    speculative: R,
    serial: u64,
}

/// Explicit snapshot arena for outstanding speculative edits, keyed by
/// record id. At most one entry per record: a second apply while one is
/// pending supersedes the speculative value but keeps the chain origin, so
/// rollback always restores the true pre-chain state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationLedger<R> {
    pending: BTreeMap<String, PendingMutation<R>>,
    next_serial: u64,
}

impl<R> Default for MutationLedger<R> {
    fn default() -> Self {
        Self {
            pending: BTreeMap::new(),
            next_serial: 1,
        }
    }
}

impl<R: Keyed + Clone + PartialEq> MutationLedger<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    /// Applies `delta` to the record in `view` speculatively and records the
    /// rollback snapshot. Returns `None` without touching anything when the
    /// record is absent or the merged value equals the current one (a delta
    /// that changes nothing issues no token and no backend write).
    pub fn apply<D: Delta<R>>(
        &mut self,
        view: &mut CollectionView<R>,
        id: &str,
        delta: &D,
    ) -> Option<MutationToken> {
        let current = view.get(id)?.clone();
        let speculative = delta.merged(&current);
        if speculative == current {
            return None;
        }

        let serial = self.next_serial;
        self.next_serial += 1;

        let origin = match self.pending.remove(id) {
            Some(previous) => previous.origin,
            None => current,
        };
        self.pending.insert(
            id.to_string(),
            PendingMutation {
                origin,
                speculative: speculative.clone(),
                serial,
            },
        );
        view.replace_record(id, speculative);
        Some(MutationToken {
            record_id: id.to_string(),
            serial,
        })
    }

    /// The backend confirmed the write; the view already reflects it, so the
    /// snapshot is simply discarded. A token superseded by a newer apply
    /// leaves the newer entry in place.
    pub fn resolve_success(&mut self, token: &MutationToken) {
        let current = self
            .pending
            .get(&token.record_id)
            .is_some_and(|pending| pending.serial == token.serial);
        if current {
            self.pending.remove(&token.record_id);
        }
    }

    /// The backend rejected the write; restores the origin snapshot and
    /// returns true, unless the record's local value no longer matches the
    /// token's speculative value. A refetch that landed in between holds
    /// newer authoritative data, and a superseding apply owns the record
    /// now; in both cases the stale snapshot must not clobber it.
    pub fn resolve_failure(&mut self, view: &mut CollectionView<R>, token: &MutationToken) -> bool {
        let current = self
            .pending
            .get(&token.record_id)
            .is_some_and(|pending| pending.serial == token.serial);
        if !current {
            return false;
        }
        let Some(pending) = self.pending.remove(&token.record_id) else {
            return false;
        };
        if view.get(&token.record_id) == Some(&pending.speculative) {
            view.replace_record(&token.record_id, pending.origin)
        } else {
            false
        }
    }
}
