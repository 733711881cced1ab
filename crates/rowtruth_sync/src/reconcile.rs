//! The merge-join reconciliation driver.

use crate::checksum::IdAndChecksum;
use crate::error::{SyncError, SyncResult};

/// One repair a replica must apply to converge on the truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// The object is missing from the replica and must be inserted.
    Create(u64),
    /// The replica's copy is stale and must be re-derived from truth.
    Update(u64),
    /// The object no longer exists in truth and must be removed.
    Delete(u64),
}

impl SyncAction {
    /// Returns the object id the action targets.
    #[must_use]
    pub fn object_id(&self) -> u64 {
        match self {
            SyncAction::Create(id) | SyncAction::Update(id) | SyncAction::Delete(id) => *id,
        }
    }
}

/// Pulls one leg of the merge, enforcing the ascending-id contract.
struct Leg<I> {
    items: I,
    last_id: Option<u64>,
}

impl<I> Leg<I>
where
    I: Iterator<Item = SyncResult<IdAndChecksum>>,
{
    fn new(items: I) -> Self {
        Self {
            items,
            last_id: None,
        }
    }

    fn advance(&mut self) -> SyncResult<Option<IdAndChecksum>> {
        match self.items.next() {
            None => Ok(None),
            Some(Err(e)) => Err(e),
            Some(Ok(item)) => {
                if let Some(previous) = self.last_id {
                    if item.object_id <= previous {
                        return Err(SyncError::OutOfOrder {
                            previous,
                            current: item.object_id,
                        });
                    }
                }
                self.last_id = Some(item.object_id);
                Ok(Some(item))
            }
        }
    }
}

/// Merge-joins the truth and replica checksum streams and returns the
/// repairs the replica needs, ascending by object id.
///
/// Both streams must be ascending by object id and checksummed under the
/// same salt. The merge is pure: it never touches storage, so it is
/// unit-testable against literal sequences.
///
/// # Errors
///
/// Any item-level failure or ordering violation aborts the whole pass;
/// the caller retries from scratch with a fresh salt. No partial action
/// list is returned.
pub fn reconcile<T, R>(truth: T, replica: R) -> SyncResult<Vec<SyncAction>>
where
    T: IntoIterator<Item = SyncResult<IdAndChecksum>>,
    R: IntoIterator<Item = SyncResult<IdAndChecksum>>,
{
    let mut truth = Leg::new(truth.into_iter());
    let mut replica = Leg::new(replica.into_iter());

    let mut actions = Vec::new();
    let mut t = truth.advance()?;
    let mut r = replica.advance()?;

    loop {
        match (t, r) {
            (None, None) => break,
            (Some(ours), None) => {
                actions.push(SyncAction::Create(ours.object_id));
                t = truth.advance()?;
            }
            (None, Some(theirs)) => {
                actions.push(SyncAction::Delete(theirs.object_id));
                r = replica.advance()?;
            }
            (Some(ours), Some(theirs)) => {
                if ours.object_id < theirs.object_id {
                    actions.push(SyncAction::Create(ours.object_id));
                    t = truth.advance()?;
                } else if ours.object_id > theirs.object_id {
                    actions.push(SyncAction::Delete(theirs.object_id));
                    r = replica.advance()?;
                } else {
                    if ours.checksum != theirs.checksum {
                        actions.push(SyncAction::Update(ours.object_id));
                    }
                    t = truth.advance()?;
                    r = replica.advance()?;
                }
            }
        }
    }

    Ok(actions)
}
