//! # Counter Adjuster
//!
//! Optimistic adjustments of numeric aggregates (like counts and friends).
//!
//! ## States
//!
//! ```text
//! Confirmed ──adjust──▶ Pending ──confirm──▶ Confirmed            (keep value)
//!                          │
//!                          └──────revert───▶ Confirmed-at-prior   (snapshot restored)
//! ```
//!
//! Each cell keeps its outstanding tokens, so a token settles exactly once and
//! a second `confirm`/`revert` is `TokenNotFound`. Cells are independent:
//! reverting one field never touches another.

use crate::errors::{EngineError, EngineResult};
use crate::identity::OperationToken;
use crate::mutations::{apply_counter_adjust, apply_toggle};
use crate::pending::{CounterKey, PendingOperation};
use crate::reconciler::{resolve_counter_failure, resolve_counter_success, resolve_toggle_failure};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterState {
    /// No adjustment in flight
    Confirmed,

    /// Showing an optimistic value
    Pending { outstanding: usize },
}

fn state_of(pending: &HashMap<OperationToken, PendingOperation>) -> CounterState {
    if pending.is_empty() {
        CounterState::Confirmed
    } else {
        CounterState::Pending {
            outstanding: pending.len(),
        }
    }
}

/// A single integer field adjusted optimistically
#[derive(Debug, Clone)]
pub struct CounterCell {
    key: CounterKey,
    value: i64,
    floor: i64,
    pending: HashMap<OperationToken, PendingOperation>,
}

impl CounterCell {
    pub fn new(key: CounterKey, value: i64, floor: i64) -> Self {
        Self {
            key,
            value: value.max(floor),
            floor,
            pending: HashMap::new(),
        }
    }

    pub fn key(&self) -> &CounterKey {
        &self.key
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn state(&self) -> CounterState {
        state_of(&self.pending)
    }

    /// Apply `delta` now; settle later with the returned token
    pub fn adjust(&mut self, delta: i64) -> OperationToken {
        let (next, op) = apply_counter_adjust(self.key.clone(), self.value, delta, self.floor);
        let token = op.token;
        debug!(%token, key = %self.key, from = self.value, to = next, "Optimistic counter adjust");

        self.value = next;
        self.pending.insert(token, op);
        token
    }

    /// Server accepted the adjustment
    pub fn confirm(&mut self, token: OperationToken) -> EngineResult<i64> {
        let op = self
            .pending
            .remove(&token)
            .ok_or(EngineError::TokenNotFound(token))?;
        self.value = resolve_counter_success(self.value, &op)?;
        Ok(self.value)
    }

    /// Server rejected the adjustment: restore the value seen before it
    pub fn revert(&mut self, token: OperationToken) -> EngineResult<i64> {
        let op = self
            .pending
            .remove(&token)
            .ok_or(EngineError::TokenNotFound(token))?;
        self.value = resolve_counter_failure(&op)?;
        debug!(%token, key = %self.key, value = self.value, "Counter reverted");
        Ok(self.value)
    }
}

/// Liked flag plus like count, flipped together (the like button)
#[derive(Debug, Clone)]
pub struct LikeToggle {
    key: CounterKey,
    liked: bool,
    count: i64,
    floor: i64,
    pending: HashMap<OperationToken, PendingOperation>,
}

impl LikeToggle {
    pub fn new(target: impl Into<String>, liked: bool, count: i64, floor: i64) -> Self {
        Self {
            key: CounterKey::likes(target),
            liked,
            count: count.max(floor),
            floor,
            pending: HashMap::new(),
        }
    }

    pub fn liked(&self) -> bool {
        self.liked
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn state(&self) -> CounterState {
        state_of(&self.pending)
    }

    /// Like if not liked, unlike if liked
    pub fn toggle(&mut self) -> OperationToken {
        let ((liked, count), op) = apply_toggle(self.key.clone(), self.liked, self.count, self.floor);
        let token = op.token;
        debug!(%token, key = %self.key, liked, count, "Optimistic like toggle");

        self.liked = liked;
        self.count = count;
        self.pending.insert(token, op);
        token
    }

    pub fn confirm(&mut self, token: OperationToken) -> EngineResult<(bool, i64)> {
        let op = self
            .pending
            .remove(&token)
            .ok_or(EngineError::TokenNotFound(token))?;
        self.count = resolve_counter_success(self.count, &op)?;
        Ok((self.liked, self.count))
    }

    pub fn revert(&mut self, token: OperationToken) -> EngineResult<(bool, i64)> {
        let op = self
            .pending
            .remove(&token)
            .ok_or(EngineError::TokenNotFound(token))?;
        let (liked, count) = resolve_toggle_failure(&op)?;
        self.liked = liked;
        self.count = count;
        debug!(%token, key = %self.key, liked, count, "Like toggle reverted");
        Ok((liked, count))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Cell(CounterKey),
    Like(String),
}

/// Flat collection of counters and like toggles, keyed by target
#[derive(Debug, Clone, Default)]
pub struct CounterBoard {
    floor: i64,
    cells: BTreeMap<CounterKey, CounterCell>,
    likes: BTreeMap<String, LikeToggle>,
    owners: HashMap<OperationToken, Slot>,
}

impl CounterBoard {
    pub fn new(floor: i64) -> Self {
        Self {
            floor,
            ..Default::default()
        }
    }

    /// Set the server-known value of a counter
    ///
    /// Adjustments still in flight on `key` are retired: their snapshots
    /// predate the new value. The retired tokens are returned.
    pub fn seed(&mut self, key: CounterKey, value: i64) -> Vec<OperationToken> {
        self.cells
            .insert(key.clone(), CounterCell::new(key.clone(), value, self.floor));
        self.retire(|slot| matches!(slot, Slot::Cell(k) if *k == key))
    }

    /// Set the server-known like state of a target, retiring toggles in flight
    pub fn seed_like(
        &mut self,
        target: impl Into<String>,
        liked: bool,
        count: i64,
    ) -> Vec<OperationToken> {
        let target = target.into();
        self.likes.insert(
            target.clone(),
            LikeToggle::new(target.as_str(), liked, count, self.floor),
        );
        self.retire(|slot| matches!(slot, Slot::Like(t) if *t == target))
    }

    pub fn value(&self, key: &CounterKey) -> Option<i64> {
        self.cells.get(key).map(CounterCell::value)
    }

    pub fn like(&self, target: &str) -> Option<(bool, i64)> {
        self.likes.get(target).map(|t| (t.liked(), t.count()))
    }

    pub fn pending_count(&self) -> usize {
        self.owners.len()
    }

    /// Adjust a counter; unknown counters start at the floor
    pub fn adjust(&mut self, key: CounterKey, delta: i64) -> OperationToken {
        let floor = self.floor;
        let token = self
            .cells
            .entry(key.clone())
            .or_insert_with(|| CounterCell::new(key.clone(), floor, floor))
            .adjust(delta);
        self.owners.insert(token, Slot::Cell(key));
        token
    }

    /// Toggle the like state of a target; unknown targets start unliked
    pub fn toggle_like(&mut self, target: &str) -> OperationToken {
        let floor = self.floor;
        let token = self
            .likes
            .entry(target.to_string())
            .or_insert_with(|| LikeToggle::new(target, false, floor, floor))
            .toggle();
        self.owners.insert(token, Slot::Like(target.to_string()));
        token
    }

    pub fn confirm(&mut self, token: OperationToken) -> EngineResult<()> {
        match self.owners.remove(&token) {
            Some(Slot::Cell(key)) => self.cell_mut(&key, token)?.confirm(token).map(|_| ()),
            Some(Slot::Like(target)) => self.like_mut(&target, token)?.confirm(token).map(|_| ()),
            None => Err(EngineError::TokenNotFound(token)),
        }
    }

    pub fn revert(&mut self, token: OperationToken) -> EngineResult<()> {
        match self.owners.remove(&token) {
            Some(Slot::Cell(key)) => self.cell_mut(&key, token)?.revert(token).map(|_| ()),
            Some(Slot::Like(target)) => self.like_mut(&target, token)?.revert(token).map(|_| ()),
            None => Err(EngineError::TokenNotFound(token)),
        }
    }

    fn retire(&mut self, owned_by: impl Fn(&Slot) -> bool) -> Vec<OperationToken> {
        let mut retired: Vec<OperationToken> = self
            .owners
            .iter()
            .filter(|(_, slot)| owned_by(slot))
            .map(|(token, _)| *token)
            .collect();
        retired.sort();

        for token in &retired {
            self.owners.remove(token);
        }
        if !retired.is_empty() {
            debug!(retired = retired.len(), "Reseed retired pending adjustments");
        }
        retired
    }

    fn cell_mut(&mut self, key: &CounterKey, token: OperationToken) -> EngineResult<&mut CounterCell> {
        self.cells
            .get_mut(key)
            .ok_or(EngineError::TokenNotFound(token))
    }

    fn like_mut(&mut self, target: &str, token: OperationToken) -> EngineResult<&mut LikeToggle> {
        self.likes
            .get_mut(target)
            .ok_or(EngineError::TokenNotFound(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::CounterField;

    #[test]
    fn test_cell_state_machine() {
        let mut cell = CounterCell::new(CounterKey::likes("p1"), 5, 0);
        assert_eq!(cell.state(), CounterState::Confirmed);

        let token = cell.adjust(1);
        assert_eq!(cell.value(), 6);
        assert_eq!(cell.state(), CounterState::Pending { outstanding: 1 });

        assert_eq!(cell.confirm(token).unwrap(), 6);
        assert_eq!(cell.state(), CounterState::Confirmed);
    }

    #[test]
    fn test_cell_revert_restores_prior() {
        let mut cell = CounterCell::new(CounterKey::likes("p1"), 0, 0);
        let token = cell.adjust(-1);
        assert_eq!(cell.value(), 0);

        let token2 = cell.adjust(3);
        assert_eq!(cell.revert(token2).unwrap(), 0);
        assert_eq!(cell.revert(token).unwrap(), 0);
        assert_eq!(cell.state(), CounterState::Confirmed);
    }

    #[test]
    fn test_cell_token_is_single_use() {
        let mut cell = CounterCell::new(CounterKey::likes("p1"), 2, 0);
        let token = cell.adjust(1);
        cell.revert(token).unwrap();

        assert_eq!(cell.revert(token), Err(EngineError::TokenNotFound(token)));
        assert_eq!(cell.confirm(token), Err(EngineError::TokenNotFound(token)));
    }

    #[test]
    fn test_like_toggle_roundtrip() {
        let mut like = LikeToggle::new("p1", false, 9, 0);
        let token = like.toggle();
        assert!(like.liked());
        assert_eq!(like.count(), 10);

        assert_eq!(like.revert(token).unwrap(), (false, 9));
        assert!(like.revert(token).is_err());
    }

    #[test]
    fn test_unlike_confirmed() {
        let mut like = LikeToggle::new("p1", true, 1, 0);
        let token = like.toggle();
        assert_eq!(like.confirm(token).unwrap(), (false, 0));
        assert_eq!(like.state(), CounterState::Confirmed);
    }

    #[test]
    fn test_board_revert_leaves_other_fields() {
        let mut board = CounterBoard::new(0);
        board.seed(CounterKey::likes("p1"), 4);
        board.seed(CounterKey::new("p1", CounterField::Comments), 7);

        let likes = board.adjust(CounterKey::likes("p1"), 1);
        let comments = board.adjust(CounterKey::new("p1", CounterField::Comments), 1);
        board.confirm(comments).unwrap();

        board.revert(likes).unwrap();
        assert_eq!(board.value(&CounterKey::likes("p1")), Some(4));
        assert_eq!(
            board.value(&CounterKey::new("p1", CounterField::Comments)),
            Some(8)
        );
        assert_eq!(board.pending_count(), 0);
    }

    #[test]
    fn test_board_like_toggles() {
        let mut board = CounterBoard::new(0);
        board.seed_like("p1", false, 2);

        let token = board.toggle_like("p1");
        assert_eq!(board.like("p1"), Some((true, 3)));
        board.revert(token).unwrap();
        assert_eq!(board.like("p1"), Some((false, 2)));

        assert_eq!(board.revert(token), Err(EngineError::TokenNotFound(token)));

        let fresh = board.toggle_like("p2");
        assert_eq!(board.like("p2"), Some((true, 1)));
        board.confirm(fresh).unwrap();
        assert_eq!(board.like("p2"), Some((true, 1)));
    }

    #[test]
    fn test_reseed_retires_pending_tokens() {
        let mut board = CounterBoard::new(0);
        board.seed(CounterKey::likes("p1"), 4);
        board.seed_like("p2", false, 1);

        let first = board.adjust(CounterKey::likes("p1"), 1);
        let second = board.adjust(CounterKey::likes("p1"), 1);
        let like = board.toggle_like("p2");
        let other = board.adjust(CounterKey::likes("p3"), 1);

        assert_eq!(board.seed(CounterKey::likes("p1"), 10), vec![first, second]);
        assert_eq!(board.seed_like("p2", true, 5), vec![like]);

        assert_eq!(board.value(&CounterKey::likes("p1")), Some(10));
        assert_eq!(board.like("p2"), Some((true, 5)));
        assert_eq!(board.pending_count(), 1);

        board.confirm(other).unwrap();
        assert!(board.seed(CounterKey::likes("p3"), 2).is_empty());
    }
}
