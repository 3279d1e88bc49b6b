//! Buffered delta stream for late joiners and pollers

use super::protocol::{Catchup, Sequenced, Snapshot};

/// A base snapshot plus every delta recorded after it.
///
/// Rebasing drops the buffered deltas; peers that are further behind than
/// the base receive the snapshot instead.
#[derive(Clone, Debug)]
pub struct DeltaLog {
    base: Snapshot,
    deltas: Vec<Sequenced>,
}

impl DeltaLog {
    pub fn new(base: Snapshot) -> Self {
        Self {
            base,
            deltas: Vec::new(),
        }
    }

    pub fn push(&mut self, delta: Sequenced) {
        debug_assert_eq!(delta.seq, self.latest_seq() + 1);
        self.deltas.push(delta);
    }

    pub fn rebase(&mut self, base: Snapshot) {
        self.base = base;
        self.deltas.clear();
    }

    pub fn base(&self) -> &Snapshot {
        &self.base
    }

    pub fn latest_seq(&self) -> u64 {
        self.deltas.last().map_or(self.base.seq, |d| d.seq)
    }

    pub fn buffered(&self) -> usize {
        self.deltas.len()
    }

    /// Everything a peer that has applied up to `since` is missing
    pub fn catch_up(&self, since: u64) -> Catchup {
        if since < self.base.seq {
            return Catchup::Snapshot {
                snapshot: self.base.clone(),
                deltas: self.deltas.clone(),
            };
        }
        Catchup::Deltas {
            deltas: self
                .deltas
                .iter()
                .filter(|d| d.seq > since)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Player;
    use crate::config::MatchConfig;
    use crate::events::GameEvent;
    use crate::turn::TurnController;

    fn delta(seq: u64) -> Sequenced {
        Sequenced {
            seq,
            event: GameEvent::TurnChanged { player: Player::One },
        }
    }

    fn base(seq: u64) -> Snapshot {
        let tc = TurnController::new(MatchConfig::versus()).unwrap();
        Snapshot::capture(&tc, seq)
    }

    #[test]
    fn test_catch_up_returns_tail() {
        let mut log = DeltaLog::new(base(0));
        for seq in 1..=4 {
            log.push(delta(seq));
        }
        assert_eq!(log.latest_seq(), 4);
        assert_eq!(log.catch_up(2).deltas().len(), 2);
        assert!(log.catch_up(4).is_empty());
    }

    #[test]
    fn test_rebase_sends_snapshot_to_stragglers() {
        let mut log = DeltaLog::new(base(0));
        for seq in 1..=3 {
            log.push(delta(seq));
        }
        log.rebase(base(3));
        log.push(delta(4));
        assert_eq!(log.buffered(), 1);

        match log.catch_up(1) {
            Catchup::Snapshot { snapshot, deltas } => {
                assert_eq!(snapshot.seq, 3);
                assert_eq!(deltas.len(), 1);
            }
            other => panic!("expected snapshot, got {:?}", other),
        }
        assert_eq!(log.catch_up(3).deltas().len(), 1);
    }
}
