//! Lifecycle transition tables (spec §3 "Lifecycle"): a position status is
//! one of a closed set of states, extended per instrument family; a
//! transition table is a finite set of `(from, to)` pairs, and any pair
//! not in the table is illegal. Generalizes the approval prototype's
//! hand-rolled `TradeContext::current_state` witness walk
//! (`src/context.rs`) into an explicit, checkable table.

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionStatus {
    Proposed,
    Formed,
    Settled,
    Cancelled,
    Closed,
}

impl PositionStatus {
    fn tag(&self) -> &'static str {
        match self {
            PositionStatus::Proposed => "proposed",
            PositionStatus::Formed => "formed",
            PositionStatus::Settled => "settled",
            PositionStatus::Cancelled => "cancelled",
            PositionStatus::Closed => "closed",
        }
    }
}

/// A finite transition table: a pair `(from, to)` is legal iff it appears
/// in `edges`. Terminal states simply never appear as a `from` in any
/// edge.
pub struct TransitionTable<S> {
    edges: Vec<(S, S)>,
}

impl<S: Copy + PartialEq> TransitionTable<S> {
    pub fn new(edges: Vec<(S, S)>) -> Self {
        Self { edges }
    }

    pub fn is_legal(&self, from: S, to: S) -> bool {
        self.edges.iter().any(|(f, t)| *f == from && *t == to)
    }

    pub fn is_terminal(&self, state: S) -> bool {
        !self.edges.iter().any(|(f, _)| *f == state)
    }

    pub fn check(&self, from: S, to: S) -> Result<(), (S, S)> {
        if self.is_legal(from, to) {
            Ok(())
        } else {
            Err((from, to))
        }
    }
}

/// The generic post-trade position lifecycle table (spec §3).
pub fn position_transition_table() -> TransitionTable<PositionStatus> {
    use PositionStatus::*;
    TransitionTable::new(vec![
        (Proposed, Formed),
        (Proposed, Cancelled),
        (Formed, Settled),
        (Formed, Cancelled),
        (Settled, Closed),
    ])
}

/// Check a transition against the generic position lifecycle table,
/// surfacing [`Error::IllegalTransition`] on failure (spec §7).
pub fn check_position_transition(from: PositionStatus, to: PositionStatus) -> Result<(), Error> {
    position_transition_table()
        .check(from, to)
        .map_err(|(from, to)| Error::IllegalTransition {
            entity: "position".to_string(),
            from: from.tag().to_string(),
            to: to.tag().to_string(),
        })
}

/// The pre-trade approval workflow state (the prototype's own
/// `TradeState`, `src/context.rs`), expressed as an explicit transition
/// table rather than a witness-chain walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApprovalState {
    Draft,
    PendingApproval,
    Approved,
    Cancelled,
    SentToExecute,
    Booked,
}

impl ApprovalState {
    fn tag(&self) -> &'static str {
        match self {
            ApprovalState::Draft => "draft",
            ApprovalState::PendingApproval => "pending_approval",
            ApprovalState::Approved => "approved",
            ApprovalState::Cancelled => "cancelled",
            ApprovalState::SentToExecute => "sent_to_execute",
            ApprovalState::Booked => "booked",
        }
    }
}

pub fn approval_transition_table() -> TransitionTable<ApprovalState> {
    use ApprovalState::*;
    TransitionTable::new(vec![
        (Draft, PendingApproval),
        (PendingApproval, Approved),
        (PendingApproval, Cancelled),
        (PendingApproval, PendingApproval), // an Update re-enters pending approval
        (Approved, PendingApproval),        // an Update after Approve invalidates it
        (Approved, Cancelled),
        (Approved, SentToExecute),
        (SentToExecute, Booked),
        (SentToExecute, Cancelled),
    ])
}

pub fn check_approval_transition(from: ApprovalState, to: ApprovalState) -> Result<(), Error> {
    approval_transition_table()
        .check(from, to)
        .map_err(|(from, to)| Error::IllegalTransition {
            entity: "approval_workflow".to_string(),
            from: from.tag().to_string(),
            to: to.tag().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        let table = position_transition_table();
        assert!(table.is_terminal(PositionStatus::Closed));
        assert!(table.is_terminal(PositionStatus::Cancelled));
        assert!(!table.is_terminal(PositionStatus::Proposed));
    }

    #[test]
    fn check_matches_table_membership() {
        assert!(check_position_transition(PositionStatus::Proposed, PositionStatus::Formed).is_ok());
        assert!(check_position_transition(PositionStatus::Closed, PositionStatus::Formed).is_err());
    }

    #[test]
    fn approval_update_after_approve_returns_to_pending() {
        assert!(check_approval_transition(ApprovalState::Approved, ApprovalState::PendingApproval).is_ok());
        assert!(check_approval_transition(ApprovalState::Booked, ApprovalState::Draft).is_err());
    }
}
