//! Processing loop state machine.

use serde::{Deserialize, Serialize};

/// Whether the current head is being processed (single-flight guard).
///
/// Idle -> Processing -> Idle around every step, whatever the step's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    #[default]
    Idle,
    Processing,
}

/// Ticket handed to the `listen()` call that claimed the outer loop.
///
/// A later claim gets a new ticket, so a stale caller cannot release a
/// loop it no longer owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenTicket(u64);

/// The two independent guards of the loop.
///
/// - `listening`: an outer `listen()` is running (re-entrancy guard).
/// - `status`: one step is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopState {
    pub listening: bool,
    pub status: ProcessingStatus,
    generation: u64,
}

impl LoopState {
    /// Claim the outer loop. Returns `None` if someone else holds it.
    pub fn try_start_listening(&mut self) -> Option<ListenTicket> {
        if self.listening {
            return None;
        }
        self.listening = true;
        self.generation += 1;
        Some(ListenTicket(self.generation))
    }

    /// True while `ticket` still owns a running loop.
    pub fn is_listening_as(&self, ticket: ListenTicket) -> bool {
        self.listening && self.generation == ticket.0
    }

    /// Release the loop, unless it has been claimed again since `ticket`.
    pub fn stop_listening_as(&mut self, ticket: ListenTicket) {
        if self.generation == ticket.0 {
            self.listening = false;
        }
    }

    /// Release the loop whoever holds it (external stop request).
    pub fn stop_listening(&mut self) {
        self.listening = false;
    }

    /// Claim the single step. Returns false if a step is already in flight.
    pub fn try_begin_step(&mut self) -> bool {
        if self.is_processing() {
            return false;
        }
        self.status = ProcessingStatus::Processing;
        true
    }

    pub fn end_step(&mut self) {
        self.status = ProcessingStatus::Idle;
    }

    pub fn is_processing(&self) -> bool {
        self.status == ProcessingStatus::Processing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listening_guard_is_exclusive() {
        let mut state = LoopState::default();
        let ticket = state.try_start_listening().unwrap();
        assert!(state.try_start_listening().is_none());
        assert!(state.is_listening_as(ticket));

        state.stop_listening_as(ticket);
        assert!(!state.listening);
        assert!(state.try_start_listening().is_some());
    }

    #[test]
    fn stale_ticket_does_not_release_newer_loop() {
        let mut state = LoopState::default();
        let old = state.try_start_listening().unwrap();
        state.stop_listening();
        let new = state.try_start_listening().unwrap();

        assert!(!state.is_listening_as(old));
        state.stop_listening_as(old);

        assert!(state.listening);
        assert!(state.is_listening_as(new));
    }

    #[test]
    fn step_guard_transitions_idle_processing_idle() {
        let mut state = LoopState::default();
        assert_eq!(state.status, ProcessingStatus::Idle);

        assert!(state.try_begin_step());
        assert!(state.is_processing());
        assert!(!state.try_begin_step());

        state.end_step();
        assert_eq!(state.status, ProcessingStatus::Idle);
    }

    #[test]
    fn guards_are_independent() {
        let mut state = LoopState::default();
        assert!(state.try_begin_step());
        assert!(state.try_start_listening().is_some());
        state.stop_listening();
        assert!(state.is_processing());
    }
}
