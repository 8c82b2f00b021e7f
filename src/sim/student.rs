use std::sync::Arc;

use serde::Serialize;
use tokio::time::sleep;

use super::events::{EventQueue, SimEvent};
use super::room::{SeatOutcome, WaitingRoom};
use super::timing::{Pacer, Timing};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentState {
    Arrive,
    TrySeat,
    Retry,
    Seated,
    Called,
    Served,
}

/// One student. `done` flips to true exactly once, after being helped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    pub id: usize,
    pub done: bool,
    /// Seat attempts made, including the successful one
    pub attempts: u32,
}

impl Student {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            done: false,
            attempts: 0,
        }
    }

    /// Runs the student until it has been helped and returns its final state.
    /// A student that is already done returns at once.
    ///
    /// A student that finds the room full backs off and keeps trying with no
    /// upper bound; the population is closed so it is eventually seated.
    pub async fn run(
        mut self,
        room: Arc<WaitingRoom>,
        events: EventQueue,
        timing: Timing,
        mut pacer: Pacer,
    ) -> Result<Self> {
        let mut state = StudentState::Arrive;

        while !self.done {
            tracing::trace!(student_id = self.id, ?state, "Student state");

            state = match state {
                StudentState::Arrive => {
                    pacer.pause(timing.arrival).await;
                    events.emit(SimEvent::Arrived { student_id: self.id });
                    StudentState::TrySeat
                }
                StudentState::TrySeat => {
                    self.attempts += 1;
                    match room.try_seat().await? {
                        SeatOutcome::Seated { occupied } => {
                            events.emit(SimEvent::Seated {
                                student_id: self.id,
                                occupied,
                                capacity: room.capacity(),
                            });
                            StudentState::Seated
                        }
                        SeatOutcome::Full => StudentState::Retry,
                    }
                }
                StudentState::Retry => {
                    let backoff = pacer.draw(timing.retry);
                    events.emit(SimEvent::RoomFull {
                        student_id: self.id,
                        retry_in_ms: backoff.as_millis() as u64,
                    });
                    sleep(backoff).await;
                    StudentState::TrySeat
                }
                StudentState::Seated => {
                    room.signal_seated();
                    room.wait_for_call().await?;
                    events.emit(SimEvent::GettingHelp { student_id: self.id });
                    StudentState::Called
                }
                StudentState::Called => {
                    room.wait_for_service_done().await?;
                    StudentState::Served
                }
                StudentState::Served => {
                    // Leaving: the loop guard sees `done` and exits.
                    self.done = true;
                    events.emit(SimEvent::Left { student_id: self.id });
                    StudentState::Served
                }
            };
        }

        Ok(self)
    }
}
