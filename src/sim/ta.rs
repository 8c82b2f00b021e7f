use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::events::{EventQueue, SimEvent};
use super::room::WaitingRoom;
use super::timing::{Pacer, Timing};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaState {
    WaitForStudent,
    CallStudent,
    Serve,
    SignalDone,
    CheckTermination,
    Stop,
}

/// What the TA did over the whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaReport {
    pub served: usize,
    /// Sum of all help sessions
    pub busy: Duration,
}

/// The single TA. Sleeps until a student sits down, calls one in, helps it
/// and stops right after the last student of the population is served.
///
/// The call is anonymous: the TA frees a chair and posts the call signal,
/// and whichever seated student is woken gets helped.
pub async fn run(
    room: Arc<WaitingRoom>,
    events: EventQueue,
    timing: Timing,
    mut pacer: Pacer,
) -> Result<TaReport> {
    let mut state = TaState::WaitForStudent;
    let mut report = TaReport {
        served: 0,
        busy: Duration::ZERO,
    };

    loop {
        tracing::trace!(?state, "TA state");

        state = match state {
            TaState::WaitForStudent => {
                room.wait_for_student().await?;
                TaState::CallStudent
            }
            TaState::CallStudent => {
                let waiting = room.vacate().await;
                events.emit(SimEvent::StudentCalled { waiting });
                room.signal_call();
                TaState::Serve
            }
            TaState::Serve => {
                // No lock is held while helping.
                let duration = pacer.draw(timing.service);
                events.emit(SimEvent::Helping {
                    duration_ms: duration.as_millis() as u64,
                });
                tokio::time::sleep(duration).await;
                report.busy += duration;
                TaState::SignalDone
            }
            TaState::SignalDone => {
                room.signal_service_done();
                TaState::CheckTermination
            }
            TaState::CheckTermination => {
                let (served, done) = room.mark_served().await;
                report.served = served;
                events.emit(SimEvent::ServiceFinished { served });
                if done {
                    events.emit(SimEvent::TaFinished { served });
                    TaState::Stop
                } else {
                    TaState::WaitForStudent
                }
            }
            TaState::Stop => return Ok(report),
        };
    }
}
