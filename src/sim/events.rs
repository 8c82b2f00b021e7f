use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Observable transitions of the simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    Arrived {
        student_id: usize,
    },
    Seated {
        student_id: usize,
        occupied: usize,
        capacity: usize,
    },
    /// No free chair; the student backs off and tries again
    RoomFull {
        student_id: usize,
        retry_in_ms: u64,
    },
    /// TA freed a chair and called the next seated student
    StudentCalled {
        waiting: usize,
    },
    Helping {
        duration_ms: u64,
    },
    GettingHelp {
        student_id: usize,
    },
    Left {
        student_id: usize,
    },
    ServiceFinished {
        served: usize,
    },
    TaFinished {
        served: usize,
    },
}

impl SimEvent {
    /// Student the event belongs to, if any
    pub fn student_id(&self) -> Option<usize> {
        match self {
            SimEvent::Arrived { student_id }
            | SimEvent::Seated { student_id, .. }
            | SimEvent::RoomFull { student_id, .. }
            | SimEvent::GettingHelp { student_id }
            | SimEvent::Left { student_id } => Some(*student_id),
            SimEvent::StudentCalled { .. }
            | SimEvent::Helping { .. }
            | SimEvent::ServiceFinished { .. }
            | SimEvent::TaFinished { .. } => None,
        }
    }

    fn log(&self) {
        match self {
            SimEvent::Arrived { student_id } => {
                tracing::info!(student_id, "Student arrived");
            }
            SimEvent::Seated {
                student_id,
                occupied,
                capacity,
            } => {
                tracing::info!(student_id, occupied, capacity, "Student sitting in waiting chair");
            }
            SimEvent::RoomFull {
                student_id,
                retry_in_ms,
            } => {
                tracing::info!(student_id, retry_in_ms, "No free chair, will come back later");
            }
            SimEvent::StudentCalled { waiting } => {
                tracing::info!(waiting, "TA called a student in");
            }
            SimEvent::Helping { duration_ms } => {
                tracing::info!(duration_ms, "TA helping a student");
            }
            SimEvent::GettingHelp { student_id } => {
                tracing::info!(student_id, "Student getting help from TA");
            }
            SimEvent::Left { student_id } => {
                tracing::info!(student_id, "Student done and leaving");
            }
            SimEvent::ServiceFinished { served } => {
                tracing::debug!(served, "Help session finished");
            }
            SimEvent::TaFinished { served } => {
                tracing::info!(served, "All students have been helped, TA is done");
            }
        }
    }
}

/// Non-blocking event sink shared by every actor.
///
/// Events are logged by a background task and kept in arrival order; the
/// history comes back from [`EventRecorder::finish`] once every queue handle
/// has been dropped.
#[derive(Clone)]
pub struct EventQueue {
    sender: mpsc::UnboundedSender<SimEvent>,
}

/// Owner side of the queue's background task
pub struct EventRecorder {
    handle: JoinHandle<Vec<SimEvent>>,
}

impl EventQueue {
    /// Creates a queue with its background recorder
    pub fn new() -> (Self, EventRecorder) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(Self::process_events(receiver));
        (Self { sender }, EventRecorder { handle })
    }

    /// Queues an event; never waits
    pub fn emit(&self, event: SimEvent) {
        if let Err(e) = self.sender.send(event) {
            tracing::error!(error = %e, "Failed to queue simulation event");
        }
    }

    async fn process_events(mut receiver: mpsc::UnboundedReceiver<SimEvent>) -> Vec<SimEvent> {
        let mut history = Vec::new();
        while let Some(event) = receiver.recv().await {
            event.log();
            history.push(event);
        }
        tracing::debug!(events = history.len(), "Event recorder stopped");
        history
    }
}

impl EventRecorder {
    /// Waits for the channel to drain and returns every recorded event
    pub async fn finish(self) -> crate::error::Result<Vec<SimEvent>> {
        self.handle
            .await
            .map_err(|e| crate::error::SimError::actor_failed("event recorder", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_id() {
        assert_eq!(SimEvent::Arrived { student_id: 3 }.student_id(), Some(3));
        assert_eq!(
            SimEvent::Seated {
                student_id: 2,
                occupied: 1,
                capacity: 3
            }
            .student_id(),
            Some(2)
        );
        assert_eq!(SimEvent::Helping { duration_ms: 700 }.student_id(), None);
        assert_eq!(SimEvent::TaFinished { served: 5 }.student_id(), None);
    }

    #[test]
    fn test_event_serialization() {
        let event = SimEvent::Seated {
            student_id: 1,
            occupied: 2,
            capacity: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Seated");
        assert_eq!(json["student_id"], 1);
        assert_eq!(json["occupied"], 2);
        assert_eq!(json["capacity"], 3);
    }

    #[tokio::test]
    async fn test_queue_records_in_order() {
        let (queue, recorder) = EventQueue::new();
        let clone = queue.clone();

        queue.emit(SimEvent::Arrived { student_id: 1 });
        clone.emit(SimEvent::Left { student_id: 1 });
        queue.emit(SimEvent::TaFinished { served: 1 });
        drop(queue);
        drop(clone);

        let history = recorder.finish().await.unwrap();
        assert_eq!(
            history,
            vec![
                SimEvent::Arrived { student_id: 1 },
                SimEvent::Left { student_id: 1 },
                SimEvent::TaFinished { served: 1 },
            ]
        );
    }
}
