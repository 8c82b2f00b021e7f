use serde::Serialize;
use tokio::sync::Mutex;

use super::signal::Signal;
use crate::error::{Result, SimError};

/// Result of a single seat attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatOutcome {
    /// A chair was claimed; `occupied` is the count right after claiming it
    Seated { occupied: usize },
    Full,
}

impl SeatOutcome {
    pub fn is_seated(&self) -> bool {
        matches!(self, SeatOutcome::Seated { .. })
    }
}

/// Point-in-time copy of the room counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoomSnapshot {
    pub capacity: usize,
    pub occupied: usize,
    pub peak_occupied: usize,
    pub served: usize,
    pub rejections: usize,
}

#[derive(Debug, Default)]
struct RoomCounters {
    occupied: usize,
    served: usize,
    peak_occupied: usize,
    rejections: usize,
}

/// Shared state between the TA and the students.
///
/// All counters sit behind one lock, held only for the O(1) update. The
/// three signals are used without the lock.
#[derive(Debug)]
pub struct WaitingRoom {
    capacity: usize,
    population: usize,
    counters: Mutex<RoomCounters>,
    students_waiting: Signal,
    student_acknowledged: Signal,
    service_complete: Signal,
}

impl WaitingRoom {
    /// `capacity` chairs for a closed population of `population` students.
    /// Both are expected to be positive; the config layer checks that.
    pub fn new(capacity: usize, population: usize) -> Self {
        Self {
            capacity,
            population,
            counters: Mutex::new(RoomCounters::default()),
            students_waiting: Signal::new("students_waiting"),
            student_acknowledged: Signal::new("student_acknowledged"),
            service_complete: Signal::new("service_complete"),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn population(&self) -> usize {
        self.population
    }

    /// Claims a chair if one is free. Check and increment happen under a
    /// single lock acquisition so two students cannot take the last chair.
    ///
    /// Fails with `RoomClosed` once the room has been torn down, so students
    /// backing off do not retry forever.
    pub async fn try_seat(&self) -> Result<SeatOutcome> {
        if self.is_closed() {
            return Err(SimError::RoomClosed);
        }

        let mut counters = self.counters.lock().await;
        if counters.occupied < self.capacity {
            counters.occupied += 1;
            counters.peak_occupied = counters.peak_occupied.max(counters.occupied);
            Ok(SeatOutcome::Seated {
                occupied: counters.occupied,
            })
        } else {
            counters.rejections += 1;
            Ok(SeatOutcome::Full)
        }
    }

    /// Frees one chair and returns how many are still taken
    pub async fn vacate(&self) -> usize {
        let mut counters = self.counters.lock().await;
        counters.occupied = counters.occupied.saturating_sub(1);
        counters.occupied
    }

    /// Counts one finished service. `done` is decided under the same lock as
    /// the increment, so exactly one call ever sees it flip to true.
    pub async fn mark_served(&self) -> (usize, bool) {
        let mut counters = self.counters.lock().await;
        counters.served += 1;
        (counters.served, counters.served >= self.population)
    }

    pub async fn snapshot(&self) -> RoomSnapshot {
        let counters = self.counters.lock().await;
        RoomSnapshot {
            capacity: self.capacity,
            occupied: counters.occupied,
            peak_occupied: counters.peak_occupied,
            served: counters.served,
            rejections: counters.rejections,
        }
    }

    /// Student side: announce one more seated student
    pub fn signal_seated(&self) {
        self.students_waiting.post();
    }

    /// TA side: sleep until at least one student is seated
    pub async fn wait_for_student(&self) -> Result<()> {
        self.students_waiting.wait().await
    }

    /// TA side: call one seated student in
    pub fn signal_call(&self) {
        self.student_acknowledged.post();
    }

    /// Student side: wait to be called in by the TA
    pub async fn wait_for_call(&self) -> Result<()> {
        self.student_acknowledged.wait().await
    }

    /// TA side: the current help session is over
    pub fn signal_service_done(&self) {
        self.service_complete.post();
    }

    /// Student side: wait for the help session to end
    pub async fn wait_for_service_done(&self) -> Result<()> {
        self.service_complete.wait().await
    }

    /// Tears down the signals. Anything still waiting gets `SignalClosed`.
    pub fn close(&self) {
        self.students_waiting.close();
        self.student_acknowledged.close();
        self.service_complete.close();
        tracing::debug!("Waiting room signals closed");
    }

    pub fn is_closed(&self) -> bool {
        self.students_waiting.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_try_seat_respects_capacity() {
        let room = WaitingRoom::new(2, 5);

        assert_eq!(room.try_seat().await.unwrap(), SeatOutcome::Seated { occupied: 1 });
        assert_eq!(room.try_seat().await.unwrap(), SeatOutcome::Seated { occupied: 2 });
        assert_eq!(room.try_seat().await.unwrap(), SeatOutcome::Full);

        let snapshot = room.snapshot().await;
        assert_eq!(snapshot.occupied, 2);
        assert_eq!(snapshot.rejections, 1);
        assert_eq!(snapshot.peak_occupied, 2);
    }

    #[tokio::test]
    async fn test_vacate_frees_a_chair() {
        let room = WaitingRoom::new(1, 3);
        assert!(room.try_seat().await.unwrap().is_seated());
        assert!(!room.try_seat().await.unwrap().is_seated());

        assert_eq!(room.vacate().await, 0);
        assert!(room.try_seat().await.unwrap().is_seated());
    }

    #[tokio::test]
    async fn test_vacate_never_goes_negative() {
        let room = WaitingRoom::new(1, 1);
        assert_eq!(room.vacate().await, 0);
        assert_eq!(room.snapshot().await.occupied, 0);
    }

    #[tokio::test]
    async fn test_mark_served_reports_done_once() {
        let room = WaitingRoom::new(3, 3);
        assert_eq!(room.mark_served().await, (1, false));
        assert_eq!(room.mark_served().await, (2, false));
        assert_eq!(room.mark_served().await, (3, true));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_seating_never_exceeds_capacity() {
        let room = Arc::new(WaitingRoom::new(3, 64));
        let mut handles = Vec::new();
        for _ in 0..64 {
            let room = room.clone();
            handles.push(tokio::spawn(async move { room.try_seat().await }));
        }

        let mut seated = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_seated() {
                seated += 1;
            }
        }

        let snapshot = room.snapshot().await;
        assert_eq!(seated, 3);
        assert_eq!(snapshot.occupied, 3);
        assert_eq!(snapshot.peak_occupied, 3);
        assert_eq!(snapshot.rejections, 61);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mark_served_single_done() {
        let room = Arc::new(WaitingRoom::new(1, 32));
        let mut handles = Vec::new();
        for _ in 0..32 {
            let room = room.clone();
            handles.push(tokio::spawn(async move { room.mark_served().await }));
        }

        let mut done_count = 0;
        for handle in handles {
            let (_, done) = handle.await.unwrap();
            if done {
                done_count += 1;
            }
        }
        assert_eq!(done_count, 1);
        assert_eq!(room.snapshot().await.served, 32);
    }

    #[tokio::test]
    async fn test_handoff_signals() {
        let room = WaitingRoom::new(1, 1);
        room.signal_seated();
        room.wait_for_student().await.unwrap();
        room.signal_call();
        room.wait_for_call().await.unwrap();
        room.signal_service_done();
        room.wait_for_service_done().await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_room_rejects_seating() {
        let room = WaitingRoom::new(2, 2);
        assert!(!room.is_closed());
        room.close();
        assert!(room.is_closed());
        assert!(matches!(room.try_seat().await, Err(SimError::RoomClosed)));
        assert_eq!(room.snapshot().await.occupied, 0);
    }

    #[tokio::test]
    async fn test_close_fails_pending_waits() {
        let room = WaitingRoom::new(1, 1);
        room.close();
        assert!(matches!(
            room.wait_for_student().await,
            Err(SimError::SignalClosed("students_waiting"))
        ));
        assert!(matches!(
            room.wait_for_call().await,
            Err(SimError::SignalClosed("student_acknowledged"))
        ));
    }
}
