use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::task::JoinError;
use tokio::time::Instant;

use super::events::{EventQueue, SimEvent};
use super::room::{RoomSnapshot, WaitingRoom};
use super::student::Student;
use super::ta::{self, TaReport};
use super::timing::{Pacer, Timing};
use crate::config::Config;
use crate::error::{Result, SimError};

/// Pacer stream reserved for the TA; students use their own ids (1..=N)
const TA_ACTOR_ID: u64 = 0;

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub students: Vec<Student>,
    pub ta: TaReport,
    pub room: RoomSnapshot,
    pub events: Vec<SimEvent>,
    pub elapsed: Duration,
}

impl SimulationReport {
    pub fn served(&self) -> usize {
        self.room.served
    }

    pub fn all_done(&self) -> bool {
        self.students.iter().all(|s| s.done)
    }
}

/// Owns one run: builds the room, spawns the TA and every student, and
/// joins them all.
pub struct Simulation {
    config: Config,
}

impl Simulation {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self) -> Result<SimulationReport> {
        self.run_with(ta::run).await
    }

    /// Runs the simulation with `spawn_ta` as the TA body
    async fn run_with<F, Fut>(&self, spawn_ta: F) -> Result<SimulationReport>
    where
        F: FnOnce(Arc<WaitingRoom>, EventQueue, Timing, Pacer) -> Fut,
        Fut: Future<Output = Result<TaReport>> + Send + 'static,
    {
        let config = &self.config;
        let started = Instant::now();

        tracing::info!(
            students = config.students,
            chairs = config.chairs,
            seed = ?config.seed,
            "Sleeping TA simulation starting"
        );

        let room = Arc::new(WaitingRoom::new(config.chairs, config.students));
        let (events, recorder) = EventQueue::new();

        let mut ta_handle = tokio::spawn(spawn_ta(
            room.clone(),
            events.clone(),
            config.timing,
            Pacer::for_actor(config.seed, TA_ACTOR_ID),
        ));

        let student_handles: Vec<_> = (1..=config.students)
            .map(|id| {
                tokio::spawn(Student::new(id).run(
                    room.clone(),
                    events.clone(),
                    config.timing,
                    Pacer::for_actor(config.seed, id as u64),
                ))
            })
            .collect();
        drop(events);

        let students_joined = join_all(student_handles);
        tokio::pin!(students_joined);

        // The TA normally stops right after posting the last service-done,
        // so it may finish before the last student does.
        let mut ta_outcome = None;
        let joined_students = tokio::select! {
            results = &mut students_joined => results,
            joined = &mut ta_handle => {
                let outcome = flatten_join("TA", joined);
                if let Err(e) = &outcome {
                    tracing::error!(error = %e, "TA stopped before every student was helped");
                    // Releases students parked on the signals or retrying a seat.
                    room.close();
                }
                ta_outcome = Some(outcome);
                students_joined.await
            }
        };

        let mut students = Vec::with_capacity(config.students);
        let mut failure = None;
        for (idx, joined) in joined_students.into_iter().enumerate() {
            match flatten_join(&format!("student {}", idx + 1), joined) {
                Ok(student) => students.push(student),
                Err(e) => {
                    tracing::warn!(student_id = idx + 1, error = %e, "Student did not finish");
                    failure.get_or_insert(e);
                }
            }
        }

        let ta_report = match ta_outcome {
            Some(outcome) => outcome?,
            None => {
                if let Some(e) = failure.take() {
                    // The TA would otherwise wait forever for the missing students.
                    room.close();
                    ta_handle.abort();
                    return Err(e);
                }
                flatten_join("TA", ta_handle.await)?
            }
        };

        if let Some(e) = failure {
            return Err(e);
        }

        room.close();
        let snapshot = room.snapshot().await;
        let events = recorder.finish().await?;

        if snapshot.served != room.population() {
            return Err(SimError::internal(format!(
                "TA stopped after {} of {} students",
                snapshot.served,
                room.population()
            )));
        }

        let report = SimulationReport {
            students,
            ta: ta_report,
            room: snapshot,
            events,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            served = report.served(),
            peak_occupied = report.room.peak_occupied,
            rejections = report.room.rejections,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Simulation complete"
        );

        Ok(report)
    }
}

/// Folds a task's join result and its own result into one, tagging both
/// failure kinds as `ActorFailed` for `actor`
fn flatten_join<T>(
    actor: &str,
    joined: std::result::Result<Result<T>, JoinError>,
) -> Result<T> {
    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(SimError::actor_failed(actor, e)),
        Err(e) => Err(SimError::actor_failed(actor, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::timing::DelayRange;

    fn config(students: usize, chairs: usize) -> Config {
        Config {
            students,
            chairs,
            timing: Timing::uniform(DelayRange::new(1, 20)),
            seed: Some(11),
            ..Config::default()
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(matches!(
            Simulation::new(config(0, 3)),
            Err(SimError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Simulation::new(config(3, 0)),
            Err(SimError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_serves_everyone() {
        let report = Simulation::new(config(4, 2)).unwrap().run().await.unwrap();

        assert_eq!(report.served(), 4);
        assert_eq!(report.ta.served, 4);
        assert!(report.all_done());
        assert_eq!(report.room.occupied, 0);

        let mut ids: Vec<_> = report.students.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    /// Takes one student, then gives up with an error
    async fn quitting_ta(
        room: Arc<WaitingRoom>,
        _events: EventQueue,
        _timing: Timing,
        _pacer: Pacer,
    ) -> Result<TaReport> {
        room.wait_for_student().await?;
        Err(SimError::internal("TA went home early"))
    }

    /// Takes one student, then panics
    async fn crashing_ta(
        room: Arc<WaitingRoom>,
        _events: EventQueue,
        _timing: Timing,
        _pacer: Pacer,
    ) -> Result<TaReport> {
        room.wait_for_student().await?;
        panic!("TA crashed mid-run");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ta_error_mid_run_is_actor_failed() {
        let simulation = Simulation::new(config(3, 1)).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(600),
            simulation.run_with(quitting_ta),
        )
        .await
        .expect("driver must return once the TA is gone");

        match result {
            Err(SimError::ActorFailed { actor, reason }) => {
                assert_eq!(actor, "TA");
                assert!(reason.contains("TA went home early"));
            }
            other => panic!("expected ActorFailed, got {:?}", other.map(|r| r.served())),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ta_panic_mid_run_is_actor_failed() {
        let simulation = Simulation::new(config(4, 2)).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(600),
            simulation.run_with(crashing_ta),
        )
        .await
        .expect("driver must return once the TA is gone");

        assert!(matches!(
            result,
            Err(SimError::ActorFailed { ref actor, .. }) if actor == "TA"
        ));
    }
}
