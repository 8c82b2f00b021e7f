use tokio::sync::Semaphore;

use crate::error::{Result, SimError};

/// Counting signal used for the handoffs between the TA and the students.
///
/// `post` adds one unit and wakes a single waiter; `wait` suspends while the
/// count is zero and then takes one unit.
#[derive(Debug)]
pub struct Signal {
    name: &'static str,
    permits: Semaphore,
}

impl Signal {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            permits: Semaphore::new(0),
        }
    }

    pub fn post(&self) {
        self.permits.add_permits(1);
    }

    pub async fn wait(&self) -> Result<()> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SimError::SignalClosed(self.name))?;
        // The unit is consumed, not handed back on drop.
        permit.forget();
        Ok(())
    }

    /// Current count; only meaningful as a diagnostic
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wakes every waiter with `SignalClosed`
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}
