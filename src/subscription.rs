use crate::entity::{Entity, EntityState};
use crate::error::{PlantCareError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Outcome of polling one entity
#[derive(Debug, Clone)]
pub enum StateUpdate {
    /// The device answered and the entity cache was refreshed
    Refreshed(EntityState),

    /// The poll failed; the entity keeps its previous state
    Failed { unique_id: String, error: String },
}

impl StateUpdate {
    pub fn unique_id(&self) -> &str {
        match self {
            StateUpdate::Refreshed(state) => &state.unique_id,
            StateUpdate::Failed { unique_id, .. } => unique_id,
        }
    }
}

/// Receiver for poll results
pub struct StateReceiver {
    rx: broadcast::Receiver<StateUpdate>,
}

impl StateReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<StateUpdate>) -> Self {
        Self { rx }
    }

    /// Receive the next state update
    ///
    /// Fails with `ChannelError` once the poller is dropped or if this
    /// receiver fell behind.
    pub async fn recv(&mut self) -> Result<StateUpdate> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => {
                PlantCareError::ChannelError("Poller closed".to_string())
            }
            broadcast::error::RecvError::Lagged(n) => {
                PlantCareError::ChannelError(format!("Lagged by {} messages", n))
            }
        })
    }

    /// Try to receive a state update without blocking
    ///
    /// Returns `None` if no update is available.
    pub fn try_recv(&mut self) -> Result<Option<StateUpdate>> {
        match self.rx.try_recv() {
            Ok(update) => Ok(Some(update)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => {
                Err(PlantCareError::ChannelError("Poller closed".to_string()))
            }
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(PlantCareError::ChannelError(format!("Lagged by {} messages", n)))
            }
        }
    }
}

/// Run a blocking entity update on tokio's blocking pool
pub async fn update_blocking(entity: Arc<dyn Entity>) -> Result<EntityState> {
    tokio::task::spawn_blocking(move || entity.update())
        .await
        .map_err(|e| PlantCareError::ChannelError(format!("update task failed: {}", e)))?
}

/// Periodically refreshes entities for async callers
///
/// Each tick updates the entities one after another on the blocking pool, so
/// a device never sees overlapping requests from the poller.
///
/// # Example
///
/// ```no_run
/// use plant_care::{ConfigFlow, FlowResult, PlantCareIntegration, Poller, UserInput};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut flow = ConfigFlow::new();
///     let FlowResult::CreateEntry(entry) = flow.step_user(Some(UserInput {
///         host: "192.168.1.50".to_string(),
///     })) else {
///         return Ok(());
///     };
///
///     let mut integration = PlantCareIntegration::new();
///     let device = tokio::task::spawn_blocking(move || integration.setup_entry(&entry)).await??;
///
///     let mut poller = Poller::new(device.entities(), Duration::from_secs(30))?;
///     let mut updates = poller.subscribe();
///     poller.start();
///
///     while let Ok(update) = updates.recv().await {
///         println!("{:?}", update);
///     }
///     Ok(())
/// }
/// ```
pub struct Poller {
    entities: Vec<Arc<dyn Entity>>,
    interval: Duration,
    update_tx: broadcast::Sender<StateUpdate>,
    stop_tx: Option<broadcast::Sender<()>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Poller {
    /// Create a poller refreshing `entities` every `interval`
    ///
    /// A zero interval is rejected with `InvalidRequest`.
    pub fn new(entities: Vec<Arc<dyn Entity>>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(PlantCareError::InvalidRequest(
                "poll interval must be non-zero".to_string(),
            ));
        }

        let (update_tx, _) = broadcast::channel(100);
        Ok(Self {
            entities,
            interval,
            update_tx,
            stop_tx: None,
            task_handle: None,
        })
    }

    /// Subscribe to poll results
    pub fn subscribe(&self) -> StateReceiver {
        StateReceiver::new(self.update_tx.subscribe())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start polling; the first tick fires immediately
    ///
    /// Must be called from within a tokio runtime. Calling it while already
    /// running is a no-op.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let (stop_tx, mut stop_rx) = broadcast::channel(1);
        self.stop_tx = Some(stop_tx);

        let entities = self.entities.clone();
        let update_tx = self.update_tx.clone();
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stop_rx.recv() => {
                        tracing::info!("Poller stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        for entity in &entities {
                            let update = Self::poll_one(entity.clone()).await;
                            let _ = update_tx.send(update);
                        }
                    }
                }
            }
        });

        self.task_handle = Some(handle);
    }

    /// Stop polling and wait for the current tick to finish
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }

    async fn poll_one(entity: Arc<dyn Entity>) -> StateUpdate {
        let unique_id = entity.unique_id().to_string();
        match update_blocking(entity).await {
            Ok(state) => {
                tracing::debug!(unique_id = %unique_id, power = ?state.power, "entity refreshed");
                StateUpdate::Refreshed(state)
            }
            Err(e) => {
                tracing::warn!("Failed to update {}: {}", unique_id, e);
                StateUpdate::Failed {
                    unique_id,
                    error: e.to_string(),
                }
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceInfo;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Entity whose "device" is a counter, failing on odd polls
    struct Flaky {
        device_info: DeviceInfo,
        polls: AtomicI64,
    }

    impl Entity for Flaky {
        fn unique_id(&self) -> &str {
            "plant_care.test.flaky"
        }

        fn name(&self) -> &str {
            "flaky"
        }

        fn device_info(&self) -> &DeviceInfo {
            &self.device_info
        }

        fn update(&self) -> Result<EntityState> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 1 {
                return Err(PlantCareError::InvalidRequest("odd poll".to_string()));
            }
            Ok(EntityState {
                unique_id: self.unique_id().to_string(),
                power: Some(n),
                is_on: Some(n != 0),
            })
        }

        fn state(&self) -> EntityState {
            EntityState {
                unique_id: self.unique_id().to_string(),
                power: None,
                is_on: None,
            }
        }
    }

    #[tokio::test]
    async fn broadcasts_refreshed_and_failed_updates() {
        let flaky: Arc<dyn Entity> = Arc::new(Flaky {
            device_info: DeviceInfo::for_host("test"),
            polls: AtomicI64::new(0),
        });

        let mut poller = Poller::new(vec![flaky], Duration::from_millis(10)).unwrap();
        let mut rx = poller.subscribe();
        poller.start();
        assert!(poller.is_running());

        match rx.recv().await.unwrap() {
            StateUpdate::Refreshed(state) => {
                assert_eq!(state.power, Some(0));
                assert_eq!(state.is_on, Some(false));
            }
            other => panic!("expected refresh, got {:?}", other),
        }
        match rx.recv().await.unwrap() {
            StateUpdate::Failed { unique_id, error } => {
                assert_eq!(unique_id, "plant_care.test.flaky");
                assert!(error.contains("odd poll"));
            }
            other => panic!("expected failure, got {:?}", other),
        }

        poller.stop().await;
        assert!(!poller.is_running());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = Poller::new(Vec::new(), Duration::ZERO).err().unwrap();
        assert!(matches!(err, PlantCareError::InvalidRequest(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn dropping_a_started_poller_ends_its_task() {
        let flaky = Arc::new(Flaky {
            device_info: DeviceInfo::for_host("test"),
            polls: AtomicI64::new(0),
        });

        let mut poller =
            Poller::new(vec![flaky.clone() as Arc<dyn Entity>], Duration::from_millis(10)).unwrap();
        let mut rx = poller.subscribe();
        poller.start();
        rx.recv().await.unwrap();

        drop(poller);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let polls = flaky.polls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(flaky.polls.load(Ordering::SeqCst), polls);
        // The aborted task released its entity handles
        assert_eq!(Arc::strong_count(&flaky), 1);
    }

    #[tokio::test]
    async fn try_recv_is_empty_before_start() {
        let poller = Poller::new(Vec::new(), Duration::from_secs(1)).unwrap();
        let mut rx = poller.subscribe();
        assert!(rx.try_recv().unwrap().is_none());
    }
}
