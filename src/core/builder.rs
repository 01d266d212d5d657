use std::sync::Arc;

use super::{alive::AliveTracker, supervisor::Supervisor};
use crate::{
    config::Config,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Replaces the event subscribers.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one event subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Creates the bus, the subscriber workers and the supervisor.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let alive = Arc::new(AliveTracker::new());
        Arc::new(Supervisor::new_internal(self.cfg.grace, bus, subs, alive))
    }
}
