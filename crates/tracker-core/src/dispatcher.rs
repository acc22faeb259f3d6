//! Event dispatcher: writes serialized events to a user's live sinks.
//!
//! Delivery is best effort. An event addressed to a user with no open sinks is
//! dropped, and a failing sink never affects its siblings or the caller.

use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use crate::events::Event;
use crate::logging::{COMPONENT_DISPATCHER, SUBSYSTEM_REALTIME};
use crate::models::UserId;
use crate::registry::{ConnectionRegistry, Frame};

/// Outcome counts for one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

impl DeliveryReport {
    fn merge(&mut self, other: DeliveryReport) {
        self.delivered += other.delivered;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone)]
pub struct EventDispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl EventDispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Deliver `event` to every open sink of `user`.
    pub fn send(&self, user: UserId, event: &Event) -> DeliveryReport {
        match encode(event) {
            Some(frame) => self.send_frame(user, event, &frame),
            None => DeliveryReport::default(),
        }
    }

    /// Deliver `event` to each user in `users`. The event is serialized once.
    pub fn broadcast<I>(&self, users: I, event: &Event) -> DeliveryReport
    where
        I: IntoIterator<Item = UserId>,
    {
        let Some(frame) = encode(event) else {
            return DeliveryReport::default();
        };

        let mut report = DeliveryReport::default();
        let mut audience_size = 0usize;
        for user in users {
            audience_size += 1;
            report.merge(self.send_frame(user, event, &frame));
        }

        debug!(
            subsystem = SUBSYSTEM_REALTIME,
            component = COMPONENT_DISPATCHER,
            event_type = event.event_type(),
            audience_size,
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast complete"
        );
        report
    }

    fn send_frame(&self, user: UserId, event: &Event, frame: &Frame) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for sink in self.registry.sinks_for(user) {
            match sink.try_write(frame.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                    trace!(
                        user_id = %user,
                        sink_id = %sink.id(),
                        event_type = event.event_type(),
                        "Frame written"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        subsystem = SUBSYSTEM_REALTIME,
                        component = COMPONENT_DISPATCHER,
                        user_id = %user,
                        sink_id = %sink.id(),
                        event_type = event.event_type(),
                        error = %e,
                        "Failed to write event to sink"
                    );
                }
            }
        }
        report
    }
}

fn encode(event: &Event) -> Option<Frame> {
    match event.to_json() {
        Ok(json) => Some(Frame::from(json)),
        Err(e) => {
            error!(
                subsystem = SUBSYSTEM_REALTIME,
                component = COMPONENT_DISPATCHER,
                event_type = event.event_type(),
                error = %e,
                "Failed to serialize event"
            );
            None
        }
    }
}
