//! Pointer events from the host window, delivered to scoped listeners.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crossbeam_channel::{Receiver, Sender, TryIter, unbounded};
use tracing::{debug, trace};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Positions are viewport pixels, (0,0) top-left.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32, button: PointerButton },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    Wheel { delta: f32 },
}

type Listeners = Rc<RefCell<HashMap<u64, Sender<PointerEvent>>>>;

/// Fans host pointer events out to every live subscription.
#[derive(Default)]
pub struct PointerHub {
    listeners: Listeners,
    next_id: u64,
}

impl PointerHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener. It stays attached until the returned
    /// subscription is dropped.
    pub fn subscribe(&mut self) -> PointerSubscription {
        let id = self.next_id;
        self.next_id += 1;

        let (sender, receiver) = unbounded();
        self.listeners.borrow_mut().insert(id, sender);
        debug!("pointer listener {id} attached");

        PointerSubscription {
            id,
            receiver,
            hub: Rc::downgrade(&self.listeners),
        }
    }

    /// Send `event` to every attached listener. Returns how many received it.
    pub fn dispatch(&self, event: PointerEvent) -> usize {
        let mut delivered = 0;
        for (id, sender) in self.listeners.borrow().iter() {
            // a listener unregisters before its receiver drops
            match sender.send(event) {
                Ok(()) => delivered += 1,
                Err(_) => trace!("pointer listener {id} is gone, dropping {event:?}"),
            }
        }
        delivered
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

/// A live pointer listener. Dropping it detaches from the hub, on every
/// exit path.
pub struct PointerSubscription {
    id: u64,
    receiver: Receiver<PointerEvent>,
    hub: Weak<RefCell<HashMap<u64, Sender<PointerEvent>>>>,
}

impl PointerSubscription {
    /// Events received since the last drain, oldest first.
    pub fn drain(&self) -> TryIter<'_, PointerEvent> {
        self.receiver.try_iter()
    }
}

impl Drop for PointerSubscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.hub.upgrade() {
            listeners.borrow_mut().remove(&self.id);
            debug!("pointer listener {} detached", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_reach_subscribers_until_dropped() {
        let mut hub = PointerHub::new();
        let a = hub.subscribe();
        let b = hub.subscribe();
        assert_eq!(hub.listener_count(), 2);

        assert_eq!(hub.dispatch(PointerEvent::Move { x: 1.0, y: 2.0 }), 2);
        assert_eq!(a.drain().count(), 1);
        assert_eq!(
            b.drain().collect::<Vec<_>>(),
            vec![PointerEvent::Move { x: 1.0, y: 2.0 }]
        );

        drop(a);
        assert_eq!(hub.listener_count(), 1);
        assert_eq!(hub.dispatch(PointerEvent::Wheel { delta: 1.0 }), 1);
        assert_eq!(b.drain().count(), 1);
    }

    #[test]
    fn subscription_outliving_hub_is_harmless() {
        let mut hub = PointerHub::new();
        let sub = hub.subscribe();
        drop(hub);
        assert_eq!(sub.drain().count(), 0);
        drop(sub);
    }
}
