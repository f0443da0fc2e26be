use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;
use tracing::{debug, info};

use super::ResourceProvider;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("reload listener was already borrowed when resources were reloaded")]
    ListenerBusy,
    #[error("resource reload failed: {source}")]
    Listener {
        #[source]
        source: Box<dyn Error + Send + Sync + 'static>,
    },
}

impl ReloadError {
    pub fn listener(source: impl Error + Send + Sync + 'static) -> Self {
        Self::Listener {
            source: Box::new(source),
        }
    }
}

/// Something that rebuilds itself when the host refreshes its resources.
pub trait ReloadListener {
    fn on_resource_reload(&mut self, resources: &dyn ResourceProvider) -> Result<(), ReloadError>;
}

/// Fan-out of resource refreshes. Listeners are held weakly; a listener that
/// has been dropped is pruned on the next reload.
#[derive(Default)]
pub struct ResourceReloadBus {
    listeners: Vec<Weak<RefCell<dyn ReloadListener>>>,
}

impl ResourceReloadBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<L>(&mut self, listener: &Rc<RefCell<L>>)
    where
        L: ReloadListener + 'static,
    {
        let weak: Weak<RefCell<L>> = Rc::downgrade(listener);
        let weak: Weak<RefCell<dyn ReloadListener>> = weak;
        self.listeners.push(weak);
        debug!(listeners = self.listener_count(), "reload_listener_subscribed");
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .iter()
            .filter(|listener| listener.strong_count() > 0)
            .count()
    }

    /// Notifies live listeners in subscription order. Stops at the first
    /// failure; returns how many listeners reloaded.
    pub fn reload(&mut self, resources: &dyn ResourceProvider) -> Result<usize, ReloadError> {
        self.listeners.retain(|listener| listener.strong_count() > 0);
        let mut notified = 0usize;
        for listener in &self.listeners {
            let Some(handle) = listener.upgrade() else {
                continue;
            };
            let mut listener = handle
                .try_borrow_mut()
                .map_err(|_| ReloadError::ListenerBusy)?;
            listener.on_resource_reload(resources)?;
            notified += 1;
        }
        info!(listeners = notified, "resources_reloaded");
        Ok(notified)
    }
}

impl fmt::Debug for ResourceReloadBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceReloadBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::resources::MemoryResourceProvider;

    struct CountingListener {
        reloads: u32,
        fail: bool,
    }

    impl ReloadListener for CountingListener {
        fn on_resource_reload(
            &mut self,
            _resources: &dyn ResourceProvider,
        ) -> Result<(), ReloadError> {
            if self.fail {
                return Err(ReloadError::listener(io::Error::new(
                    io::ErrorKind::Other,
                    "boom",
                )));
            }
            self.reloads += 1;
            Ok(())
        }
    }

    fn listener(fail: bool) -> Rc<RefCell<CountingListener>> {
        Rc::new(RefCell::new(CountingListener { reloads: 0, fail }))
    }

    #[test]
    fn reload_notifies_every_live_listener() {
        let mut bus = ResourceReloadBus::new();
        let a = listener(false);
        let b = listener(false);
        bus.subscribe(&a);
        bus.subscribe(&b);

        let notified = bus
            .reload(&MemoryResourceProvider::new())
            .expect("reload");
        assert_eq!(notified, 2);
        assert_eq!(a.borrow().reloads, 1);
        assert_eq!(b.borrow().reloads, 1);
    }

    #[test]
    fn dropped_listeners_are_pruned() {
        let mut bus = ResourceReloadBus::new();
        let kept = listener(false);
        bus.subscribe(&kept);
        {
            let dropped = listener(false);
            bus.subscribe(&dropped);
            assert_eq!(bus.listener_count(), 2);
        }
        assert_eq!(bus.listener_count(), 1);
        let notified = bus
            .reload(&MemoryResourceProvider::new())
            .expect("reload");
        assert_eq!(notified, 1);
    }

    #[test]
    fn first_failure_stops_the_fan_out() {
        let mut bus = ResourceReloadBus::new();
        let failing = listener(true);
        let after = listener(false);
        bus.subscribe(&failing);
        bus.subscribe(&after);

        let result = bus.reload(&MemoryResourceProvider::new());
        assert!(matches!(result, Err(ReloadError::Listener { .. })));
        assert_eq!(after.borrow().reloads, 0);
    }

    #[test]
    fn borrowed_listener_reports_busy() {
        let mut bus = ResourceReloadBus::new();
        let held = listener(false);
        bus.subscribe(&held);
        let _guard = held.borrow_mut();
        let result = bus.reload(&MemoryResourceProvider::new());
        assert!(matches!(result, Err(ReloadError::ListenerBusy)));
    }
}
