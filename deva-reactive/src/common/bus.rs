/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{instrument, trace, warn};

use crate::common::config::CONFIG;
use crate::common::Listener;
use crate::message::BusMessage;

/// Identifies one subscription so it can be removed again with [`Bus::ignore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Clone)]
struct Subscription {
    id: ListenerId,
    once: bool,
    listener: Listener,
}

#[derive(Default)]
struct BusInner {
    topics: DashMap<String, Vec<Subscription>>,
    next_id: AtomicU64,
    max_listeners: AtomicUsize,
}

/// A synchronous publish/subscribe hub keyed by topic string.
///
/// Cloning a `Bus` yields another handle to the same hub, which is how parent and
/// child agents end up sharing one. Listeners run on the publishing thread, in
/// subscription order, before [`Bus::talk`] returns. No lock is held while they run,
/// so a listener may itself publish, subscribe or unsubscribe.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("topics", &self.inner.topics.len())
            .field("max_listeners", &self.max_listeners())
            .finish()
    }
}

impl Bus {
    /// Creates a bus using the configured listener limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_listeners(CONFIG.limits.max_listeners)
    }

    /// Creates a bus that warns once a topic holds more than `max` listeners.
    ///
    /// `0` disables the warning.
    #[must_use]
    pub fn with_max_listeners(max: usize) -> Self {
        let inner = BusInner {
            max_listeners: AtomicUsize::new(max),
            ..BusInner::default()
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// The current per-topic listener limit.
    pub fn max_listeners(&self) -> usize {
        self.inner.max_listeners.load(Ordering::Relaxed)
    }

    /// Changes the per-topic listener limit. Exceeding it only logs a warning.
    pub fn set_max_listeners(&self, max: usize) {
        self.inner.max_listeners.store(max, Ordering::Relaxed);
    }

    /// Subscribes `listener` to every message on `topic`.
    pub fn listen<F>(&self, topic: &str, listener: F) -> ListenerId
    where
        F: Fn(&BusMessage) + Send + Sync + 'static,
    {
        self.subscribe(topic, Arc::new(listener), false)
    }

    /// Subscribes `listener` to the next message on `topic` only.
    pub fn once<F>(&self, topic: &str, listener: F) -> ListenerId
    where
        F: Fn(&BusMessage) + Send + Sync + 'static,
    {
        self.subscribe(topic, Arc::new(listener), true)
    }

    /// Subscribes an already shared listener.
    pub fn listen_shared(&self, topic: &str, listener: Listener) -> ListenerId {
        self.subscribe(topic, listener, false)
    }

    fn subscribe(&self, topic: &str, listener: Listener, once: bool) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let count = {
            let mut subscriptions = self.inner.topics.entry(topic.to_string()).or_default();
            subscriptions.push(Subscription { id, once, listener });
            subscriptions.len()
        };
        let max = self.max_listeners();
        if max > 0 && count > max {
            warn!(topic, count, max, "possible listener leak: topic exceeds max listeners");
        }
        trace!(topic, ?id, once, "listener added");
        id
    }

    /// Removes one subscription. Returns whether it was still registered.
    pub fn ignore(&self, topic: &str, id: ListenerId) -> bool {
        let removed = match self.inner.topics.get_mut(topic) {
            Some(mut subscriptions) => {
                let before = subscriptions.len();
                subscriptions.retain(|s| s.id != id);
                before != subscriptions.len()
            }
            None => false,
        };
        self.inner.topics.remove_if(topic, |_, subs| subs.is_empty());
        trace!(topic, ?id, removed, "listener removed");
        removed
    }

    /// Publishes `message` on `topic`, returning how many listeners received it.
    ///
    /// One-time listeners are unsubscribed before any listener runs, so a listener
    /// that publishes on the same topic cannot trigger them twice.
    #[instrument(skip(self, message), level = "trace")]
    pub fn talk(&self, topic: &str, message: impl Into<BusMessage>) -> usize {
        let message = message.into();
        let listeners: Vec<Listener> = match self.inner.topics.get_mut(topic) {
            Some(mut subscriptions) => {
                let listeners = subscriptions
                    .iter()
                    .map(|s| Arc::clone(&s.listener))
                    .collect();
                subscriptions.retain(|s| !s.once);
                listeners
            }
            None => Vec::new(),
        };
        self.inner.topics.remove_if(topic, |_, subs| subs.is_empty());

        trace!(topic, count = listeners.len(), "delivering");
        for listener in &listeners {
            listener(&message);
        }
        listeners.len()
    }

    /// Number of listeners currently subscribed to `topic`.
    pub fn listener_count(&self, topic: &str) -> usize {
        self.inner.topics.get(topic).map_or(0, |subs| subs.len())
    }

    /// Whether both handles point at the same hub.
    pub fn is_same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
