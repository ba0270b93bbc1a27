//! Defines the [`Deva`] agent and its surrounding types.
//!
//! *   [`Deva`]: a cheaply cloneable handle to one agent. Every operation (lifecycle,
//!     question/ask, tree mechanics, utilities) is a method on it.
//! *   [`DevaBuilder`]: the construction surface, collecting methods, hooks, child
//!     agents and shared state before producing a `Deva`.
//! *   [`AgentProfile`]: the agent's identity plus its optional `translate` and
//!     `parse` text capabilities.
//! *   [`Inherit`]: the fields a parent shares with its children.

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

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use static_assertions::assert_impl_all;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use uuid::Uuid;

pub use builder::DevaBuilder;
pub use tree::Inherit;

use crate::common::{
    AgentListener, Bus, ErrorHook, LifecycleHook, ListenerId, MethodRef, MethodTable, Shared,
    TextTransform,
};
use crate::message::{DevaError, Profile, State};
use crate::traits::Talk;

mod builder;
mod lifecycle;
mod question;
mod tree;
mod utility;

/// An agent's identity and its optional text capabilities.
#[derive(Clone, Default)]
pub struct AgentProfile {
    /// Key, name and prompt.
    pub profile: Profile,
    /// Rewrites text the agent emits, such as prompt notifications.
    pub translate: Option<TextTransform>,
    /// Rewrites text the agent receives.
    pub parse: Option<TextTransform>,
}

impl AgentProfile {
    /// Creates a profile without text capabilities.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            profile: Profile::new(key, name),
            translate: None,
            parse: None,
        }
    }

    /// Sets the prompt string.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.profile.prompt = prompt.into();
        self
    }

    /// Sets the `translate` capability.
    #[must_use]
    pub fn with_translate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Deva, &str) -> String + Send + Sync + 'static,
    {
        self.translate = Some(Arc::new(f));
        self
    }

    /// Sets the `parse` capability.
    #[must_use]
    pub fn with_parse<F>(mut self, f: F) -> Self
    where
        F: Fn(&Deva, &str) -> String + Send + Sync + 'static,
    {
        self.parse = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for AgentProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentProfile")
            .field("profile", &self.profile)
            .field("translate", &self.translate.is_some())
            .field("parse", &self.parse.is_some())
            .finish()
    }
}

/// Fields a child observes from its parent after inheritance.
#[derive(Clone)]
pub(crate) struct Inherited {
    pub(crate) events: Bus,
    pub(crate) config: Shared<Value>,
    pub(crate) security: Shared<MethodTable>,
    pub(crate) client: Shared<Option<Profile>>,
    pub(crate) lib: Shared<MethodTable>,
}

/// Optional overrides for each lifecycle stage.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub(crate) on_init: Option<LifecycleHook>,
    pub(crate) on_start: Option<LifecycleHook>,
    pub(crate) on_stop: Option<LifecycleHook>,
    pub(crate) on_enter: Option<LifecycleHook>,
    pub(crate) on_exit: Option<LifecycleHook>,
    pub(crate) on_done: Option<LifecycleHook>,
    pub(crate) on_error: Option<ErrorHook>,
}

pub(crate) struct DevaInner {
    pub(crate) id: Uuid,
    pub(crate) agent: Option<AgentProfile>,
    pub(crate) inherited: RwLock<Inherited>,
    pub(crate) inherit: Vec<Inherit>,
    pub(crate) state: RwLock<State>,
    /// `Some(activation time)` while running.
    pub(crate) active: RwLock<Option<DateTime<Utc>>>,
    /// Set while a stop chain runs, so a concurrent stop resolves offline.
    pub(crate) stopping: AtomicBool,
    pub(crate) devas: DashMap<String, Deva>,
    pub(crate) methods: MethodTable,
    pub(crate) func: MethodTable,
    pub(crate) listeners: Vec<(String, AgentListener)>,
    pub(crate) modules: HashMap<String, Value>,
    pub(crate) vars: RwLock<Map<String, Value>>,
    pub(crate) extra: HashMap<String, Value>,
    pub(crate) hooks: Hooks,
    /// Subscriptions made by `init`, and the bus they were made on.
    pub(crate) wired: Mutex<Option<Wiring>>,
    /// Cancels outstanding remote asks when the agent stops.
    pub(crate) cancellation: RwLock<CancellationToken>,
    pub(crate) ask_timeout: Duration,
}

impl Drop for DevaInner {
    fn drop(&mut self) {
        if let Some(wiring) = self.wired.get_mut().take() {
            trace!(id = %self.id, count = wiring.subscriptions.len(), "detaching dropped agent");
            wiring.detach();
        }
    }
}

/// The subscriptions an agent holds on one bus.
pub(crate) struct Wiring {
    pub(crate) events: Bus,
    pub(crate) subscriptions: Vec<(String, ListenerId)>,
}

impl Wiring {
    /// Removes every subscription from the bus it was made on.
    pub(crate) fn detach(self) {
        for (topic, id) in self.subscriptions {
            self.events.ignore(&topic, id);
        }
    }
}

/// A composable, message-driven agent.
///
/// A `Deva` owns a method table, optional lifecycle hooks and any number of child
/// agents. It talks to other agents exclusively over its [`Bus`], which children
/// share with their parent. Cloning a `Deva` clones the handle, not the agent.
///
/// ```rust,ignore
/// use deva_reactive::prelude::*;
///
/// let deva = Deva::builder()
///     .agent(AgentProfile::new("echo", "Echo"))
///     .method("say", |_deva, packet: Packet| async move { Ok(Reply::text(packet.q.text)) })
///     .build();
/// deva.init(Value::Null).await?;
/// let packet = deva.question("!say hello", None).await?;
/// ```
#[derive(Clone)]
pub struct Deva {
    pub(crate) inner: Arc<DevaInner>,
}

assert_impl_all!(Deva: Send, Sync, Clone);

impl fmt::Debug for Deva {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deva")
            .field("id", &self.inner.id)
            .field("key", &self.key())
            .field("state", &self.state())
            .field("active", &self.active())
            .field("devas", &self.inner.devas.len())
            .finish_non_exhaustive()
    }
}

impl Talk for Deva {
    fn events(&self) -> Bus {
        self.inner.inherited.read().events.clone()
    }
}

impl Deva {
    /// Starts building an agent.
    #[must_use]
    pub fn builder() -> DevaBuilder {
        DevaBuilder::default()
    }

    /// The agent's unique id.
    #[inline]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// The key the agent is addressed by: its profile key, or its id without one.
    pub fn key(&self) -> String {
        self.inner
            .agent
            .as_ref()
            .map_or_else(|| self.inner.id.to_string(), |a| a.profile.key.clone())
    }

    /// The agent profile, including its text capabilities.
    pub fn agent(&self) -> Option<&AgentProfile> {
        self.inner.agent.as_ref()
    }

    /// The identity part of the agent profile.
    pub fn profile(&self) -> Option<Profile> {
        self.inner.agent.as_ref().map(|a| a.profile.clone())
    }

    /// The client profile, shared with children that inherit it.
    pub fn client(&self) -> Option<Profile> {
        self.inner.inherited.read().client.read().clone()
    }

    /// Replaces the client profile for every agent sharing it.
    pub fn set_client(&self, client: Option<Profile>) {
        let shared = self.inner.inherited.read().client.clone();
        *shared.write() = client;
    }

    /// A snapshot of the opaque agent configuration.
    pub fn config(&self) -> Value {
        self.inner.inherited.read().config.read().clone()
    }

    /// Replaces the agent configuration for every agent sharing it.
    pub fn set_config(&self, config: Value) {
        let shared = self.inner.inherited.read().config.clone();
        *shared.write() = config;
    }

    /// The current lifecycle state.
    pub fn state(&self) -> State {
        *self.inner.state.read()
    }

    /// When the agent became active, or `None` while inactive.
    pub fn active(&self) -> Option<DateTime<Utc>> {
        *self.inner.active.read()
    }

    /// Whether the agent is running.
    pub fn is_active(&self) -> bool {
        self.inner.active.read().is_some()
    }

    /// Keys of the direct children.
    pub fn children(&self) -> Vec<String> {
        self.inner.devas.iter().map(|e| e.key().clone()).collect()
    }

    /// A direct child by key.
    pub fn deva(&self, key: &str) -> Option<Self> {
        self.inner.devas.get(key).map(|e| e.value().clone())
    }

    /// A module table entry.
    pub fn module(&self, name: &str) -> Option<&Value> {
        self.inner.modules.get(name)
    }

    /// A scratch variable.
    pub fn var(&self, name: &str) -> Option<Value> {
        self.inner.vars.read().get(name).cloned()
    }

    /// Sets a scratch variable, returning the previous value.
    pub fn set_var(&self, name: &str, value: Value) -> Option<Value> {
        self.inner.vars.write().insert(name.to_string(), value)
    }

    /// A construction value with no dedicated field.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.inner.extra.get(key)
    }

    /// Whether `name` is in the method table.
    pub fn has_method(&self, name: &str) -> bool {
        self.inner.methods.contains_key(name)
    }

    /// Method names, sorted.
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn method(&self, name: &str) -> Option<MethodRef> {
        self.inner.methods.get(name).cloned()
    }

    pub(crate) fn downgrade(&self) -> Weak<DevaInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<DevaInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.inner.cancellation.read().clone()
    }
}

/// Runs `fut`, turning a panic into [`DevaError::Panic`].
pub(crate) async fn guarded<T>(
    name: &str,
    fut: impl Future<Output = T>,
) -> Result<T, DevaError> {
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(|payload| DevaError::Panic {
            name: name.to_string(),
            message: panic_message(payload.as_ref()),
        })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
