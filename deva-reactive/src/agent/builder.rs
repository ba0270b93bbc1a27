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

use std::collections::HashMap;
use std::future::Future;
use std::mem;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agent::{AgentProfile, Deva, DevaInner, Hooks, Inherit, Inherited};
use crate::common::config::CONFIG;
use crate::common::{
    shared, AgentListener, Bus, FutureBox, LifecycleHook, LifecycleResult, MethodRef,
    MethodTable, Reply,
};
use crate::message::{BusMessage, DevaError, Packet, Profile, State};
use crate::traits::Method;

/// Collects everything an agent is made of before it exists.
///
/// Each setter returns `&mut Self` so calls chain; [`DevaBuilder::build`] takes the
/// collected parts and leaves the builder empty.
#[derive(Default)]
pub struct DevaBuilder {
    agent: Option<AgentProfile>,
    client: Option<Profile>,
    config: Option<Value>,
    events: Option<Bus>,
    max_listeners: Option<usize>,
    ask_timeout: Option<Duration>,
    methods: MethodTable,
    func: MethodTable,
    lib: MethodTable,
    security: MethodTable,
    devas: Vec<Deva>,
    vars: Map<String, Value>,
    listeners: Vec<(String, AgentListener)>,
    modules: HashMap<String, Value>,
    inherit: Option<Vec<Inherit>>,
    extra: HashMap<String, Value>,
    hooks: Hooks,
}

fn boxed_method<F, Fut>(f: F) -> MethodRef
where
    F: Fn(Deva, Packet) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Reply>> + Send + 'static,
{
    Arc::new(f)
}

fn boxed_hook<F, Fut>(f: F) -> LifecycleHook
where
    F: Fn(Deva, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LifecycleResult> + Send + 'static,
{
    Arc::new(move |deva: Deva, data: Value| -> FutureBox<LifecycleResult> {
        Box::pin(f(deva, data))
    })
}

impl DevaBuilder {
    /// Sets the agent profile. Without one the agent is keyed by its id.
    pub fn agent(&mut self, agent: AgentProfile) -> &mut Self {
        self.agent = Some(agent);
        self
    }

    /// Sets the client profile.
    pub fn client(&mut self, client: Profile) -> &mut Self {
        self.client = Some(client);
        self
    }

    /// Sets the opaque agent configuration.
    pub fn config(&mut self, config: Value) -> &mut Self {
        self.config = Some(config);
        self
    }

    /// Uses an existing bus instead of creating one.
    pub fn events(&mut self, events: Bus) -> &mut Self {
        self.events = Some(events);
        self
    }

    /// Sets the listener limit of the bus this agent ends up on.
    pub fn max_listeners(&mut self, max: usize) -> &mut Self {
        self.max_listeners = Some(max);
        self
    }

    /// Overrides how long remote questions wait for an answer.
    pub fn ask_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.ask_timeout = Some(timeout);
        self
    }

    /// Registers an async closure as a method.
    pub fn method<F, Fut>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(Deva, Packet) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Reply>> + Send + 'static,
    {
        self.methods.insert(name.to_string(), boxed_method(f));
        self
    }

    /// Registers a [`Method`] implementation as a method.
    pub fn handler(&mut self, name: &str, handler: impl Method) -> &mut Self {
        self.methods.insert(name.to_string(), Arc::new(handler));
        self
    }

    /// Adds a private helper function.
    pub fn func<F, Fut>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(Deva, Packet) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Reply>> + Send + 'static,
    {
        self.func.insert(name.to_string(), boxed_method(f));
        self
    }

    /// Adds a library function. Children inheriting [`Inherit::Lib`] share it.
    pub fn lib<F, Fut>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(Deva, Packet) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Reply>> + Send + 'static,
    {
        self.lib.insert(name.to_string(), boxed_method(f));
        self
    }

    /// Adds a security function. Children inheriting [`Inherit::Security`] share it.
    pub fn security<F, Fut>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(Deva, Packet) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Reply>> + Send + 'static,
    {
        self.security.insert(name.to_string(), boxed_method(f));
        self
    }

    /// Adds a child agent. Later children replace earlier ones with the same key.
    pub fn deva(&mut self, child: Deva) -> &mut Self {
        self.devas.push(child);
        self
    }

    /// Seeds a scratch variable.
    pub fn var(&mut self, name: &str, value: Value) -> &mut Self {
        self.vars.insert(name.to_string(), value);
        self
    }

    /// Subscribes `listener` to `topic` when the agent initializes.
    pub fn listener<F>(&mut self, topic: &str, listener: F) -> &mut Self
    where
        F: Fn(&Deva, &BusMessage) + Send + Sync + 'static,
    {
        self.listeners.push((topic.to_string(), Arc::new(listener)));
        self
    }

    /// Adds a module table entry.
    pub fn module(&mut self, name: &str, value: Value) -> &mut Self {
        self.modules.insert(name.to_string(), value);
        self
    }

    /// Replaces the list of fields children inherit. Defaults to [`Inherit::ALL`].
    pub fn inherit(&mut self, fields: &[Inherit]) -> &mut Self {
        self.inherit = Some(fields.to_vec());
        self
    }

    /// Stores a value with no dedicated field.
    pub fn set(&mut self, key: &str, value: Value) -> &mut Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Replaces the `init` step. Without it `init` continues with `start`.
    pub fn on_init<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Deva, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        self.hooks.on_init = Some(boxed_hook(f));
        self
    }

    /// Replaces the `start` step. Without it `start` continues with `enter`.
    pub fn on_start<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Deva, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        self.hooks.on_start = Some(boxed_hook(f));
        self
    }

    /// Replaces the `stop` step. Without it `stop` continues with `exit`.
    pub fn on_stop<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Deva, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        self.hooks.on_stop = Some(boxed_hook(f));
        self
    }

    /// Replaces the `enter` step. Without it `enter` continues with `done`.
    pub fn on_enter<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Deva, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        self.hooks.on_enter = Some(boxed_hook(f));
        self
    }

    /// Replaces the `exit` step. Without it `exit` continues with `done`.
    pub fn on_exit<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Deva, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        self.hooks.on_exit = Some(boxed_hook(f));
        self
    }

    /// Replaces the `done` step.
    pub fn on_done<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Deva, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        self.hooks.on_done = Some(boxed_hook(f));
        self
    }

    /// Handles errors reaching the error funnel. Returning `Ok` marks them handled.
    pub fn on_error<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Deva, &DevaError, Option<&Packet>) -> Result<(), DevaError> + Send + Sync + 'static,
    {
        self.hooks.on_error = Some(Arc::new(f));
        self
    }

    /// Creates the agent, leaving this builder empty.
    ///
    /// Children are registered under their keys but inherit nothing until
    /// [`Deva::init`] runs.
    pub fn build(&mut self) -> Deva {
        let parts = mem::take(self);

        let events = parts.events.unwrap_or_else(Bus::new);
        if let Some(max) = parts.max_listeners {
            events.set_max_listeners(max);
        }

        let devas = DashMap::new();
        for child in parts.devas {
            devas.insert(child.key(), child);
        }

        let inner = DevaInner {
            id: Uuid::new_v4(),
            agent: parts.agent,
            inherited: RwLock::new(Inherited {
                events,
                config: shared(parts.config.unwrap_or(Value::Null)),
                security: shared(parts.security),
                client: shared(parts.client),
                lib: shared(parts.lib),
            }),
            inherit: parts.inherit.unwrap_or_else(|| Inherit::ALL.to_vec()),
            state: RwLock::new(State::default()),
            active: RwLock::new(None),
            stopping: AtomicBool::new(false),
            devas,
            methods: parts.methods,
            func: parts.func,
            listeners: parts.listeners,
            modules: parts.modules,
            vars: RwLock::new(parts.vars),
            extra: parts.extra,
            hooks: parts.hooks,
            wired: Mutex::new(None),
            cancellation: RwLock::new(CancellationToken::new()),
            ask_timeout: parts.ask_timeout.unwrap_or_else(|| CONFIG.ask_timeout()),
        };
        Deva {
            inner: Arc::new(inner),
        }
    }
}
