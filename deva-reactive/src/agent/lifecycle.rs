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

//! The lifecycle chain: `init → start → enter → done` and `stop → exit → done`.

use std::sync::atomic::Ordering;

use chrono::Utc;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, trace, warn};

use crate::agent::{guarded, Deva, Wiring};
use crate::common::config::CONFIG;
use crate::common::{topics, Done, LifecycleHook, LifecycleResult, Outcome};
use crate::message::{BusMessage, DevaError, Packet, PromptEvent, State, StateEvent};
use crate::traits::Talk;

impl Deva {
    /// Initializes the agent once and runs the start chain.
    ///
    /// In order: children receive the inherited fields, the agent subscribes its
    /// dispatch listeners (`<key>:start`, `<key>:ask`, ...) and any declared
    /// listeners, the state becomes `init`, and then `on_init` runs or the chain
    /// continues with [`Deva::start`]. Subscriptions are made on the first call and
    /// made again only when the agent's bus has changed since.
    ///
    /// # Errors
    ///
    /// Returns the error of a failing hook that `on_error` did not handle.
    #[instrument(skip(self, data), fields(key = %self.key()))]
    pub async fn init(&self, data: Value) -> LifecycleResult {
        self.inherit();
        self.wire();
        self.set_state(State::Init);
        match self.inner.hooks.on_init.clone() {
            Some(hook) => self.run_hook("on_init", hook, data).await,
            None => self.start(data).await,
        }
    }

    /// Marks the agent active and continues with `on_start` or [`Deva::enter`].
    ///
    /// Resolves to [`Outcome::Offline`] without side effects when already active, so
    /// a second call neither moves the activation time nor reruns `on_start`.
    ///
    /// # Errors
    ///
    /// Returns the error of a failing hook that `on_error` did not handle.
    #[instrument(skip(self, data), fields(key = %self.key()))]
    pub async fn start(&self, data: Value) -> LifecycleResult {
        {
            let mut active = self.inner.active.write();
            if active.is_some() {
                return Ok(Outcome::Offline);
            }
            *active = Some(Utc::now());
        }
        *self.inner.cancellation.write() = CancellationToken::new();
        self.set_state(State::Start);
        match self.inner.hooks.on_start.clone() {
            Some(hook) => self.run_hook("on_start", hook, data).await,
            None => self.enter(data).await,
        }
    }

    /// Stops the agent and continues with `on_stop` or [`Deva::exit`].
    ///
    /// Outstanding remote questions are cancelled first. The agent stays active
    /// until the rest of the chain has run, then becomes inactive. A stop that
    /// arrives while another is still running resolves to [`Outcome::Offline`].
    ///
    /// # Errors
    ///
    /// Returns the error of a failing hook that `on_error` did not handle.
    #[instrument(skip(self, data), fields(key = %self.key()))]
    pub async fn stop(&self, data: Value) -> LifecycleResult {
        {
            let active = self.inner.active.read();
            if active.is_none() || self.inner.stopping.swap(true, Ordering::AcqRel) {
                return Ok(Outcome::Offline);
            }
        }
        self.cancellation().cancel();
        self.set_state(State::Stop);
        let result = match self.inner.hooks.on_stop.clone() {
            Some(hook) => self.run_hook("on_stop", hook, data).await,
            None => self.exit(data).await,
        };
        *self.inner.active.write() = None;
        self.inner.stopping.store(false, Ordering::Release);
        result
    }

    /// Continues with `on_enter` or [`Deva::done`].
    ///
    /// # Errors
    ///
    /// Returns the error of a failing hook that `on_error` did not handle.
    pub async fn enter(&self, data: Value) -> LifecycleResult {
        if !self.is_active() {
            return Ok(Outcome::Offline);
        }
        self.set_state(State::Enter);
        match self.inner.hooks.on_enter.clone() {
            Some(hook) => self.run_hook("on_enter", hook, data).await,
            None => self.done(data).await,
        }
    }

    /// Continues with `on_exit` or [`Deva::done`].
    ///
    /// # Errors
    ///
    /// Returns the error of a failing hook that `on_error` did not handle.
    pub async fn exit(&self, data: Value) -> LifecycleResult {
        if !self.is_active() {
            return Ok(Outcome::Offline);
        }
        self.set_state(State::Exit);
        match self.inner.hooks.on_exit.clone() {
            Some(hook) => self.run_hook("on_exit", hook, data).await,
            None => self.done(data).await,
        }
    }

    /// Ends a chain with `on_done`, or with a [`Done`] carrying `data`.
    ///
    /// # Errors
    ///
    /// Returns the error of a failing hook that `on_error` did not handle.
    pub async fn done(&self, data: Value) -> LifecycleResult {
        if !self.is_active() {
            return Ok(Outcome::Offline);
        }
        self.set_state(State::Done);
        match self.inner.hooks.on_done.clone() {
            Some(hook) => self.run_hook("on_done", hook, data).await,
            None => Ok(Outcome::Ready(Done {
                message: CONFIG.messages.done.clone(),
                agent: self.profile(),
                data,
            })),
        }
    }

    /// Moves to `state`, then publishes a [`StateEvent`] on `state` and a
    /// [`PromptEvent`] on `prompt`, in that order.
    ///
    /// No transition is forbidden.
    pub fn set_state(&self, state: State) {
        *self.inner.state.write() = state;
        trace!(key = %self.key(), %state, "state transition");
        self.talk(
            topics::STATE,
            StateEvent {
                id: self.id(),
                agent: self.profile(),
                state,
                label: state.label().to_string(),
                created: Utc::now(),
            },
        );
        self.prompt(state.label());
    }

    /// Publishes `text`, after `translate`, as a [`PromptEvent`].
    pub fn prompt(&self, text: &str) {
        let text = self.translate(text);
        self.talk(
            topics::PROMPT,
            PromptEvent {
                id: self.id(),
                agent: self.profile(),
                text,
                created: Utc::now(),
            },
        );
    }

    async fn run_hook(
        &self,
        name: &'static str,
        hook: LifecycleHook,
        data: Value,
    ) -> LifecycleResult {
        match guarded(name, hook(self.clone(), data)).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(err)) | Err(err) => self.recover(err, None),
        }
    }

    /// Funnels `err`; when `on_error` handles it the chain resolves with its text.
    pub(crate) fn recover(&self, err: DevaError, packet: Option<&Packet>) -> LifecycleResult {
        let message = err.to_string();
        self.error(err, packet)?;
        Ok(Outcome::Ready(Done {
            message,
            agent: self.profile(),
            data: Value::Null,
        }))
    }

    /// Subscribes the dispatch listeners and declared listeners on the current bus.
    ///
    /// Does nothing when already wired to that bus. Subscriptions left on a previous
    /// bus are removed first.
    fn wire(&self) {
        let key = self.key();
        let events = self.events();
        let mut wired = self.inner.wired.lock();
        if wired.as_ref().is_some_and(|w| w.events.is_same(&events)) {
            return;
        }
        if let Some(stale) = wired.take() {
            trace!(key = %key, "bus changed, moving listeners");
            stale.detach();
        }

        let mut subscriptions = Vec::new();
        for state in State::ALL.into_iter().filter(|s| s.is_dispatchable()) {
            let topic = topics::state(&key, state);
            let weak = self.downgrade();
            let id = events.listen(&topic, move |message| {
                if let Some(deva) = Self::upgrade(&weak) {
                    deva.dispatch(state, message);
                }
            });
            subscriptions.push((topic, id));
        }

        for (topic, listener) in &self.inner.listeners {
            let weak = self.downgrade();
            let listener = listener.clone();
            let id = events.listen(topic, move |message| {
                if let Some(deva) = Self::upgrade(&weak) {
                    listener(&deva, message);
                }
            });
            subscriptions.push((topic.clone(), id));
        }
        trace!(key = %key, count = subscriptions.len(), "listeners wired");
        *wired = Some(Wiring {
            events,
            subscriptions,
        });
    }

    /// Follows a bus change made by inheritance, if the agent was wired before.
    pub(crate) fn rewire(&self) {
        let wired = self.inner.wired.lock().is_some();
        if wired {
            self.wire();
        }
    }

    /// Runs the operation named by a dispatch topic on the current runtime.
    fn dispatch(&self, state: State, message: &BusMessage) {
        let Ok(handle) = Handle::try_current() else {
            warn!(key = %self.key(), %state, "dispatch outside a tokio runtime dropped");
            return;
        };
        let deva = self.clone();
        let message = message.clone();
        handle.spawn(async move {
            let result = match state {
                State::Start => deva.start(message.data()).await.map(drop),
                State::Stop => deva.stop(message.data()).await.map(drop),
                State::Enter => deva.enter(message.data()).await.map(drop),
                State::Exit => deva.exit(message.data()).await.map(drop),
                State::Done => deva.done(message.data()).await.map(drop),
                State::Ask => match message.as_packet() {
                    Some(packet) => deva.ask(packet.clone()).await.map(drop),
                    None => {
                        warn!(key = %deva.key(), "ask dispatch without a packet ignored");
                        Ok(())
                    }
                },
                State::Question => match message.text() {
                    Some(text) => deva.question(text, None).await.map(drop),
                    None => Err(DevaError::NoText),
                },
                _ => Ok(()),
            };
            if let Err(err) = result {
                trace!(key = %deva.key(), %state, error = %err, "dispatched operation failed");
            }
        });
    }
}
