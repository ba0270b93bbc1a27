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

use chrono::Utc;
use serde_json::Value;
use tracing::error;

use crate::agent::Deva;
use crate::common::config::CONFIG;
use crate::common::{topics, MethodRef, Outcome, Reply};
use crate::message::{DevaError, ErrorEvent, Packet, State};
use crate::traits::Talk;

const HASH_VAR: &str = "hash";

impl Deva {
    /// Reports when the agent became active, followed by `extra` if given.
    pub fn status(&self, extra: Option<&str>) -> Outcome<String> {
        let Some(active) = self.active() else {
            return Outcome::Offline;
        };
        let mut text = format!(
            "{} {}",
            CONFIG.messages.online,
            active.format(&CONFIG.formats.status_time)
        );
        if let Some(extra) = extra.filter(|e| !e.is_empty()) {
            text.push(' ');
            text.push_str(extra);
        }
        Outcome::Ready(text)
    }

    /// A small accumulator kept in the `hash` scratch variable.
    ///
    /// The first word of the question text selects the action: `clear` resets the
    /// accumulator to the configured marker, `add` appends the next word, anything
    /// else only reads it. The reply carries the accumulator as text and as HTML.
    pub fn hash(&self, packet: &Packet) -> Reply {
        let marker = &CONFIG.defaults.hash_marker;
        let mut words = packet.q.text.split_whitespace();
        let value = {
            let mut vars = self.inner.vars.write();
            let current = vars
                .get(HASH_VAR)
                .and_then(Value::as_str)
                .unwrap_or(marker.as_str())
                .to_string();
            let next = match words.next() {
                Some("clear") => Some(marker.clone()),
                Some("add") => Some(format!("{current}{}", words.next().unwrap_or_default())),
                _ => None,
            };
            match next {
                Some(next) => {
                    vars.insert(HASH_VAR.to_string(), Value::String(next.clone()));
                    next
                }
                None => current,
            }
        };
        let html = format!("<div class=\"hash\">{value}</div>");
        Reply::html(value, html)
    }

    /// The single path every failure takes.
    ///
    /// Moves to the `error` state and publishes an [`ErrorEvent`] on `error`. Then
    /// `on_error` decides: its result is returned. Without `on_error` the error is
    /// handed back as `Err`.
    ///
    /// # Errors
    ///
    /// Returns `err` unless `on_error` handled it.
    pub fn error(&self, err: DevaError, packet: Option<&Packet>) -> Result<(), DevaError> {
        error!(key = %self.key(), error = %err, "agent error");
        self.set_state(State::Error);
        self.talk(
            topics::ERROR,
            ErrorEvent {
                id: self.id(),
                agent: self.profile(),
                client: self.client(),
                error: err.to_string(),
                packet: packet.cloned(),
                created: Utc::now(),
            },
        );
        match self.inner.hooks.on_error.clone() {
            Some(hook) => hook(self, &err, packet),
            None => Err(err),
        }
    }

    /// Applies the profile's `translate` capability, or returns `text` unchanged.
    pub fn translate(&self, text: &str) -> String {
        match self.inner.agent.as_ref().and_then(|a| a.translate.clone()) {
            Some(translate) => translate(self, text),
            None => text.to_string(),
        }
    }

    /// Applies the profile's `parse` capability, or returns `text` unchanged.
    pub fn parse(&self, text: &str) -> String {
        match self.inner.agent.as_ref().and_then(|a| a.parse.clone()) {
            Some(parse) => parse(self, text),
            None => text.to_string(),
        }
    }

    /// Calls a private helper function with this agent as its receiver.
    ///
    /// # Errors
    ///
    /// A missing or failing function when `on_error` does not handle it.
    pub async fn func(&self, name: &str, packet: Packet) -> Result<Reply, DevaError> {
        let handler = self.inner.func.get(name).cloned();
        self.call_table("func", handler, name, packet).await
    }

    /// Calls a library function, possibly inherited, with this agent as its receiver.
    ///
    /// # Errors
    ///
    /// A missing or failing function when `on_error` does not handle it.
    pub async fn lib(&self, name: &str, packet: Packet) -> Result<Reply, DevaError> {
        let handler = self.inner.inherited.read().lib.read().get(name).cloned();
        self.call_table("lib", handler, name, packet).await
    }

    /// Calls a security function, possibly inherited, with this agent as its receiver.
    ///
    /// # Errors
    ///
    /// A missing or failing function when `on_error` does not handle it.
    pub async fn security(&self, name: &str, packet: Packet) -> Result<Reply, DevaError> {
        let handler = self.inner.inherited.read().security.read().get(name).cloned();
        self.call_table("security", handler, name, packet).await
    }

    async fn call_table(
        &self,
        table: &'static str,
        handler: Option<MethodRef>,
        name: &str,
        packet: Packet,
    ) -> Result<Reply, DevaError> {
        let result = match handler {
            Some(handler) => self.invoke(name, handler, packet.clone()).await,
            None => Err(DevaError::Missing {
                table,
                name: name.to_string(),
            }),
        };
        match result {
            Ok(reply) => Ok(reply),
            Err(err) => {
                let message = err.to_string();
                self.error(err, Some(&packet))?;
                Ok(Reply::Text(message))
            }
        }
    }
}
