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

//! The question/ask protocol.
//!
//! `question` parses its text into a route. A question addressed to another agent
//! (`#key method:p1:p2 text`) is published on `<key>:ask` and answered on
//! `<key>:ask:<packet id>`. A command (`!method p1:p2 ...`) or plain text is
//! answered from the local method table.

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{instrument, trace};

use crate::agent::{guarded, Deva};
use crate::common::config::CONFIG;
use crate::common::{topics, MethodRef, Outcome, Reply};
use crate::message::{Answer, AnswerMeta, DevaError, Packet, Question, QuestionMeta, State};
use crate::traits::Talk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Parsed {
    route: Route,
    key: String,
    method: String,
    params: Vec<String>,
    text: String,
}

/// Splits question text into its route, target, method, params and payload.
fn parse(
    text: &str,
    own_key: &str,
    ask_char: char,
    cmd_char: char,
    default_method: &str,
) -> Parsed {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let first = tokens.first().copied().unwrap_or_default();

    let split_call = |token: &str| -> (String, Vec<String>) {
        let mut parts = token.split(':');
        let method = parts.next().filter(|m| !m.is_empty()).unwrap_or(default_method);
        (method.to_string(), parts.map(str::to_string).collect())
    };

    if let Some(key) = first.strip_prefix(ask_char) {
        let (method, params) = tokens
            .get(1)
            .copied()
            .map_or_else(|| (default_method.to_string(), Vec::new()), split_call);
        return Parsed {
            route: Route::Remote,
            key: key.to_string(),
            method,
            params,
            text: tokens.iter().skip(2).copied().collect::<Vec<_>>().join(" "),
        };
    }

    if let Some(method) = first.strip_prefix(cmd_char) {
        let method = if method.is_empty() { default_method } else { method };
        let params = tokens
            .get(1)
            .map(|t| t.split(':').map(str::to_string).collect())
            .unwrap_or_default();
        return Parsed {
            route: Route::Local,
            key: own_key.to_string(),
            method: method.to_string(),
            params,
            text: tokens.iter().skip(1).copied().collect::<Vec<_>>().join(" "),
        };
    }

    Parsed {
        route: Route::Local,
        key: own_key.to_string(),
        method: default_method.to_string(),
        params: Vec::new(),
        text: text.to_string(),
    }
}

impl Deva {
    /// Poses a question to this agent or, with the ask prefix, to another agent.
    ///
    /// The returned packet always carries an answer: the method's result, an
    /// "invalid method" notice, or the failure description when `on_error` handled a
    /// failure.
    ///
    /// # Errors
    ///
    /// *   [`DevaError::NoText`] for empty text, before any state change.
    /// *   The handler, timeout, cancellation or remote failure when `on_error` does not
    ///     handle it.
    #[instrument(skip(self, data), fields(key = %self.key()))]
    pub async fn question(
        &self,
        text: &str,
        data: Option<Value>,
    ) -> Result<Outcome<Packet>, DevaError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DevaError::NoText);
        }
        if !self.is_active() {
            return Ok(Outcome::Offline);
        }
        let orig = text.to_string();
        let text = self.parse(text);
        self.set_state(State::Question);

        let defaults = &CONFIG.defaults;
        let parsed = parse(
            &text,
            &self.key(),
            defaults.ask_char,
            defaults.cmd_char,
            &defaults.question_method,
        );
        trace!(
            route = ?parsed.route,
            target = %parsed.key,
            method = %parsed.method,
            "question parsed"
        );

        let packet = Packet::new(Question {
            agent: self.profile(),
            client: self.client(),
            meta: QuestionMeta {
                key: parsed.key,
                orig,
                method: parsed.method,
                params: parsed.params,
            },
            text: parsed.text,
            data,
            created: Utc::now(),
        });

        let answered = match parsed.route {
            Route::Remote => self.ask_remote(packet).await?,
            Route::Local => self.answer_local(packet).await?,
        };
        Ok(Outcome::Ready(answered))
    }

    /// Answers a packet published on this agent's ask topic.
    ///
    /// The answered packet is published on `<key>:ask:<packet id>` and returned.
    /// An unknown method is answered with an "invalid method" notice after yielding
    /// once. A failing handler is answered with an error-tagged packet before the
    /// failure reaches the error funnel.
    ///
    /// # Errors
    ///
    /// The handler's failure when `on_error` does not handle it.
    #[instrument(skip(self, packet), fields(key = %self.key(), id = %packet.id))]
    pub async fn ask(&self, packet: Packet) -> Result<Outcome<Packet>, DevaError> {
        if !self.is_active() {
            return Ok(Outcome::Offline);
        }
        self.set_state(State::Ask);
        let reply_topic = topics::reply(&self.key(), packet.id);
        let method = packet.q.meta.method.clone();

        let Some(handler) = self.method(&method) else {
            let invalid = self.invalid(packet);
            tokio::task::yield_now().await;
            self.talk(&reply_topic, invalid.clone());
            return Ok(Outcome::Ready(invalid));
        };

        match self.invoke(&method, handler, packet.clone()).await {
            Ok(reply) => {
                let answered = self.answered(packet, reply);
                self.talk(&reply_topic, answered.clone());
                Ok(Outcome::Ready(answered))
            }
            Err(err) => {
                let failed = self.failed(packet, &err);
                self.talk(&reply_topic, failed.clone());
                self.error(err, Some(&failed))?;
                Ok(Outcome::Ready(failed))
            }
        }
    }

    async fn answer_local(&self, packet: Packet) -> Result<Packet, DevaError> {
        let method = packet.q.meta.method.clone();
        let Some(handler) = self.method(&method) else {
            return Ok(self.invalid(packet));
        };
        match self.invoke(&method, handler, packet.clone()).await {
            Ok(reply) => {
                let answered = self.answered(packet, reply);
                self.set_state(State::Answer);
                Ok(answered)
            }
            Err(err) => {
                let failed = self.failed(packet, &err);
                self.error(err, Some(&failed))?;
                Ok(failed)
            }
        }
    }

    async fn ask_remote(&self, packet: Packet) -> Result<Packet, DevaError> {
        let key = packet.q.meta.key.clone();
        let id = packet.id;
        let events = self.events();
        let reply_topic = topics::reply(&key, id);

        // Subscribe before publishing so a prompt answer cannot be missed.
        let (tx, rx) = oneshot::channel::<Packet>();
        let tx = Mutex::new(Some(tx));
        let subscription = events.once(&reply_topic, move |message| {
            if let Some(answered) = message.as_packet() {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(answered.clone());
                }
            }
        });

        let ask_topic = topics::ask(&key);
        if events.talk(&ask_topic, packet.clone()) == 0 {
            events.ignore(&reply_topic, subscription);
            return self.fail(packet, DevaError::Unreachable { topic: ask_topic });
        }

        let token = self.cancellation();
        let timeout = self.inner.ask_timeout;
        let received = tokio::select! {
            answer = rx => answer.map_err(|_| DevaError::Remote {
                key: key.clone(),
                message: "reply subscription closed without a packet".to_string(),
            }),
            () = tokio::time::sleep(timeout) => Err(DevaError::Timeout {
                key: key.clone(),
                id,
                after: timeout,
            }),
            () = token.cancelled() => Err(DevaError::Cancelled { key: key.clone(), id }),
        };

        match received {
            Ok(answered) => match answered.a.as_ref().and_then(|a| a.error.clone()) {
                Some(message) => {
                    self.error(DevaError::Remote { key, message }, Some(&answered))?;
                    Ok(answered)
                }
                None => {
                    self.set_state(State::Answer);
                    Ok(answered)
                }
            },
            Err(err) => {
                events.ignore(&reply_topic, subscription);
                self.fail(packet, err)
            }
        }
    }

    /// Calls a handler with this agent as its receiver.
    pub(crate) async fn invoke(
        &self,
        method: &str,
        handler: MethodRef,
        packet: Packet,
    ) -> Result<Reply, DevaError> {
        match guarded(method, handler.call(self.clone(), packet)).await? {
            Ok(reply) => Ok(reply),
            Err(err) => Err(DevaError::Method {
                method: method.to_string(),
                message: format!("{err:#}"),
            }),
        }
    }

    /// Answers `packet` with `err` and funnels it.
    fn fail(&self, packet: Packet, err: DevaError) -> Result<Packet, DevaError> {
        let failed = self.failed(packet, &err);
        self.error(err, Some(&failed))?;
        Ok(failed)
    }

    fn answer_meta(&self, packet: &Packet) -> AnswerMeta {
        AnswerMeta {
            key: self.key(),
            method: packet.q.meta.method.clone(),
        }
    }

    fn answered(&self, mut packet: Packet, reply: Reply) -> Packet {
        let meta = self.answer_meta(&packet);
        packet.a = Some(Answer::from_reply(self.profile(), self.client(), meta, reply));
        packet
    }

    fn invalid(&self, packet: Packet) -> Packet {
        let text = format!("{} {}", packet.q.meta.method, CONFIG.messages.invalid_method);
        self.answered(packet, Reply::Text(text))
    }

    fn failed(&self, packet: Packet, err: &DevaError) -> Packet {
        let mut packet = self.answered(packet, Reply::Text(err.to_string()));
        if let Some(a) = packet.a.as_mut() {
            a.error = Some(err.to_string());
        }
        packet
    }
}
