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

//! The request/response envelope exchanged between agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::common::Reply;

/// Correlates a question with its eventual answer.
pub type PacketId = Uuid;

/// Identity data for an agent or a client, as carried inside packets and events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The key agents are addressed by on the bus.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Prompt string shown alongside the agent's output.
    pub prompt: String,
}

impl Profile {
    /// Creates a profile with an empty prompt.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            prompt: String::new(),
        }
    }

    /// Sets the prompt string.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

/// Routing data for the question side of a [`Packet`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionMeta {
    /// Key of the agent the question is addressed to.
    pub key: String,
    /// The original, unparsed question text.
    pub orig: String,
    /// Name of the method to invoke on the target.
    pub method: String,
    /// Colon-delimited parameters parsed from the question.
    pub params: Vec<String>,
}

/// The question side of a [`Packet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Profile of the asking agent.
    pub agent: Option<Profile>,
    /// Profile of the client on whose behalf the agent asks.
    pub client: Option<Profile>,
    /// Routing data.
    pub meta: QuestionMeta,
    /// Free text left after the routing tokens were parsed off.
    pub text: String,
    /// Arbitrary payload supplied by the caller.
    pub data: Option<Value>,
    /// When the question was created.
    pub created: DateTime<Utc>,
}

/// Routing data for the answer side of a [`Packet`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerMeta {
    /// Key of the answering agent.
    pub key: String,
    /// The method that produced the answer.
    pub method: String,
}

/// The answer side of a [`Packet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Profile of the answering agent.
    pub agent: Option<Profile>,
    /// Client profile of the answering agent.
    pub client: Option<Profile>,
    /// Routing data.
    pub meta: AnswerMeta,
    /// Answer text.
    pub text: String,
    /// Optional HTML rendering of the answer.
    pub html: Option<String>,
    /// Optional structured answer data.
    pub data: Option<Value>,
    /// Set when the answer describes a failure rather than a result.
    pub error: Option<String>,
    /// When the answer was created.
    pub created: DateTime<Utc>,
}

impl Answer {
    /// Builds an answer from a method's [`Reply`].
    pub fn from_reply(
        agent: Option<Profile>,
        client: Option<Profile>,
        meta: AnswerMeta,
        reply: Reply,
    ) -> Self {
        let (text, html, data) = reply.into_parts();
        Self {
            agent,
            client,
            meta,
            text,
            html,
            data,
            error: None,
            created: Utc::now(),
        }
    }

    /// Whether this answer is error-tagged.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// The request/response envelope of the question/ask protocol.
///
/// A packet is created per call to `question` and lives only for one request/response
/// cycle. The answer side starts empty and is always populated before the packet is
/// handed back to a caller, failures included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Unique id correlating question and answer.
    pub id: PacketId,
    /// The question side.
    pub q: Question,
    /// The answer side, once produced.
    pub a: Option<Answer>,
}

impl Packet {
    /// Wraps a question in a packet with a freshly generated id.
    #[must_use]
    pub fn new(q: Question) -> Self {
        Self {
            id: Uuid::new_v4(),
            q,
            a: None,
        }
    }

    /// Whether an answer has been attached.
    #[must_use]
    pub const fn is_answered(&self) -> bool {
        self.a.is_some()
    }

    /// Answer text, or an empty string while unanswered.
    #[must_use]
    pub fn answer_text(&self) -> &str {
        self.a.as_ref().map_or("", |a| a.text.as_str())
    }
}
