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

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::message::{Packet, Profile, State};

/// Published on the global `state` topic on every lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateEvent {
    /// Id of the transitioning agent.
    pub id: Uuid,
    /// Profile of the transitioning agent.
    pub agent: Option<Profile>,
    /// The new state.
    pub state: State,
    /// The new state's label.
    pub label: String,
    /// When the transition happened.
    pub created: DateTime<Utc>,
}

/// Published on the global `prompt` topic right after each [`StateEvent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptEvent {
    /// Id of the prompting agent.
    pub id: Uuid,
    /// Profile of the prompting agent.
    pub agent: Option<Profile>,
    /// Prompt text, after the agent's `translate` capability.
    pub text: String,
    /// When the prompt was emitted.
    pub created: DateTime<Utc>,
}

/// Published on the global `error` topic by the error funnel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEvent {
    /// Id of the failing agent.
    pub id: Uuid,
    /// Profile of the failing agent.
    pub agent: Option<Profile>,
    /// Client profile of the failing agent.
    pub client: Option<Profile>,
    /// The stringified error.
    pub error: String,
    /// The packet being processed when the failure happened.
    pub packet: Option<Packet>,
    /// When the failure was recorded.
    pub created: DateTime<Utc>,
}

/// Payload carried by a bus delivery.
///
/// `talk` without a payload delivers [`BusMessage::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BusMessage {
    /// No payload.
    #[default]
    Empty,
    /// A question/answer packet.
    Packet(Packet),
    /// A lifecycle transition.
    State(StateEvent),
    /// A prompt notification.
    Prompt(PromptEvent),
    /// An error report.
    Error(ErrorEvent),
    /// Plain text, e.g. a question posted on `<agentKey>:question`.
    Text(String),
    /// Free-form JSON, e.g. lifecycle data posted on `<agentKey>:start`.
    Value(Value),
}

impl BusMessage {
    /// The packet payload, if any.
    #[must_use]
    pub const fn as_packet(&self) -> Option<&Packet> {
        match self {
            Self::Packet(packet) => Some(packet),
            _ => None,
        }
    }

    /// The state event payload, if any.
    #[must_use]
    pub const fn as_state(&self) -> Option<&StateEvent> {
        match self {
            Self::State(event) => Some(event),
            _ => None,
        }
    }

    /// The prompt payload, if any.
    #[must_use]
    pub const fn as_prompt(&self) -> Option<&PromptEvent> {
        match self {
            Self::Prompt(event) => Some(event),
            _ => None,
        }
    }

    /// The error payload, if any.
    #[must_use]
    pub const fn as_error(&self) -> Option<&ErrorEvent> {
        match self {
            Self::Error(event) => Some(event),
            _ => None,
        }
    }

    /// Text payload, falling back to a packet's question text.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Packet(packet) => Some(&packet.q.text),
            Self::Value(Value::String(text)) => Some(text),
            _ => None,
        }
    }

    /// The payload as lifecycle data. Anything that is not JSON becomes `null`.
    #[must_use]
    pub fn data(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Text(text) => Value::String(text.clone()),
            _ => Value::Null,
        }
    }
}

impl From<Packet> for BusMessage {
    fn from(packet: Packet) -> Self {
        Self::Packet(packet)
    }
}

impl From<StateEvent> for BusMessage {
    fn from(event: StateEvent) -> Self {
        Self::State(event)
    }
}

impl From<PromptEvent> for BusMessage {
    fn from(event: PromptEvent) -> Self {
        Self::Prompt(event)
    }
}

impl From<ErrorEvent> for BusMessage {
    fn from(event: ErrorEvent) -> Self {
        Self::Error(event)
    }
}

impl From<String> for BusMessage {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for BusMessage {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Value> for BusMessage {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<()> for BusMessage {
    fn from((): ()) -> Self {
        Self::Empty
    }
}
