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
use std::time::Duration;

use thiserror::Error;

use crate::common::config::CONFIG;
use crate::message::PacketId;

/// Failures surfaced by agent operations.
///
/// Expected conditions such as an inactive agent or an unknown method are not errors:
/// they resolve as [`Outcome::Offline`](crate::common::Outcome::Offline) or as an
/// answered packet. Everything here, except [`DevaError::NoText`], has passed through
/// the agent's error funnel by the time a caller sees it.
#[derive(Debug, Error)]
pub enum DevaError {
    /// A question was posed with empty text.
    #[error("{}", CONFIG.messages.no_text)]
    NoText,
    /// A method handler returned an error.
    #[error("method `{method}` failed: {message}")]
    Method {
        /// The failing method.
        method: String,
        /// The handler's error, including its cause chain.
        message: String,
    },
    /// A handler or hook panicked.
    #[error("`{name}` panicked: {message}")]
    Panic {
        /// The method or hook that panicked.
        name: String,
        /// The panic payload, if it was a string.
        message: String,
    },
    /// The remote agent answered with an error-tagged packet.
    #[error("agent `{key}` answered with an error: {message}")]
    Remote {
        /// Key of the answering agent.
        key: String,
        /// The error carried by the answer.
        message: String,
    },
    /// Nothing was subscribed to the remote agent's ask topic.
    #[error("no agent is listening on `{topic}`")]
    Unreachable {
        /// The ask topic that had no listener.
        topic: String,
    },
    /// No correlated answer arrived in time.
    #[error("no answer from `{key}` for packet {id} after {after:?}")]
    Timeout {
        /// Key of the silent agent.
        key: String,
        /// The unanswered packet.
        id: PacketId,
        /// How long the caller waited.
        after: Duration,
    },
    /// The asking agent stopped while waiting for an answer.
    #[error("ask to `{key}` for packet {id} was cancelled")]
    Cancelled {
        /// Key of the agent that was asked.
        key: String,
        /// The abandoned packet.
        id: PacketId,
    },
    /// A named function is missing from one of the agent's function tables.
    #[error("`{name}` is not in the {table} table")]
    Missing {
        /// Which table was searched.
        table: &'static str,
        /// The missing function.
        name: String,
    },
    /// A lifecycle hook failed.
    #[error("hook `{hook}` failed: {message}")]
    Hook {
        /// The failing hook.
        hook: &'static str,
        /// The failure description.
        message: String,
    },
    /// Any other failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DevaError {
    /// Builds a [`DevaError::Hook`] from anything displayable.
    pub fn hook(hook: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Hook {
            hook,
            message: message.to_string(),
        }
    }
}
