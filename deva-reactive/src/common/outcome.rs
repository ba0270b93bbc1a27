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

use serde::Serialize;
use serde_json::Value;

use crate::common::config::CONFIG;
use crate::message::Profile;

/// The result of an operation that only runs on an active agent.
///
/// Invoking a lifecycle or question operation on an inactive agent is not a failure:
/// it resolves to [`Outcome::Offline`] and leaves the agent untouched. Displayed, an
/// offline outcome reads as the configured `messages.offline` notice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outcome<T> {
    /// The agent was inactive; nothing happened.
    Offline,
    /// The operation ran and produced a value.
    Ready(T),
}

impl<T> Outcome<T> {
    /// Whether the agent was inactive.
    #[inline]
    pub const fn is_offline(&self) -> bool {
        matches!(self, Self::Offline)
    }

    /// Whether the operation ran.
    #[inline]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Consumes the outcome, returning the value if the operation ran.
    #[inline]
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Offline => None,
        }
    }

    /// Borrows the value if the operation ran.
    #[inline]
    pub const fn as_ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Offline => None,
        }
    }

    /// The configured offline notice, or `None` when the operation ran.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            Self::Offline => Some(CONFIG.messages.offline.as_str()),
            Self::Ready(_) => None,
        }
    }

    /// Maps the ready value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Ready(value) => Outcome::Ready(f(value)),
            Self::Offline => Outcome::Offline,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => f.write_str(&CONFIG.messages.offline),
            Self::Ready(value) => value.fmt(f),
        }
    }
}

/// Final value of a lifecycle chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Done {
    /// Completion message.
    pub message: String,
    /// Profile of the completing agent.
    pub agent: Option<Profile>,
    /// The data threaded through the chain.
    pub data: Value,
}
