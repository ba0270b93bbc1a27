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

use serde::{Deserialize, Serialize};

/// The lifecycle states a [`Deva`](crate::agent::Deva) moves through.
///
/// There is no transition table: any state may follow any other. Every transition
/// made through [`Deva::set_state`](crate::agent::Deva::set_state) publishes a `state`
/// event followed by a `prompt` notification on the agent's bus.
///
/// Each state has a lowercase [`name`](State::name), used as the topic segment in
/// `<agentKey>:<stateName>`, and an uppercase human-readable [`label`](State::label).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// Constructed but never started, or stopped.
    #[default]
    Offline,
    /// One-time wiring is running.
    Init,
    /// The agent was marked active.
    Start,
    /// The agent is shutting down.
    Stop,
    /// The agent entered its working state.
    Enter,
    /// The agent is leaving its working state.
    Exit,
    /// A lifecycle chain completed.
    Done,
    /// Waiting on an external party.
    Wait,
    /// Answering an inbound ask from another agent.
    Ask,
    /// Handling a question posed to this agent.
    Question,
    /// An answer has been produced.
    Answer,
    /// A failure passed through the error funnel.
    Error,
    /// A security capability is being exercised.
    Security,
    /// A recovery routine is running.
    Medic,
}

impl State {
    /// Every state, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::Offline,
        Self::Init,
        Self::Start,
        Self::Stop,
        Self::Enter,
        Self::Exit,
        Self::Done,
        Self::Wait,
        Self::Ask,
        Self::Question,
        Self::Answer,
        Self::Error,
        Self::Security,
        Self::Medic,
    ];

    /// The lowercase name used in bus topics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Init => "init",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Enter => "enter",
            Self::Exit => "exit",
            Self::Done => "done",
            Self::Wait => "wait",
            Self::Ask => "ask",
            Self::Question => "question",
            Self::Answer => "answer",
            Self::Error => "error",
            Self::Security => "security",
            Self::Medic => "medic",
        }
    }

    /// The uppercase label carried by `state` events and `prompt` notifications.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Offline => "OFFLINE",
            Self::Init => "INIT",
            Self::Start => "START",
            Self::Stop => "STOP",
            Self::Enter => "ENTER",
            Self::Exit => "EXIT",
            Self::Done => "DONE",
            Self::Wait => "WAIT",
            Self::Ask => "ASK",
            Self::Question => "QUESTION",
            Self::Answer => "ANSWER",
            Self::Error => "ERROR",
            Self::Security => "SECURITY",
            Self::Medic => "MEDIC",
        }
    }

    /// Whether a `<agentKey>:<stateName>` bus event maps onto an agent operation.
    ///
    /// Only these states get a dispatch listener during `init`.
    #[must_use]
    pub const fn is_dispatchable(self) -> bool {
        matches!(
            self,
            Self::Start
                | Self::Stop
                | Self::Enter
                | Self::Exit
                | Self::Done
                | Self::Ask
                | Self::Question
        )
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
