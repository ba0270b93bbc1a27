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

//! Topic names used on the bus.
//!
//! Global topics carry notifications about every agent sharing the bus. Per-agent
//! topics are namespaced by the agent key: `<key>:<state>` triggers a lifecycle
//! operation and `<key>:ask:<packet id>` carries a correlated answer.

use crate::message::{PacketId, State};

/// Global topic for [`StateEvent`](crate::message::StateEvent)s.
pub const STATE: &str = "state";
/// Global topic for [`PromptEvent`](crate::message::PromptEvent)s.
pub const PROMPT: &str = "prompt";
/// Global topic for [`ErrorEvent`](crate::message::ErrorEvent)s.
pub const ERROR: &str = "error";

/// The dispatch topic `<key>:<state>`.
#[must_use]
pub fn state(key: &str, state: State) -> String {
    format!("{key}:{}", state.name())
}

/// The topic a remote agent receives questions on.
#[must_use]
pub fn ask(key: &str) -> String {
    state(key, State::Ask)
}

/// The topic the answer to packet `id` is published on.
#[must_use]
pub fn reply(key: &str, id: PacketId) -> String {
    format!("{key}:{}:{id}", State::Ask.name())
}
