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

//! Defines the data exchanged over the bus.
//!
//! *   [`Packet`]: the id-correlated question/answer envelope, with its
//!     [`Question`] and [`Answer`] sides.
//! *   [`State`]: the lifecycle states and their labels.
//! *   [`BusMessage`]: the payload of every bus delivery, wrapping packets and the
//!     [`StateEvent`], [`PromptEvent`] and [`ErrorEvent`] notifications.
//! *   [`DevaError`]: the failures agent operations can surface.

// --- Public Re-exports ---
pub use deva_error::DevaError;
pub use events::{BusMessage, ErrorEvent, PromptEvent, StateEvent};
pub use packet::{Answer, AnswerMeta, Packet, PacketId, Profile, Question, QuestionMeta};
pub use state::State;

// --- Submodules ---

/// Defines [`DevaError`].
mod deva_error;
/// Defines [`BusMessage`] and the global event payloads.
mod events;
/// Defines [`Packet`] and its parts.
mod packet;
/// Defines [`State`].
mod state;
