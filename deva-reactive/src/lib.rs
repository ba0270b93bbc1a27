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

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Deva Reactive
//!
//! Composable, message-driven agents for Tokio. An agent ([`Deva`](prelude::Deva))
//! runs a small lifecycle state machine, answers questions from a table of named
//! async methods and talks to other agents only through a shared publish/subscribe
//! bus. Agents nest: a parent shares its bus, configuration, client profile and
//! function tables with its children and fans `init`/`stop` out to them.
//!
//! ## Key Concepts
//!
//! - **Agents (`Deva`)**: built with [`DevaBuilder`](prelude::DevaBuilder) from
//!   methods, lifecycle hooks and child agents.
//! - **Lifecycle**: `init → start → enter → done` and `stop → exit → done`. Every
//!   transition publishes a state event and a prompt event on the bus.
//! - **Bus (`Bus`)**: synchronous, topic-keyed publish/subscribe shared by reference
//!   between a parent and its children.
//! - **Question/ask protocol**: `question("#other method:param text")` publishes a
//!   [`Packet`](prelude::Packet) to another agent and awaits the answer correlated by
//!   packet id; `!method` and plain text are answered locally.
//! - **Errors**: failures run through a single funnel that publishes an error event
//!   and lets an `on_error` hook decide what happens next.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deva_reactive::prelude::*;
//!
//! let bus = Bus::new();
//! let echo = Deva::builder()
//!     .agent(AgentProfile::new("echo", "Echo"))
//!     .events(bus.clone())
//!     .method("say", |_deva, packet: Packet| async move { Ok(Reply::text(packet.q.text)) })
//!     .build();
//! let caller = Deva::builder()
//!     .agent(AgentProfile::new("caller", "Caller"))
//!     .events(bus)
//!     .build();
//! echo.init(Value::Null).await?;
//! caller.init(Value::Null).await?;
//! let answer = caller.question("#echo say hello", None).await?;
//! ```

/// Shared infrastructure: bus, configuration, replies and type aliases.
pub(crate) mod common;

/// Defines the agent and its operations.
pub(crate) mod agent;

/// Defines packets, states, bus events and errors.
pub(crate) mod message;

/// Defines the traits at the seams of an agent.
pub(crate) mod traits;

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## External Crates
/// *   [`async_trait::async_trait`](https://docs.rs/async-trait/latest/async_trait/attr.async_trait.html): The macro for implementing [`Method`](crate::traits::Method) on your own types.
/// *   [`serde_json::Value`]: The payload type threaded through lifecycle chains.
///
/// ## Core Types
/// *   [`crate::agent::Deva`]: The agent handle.
/// *   [`crate::agent::DevaBuilder`]: Builds agents.
/// *   [`crate::agent::AgentProfile`]: Agent identity plus text capabilities.
/// *   [`crate::agent::Inherit`]: Fields a parent shares with its children.
/// *   [`crate::common::Bus`]: The publish/subscribe hub.
/// *   [`crate::common::DevaConfig`]: Framework configuration.
/// *   [`crate::common::Outcome`] and [`crate::common::Done`]: Operation results.
/// *   [`crate::common::Reply`]: What method handlers return.
/// *   [`crate::message::Packet`]: The question/answer envelope.
/// *   [`crate::message::State`]: Lifecycle states.
/// *   [`crate::message::DevaError`]: Operation failures.
/// *   [`crate::traits::Method`] and [`crate::traits::Talk`]: Handler and bus-access traits.
pub mod prelude {
    // External crate re-exports
    pub use async_trait::async_trait;
    pub use serde_json::Value;

    // Core types
    pub use crate::agent::{AgentProfile, Deva, DevaBuilder, Inherit};
    pub use crate::common::topics;
    pub use crate::common::{
        AgentListener, Bus, DevaConfig, Done, ErrorHook, FutureBox, LifecycleHook,
        LifecycleResult, Listener, ListenerId, MethodRef, Outcome, Reply, TextTransform, CONFIG,
    };
    pub use crate::message::{
        Answer, AnswerMeta, BusMessage, DevaError, ErrorEvent, Packet, PacketId, Profile,
        PromptEvent, Question, QuestionMeta, State, StateEvent,
    };
    pub use crate::traits::{Method, Talk};
}
