//! Shared infrastructure for deva agents.
//!
//! *   [`Bus`]: the synchronous publish/subscribe hub agents talk over.
//! *   [`DevaConfig`]: configuration loaded from XDG locations, exposed as [`CONFIG`].
//! *   [`Reply`]: what method handlers return.
//! *   [`Outcome`] and [`Done`]: what lifecycle and question operations resolve to.
//! *   [`topics`]: the topic naming scheme.

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

// --- Public Re-exports ---
pub use bus::{Bus, ListenerId};
pub use config::{DevaConfig, CONFIG};
pub use outcome::{Done, Outcome};
pub use reply::Reply;

// --- Crate-Internal Re-exports ---
pub use types::*;

// --- Submodules ---

/// Defines common type aliases.
mod types;

/// Defines the [`Bus`].
mod bus;
/// Defines the configuration system.
pub mod config;
/// Defines [`Outcome`] and [`Done`].
mod outcome;
/// Defines [`Reply`].
mod reply;
pub mod topics;
