//! Defines the traits at the seams of an agent.
//!
//! *   [`Method`]: a named handler invoked for a question. Implemented for async
//!     closures taking `(Deva, Packet)` and for any type that implements it directly.
//! *   [`Talk`]: bus access for anything that owns a [`Bus`](crate::common::Bus).

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
pub use method::Method;
pub use talk::Talk;

// --- Submodules ---

/// Defines the [`Method`] trait.
mod method;
/// Defines the [`Talk`] trait.
mod talk;
