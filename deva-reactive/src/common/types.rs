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

//! Type aliases shared across the crate.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::agent::Deva;
use crate::common::{Done, Outcome};
use crate::message::{BusMessage, DevaError, Packet};
use crate::traits::Method;

/// A pinned, boxed, sendable future.
pub type FutureBox<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A bus subscriber.
pub type Listener = Arc<dyn Fn(&BusMessage) + Send + Sync + 'static>;

/// A bus subscriber that receives the agent it was registered on.
pub type AgentListener = Arc<dyn Fn(&Deva, &BusMessage) + Send + Sync + 'static>;

/// A shared method handler.
pub type MethodRef = Arc<dyn Method>;

/// Named method handlers.
pub type MethodTable = HashMap<String, MethodRef>;

/// A value shared between a parent agent and the children inheriting it.
pub type Shared<T> = Arc<RwLock<T>>;

/// What every lifecycle operation resolves to.
pub type LifecycleResult = Result<Outcome<Done>, DevaError>;

/// A user-supplied lifecycle hook.
pub type LifecycleHook = Arc<dyn Fn(Deva, Value) -> FutureBox<LifecycleResult> + Send + Sync + 'static>;

/// A user-supplied error hook. Returning `Ok` marks the error as handled.
pub type ErrorHook =
    Arc<dyn Fn(&Deva, &DevaError, Option<&Packet>) -> Result<(), DevaError> + Send + Sync + 'static>;

/// A text transform applied with the owning agent.
pub type TextTransform = Arc<dyn Fn(&Deva, &str) -> String + Send + Sync + 'static>;

/// Wraps a value for sharing.
pub(crate) fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}
