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

use crate::common::{Bus, ListenerId};
use crate::message::BusMessage;

/// Access to the bus an agent talks over.
///
/// Only [`Talk::events`] needs implementing; the remaining methods forward to it.
pub trait Talk {
    /// The bus handle.
    fn events(&self) -> Bus;

    /// Publishes on `topic`, returning the number of listeners reached.
    fn talk(&self, topic: &str, message: impl Into<BusMessage>) -> usize {
        self.events().talk(topic, message)
    }

    /// Subscribes to every message on `topic`.
    fn listen<F>(&self, topic: &str, listener: F) -> ListenerId
    where
        F: Fn(&BusMessage) + Send + Sync + 'static,
    {
        self.events().listen(topic, listener)
    }

    /// Subscribes to the next message on `topic`.
    fn once<F>(&self, topic: &str, listener: F) -> ListenerId
    where
        F: Fn(&BusMessage) + Send + Sync + 'static,
    {
        self.events().once(topic, listener)
    }

    /// Removes a subscription made through [`Talk::listen`] or [`Talk::once`].
    fn ignore(&self, topic: &str, id: ListenerId) -> bool {
        self.events().ignore(topic, id)
    }
}
