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
//! Captures bus traffic for assertions.

use std::sync::Arc;

use deva_reactive::prelude::*;
use parking_lot::Mutex;

/// Records every message published on a set of topics, in delivery order.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<(String, BusMessage)>>>,
}

impl Recorder {
    /// Subscribes a recorder to each of `topics` on `bus`.
    pub fn attach(bus: &Bus, topics: &[&str]) -> Self {
        let recorder = Self::default();
        for topic in topics {
            let seen = recorder.seen.clone();
            let name = (*topic).to_string();
            bus.listen(topic, move |message| {
                seen.lock().push((name.clone(), message.clone()));
            });
        }
        recorder
    }

    /// Topics in delivery order.
    pub fn topics(&self) -> Vec<String> {
        self.seen.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Messages delivered on `topic`.
    pub fn on(&self, topic: &str) -> Vec<BusMessage> {
        self.seen
            .lock()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// States carried by `state` events.
    pub fn states(&self) -> Vec<State> {
        self.on(topics::STATE)
            .iter()
            .filter_map(|m| m.as_state().map(|e| e.state))
            .collect()
    }

    /// Texts carried by `prompt` events.
    pub fn prompts(&self) -> Vec<String> {
        self.on(topics::PROMPT)
            .iter()
            .filter_map(|m| m.as_prompt().map(|e| e.text.clone()))
            .collect()
    }

    /// Events delivered on `error`.
    pub fn errors(&self) -> Vec<ErrorEvent> {
        self.on(topics::ERROR)
            .iter()
            .filter_map(|m| m.as_error().cloned())
            .collect()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}
