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

//! Parent/child composition: inheritance, dynamic load/unload and fan-out.

use futures::future::join_all;
use serde_json::Value;
use tracing::{instrument, trace};

use crate::agent::Deva;
use crate::common::config::CONFIG;
use crate::common::LifecycleResult;
use crate::message::DevaError;

/// A field a parent shares with its children.
///
/// Inherited fields are shared, not copied: after inheritance parent and child hold
/// the same bus, the same configuration and so on, and a change through either one
/// is seen by both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Inherit {
    /// The bus.
    Events,
    /// The opaque agent configuration.
    Config,
    /// The security function table.
    Security,
    /// The client profile.
    Client,
    /// The library function table.
    Lib,
}

impl Inherit {
    /// Every inheritable field.
    pub const ALL: [Self; 5] = [
        Self::Events,
        Self::Config,
        Self::Security,
        Self::Client,
        Self::Lib,
    ];
}

impl Deva {
    /// Shares this agent's inherited fields with every direct child.
    ///
    /// Runs as part of [`Deva::init`]; calling it again re-applies the sharing.
    pub fn inherit(&self) {
        for entry in &self.inner.devas {
            self.inherit_into(entry.value());
        }
    }

    fn inherit_into(&self, child: &Self) {
        if child.id() == self.id() {
            return;
        }
        let parent = self.inner.inherited.read().clone();
        {
            let mut inherited = child.inner.inherited.write();
            for field in &self.inner.inherit {
                match field {
                    Inherit::Events => inherited.events = parent.events.clone(),
                    Inherit::Config => inherited.config = parent.config.clone(),
                    Inherit::Security => inherited.security = parent.security.clone(),
                    Inherit::Client => inherited.client = parent.client.clone(),
                    Inherit::Lib => inherited.lib = parent.lib.clone(),
                }
            }
        }
        child.rewire();
        trace!(parent = %self.key(), child = %child.key(), "inherited");
    }

    /// Adds a child under its key, sharing the inherited fields with it at once.
    ///
    /// A child that was already initialized moves its subscriptions to the shared
    /// bus, so the parent can reach it without another `init`.
    ///
    /// Replaces any child already registered under that key. Returns the key.
    pub fn load(&self, child: Self) -> String {
        self.inherit_into(&child);
        let key = child.key();
        self.inner.devas.insert(key.clone(), child);
        key
    }

    /// Removes a child, returning it if it was registered.
    pub fn unload(&self, key: &str) -> Option<Self> {
        self.inner.devas.remove(key).map(|(_, child)| child)
    }

    /// Initializes every direct child concurrently.
    ///
    /// Every child chain runs to completion before the result is decided.
    ///
    /// # Errors
    ///
    /// Fails with a child failure once all children have settled. Nothing is
    /// reported for children that succeeded.
    #[instrument(skip(self, data), fields(key = %self.key()))]
    pub async fn init_devas(&self, data: Value) -> Result<String, DevaError> {
        let children = self.child_handles();
        let results = join_all(children.iter().map(|child| child.init(data.clone()))).await;
        settle(results)?;
        Ok(CONFIG.messages.devas_init.clone())
    }

    /// Stops every direct child concurrently.
    ///
    /// # Errors
    ///
    /// Fails with the first child failure once all children have settled.
    #[instrument(skip(self, data), fields(key = %self.key()))]
    pub async fn stop_devas(&self, data: Value) -> Result<String, DevaError> {
        let children = self.child_handles();
        let results = join_all(children.iter().map(|child| child.stop(data.clone()))).await;
        settle(results)?;
        Ok(CONFIG.messages.devas_stop.clone())
    }

    fn child_handles(&self) -> Vec<Self> {
        self.inner
            .devas
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

fn settle(results: Vec<LifecycleResult>) -> Result<(), DevaError> {
    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        trace!(failed, total = results.len(), "fan-out settled with failures");
    }
    results.into_iter().find_map(Result::err).map_or(Ok(()), Err)
}
