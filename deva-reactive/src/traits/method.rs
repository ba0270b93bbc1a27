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

use std::future::Future;

use async_trait::async_trait;

use crate::agent::Deva;
use crate::common::Reply;
use crate::message::Packet;

/// A handler invoked when a question names it.
///
/// Handlers receive the agent that owns them and the packet being answered. They are
/// always called with the owning agent, even when they were registered on a parent
/// and inherited.
#[async_trait]
pub trait Method: Send + Sync + 'static {
    /// Produces the answer for `packet`.
    async fn call(&self, deva: Deva, packet: Packet) -> anyhow::Result<Reply>;
}

#[async_trait]
impl<F, Fut> Method for F
where
    F: Fn(Deva, Packet) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Reply>> + Send + 'static,
{
    async fn call(&self, deva: Deva, packet: Packet) -> anyhow::Result<Reply> {
        self(deva, packet).await
    }
}
