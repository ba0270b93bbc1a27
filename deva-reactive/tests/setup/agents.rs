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
//! Reusable agents for the integration tests.

use std::time::Duration;

use anyhow::anyhow;
use deva_reactive::prelude::*;
use serde_json::json;

/// A profile whose name is the capitalized key.
pub fn profile(key: &str) -> AgentProfile {
    let mut name = key.to_string();
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    AgentProfile::new(key, name).with_prompt(format!("{key}>"))
}

/// Registers the methods every test agent answers.
///
/// *   `say`: answers with the question text.
/// *   `question`: the default method; answers `heard: <text>`.
/// *   `params`: answers with the parsed params joined by commas.
/// *   `rich`: answers with text, HTML and data.
/// *   `whoami`: answers with the key of the agent it runs on.
/// *   `hash`: the accumulator utility.
/// *   `fail`: returns an error.
/// *   `boom`: panics.
/// *   `slow`: answers after ten seconds.
pub fn with_test_methods(builder: &mut DevaBuilder) -> &mut DevaBuilder {
    builder
        .method("say", |_, packet: Packet| async move { Ok(Reply::text(packet.q.text)) })
        .method("question", |_, packet: Packet| async move {
            Ok(Reply::text(format!("heard: {}", packet.q.text)))
        })
        .method("params", |_, packet: Packet| async move {
            Ok(Reply::text(packet.q.meta.params.join(",")))
        })
        .method("rich", |_, _| async {
            Ok(Reply::from(json!({
                "text": "plain",
                "html": "<b>plain</b>",
                "data": {"answer": 42}
            })))
        })
        .method("whoami", |deva: Deva, _| async move { Ok(Reply::text(deva.key())) })
        .method("hash", |deva: Deva, packet: Packet| async move { Ok(deva.hash(&packet)) })
        .method("fail", fail)
        .method("boom", boom)
        .method("slow", |_, _| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Reply::text("finally"))
        })
}

async fn fail(_: Deva, _: Packet) -> anyhow::Result<Reply> {
    Err(anyhow!("the method failed"))
}

async fn boom(_: Deva, _: Packet) -> anyhow::Result<Reply> {
    panic!("the method blew up")
}

/// An agent on `bus` answering the test methods.
pub fn test_agent(key: &str, bus: &Bus) -> Deva {
    let mut builder = Deva::builder();
    builder.agent(profile(key)).events(bus.clone());
    with_test_methods(&mut builder).build()
}

/// A bus with the listener warning disabled.
pub fn test_bus() -> Bus {
    Bus::with_max_listeners(0)
}

/// Waits, yielding to other tasks, until `condition` holds or a second passes.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}
