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

use deva_reactive::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // agents that should reach each other share one bus
    let bus = Bus::new();

    let echo = Deva::builder()
        .agent(AgentProfile::new("echo", "Echo").with_prompt("echo>"))
        .events(bus.clone())
        .method("say", |_deva, packet: Packet| async move {
            Ok(Reply::text(packet.q.text))
        })
        .method("shout", |deva: Deva, packet: Packet| async move {
            let text = packet.q.text.to_uppercase();
            let html = format!("<strong>{text}</strong>");
            println!("{} is shouting", deva.key());
            Ok(Reply::html(text, html))
        })
        .build();

    let caller = Deva::builder()
        .agent(AgentProfile::new("caller", "Caller"))
        .events(bus.clone())
        .method("hash", |deva: Deva, packet: Packet| async move { Ok(deva.hash(&packet)) })
        .build();

    // watch every transition on the shared bus
    bus.listen(topics::PROMPT, |message| {
        if let Some(prompt) = message.as_prompt() {
            let key = prompt.agent.as_ref().map_or("?", |a| a.key.as_str());
            println!("[{key}] {}", prompt.text);
        }
    });

    echo.init(Value::Null).await?;
    caller.init(Value::Null).await?;

    // `#key method` asks another agent over the bus
    if let Outcome::Ready(packet) = caller.question("#echo shout hello there", None).await? {
        println!("echo answered: {}", packet.answer_text());
    }

    // `!method` runs a method of the caller itself
    for command in ["!hash clear", "!hash add 1f", "!hash add 2e"] {
        caller.question(command, None).await?;
    }
    if let Outcome::Ready(status) = caller.status(Some("and hashing")) {
        println!("{status}");
    }

    caller.stop(Value::Null).await?;
    echo.stop(Value::Null).await?;
    Ok(())
}
