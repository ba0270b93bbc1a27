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
use serde_json::json;

fn worker(key: &str) -> Deva {
    Deva::builder()
        .agent(AgentProfile::new(key, key.to_uppercase()))
        .method("work", |deva: Deva, packet: Packet| async move {
            let mode = deva.config()["mode"].as_str().unwrap_or("unknown").to_string();
            Ok(Reply::data(
                format!("{} did {} in {mode} mode", deva.key(), packet.q.text),
                json!({ "worker": deva.key() }),
            ))
        })
        .build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // children inherit the parent's bus and config when the parent initializes
    let supervisor = Deva::builder()
        .agent(AgentProfile::new("supervisor", "Supervisor"))
        .config(json!({ "mode": "batch" }))
        .deva(worker("left"))
        .deva(worker("right"))
        .on_init(|deva: Deva, data| async move {
            println!("{}", deva.init_devas(data.clone()).await?);
            deva.start(data).await
        })
        .on_stop(|deva: Deva, data| async move {
            println!("{}", deva.stop_devas(data.clone()).await?);
            deva.exit(data).await
        })
        .build();

    supervisor.init(Value::Null).await?;

    for key in supervisor.children() {
        let question = format!("#{key} work the numbers");
        if let Outcome::Ready(packet) = supervisor.question(&question, None).await? {
            println!("{}", packet.answer_text());
        }
    }

    // a worker loaded later shares the same context right away
    let late = worker("late");
    supervisor.load(late.clone());
    late.init(Value::Null).await?;
    if let Outcome::Ready(packet) = supervisor.question("#late work overtime", None).await? {
        println!("{}", packet.answer_text());
    }

    supervisor.stop(Value::Null).await?;
    Ok(())
}
