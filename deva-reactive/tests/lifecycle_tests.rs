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
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use deva_reactive::prelude::*;
use serde_json::json;

use crate::setup::{eventually, initialize_tracing, profile, test_agent, test_bus, Recorder};

mod setup;

/// `init` on an agent without hooks runs the whole default chain and ends active.
#[tokio::test]
async fn test_init_runs_default_chain() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = test_bus();
    let recorder = Recorder::attach(&bus, &[topics::STATE]);
    let deva = test_agent("alpha", &bus);

    let outcome = deva.init(json!({"boot": true})).await?;

    let done = outcome.ready().expect("init should run");
    assert_eq!(done.message, CONFIG.messages.done);
    assert_eq!(done.agent.map(|p| p.key), Some("alpha".to_string()));
    assert_eq!(done.data, json!({"boot": true}));
    assert_eq!(
        recorder.states(),
        vec![State::Init, State::Start, State::Enter, State::Done]
    );
    assert!(deva.is_active());
    assert_eq!(deva.state(), State::Done);
    Ok(())
}

/// Every transition publishes one `state` event followed by one `prompt` event.
#[tokio::test]
async fn test_transitions_publish_state_then_prompt() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = test_bus();
    let recorder = Recorder::attach(&bus, &[topics::STATE, topics::PROMPT]);
    let deva = test_agent("alpha", &bus);

    deva.set_state(State::Wait);

    assert_eq!(recorder.topics(), vec!["state", "prompt"]);
    let event = recorder.on(topics::STATE)[0].as_state().cloned().expect("state event");
    assert_eq!(event.id, deva.id());
    assert_eq!(event.label, "WAIT");
    assert_eq!(event.agent, deva.profile());
    assert_eq!(recorder.prompts(), vec!["WAIT".to_string()]);
    Ok(())
}

/// A second `start` neither moves the activation time nor reruns `on_start`.
#[tokio::test]
async fn test_start_is_idempotent() -> anyhow::Result<()> {
    initialize_tracing();
    let starts = Arc::new(AtomicUsize::new(0));
    let counter = starts.clone();
    let deva = Deva::builder()
        .agent(profile("alpha"))
        .events(test_bus())
        .on_start(move |deva: Deva, data| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                deva.enter(data).await
            }
        })
        .build();

    deva.init(Value::Null).await?;
    let first = deva.active();
    let again = deva.start(Value::Null).await?;

    assert!(again.is_offline());
    assert_eq!(deva.active(), first);
    assert_eq!(starts.load(Ordering::SeqCst), 1);
    Ok(())
}

/// Operations that need a running agent resolve offline and change nothing.
#[tokio::test]
async fn test_inactive_agent_resolves_offline() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = test_bus();
    let recorder = Recorder::attach(&bus, &[topics::STATE, topics::PROMPT, topics::ERROR]);
    let deva = test_agent("alpha", &bus);
    let other = test_agent("beta", &bus);

    assert!(deva.stop(Value::Null).await?.is_offline());
    assert!(deva.enter(Value::Null).await?.is_offline());
    assert!(deva.exit(Value::Null).await?.is_offline());
    assert!(deva.done(Value::Null).await?.is_offline());
    assert!(deva.question("!say hi", None).await?.is_offline());
    assert!(deva.status(None).is_offline());

    other.init(Value::Null).await?;
    recorder.clear();
    let packet = match other.question("!say hi", None).await? {
        Outcome::Ready(packet) => packet,
        Outcome::Offline => panic!("beta is active"),
    };
    assert!(deva.ask(packet).await?.is_offline());

    assert_eq!(deva.state(), State::Offline);
    assert!(recorder
        .states()
        .iter()
        .all(|s| *s == State::Question || *s == State::Answer));
    Ok(())
}

/// `stop` runs `stop → exit → done` and leaves the agent inactive.
#[tokio::test]
async fn test_stop_runs_exit_chain() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = test_bus();
    let deva = test_agent("alpha", &bus);
    deva.init(Value::Null).await?;
    let recorder = Recorder::attach(&bus, &[topics::STATE]);

    let outcome = deva.stop(json!("bye")).await?;

    assert_eq!(outcome.ready().map(|d| d.data), Some(json!("bye")));
    assert_eq!(
        recorder.states(),
        vec![State::Stop, State::Exit, State::Done]
    );
    assert!(!deva.is_active());
    assert!(deva.active().is_none());
    Ok(())
}

/// A hook replaces its step; the default continuation does not run.
#[tokio::test]
async fn test_hook_replaces_default_step() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = test_bus();
    let recorder = Recorder::attach(&bus, &[topics::STATE]);
    let deva = Deva::builder()
        .agent(profile("alpha"))
        .events(bus.clone())
        .on_enter(|deva: Deva, _| async move {
            Ok(Outcome::Ready(Done {
                message: "entered".to_string(),
                agent: deva.profile(),
                data: Value::Null,
            }))
        })
        .build();

    let outcome = deva.init(Value::Null).await?;

    assert_eq!(outcome.ready().map(|d| d.message), Some("entered".to_string()));
    assert_eq!(
        recorder.states(),
        vec![State::Init, State::Start, State::Enter]
    );
    Ok(())
}

/// `on_init` replaces the start step entirely.
#[tokio::test]
async fn test_on_init_hook_skips_start() -> anyhow::Result<()> {
    initialize_tracing();
    let deva = Deva::builder()
        .agent(profile("alpha"))
        .events(test_bus())
        .on_init(|_, data| async move {
            Ok(Outcome::Ready(Done {
                message: "configured".to_string(),
                agent: None,
                data,
            }))
        })
        .build();

    let outcome = deva.init(json!(7)).await?;

    assert_eq!(outcome.ready().map(|d| d.data), Some(json!(7)));
    assert!(!deva.is_active());
    assert_eq!(deva.state(), State::Init);
    Ok(())
}

/// A failing hook goes through the error funnel and rejects the chain.
#[tokio::test]
async fn test_failing_hook_rejects_chain() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = test_bus();
    let recorder = Recorder::attach(&bus, &[topics::ERROR]);
    let deva = Deva::builder()
        .agent(profile("alpha"))
        .events(bus.clone())
        .on_start(|_, _| async { Err(DevaError::hook("on_start", "no power")) })
        .build();

    let result = deva.init(Value::Null).await;

    assert!(matches!(result, Err(DevaError::Hook { hook: "on_start", .. })));
    assert_eq!(deva.state(), State::Error);
    let errors = recorder.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].error.contains("no power"));
    assert!(errors[0].packet.is_none());
    Ok(())
}

/// With `on_error` handling the failure, the chain resolves with the error text.
#[tokio::test]
async fn test_on_error_handles_hook_failure() -> anyhow::Result<()> {
    initialize_tracing();
    let handled = Arc::new(AtomicUsize::new(0));
    let counter = handled.clone();
    let deva = Deva::builder()
        .agent(profile("alpha"))
        .events(test_bus())
        .on_enter(|_, _| async { Err(DevaError::hook("on_enter", "stuck")) })
        .on_error(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build();

    let outcome = deva.init(Value::Null).await?;

    let done = outcome.ready().expect("handled failure resolves");
    assert!(done.message.contains("stuck"));
    assert_eq!(handled.load(Ordering::SeqCst), 1);
    Ok(())
}

async fn explode(_: Deva, _: Value) -> LifecycleResult {
    panic!("done exploded")
}

/// A panicking hook is reported as a panic, not as a crash of the caller.
#[tokio::test]
async fn test_panicking_hook_is_caught() -> anyhow::Result<()> {
    initialize_tracing();
    let deva = Deva::builder()
        .agent(profile("alpha"))
        .events(test_bus())
        .on_done(explode)
        .build();

    let result = deva.init(Value::Null).await;

    match result {
        Err(DevaError::Panic { name, message }) => {
            assert_eq!(name, "on_done");
            assert_eq!(message, "done exploded");
        }
        other => panic!("expected a panic error, got {other:?}"),
    }
    Ok(())
}

/// Re-initializing an agent does not subscribe its listeners twice.
#[tokio::test]
async fn test_wiring_happens_once() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = test_bus();
    let deva = test_agent("alpha", &bus);

    deva.init(Value::Null).await?;
    deva.stop(Value::Null).await?;
    deva.init(Value::Null).await?;

    assert_eq!(bus.listener_count("alpha:start"), 1);
    assert_eq!(bus.listener_count(&topics::ask("alpha")), 1);
    assert_eq!(bus.listener_count("alpha:wait"), 0);
    assert!(deva.is_active());
    Ok(())
}

/// Publishing on `<key>:<state>` runs the matching operation.
#[tokio::test]
async fn test_bus_dispatches_lifecycle_operations() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = test_bus();
    let deva = test_agent("alpha", &bus);
    deva.init(Value::Null).await?;

    assert_eq!(bus.talk(&topics::state("alpha", State::Stop), ()), 1);
    assert!(eventually(|| !deva.is_active()).await);

    bus.talk(&topics::state("alpha", State::Start), ());
    assert!(eventually(|| deva.is_active()).await);
    Ok(())
}

/// Declared listeners receive the agent they were registered on.
#[tokio::test]
async fn test_declared_listeners_receive_owner() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = test_bus();
    let heard = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = heard.clone();
    let deva = Deva::builder()
        .agent(profile("alpha"))
        .events(bus.clone())
        .listener("news", move |deva, message| {
            sink.lock()
                .push(format!("{}:{}", deva.key(), message.text().unwrap_or_default()));
        })
        .build();

    assert_eq!(bus.talk("news", "before init"), 0);
    deva.init(Value::Null).await?;
    bus.talk("news", "after init");

    assert_eq!(*heard.lock(), vec!["alpha:after init".to_string()]);
    Ok(())
}

/// Dropping every handle to an agent leaves its bus subscriptions inert.
#[tokio::test]
async fn test_dropped_agent_does_not_dispatch() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = test_bus();
    let recorder = Recorder::attach(&bus, &[topics::STATE]);
    {
        let deva = test_agent("alpha", &bus);
        deva.init(Value::Null).await?;
    }
    recorder.clear();

    assert_eq!(bus.talk(&topics::state("alpha", State::Stop), ()), 0);
    tokio::task::yield_now().await;

    assert!(recorder.states().is_empty());
    Ok(())
}

/// Agents created and dropped on a long-lived bus leave no listeners behind.
#[tokio::test]
async fn test_dropped_agents_release_listeners() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = test_bus();
    for _ in 0..100 {
        let deva = test_agent("temp", &bus);
        deva.init(Value::Null).await?;
        assert_eq!(bus.listener_count(&topics::ask("temp")), 1);
    }

    assert_eq!(bus.listener_count(&topics::ask("temp")), 0);
    assert_eq!(bus.listener_count(&topics::state("temp", State::Start)), 0);
    Ok(())
}

/// Two overlapping stops run the stop chain once; the second resolves offline.
#[tokio::test]
async fn test_concurrent_stop_runs_chain_once() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = test_bus();
    let recorder = Recorder::attach(&bus, &[topics::STATE]);
    let stops = Arc::new(AtomicUsize::new(0));
    let counter = stops.clone();
    let deva = Deva::builder()
        .agent(profile("alpha"))
        .events(bus.clone())
        .on_stop(move |deva: Deva, data| {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                deva.exit(data).await
            }
        })
        .build();
    deva.init(Value::Null).await?;
    recorder.clear();

    let (first, second) = tokio::join!(deva.stop(Value::Null), deva.stop(Value::Null));

    let (first, second) = (first?, second?);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert!(first.is_ready() != second.is_ready());
    assert!(!deva.is_active());
    assert_eq!(
        recorder.states(),
        vec![State::Stop, State::Exit, State::Done]
    );
    assert!(deva.stop(Value::Null).await?.is_offline());
    Ok(())
}

/// After a completed stop the agent can be started and stopped again.
#[tokio::test]
async fn test_stop_after_restart() -> anyhow::Result<()> {
    initialize_tracing();
    let deva = test_agent("alpha", &test_bus());
    deva.init(Value::Null).await?;

    assert!(deva.stop(Value::Null).await?.is_ready());
    assert!(deva.start(Value::Null).await?.is_ready());
    assert!(deva.stop(Value::Null).await?.is_ready());
    assert!(!deva.is_active());
    Ok(())
}

/// `translate` rewrites prompt notifications.
#[tokio::test]
async fn test_translate_applies_to_prompts() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = test_bus();
    let recorder = Recorder::attach(&bus, &[topics::PROMPT]);
    let deva = Deva::builder()
        .agent(
            profile("alpha")
                .with_translate(|deva, text| format!("[{}] {}", deva.key(), text.to_lowercase())),
        )
        .events(bus.clone())
        .build();

    deva.set_state(State::Medic);
    deva.prompt("Hello");

    assert_eq!(
        recorder.prompts(),
        vec!["[alpha] medic".to_string(), "[alpha] hello".to_string()]
    );
    Ok(())
}
