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
use std::time::Duration;

use deva_reactive::prelude::*;
use serde_json::json;

use crate::setup::{initialize_tracing, profile, test_agent, test_bus};

mod setup;

fn child(key: &str) -> Deva {
    // Each child starts on its own bus so inheritance is observable.
    test_agent(key, &test_bus())
}

/// `init` shares the parent's bus, configuration and client with every child.
#[tokio::test]
async fn test_init_shares_inherited_fields() -> anyhow::Result<()> {
    initialize_tracing();
    let kid = child("kid");
    let parent = Deva::builder()
        .agent(profile("parent"))
        .events(test_bus())
        .config(json!({"mode": "test"}))
        .client(Profile::new("client", "Client"))
        .deva(kid.clone())
        .build();
    assert!(!kid.events().is_same(&parent.events()));

    parent.init(Value::Null).await?;

    assert!(kid.events().is_same(&parent.events()));
    assert_eq!(kid.config(), json!({"mode": "test"}));
    assert_eq!(kid.client().map(|c| c.key), Some("client".to_string()));

    parent.set_config(json!({"mode": "live"}));
    parent.set_client(Some(Profile::new("other", "Other")));
    assert_eq!(kid.config(), json!({"mode": "live"}));
    assert_eq!(kid.client().map(|c| c.key), Some("other".to_string()));
    Ok(())
}

/// Only the fields in the inherit list are shared.
#[tokio::test]
async fn test_inherit_list_limits_sharing() -> anyhow::Result<()> {
    initialize_tracing();
    let kid = child("kid");
    let parent = Deva::builder()
        .agent(profile("parent"))
        .events(test_bus())
        .config(json!("parent config"))
        .inherit(&[Inherit::Events])
        .deva(kid.clone())
        .build();

    parent.init(Value::Null).await?;

    assert!(kid.events().is_same(&parent.events()));
    assert_eq!(kid.config(), Value::Null);
    Ok(())
}

/// Inherited library functions run with the child as their receiver.
#[tokio::test]
async fn test_inherited_lib_binds_to_child() -> anyhow::Result<()> {
    initialize_tracing();
    let kid = child("kid");
    let parent = Deva::builder()
        .agent(profile("parent"))
        .events(test_bus())
        .lib("greet", |deva: Deva, packet: Packet| async move {
            Ok(Reply::text(format!("{} greets {}", deva.key(), packet.q.text)))
        })
        .deva(kid.clone())
        .build();
    parent.init(Value::Null).await?;
    let template = parent
        .question("!say you", None)
        .await?
        .ready()
        .expect("parent is active");

    let from_kid = kid.lib("greet", template.clone()).await?;
    let from_parent = parent.lib("greet", template).await?;

    assert_eq!(from_kid, Reply::text("kid greets you"));
    assert_eq!(from_parent, Reply::text("parent greets you"));
    Ok(())
}

/// A child sees security functions registered on its parent; missing ones fail.
#[tokio::test]
async fn test_security_table_is_inherited() -> anyhow::Result<()> {
    initialize_tracing();
    let kid = child("kid");
    let parent = Deva::builder()
        .agent(profile("parent"))
        .events(test_bus())
        .security("check", |deva: Deva, _| async move {
            Ok(Reply::text(format!("{} is cleared", deva.key())))
        })
        .deva(kid.clone())
        .build();
    parent.init(Value::Null).await?;
    let packet = parent
        .question("!say x", None)
        .await?
        .ready()
        .expect("parent is active");

    assert_eq!(
        kid.security("check", packet.clone()).await?,
        Reply::text("kid is cleared")
    );
    let missing = kid.security("nothing", packet).await;
    assert!(matches!(missing, Err(DevaError::Missing { table: "security", .. })));
    Ok(())
}

/// `load` applies inheritance at once; `unload` removes the child.
#[tokio::test]
async fn test_load_and_unload() -> anyhow::Result<()> {
    initialize_tracing();
    let parent = test_agent("parent", &test_bus());
    parent.init(Value::Null).await?;
    let late = child("late");

    let key = parent.load(late.clone());

    assert_eq!(key, "late");
    assert_eq!(parent.children(), vec!["late".to_string()]);
    assert!(late.events().is_same(&parent.events()));

    let removed = parent.unload("late").expect("late was loaded");
    assert_eq!(removed.id(), late.id());
    assert!(parent.children().is_empty());
    assert!(parent.unload("late").is_none());
    Ok(())
}

/// `init_devas` and `stop_devas` fan out to every child.
#[tokio::test]
async fn test_fan_out_over_children() -> anyhow::Result<()> {
    initialize_tracing();
    let first = child("first");
    let second = child("second");
    let parent = Deva::builder()
        .agent(profile("parent"))
        .events(test_bus())
        .deva(first.clone())
        .deva(second.clone())
        .on_init(|deva: Deva, data| async move {
            deva.init_devas(data.clone()).await?;
            deva.start(data).await
        })
        .build();

    parent.init(Value::Null).await?;
    assert!(first.is_active() && second.is_active() && parent.is_active());

    let stopped = parent.stop_devas(Value::Null).await?;
    assert_eq!(stopped, CONFIG.messages.devas_stop);
    assert!(!first.is_active() && !second.is_active());
    assert!(parent.is_active());

    assert_eq!(parent.init_devas(Value::Null).await?, CONFIG.messages.devas_init);
    Ok(())
}

/// One failing child fails the fan-out, but only after every sibling has settled.
#[tokio::test]
async fn test_fan_out_settles_every_child() -> anyhow::Result<()> {
    initialize_tracing();
    let entered = Arc::new(AtomicUsize::new(0));
    let counter = entered.clone();
    let slow = Deva::builder()
        .agent(profile("slow"))
        .events(test_bus())
        .on_enter(move |deva: Deva, data| {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                deva.done(data).await
            }
        })
        .build();
    let bad = Deva::builder()
        .agent(profile("bad"))
        .events(test_bus())
        .on_init(|_, _| async { Err(DevaError::hook("on_init", "refusing")) })
        .build();
    let parent = Deva::builder()
        .agent(profile("parent"))
        .events(test_bus())
        .deva(slow.clone())
        .deva(bad)
        .build();
    parent.inherit();

    let result = parent.init_devas(Value::Null).await;

    assert!(matches!(result, Err(DevaError::Hook { hook: "on_init", .. })));
    assert_eq!(entered.load(Ordering::SeqCst), 1);
    assert!(slow.is_active());
    assert_eq!(slow.state(), State::Done);
    Ok(())
}

/// A child initialized on its own bus follows the parent's bus when loaded.
#[tokio::test]
async fn test_load_moves_initialized_child() -> anyhow::Result<()> {
    initialize_tracing();
    let own = test_bus();
    let kid = test_agent("kid", &own);
    kid.init(Value::Null).await?;
    assert_eq!(own.listener_count(&topics::ask("kid")), 1);
    let parent = test_agent("parent", &test_bus());
    parent.init(Value::Null).await?;

    parent.load(kid.clone());

    assert!(kid.events().is_same(&parent.events()));
    assert_eq!(own.listener_count(&topics::ask("kid")), 0);
    assert_eq!(parent.events().listener_count(&topics::ask("kid")), 1);
    let packet = parent
        .question("#kid whoami", None)
        .await?
        .ready()
        .expect("parent is active");
    assert_eq!(packet.answer_text(), "kid");

    kid.init(Value::Null).await?;
    assert_eq!(parent.events().listener_count(&topics::ask("kid")), 1);
    Ok(())
}

/// An unloaded child keeps its listeners while held and drops them with its last handle.
#[tokio::test]
async fn test_unloaded_child_detaches_on_drop() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = test_bus();
    let parent = test_agent("parent", &bus);
    parent.load(test_agent("kid", &bus));
    parent.init_devas(Value::Null).await?;
    assert_eq!(bus.listener_count(&topics::ask("kid")), 1);

    let kid = parent.unload("kid").expect("kid was loaded");
    assert_eq!(bus.listener_count(&topics::ask("kid")), 1);

    drop(kid);
    assert_eq!(bus.listener_count(&topics::ask("kid")), 0);
    Ok(())
}

/// A multi-level tree initializes level by level when each parent fans out.
#[tokio::test]
async fn test_nested_tree_shares_one_bus() -> anyhow::Result<()> {
    initialize_tracing();
    let grandchild = child("grandchild");
    let middle = Deva::builder()
        .agent(profile("middle"))
        .events(test_bus())
        .deva(grandchild.clone())
        .on_init(|deva: Deva, data| async move {
            deva.init_devas(data.clone()).await?;
            deva.start(data).await
        })
        .build();
    let root = Deva::builder()
        .agent(profile("root"))
        .events(test_bus())
        .deva(middle.clone())
        .on_init(|deva: Deva, data| async move {
            deva.init_devas(data.clone()).await?;
            deva.start(data).await
        })
        .build();

    root.init(Value::Null).await?;

    assert!(grandchild.events().is_same(&root.events()));
    assert!(grandchild.is_active());
    let packet = root
        .question("#grandchild whoami", None)
        .await?
        .ready()
        .expect("root is active");
    assert_eq!(packet.answer_text(), "grandchild");
    Ok(())
}
