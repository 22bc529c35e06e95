// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Caches a technician's work order list: first load, optimistic edit,
//! stale-while-revalidate after the TTL, and invalidation.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use fieldcache::{BoxError, Cache, CacheEvent, CacheOptions, Mutation};
use tick::ClockControl;

#[derive(Debug, Clone)]
struct WorkOrder {
    id: u32,
    title: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), BoxError> {
    let control = ClockControl::new();
    let cache = Cache::builder::<Vec<WorkOrder>>(control.to_clock())
        .name("work_orders")
        .max_size(100)
        .build();

    let mut events = cache.subscribe();
    let server_revision = Arc::new(AtomicU32::new(0));
    let revision = Arc::clone(&server_revision);

    let orders = cache.session(
        "technician:17:orders",
        move || {
            let revision = revision.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis(25)).await;
                Ok::<_, BoxError>(vec![
                    WorkOrder {
                        id: 1,
                        title: format!("Inspect pump (rev {revision})"),
                    },
                    WorkOrder {
                        id: 2,
                        title: "Replace filter".to_string(),
                    },
                ])
            }
        },
        CacheOptions::default().with_ttl(Duration::from_secs(60)),
    );

    let first = orders.get().await?;
    println!("loaded {:?}", first.status());
    for order in first.value.iter().flatten() {
        println!("  #{} {}", order.id, order.title);
    }

    orders
        .mutate(Mutation::update(|current: Option<Vec<WorkOrder>>| {
            let mut list = current.unwrap_or_default();
            list.retain(|order| order.id != 2);
            list
        }))
        .await?;
    println!("after completing order 2: {:?}", orders.snapshot().value);

    control.advance(Duration::from_secs(60));
    let stale = orders.get().await?;
    println!("after ttl: {:?}, loading: {}", stale.status(), stale.is_loading);

    while let Ok(event) = events.recv().await {
        println!("event: {event:?}");
        if matches!(event, CacheEvent::Revalidated { .. }) {
            break;
        }
    }
    println!("revalidated: {:?}", orders.snapshot().value);

    orders.invalidate();
    println!("after invalidate: {:?}", orders.snapshot().status());
    println!("stats: {:?}", cache.store().stats());

    Ok(())
}
