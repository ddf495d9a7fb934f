//! Pumping the scheduler from a real clock
//!
//! The scheduler's time is virtual, so a host with its own loop advances it
//! by measured elapsed time, using `next_deadline` as the sleep bound.

use std::time::{Duration, Instant};

use serde_json::json;

use formbridge::{FormBridge, FormDefault, FormGroup, Query, Scheduler, Store};

fn main() {
    println!("=== Scheduler Pump Example ===\n");

    Scheduler::scope(|| {
        let store = Store::new("editor", json!({}));
        let form = FormGroup::new(json!(null));

        let _bridge = FormBridge::new(
            Query::new(&store),
            FormDefault::factory(|| json!({ "text": "" })),
        )
        .attach(&form)
        .expect("attach");

        let scheduler = Scheduler::current();

        // A burst of edits arms one pending flush
        for text in ["h", "he", "hel", "hell", "hello"] {
            form.patch_value(json!({ "text": text }));
        }
        println!("pending actions: {}", scheduler.pending_count());

        // Pump with a real clock until the queue drains
        let mut last = Instant::now();
        while let Some(timeout) = scheduler.next_deadline() {
            std::thread::sleep(timeout.min(Duration::from_millis(25)));
            let now = Instant::now();
            scheduler.advance(now - last);
            last = now;
        }

        println!("settled slice: {}", store.snapshot()["bridgeForm"]);
    });
}
