//! Form persistence example: a factory-backed bridge seeding and syncing a store slice

use std::time::Duration;

use serde_json::json;

use formbridge::{FormBridge, FormDefault, FormGroup, Query, Scheduler, Store};

fn blank_story() -> serde_json::Value {
    json!({
        "title": "",
        "story": "",
        "draft": false,
        "category": "general",
    })
}

fn main() {
    println!("=== Form Persistence Example ===\n");

    Scheduler::scope(|| {
        // Create a store and a form; the bridge owns the "bridgeForm" slice
        let store = Store::new("stories", json!({}));
        let form = FormGroup::new(json!(null));

        let bridge = FormBridge::new(Query::new(&store), FormDefault::factory(blank_story))
            .attach(&form)
            .expect("attach");

        println!("After attach, form holds the default:");
        println!("  form  = {}", form.value());
        println!("  store = {}\n", store.snapshot());

        // Type into the form; edits coalesce while the user is still typing
        println!("Editing the form...");
        form.patch_value(json!({ "title": "D" }));
        form.patch_value(json!({ "title": "Dr" }));
        form.patch_value(json!({ "title": "Draft", "draft": true }));

        println!("  store before settle = {}", store.snapshot());
        Scheduler::current().advance(Duration::from_millis(100));
        println!("  store after settle  = {}\n", store.snapshot());

        // Reset restores the default into both form and store
        println!("Resetting...");
        bridge.reset().expect("reset");
        println!("  form  = {}", form.value());
        println!("  store = {}", store.snapshot());

        bridge.destroy();
    });
}
