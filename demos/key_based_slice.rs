//! Key-based bridge example: an existing slice is both default and target

use std::time::Duration;

use serde_json::json;

use formbridge::{FormBridge, FormDefault, FormGroup, Query, Scheduler, Store};

fn main() {
    println!("=== Key-Based Slice Example ===\n");

    Scheduler::scope(|| {
        // The "config" slice already exists; the bridge treats its current
        // value as the default
        let store = Store::new(
            "app",
            json!({
                "config": { "time": "", "isAdmin": false },
                "session": { "user": "ada" },
            }),
        );
        let form = FormGroup::new(json!(null));

        let bridge = FormBridge::new(Query::new(&store), FormDefault::slice("config"))
            .attach(&form)
            .expect("attach");

        println!("Form initialized from the existing slice:");
        println!("  form = {}\n", form.value());

        println!("Editing the form...");
        form.patch_value(json!({ "time": "09:00", "isAdmin": true }));
        Scheduler::current().advance(Duration::from_millis(100));

        println!("  config  = {}", store.snapshot()["config"]);
        println!("  session = {} (untouched)\n", store.snapshot()["session"]);

        println!("reset() restores the attach-time value:");
        bridge.reset().expect("reset");
        println!("  config = {}\n", store.snapshot()["config"]);

        println!("reset_to(..) sets an explicit value:");
        bridge
            .reset_to(json!({ "time": "17:30", "isAdmin": false }))
            .expect("reset_to");
        println!("  config = {}", store.snapshot()["config"]);

        bridge.destroy();
    });
}
