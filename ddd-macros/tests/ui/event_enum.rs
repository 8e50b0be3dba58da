use ddd_macros::event;
use ddd_persist::domain_event::{AnyEvent, DomainEvent};
use serde::{Deserialize, Serialize};

#[event(event_type = "catalog.changed")]
#[derive(Serialize, Deserialize)]
enum CatalogChanged {
    Added { sku: String },
    Removed { sku: String },
}

fn main() {
    let event = AnyEvent::new(CatalogChanged::Added { sku: "A-1".into() });
    assert_eq!(event.event_type(), CatalogChanged::EVENT_TYPE);
    assert!(event.is::<CatalogChanged>());
}
