use ddd_macros::event;
use ddd_persist::domain_event::DomainEvent;

#[event]
struct AddedNameEvent {
    name: String,
}

#[event(event_type = "mix.described")]
#[derive(PartialEq)]
struct AddedDescriptionEvent {
    description: String,
}

fn main() {
    assert_eq!(AddedNameEvent::EVENT_TYPE, "AddedNameEvent");
    assert_eq!(AddedDescriptionEvent::EVENT_TYPE, "mix.described");

    let event = AddedDescriptionEvent {
        description: "wide column".into(),
    };
    assert_eq!(event.clone(), event);
}
