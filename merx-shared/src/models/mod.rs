pub mod events;

pub use events::{
    OrderCreatedEvent, OrderDeletedEvent, OrderStatusChangedEvent, PaymentAppliedEvent,
    SettledOrderLine,
};
