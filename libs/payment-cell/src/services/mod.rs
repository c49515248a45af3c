pub mod coordinator;
pub mod registry;
pub mod sweeper;

pub use coordinator::PaymentCoordinator;
pub use registry::CheckoutRegistry;
pub use sweeper::spawn_checkout_sweeper;
