pub mod flow;
pub mod reservation;
pub mod validation;

pub use flow::BookingFlow;
pub use reservation::ReservationService;
pub use validation::validate_draft;
