pub mod availability;
pub mod booked_cache;
pub mod doctor;
pub mod generator;
pub mod refresher;
pub mod slots;

pub use availability::AvailabilityService;
pub use booked_cache::BookedSlotsCache;
pub use doctor::DoctorService;
pub use generator::SlotGenerator;
pub use refresher::SlotRefresher;
pub use slots::SlotService;
