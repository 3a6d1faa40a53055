//! Booking façade: quote, pay, confirm and reserve as one unit.
//!
//! [`BookingFacade::book`] validates the request, prices the turno, freezes
//! service prices and hands a [`BookingOrder`] to the store, which writes the
//! pago, its confirmation, the reservation and the services in a single
//! transaction. A failure reports the [`BookingStep`] it happened at and
//! leaves no trace.

pub mod errors;
pub mod facade;
pub mod models;

pub use errors::{BookingError, BookingResult};
pub use facade::BookingFacade;
pub use models::{
    BookedRecords, Booking, BookingOrder, BookingRequest, BookingStep, ServiceRequest,
};
