//! Shared domain models.

mod card;
mod precon;

pub use card::{
    is_vehicle_type, Card, Extra, ModExtra, Print, VehicleExtra, TYPE_MOD, TYPE_NAMED_VEHICLE,
    TYPE_VEHICLE,
};
pub use precon::{Precon, PreconEntry};
