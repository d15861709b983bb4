pub mod table;
pub mod guest;

pub use table::{NewTable, Table};
pub use guest::{Guest, GuestStatus, NewGuest, seats_needed, ARRIVAL_TIME_FORMAT};
