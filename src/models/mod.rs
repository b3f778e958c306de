pub mod event;
pub mod series;
pub mod user;

pub use event::{Event, EventUpdate};
pub use series::{EventSeries, Frequency, Removal, RepeatEnd, RepeatRule};
pub use user::{Privilege, Privileges, User};
