pub mod expansion;
pub mod listing;
pub mod locks;
pub mod publication;
pub mod series;
pub mod users;

pub use expansion::NewEvent;
pub use listing::WeekBuckets;
pub use publication::PublishOutcome;
pub use series::{DeleteReport, EventService, Scope};
pub use users::{authorize, require_login, UserService};
