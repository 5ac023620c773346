mod user;
mod session;
mod flock;
mod daily_check;
mod event;
mod alert;
mod inventory;
mod finance;
mod biosecurity;
mod health;
mod billing;
mod analytics;

pub use user::*;
pub use session::*;
pub use flock::*;
pub use daily_check::*;
pub use event::*;
pub use alert::*;
pub use inventory::*;
pub use finance::*;
pub use biosecurity::*;
pub use health::*;
pub use billing::*;
pub use analytics::*;
