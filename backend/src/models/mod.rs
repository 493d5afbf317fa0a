pub mod plan;
pub mod reservation;
pub mod telescope;
pub mod time;
pub mod user;

pub use plan::*;
pub use reservation::*;
pub use telescope::*;
pub use time::*;
pub use user::*;
