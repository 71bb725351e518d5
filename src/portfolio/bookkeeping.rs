pub mod fifo;
pub mod lots;

pub use self::fifo::*;
pub use self::lots::*;
