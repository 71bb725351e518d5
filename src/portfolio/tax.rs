pub mod rates;
pub mod scenario;
pub mod withholding;

pub use self::rates::*;
pub use self::scenario::*;
pub use self::withholding::*;
