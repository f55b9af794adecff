pub mod core;
pub mod record;


pub use self::core::*;
pub use self::record::*;
