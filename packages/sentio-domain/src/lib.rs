pub mod assessment;
pub mod gate;
pub mod knowledge;
pub mod record;
pub mod statistics;
pub mod time_serde;

mod error;

pub use error::{Error, Result};
