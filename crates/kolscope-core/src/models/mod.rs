pub mod literature;
pub mod profile;
pub mod record;

pub use literature::*;
pub use profile::*;
pub use record::*;
