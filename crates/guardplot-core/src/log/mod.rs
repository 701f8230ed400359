pub mod io;
pub mod lookup;
pub mod model;

pub use io::{parse_log, read_log};
pub use model::{LogDocument, LogShape, Transaction};
