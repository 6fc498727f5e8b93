pub mod label;
pub mod work_session;

pub use label::Label;
pub use work_session::{WorkSession, WorkSessionChanges};
