//! Spreadsheet bulk import: file selection, validation, preview, upload and
//! live progress over the push channel.

mod channel;
mod driver;
mod flow;
mod message;
mod selector;
mod session;

pub use driver::ImportDriver;
pub use flow::{ImportFlow, Phase};
pub use selector::load;
pub use session::SessionId;
