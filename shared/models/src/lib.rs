pub mod field;
pub mod form;
pub mod response;
pub mod submission;

pub use field::*;
pub use form::*;
pub use response::*;
pub use submission::*;
