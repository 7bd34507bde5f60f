pub mod error;
pub mod model;
pub mod result;
pub mod source;
pub mod visitor;

pub use error::*;
pub use model::*;
pub use result::*;
pub use source::*;
pub use visitor::*;
