pub mod attachment;
pub mod field;
pub mod issue;
pub mod journal;
pub mod user;

pub use attachment::*;
pub use field::*;
pub use issue::*;
pub use journal::*;
pub use user::*;
