//! Domain records returned by the RPC surface and stored by the repositories.

pub mod budget;
pub mod enums;
pub mod invoice;
pub mod macros;
pub mod project;
pub mod site_diary;
pub mod task;

pub use budget::*;
pub use enums::*;
pub use invoice::*;
pub use project::*;
pub use site_diary::*;
pub use task::*;
