pub mod context;
pub mod critical_section;
/// Lock-Order Analysis Domain Models
pub mod ids;
pub mod lock;
pub mod outcome;

pub use context::*;
pub use critical_section::*;
pub use ids::*;
pub use lock::*;
pub use outcome::*;
