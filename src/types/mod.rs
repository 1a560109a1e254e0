pub mod alert;
pub mod balance;
pub(crate) mod de;
pub mod envelope;
pub mod health;
pub mod market;
pub mod series;
pub mod ticker;
pub mod trade;

pub use alert::*;
pub use balance::*;
pub use envelope::*;
pub use health::*;
pub use market::*;
pub use series::*;
pub use ticker::*;
pub use trade::*;
