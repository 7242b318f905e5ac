mod result;
pub use self::result::{LookbackResult, Snapshot};
