mod common;
pub use self::common::{Query, SortDirection};

mod document;
pub use self::document::{QueryDocument, DEFAULT_PAGE_SIZE};
