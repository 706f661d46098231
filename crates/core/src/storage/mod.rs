mod error;
mod http_mapping;
mod pagination;
mod traits;
mod types;

pub use error::{CursorError, DateRangeError, RepositoryError, Result, TRANSACTION_ENTITY};
pub use http_mapping::{repository_error_to_status_code, status_code_to_repository_error};
pub use pagination::{paginate, Page, PageCursor, PageQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use traits::{ChangeSource, ChangeStream, TransactionRepository};
pub use types::DateRange;
