pub mod mutation;
pub mod query;

pub use mutation::Mutation;
pub use query::Query;

use crate::content::{ListParams, SortDirection};
use crate::domain::ContentStatus;

fn list_params(
    page: i64,
    page_size: i64,
    status: Option<ContentStatus>,
    search: Option<String>,
    sort: String,
    dir: String,
) -> ListParams<ContentStatus> {
    ListParams {
        page,
        page_size,
        status,
        search,
        sort: Some(sort),
        dir: Some(SortDirection::parse(&dir)),
    }
}
