pub mod jobs;
pub mod media;
pub mod pipeline;
pub mod social;
pub mod taxonomy;
pub mod translations;

pub use jobs::{Job, JobEnqueueResponse, User};
pub use media::{Media, MediaCandidate, MediaSuggestion};
pub use pipeline::{
    Article, ArticleSuggestion, PaginatedArticleSuggestions, PaginatedArticles,
    PaginatedResearch, Research,
};
pub use social::{HashtagGroup, SocialMediaAccount, SocialMediaPost};
pub use taxonomy::{Category, PaginatedTags, Tag, Taxonomy};
pub use translations::{Language, Translation};

/// Declares a page object whose item list is named after its contents.
macro_rules! paginated {
    ($name:ident, $field:ident, $item:ty, $record:ty) => {
        #[derive(async_graphql::SimpleObject)]
        pub struct $name {
            pub $field: Vec<$item>,
            pub total: i64,
            pub pages: i64,
            pub current_page: i64,
        }

        impl From<crate::content::Page<$record>> for $name {
            fn from(page: crate::content::Page<$record>) -> Self {
                Self {
                    $field: page.items.into_iter().map(<$item>::from).collect(),
                    total: page.total as i64,
                    pages: page.pages as i64,
                    current_page: page.current_page as i64,
                }
            }
        }
    };
}

pub(crate) use paginated;
