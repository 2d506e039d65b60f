use crate::auth::AuthService;
use crate::content::ContentService;
use crate::domain::User;
use crate::error::ConsoleError;
use crate::graphql::resolvers::{Mutation, Query};
use crate::jobs::JobQueue;
use async_graphql::{Context, EmptySubscription, ErrorExtensions, FieldResult, Schema};

/// GraphQL context containing shared application state
pub struct GraphQLContext {
    pub content: ContentService,
    pub queue: JobQueue,
    pub auth: AuthService,
    pub require_login: bool,
}

/// The user behind the current request, attached per request.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub user: Option<User>,
}

/// Language negotiated from the request's `Accept-Language` header.
#[derive(Debug, Clone)]
pub struct RequestLanguage(pub String);

/// The complete GraphQL schema
pub type GraphQLSchema = Schema<Query, Mutation, EmptySubscription>;

pub fn create_schema(context: GraphQLContext) -> GraphQLSchema {
    Schema::build(Query, Mutation, EmptySubscription)
        .data(context)
        .finish()
}

impl ErrorExtensions for ConsoleError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", self.code()))
    }
}

pub(crate) fn state<'a>(ctx: &Context<'a>) -> FieldResult<&'a GraphQLContext> {
    ctx.data::<GraphQLContext>()
}

pub(crate) fn viewer_id(ctx: &Context<'_>) -> Option<i64> {
    ctx.data_opt::<Viewer>()
        .and_then(|v| v.user.as_ref())
        .map(|u| u.id)
}

/// Viewer id for a write. Anonymous writes are refused when login is required.
pub(crate) fn editor(ctx: &Context<'_>) -> FieldResult<Option<i64>> {
    let id = viewer_id(ctx);
    if state(ctx)?.require_login && id.is_none() {
        return Err(ConsoleError::Unauthorized("Authentication required".into()).extend());
    }
    Ok(id)
}
