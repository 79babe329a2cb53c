use crate::db::{DbPool, OrmConn};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    /// When set, reviews are only accepted from users with a completed
    /// order containing the reviewed product.
    pub review_requires_purchase: bool,
}
