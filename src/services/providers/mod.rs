use std::sync::Arc;

/// Rating platform abstraction
///
/// The comparison pipeline only needs two things from the platform: who a
/// user is connected to, and which books the user and one connection have
/// both rated. Protocol details stay inside each provider.
use crate::{
    error::AppResult,
    models::{Connection, RawRatingPair, UserId},
};

pub mod platform;

pub use platform::PlatformProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingProvider: Send + Sync {
    /// Connections of `user`, in the order the platform returns them
    async fn list_connections(&self, user: &UserId) -> AppResult<Vec<Connection>>;

    /// Books rated by both `user` and `connection`, with both raw ratings
    ///
    /// Values are passed through unvalidated; callers drop pairs that are
    /// not integers.
    async fn rating_comparison(
        &self,
        user: &UserId,
        connection: &UserId,
    ) -> AppResult<Vec<RawRatingPair>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Shared handle used by the orchestrator and the API state
pub type SharedProvider = Arc<dyn RatingProvider>;
