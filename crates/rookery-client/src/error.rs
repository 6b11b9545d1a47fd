use thiserror::Error;

use rookery_api::ApiError;
use rookery_store::StoreError;
use rookery_types::ShortcutError;

/// Errors surfaced by interaction actions.
#[derive(Error, Debug)]
pub enum ActionError {
    /// The session is unauthenticated, or the status belongs to another
    /// instance; interacting would require logging in there.
    #[error("this session cannot interact with posts from another instance")]
    ReadOnly,

    /// The status's visibility forbids boosting it.
    #[error("this post cannot be boosted")]
    NotBoostable,

    /// The status is not in the cache; interactions operate on cached
    /// entries only.
    #[error("status is not cached")]
    NotCached,

    /// A poll action was invoked on a status without a poll.
    #[error("status has no poll")]
    NoPoll,

    /// The remote call failed; the optimistic write has been rolled back.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors from shortcut management.
#[derive(Error, Debug)]
pub enum ShortcutsError {
    #[error(transparent)]
    Invalid(#[from] ShortcutError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
