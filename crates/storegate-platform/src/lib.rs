mod paths;
mod store;

pub use paths::{AppPaths, AppPathsError};
pub use store::{StoreOpener, SystemStoreOpener, open_store_listing};
