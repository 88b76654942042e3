use log::debug;

/// Opens a store listing deep link.
pub trait StoreOpener: Send + Sync {
    /// Failures are not reported to the caller.
    fn open_listing(&self, url: &str);
}

/// Opens links through the operating system's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStoreOpener;

impl StoreOpener for SystemStoreOpener {
    fn open_listing(&self, url: &str) {
        open_store_listing(url);
    }
}

/// Hand `url` to the platform opener, ignoring failures.
pub fn open_store_listing(url: &str) {
    if let Err(error) = open::that(url) {
        debug!("Could not open store listing {url}: {error}");
    }
}
