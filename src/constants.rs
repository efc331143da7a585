// -
// Store layout shared between components

/// Connectivity flag read by every dispatch tick
pub const API_ONLINE_PATH: &str = "api.online";

/// Handled request envelopes, keyed by request id
pub const API_REQUESTS_PATH: &str = "api.__requests";


/// Current location written by [`crate::Atom::navigate`]
pub const ROUTER_LOCATION_PATH: &str = "app.router.location";

/// True when no router matches the current location
pub const ROUTER_NOT_FOUND_PATH: &str = "app.router.notFound";

/// Set to true once [`crate::Atom::init`] completed
pub const APP_READY_PATH: &str = "app.ready";

// -
// Templates and naming

/// Strings starting with this marker are read from the store by `populate`
pub(crate) const TEMPLATE_MARKER: char = '#';

/// Prefix of request ids
pub(crate) const REQUEST_ID_PREFIX: &str = "api";

/// Prefix of watcher ids
pub(crate) const WATCHER_ID_PREFIX: &str = "watcher-";

// -
// Handler names

pub const ON_ERROR_HANDLER: &str = "onError";
pub const ON_DEFAULT_HANDLER: &str = "onDefault";
pub(crate) const ON_CODE_HANDLER_PREFIX: &str = "onCode";

/// Flag projected while a request is in flight
pub const SENDING_FLAG: &str = "sending";

/// Status used for synthetic error responses
pub const SYNTHETIC_ERROR_STATUS: u16 = 500;
