use serde_json::Value;
use tracing::warn;

use super::RequestModel;
use crate::Atom;

/// Write `value` to the store path mapped to `flag` on `request`, if any.
///
/// Endpoints without a mapping for `flag` are left alone.
pub(crate) fn project(
    atom: &Atom,
    request: &RequestModel,
    flag: &str,
    value: bool,
) {
    let Some(path) = request.flags.get(flag) else {
        return;
    };
    if let Err(e) = atom.set(path, Value::Bool(value)) {
        warn!(id = %request.id, flag, %path, "[flags::project] {}", e);
    }
}
