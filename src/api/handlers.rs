use tracing::debug;
use tracing::error;
use tracing::trace;

use super::flags;
use super::RequestModel;
use crate::constants::API_REQUESTS_PATH;
use crate::constants::ON_CODE_HANDLER_PREFIX;
use crate::constants::ON_DEFAULT_HANDLER;
use crate::constants::ON_ERROR_HANDLER;
use crate::constants::SENDING_FLAG;
use crate::definition::resolve_args;
use crate::Atom;

/// Ordered stages applied to every response, cached or fresh:
///
/// 1. validate
/// 2. store in cache
/// 3. assign the handler name
/// 4. map
/// 5. parse
/// 6. write the envelope and release the request
///
/// No stage aborts the pipeline. Store writes that fail are logged and the
/// remaining stages still run.
///
/// Envelopes under `api.__requests` are never evicted: every handled request
/// stays readable by id for the lifetime of the [`Atom`].
pub struct HandlerPipeline;

impl HandlerPipeline {
    pub fn run(
        atom: &Atom,
        request: &mut RequestModel,
    ) {
        if request.response.is_none() {
            error!(id = %request.id, "[HandlerPipeline::run] no response attached, nothing to handle");
            return;
        }
        debug!(id = %request.id, name = %request.name, "[HandlerPipeline::run]");

        Self::run_validators(request);
        if atom.settings().api.cache_enabled {
            atom.inner.cache.set(request);
        }
        Self::assign_handler(request);
        Self::run_mappers(atom, request);
        Self::run_parsers(atom, request);
        Self::store_and_release(atom, request);
    }

    /// `is_valid` is true only if every response validator accepts the raw
    /// response. Synthetic errors are never valid.
    fn run_validators(request: &mut RequestModel) {
        let endpoint = request.endpoint.clone();
        if let Some(response) = request.response.as_mut() {
            response.is_valid =
                !response.error && endpoint.validators.iter().all(|validate| validate(&response.raw));
        }
    }

    /// `onError` for failures, `onCode{status}` otherwise. Falls back to
    /// `onDefault` when the computed name has no descriptors but `onDefault`
    /// does.
    fn assign_handler(request: &mut RequestModel) {
        let endpoint = request.endpoint.clone();
        let Some(response) = request.response.as_mut() else {
            return;
        };

        let handler = if response.error {
            ON_ERROR_HANDLER.to_string()
        } else {
            format!("{}{}", ON_CODE_HANDLER_PREFIX, response.raw.status)
        };

        response.handler = if !endpoint.has_handler(&handler) && endpoint.has_handler(ON_DEFAULT_HANDLER) {
            ON_DEFAULT_HANDLER.to_string()
        } else {
            handler
        };
        trace!(id = %request.id, handler = %response.handler, "[HandlerPipeline::assign_handler]");
    }

    fn run_mappers(
        atom: &Atom,
        request: &RequestModel,
    ) {
        let Some(response) = request.response.as_ref() else {
            return;
        };
        let Some(mappers) = request.endpoint.handlers.get(&response.handler) else {
            return;
        };

        for mapper in mappers {
            let value = (mapper.run)(response);
            if let Err(e) = atom.set(&mapper.update, value) {
                error!(id = %request.id, update = %mapper.update, "[HandlerPipeline::run_mappers] {}", e);
            }
        }
    }

    fn run_parsers(
        atom: &Atom,
        request: &RequestModel,
    ) {
        let Some(handler) = request.response.as_ref().map(|r| r.handler.as_str()) else {
            return;
        };
        let Some(parsers) = request.endpoint.parsers.get(handler) else {
            return;
        };

        for parser in parsers {
            let value = (parser.run)(resolve_args(atom, &parser.from));
            if let Err(e) = atom.set(&parser.update, value) {
                error!(id = %request.id, update = %parser.update, "[HandlerPipeline::run_parsers] {}", e);
            }
        }
    }

    fn store_and_release(
        atom: &Atom,
        request: &mut RequestModel,
    ) {
        request.sending = false;

        let path = format!("{}.{}", API_REQUESTS_PATH, request.id);
        match serde_json::to_value(&*request) {
            Ok(value) => {
                if let Err(e) = atom.set(&path, value) {
                    error!(id = %request.id, "[HandlerPipeline::store_and_release] {}", e);
                }
            }
            Err(e) => error!(id = %request.id, "[HandlerPipeline::store_and_release] serialize: {}", e),
        }

        flags::project(atom, request, SENDING_FLAG, false);
    }
}
