use std::sync::Arc;

use crate::Atom;
use crate::AtomConfig;
use crate::MockTransport;
use crate::Transport;

/// Builds an [`Atom`] for tests. Without a transport the context gets a
/// [`MockTransport`] with no expectations, so any network call fails the
/// test.
#[derive(Default)]
pub struct MockBuilder {
    pub settings: Option<AtomConfig>,
    pub transport: Option<Arc<dyn Transport>>,
}

impl MockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(
        mut self,
        settings: AtomConfig,
    ) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_transport(
        mut self,
        transport: MockTransport,
    ) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn with_shared_transport(
        mut self,
        transport: Arc<dyn Transport>,
    ) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build_atom(self) -> Atom {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(MockTransport::new()));
        Atom::new(self.settings.unwrap_or_default(), transport)
    }
}
