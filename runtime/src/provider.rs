//! Named client registry.
//!
//! A [`Provider`] is the wiring layer for hosts with several request
//! families: clients are installed once under a name and looked up where
//! operations are created, and an overlay implementation can be pushed to
//! every installed family at once.

use crate::client::Client;
use reqflow_core::capability::OverlayImplement;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Name used by [`Provider::install_default`] and [`Provider::default_client`].
pub const DEFAULT_CLIENT: &str = "default";

/// Registry of named [`Client`] families.
#[derive(Default)]
pub struct Provider {
    clients: RwLock<HashMap<String, Arc<Client>>>,
}

impl Provider {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `client` under `name`, replacing any previous entry.
    pub fn install(&self, name: impl Into<String>, client: Arc<Client>) {
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), client);
    }

    /// Install `client` as the default family.
    pub fn install_default(&self, client: Arc<Client>) {
        self.install(DEFAULT_CLIENT, client);
    }

    /// Look up an installed family.
    #[must_use]
    pub fn client(&self, name: &str) -> Option<Arc<Client>> {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// The default family, if installed.
    #[must_use]
    pub fn default_client(&self) -> Option<Arc<Client>> {
        self.client(DEFAULT_CLIENT)
    }

    /// Swap the overlay implementation of one installed family. Returns
    /// `false` when `name` is not installed.
    pub fn set_overlay_implement(&self, name: &str, implement: Arc<dyn OverlayImplement>) -> bool {
        match self.client(name) {
            Some(client) => {
                client.set_overlay_implement(implement);
                true
            }
            None => false,
        }
    }

    /// Push an overlay implementation to every installed family.
    pub fn set_overlay_implement_all(&self, implement: &Arc<dyn OverlayImplement>) {
        for client in self
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            client.set_overlay_implement(Arc::clone(implement));
        }
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        f.debug_struct("Provider").field("clients", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpTransport;

    #[test]
    fn install_and_lookup() {
        let provider = Provider::new();
        assert!(provider.default_client().is_none());

        let client = Client::builder(Arc::new(HttpTransport::new())).build();
        provider.install_default(Arc::clone(&client));
        provider.install("billing", client);

        assert!(provider.default_client().is_some());
        assert!(provider.client("billing").is_some());
        assert!(provider.client("missing").is_none());
    }
}
