//! EIP-6963 style provider discovery.
//!
//! The host broadcasts a request; every wallet that answers is announced into
//! the registry, which keeps announcement order for the connection picker.

use std::fmt;
use std::sync::Arc;

use anyhow::{Result, bail};
use mp_api_types::ProviderInfo;
use mp_chain_client::{Eip1193, JsonRpcHttp};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct ProviderDetail {
    pub info: ProviderInfo,
    pub transport: Arc<dyn Eip1193>,
}

impl fmt::Debug for ProviderDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDetail")
            .field("info", &self.info)
            .field("transport", &self.transport.label())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: Vec<ProviderDetail>,
}

impl ProviderRegistry {
    /// Appends unless a provider with the same uuid was already announced.
    pub fn announce(&mut self, detail: ProviderDetail) -> bool {
        if self.providers.iter().any(|p| p.info.uuid == detail.info.uuid) {
            return false;
        }
        info!(name = %detail.info.name, rdns = %detail.info.rdns, "wallet provider announced");
        self.providers.push(detail);
        true
    }

    pub fn providers(&self) -> &[ProviderDetail] {
        &self.providers
    }

    pub fn get(&self, index: usize) -> Option<&ProviderDetail> {
        self.providers.get(index)
    }

    pub fn first(&self) -> Option<&ProviderDetail> {
        self.providers.first()
    }

    pub fn find_by_rdns(&self, rdns: &str) -> Option<&ProviderDetail> {
        self.providers.iter().find(|p| p.info.rdns == rdns)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// A wallet reachable as EIP-1193 over HTTP, e.g. a desktop wallet's local port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedEndpoint {
    pub name: String,
    pub url: String,
}

impl InjectedEndpoint {
    /// Accepts `name=url` or a bare url.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (name, url) = match raw.split_once('=') {
            Some((name, url)) => (name.trim().to_owned(), url.trim().to_owned()),
            None => ("Browser Wallet".to_owned(), raw.to_owned()),
        };
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("injected wallet endpoint must be an http(s) url: {raw}");
        }
        Ok(Self { name, url })
    }

    fn rdns(&self) -> String {
        let host = self
            .url
            .split("://")
            .nth(1)
            .and_then(|rest| rest.split(['/', ':']).next())
            .unwrap_or_default();
        let mut labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
        labels.reverse();
        labels.join(".")
    }
}

struct Candidate {
    info: ProviderInfo,
    transport: Arc<dyn Eip1193>,
}

/// Answers discovery requests on behalf of the configured wallets.
#[derive(Default)]
pub struct DiscoveryService {
    candidates: Vec<Candidate>,
}

impl DiscoveryService {
    pub fn from_endpoints(endpoints: &[InjectedEndpoint]) -> Result<Self> {
        let mut service = Self::default();
        for endpoint in endpoints {
            let transport = JsonRpcHttp::with_label(endpoint.name.clone(), endpoint.url.clone())?;
            service.add_candidate(&endpoint.name, &endpoint.rdns(), Arc::new(transport));
        }
        Ok(service)
    }

    pub fn add_candidate(&mut self, name: &str, rdns: &str, transport: Arc<dyn Eip1193>) {
        self.candidates.push(Candidate {
            info: ProviderInfo {
                uuid: Uuid::new_v4().to_string(),
                name: name.to_owned(),
                icon: String::new(),
                rdns: rdns.to_owned(),
            },
            transport,
        });
    }

    /// Broadcasts a provider request; every candidate that answers
    /// `eth_chainId` announces itself. Returns the number of new announcements.
    pub async fn request_providers(&self, registry: &mut ProviderRegistry) -> usize {
        let mut announced = 0;
        for candidate in &self.candidates {
            match candidate.transport.request("eth_chainId", json!([])).await {
                Ok(_) => {
                    let detail = ProviderDetail {
                        info: candidate.info.clone(),
                        transport: Arc::clone(&candidate.transport),
                    };
                    if registry.announce(detail) {
                        announced += 1;
                    }
                }
                Err(err) => debug!("wallet '{}' did not answer discovery: {}", candidate.info.name, err),
            }
        }
        announced
    }
}
