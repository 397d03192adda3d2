use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::abi::{calldata_selector, selector};
use crate::{Eip1193, ProviderError, ProviderEvent};

type Response = Result<Value, ProviderError>;
type Key = (String, Option<[u8; 4]>);

/// Scripted in-process provider for tests.
///
/// Only built under `cfg(test)` or the `test-util` feature; never wire it
/// into a running client.
///
/// Responses are keyed by method, optionally narrowed by the calldata
/// selector for `eth_call` / `eth_estimateGas`. A sequence is consumed in
/// order and its last entry sticks.
pub struct InMemoryProvider {
    label: String,
    responses: Mutex<HashMap<Key, VecDeque<Response>>>,
    calls: Mutex<Vec<(String, Value)>>,
    events: broadcast::Sender<ProviderEvent>,
    disconnected: AtomicBool,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            label: "in-memory".to_owned(),
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            events,
            disconnected: AtomicBool::new(false),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn word(value: u128) -> Value {
        Value::String(format!("0x{value:064x}"))
    }

    pub fn on(self, method: &str, response: Response) -> Self {
        self.on_sequence(method, vec![response])
    }

    pub fn on_sequence(mut self, method: &str, responses: Vec<Response>) -> Self {
        self.responses
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((method.to_owned(), None), responses.into());
        self
    }

    pub fn on_call(self, signature: &str, response: Response) -> Self {
        self.on_selector("eth_call", signature, response)
    }

    pub fn on_estimate(self, signature: &str, response: Response) -> Self {
        self.on_selector("eth_estimateGas", signature, response)
    }

    fn on_selector(mut self, method: &str, signature: &str, response: Response) -> Self {
        self.responses
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((method.to_owned(), Some(selector(signature))), VecDeque::from([response]));
        self
    }

    /// Replaces a method's response after the provider has been shared.
    pub fn set(&self, method: &str, response: Response) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((method.to_owned(), None), VecDeque::from([response]));
    }

    pub fn set_call(&self, signature: &str, response: Response) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(("eth_call".to_owned(), Some(selector(signature))), VecDeque::from([response]));
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls_for(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    pub fn was_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    fn next_response(&self, method: &str, params: &Value) -> Response {
        let narrowed = params
            .get(0)
            .and_then(|call| call.get("data"))
            .and_then(Value::as_str)
            .and_then(calldata_selector);

        let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        let key = narrowed
            .map(|sel| (method.to_owned(), Some(sel)))
            .filter(|key| responses.contains_key(key))
            .unwrap_or_else(|| (method.to_owned(), None));

        match responses.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::rpc(-32603, "empty response queue"))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ProviderError::rpc(-32603, "empty response queue"))),
            None => Err(ProviderError::rpc(-32601, format!("method not found: {method}"))),
        }
    }
}

#[async_trait]
impl Eip1193 for InMemoryProvider {
    fn label(&self) -> &str {
        &self.label
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let response = self.next_response(method, &params);
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((method.to_owned(), params));
        response
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        Some(self.events.subscribe())
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::encode_call;
    use serde_json::json;

    #[tokio::test]
    async fn selector_specific_response_wins() -> anyhow::Result<()> {
        let provider = InMemoryProvider::new()
            .on("eth_call", Ok(json!("0x")))
            .on_call("price()", Ok(InMemoryProvider::word(5)));

        let price = provider
            .request("eth_call", json!([{ "data": encode_call("price()", &[]) }, "latest"]))
            .await?;
        let other = provider
            .request("eth_call", json!([{ "data": encode_call("remaining()", &[]) }, "latest"]))
            .await?;

        assert_eq!(price, InMemoryProvider::word(5));
        assert_eq!(other, json!("0x"));
        assert_eq!(provider.calls_for("eth_call"), 2);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_method_is_rpc_error() {
        let err = InMemoryProvider::new()
            .request("eth_blockNumber", json!([]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(-32601));
    }
}
