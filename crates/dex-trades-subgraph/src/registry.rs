use std::collections::BTreeMap;

use crate::adapter::ProtocolAdapter;
use crate::config::SubgraphConfig;
use crate::curve::CurveAdapter;
use crate::error::SubgraphError;
use crate::protocol::Protocol;
use crate::sushiswap::SushiswapAdapter;
use crate::uniswap::UniswapAdapter;

/// Adapters keyed by protocol. Built once and shared by every request.
pub struct ProtocolRegistry {
    adapters: BTreeMap<Protocol, Box<dyn ProtocolAdapter>>,
}

impl ProtocolRegistry {
    /// All supported protocols, pointed at the configured endpoints.
    pub fn new(config: &SubgraphConfig) -> Self {
        let mut registry = Self {
            adapters: BTreeMap::new(),
        };
        registry.register(Box::new(CurveAdapter::new(config.endpoint(Protocol::Curve))));
        registry.register(Box::new(UniswapAdapter::new(config.endpoint(Protocol::Uniswap))));
        registry.register(Box::new(SushiswapAdapter::new(
            config.endpoint(Protocol::Sushiswap),
        )));
        registry
    }

    /// Add or replace the adapter for its protocol.
    pub fn register(&mut self, adapter: Box<dyn ProtocolAdapter>) {
        self.adapters.insert(adapter.protocol(), adapter);
    }

    pub fn get(&self, protocol: Protocol) -> Result<&dyn ProtocolAdapter, SubgraphError> {
        self.adapters
            .get(&protocol)
            .map(|adapter| adapter.as_ref())
            .ok_or_else(|| SubgraphError::Config(format!("no adapter registered for {protocol}")))
    }

    /// Resolve a case-insensitive alias such as `uni` or `Sushi` to its adapter.
    pub fn resolve(&self, alias: &str) -> Result<&dyn ProtocolAdapter, SubgraphError> {
        self.get(Protocol::from_alias(alias)?)
    }

    pub fn protocols(&self) -> impl Iterator<Item = Protocol> + '_ {
        self.adapters.keys().copied()
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::new(&SubgraphConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_protocol() {
        let registry = ProtocolRegistry::default();
        assert_eq!(registry.resolve("c").unwrap().protocol(), Protocol::Curve);
        assert_eq!(registry.resolve("UniSwap").unwrap().protocol(), Protocol::Uniswap);
        assert_eq!(registry.resolve("sushi").unwrap().protocol(), Protocol::Sushiswap);
        assert_eq!(registry.protocols().collect::<Vec<_>>(), Protocol::ALL.to_vec());
    }

    #[test]
    fn adapters_use_configured_endpoints() {
        let config = SubgraphConfig::default()
            .with_endpoint(Protocol::Curve, "http://localhost:8000/curve".to_string());
        let registry = ProtocolRegistry::new(&config);
        assert_eq!(
            registry.get(Protocol::Curve).unwrap().endpoint(),
            "http://localhost:8000/curve"
        );
        assert!(registry.get(Protocol::Uniswap).unwrap().endpoint().contains("uniswap-v3"));
    }

    #[test]
    fn unknown_alias_is_invalid_argument() {
        let registry = ProtocolRegistry::default();
        assert!(matches!(
            registry.resolve("pancake"),
            Err(SubgraphError::InvalidArgument(_))
        ));
    }
}
