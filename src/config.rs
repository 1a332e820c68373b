//! Scenario configuration loaded from TOML.
//!
//! ```toml
//! wireless = true
//!
//! [node]
//! communication-range = 60.0
//! sensing-range = 20.0
//!
//! [resolver]
//! kind = "toroidal"
//! width = 400.0
//! height = 300.0
//!
//! [messaging]
//! mode = "async"
//! mean-delay = 3.0
//! order = "non_fifo"
//! seed = 7
//! ```
//!
//! Every section is optional; missing values fall back to the defaults
//! of a fresh [`Topology`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{AsyncMessageEngine, DeliveryOrder, SyncMessageEngine};
use crate::error::{SimError, SimResult};
use crate::node::{Node, DEFAULT_COMMUNICATION_RANGE, DEFAULT_SENSING_RANGE};
use crate::resolver::{EuclideanResolver, ToroidalResolver};
use crate::topology::Topology;

/// Top-level scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Derive wireless links from the resolver.
    pub wireless: bool,
    pub node: NodeDefaults,
    pub resolver: ResolverConfig,
    pub messaging: MessagingConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            wireless: true,
            node: NodeDefaults::default(),
            resolver: ResolverConfig::default(),
            messaging: MessagingConfig::default(),
        }
    }
}

/// Values applied to nodes created from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct NodeDefaults {
    pub communication_range: f64,
    pub sensing_range: f64,
    pub wireless: bool,
}

impl Default for NodeDefaults {
    fn default() -> Self {
        NodeDefaults {
            communication_range: DEFAULT_COMMUNICATION_RANGE,
            sensing_range: DEFAULT_SENSING_RANGE,
            wireless: true,
        }
    }
}

impl NodeDefaults {
    /// A passive node carrying these defaults.
    pub fn node(&self) -> Node {
        Node::new()
            .with_communication_range(self.communication_range)
            .with_sensing_range(self.sensing_range)
            .with_wireless(self.wireless)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolverConfig {
    #[default]
    Euclidean,
    Toroidal { width: f64, height: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MessagingConfig {
    #[default]
    Sync,
    Async {
        #[serde(rename = "mean-delay")]
        mean_delay: f64,
        #[serde(default)]
        order: DeliveryOrder,
        #[serde(default)]
        seed: u64,
    },
}

impl SimulationConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> SimResult<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SimError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject values no topology could run with.
    pub fn validate(&self) -> SimResult<()> {
        let node = &self.node;
        if !(node.communication_range.is_finite() && node.communication_range >= 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "communication range must be finite and non-negative, got {}",
                node.communication_range
            )));
        }
        if !(node.sensing_range.is_finite() && node.sensing_range >= 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "sensing range must be finite and non-negative, got {}",
                node.sensing_range
            )));
        }
        if let ResolverConfig::Toroidal { width, height } = self.resolver {
            ToroidalResolver::new(width, height)?;
        }
        if let MessagingConfig::Async { mean_delay, order, seed } = self.messaging {
            AsyncMessageEngine::new(mean_delay, order, seed)?;
        }
        Ok(())
    }

    /// Install this configuration's policies on `topology`.
    ///
    /// Sets the resolver, the message engine and the wireless flag. Node
    /// defaults only affect nodes created through [`NodeDefaults::node`].
    pub fn apply(&self, topology: &mut Topology) -> SimResult<()> {
        self.validate()?;
        match self.resolver {
            ResolverConfig::Euclidean => topology.set_link_resolver(EuclideanResolver),
            ResolverConfig::Toroidal { width, height } => {
                topology.set_link_resolver(ToroidalResolver::new(width, height)?)
            }
        }
        match self.messaging {
            MessagingConfig::Sync => topology.set_message_engine(SyncMessageEngine::new()),
            MessagingConfig::Async { mean_delay, order, seed } => {
                topology.set_message_engine(AsyncMessageEngine::new(mean_delay, order, seed)?)
            }
        }
        if self.wireless {
            topology.enable_wireless()?;
        } else {
            topology.disable_wireless()?;
        }
        debug!(wireless = self.wireless, resolver = ?self.resolver, messaging = ?self.messaging, "configuration applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert!(config.wireless);
        assert_eq!(config.resolver, ResolverConfig::Euclidean);
        assert_eq!(config.messaging, MessagingConfig::Sync);
    }

    #[test]
    fn test_full_document() {
        let config = SimulationConfig::from_toml_str(
            r#"
            wireless = false

            [node]
            communication-range = 60.0
            sensing-range = 20.0

            [resolver]
            kind = "toroidal"
            width = 400.0
            height = 300.0

            [messaging]
            mode = "async"
            mean-delay = 3.0
            order = "non_fifo"
            seed = 7
            "#,
        )
        .unwrap();

        assert!(!config.wireless);
        assert_eq!(config.node.communication_range, 60.0);
        assert_eq!(config.node.sensing_range, 20.0);
        assert!(config.node.wireless);
        assert_eq!(config.resolver, ResolverConfig::Toroidal { width: 400.0, height: 300.0 });
        assert_eq!(
            config.messaging,
            MessagingConfig::Async { mean_delay: 3.0, order: DeliveryOrder::NonFifo, seed: 7 }
        );
    }

    #[test]
    fn test_async_defaults_to_fifo() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [messaging]
            mode = "async"
            mean-delay = 2.5
            "#,
        )
        .unwrap();
        assert_eq!(
            config.messaging,
            MessagingConfig::Async { mean_delay: 2.5, order: DeliveryOrder::Fifo, seed: 0 }
        );
    }

    #[test]
    fn test_parse_errors() {
        let err = SimulationConfig::from_toml_str("wireless = ").unwrap_err();
        assert!(matches!(err, SimError::ConfigParse(_)));

        let err = SimulationConfig::from_toml_str("speed = 3").unwrap_err();
        assert!(matches!(err, SimError::ConfigParse(_)));

        let err = SimulationConfig::from_toml_str("[resolver]\nkind = \"hexagonal\"").unwrap_err();
        assert!(matches!(err, SimError::ConfigParse(_)));
    }

    #[test]
    fn test_validation_errors() {
        let err = SimulationConfig::from_toml_str("[node]\ncommunication-range = -1.0").unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));

        let err = SimulationConfig::from_toml_str(
            "[resolver]\nkind = \"toroidal\"\nwidth = 0.0\nheight = 10.0",
        )
        .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));

        let err = SimulationConfig::from_toml_str("[messaging]\nmode = \"async\"\nmean-delay = 0.0")
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SimulationConfig::load(Path::new("/nonexistent/topsim.toml")).unwrap_err();
        assert!(matches!(err, SimError::ConfigRead { .. }));
        assert!(err.to_string().contains("/nonexistent/topsim.toml"));
    }

    #[test]
    fn test_bundled_scenario_parses() {
        let config = SimulationConfig::from_toml_str(include_str!("../scenarios/random_walk.toml")).unwrap();
        assert!(config.wireless);
        assert!(matches!(config.messaging, MessagingConfig::Async { .. }));
    }

    #[test]
    fn test_apply_installs_policies() {
        let config = SimulationConfig {
            wireless: false,
            resolver: ResolverConfig::Toroidal { width: 100.0, height: 100.0 },
            messaging: MessagingConfig::Async { mean_delay: 2.0, order: DeliveryOrder::Fifo, seed: 1 },
            ..SimulationConfig::default()
        };
        let mut topo = Topology::new();
        config.apply(&mut topo).unwrap();
        assert!(!topo.is_wireless_enabled());
        assert_eq!(topo.link_resolver().name(), "toroidal");
        assert!(topo.message_engine_as::<AsyncMessageEngine>().is_some());
    }

    #[test]
    fn test_node_defaults_template() {
        let defaults = NodeDefaults { communication_range: 42.0, sensing_range: 7.0, wireless: false };
        let node = defaults.node();
        assert_eq!(node.communication_range(), 42.0);
        assert_eq!(node.sensing_range(), 7.0);
        assert!(!node.is_wireless_enabled());
    }
}
