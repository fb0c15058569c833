use serde::Deserialize;

/// Application configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    /// Layout configuration section
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Edge routing configuration section
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Temporal reconciliation configuration section
    #[serde(default)]
    pub temporal: TemporalConfig,
}

/// Layout configuration section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Width given to nodes without a `size` constraint
    pub default_node_width: f64,

    /// Height given to nodes without a `size` constraint
    pub default_node_height: f64,

    /// Minimum gap carried by every emitted positional constraint
    pub min_separation: f64,

    /// Abort on the first selector that fails to evaluate
    pub strict: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_node_width: 100.0,
            default_node_height: 60.0,
            min_separation: 15.0,
            strict: false,
        }
    }
}

/// Edge routing configuration section
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Largest gap at which two rectangles count as touching
    pub touch_epsilon: f32,

    /// Distance kept between a detour and the nodes it avoids
    pub clearance: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            touch_epsilon: 1.0,
            clearance: 20.0,
        }
    }
}

/// Temporal reconciliation configuration section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Name of the policy used by [`crate::LayoutBuilder::temporal_policy`]
    pub policy: String,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            policy: "baseline".to_string(),
        }
    }
}
