use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use citegraph_core::config_file::GraphSection;

use crate::attributes::DEFAULT_HIGH_IMPACT_VENUES;

/// Layout hint passed to the renderer. Determines which layout tags
/// (`level`, `group`) nodes receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Force,
    Hierarchical,
    Circular,
}

impl Layout {
    pub fn as_str(self) -> &'static str {
        match self {
            Layout::Force => "force",
            Layout::Hierarchical => "hierarchical",
            Layout::Circular => "circular",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "force" | "spring" => Ok(Layout::Force),
            "hierarchical" | "tree" => Ok(Layout::Hierarchical),
            "circular" | "circle" => Ok(Layout::Circular),
            other => Err(format!(
                "unknown layout '{other}' (expected force, hierarchical or circular)"
            )),
        }
    }
}

/// Graph building configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphConfig {
    pub high_impact_venues: Vec<String>,
    pub layout: Layout,
    /// Year that recency is measured against.
    pub reference_year: i32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            high_impact_venues: DEFAULT_HIGH_IMPACT_VENUES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            layout: Layout::default(),
            reference_year: chrono::Local::now().year(),
        }
    }
}

impl GraphConfig {
    /// Apply a `[graph]` section from the on-disk config over the defaults.
    /// An unrecognized layout name is logged and ignored.
    pub fn from_section(section: &GraphSection) -> Self {
        let mut config = Self::default();
        if let Some(venues) = &section.high_impact_venues {
            config.high_impact_venues = venues.clone();
        }
        if let Some(layout) = &section.layout {
            match layout.parse() {
                Ok(l) => config.layout = l,
                Err(e) => tracing::warn!(error = %e, "ignoring configured layout"),
            }
        }
        if let Some(year) = section.reference_year {
            config.reference_year = year;
        }
        config
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = year;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_parsing() {
        assert_eq!("Hierarchical".parse::<Layout>(), Ok(Layout::Hierarchical));
        assert_eq!("circle".parse::<Layout>(), Ok(Layout::Circular));
        assert!("radial".parse::<Layout>().is_err());
    }

    #[test]
    fn from_section_overrides() {
        let section = GraphSection {
            high_impact_venues: Some(vec!["JMLR".into()]),
            layout: Some("circular".into()),
            reference_year: Some(2020),
        };
        let config = GraphConfig::from_section(&section);
        assert_eq!(config.high_impact_venues, vec!["JMLR".to_string()]);
        assert_eq!(config.layout, Layout::Circular);
        assert_eq!(config.reference_year, 2020);
    }

    #[test]
    fn bad_layout_keeps_default() {
        let section = GraphSection {
            layout: Some("radial".into()),
            ..Default::default()
        };
        assert_eq!(GraphConfig::from_section(&section).layout, Layout::Force);
    }
}
