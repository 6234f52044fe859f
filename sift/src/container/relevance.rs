//! Relevance tuning applied to full-text queries
//!
//! The effective configuration is layered: engine default, then the request
//! type's override, then the catalog's override. Every override field is
//! optional and replaces only what it sets.

use crate::query::Fuzziness;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceConfiguration {
    #[serde(default)]
    pub fulltext: FulltextConfiguration,
    #[serde(default)]
    pub phrase_match: PhraseMatchConfiguration,
    #[serde(default = "default_cutoff_frequency")]
    pub cutoff_frequency: f64,
    #[serde(default)]
    pub fuzziness: FuzzinessConfiguration,
    #[serde(default)]
    pub phonetic: PhoneticConfiguration,
}

impl Default for RelevanceConfiguration {
    fn default() -> Self {
        Self {
            fulltext: FulltextConfiguration::default(),
            phrase_match: PhraseMatchConfiguration::default(),
            cutoff_frequency: default_cutoff_frequency(),
            fuzziness: FuzzinessConfiguration::default(),
            phonetic: PhoneticConfiguration::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulltextConfiguration {
    #[serde(default = "default_minimum_should_match")]
    pub minimum_should_match: String,
    #[serde(default = "default_tie_breaker")]
    pub tie_breaker: f32,
}

impl Default for FulltextConfiguration {
    fn default() -> Self {
        Self {
            minimum_should_match: default_minimum_should_match(),
            tie_breaker: default_tie_breaker(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseMatchConfiguration {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_phrase_boost")]
    pub boost: f32,
}

impl Default for PhraseMatchConfiguration {
    fn default() -> Self {
        Self {
            enabled: false,
            boost: default_phrase_boost(),
        }
    }
}

/// Fuzzy matching on spellchecked fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzinessConfiguration {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_fuzziness")]
    pub value: Fuzziness,
    #[serde(default = "default_prefix_length")]
    pub prefix_length: u32,
    #[serde(default = "default_max_expansions")]
    pub max_expansions: u32,
}

impl Default for FuzzinessConfiguration {
    fn default() -> Self {
        Self {
            enabled: false,
            value: default_fuzziness(),
            prefix_length: default_prefix_length(),
            max_expansions: default_max_expansions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhoneticConfiguration {
    #[serde(default)]
    pub enabled: bool,
}

fn default_cutoff_frequency() -> f64 {
    0.15
}

fn default_minimum_should_match() -> String {
    "100%".to_string()
}

fn default_tie_breaker() -> f32 {
    1.0
}

fn default_phrase_boost() -> f32 {
    10.0
}

fn default_fuzziness() -> Fuzziness {
    Fuzziness::Auto
}

fn default_prefix_length() -> u32 {
    1
}

fn default_max_expansions() -> u32 {
    10
}

/// One layer of relevance tuning; unset fields fall through
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelevanceOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tie_breaker: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phrase_match_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phrase_match_boost: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff_frequency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness: Option<Fuzziness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness_prefix_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness_max_expansions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic_enabled: Option<bool>,
}

impl RelevanceConfiguration {
    /// Apply one override layer on top of this configuration
    pub fn layer(mut self, layer: &RelevanceOverride) -> Self {
        if let Some(msm) = &layer.minimum_should_match {
            self.fulltext.minimum_should_match = msm.clone();
        }
        if let Some(tie_breaker) = layer.tie_breaker {
            self.fulltext.tie_breaker = tie_breaker;
        }
        if let Some(enabled) = layer.phrase_match_enabled {
            self.phrase_match.enabled = enabled;
        }
        if let Some(boost) = layer.phrase_match_boost {
            self.phrase_match.boost = boost;
        }
        if let Some(cutoff) = layer.cutoff_frequency {
            self.cutoff_frequency = cutoff;
        }
        if let Some(enabled) = layer.fuzziness_enabled {
            self.fuzziness.enabled = enabled;
        }
        if let Some(value) = layer.fuzziness {
            self.fuzziness.value = value;
        }
        if let Some(prefix_length) = layer.fuzziness_prefix_length {
            self.fuzziness.prefix_length = prefix_length;
        }
        if let Some(max_expansions) = layer.fuzziness_max_expansions {
            self.fuzziness.max_expansions = max_expansions;
        }
        if let Some(enabled) = layer.phonetic_enabled {
            self.phonetic.enabled = enabled;
        }
        self
    }

    pub fn layered<'a>(self, layers: impl IntoIterator<Item = &'a RelevanceOverride>) -> Self {
        layers.into_iter().fold(self, |acc, layer| acc.layer(layer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let relevance = RelevanceConfiguration::default();
        assert_eq!(relevance.fulltext.minimum_should_match, "100%");
        assert_eq!(relevance.fulltext.tie_breaker, 1.0);
        assert_eq!(relevance.cutoff_frequency, 0.15);
        assert_eq!(relevance.phrase_match.boost, 10.0);
        assert!(!relevance.fuzziness.enabled);
        assert_eq!(relevance.fuzziness.value, Fuzziness::Auto);
        assert_eq!(relevance.fuzziness.prefix_length, 1);
        assert_eq!(relevance.fuzziness.max_expansions, 10);
    }

    #[test]
    fn test_layers_apply_in_order() {
        let request = RelevanceOverride {
            fuzziness_enabled: Some(true),
            fuzziness: Some(Fuzziness::Edits(1)),
            tie_breaker: Some(0.5),
            ..Default::default()
        };
        let catalog = RelevanceOverride {
            fuzziness: Some(Fuzziness::Edits(2)),
            ..Default::default()
        };

        let relevance = RelevanceConfiguration::default().layered([&request, &catalog]);
        assert!(relevance.fuzziness.enabled);
        assert_eq!(relevance.fuzziness.value, Fuzziness::Edits(2));
        assert_eq!(relevance.fulltext.tie_breaker, 0.5);
        assert_eq!(relevance.fulltext.minimum_should_match, "100%");
    }

    #[test]
    fn test_decode_partial_toml() {
        let relevance: RelevanceConfiguration = toml::from_str(
            r#"
            cutoff_frequency = 0.2
            [fuzziness]
            enabled = true
            value = 1
            "#,
        )
        .unwrap();
        assert_eq!(relevance.cutoff_frequency, 0.2);
        assert_eq!(relevance.fuzziness.value, Fuzziness::Edits(1));
        assert_eq!(relevance.fuzziness.max_expansions, 10);
        assert_eq!(relevance.fulltext.minimum_should_match, "100%");
    }
}
