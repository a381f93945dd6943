//! Tagger Configuration Management
//!
//! Handles configuration from environment variables and config files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::lexicon::DEFAULT_PARTICLES;

/// Placeholder replaced with the token's position inside its occurrence
pub const ID_PLACEHOLDER: &str = "!!ID!!";

/// Main tagger configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TaggerConfig {
    /// Marker templates for the marked-up text
    pub markers: MarkerConfig,

    /// Word list locations
    pub lexicon: LexiconConfig,

    /// Token and tag rating weights
    pub rating: RatingConfig,

    /// Entity matching policy
    pub matching: MatchingConfig,

    /// Linked-data store connection
    pub linked_data: LinkedDataConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl TaggerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Markers
        if let Ok(start) = std::env::var("TAGGER_MARK_START") {
            config.markers.start_template = start;
        }
        if let Ok(end) = std::env::var("TAGGER_MARK_END") {
            config.markers.end_template = end;
        }

        // Word lists
        if let Ok(path) = std::env::var("TAGGER_STOPWORDS") {
            config.lexicon.stop_word_list_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("TAGGER_INITWORDS") {
            config.lexicon.init_word_list_path = Some(PathBuf::from(path));
        }
        if let Ok(particles) = std::env::var("TAGGER_PARTICLES") {
            config.lexicon.particles = particles
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Matching
        if let Ok(policy) = std::env::var("TAGGER_STOPWORD_POLICY") {
            config.matching.stop_word_policy = policy.parse()?;
        }

        // Linked data
        if let Ok(url) = std::env::var("TAGGER_LINKED_DATA_URL") {
            config.linked_data.database_url = Some(url);
        }
        if let Ok(table) = std::env::var("TAGGER_LINKED_DATA_TABLE") {
            config.linked_data.table = table;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = Self::default();

        // Each marker template on its own
        if std::env::var_os("TAGGER_MARK_START").is_some() {
            self.markers.start_template = env_config.markers.start_template;
        }
        if std::env::var_os("TAGGER_MARK_END").is_some() {
            self.markers.end_template = env_config.markers.end_template;
        }

        // Only override if env values differ from defaults
        if env_config.lexicon.stop_word_list_path.is_some() {
            self.lexicon.stop_word_list_path = env_config.lexicon.stop_word_list_path;
        }
        if env_config.lexicon.init_word_list_path.is_some() {
            self.lexicon.init_word_list_path = env_config.lexicon.init_word_list_path;
        }
        if env_config.lexicon.particles != defaults.lexicon.particles {
            self.lexicon.particles = env_config.lexicon.particles;
        }
        if env_config.matching.stop_word_policy != defaults.matching.stop_word_policy {
            self.matching.stop_word_policy = env_config.matching.stop_word_policy;
        }

        // Always use env for connection values
        if env_config.linked_data.database_url.is_some() {
            self.linked_data.database_url = env_config.linked_data.database_url;
        }
        if env_config.linked_data.table != defaults.linked_data.table {
            self.linked_data.table = env_config.linked_data.table;
        }
        if env_config.logging.level != defaults.logging.level {
            self.logging.level = env_config.logging.level;
        }

        Ok(self)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.markers.start_template.is_empty() {
            return Err(ConfigError::MissingRequired(
                "markers.start_template".to_string(),
            ));
        }
        if self.markers.end_template.is_empty() {
            return Err(ConfigError::MissingRequired(
                "markers.end_template".to_string(),
            ));
        }

        let weights = [
            ("rating.position_weight", self.rating.position_weight),
            ("rating.case_weight", self.rating.case_weight),
            ("rating.stop_word_penalty", self.rating.stop_word_penalty),
            ("rating.structural_weight", self.rating.structural_weight),
        ];
        for (key, value) in weights {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }

        if self.matching.min_unmatched_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                key: "matching.min_unmatched_tokens".to_string(),
                value: "0".to_string(),
            });
        }

        if !is_sql_identifier(&self.linked_data.table) {
            return Err(ConfigError::InvalidValue {
                key: "linked_data.table".to_string(),
                value: self.linked_data.table.clone(),
            });
        }

        Ok(())
    }
}

/// Letters, digits and underscores, not starting with a digit
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Marker templates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MarkerConfig {
    /// Text inserted before a matched token
    pub start_template: String,

    /// Text inserted after a matched token
    pub end_template: String,

    /// Substitute `!!ID!!` in the start template
    pub id_placeholder_enabled: bool,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            start_template: format!("<span class=\"tagr-item\" data-part=\"{ID_PLACEHOLDER}\">"),
            end_template: "</span>".to_string(),
            id_placeholder_enabled: true,
        }
    }
}

/// Word list configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LexiconConfig {
    /// Stop words, one per line (built-in Danish list when unset)
    pub stop_word_list_path: Option<PathBuf>,

    /// Name prefixes and infixes
    pub particles: Vec<String>,

    /// Words capitalized only because they open a sentence
    pub init_word_list_path: Option<PathBuf>,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            stop_word_list_path: None,
            particles: DEFAULT_PARTICLES.iter().map(|p| p.to_string()).collect(),
            init_word_list_path: None,
        }
    }
}

/// Rating weights
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RatingConfig {
    /// Weight of the lead-bias position score
    pub position_weight: f32,

    /// Bonus weight for capitalized tokens
    pub case_weight: f32,

    /// Penalty subtracted from stop words
    pub stop_word_penalty: f32,

    /// Weight of markup emphasis
    pub structural_weight: f32,

    /// How token ratings combine into a tag rating
    pub combinator: TagRatingCombinator,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            position_weight: 1.0,
            case_weight: 1.0,
            stop_word_penalty: 5.0,
            structural_weight: 0.5,
            combinator: TagRatingCombinator::Mean,
        }
    }
}

/// Combinator from token ratings to a tag rating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagRatingCombinator {
    Max,
    #[default]
    Mean,
}

impl TagRatingCombinator {
    /// Combine ratings; zero for an empty input
    pub fn combine(&self, ratings: impl IntoIterator<Item = f32>) -> f32 {
        let mut count = 0usize;
        let mut acc: Option<f32> = None;
        for rating in ratings {
            count += 1;
            acc = Some(match (self, acc) {
                (_, None) => rating,
                (Self::Max, Some(best)) => best.max(rating),
                (Self::Mean, Some(sum)) => sum + rating,
            });
        }
        match (self, acc) {
            (_, None) => 0.0,
            (Self::Max, Some(best)) => best,
            (Self::Mean, Some(sum)) => sum / count as f32,
        }
    }
}

impl std::str::FromStr for TagRatingCombinator {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "max" => Ok(Self::Max),
            "mean" => Ok(Self::Mean),
            _ => Err(ConfigError::InvalidValue {
                key: "rating.combinator".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Entity matching configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MatchingConfig {
    /// Whether stop words may form or join a match
    pub stop_word_policy: StopWordPolicy,

    /// Minimum capitalized tokens in an unmatched candidate
    pub min_unmatched_tokens: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            stop_word_policy: StopWordPolicy::ExcludeStandalone,
            min_unmatched_tokens: 2,
        }
    }
}

/// How stop words interact with vocabulary matches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopWordPolicy {
    /// A span made only of stop words never matches
    #[default]
    ExcludeStandalone,
    /// Any stop word in a span (other than an attached particle) rejects it
    ExcludeAny,
    /// Vocabulary entries match regardless of stop words
    VocabularyWins,
}

impl std::str::FromStr for StopWordPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exclude_standalone" => Ok(Self::ExcludeStandalone),
            "exclude_any" => Ok(Self::ExcludeAny),
            "vocabulary_wins" => Ok(Self::VocabularyWins),
            _ => Err(ConfigError::InvalidValue {
                key: "TAGGER_STOPWORD_POLICY".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Linked-data store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LinkedDataConfig {
    /// PostgreSQL connection URL
    pub database_url: Option<String>,

    /// Table holding `tid`, `dstid`, `uri` rows
    pub table: String,

    /// Connection pool size
    pub pool_size: u32,

    /// Destination id → source name
    pub sources: Vec<LinkedDataSource>,
}

impl LinkedDataConfig {
    /// Source name configured for a destination id
    pub fn source_name(&self, destination_id: i64) -> Option<&str> {
        self.sources
            .iter()
            .find(|s| s.destination_id == destination_id)
            .map(|s| s.name.as_str())
    }
}

impl Default for LinkedDataConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            table: "linked_data".to_string(),
            pool_size: 5,
            sources: Vec::new(),
        }
    }
}

/// A named linked-data destination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkedDataSource {
    pub destination_id: i64,
    pub name: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TaggerConfig::default();
        assert!(config.markers.start_template.contains(ID_PLACEHOLDER));
        assert_eq!(config.markers.end_template, "</span>");
        assert_eq!(config.lexicon.particles.len(), 10);
        assert_eq!(config.rating.combinator, TagRatingCombinator::Mean);
        assert_eq!(
            config.matching.stop_word_policy,
            StopWordPolicy::ExcludeStandalone
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[markers]
start_template = "<mark>"
end_template = "</mark>"
id_placeholder_enabled = false

[rating]
combinator = "max"

[[linked_data.sources]]
destination_id = 1
name = "dbpedia"

[[linked_data.sources]]
destination_id = 2
name = "geonames"
"#
        )
        .unwrap();

        let config = TaggerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.markers.start_template, "<mark>");
        assert!(!config.markers.id_placeholder_enabled);
        assert_eq!(config.rating.combinator, TagRatingCombinator::Max);
        assert_eq!(config.rating.stop_word_penalty, 5.0);
        assert_eq!(config.linked_data.source_name(2), Some("geonames"));
        assert_eq!(config.linked_data.source_name(3), None);
        assert_eq!(config.linked_data.table, "linked_data");
    }

    #[test]
    fn test_env_override_keeps_file_markers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[markers]
start_template = "<mark>"
end_template = "</mark>"
id_placeholder_enabled = false

[linked_data]
table = "lod"
"#
        )
        .unwrap();

        std::env::set_var("TAGGER_MARK_START", "<em>");
        let config = TaggerConfig::from_file(file.path())
            .and_then(TaggerConfig::with_env_override);
        std::env::remove_var("TAGGER_MARK_START");
        let config = config.unwrap();

        assert_eq!(config.markers.start_template, "<em>");
        assert_eq!(config.markers.end_template, "</mark>");
        assert!(!config.markers.id_placeholder_enabled);
        assert_eq!(config.linked_data.table, "lod");
    }

    #[test]
    fn test_from_file_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "markers = 3").unwrap();
        let err = TaggerConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_table() {
        let mut config = TaggerConfig::default();
        config.linked_data.table = "lod; DROP TABLE x".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_nan_weight() {
        let mut config = TaggerConfig::default();
        config.rating.case_weight = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_marker() {
        let mut config = TaggerConfig::default();
        config.markers.end_template.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_combinator() {
        let ratings = [1.0, 3.0, 2.0];
        assert_eq!(TagRatingCombinator::Max.combine(ratings), 3.0);
        assert_eq!(TagRatingCombinator::Mean.combine(ratings), 2.0);
        assert_eq!(TagRatingCombinator::Mean.combine(std::iter::empty()), 0.0);
        assert_eq!(TagRatingCombinator::Max.combine([-2.0, -1.0]), -1.0);
    }

    #[test]
    fn test_enum_parse() {
        assert_eq!(
            "MAX".parse::<TagRatingCombinator>().unwrap(),
            TagRatingCombinator::Max
        );
        assert_eq!(
            "vocabulary_wins".parse::<StopWordPolicy>().unwrap(),
            StopWordPolicy::VocabularyWins
        );
        assert!("sometimes".parse::<StopWordPolicy>().is_err());
    }

    #[test]
    fn test_sql_identifier() {
        assert!(is_sql_identifier("linked_data"));
        assert!(is_sql_identifier("_lod2"));
        assert!(!is_sql_identifier("2lod"));
        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier("lod.table"));
    }
}
