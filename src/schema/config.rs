//! Configuration types for NK landscape evolution runs.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration. Field names follow snake_case, and the upper-case option
//! names of the legacy NK/OEE configuration format (`N`, `K`, `POP_SIZE`,
//! `MUT_RATE`, ...) are accepted as aliases within their sections. Unknown
//! keys are rejected.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Largest supported epistasis degree.
pub const MAX_EPISTASIS: usize = 23;

/// Largest contribution table (`N * 2^(K+1)` entries, 512 MiB of `f64`).
pub const MAX_TABLE_ENTRIES: usize = 1 << 26;

/// Top-level run configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// NK landscape shape.
    #[serde(default)]
    pub landscape: LandscapeConfig,
    /// Population size, run length and mutation.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Selection scheme and its parameters.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Changing-environment settings.
    #[serde(default)]
    pub environment: EnvironmentConfig,
    /// Open-ended evolution (MODES) metric settings.
    #[serde(default)]
    pub oee: OeeConfig,
    /// Data file settings.
    #[serde(default)]
    pub output: OutputConfig,
    /// Random number seed (0 for a seed based on the current time).
    #[serde(default, alias = "SEED")]
    pub seed: u64,
}

/// NK landscape parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LandscapeConfig {
    /// Number of bits in each genome (must be > K).
    #[serde(default = "default_n", alias = "N", alias = "GENOME_SIZE")]
    pub n: usize,
    /// Level of epistasis.
    #[serde(default = "default_k", alias = "K")]
    pub k: usize,
}

impl Default for LandscapeConfig {
    fn default() -> Self {
        Self {
            n: default_n(),
            k: default_k(),
        }
    }
}

fn default_n() -> usize {
    200
}
fn default_k() -> usize {
    10
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulationConfig {
    /// Number of organisms in the population.
    #[serde(default = "default_population_size", alias = "POP_SIZE")]
    pub size: usize,
    /// How many generations to process.
    #[serde(default = "default_max_generations", alias = "MAX_GENS")]
    pub max_generations: u64,
    /// Probability of each site being mutated.
    #[serde(default = "default_mutation_rate", alias = "MUT_RATE")]
    pub mutation_rate: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            mutation_rate: default_mutation_rate(),
        }
    }
}

fn default_population_size() -> usize {
    1000
}
fn default_max_generations() -> u64 {
    2000
}
fn default_mutation_rate() -> f64 {
    0.005
}

/// Selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionConfig {
    /// Selection scheme.
    #[serde(default, alias = "SELECTION")]
    pub scheme: SelectionScheme,
    /// Number of individuals drawn into each tournament.
    #[serde(default = "default_tournament_size", alias = "TOURNAMENT_SIZE")]
    pub tournament_size: usize,
    /// Hamming distance below which individuals compete under fitness sharing.
    #[serde(default = "default_sharing_threshold", alias = "SHARING_THRESHOLD")]
    pub sharing_threshold: f64,
    /// Shape of the sharing kernel.
    #[serde(default = "default_sharing_alpha", alias = "SHARING_ALPHA")]
    pub sharing_alpha: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            scheme: SelectionScheme::default(),
            tournament_size: default_tournament_size(),
            sharing_threshold: default_sharing_threshold(),
            sharing_alpha: default_sharing_alpha(),
        }
    }
}

fn default_tournament_size() -> usize {
    2
}
fn default_sharing_threshold() -> f64 {
    50.0
}
fn default_sharing_alpha() -> f64 {
    1.0
}

/// Changing-environment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Generations between environment changes (0 disables changes).
    #[serde(default = "default_change_rate", alias = "CHANGE_RATE")]
    pub change_rate: u64,
    /// What happens when the environment changes.
    #[serde(default, alias = "CHANGE_TYPE")]
    pub change_type: ChangeType,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            change_rate: default_change_rate(),
            change_type: ChangeType::default(),
        }
    }
}

fn default_change_rate() -> u64 {
    100_000
}

/// Open-ended evolution metric settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OeeConfig {
    /// Generations between OEE evaluations.
    #[serde(default = "default_resolution", alias = "MODES_RESOLUTION")]
    pub resolution: u64,
    /// Generations a lineage must persist before it counts.
    #[serde(default = "default_filter_length", alias = "FILTER_LENGTH")]
    pub filter_length: u64,
    /// What makes an offspring belong to its parent's taxon.
    #[serde(default)]
    pub taxon_identity: TaxonIdentity,
}

impl Default for OeeConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            filter_length: default_filter_length(),
            taxon_identity: TaxonIdentity::default(),
        }
    }
}

fn default_resolution() -> u64 {
    1
}
fn default_filter_length() -> u64 {
    1000
}

/// Data file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory receiving `oee.csv`, `fitness.csv` and `systematics.csv`.
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    /// Generations between fitness and systematics records.
    #[serde(default = "default_stats_interval")]
    pub stats_interval: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            stats_interval: default_stats_interval(),
        }
    }
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(".")
}
fn default_stats_interval() -> u64 {
    10
}

/// Taxon identity criterion used by the phylogeny.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonIdentity {
    /// One taxon per distinct genotype along a line of descent: an offspring
    /// whose genome differs from its parent's taxon founds a new taxon.
    #[default]
    Genotype,
    /// One taxon per founding lineage: offspring always stay in the parent's
    /// taxon, so only injected organisms found taxa.
    Lineage,
}

// ============================================================================
// Coded enums
// ============================================================================

/// Selection scheme.
///
/// Deserializes from a name or from the legacy integer code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionScheme {
    /// Tournament selection (code 0).
    #[default]
    Tournament,
    /// Fitness sharing followed by tournament selection (code 1).
    Sharing,
    /// Lexicase selection (code 2). Reserved.
    Lexicase,
    /// Eco-EA (code 3). Reserved.
    EcoEa,
    /// Uniform random selection (code 4).
    Random,
}

impl SelectionScheme {
    /// Scheme for a legacy integer code.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Tournament),
            1 => Some(Self::Sharing),
            2 => Some(Self::Lexicase),
            3 => Some(Self::EcoEa),
            4 => Some(Self::Random),
            _ => None,
        }
    }

    /// Scheme for a name, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "tournament" => Some(Self::Tournament),
            "sharing" | "fitness-sharing" | "fitness_sharing" => Some(Self::Sharing),
            "lexicase" => Some(Self::Lexicase),
            "eco-ea" | "eco_ea" | "ecoea" => Some(Self::EcoEa),
            "random" => Some(Self::Random),
            _ => None,
        }
    }

    /// Whether a selector exists for this scheme.
    pub fn is_implemented(self) -> bool {
        !matches!(self, Self::Lexicase | Self::EcoEa)
    }
}

impl fmt::Display for SelectionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tournament => "tournament",
            Self::Sharing => "sharing",
            Self::Lexicase => "lexicase",
            Self::EcoEa => "eco-ea",
            Self::Random => "random",
        };
        f.write_str(name)
    }
}

/// Environment change type.
///
/// Deserializes from a name or from the legacy integer code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeType {
    /// Rebuild the landscape from scratch (code 0).
    #[default]
    Complete,
    /// Alternate between two fixed landscapes (code 1).
    Oscillating,
}

impl ChangeType {
    /// Change type for a legacy integer code.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Complete),
            1 => Some(Self::Oscillating),
            _ => None,
        }
    }

    /// Change type for a name, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "complete" => Some(Self::Complete),
            "oscillating" | "oscilating" => Some(Self::Oscillating),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => f.write_str("complete"),
            Self::Oscillating => f.write_str("oscillating"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CodedRepr {
    Code(u64),
    Name(String),
}

impl<'de> Deserialize<'de> for SelectionScheme {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match CodedRepr::deserialize(deserializer)? {
            CodedRepr::Code(code) => Self::from_code(code).ok_or_else(|| {
                serde::de::Error::custom(format!("Unknown selection scheme code: {code}"))
            }),
            CodedRepr::Name(name) => Self::from_name(&name).ok_or_else(|| {
                serde::de::Error::custom(format!("Unknown selection scheme: {name}"))
            }),
        }
    }
}

impl<'de> Deserialize<'de> for ChangeType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match CodedRepr::deserialize(deserializer)? {
            CodedRepr::Code(code) => Self::from_code(code).ok_or_else(|| {
                serde::de::Error::custom(format!("Unknown change type code: {code}"))
            }),
            CodedRepr::Name(name) => Self::from_name(&name)
                .ok_or_else(|| serde::de::Error::custom(format!("Unknown change type: {name}"))),
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Genome length N must be non-zero")]
    EmptyGenome,
    #[error("Epistasis K ({k}) must be less than genome length N ({n})")]
    EpistasisTooHigh { k: usize, n: usize },
    #[error("Epistasis K ({k}) exceeds the supported maximum of {max}")]
    EpistasisTooLarge { k: usize, max: usize },
    #[error("Landscape with N={n}, K={k} needs more than {max} table entries")]
    LandscapeTooLarge { n: usize, k: usize, max: usize },
    #[error("Population size must be non-zero")]
    EmptyPopulation,
    #[error("Mutation rate {0} must lie in [0, 1]")]
    InvalidMutationRate(f64),
    #[error("Tournament size must be at least 1")]
    InvalidTournamentSize,
    #[error("Sharing threshold {0} must be positive")]
    InvalidSharingThreshold(f64),
    #[error("Sharing alpha {0} must be non-negative")]
    InvalidSharingAlpha(f64),
    #[error("Selection scheme '{0}' is not implemented")]
    UnsupportedSelection(SelectionScheme),
    #[error("MODES resolution must be at least 1")]
    InvalidResolution,
    #[error("Stats interval must be at least 1")]
    InvalidStatsInterval,
}

impl LandscapeConfig {
    /// Validate genome length and epistasis.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_landscape(self.n, self.k)
    }
}

/// Check that an NK landscape of this shape can be built.
pub fn validate_landscape(n: usize, k: usize) -> Result<(), ConfigError> {
    if n == 0 {
        return Err(ConfigError::EmptyGenome);
    }
    if k >= n {
        return Err(ConfigError::EpistasisTooHigh { k, n });
    }
    if k > MAX_EPISTASIS {
        return Err(ConfigError::EpistasisTooLarge {
            k,
            max: MAX_EPISTASIS,
        });
    }
    if n > MAX_TABLE_ENTRIES >> (k + 1) {
        return Err(ConfigError::LandscapeTooLarge {
            n,
            k,
            max: MAX_TABLE_ENTRIES,
        });
    }
    Ok(())
}

impl RunConfig {
    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.landscape.validate()?;

        if self.population.size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        let rate = self.population.mutation_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::InvalidMutationRate(rate));
        }

        if !self.selection.scheme.is_implemented() {
            return Err(ConfigError::UnsupportedSelection(self.selection.scheme));
        }
        if self.selection.tournament_size == 0 {
            return Err(ConfigError::InvalidTournamentSize);
        }
        if self.selection.scheme == SelectionScheme::Sharing {
            let threshold = self.selection.sharing_threshold;
            if threshold.is_nan() || threshold <= 0.0 {
                return Err(ConfigError::InvalidSharingThreshold(threshold));
            }
            let alpha = self.selection.sharing_alpha;
            if alpha.is_nan() || alpha < 0.0 {
                return Err(ConfigError::InvalidSharingAlpha(alpha));
            }
        }

        if self.oee.resolution == 0 {
            return Err(ConfigError::InvalidResolution);
        }
        if self.output.stats_interval == 0 {
            return Err(ConfigError::InvalidStatsInterval);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.landscape.n, 200);
        assert_eq!(config.landscape.k, 10);
        assert_eq!(config.selection.tournament_size, 2);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: RunConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.population.size, 1000);
        assert_eq!(config.oee.filter_length, 1000);
        assert_eq!(config.environment.change_type, ChangeType::Complete);
    }

    #[test]
    fn test_legacy_option_names() {
        let json = r#"{
            "landscape": { "N": 20, "K": 2 },
            "population": { "POP_SIZE": 50, "MUT_RATE": 0.01, "MAX_GENS": 5 },
            "selection": { "SELECTION": 4 },
            "environment": { "CHANGE_TYPE": 1, "CHANGE_RATE": 10 },
            "SEED": 7
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.landscape.n, 20);
        assert_eq!(config.population.size, 50);
        assert_eq!(config.selection.scheme, SelectionScheme::Random);
        assert_eq!(config.environment.change_type, ChangeType::Oscillating);
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn test_flat_legacy_layout_rejected() {
        let json = r#"{"N": 20, "K": 2, "POP_SIZE": 50, "SELECTION": 9, "CHANGE_TYPE": 7}"#;
        let err = serde_json::from_str::<RunConfig>(json).unwrap_err();
        assert!(err.to_string().contains("unknown field `N`"));

        let json = r#"{ "population": { "POP_SIZE": 50, "SELECTON": 4 } }"#;
        let err = serde_json::from_str::<RunConfig>(json).unwrap_err();
        assert!(err.to_string().contains("SELECTON"));
    }

    #[test]
    fn test_unknown_code_in_section_is_fatal() {
        let json = r#"{ "selection": { "SELECTION": 9 } }"#;
        let err = serde_json::from_str::<RunConfig>(json).unwrap_err();
        assert!(err.to_string().contains("Unknown selection scheme code: 9"));

        let json = r#"{ "environment": { "CHANGE_TYPE": 7 } }"#;
        let err = serde_json::from_str::<RunConfig>(json).unwrap_err();
        assert!(err.to_string().contains("Unknown change type code: 7"));
    }

    #[test]
    fn test_landscape_table_size_bounded() {
        assert_eq!(
            validate_landscape(200, 23),
            Err(ConfigError::LandscapeTooLarge {
                n: 200,
                k: 23,
                max: MAX_TABLE_ENTRIES,
            })
        );
        assert!(validate_landscape(200, 10).is_ok());
        // Exactly at the limit
        assert!(validate_landscape(32, 20).is_ok());
        assert!(validate_landscape(33, 20).is_err());
    }

    #[test]
    fn test_scheme_names() {
        let scheme: SelectionScheme = serde_json::from_str(r#""sharing""#).unwrap();
        assert_eq!(scheme, SelectionScheme::Sharing);
        let scheme: SelectionScheme = serde_json::from_str(r#""eco-ea""#).unwrap();
        assert_eq!(scheme, SelectionScheme::EcoEa);
    }

    #[test]
    fn test_unknown_scheme_names_value() {
        let err = serde_json::from_str::<SelectionScheme>(r#""roulette""#).unwrap_err();
        assert!(err.to_string().contains("roulette"));

        let err = serde_json::from_str::<SelectionScheme>("9").unwrap_err();
        assert!(err.to_string().contains('9'));

        let err = serde_json::from_str::<ChangeType>("2").unwrap_err();
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn test_epistasis_must_be_below_genome_length() {
        let mut config = RunConfig::default();
        config.landscape.n = 10;
        config.landscape.k = 10;
        assert_eq!(
            config.validate(),
            Err(ConfigError::EpistasisTooHigh { k: 10, n: 10 })
        );
    }

    #[test]
    fn test_reserved_schemes_rejected() {
        let mut config = RunConfig::default();
        config.selection.scheme = SelectionScheme::Lexicase;
        let err = config.validate().unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedSelection(SelectionScheme::Lexicase));
        assert!(err.to_string().contains("lexicase"));
    }

    #[test]
    fn test_mutation_rate_bounds() {
        let mut config = RunConfig::default();
        config.population.mutation_rate = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMutationRate(_))
        ));
    }

    #[test]
    fn test_serialization() {
        let config = RunConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.population.size, config.population.size);
        assert_eq!(parsed.selection.scheme, config.selection.scheme);
    }
}
