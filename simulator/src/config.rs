use commonware_cryptography::{
    ed25519::PrivateKey,
    sha256::{Digest, Sha256},
    Hasher, PrivateKeyExt,
};
use commonware_utils::from_hex_formatted;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use sicbo_execution::Limits;
use sicbo_types::sicbo::{
    DEFAULT_GRANT_DURATION_DAYS, DEFAULT_MAX_STAKE, DEFAULT_MIN_STAKE, MAX_ATTESTATIONS,
    MAX_GRANT_DURATION_DAYS,
};
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;

/// Configuration for the [crate::Simulator].
#[derive(Deserialize, Serialize)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,

    #[serde(default = "default_min_stake")]
    pub min_stake: u64,
    #[serde(default = "default_max_stake")]
    pub max_stake: u64,
    #[serde(default = "default_grant_duration_days")]
    pub grant_duration_days: u32,

    pub kms_signers: usize,
    pub kms_threshold: usize,
    /// Hex seed for the coprocessor's entropy and KMS keys.
    pub entropy_seed: String,
    /// Tokens the bankroll holds at genesis.
    #[serde(default)]
    pub bankroll: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be hex: {value}")]
    InvalidHex { field: &'static str, value: String },
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: usize },
    #[error("kms_threshold must be in [1, {signers}] (got {threshold})")]
    InvalidThreshold { threshold: usize, signers: usize },
    #[error("min_stake must be in [1, max_stake] (got {min}..={max})")]
    InvalidStakeRange { min: u64, max: u64 },
    #[error("grant_duration_days must be in [1, {max}] (got {value})")]
    InvalidGrantDuration { value: u32, max: u32 },
}

pub struct ValidatedConfig {
    pub port: u16,
    pub log_level: Level,
    pub json_logs: bool,

    pub limits: Limits,

    pub kms: Vec<PrivateKey>,
    pub kms_threshold: usize,
    pub entropy_seed: Vec<u8>,
    pub bankroll: u64,
}

fn default_min_stake() -> u64 {
    DEFAULT_MIN_STAKE
}

fn default_max_stake() -> u64 {
    DEFAULT_MAX_STAKE
}

fn default_grant_duration_days() -> u32 {
    DEFAULT_GRANT_DURATION_DAYS
}

fn parse_hex(field: &'static str, value: &str) -> Result<Vec<u8>, ConfigError> {
    from_hex_formatted(value).ok_or(ConfigError::InvalidHex {
        field,
        value: value.to_string(),
    })
}

/// Derives `signers` KMS keys from the entropy seed.
fn derive_kms(seed: &[u8], signers: usize) -> Vec<PrivateKey> {
    let mut hasher = Sha256::new();
    hasher.update(b"kms");
    hasher.update(seed);
    let digest: Digest = hasher.finalize();
    let mut rng = StdRng::from_seed(digest.0);
    (0..signers).map(|_| PrivateKey::from_rng(&mut rng)).collect()
}

impl Config {
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;

        if self.kms_signers == 0 || self.kms_signers > MAX_ATTESTATIONS {
            return Err(ConfigError::InvalidNonZero {
                field: "kms_signers",
                value: self.kms_signers,
            });
        }
        if self.kms_threshold == 0 || self.kms_threshold > self.kms_signers {
            return Err(ConfigError::InvalidThreshold {
                threshold: self.kms_threshold,
                signers: self.kms_signers,
            });
        }
        if self.min_stake == 0 || self.min_stake > self.max_stake {
            return Err(ConfigError::InvalidStakeRange {
                min: self.min_stake,
                max: self.max_stake,
            });
        }
        if self.grant_duration_days == 0 || self.grant_duration_days > MAX_GRANT_DURATION_DAYS {
            return Err(ConfigError::InvalidGrantDuration {
                value: self.grant_duration_days,
                max: MAX_GRANT_DURATION_DAYS,
            });
        }

        let entropy_seed = parse_hex("entropy_seed", &self.entropy_seed)?;
        if entropy_seed.is_empty() {
            return Err(ConfigError::InvalidNonZero {
                field: "entropy_seed",
                value: 0,
            });
        }
        let kms = derive_kms(&entropy_seed, self.kms_signers);

        Ok(ValidatedConfig {
            port: self.port,
            log_level,
            json_logs: self.json_logs,
            limits: Limits {
                min_stake: self.min_stake,
                max_stake: self.max_stake,
                grant_duration_days: self.grant_duration_days,
            },
            kms,
            kms_threshold: self.kms_threshold,
            entropy_seed,
            bankroll: self.bankroll,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_cryptography::Signer;

    const CONFIG: &str = r#"
port: 8080
log_level: info
kms_signers: 3
kms_threshold: 2
entropy_seed: "0xdeadbeef"
bankroll: 5000
"#;

    fn config() -> Config {
        serde_yaml::from_str(CONFIG).unwrap()
    }

    #[test]
    fn test_defaults() {
        let validated = config().validate().unwrap();
        assert_eq!(validated.port, 8080);
        assert_eq!(validated.log_level, Level::INFO);
        assert!(!validated.json_logs);
        assert_eq!(validated.limits, Limits::default());
        assert_eq!(validated.kms.len(), 3);
        assert_eq!(validated.kms_threshold, 2);
        assert_eq!(validated.entropy_seed, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(validated.bankroll, 5000);
    }

    #[test]
    fn test_kms_derivation() {
        let first = config().validate().unwrap();
        let second = config().validate().unwrap();
        let keys = |config: &ValidatedConfig| {
            config
                .kms
                .iter()
                .map(|key| key.public_key())
                .collect::<Vec<_>>()
        };
        assert_eq!(keys(&first), keys(&second));
        assert_ne!(keys(&first)[0], keys(&first)[1]);

        let mut other = config();
        other.entropy_seed = "0xfeed".to_string();
        assert_ne!(keys(&other.validate().unwrap()), keys(&first));
    }

    #[test]
    fn test_rejects_invalid() {
        let mut bad = config();
        bad.log_level = "loud".to_string();
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidLogLevel { .. })
        ));

        let mut bad = config();
        bad.kms_threshold = 4;
        assert_eq!(
            bad.validate().err(),
            Some(ConfigError::InvalidThreshold {
                threshold: 4,
                signers: 3
            })
        );

        let mut bad = config();
        bad.kms_signers = 0;
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidNonZero {
                field: "kms_signers",
                ..
            })
        ));

        let mut bad = config();
        bad.min_stake = 10;
        bad.max_stake = 9;
        assert_eq!(
            bad.validate().err(),
            Some(ConfigError::InvalidStakeRange { min: 10, max: 9 })
        );

        let mut bad = config();
        bad.grant_duration_days = MAX_GRANT_DURATION_DAYS + 1;
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidGrantDuration { .. })
        ));

        let mut bad = config();
        bad.entropy_seed = "not hex".to_string();
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidHex {
                field: "entropy_seed",
                ..
            })
        ));
    }
}
