/// Base units per whole token (9 decimals).
pub const TOKEN_UNIT: u64 = 1_000_000_000;

/// Smallest accepted stake.
pub const DEFAULT_MIN_STAKE: u64 = 1;

/// Largest accepted stake (18 whole tokens).
pub const DEFAULT_MAX_STAKE: u64 = 18 * TOKEN_UNIT;

/// Tokens credited by a single faucet claim (dev funding).
pub const FAUCET_AMOUNT: u64 = 1_000 * TOKEN_UNIT;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Default validity of a user decryption consent.
pub const DEFAULT_GRANT_DURATION_DAYS: u32 = 10;

/// Longest validity a user decryption consent may request.
pub const MAX_GRANT_DURATION_DAYS: u32 = 365;

/// Number of dice rolled per round.
pub const DICE_PER_ROUND: usize = 3;

/// Maximum number of handles revealed under one user decryption
/// (one round's dice plus its payout).
pub const MAX_USER_DECRYPT_HANDLES: usize = DICE_PER_ROUND + 1;

/// X25519 public key a user decryption is sealed to.
pub const REENCRYPTION_KEY_SIZE: usize = 32;

/// Every user-decrypted value is sealed as 8 big-endian bytes.
pub const SEALED_VALUE_SIZE: usize = 8;

/// Lowest and highest face of a die.
pub const DIE_MIN: u8 = 1;
pub const DIE_MAX: u8 = 6;

/// Bounds on encoded collections.
pub const MAX_PLAYER_ROUNDS: usize = 100_000;
pub const MAX_ATTESTATIONS: usize = 32;
pub const MAX_CONSENT_CONTRACTS: usize = 8;
pub const MAX_CLEAR_BYTES: usize = 32;
pub const MAX_MESSAGE_LENGTH: usize = 256;

/// Error codes carried by `Event::Rejected`.
pub const ERROR_INVALID_BET_PARAMETERS: u8 = 1;
pub const ERROR_INVALID_ROUND_STATE: u8 = 2;
pub const ERROR_NOT_AUTHORIZED: u8 = 3;
pub const ERROR_INVALID_PROOF: u8 = 4;
pub const ERROR_INSUFFICIENT_BANKROLL: u8 = 5;
pub const ERROR_RANDOMNESS_UNAVAILABLE: u8 = 6;
pub const ERROR_ROUND_NOT_FOUND: u8 = 7;
pub const ERROR_INSUFFICIENT_FUNDS: u8 = 8;
pub const ERROR_INSUFFICIENT_ALLOWANCE: u8 = 9;
pub const ERROR_INVALID_AMOUNT: u8 = 10;
pub const ERROR_RATE_LIMITED: u8 = 11;
pub const ERROR_COPROCESSOR: u8 = 12;
pub const ERROR_ROUND_LIMIT_REACHED: u8 = 13;
