//! Fixed business constants of the tanda rules.

/// Days after a due date during which a payment still counts as in grace.
pub const GRACE_DAYS: i64 = 3;

/// Length of the regularization window opened by a coverage.
pub const REGULARIZATION_WINDOW_DAYS: i64 = 3;

/// Length of the recovery period started for a post-turn default.
pub const RECOVERY_MODE_DAYS: i64 = 3;

/// Coverages a user may receive per tanda before defaults are confirmed.
pub const MAX_COVERAGES_PER_USER: usize = 2;

/// Longest duration, in months, still classified as a SHORT pool.
pub const SHORT_POOL_MAX_MONTHS: u32 = 9;

/// Percentage split of the safety fund across tiers 1..=4.
pub const FUND_LAYER_PERCENTAGES: [i64; 4] = [25, 30, 35, 10];

/// Annual yield per tier in basis points; only tiers 3 and 4 earn.
pub const FUND_LAYER_YIELD_BPS: [i64; 4] = [0, 0, 300, 800];

/// Placeholder yield, in percent of the required fund, when layers were never funded.
pub const FALLBACK_YIELD_PERCENT: i64 = 5;

/// Coverage policy identifier written into `PoolCovered`.
pub const COVERAGE_POLICY_VERSION: &str = "v1";

/// Length of generated tanda invite codes.
pub const INVITE_CODE_LEN: usize = 6;

/// Length of generated replacement codes.
pub const REPLACEMENT_CODE_LEN: usize = 8;

/// Participant bounds accepted at creation.
pub const MIN_PARTICIPANTS: u32 = 2;
pub const MAX_PARTICIPANTS: u32 = 50;
