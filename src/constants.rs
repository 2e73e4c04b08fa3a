// Fee floors (in stroops)
pub const MIN_INNER_FEE_STROOPS: u64 = 1_000;
pub const MIN_FEE_BUMP_STROOPS: u64 = 2_000;

// Protocol rule: a fee-bump fee must be at least twice the inner fee
pub const FEE_BUMP_FACTOR: u64 = 2;

// Stroops per whole asset unit
pub const STROOPS_PER_UNIT: u64 = 10_000_000;

// Scheduler cadence (in seconds)
pub const COARSE_TICK_SECS: u64 = 10;
pub const PRECISION_HANDOFF_SECS: u64 = 60;
pub const COUNTDOWN_WINDOW_SECS: u64 = 10;

// Upper bound on the final spin-wait; a delayed trigger past this
// gap skips the spin entirely (tunable via timing.spin_wait_max_ms)
pub const DEFAULT_SPIN_WAIT_MAX_MS: u64 = 5_000;

// Default timing parameters
pub const DEFAULT_TRIGGER_OFFSET_MS: u64 = 100;
pub const DEFAULT_BASE_FEE_STROOPS: u64 = 100;
pub const DEFAULT_FEE_MULTIPLIER: u64 = 10;

// Transaction assembly
pub const TX_TIMEOUT_SECS: u64 = 60;
pub const SWEEP_PLACEHOLDER_AMOUNT: &str = "0.0000001";
pub const CLAIMABLES_PAGE_LIMIT: u32 = 200;

// Default network parameters
pub const DEFAULT_NETWORK_PASSPHRASE: &str = "Pi Network";
pub const DEFAULT_HORIZON_URLS: [&str; 3] = [
    "https://api.mainnet.minepi.com",
    "https://horizon.pi-blockchain.net",
    "https://api.pi-network.com",
];
