/// Characters of share text carried by a single QR code.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Window in which an identical decoded payload is treated as the same observation.
pub const SCAN_DEBOUNCE_MS: u64 = 1000;

pub const DEFAULT_SHARES: usize = 5;
pub const DEFAULT_THRESHOLD: usize = 3;

pub const MIN_THRESHOLD: usize = 2;

/// Upper bound on pieces handed out to people.
pub const MAX_SHARES: usize = 10;

/// Most QR codes one share may be cut into. Larger totals in scanned text are corrupt.
pub const MAX_CHUNKS: usize = 1024;

/// Separates the embedded checksum from the secret text.
pub const DELIMITER: char = '|';

/// Largest decompressed payload accepted when recombining.
pub const MAX_DECOMPRESSED_SIZE: usize = 1024 * 1024;

pub const LINK_SCHEME: &str = "mylastresort";

pub const DEFAULT_CONFIG_DIR: &str = "./.lastresort";
