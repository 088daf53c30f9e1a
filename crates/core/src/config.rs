//! Global configuration constants for charid.
//!
//! Fixed parameters of the fingerprint scheme, response shaping, and the
//! defaults for every runtime setting. These are compile-time constants;
//! runtime configuration is handled via CLI arguments and environment
//! variables in the server binary.

/// Dimension of every fingerprint vector.
///
/// Tied to the fingerprint generator: digests are tiled to exactly this many
/// bytes. Both storage backends are created with this dimension.
pub const EMBEDDING_DIM: usize = 256;

/// Added to the standard deviation before standardizing fingerprint bytes.
pub const STANDARDIZE_EPSILON: f32 = 1e-6;

/// Added to the norm product in the cosine similarity denominator.
pub const SIMILARITY_EPSILON: f32 = 1e-6;

/// Number of decimal places kept in reported confidences.
pub const CONFIDENCE_DECIMALS: i32 = 4;

/// Model version tag reported with every identification.
pub const MODEL_VERSION: &str = "v1";

/// Source recorded for identities registered through the admin API.
pub const DEFAULT_SOURCE: &str = "custom dataset";

/// Label used when no identity can be matched.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Notes attached to the placeholder prediction of an empty store.
pub const NO_REFERENCE_NOTES: &str = "No reference embeddings available yet.";

/// Default number of predictions returned per identification.
pub const DEFAULT_TOP_K: usize = 5;

/// Upper bound accepted for the top-K setting.
pub const MAX_TOP_K: usize = 100;

/// Best-match confidence below which a `low_confidence` warning is emitted.
pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f64 = 0.4;

/// Default number of identification requests admitted per client per window.
pub const DEFAULT_RATE_LIMIT: usize = 30;

/// Default length of the sliding rate-limit window in seconds.
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 60;

/// Default maximum upload size in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: usize = 10;

/// Content types accepted for uploaded images.
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Default location of the local store document.
pub const DEFAULT_DATA_PATH: &str = "./data/embeddings.json";

/// Default collection name in the remote vector index.
pub const DEFAULT_COLLECTION: &str = "characters";

/// Default HTTP server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default administrator user for the registration endpoint.
pub const DEFAULT_ADMIN_USER: &str = "admin";

/// Default administrator password for the registration endpoint.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

/// Per-request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for calls to the remote vector index, in seconds.
pub const REMOTE_TIMEOUT_SECS: u64 = 10;

/// Maximum number of concurrent in-flight requests.
pub const MAX_CONCURRENT_REQUESTS: usize = 512;
