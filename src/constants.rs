//! Global constants used throughout the writenode codebase.
//!
//! Field names the path computer injects, placeholder tokens understood by the
//! host renderer, and the handful of defaults that several modules share.
//! Defining them centrally keeps the magic strings discoverable.

/// Template key holding the frame-sequence token.
pub const SEQ_KEY: &str = "SEQ";

/// Template key holding the stereo/multi-view token.
pub const EYE_KEY: &str = "eye";

/// Unresolved frame placeholder injected into `SEQ`.
///
/// Sequence keys expand this into `%0Nd` using their own padding, so the
/// resulting path keeps a per-frame substitution marker instead of a number.
pub const SEQ_PLACEHOLDER: &str = "FORMAT: %d";

/// Multi-view placeholder injected into `eye`; expanded by the host per view.
pub const EYE_PLACEHOLDER: &str = "%V";

/// Current output-name key.
pub const OUTPUT_KEY: &str = "output";

/// Legacy output-name key, still honoured for older configurations.
pub const LEGACY_OUTPUT_KEY: &str = "channel";

/// Every key name that carries the output name, current name first.
pub const OUTPUT_KEYS: [&str; 2] = [OUTPUT_KEY, LEGACY_OUTPUT_KEY];

/// Template key receiving the image width.
pub const WIDTH_KEY: &str = "width";

/// Template key receiving the image height.
pub const HEIGHT_KEY: &str = "height";

/// Template key receiving the current year.
pub const YEAR_KEY: &str = "YYYY";

/// Template key receiving the current month.
pub const MONTH_KEY: &str = "MM";

/// Template key receiving the current day of month.
pub const DAY_KEY: &str = "DD";

/// Fields that legitimately change between computations and are ignored
/// when deciding whether a cached path is locked.
pub const VOLATILE_FIELDS: [&str; 5] = [WIDTH_KEY, HEIGHT_KEY, YEAR_KEY, MONTH_KEY, DAY_KEY];

/// Keys skipped when enumerating rendered files on disk.
pub const FILE_DISCOVERY_SKIP_KEYS: [&str; 2] = [SEQ_KEY, EYE_KEY];

/// Output name used when the template key declares no default.
pub const DEFAULT_OUTPUT_NAME: &str = "output";

/// Prefix for automatically named write nodes (`RenderWrite1`, `RenderWrite2`, ...).
pub const DEFAULT_NODE_NAME_PREFIX: &str = "RenderWrite";

/// Name prefix of placeholder nodes converted on script load.
pub const PLACEHOLDER_NODE_PREFIX: &str = "WriteNodePlaceholder";

/// Suffix appended to a profile name that is no longer configured.
pub const PROFILE_NOT_FOUND_SUFFIX: &str = " [Not Found]";

/// Name of the default storage root for templates without `root_name`.
pub const DEFAULT_ROOT_NAME: &str = "primary";

/// Settings key naming the work-file template.
pub const SCRIPT_WORK_TEMPLATE_SETTING: &str = "template_script_work";

/// Column width for user-facing warning text.
pub const WARNING_WRAP_WIDTH: usize = 60;

/// Column width for the indented reason line inside a warning.
pub const WARNING_REASON_WRAP_WIDTH: usize = 57;

/// Default tile colour restored when a profile carries no valid colour.
pub const DEFAULT_TILE_COLOR: i64 = 0;

/// Encoder file type meaning "detect from the file extension".
pub const AUTO_DETECT_FILE_TYPE: &str = "  ";
