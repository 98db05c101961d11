//! Best-effort audio delivery: write a WAV file, try to play it, fall back to the desktop.

pub mod backend;
pub mod pipeline;
pub mod target;

pub use backend::{
    builtin, default_backends, CommandBackend, PlaybackBackend, PlaybackError,
    DEFAULT_BACKEND_ORDER,
};
pub use pipeline::{DeliveryConfig, DeliveryError, DeliveryPipeline, DeliveryReport};
pub use target::{
    default_desktop_dir, is_cross_environment_path, to_windows_path, DeliveryTargetResolver,
    HostResolver, PlaybackTarget, TargetLocation,
};
