//! Where delivered audio lands.
//!
//! Under WSL the Windows desktop is reachable through `/mnt/c/...`; a file put
//! there can be opened from the host even when no Linux audio stack exists.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Which side of the mount the primary file lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLocation {
    NativeTemp,
    CrossEnvironmentDesktop,
}

/// Directory chosen for one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackTarget {
    pub dir: PathBuf,
    pub location: TargetLocation,
}

/// Picks the output directory for a delivery.
///
/// The probe runs on every call and must never fail; an unreachable desktop
/// simply means the native directory is used.
pub trait DeliveryTargetResolver: Send + Sync {
    fn native_dir(&self) -> PathBuf;

    /// The cross-environment desktop, if it is reachable right now
    fn cross_environment_dir(&self) -> Option<PathBuf>;

    fn resolve(&self) -> PlaybackTarget {
        match self.cross_environment_dir() {
            Some(dir) => PlaybackTarget {
                dir,
                location: TargetLocation::CrossEnvironmentDesktop,
            },
            None => PlaybackTarget {
                dir: self.native_dir(),
                location: TargetLocation::NativeTemp,
            },
        }
    }
}

/// Resolver backed by the real filesystem
#[derive(Debug, Clone)]
pub struct HostResolver {
    native_dir: PathBuf,
    desktop_candidate: Option<PathBuf>,
}

impl HostResolver {
    pub fn new(native_dir: PathBuf, desktop_candidate: Option<PathBuf>) -> Self {
        Self {
            native_dir,
            desktop_candidate,
        }
    }
}

impl DeliveryTargetResolver for HostResolver {
    fn native_dir(&self) -> PathBuf {
        self.native_dir.clone()
    }

    fn cross_environment_dir(&self) -> Option<PathBuf> {
        let candidate = self.desktop_candidate.as_ref()?;
        if candidate.is_dir() {
            Some(candidate.clone())
        } else {
            debug!(target: "delivery", path = ?candidate, "Desktop directory not reachable");
            None
        }
    }
}

/// `/mnt/c/Users/<USERNAME|USER>/Desktop`
pub fn default_desktop_dir() -> Option<PathBuf> {
    let user = std::env::var("USERNAME")
        .or_else(|_| std::env::var("USER"))
        .ok()
        .filter(|u| !u.is_empty())?;
    Some(PathBuf::from(format!("/mnt/c/Users/{}/Desktop", user)))
}

/// Translate a WSL mount path (`/mnt/<drive>/...`) to its Windows form.
/// Returns `None` for paths outside a drive mount.
pub fn to_windows_path(path: &Path) -> Option<String> {
    let s = path.to_str()?;
    let rest = s.strip_prefix("/mnt/")?;
    let mut chars = rest.chars();
    let drive = chars.next().filter(|c| c.is_ascii_alphabetic())?;
    let tail = chars.as_str();
    if !(tail.is_empty() || tail.starts_with('/')) {
        return None;
    }
    Some(format!(
        "{}:\\{}",
        drive.to_ascii_uppercase(),
        tail.trim_start_matches('/').replace('/', "\\")
    ))
}

/// True when `path` lives on a Windows drive mount
pub fn is_cross_environment_path(path: &Path) -> bool {
    to_windows_path(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_drive_mounts() {
        assert_eq!(
            to_windows_path(Path::new("/mnt/c/Users/ana/Desktop/parrot-tts-1.wav")).as_deref(),
            Some("C:\\Users\\ana\\Desktop\\parrot-tts-1.wav")
        );
        assert_eq!(to_windows_path(Path::new("/mnt/d")).as_deref(), Some("D:\\"));
        assert_eq!(to_windows_path(Path::new("/tmp/parrot-tts-1.wav")), None);
        assert_eq!(to_windows_path(Path::new("/mnt/wsl/shared")), None);
    }

    #[test]
    fn missing_desktop_falls_back_to_native() {
        let native = std::env::temp_dir();
        let resolver = HostResolver::new(
            native.clone(),
            Some(PathBuf::from("/definitely/not/a/desktop")),
        );

        let target = resolver.resolve();
        assert_eq!(target.location, TargetLocation::NativeTemp);
        assert_eq!(target.dir, native);
    }

    #[test]
    fn reachable_desktop_is_preferred() {
        let native = std::env::temp_dir().join("parrot-native-unused");
        let desktop = std::env::temp_dir();
        let resolver = HostResolver::new(native, Some(desktop.clone()));

        let target = resolver.resolve();
        assert_eq!(target.location, TargetLocation::CrossEnvironmentDesktop);
        assert_eq!(target.dir, desktop);
    }
}
