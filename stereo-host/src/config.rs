//! Configuration for the stereo host.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stereo_core::{BackendKind, ColorSpace, PresentConfig, ResolverOptions};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Topology resolution.
    pub topology: TopologyConfig,
    /// Stereo presentation.
    pub presentation: PresentationConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Topology resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Give an extended-mode headset its own display identity.
    pub clone_vr_identity: bool,
    /// Fall back to the primary display for missing mosaic/control
    /// roles instead of failing.
    pub debug_fallback: bool,
    /// Fixture TOML to resolve against instead of the live system.
    /// Empty means live enumeration.
    pub fixture: String,
}

/// Presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// Backend: "auto", "window", "compositor" or "wrapper".
    pub backend: String,
    /// Presentation deadline per submit, in milliseconds.
    pub deadline_ms: u64,
    /// Acquire poll slice for the blocking drawable wait, in milliseconds.
    pub acquire_poll_ms: u64,
    /// Compositor color space: "auto", "gamma" or "linear".
    pub color_space: ColorSpace,
    /// Frames to render before exiting (0 = until stopped).
    pub frames: u64,
    /// Frame pacing target.
    pub target_fps: u32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            clone_vr_identity: false,
            debug_fallback: cfg!(debug_assertions),
            fixture: String::new(),
        }
    }
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            backend: "auto".into(),
            deadline_ms: 11,
            acquire_poll_ms: 100,
            color_space: ColorSpace::Auto,
            frames: 0,
            target_fps: 90,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl HostConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn to_resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            clone_vr_identity: self.topology.clone_vr_identity,
            debug_fallback: self.topology.debug_fallback,
        }
    }

    /// Convert presentation timing into a `PresentConfig`.
    pub fn to_present_config(&self) -> PresentConfig {
        PresentConfig {
            deadline: Duration::from_millis(self.presentation.deadline_ms.max(1)),
            acquire_poll: Duration::from_millis(self.presentation.acquire_poll_ms.clamp(1, 1000)),
        }
    }

    /// The configured backend, `None` for automatic selection. Unknown
    /// names are logged and treated as "auto".
    pub fn backend_override(&self) -> Option<BackendKind> {
        match self.presentation.backend.to_ascii_lowercase().as_str() {
            "" | "auto" => None,
            "window" => Some(BackendKind::Window),
            "compositor" => Some(BackendKind::Compositor),
            "wrapper" => Some(BackendKind::Wrapper),
            other => {
                tracing::warn!("unknown backend {other:?}; selecting automatically");
                None
            }
        }
    }

    /// The fixture file to resolve against, if any.
    pub fn fixture_path(&self) -> Option<PathBuf> {
        (!self.topology.fixture.is_empty()).then(|| PathBuf::from(&self.topology.fixture))
    }

    /// Time budget of one frame at `target_fps`.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.presentation.target_fps.clamp(1, 1000)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&HostConfig::default()).unwrap();
        assert!(text.contains("deadline_ms"));
        assert!(text.contains("clone_vr_identity"));
        assert!(text.contains("color_space = \"auto\""));
    }

    #[test]
    fn roundtrip_config() {
        let text = toml::to_string_pretty(&HostConfig::default()).unwrap();
        let parsed: HostConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.presentation.deadline_ms, 11);
        assert_eq!(parsed.presentation.acquire_poll_ms, 100);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let parsed: HostConfig = toml::from_str(
            r#"
            [presentation]
            backend = "Compositor"
            color_space = "linear"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.backend_override(), Some(BackendKind::Compositor));
        assert_eq!(parsed.presentation.color_space, ColorSpace::Linear);
        assert_eq!(parsed.presentation.target_fps, 90);
        assert!(parsed.fixture_path().is_none());
    }

    #[test]
    fn unknown_backend_means_auto() {
        let mut cfg = HostConfig::default();
        cfg.presentation.backend = "hologram".into();
        assert_eq!(cfg.backend_override(), None);
    }

    #[test]
    fn present_config_clamps() {
        let mut cfg = HostConfig::default();
        cfg.presentation.deadline_ms = 0;
        cfg.presentation.acquire_poll_ms = 60_000;
        let present = cfg.to_present_config();
        assert_eq!(present.deadline, Duration::from_millis(1));
        assert_eq!(present.acquire_poll, Duration::from_secs(1));
    }

    #[test]
    fn frame_interval_from_fps() {
        let mut cfg = HostConfig::default();
        cfg.presentation.target_fps = 100;
        assert_eq!(cfg.frame_interval(), Duration::from_millis(10));
    }
}
