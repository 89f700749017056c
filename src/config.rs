use crate::backend::Rgba;

/// Fixed application settings. Only logging looks at the environment
/// (`RUST_LOG`, unless `log_filter` is set); tweak the defaults or build a
/// `Config` by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub window_title: String,
    /// Logical window size (width, height).
    pub window_size: (u32, u32),
    /// Degrees added to the rotation on every tick.
    pub rotation_step: f64,
    pub fill_color: Rgba,
    pub clear_color: Rgba,
    /// Present with `Fifo` (vsync-aligned) instead of the first mode the surface offers.
    pub vsync: bool,
    /// `env_logger` filter; overrides `RUST_LOG` when set.
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_title: "Rotating Pentagon".to_string(),
            window_size: (800, 800),
            rotation_step: 0.5,
            fill_color: Rgba::RED,
            clear_color: Rgba::BLACK,
            vsync: true,
            log_filter: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_demo() {
        let config = Config::default();
        assert_eq!(config.rotation_step, 0.5);
        assert_eq!(config.fill_color, Rgba::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(config.clear_color, Rgba::new(0.0, 0.0, 0.0, 1.0));
        assert!(config.vsync);
        assert_eq!(config.log_filter, None);
    }
}
