//! Logger setup for the `log` facade.

/// `info` overall, with the chatty wgpu internals capped at `warn`.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

fn builder(filter: Option<&str>) -> env_logger::Builder {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_FILTER));
    if let Some(filter) = filter {
        builder.parse_filters(filter);
    }
    builder
}

/// Installs the global logger. An explicit `filter` wins over `RUST_LOG`.
pub fn init_logging(filter: Option<&str>) {
    // try_init so a logger installed by a test harness doesn't panic us
    if builder(filter).try_init().is_ok() {
        log::debug!("logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use log::{Level, Log, Metadata};

    use super::*;

    fn enabled(logger: &impl Log, target: &str, level: Level) -> bool {
        logger.enabled(&Metadata::builder().target(target).level(level).build())
    }

    #[test]
    fn default_filter_caps_wgpu_internals() {
        let logger = env_logger::Builder::new()
            .parse_filters(DEFAULT_FILTER)
            .build();

        assert!(enabled(&logger, "spinning_pentagon", Level::Info));
        assert!(!enabled(&logger, "spinning_pentagon", Level::Debug));
        assert!(!enabled(&logger, "wgpu_core::device", Level::Info));
        assert!(enabled(&logger, "wgpu_hal", Level::Warn));
    }

    #[test]
    fn explicit_filter_overrides_the_default() {
        let logger = builder(Some("spinning_pentagon=trace")).build();
        assert!(enabled(&logger, "spinning_pentagon::animation", Level::Trace));
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging(None);
        init_logging(Some("debug"));
    }
}
