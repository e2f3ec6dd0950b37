use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the global logger once. Debug builds default this
/// workspace's crates to debug-level output, release builds to info;
/// `RUST_LOG` overrides either. Later calls are no-ops.
pub fn setup(is_debug: bool) -> Result<(), log::SetLoggerError> {
    let mut result = Ok(());

    INIT.call_once(|| {
        let level = if is_debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };

        let mut builder = env_logger::Builder::new();
        builder
            .format_timestamp_millis()
            .filter_level(log::LevelFilter::Warn)
            .filter_module("pulseboard", level)
            .filter_module("feed", level)
            .filter_module("series", level)
            .parse_default_env();

        result = builder.try_init();
    });

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_is_idempotent() {
        setup(true).unwrap();
        setup(false).unwrap();
    }
}
