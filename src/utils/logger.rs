use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directives used when `RUST_LOG` is unset. The binaries log under their own
/// crate names, so each one is listed next to the library.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "phosphom=debug,toml_phosphom=debug,motif_scan=debug,info"
    } else {
        "phosphom=info,toml_phosphom=info,motif_scan=info"
    }
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

/// Human-readable logs on stderr; stdout is left to command output.
pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

/// JSON lines on stderr, for runs driven by batch schedulers.
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
                .json(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_binaries() {
        for verbose in [false, true] {
            let directives = default_directives(verbose);
            for target in ["phosphom=", "toml_phosphom=", "motif_scan="] {
                assert!(directives.contains(target), "{} missing {}", directives, target);
            }
            assert!(EnvFilter::try_new(directives).is_ok());
        }
        assert!(default_directives(true).contains("phosphom=debug"));
    }
}
