use std::env;
use std::sync::OnceLock;

static LAZYND_PARALLEL: OnceLock<bool> = OnceLock::new();

fn parse_bool(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
}

/// Whether realizers built from the environment join independent operands on the rayon pool.
pub(crate) fn parallel_enabled() -> bool {
    *LAZYND_PARALLEL.get_or_init(|| match env::var("LAZYND_PARALLEL") {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value),
        _ => false,
    })
}
