use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Env var checked before `RUST_LOG`.
pub const LOG_ENV: &str = "PARLEY_LOG";

/// Our own crates at debug; the HTTP stack only when it has something to say.
pub fn default_directives(component: &str) -> String {
    format!("info,parley=debug,{component}=debug,hyper=warn,reqwest=warn,h2=warn")
}

/// `PARLEY_LOG` wins over `RUST_LOG`; unparsable values fall through to the
/// next source instead of silencing output.
pub fn resolve_filter(component: &str, parley_log: Option<&str>, rust_log: Option<&str>) -> EnvFilter {
    [parley_log, rust_log]
        .into_iter()
        .flatten()
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directives(component)))
}

/// Installs the global subscriber. Closed spans are logged so each chat
/// exchange reports how long it spent waiting on the model.
pub fn init_tracing(component: &str) {
    let parley_log = std::env::var(LOG_ENV).ok();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = resolve_filter(component, parley_log.as_deref(), rust_log.as_deref());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .compact()
        .try_init();
}
