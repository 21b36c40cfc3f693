// Coreform CLI entry point.
// Usage: coreform <expand|macrotrace|list-forms> ...
// Set RUST_LOG=coreform=debug to see transformer invocations.

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    coreform::cli::run();
}
