//! Building and editing NUL-terminated text.
//!
//! Run with `RUST_LOG=trace` to include buffer resize events.

use ballast::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), BufferError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut greeting = TextBuffer::from("Hello, ");
    greeting.push_str("world!");
    info!(text = %greeting, len = greeting.len(), capacity = greeting.capacity(), "appended");

    let world = greeting.substring(7, 12)?;
    info!(text = %world, "substring");

    greeting.insert_str(5, " there")?;
    info!(text = %greeting, "inserted");

    let removed = greeting.remove(0)?;
    info!(removed = %char::from(removed), text = %greeting, "removed head");

    info!(
        ordering = ?world.compare(&greeting),
        equal = world.equals(&TextBuffer::from("world")),
        "compared"
    );

    greeting.clear();
    greeting.shrink_to_fit();
    info!(len = greeting.len(), capacity = greeting.capacity(), "cleared and shrunk");

    if let Err(err) = greeting.remove(0) {
        info!(%err, "remove on empty text reported");
    }
    Ok(())
}
