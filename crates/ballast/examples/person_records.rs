//! Person records in a growable sequence backed by a counting allocator.
//!
//! Run with `RUST_LOG=ballast_buffer=trace` to watch every resize.

use ballast::prelude::*;
use ballast_test_utils::{CountingAllocator, Person};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let counting = CountingAllocator::new();
    let mut people = SequenceBuffer::with_capacity_in(2, &counting);
    for person in Person::roster() {
        people.push(person);
        info!(len = people.len(), capacity = people.capacity(), "pushed record");
    }

    for person in people.as_slice() {
        info!(
            name = %String::from_utf8_lossy(person.name()),
            age = person.age,
            "record"
        );
    }

    if let Some(oldest) = people.as_slice().iter().max_by_key(|p| p.age) {
        info!(name = %String::from_utf8_lossy(oldest.name()), "oldest");
    }

    match people.get(10) {
        Ok(_) => unreachable!("only four records were pushed"),
        Err(err) => info!(%err, "out-of-range lookup reported"),
    }

    people.release();
    let stats = counting.stats();
    info!(
        allocations = stats.allocations,
        reallocations = stats.reallocations,
        deallocations = stats.deallocations,
        live_bytes = stats.live_bytes,
        "allocator totals"
    );
}
