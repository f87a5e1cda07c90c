//! Common test utilities

#![allow(dead_code, unreachable_pub)]

use std::sync::Arc;

use cardstub::{StubPoolPlugin, StubPoolPluginFactoryBuilder, StubSmartCard};
use cardstub_core::PoolPluginFactorySpi;

/// Protocol of the cards built by [`card`]
pub const PROTOCOL: &str = "ISO";

/// Build a card answering `00A4` with `9000`
pub fn card() -> Arc<StubSmartCard> {
    StubSmartCard::builder()
        .with_power_on_data([0x3B, 0x00])
        .with_protocol(PROTOCOL)
        .with_simulated_command("00A4", "9000")
        .build()
        .expect("valid card")
}

/// Build a pool holding `sizes[i]` empty readers in group `group{i}`
///
/// Readers are named `group{i}-reader{j}`.
pub fn pool_with_groups(sizes: &[usize]) -> StubPoolPlugin {
    let mut builder = StubPoolPluginFactoryBuilder::builder();
    for (i, size) in sizes.iter().enumerate() {
        for j in 0..*size {
            builder =
                builder.with_stub_reader(format!("group{i}"), format!("group{i}-reader{j}"), None);
        }
    }
    builder.build().pool_plugin()
}

/// Set up a tracing subscriber writing to the test output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
