// src/installer.rs
// Records when the tool was first set up on a site and which version last ran.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::site::SiteState;

pub const INSTALLED_OPTION: &str = "media_tracker_installed";
pub const VERSION_OPTION: &str = "media_tracker_version";

// The install time is written once; the version is refreshed on every run
pub fn install(state: &mut SiteState, now: DateTime<Utc>) {
    if state.option(INSTALLED_OPTION).is_none() {
        state.set_option(INSTALLED_OPTION, now.timestamp());
        info!(at = now.timestamp(), "recorded install time");
    }

    state.set_option(VERSION_OPTION, env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::ManualClock;
    use crate::cache::Clock;
    use chrono::Duration;
    use serde_json::Value;

    #[test]
    fn test_install_is_idempotent_for_time() {
        let clock = ManualClock::new();
        let mut state = SiteState::default();

        install(&mut state, clock.now());
        let first = state.option(INSTALLED_OPTION).cloned();
        assert_eq!(first, Some(Value::from(clock.now().timestamp())));

        clock.advance(Duration::days(3));
        state.set_option(VERSION_OPTION, "0.0.1");
        install(&mut state, clock.now());

        assert_eq!(state.option(INSTALLED_OPTION).cloned(), first);
        assert_eq!(state.option(VERSION_OPTION), Some(&Value::from(env!("CARGO_PKG_VERSION"))));
    }
}
