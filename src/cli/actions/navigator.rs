use tracing::debug;

use crate::session::{Navigator, Route};

/// Terminal stand-in for the router: the next view is announced on stderr so
/// stdout stays clean for command output.
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: Route) {
        debug!("navigate to {}", route.path());
        eprintln!("-> {}", route.path());
    }
}
