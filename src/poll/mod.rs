mod poller;

pub use poller::{Poller, TrailSnapshot, POLL_INTERVAL};
