use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityTransition {
    CameOnline,
    WentOffline,
    Unchanged,
}

/// オンライン状態のフラグ。offline→online の立ち上がりだけが意味を持つ。
#[derive(Debug)]
pub struct ConnectivityGate {
    online: AtomicBool,
}

impl ConnectivityGate {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn set(&self, online: bool) -> ConnectivityTransition {
        let previous = self.online.swap(online, Ordering::SeqCst);
        match (previous, online) {
            (false, true) => ConnectivityTransition::CameOnline,
            (true, false) => ConnectivityTransition::WentOffline,
            _ => ConnectivityTransition::Unchanged,
        }
    }
}

/// バックグラウンドでドレインを起動してよいか。
pub fn should_schedule_drain(online: bool, processing: bool, pending: usize) -> bool {
    online && !processing && pending > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_edges_are_reported() {
        let gate = ConnectivityGate::new(false);
        assert_eq!(gate.set(false), ConnectivityTransition::Unchanged);
        assert_eq!(gate.set(true), ConnectivityTransition::CameOnline);
        assert_eq!(gate.set(true), ConnectivityTransition::Unchanged);
        assert_eq!(gate.set(false), ConnectivityTransition::WentOffline);
        assert!(!gate.is_online());
    }

    #[test]
    fn drain_is_scheduled_only_when_online_idle_and_non_empty() {
        assert!(should_schedule_drain(true, false, 1));
        assert!(!should_schedule_drain(false, false, 1));
        assert!(!should_schedule_drain(true, true, 1));
        assert!(!should_schedule_drain(true, false, 0));
    }
}
