//! A runtime-inspectable mirror of the Cargo feature flags this crate
//! was built with (§A.3), surfaced at startup logging so a flashed image
//! can be identified from its log output alone without cracking open the
//! build that produced it.

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KernelFeatures: u32 {
        const TICK          = 1 << 0;
        const PRIORITY      = 1 << 1;
        const EVENTS        = 1 << 2;
        const SW_INTERRUPTS = 1 << 3;
        const DEBUG         = 1 << 4;
        const STATISTICS    = 1 << 5;
        const CUSTOM_MALLOC = 1 << 6;
        const TRACE_LOGGING = 1 << 7;
    }
}

impl KernelFeatures {
    pub fn current() -> Self {
        #[allow(unused_mut)]
        let mut flags = KernelFeatures::empty();
        #[cfg(feature = "tick")]
        {
            flags |= KernelFeatures::TICK;
        }
        #[cfg(feature = "priority")]
        {
            flags |= KernelFeatures::PRIORITY;
        }
        #[cfg(feature = "events")]
        {
            flags |= KernelFeatures::EVENTS;
        }
        #[cfg(feature = "sw-interrupts")]
        {
            flags |= KernelFeatures::SW_INTERRUPTS;
        }
        #[cfg(feature = "debug")]
        {
            flags |= KernelFeatures::DEBUG;
        }
        #[cfg(feature = "statistics")]
        {
            flags |= KernelFeatures::STATISTICS;
        }
        #[cfg(feature = "custom-malloc")]
        {
            flags |= KernelFeatures::CUSTOM_MALLOC;
        }
        #[cfg(feature = "trace-logging")]
        {
            flags |= KernelFeatures::TRACE_LOGGING;
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_matches_default_feature_set() {
        // default = ["tick", "priority", "events", "sw-interrupts"]
        let flags = KernelFeatures::current();
        assert!(flags.contains(KernelFeatures::TICK));
        assert!(flags.contains(KernelFeatures::PRIORITY));
        assert!(flags.contains(KernelFeatures::EVENTS));
        assert!(flags.contains(KernelFeatures::SW_INTERRUPTS));
        assert!(!flags.contains(KernelFeatures::DEBUG));
    }
}
