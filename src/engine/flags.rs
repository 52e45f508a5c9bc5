//! Instance flags - kind, mode and per-call signals packed into one word.

bitflags::bitflags! {
    /// State bits of an [`Instance`](super::Instance).
    ///
    /// Exactly one kind bit is set for the lifetime of an instance. Mode bits
    /// are set and cleared by the walk; `SKIP_CHILDREN` never survives the
    /// `patch` call that set it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InstanceFlags: u32 {
        // === Kind (mutually exclusive) ===

        /// Text leaf bound to a host text resource.
        const TEXT = 1 << 0;
        /// Host element; props are diffed onto its resource.
        const ELEMENT = 1 << 1;
        /// Function component (also fragments).
        const FUNCTION = 1 << 2;
        /// Class component with lifecycle.
        const CLASS = 1 << 3;
        /// Retargets the insertion target (portal / render root).
        const ROOT = 1 << 4;

        // === Mode ===

        /// Reconciling against pre-existing host content.
        const HYDRATE = 1 << 5;
        /// Element lives in an svg subtree.
        const SVG = 1 << 6;
        /// Last attempt suspended.
        const SUSPENDED = 1 << 7;
        /// Last attempt failed.
        const ERRORED = 1 << 8;
        /// A descendant failed; this boundary retries next pass.
        const PENDING_ERROR = 1 << 9;
        /// This boundary is rendering after having shown an error.
        const RERENDERING_ERROR = 1 << 10;

        // === Signals ===

        /// Component asked to render again.
        const DIRTY = 1 << 11;
        /// Bypass `should_component_update`.
        const FORCE_UPDATE = 1 << 12;
        /// The executor produced no new children this call.
        const SKIP_CHILDREN = 1 << 13;

        // === Masks ===

        const KIND = Self::TEXT.bits()
            | Self::ELEMENT.bits()
            | Self::FUNCTION.bits()
            | Self::CLASS.bits()
            | Self::ROOT.bits();
        /// Kinds that own a host resource directly.
        const HOST = Self::TEXT.bits() | Self::ELEMENT.bits();
        /// Kinds that run component logic.
        const COMPONENT = Self::FUNCTION.bits() | Self::CLASS.bits() | Self::ROOT.bits();
        /// Bits cleared when a patch call finishes.
        const TRANSIENT_MODE = Self::HYDRATE.bits()
            | Self::SUSPENDED.bits()
            | Self::ERRORED.bits()
            | Self::RERENDERING_ERROR.bits();
    }
}

/// Mask that keeps everything except [`InstanceFlags::TRANSIENT_MODE`].
pub const RESET_MODE: InstanceFlags = InstanceFlags::TRANSIENT_MODE.complement();

impl InstanceFlags {
    /// The kind bit alone.
    #[inline]
    pub fn kind(self) -> InstanceFlags {
        self & InstanceFlags::KIND
    }

    /// Flip pending-error into rerendering-error.
    #[inline]
    pub fn toggle_error_recovery(&mut self) {
        if self.contains(InstanceFlags::PENDING_ERROR) {
            self.toggle(InstanceFlags::PENDING_ERROR | InstanceFlags::RERENDERING_ERROR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_keeps_kind() {
        let flags = InstanceFlags::CLASS
            | InstanceFlags::ERRORED
            | InstanceFlags::SUSPENDED
            | InstanceFlags::HYDRATE
            | InstanceFlags::DIRTY;
        let reset = flags & RESET_MODE;
        assert_eq!(reset, InstanceFlags::CLASS | InstanceFlags::DIRTY);
        assert_eq!(reset.kind(), InstanceFlags::CLASS);
    }

    #[test]
    fn test_reset_keeps_pending_error() {
        let flags = InstanceFlags::FUNCTION | InstanceFlags::PENDING_ERROR;
        assert_eq!(flags & RESET_MODE, flags);
    }

    #[test]
    fn test_error_recovery_toggle() {
        let mut flags = InstanceFlags::CLASS | InstanceFlags::PENDING_ERROR;
        flags.toggle_error_recovery();
        assert!(!flags.contains(InstanceFlags::PENDING_ERROR));
        assert!(flags.contains(InstanceFlags::RERENDERING_ERROR));

        // No-op when nothing is pending.
        flags.toggle_error_recovery();
        assert!(flags.contains(InstanceFlags::RERENDERING_ERROR));
    }
}
