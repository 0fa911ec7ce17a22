/// Foreground state reported by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppLifecycle {
    #[default]
    Active,
    Inactive,
    Background,
}

impl AppLifecycle {
    /// Leaving `Active` is the last chance to run deferred work.
    #[must_use]
    pub fn should_flush(self) -> bool {
        !matches!(self, AppLifecycle::Active)
    }

    /// Parses `active`, `inactive` or `background`, ignoring case.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "background" => Some(Self::Background),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_keeps_deferred_work() {
        assert!(!AppLifecycle::Active.should_flush());
        assert!(AppLifecycle::Inactive.should_flush());
        assert!(AppLifecycle::Background.should_flush());
        assert_eq!(AppLifecycle::from_code(" Background "), Some(AppLifecycle::Background));
        assert_eq!(AppLifecycle::from_code("asleep"), None);
    }
}
