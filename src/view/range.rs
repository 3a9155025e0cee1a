/// Scrollbar model for one axis of a view
///
/// Writes made by the viewport itself go through [`RangeControl::configure`]
/// or [`RangeControl::set_value_silently`] and never produce a change
/// notification. Only host writes via [`RangeControl::set_value`] do, and
/// only when the value actually changes.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeControl {
    value: f64,
    lower: f64,
    upper: f64,
    page_size: f64,
    step_increment: f64,
    page_increment: f64,
    pending: bool,
}

impl Default for RangeControl {
    fn default() -> Self {
        Self {
            value: 0.0,
            lower: 0.0,
            upper: 0.0,
            page_size: 0.0,
            step_increment: 0.0,
            page_increment: 0.0,
            pending: false,
        }
    }
}

impl RangeControl {
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn page_size(&self) -> f64 {
        self.page_size
    }

    pub fn step_increment(&self) -> f64 {
        self.step_increment
    }

    pub fn page_increment(&self) -> f64 {
        self.page_increment
    }

    /// Largest value that keeps a full page inside the range
    pub fn max_value(&self) -> f64 {
        (self.upper - self.page_size).max(self.lower)
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.max_value())
    }

    /// Set bounds and page geometry, re-clamping the current value
    pub fn configure(&mut self, upper: f64, page_size: f64) {
        self.upper = upper.max(self.lower);
        self.page_size = page_size.max(0.0);
        self.step_increment = 0.1 * self.page_size;
        self.page_increment = 0.9 * self.page_size;
        self.value = self.clamp(self.value);
    }

    /// Write the value without notifying
    pub fn set_value_silently(&mut self, value: f64) {
        self.value = self.clamp(value);
    }

    /// Host-initiated write; queues a notification if the value changed.
    /// Returns whether it did.
    pub fn set_value(&mut self, value: f64) -> bool {
        let clamped = self.clamp(value);
        if clamped == self.value {
            return false;
        }

        self.value = clamped;
        self.pending = true;
        true
    }

    /// Consume the pending change notification
    pub fn take_notification(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> RangeControl {
        let mut range = RangeControl::default();
        range.configure(1000.0, 200.0);
        range
    }

    #[test]
    fn test_configure_sets_increments() {
        let range = configured();
        assert_eq!(range.upper(), 1000.0);
        assert_eq!(range.page_size(), 200.0);
        assert_eq!(range.step_increment(), 20.0);
        assert_eq!(range.page_increment(), 180.0);
        assert_eq!(range.max_value(), 800.0);
    }

    #[test]
    fn test_configure_reclamps_without_notifying() {
        let mut range = configured();
        range.set_value_silently(700.0);

        range.configure(500.0, 200.0);
        assert_eq!(range.value(), 300.0);
        assert!(!range.take_notification());
    }

    #[test]
    fn test_set_value_notifies_only_on_change() {
        let mut range = configured();

        assert!(range.set_value(100.0));
        assert!(range.take_notification());
        assert!(!range.take_notification());

        // Same value: no echo
        assert!(!range.set_value(100.0));
        assert!(!range.take_notification());

        // Clamped to the same maximum twice
        assert!(range.set_value(5000.0));
        assert_eq!(range.value(), 800.0);
        assert!(range.take_notification());
        assert!(!range.set_value(9000.0));
    }

    #[test]
    fn test_page_larger_than_upper() {
        let mut range = RangeControl::default();
        range.configure(100.0, 400.0);
        range.set_value_silently(50.0);
        assert_eq!(range.value(), 0.0);
    }
}
