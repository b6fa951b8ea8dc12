use crate::frame::Frame;

/// Structured per-frame trace event.
///
/// The engine crates record what happened on which frame here (layer mounts,
/// camera arrivals, viewport resizes) so tests and the host shell can assert
/// on ordering without scraping logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub frame_index: u64,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, frame: Frame, kind: &'static str, message: impl Into<String>) {
        self.events.push(Event {
            frame_index: frame.index,
            kind,
            message: message.into(),
        });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events of one kind, in emission order.
    pub fn of_kind(&self, kind: &str) -> Vec<&Event> {
        self.events.iter().filter(|e| e.kind == kind).collect()
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::EventBus;
    use crate::frame::Frame;

    #[test]
    fn records_events_with_frame_index() {
        let mut bus = EventBus::new();
        bus.emit(Frame::new(3, 0.1), "layer", "mounted");
        assert_eq!(bus.events().len(), 1);
        assert_eq!(bus.events()[0].frame_index, 3);
    }

    #[test]
    fn of_kind_filters() {
        let mut bus = EventBus::new();
        let f = Frame::new(0, 1.0);
        bus.emit(f, "layer", "mounted");
        bus.emit(f, "camera", "arrived");
        bus.emit(f, "layer", "removed");
        let layer_events = bus.of_kind("layer");
        assert_eq!(layer_events.len(), 2);
        assert_eq!(layer_events[1].message, "removed");
    }

    #[test]
    fn drain_clears_events() {
        let mut bus = EventBus::new();
        bus.emit(Frame::new(0, 1.0), "k", "m");
        assert_eq!(bus.drain().len(), 1);
        assert!(bus.events().is_empty());
    }
}
