use crate::event::GcClass;

/// Default long pause threshold in milliseconds.
pub const LONG_PAUSE_MS: f64 = 100.0;

const CONCURRENT_MARKERS: [&str; 3] = ["Concurrent", "Remark", "Cleanup"];

/// Display attributes of a GC class. Higher priority draws above lower priority.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassStyle {
    pub color: &'static str,
    pub radius: f64,
    pub priority: u8,
}

impl GcClass {
    pub fn style(self) -> ClassStyle {
        match self {
            GcClass::Full => ClassStyle {
                color: "#e74c3c",
                radius: 6.0,
                priority: 5,
            },
            GcClass::Concurrent => ClassStyle {
                color: "#9b59b6",
                radius: 4.0,
                priority: 4,
            },
            GcClass::LongPause => ClassStyle {
                color: "#e67e22",
                radius: 5.0,
                priority: 3,
            },
            GcClass::Mixed => ClassStyle {
                color: "#3498db",
                radius: 3.5,
                priority: 2,
            },
            GcClass::Normal => ClassStyle {
                color: "#2ecc71",
                radius: 2.5,
                priority: 1,
            },
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GcClass::Full => "Full GC",
            GcClass::Concurrent => "Concurrent",
            GcClass::LongPause => "Long Pause",
            GcClass::Mixed => "Mixed",
            GcClass::Normal => "Normal",
        }
    }
}

/// Color of a long pause whose action also mentions a mixed collection.
pub const MIXED_LONG_PAUSE_COLOR: &str = "#d35400";

/// Result of classifying one GC event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub class: GcClass,
    pub mixed_long: bool,
}

impl Classification {
    pub fn color(&self) -> &'static str {
        if self.mixed_long {
            MIXED_LONG_PAUSE_COLOR
        } else {
            self.class.style().color
        }
    }
}

/// Classify a GC event. First match wins:
/// Full > Concurrent > Long pause > Mixed > Normal.
pub fn classify(
    action: &str,
    actions: &[String],
    duration_ms: f64,
    long_pause_ms: f64,
) -> Classification {
    let concurrent = actions
        .iter()
        .any(|a| CONCURRENT_MARKERS.iter().any(|m| a.contains(m)));
    let mixed = action.contains("Mixed");

    let class = if action.contains("Pause Full") {
        GcClass::Full
    } else if concurrent {
        GcClass::Concurrent
    } else if duration_ms > long_pause_ms {
        GcClass::LongPause
    } else if mixed {
        GcClass::Mixed
    } else {
        GcClass::Normal
    };

    Classification {
        class,
        mixed_long: class == GcClass::LongPause && mixed,
    }
}
