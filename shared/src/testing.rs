//! Fixtures for unit tests.

use std::path::Path;

use crate::model::{Department, LatLon, Report, ReportId, ReportParts, UnixTimeMs};

/// Removes the first effect of the given capability and returns its request.
macro_rules! take_effect {
    ($effects:expr, $variant:ident) => {{
        let index = $effects
            .iter()
            .position(|e| matches!(e, $crate::capabilities::Effect::$variant(_)))
            .unwrap_or_else(|| panic!(concat!("no ", stringify!($variant), " effect")));
        match $effects.remove(index) {
            $crate::capabilities::Effect::$variant(request) => request,
            _ => unreachable!(),
        }
    }};
}

pub(crate) use take_effect;

/// Writes what a native recorder leaves behind: an MPEG-4 header and some payload.
pub(crate) fn write_recording(target: &Path) {
    let mut bytes = b"\x00\x00\x00\x18ftypM4A ".to_vec();
    bytes.extend(std::iter::repeat(0xAB).take(4096));
    std::fs::write(target, bytes).unwrap();
}

/// A minimal finalized report.
pub(crate) fn report(id: u64, title: &str, created_at_ms: u64) -> Report {
    Report::new_active(ReportParts {
        id: ReportId(id),
        title: title.to_string(),
        category: Department::Road,
        description: String::new(),
        location: "MG Road, Bengaluru".to_string(),
        coordinates: LatLon::new(12.9716, 77.5946),
        image_ref: None,
        audio_ref: None,
        created_at: "05 Mar 2024, 14:07".to_string(),
        created_at_ms: UnixTimeMs(created_at_ms),
    })
}
