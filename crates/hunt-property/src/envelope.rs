use serde::Serialize;

/// `{"success": true, "data": ...}` wrapper used by the filter screen and the
/// calculators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
