use serde::{Deserialize, Serialize};

/// One geolocation observation as delivered by the fix source.
///
/// `altitude` and `accuracy` serialize as explicit `null` when absent, so
/// the stored layout always carries all five keys; absent is distinct from
/// zero. Coordinates pass through unvalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Milliseconds since the UNIX epoch, stamped by the source.
    pub timestamp: i64,
}
