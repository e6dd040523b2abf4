use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Every way a request can fail once it reaches the executor.
///
/// The set is closed: callers match on it exhaustively and no variant carries
/// transport details.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    #[error("response body could not be decoded")]
    Decode,
    #[error("endpoint does not form a valid URL")]
    InvalidUrl,
    #[error("no readable response was received")]
    NoResponse,
    #[error("request was not authorized (401)")]
    Unauthorized,
    #[error("unexpected response status")]
    UnexpectedStatusCode,
    #[error("request failed in transport")]
    Unknown,
    #[error("server error (5xx)")]
    Server,
    #[error("resource not found (404)")]
    UserError,
}

impl RequestError {
    /// The message shown to the user for this kind of failure.
    pub fn custom_message(&self) -> &'static str {
        match self {
            RequestError::Decode => "Decode error",
            RequestError::Unauthorized => "Session expired",
            RequestError::Server => "Something went wrong",
            _ => "Unknown error",
        }
    }
}

/// A shape the executor can produce from a response.
///
/// `from_status_code` is used instead of decoding when the caller asks for
/// the status only. Shapes other than [`StatusCode`] produce nothing there.
pub trait ResponseModel: DeserializeOwned {
    fn from_status_code(_status_code: u16) -> Option<Self> {
        None
    }
}

impl<T: DeserializeOwned> ResponseModel for Vec<T> {}

/// Minimal success value for operations whose body is not decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCode {
    pub status_code: u16,
}

impl StatusCode {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status_code)
    }
}

impl ResponseModel for StatusCode {
    fn from_status_code(status_code: u16) -> Option<Self> {
        Some(Self { status_code })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsCodeCorrect {
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsUserExist {
    pub is_exist: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Token pair returned by the login endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auth {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenObject {
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserObject {
    pub id: u64,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub finished_routes: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// A route with all of its stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullWayObject {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub length_km: Option<f64>,
    #[serde(default)]
    pub points: Vec<MapObjectFullModel>,
}

/// A point of interest shown on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapObjectFullModel {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub images: Vec<String>,
}

impl ResponseModel for IsCodeCorrect {}
impl ResponseModel for IsUserExist {}
impl ResponseModel for CreateUser {}
impl ResponseModel for Auth {}
impl ResponseModel for AccessTokenObject {}
impl ResponseModel for UserObject {}
impl ResponseModel for FullWayObject {}
impl ResponseModel for MapObjectFullModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(RequestError::Decode, "Decode error")]
    #[case(RequestError::Unauthorized, "Session expired")]
    #[case(RequestError::Server, "Something went wrong")]
    #[case(RequestError::InvalidUrl, "Unknown error")]
    #[case(RequestError::NoResponse, "Unknown error")]
    #[case(RequestError::UnexpectedStatusCode, "Unknown error")]
    #[case(RequestError::Unknown, "Unknown error")]
    #[case(RequestError::UserError, "Unknown error")]
    fn custom_messages(#[case] error: RequestError, #[case] expected: &str) {
        assert_eq!(error.custom_message(), expected);
    }

    #[test]
    fn only_status_code_is_built_from_a_status() {
        assert_eq!(
            StatusCode::from_status_code(204),
            Some(StatusCode { status_code: 204 })
        );
        assert_eq!(Auth::from_status_code(204), None);
        assert_eq!(Vec::<FullWayObject>::from_status_code(200), None);
    }

    #[test]
    fn deserialize_route_with_missing_optionals() {
        let json = r#"{
            "id": 7,
            "name": "Old town",
            "points": [
                {"id": 1, "name": "Gate", "coordinate": {"latitude": 55.75, "longitude": 37.61}}
            ]
        }"#;
        let way: FullWayObject = serde_json::from_str(json).unwrap();
        assert_eq!(way.id, 7);
        assert_eq!(way.description, None);
        assert_eq!(way.points.len(), 1);
        assert_eq!(way.points[0].images, Vec::<String>::new());
    }
}
