use std::{collections::BTreeMap, fmt};

use reqwest::Url;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::{
    config::ServerConfig,
    network::{headers, types::RequestError},
};

/// HTTP verbs the backend understands, rendered as uppercase strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Delete,
    Get,
    Patch,
    Post,
    Put,
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = serde_variant::to_variant_name(self).map_err(|_| fmt::Error)?;
        f.write_str(name)
    }
}

impl From<RequestMethod> for reqwest::Method {
    fn from(method: RequestMethod) -> Self {
        match method {
            RequestMethod::Delete => reqwest::Method::DELETE,
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Patch => reqwest::Method::PATCH,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Put => reqwest::Method::PUT,
        }
    }
}

/// Everything needed to issue one call. Built once per call and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescription {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub method: RequestMethod,
    pub header: BTreeMap<String, String>,
    pub body: Option<Map<String, Value>>,
}

impl EndpointDescription {
    /// Assemble the URL. The port is only applied when `include_port` is set.
    pub fn url(&self, include_port: bool) -> Result<Url, RequestError> {
        if self.scheme.is_empty() || !is_valid_host(&self.host) {
            return Err(RequestError::InvalidUrl);
        }
        if !self.path.is_empty() && !self.path.starts_with('/') {
            return Err(RequestError::InvalidUrl);
        }
        let mut url = Url::parse(&format!("{}://{}", self.scheme, self.host))
            .map_err(|_| RequestError::InvalidUrl)?;
        if include_port && self.port.is_some() {
            url.set_port(self.port)
                .map_err(|_| RequestError::InvalidUrl)?;
        }
        url.set_path(&self.path);
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }

    /// Serialized body. A body that fails to serialize is sent as no body at all.
    pub fn body_bytes(&self) -> Option<Vec<u8>> {
        let body = self.body.as_ref()?;
        serde_json::to_vec(body)
            .inspect_err(|e| log::warn!("Dropping request body that failed to serialize: {}", e))
            .ok()
    }
}

fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && !host
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@' | ':'))
}

/// The remote operations the app talks to.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    SendConfirmationCode { email: String },
    IsCorrect { email: String, code: String },
    ActiveExist { email: String },
    CreateUser { email: String, name: String, code: String },
    Auth { user_name: String, code: String },
    AuthToken { token: String, came_from: String },
    UpdateToken { refresh_token: String },
    DeleteUser,
    GetUser,
    Callback { user_name: String, email: String, text: String },
    GetRoutes,
    GetUserRoutes,
    GetFullWayObject(u64),
    DownloadFullWay { id: u64 },
    SendFinishedWay { id: u64 },
    GetMapObjects,
    GetFullMapObject(u64),
}

impl Endpoint {
    pub fn method(&self) -> RequestMethod {
        match self {
            Endpoint::SendConfirmationCode { .. }
            | Endpoint::CreateUser { .. }
            | Endpoint::Auth { .. }
            | Endpoint::AuthToken { .. }
            | Endpoint::UpdateToken { .. }
            | Endpoint::Callback { .. }
            | Endpoint::SendFinishedWay { .. } => RequestMethod::Post,
            Endpoint::DeleteUser => RequestMethod::Delete,
            _ => RequestMethod::Get,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Endpoint::SendConfirmationCode { .. } => "/api/v1/auth/code".into(),
            Endpoint::IsCorrect { .. } => "/api/v1/auth/code/check".into(),
            Endpoint::ActiveExist { .. } => "/api/v1/users/exists".into(),
            Endpoint::CreateUser { .. } => "/api/v1/users".into(),
            Endpoint::Auth { .. } => "/api/v1/auth/login".into(),
            Endpoint::AuthToken { .. } => "/api/v1/auth/token".into(),
            Endpoint::UpdateToken { .. } => "/api/v1/auth/refresh".into(),
            Endpoint::DeleteUser | Endpoint::GetUser => "/api/v1/users/me".into(),
            Endpoint::Callback { .. } => "/api/v1/feedback".into(),
            Endpoint::GetRoutes => "/api/v1/routes".into(),
            Endpoint::GetUserRoutes => "/api/v1/users/me/routes".into(),
            Endpoint::GetFullWayObject(id) => format!("/api/v1/routes/{}", id),
            Endpoint::DownloadFullWay { id } => format!("/api/v1/routes/{}/download", id),
            Endpoint::SendFinishedWay { id } => format!("/api/v1/routes/{}/finish", id),
            Endpoint::GetMapObjects => "/api/v1/map-objects".into(),
            Endpoint::GetFullMapObject(id) => format!("/api/v1/map-objects/{}", id),
        }
    }

    fn query(&self) -> Vec<(String, String)> {
        match self {
            Endpoint::IsCorrect { email, code } => vec![
                ("email".into(), email.clone()),
                ("code".into(), code.clone()),
            ],
            Endpoint::ActiveExist { email } => vec![("email".into(), email.clone())],
            _ => Vec::new(),
        }
    }

    fn body(&self) -> Option<Map<String, Value>> {
        let value = match self {
            Endpoint::SendConfirmationCode { email } => json!({ "email": email }),
            Endpoint::CreateUser { email, name, code } => {
                json!({ "email": email, "name": name, "code": code })
            }
            Endpoint::Auth { user_name, code } => json!({ "username": user_name, "code": code }),
            Endpoint::AuthToken { token, came_from } => {
                json!({ "token": token, "cameFrom": came_from })
            }
            Endpoint::UpdateToken { refresh_token } => json!({ "refreshToken": refresh_token }),
            Endpoint::Callback {
                user_name,
                email,
                text,
            } => json!({ "userName": user_name, "email": email, "text": text }),
            _ => return None,
        };
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Whether the call needs the user's access token.
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Endpoint::DeleteUser
                | Endpoint::GetUser
                | Endpoint::Callback { .. }
                | Endpoint::GetUserRoutes
                | Endpoint::DownloadFullWay { .. }
                | Endpoint::SendFinishedWay { .. }
        )
    }

    /// Render the call against a server. The token is only attached to calls that need it.
    pub fn describe(
        &self,
        server: &ServerConfig,
        access_token: Option<&str>,
    ) -> EndpointDescription {
        let mut header = BTreeMap::new();
        header.insert(headers::CONTENT_TYPE.into(), headers::JSON.into());
        header.insert(headers::ACCEPT.into(), headers::JSON.into());
        if self.requires_auth() {
            match access_token.filter(|t| !t.is_empty()) {
                Some(token) => {
                    header.insert(headers::AUTHORIZATION.into(), format!("Bearer {}", token));
                }
                None => log::debug!("No access token available for {:?}", self),
            }
        }
        EndpointDescription {
            scheme: server.scheme.clone(),
            host: server.host.clone(),
            port: server.port,
            path: self.path(),
            query: self.query(),
            method: self.method(),
            header,
            body: self.body(),
        }
    }
}
