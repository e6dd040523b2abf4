use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    config::ServerConfig,
    network::{
        client::HttpClient,
        endpoint::Endpoint,
        types::{
            AccessTokenObject, Auth, CreateUser, FullWayObject, IsCodeCorrect, IsUserExist,
            MapObjectFullModel, RequestError, ResponseModel, StatusCode, UserObject,
        },
    },
    storage::{ACCESS_TOKEN, CredentialStore},
};

pub type RequestResult<T> = Result<Option<T>, RequestError>;

/// The remote account operation the lifecycle flow depends on.
pub trait AccountApi {
    async fn delete_user(&self, cancellation_token: CancellationToken) -> RequestResult<StatusCode>;
}

/// Every remote operation of the app, each bound to its endpoint and response shape.
pub struct NetworkService<TClient: HttpClient, TCredentials: CredentialStore> {
    client: TClient,
    credentials: Arc<TCredentials>,
    server: ServerConfig,
}

impl<TClient: HttpClient, TCredentials: CredentialStore> NetworkService<TClient, TCredentials> {
    pub fn new(client: TClient, credentials: Arc<TCredentials>, server: ServerConfig) -> Self {
        Self {
            client,
            credentials,
            server,
        }
    }

    async fn call<T: ResponseModel>(
        &self,
        endpoint: Endpoint,
        decode: bool,
        cancellation_token: CancellationToken,
    ) -> RequestResult<T> {
        let token = if endpoint.requires_auth() {
            self.credentials.credential(ACCESS_TOKEN)
        } else {
            None
        };
        let description = endpoint.describe(&self.server, token.as_deref());
        self.client
            .send_request(&description, decode, cancellation_token)
            .await
    }

    pub async fn send_confirmation_code(
        &self,
        email: &str,
        ct: CancellationToken,
    ) -> RequestResult<StatusCode> {
        let endpoint = Endpoint::SendConfirmationCode {
            email: email.into(),
        };
        self.call(endpoint, false, ct).await
    }

    pub async fn check_on_correct_code(
        &self,
        email: &str,
        code: &str,
        ct: CancellationToken,
    ) -> RequestResult<IsCodeCorrect> {
        let endpoint = Endpoint::IsCorrect {
            email: email.into(),
            code: code.into(),
        };
        self.call(endpoint, true, ct).await
    }

    pub async fn check_on_active_exists(
        &self,
        email: &str,
        ct: CancellationToken,
    ) -> RequestResult<IsUserExist> {
        let endpoint = Endpoint::ActiveExist {
            email: email.into(),
        };
        self.call(endpoint, true, ct).await
    }

    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        code: &str,
        ct: CancellationToken,
    ) -> RequestResult<CreateUser> {
        let endpoint = Endpoint::CreateUser {
            email: email.into(),
            name: name.into(),
            code: code.into(),
        };
        self.call(endpoint, true, ct).await
    }

    pub async fn auth(
        &self,
        user_name: &str,
        code: &str,
        ct: CancellationToken,
    ) -> RequestResult<Auth> {
        let endpoint = Endpoint::Auth {
            user_name: user_name.into(),
            code: code.into(),
        };
        self.call(endpoint, true, ct).await
    }

    pub async fn auth_token(
        &self,
        token: &str,
        came_from: &str,
        ct: CancellationToken,
    ) -> RequestResult<Auth> {
        let endpoint = Endpoint::AuthToken {
            token: token.into(),
            came_from: came_from.into(),
        };
        self.call(endpoint, true, ct).await
    }

    pub async fn update_token(
        &self,
        refresh_token: &str,
        ct: CancellationToken,
    ) -> RequestResult<AccessTokenObject> {
        let endpoint = Endpoint::UpdateToken {
            refresh_token: refresh_token.into(),
        };
        self.call(endpoint, true, ct).await
    }

    pub async fn get_user(&self, ct: CancellationToken) -> RequestResult<UserObject> {
        self.call(Endpoint::GetUser, true, ct).await
    }

    pub async fn callback(
        &self,
        user_name: &str,
        email: &str,
        text: &str,
        ct: CancellationToken,
    ) -> RequestResult<StatusCode> {
        let endpoint = Endpoint::Callback {
            user_name: user_name.into(),
            email: email.into(),
            text: text.into(),
        };
        self.call(endpoint, false, ct).await
    }

    pub async fn get_app_routes(&self, ct: CancellationToken) -> RequestResult<Vec<FullWayObject>> {
        self.call(Endpoint::GetRoutes, true, ct).await
    }

    pub async fn get_user_routes(
        &self,
        ct: CancellationToken,
    ) -> RequestResult<Vec<FullWayObject>> {
        self.call(Endpoint::GetUserRoutes, true, ct).await
    }

    pub async fn get_full_way_object(
        &self,
        id: u64,
        ct: CancellationToken,
    ) -> RequestResult<FullWayObject> {
        self.call(Endpoint::GetFullWayObject(id), true, ct).await
    }

    pub async fn download_way(
        &self,
        id: u64,
        ct: CancellationToken,
    ) -> RequestResult<FullWayObject> {
        self.call(Endpoint::DownloadFullWay { id }, true, ct).await
    }

    pub async fn send_finished_way(
        &self,
        id: u64,
        ct: CancellationToken,
    ) -> RequestResult<StatusCode> {
        self.call(Endpoint::SendFinishedWay { id }, false, ct).await
    }

    pub async fn get_map_objects(
        &self,
        ct: CancellationToken,
    ) -> RequestResult<Vec<MapObjectFullModel>> {
        self.call(Endpoint::GetMapObjects, true, ct).await
    }

    pub async fn get_full_map_object(
        &self,
        id: u64,
        ct: CancellationToken,
    ) -> RequestResult<MapObjectFullModel> {
        self.call(Endpoint::GetFullMapObject(id), true, ct).await
    }
}

impl<TClient, TCredentials> AccountApi for NetworkService<TClient, TCredentials>
where
    TClient: HttpClient,
    TCredentials: CredentialStore,
{
    async fn delete_user(
        &self,
        cancellation_token: CancellationToken,
    ) -> RequestResult<StatusCode> {
        self.call(Endpoint::DeleteUser, false, cancellation_token)
            .await
    }
}
