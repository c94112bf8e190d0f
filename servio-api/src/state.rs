use servio_store::DbClient;

#[derive(Clone)]
pub struct AppState {
    pub db: DbClient,
    pub auth: AuthConfig,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}
