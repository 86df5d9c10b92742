use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub credentials_path: String,
    pub token_path: String,
    pub redirect_uri: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let credentials_path = env::var("GFETCH_CREDENTIALS_PATH")
            .unwrap_or_else(|_| "credentials.json".to_string());
        let token_path = env::var("GFETCH_TOKEN_PATH").unwrap_or_else(|_| "token.json".to_string());
        let redirect_uri = env::var("GFETCH_REDIRECT_URI")
            .unwrap_or_else(|_| "urn:ietf:wg:oauth:2.0:oob".to_string());

        Self {
            credentials_path,
            token_path,
            redirect_uri,
        }
    }
}
