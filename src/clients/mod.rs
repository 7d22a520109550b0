pub mod chat_client;
pub mod http_client;
