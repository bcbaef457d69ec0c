/// Remote services: Google OAuth, Drive and Sheets
pub mod http;
pub mod oauth;
pub mod sheets;
