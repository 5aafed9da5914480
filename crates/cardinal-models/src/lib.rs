pub mod backend;
pub use backend::{
    ByteStream, FakeBackend, HttpBackend, HttpBackendConfig, ProviderBackend, ProviderRequest,
    ProviderResponse,
};

mod retry;
pub use retry::RetryPolicy;
