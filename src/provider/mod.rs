pub mod credentials;
pub mod error;
pub mod fallback;
pub mod mock;
pub mod openai_compatible;
pub mod ports;
pub mod prompt;
pub mod reliability;
pub mod types;

pub use credentials::{CredentialProvider, EnvCredentialProvider};
pub use error::{ProviderError, ProviderErrorKind};
pub use fallback::FallbackGenerator;
pub use mock::{MOCK_PROVIDER_ID, MockProvider};
pub use openai_compatible::OpenAiCompatibleProvider;
pub use ports::LlmProvider;
pub use reliability::{ReliabilityLayer, ReliableProvider};
pub use types::{
    CredentialRef, Generation, GenerationConstraints, GenerationRequest, ProviderBackendConfig,
    ProviderDialect, ProvidersConfig, ReliabilityConfig, ResolvedCredential,
};
