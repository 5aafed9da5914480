/// Process-wide configuration, read once at startup and passed into
/// constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub chat_model: String,
    pub default_embed_model: String,
    pub default_reranker_model: String,
    pub hf_tokenizer_path: Option<String>,
    /// Embedding endpoint credentials. When unset the OpenAI ones apply.
    pub embed_api_key: Option<String>,
    pub embed_base_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub redis_uri: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chat_model: "gpt-3.5-turbo".to_string(),
            default_embed_model: "text-embedding-ada-002".to_string(),
            default_reranker_model: "text-embedding-3-large".to_string(),
            hf_tokenizer_path: None,
            embed_api_key: None,
            embed_base_url: None,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            redis_uri: "redis://localhost:6379".to_string(),
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for unset
    /// or empty variables.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            chat_model: get("CHAT_MODEL")
                .or_else(|| get("DEFAULT_CHAT_MODEL"))
                .unwrap_or(defaults.chat_model),
            default_embed_model: get("DEFAULT_EMBED_MODEL")
                .unwrap_or(defaults.default_embed_model),
            default_reranker_model: get("DEFAULT_RERANKER_MODEL")
                .unwrap_or(defaults.default_reranker_model),
            hf_tokenizer_path: get("HF_TOKENIZER_PATH"),
            embed_api_key: get("EMBED_API_KEY"),
            embed_base_url: get("EMBED_BASE_URL"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            redis_uri: get("REDIS_URI").unwrap_or(defaults.redis_uri),
        }
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    pub fn with_openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.openai_base_url = url.into();
        self
    }

    pub fn with_redis_uri(mut self, uri: impl Into<String>) -> Self {
        self.redis_uri = uri.into();
        self
    }
}
