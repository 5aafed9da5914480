use std::collections::HashMap;

use cardinal_core::Settings;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_when_nothing_set() {
    let settings = Settings::from_lookup(lookup(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.chat_model, "gpt-3.5-turbo");
    assert_eq!(settings.default_embed_model, "text-embedding-ada-002");
    assert_eq!(settings.default_reranker_model, "text-embedding-3-large");
    assert_eq!(settings.openai_base_url, "https://api.openai.com/v1");
    assert_eq!(settings.redis_uri, "redis://localhost:6379");
    assert!(settings.openai_api_key.is_none());
    assert!(settings.hf_tokenizer_path.is_none());
}

#[test]
fn chat_model_prefers_chat_model_variable() {
    let settings = Settings::from_lookup(lookup(&[
        ("CHAT_MODEL", "gpt-4o"),
        ("DEFAULT_CHAT_MODEL", "gpt-4o-mini"),
    ]));
    assert_eq!(settings.chat_model, "gpt-4o");

    let settings = Settings::from_lookup(lookup(&[("DEFAULT_CHAT_MODEL", "gpt-4o-mini")]));
    assert_eq!(settings.chat_model, "gpt-4o-mini");
}

#[test]
fn empty_values_fall_back_to_defaults() {
    let settings = Settings::from_lookup(lookup(&[("REDIS_URI", ""), ("OPENAI_API_KEY", "")]));
    assert_eq!(settings.redis_uri, "redis://localhost:6379");
    assert!(settings.openai_api_key.is_none());
}

#[test]
fn reads_every_variable() {
    let settings = Settings::from_lookup(lookup(&[
        ("DEFAULT_EMBED_MODEL", "embed"),
        ("DEFAULT_RERANKER_MODEL", "rerank"),
        ("HF_TOKENIZER_PATH", "/tmp/tok"),
        ("EMBED_API_KEY", "ek"),
        ("EMBED_BASE_URL", "http://embed"),
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_BASE_URL", "http://localhost:8080/v1"),
        ("REDIS_URI", "redis://cache:6379/2"),
    ]));
    assert_eq!(settings.default_embed_model, "embed");
    assert_eq!(settings.default_reranker_model, "rerank");
    assert_eq!(settings.hf_tokenizer_path.as_deref(), Some("/tmp/tok"));
    assert_eq!(settings.embed_api_key.as_deref(), Some("ek"));
    assert_eq!(settings.embed_base_url.as_deref(), Some("http://embed"));
    assert_eq!(settings.openai_api_key.as_deref(), Some("sk-test"));
    assert_eq!(settings.openai_base_url, "http://localhost:8080/v1");
    assert_eq!(settings.redis_uri, "redis://cache:6379/2");
}

#[test]
fn builder_methods_override() {
    let settings = Settings::default()
        .with_chat_model("m")
        .with_openai_api_key("k")
        .with_openai_base_url("http://x")
        .with_redis_uri("redis://y");
    assert_eq!(settings.chat_model, "m");
    assert_eq!(settings.openai_api_key.as_deref(), Some("k"));
    assert_eq!(settings.openai_base_url, "http://x");
    assert_eq!(settings.redis_uri, "redis://y");
}
