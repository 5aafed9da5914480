mod chat_model;

pub use chat_model::{parse_messages, parse_tools, ChatOpenAi, OpenAiConfig};
