use std::io::Write;

use cardinal::core::{CardinalError, ChatModel, FunctionAvailable, Message, Settings};
use cardinal::openai::ChatOpenAi;
use futures::StreamExt;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), CardinalError> {
    tracing_subscriber::fmt::init();

    let model = ChatOpenAi::new(&Settings::from_env())?;
    println!("model: {}", model.model());

    // Blocking-style completion.
    let messages = vec![Message::human("Say this is a test")];
    let reply = model.chat(&messages).await?;
    println!("chat: {reply}");

    // Streamed completion.
    print!("stream: ");
    let mut stream = model.stream_chat(messages.clone());
    while let Some(chunk) = stream.next().await {
        print!("{}", chunk?);
        let _ = std::io::stdout().flush();
    }
    println!();

    // Single tool call.
    let tools = [FunctionAvailable::new(
        "get_current_weather",
        "Get the current weather in a given location",
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The city and state, e.g. San Francisco, CA"
                },
                "unit": {"type": "string", "enum": ["celsius", "fahrenheit"]}
            },
            "required": ["location"]
        }),
    )];
    let call = model
        .function_call(
            &[Message::human("What's the weather like in Boston today?")],
            &tools,
        )
        .await?;
    println!("function_call: {} {:?}", call.name, call.arguments);

    Ok(())
}
