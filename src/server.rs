//! Line-delimited JSON tool server
//!
//! One request per line on the reader, one response per line on the writer:
//!
//! ```text
//! {"id":1,"method":"list_tools"}
//! {"id":2,"method":"call_tool","name":"run_command","arguments":{"command":"ls"}}
//! ```
//!
//! Requests are handled in order. A line that is not valid UTF-8 or not a
//! valid request gets an error response; the loop ends at EOF.

use crate::errors::Result;
use crate::tools::executor::ToolDispatcher;
use crate::tools::types::{ToolResponse, ToolSchema};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Incoming request
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Request {
    ListTools,
    CallTool {
        name: String,
        #[serde(default)]
        arguments: Option<serde_json::Value>,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(flatten)]
    request: Request,
}

/// Outgoing response
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Tools {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<serde_json::Value>,
        tools: Vec<ToolSchema>,
    },
    Content {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<serde_json::Value>,
        #[serde(flatten)]
        response: ToolResponse,
    },
}

fn invalid_request(error: impl Display) -> Response {
    Response::Content {
        id: None,
        response: ToolResponse::failure(format!("Invalid request: {}", error)),
    }
}

/// Handle one raw request line
pub async fn handle_line(dispatcher: &ToolDispatcher, line: &str) -> Response {
    let envelope: Envelope = match serde_json::from_str(line) {
        Ok(envelope) => envelope,
        Err(e) => return invalid_request(e),
    };

    match envelope.request {
        Request::ListTools => Response::Tools {
            id: envelope.id,
            tools: dispatcher.list_tools(),
        },
        Request::CallTool { name, arguments } => Response::Content {
            id: envelope.id,
            response: dispatcher.call_tool(&name, arguments.as_ref()).await,
        },
    }
}

/// Serve requests from `reader` until EOF
pub async fn serve<R, W>(dispatcher: &ToolDispatcher, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer).await? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buffer) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                handle_line(dispatcher, trimmed).await
            }
            Err(e) => invalid_request(e),
        };
        let encoded = serde_json::to_string(&response)?;
        writer.write_all(encoded.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Serve on process stdin/stdout
pub async fn serve_stdio(dispatcher: &ToolDispatcher) -> Result<()> {
    let reader = tokio::io::BufReader::new(tokio::io::stdin());
    serve(dispatcher, reader, tokio::io::stdout()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AllowList, SecurityPolicy};
    use crate::telemetry::TelemetryCollector;
    use crate::tools::gateway::Gateway;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup_dispatcher() -> (ToolDispatcher, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("hello.txt"), "hi there").unwrap();
        let policy = SecurityPolicy::new(AllowList::parse("cat,ls"), AllowList::parse("-l"));
        let gateway = Gateway::new(temp_dir.path(), policy, TelemetryCollector::new()).unwrap();
        (ToolDispatcher::new(Arc::new(gateway), 2), temp_dir)
    }

    async fn roundtrip(dispatcher: &ToolDispatcher, input: &str) -> Vec<serde_json::Value> {
        roundtrip_bytes(dispatcher, input.as_bytes()).await
    }

    async fn roundtrip_bytes(dispatcher: &ToolDispatcher, input: &[u8]) -> Vec<serde_json::Value> {
        let mut output = Vec::new();
        serve(dispatcher, input, &mut output).await.unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_list_tools() {
        let (dispatcher, _temp) = setup_dispatcher();
        let responses = roundtrip(&dispatcher, "{\"id\":1,\"method\":\"list_tools\"}\n").await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["tools"].as_array().unwrap().len(), 2);
        assert_eq!(responses[0]["tools"][0]["name"], "run_command");
    }

    #[tokio::test]
    async fn test_call_tool() {
        let (dispatcher, _temp) = setup_dispatcher();
        let input = r#"{"id":"a","method":"call_tool","name":"run_command","arguments":{"command":"cat ./hello.txt"}}"#;
        let responses = roundtrip(&dispatcher, input).await;

        assert_eq!(responses[0]["id"], "a");
        let content = responses[0]["content"].as_array().unwrap();
        assert_eq!(content[0]["text"], "hi there");
        assert_eq!(content[0]["error"], false);
        assert_eq!(content[1]["text"], "\nCommand completed with return code: 0");
    }

    #[tokio::test]
    async fn test_missing_arguments() {
        let (dispatcher, _temp) = setup_dispatcher();
        let input = r#"{"method":"call_tool","name":"run_command"}"#;
        let responses = roundtrip(&dispatcher, input).await;

        assert!(responses[0].get("id").is_none());
        assert_eq!(responses[0]["content"][0]["text"], "No command provided");
        assert_eq!(responses[0]["content"][0]["error"], true);
    }

    #[tokio::test]
    async fn test_malformed_lines_and_blank_lines() {
        let (dispatcher, _temp) = setup_dispatcher();
        let input = "not json\n\n{\"method\":\"bogus\"}\n";
        let responses = roundtrip(&dispatcher, input).await;

        assert_eq!(responses.len(), 2);
        for response in responses {
            assert_eq!(response["content"][0]["error"], true);
            assert!(response["content"][0]["text"]
                .as_str()
                .unwrap()
                .starts_with("Invalid request"));
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_stop_serving() {
        let (dispatcher, _temp) = setup_dispatcher();
        let input = b"\xff\xfe garbage\n{\"id\":1,\"method\":\"list_tools\"}\n";
        let responses = roundtrip_bytes(&dispatcher, input).await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["content"][0]["error"], true);
        assert!(responses[0]["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request"));
        assert_eq!(responses[1]["id"], 1);
        assert_eq!(responses[1]["tools"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let (dispatcher, _temp) = setup_dispatcher();
        let responses = roundtrip(&dispatcher, "{\"id\":7,\"method\":\"list_tools\"}").await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 7);
    }

    #[tokio::test]
    async fn test_multiple_requests_in_order() {
        let (dispatcher, _temp) = setup_dispatcher();
        let input = concat!(
            "{\"id\":1,\"method\":\"call_tool\",\"name\":\"show_security_rules\"}\n",
            "{\"id\":2,\"method\":\"call_tool\",\"name\":\"run_command\",\"arguments\":{\"command\":\"cat ../x; ls\"}}\n",
        );
        let responses = roundtrip(&dispatcher, input).await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert!(responses[0]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Security Configuration:"));
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(
            responses[1]["content"][0]["text"],
            "Security violation: Shell operator ';' is not supported"
        );
    }
}
