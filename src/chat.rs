//! Question/answer service client.
//!
//! Sends a question plus the prior conversation to the hosted Q&A flow and
//! returns its answer with citations decoded. The service expects the
//! history as a single query parameter of parenthesized pairs:
//! `("q1", "a1") ("q2", "a2")`.
//!
//! Conversations are kept in a small JSON session file so that
//! `notebridge ask` can carry context across invocations.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::citation::{Answer, ParsedAnswer};
use crate::config::ChatConfig;
use crate::filename::FilenameCodec;

/// One question and the raw answer it received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

/// An ordered conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    #[serde(default)]
    pub turns: Vec<ChatTurn>,
}

impl ChatSession {
    /// Load a session, or start an empty one if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write session: {}", path.display()))
    }

    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ChatTurn {
            question: question.into(),
            answer: answer.into(),
        });
    }

    /// The history parameter, or `None` for a fresh conversation.
    pub fn history_param(&self) -> Option<String> {
        if self.turns.is_empty() {
            None
        } else {
            Some(encode_history(&self.turns))
        }
    }
}

/// Render turns as `("q", "a") ("q2", "a2")`.
///
/// Quotes and backslashes are escaped, and newlines are folded to `-` the
/// way the service flattens answers before evaluating the history.
pub fn encode_history(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("(\"{}\", \"{}\")", escape(&t.question), escape(&t.answer)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' | '\r' => out.push('-'),
            c => out.push(c),
        }
    }
    out
}

/// HTTP client for the Q&A flow.
pub struct QaClient {
    endpoint: String,
    codec: FilenameCodec,
    http: reqwest::Client,
}

impl QaClient {
    pub fn new(config: &ChatConfig, codec: FilenameCodec) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| anyhow::anyhow!("chat.endpoint is not configured"))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            endpoint,
            codec,
            http,
        })
    }

    /// Ask `question` in the context of `session` and return the raw body.
    pub async fn ask_raw(&self, question: &str, session: &ChatSession) -> Result<String> {
        let mut params = vec![("question", question.to_string())];
        if let Some(history) = session.history_param() {
            params.push(("chat_history", history));
        }

        debug!(endpoint = %self.endpoint, turns = session.turns.len(), "asking");
        let resp = self
            .http
            .post(&self.endpoint)
            .query(&params)
            .send()
            .await
            .with_context(|| format!("Q&A request to {} failed", self.endpoint))?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            bail!("Q&A service returned {}: {}", status, body);
        }
        Ok(body)
    }

    /// Ask and parse. The raw answer is appended to `session`.
    pub async fn ask(&self, question: &str, session: &mut ChatSession) -> Result<ParsedAnswer> {
        let body = self.ask_raw(question, session).await?;
        session.push(question, body.clone());
        let answer = Answer::from_response(&body, &self.codec);
        info!(
            structured = matches!(answer, Answer::Structured(_)),
            citations = answer.parsed().citations.len(),
            "answer received"
        );
        Ok(answer.into_parsed())
    }
}

/// Handle `notebridge ask`: ask one question, print the answer and sources.
pub async fn run_ask(
    config: &ChatConfig,
    codec: FilenameCodec,
    question: &str,
    session_path: Option<&Path>,
    reset: bool,
) -> Result<()> {
    let client = QaClient::new(config, codec)?;
    let mut session = match session_path {
        Some(path) if !reset => ChatSession::load(path)?,
        _ => ChatSession::default(),
    };

    let parsed = client.ask(question, &mut session).await?;

    println!("{}", parsed.answer_text.trim());
    if let Some(sources) = parsed.display_sources() {
        println!();
        println!("Sources: {}", sources);
    }

    if let Some(path) = session_path {
        session.save(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filename::FilenameScheme;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_encode_history() {
        let turns = vec![
            ChatTurn {
                question: "When did it start?".to_string(),
                answer: "January.\nSOURCES: x".to_string(),
            },
            ChatTurn {
                question: "Who said \"rest\"?".to_string(),
                answer: "Dr. Patel".to_string(),
            },
        ];
        assert_eq!(
            encode_history(&turns),
            r#"("When did it start?", "January.-SOURCES: x") ("Who said \"rest\"?", "Dr. Patel")"#
        );
    }

    #[test]
    fn test_empty_session_has_no_history() {
        assert!(ChatSession::default().history_param().is_none());
    }

    #[test]
    fn test_session_round_trip_on_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sessions/chat.json");
        assert_eq!(ChatSession::load(&path).unwrap(), ChatSession::default());

        let mut session = ChatSession::default();
        session.push("q", "a");
        session.save(&path).unwrap();
        assert_eq!(ChatSession::load(&path).unwrap(), session);
    }

    #[test]
    fn test_client_requires_endpoint() {
        let config = ChatConfig::default();
        assert!(QaClient::new(&config, FilenameCodec::default()).is_err());
    }

    /// Serve exactly one HTTP response and hand back the request head.
    async fn serve_once(body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{}/evernotechatbot", addr), handle)
    }

    #[tokio::test]
    async fn test_ask_decodes_and_records_turn() {
        let (endpoint, server) =
            serve_once("Paris.SOURCES: Notebook[Trips]__Note[France]__Id[ab12].enex").await;
        let config = ChatConfig {
            endpoint: Some(endpoint),
            timeout_secs: 5,
        };
        let client = QaClient::new(&config, FilenameCodec::new(FilenameScheme::Bracketed)).unwrap();

        let mut session = ChatSession::default();
        session.push("Earlier?", "Yes.");
        let parsed = client.ask("Capital of France?", &mut session).await.unwrap();

        assert_eq!(parsed.answer_text, "Paris.");
        assert_eq!(parsed.citations[0].title, "France");
        assert_eq!(session.turns.len(), 2);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /evernotechatbot?question=Capital+of+France%3F"));
        assert!(request.contains("chat_history="));
    }
}
