//! ClickHouse HTTP Engine
//!
//! [`QueryEngine`] over the ClickHouse HTTP interface.
//!
//! Statements are POSTed with `FORMAT JSONCompactEachRowWithNamesAndTypes`,
//! so the body is one JSON array per line: column names, column types, then
//! one line per row. Positional `$n` placeholders become typed server-side
//! parameters (`{pN:Type}` + `param_pN=...`), so values never reach the SQL
//! text.
//!
//! Dropping the future returned by [`ClickHouseHttp::query`] closes the
//! connection; with `cancel_http_readonly_queries_on_client_close` set the
//! server then cancels the running query.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::{ColumnMeta, QueryEngine, RawRow, ResultSet, Statement};

const OUTPUT_FORMAT: &str = "JSONCompactEachRowWithNamesAndTypes";

/// Connection settings for the ClickHouse HTTP interface
#[derive(Debug, Clone, Deserialize)]
pub struct ClickHouseConfig {
    /// Base URL, e.g. "http://localhost:8123"
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Database used when a statement does not name one
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Ask the server to refuse writes (`readonly=2`)
    #[serde(default = "default_readonly")]
    pub readonly: bool,
}

fn default_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_username() -> String {
    "default".to_string()
}

fn default_database() -> String {
    "default".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_readonly() -> bool {
    true
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: default_username(),
            password: String::new(),
            database: default_database(),
            connect_timeout_secs: default_connect_timeout(),
            readonly: default_readonly(),
        }
    }
}

/// ClickHouse HTTP client
pub struct ClickHouseHttp {
    client: Client,
    config: ClickHouseConfig,
}

impl ClickHouseHttp {
    /// Create a client. No connection is made until the first statement.
    pub fn new(config: ClickHouseConfig) -> EngineResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        self.config.url.trim_end_matches('/').to_string()
    }

    fn map_send_error(e: reqwest::Error) -> EngineError {
        if e.is_connect() || e.is_timeout() {
            EngineError::Unavailable(e.to_string())
        } else {
            EngineError::Request(e)
        }
    }
}

#[async_trait]
impl QueryEngine for ClickHouseHttp {
    async fn query(&self, statement: &Statement) -> EngineResult<ResultSet> {
        let (sql, params) = bind(statement)?;
        let sql = with_output_format(&sql);

        let database = statement
            .database
            .as_deref()
            .unwrap_or(&self.config.database);

        let mut query: Vec<(String, String)> = vec![
            ("database".to_string(), database.to_string()),
            ("date_time_output_format".to_string(), "iso".to_string()),
            (
                "cancel_http_readonly_queries_on_client_close".to_string(),
                "1".to_string(),
            ),
        ];
        if self.config.readonly {
            query.push(("readonly".to_string(), "2".to_string()));
        }
        query.extend(params);

        tracing::debug!(sql = %sql, args = statement.args.len(), database, "Sending statement");

        let mut request = self.client.post(self.endpoint()).query(&query).body(sql);
        if !self.config.username.is_empty() {
            request = request
                .header("X-ClickHouse-User", &self.config.username)
                .header("X-ClickHouse-Key", &self.config.password);
        }

        let response = request.send().await.map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::Server {
                status: status.as_u16(),
                message: text.trim().to_string(),
            });
        }

        let mut stream = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        let mut lines: Vec<String> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| EngineError::Stream(e.to_string()))?;
            buf.extend_from_slice(&chunk);

            while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                push_line(&mut lines, &line[..line.len() - 1]);
            }
        }
        if !buf.is_empty() {
            push_line(&mut lines, &buf);
        }

        parse_body(lines)
    }

    async fn ping(&self) -> EngineResult<()> {
        let url = format!("{}/ping", self.endpoint());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(EngineError::Unavailable(format!(
                "ping returned {}",
                response.status()
            )))
        }
    }
}

fn push_line(lines: &mut Vec<String>, bytes: &[u8]) {
    let line = String::from_utf8_lossy(bytes);
    let line = line.trim_end_matches('\r');
    if !line.is_empty() {
        lines.push(line.to_string());
    }
}

/// Split a response body into header lines and rows
///
/// Every line of a healthy body is a JSON array. Anything else is an
/// exception the server wrote after it had started streaming, either as
/// plain `Code: ...` text or as an `{"exception": ...}` object.
fn parse_body(lines: Vec<String>) -> EngineResult<ResultSet> {
    let mut lines = lines.into_iter();

    let names = match lines.next() {
        Some(line) => parse_header(&line, "names")?,
        None => return Ok(ResultSet::default()),
    };
    let types = match lines.next() {
        Some(line) => parse_header(&line, "types")?,
        None => {
            return Err(EngineError::Stream(
                "response ended before the column types line".to_string(),
            ))
        }
    };

    if names.len() != types.len() {
        return Err(EngineError::Stream(format!(
            "{} column names but {} column types",
            names.len(),
            types.len()
        )));
    }

    let columns = names
        .into_iter()
        .zip(types)
        .map(|(name, type_name)| ColumnMeta { name, type_name })
        .collect();

    let rows = lines
        .map(|line| {
            if line.starts_with('[') {
                Ok(RawRow::new(line))
            } else {
                Err(stream_exception(&line))
            }
        })
        .collect::<EngineResult<Vec<_>>>()?;

    Ok(ResultSet { columns, rows })
}

fn parse_header(line: &str, what: &str) -> EngineResult<Vec<String>> {
    if !line.starts_with('[') {
        return Err(stream_exception(line));
    }
    serde_json::from_str(line)
        .map_err(|e| EngineError::Stream(format!("invalid column {} line: {}", what, e)))
}

fn stream_exception(line: &str) -> EngineError {
    let message = serde_json::from_str::<serde_json::Value>(line)
        .ok()
        .and_then(|v| v.get("exception").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| line.to_string());
    EngineError::Stream(message)
}

/// Rewrite `$n` placeholders outside quoted text into typed parameters
///
/// Statements without arguments are passed through untouched.
fn bind(statement: &Statement) -> EngineResult<(String, Vec<(String, String)>)> {
    if statement.args.is_empty() {
        return Ok((statement.sql.clone(), Vec::new()));
    }

    let sql = &statement.sql;
    let mut out = String::with_capacity(sql.len() + 16);
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '$' => {
                let start = i + 1;
                let mut end = start;
                while let Some(&(j, d)) = chars.peek() {
                    if d.is_ascii_digit() {
                        end = j + 1;
                        chars.next();
                    } else {
                        break;
                    }
                }

                if end == start {
                    out.push('$');
                    continue;
                }

                let index: usize = sql[start..end]
                    .parse()
                    .map_err(|_| EngineError::Bind(format!("bad placeholder ${}", &sql[start..end])))?;
                let arg = index
                    .checked_sub(1)
                    .and_then(|i| statement.args.get(i))
                    .ok_or_else(|| {
                        EngineError::Bind(format!(
                            "placeholder ${} has no argument ({} given)",
                            index,
                            statement.args.len()
                        ))
                    })?;

                out.push_str(&format!("{{p{}:{}}}", index, arg.type_name()));
            }
            _ => out.push(c),
        }
    }

    let params = statement
        .args
        .iter()
        .enumerate()
        .map(|(i, arg)| (format!("param_p{}", i + 1), arg.to_param()))
        .collect();

    Ok((out, params))
}

/// Append the row format on its own line
///
/// A statement that names its own `FORMAT` gets two, which the server
/// rejects like any other bad statement.
fn with_output_format(sql: &str) -> String {
    let trimmed = sql.trim().trim_end_matches(';').trim_end();
    format!("{}\nFORMAT {}", trimmed, OUTPUT_FORMAT)
}
