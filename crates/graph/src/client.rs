//! Microsoft Graph implementation of [`RemoteDirectory`].
//!
//! Reads follow `@odata.nextLink` until the collection is exhausted and are
//! retried on throttling and transient failures. Writes are sent once.

use std::time::Duration;

use assignment::{
    Application, AssignmentSettings, ExistingAssignment, Group, Intent, PlatformFilter,
    RemoteDirectory, RemoteError,
};
use serde::de::DeserializeOwned;

use crate::auth::TokenProvider;
use crate::error::{Error, Result};
use crate::models::{
    GraphApp, GraphAssignment, GraphGroup, GraphUser, Page, assignment_body, parse_error_body,
};
use crate::retry::{LogCallback, RetryConfig, with_retry};

/// Graph v1.0 endpoint
pub const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Agent shared by the client and the sign-in flows.
///
/// Status codes are inspected by the caller so error bodies can be read.
pub(crate) fn http_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(60)))
        .build()
        .into()
}

/// Blocking Graph client
///
/// # Example
///
/// ```no_run
/// use assignment::{PlatformFilter, RemoteDirectory};
/// use graph::{GraphClient, StaticToken};
///
/// let client = GraphClient::new(StaticToken("eyJ0...".to_string()));
/// let apps = client.list_apps(PlatformFilter::MacOs).unwrap();
/// println!("{} macOS apps", apps.len());
/// ```
pub struct GraphClient {
    agent: ureq::Agent,
    base_url: String,
    tokens: Box<dyn TokenProvider>,
    retry: RetryConfig,
    member_counts: bool,
}

impl GraphClient {
    /// Create a client for the public Graph endpoint
    pub fn new(tokens: impl TokenProvider + 'static) -> Self {
        Self {
            agent: http_agent(),
            base_url: GRAPH_BASE.to_string(),
            tokens: Box::new(tokens),
            retry: RetryConfig::default(),
            member_counts: true,
        }
    }

    /// Use a different API base (national clouds, tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a preconfigured agent; it must not turn status codes into errors
    #[must_use]
    pub fn with_agent(mut self, agent: ureq::Agent) -> Self {
        self.agent = agent;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch member counts when listing groups (one extra request per group)
    #[must_use]
    pub fn with_member_counts(mut self, enabled: bool) -> Self {
        self.member_counts = enabled;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The signed-in user (delegated sessions only)
    pub fn me(&self) -> Result<GraphUser> {
        let url = self.url("/me");
        self.get_json(&url)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.tokens.access_token()?))
    }

    fn get_text(&self, url: &str, eventual: bool) -> Result<String> {
        with_retry(&self.retry, Some(&LogCallback), || {
            let mut request = self
                .agent
                .get(url)
                .header("Authorization", self.bearer()?)
                .header("Accept", "application/json");
            if eventual {
                request = request.header("ConsistencyLevel", "eventual");
            }
            let mut response = request.call()?;
            let status = response.status().as_u16();
            let body = response.body_mut().read_to_string()?;
            check_status(status, &body)?;
            Ok(body)
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get_text(url, false)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// GET a collection, following `@odata.nextLink`
    fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path));
        let mut pages = 0;

        while let Some(url) = next {
            let page: Page<T> = self.get_json(&url)?;
            pages += 1;
            log::debug!("Fetched page {} of {} ({} items)", pages, path, page.value.len());
            items.extend(page.value);
            next = page.next_link;
        }
        Ok(items)
    }

    /// Member count of a group; 0 when the count cannot be read
    fn member_count(&self, group_id: &str) -> u64 {
        let url = self.url(&format!("/groups/{group_id}/members/$count"));
        match self.get_text(&url, true) {
            Ok(body) => body.trim().parse().unwrap_or(0),
            Err(e) => {
                log::debug!("Could not count members of group {}: {}", group_id, e);
                0
            }
        }
    }

    fn send_write(&self, request: WriteRequest<'_>) -> Result<()> {
        let authorization = self.bearer()?;
        let mut response = match request {
            WriteRequest::Post { url, body } => self
                .agent
                .post(url)
                .header("Authorization", authorization)
                .send_json(body)?,
            WriteRequest::Delete { url } => self
                .agent
                .delete(url)
                .header("Authorization", authorization)
                .call()?,
        };
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        check_status(status, &body)
    }

    fn assignments_path(app_id: &str) -> String {
        format!("/deviceAppManagement/mobileApps/{app_id}/assignments")
    }
}

enum WriteRequest<'a> {
    Post {
        url: &'a str,
        body: &'a serde_json::Value,
    },
    Delete {
        url: &'a str,
    },
}

/// Turn a non-success status into an [`Error::Api`], keeping Graph's message
fn check_status(status: u16, body: &str) -> Result<()> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    Err(match parse_error_body(body) {
        Some((code, message)) => Error::api(status, code, message),
        None => Error::api(status, None, format!("HTTP {status}")),
    })
}

impl RemoteDirectory for GraphClient {
    fn list_groups(&self) -> std::result::Result<Vec<Group>, RemoteError> {
        let groups: Vec<GraphGroup> = self.get_all("/groups")?;
        log::info!("Fetched {} groups", groups.len());
        Ok(groups
            .into_iter()
            .map(|g| {
                let count = if self.member_counts {
                    self.member_count(&g.id)
                } else {
                    0
                };
                g.into_group(count)
            })
            .collect())
    }

    fn list_apps(
        &self,
        platform: PlatformFilter,
    ) -> std::result::Result<Vec<Application>, RemoteError> {
        let apps: Vec<GraphApp> = self.get_all("/deviceAppManagement/mobileApps")?;
        let apps: Vec<Application> = apps
            .into_iter()
            .map(Application::from)
            .filter(|a| platform.matches(&a.app_type))
            .collect();
        log::info!("Fetched {} apps", apps.len());
        Ok(apps)
    }

    fn list_assignments(
        &self,
        app_id: &str,
    ) -> std::result::Result<Vec<ExistingAssignment>, RemoteError> {
        let assignments: Vec<GraphAssignment> = self.get_all(&Self::assignments_path(app_id))?;
        Ok(assignments
            .into_iter()
            .map(|a| a.into_existing(app_id))
            .collect())
    }

    fn create_assignment(
        &self,
        app_id: &str,
        group_id: &str,
        intent: Intent,
        settings: &AssignmentSettings,
    ) -> std::result::Result<(), RemoteError> {
        let url = self.url(&Self::assignments_path(app_id));
        let body = assignment_body(group_id, intent, settings);
        self.send_write(WriteRequest::Post {
            url: &url,
            body: &body,
        })?;
        Ok(())
    }

    fn delete_assignment(
        &self,
        app_id: &str,
        assignment_id: &str,
    ) -> std::result::Result<(), RemoteError> {
        let url = self.url(&format!(
            "{}/{assignment_id}",
            Self::assignments_path(app_id)
        ));
        self.send_write(WriteRequest::Delete { url: &url })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use assignment::{AssignmentOptions, RemoteErrorKind};
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    /// Serve one canned response per connection, in order, and return the
    /// raw requests that were received.
    fn serve<F>(responses: F) -> (String, thread::JoinHandle<Vec<String>>)
    where
        F: FnOnce(&str) -> Vec<(u16, String)>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let responses = responses(&base);

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                seen.push(read_request(&mut stream));
                let reply = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).unwrap();
            }
            seen
        });
        (base, handle)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut head = String::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            head.push_str(&line);
        }
        let length = head
            .lines()
            .find_map(|l| {
                l.to_ascii_lowercase()
                    .strip_prefix("content-length:")
                    .map(|v| v.trim().parse::<usize>().unwrap_or(0))
            })
            .unwrap_or(0);
        let mut body = vec![0; length];
        reader.read_exact(&mut body).unwrap();
        head + "\r\n" + &String::from_utf8_lossy(&body)
    }

    fn request_json(raw: &str) -> serde_json::Value {
        let (_, body) = raw.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    fn client(base: &str) -> GraphClient {
        // Bypass any proxy from the environment for loopback requests
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .proxy(None)
            .build()
            .into();
        GraphClient::new(StaticToken("test-token".into()))
            .with_agent(agent)
            .with_base_url(base)
            .with_retry(RetryConfig::no_retry())
            .with_member_counts(false)
    }

    #[test]
    fn test_list_groups_follows_next_link() {
        let (base, server) = serve(|base| {
            vec![
                (
                    200,
                    format!(
                        r#"{{"@odata.nextLink": "{base}/groups?$skiptoken=p2", "value": [
                            {{"id": "g1", "displayName": "Design", "groupTypes": []}},
                            {{"id": "g2", "displayName": "Pilot", "groupTypes": ["DynamicMembership"]}}
                        ]}}"#
                    ),
                ),
                (
                    200,
                    r#"{"value": [{"id": "g3", "displayName": "Staff", "mailEnabled": true, "groupTypes": ["Unified"]}]}"#
                        .to_string(),
                ),
            ]
        });

        let groups = client(&base).list_groups().unwrap();
        let requests = server.join().unwrap();

        let ids: Vec<_> = groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "g2", "g3"]);
        assert!(requests[0].starts_with("GET /groups "));
        assert!(requests[1].contains("skiptoken=p2"));
        assert!(requests[0].contains("Bearer test-token"));
    }

    #[test]
    fn test_list_apps_filters_macos() {
        let (base, server) = serve(|_| {
            vec![(
                200,
                r##"{"value": [
                    {"@odata.type": "#microsoft.graph.macOSDmgApp", "id": "a1", "displayName": "Chrome"},
                    {"@odata.type": "#microsoft.graph.win32LobApp", "id": "a2", "displayName": "7-Zip"}
                ]}"##
                    .to_string(),
            )]
        });

        let apps = client(&base).list_apps(PlatformFilter::MacOs).unwrap();
        server.join().unwrap();

        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].id, "a1");
    }

    #[test]
    fn test_create_assignment_body() {
        let (base, server) = serve(|_| vec![(201, r#"{"id": "new"}"#.to_string())]);

        let settings = AssignmentOptions::default().settings();
        client(&base)
            .create_assignment("a1", "g1", Intent::Required, &settings)
            .unwrap();
        let requests = server.join().unwrap();

        assert!(requests[0].starts_with("POST /deviceAppManagement/mobileApps/a1/assignments "));
        let body = request_json(&requests[0]);
        assert_eq!(body["intent"], "required");
        assert_eq!(body["target"]["groupId"], "g1");
        assert_eq!(body["settings"]["notifications"], "showAll");
    }

    #[test]
    fn test_graph_error_message_is_kept() {
        let (base, server) = serve(|_| {
            vec![(
                403,
                r#"{"error": {"code": "Forbidden", "message": "Insufficient privileges"}}"#
                    .to_string(),
            )]
        });

        let settings = AssignmentOptions::default().settings();
        let err = client(&base)
            .create_assignment("a1", "g1", Intent::Required, &settings)
            .unwrap_err();
        server.join().unwrap();

        assert_eq!(err.kind, RemoteErrorKind::Authentication);
        assert_eq!(err.message, "Insufficient privileges");
    }

    #[test]
    fn test_delete_not_found() {
        let (base, server) = serve(|_| vec![(404, String::new())]);

        let err = client(&base).delete_assignment("a1", "x9").unwrap_err();
        let requests = server.join().unwrap();

        assert!(requests[0].starts_with("DELETE /deviceAppManagement/mobileApps/a1/assignments/x9 "));
        assert_eq!(err.kind, RemoteErrorKind::NotFound);
    }

    #[test]
    fn test_read_retried_after_throttling() {
        let (base, server) = serve(|_| {
            vec![
                (429, String::new()),
                (200, r#"{"value": []}"#.to_string()),
            ]
        });

        let retry = RetryConfig {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(1),
        };
        let assignments = client(&base)
            .with_retry(retry)
            .list_assignments("a1")
            .unwrap();
        let requests = server.join().unwrap();

        assert!(assignments.is_empty());
        assert_eq!(requests.len(), 2);
    }

    #[test]
    fn test_unreachable_host_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = client(&base).list_groups().unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Network);
    }

    #[test]
    fn test_check_status() {
        assert!(check_status(204, "").is_ok());
        let err = check_status(409, "").unwrap_err();
        assert_eq!(err.to_string(), "Graph API error (HTTP 409): HTTP 409");
    }
}
