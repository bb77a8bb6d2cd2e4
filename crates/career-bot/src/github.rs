//! GitHub profile summary
//!
//! Public profile and repositories of the persona, rendered as plain text for
//! the system prompt. The GitHub API is best-effort: any failure degrades to
//! an empty section.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::error::Result;

const GITHUB_API: &str = "https://api.github.com";
const USER_AGENT: &str = "career-chatbot";
const TIMEOUT: Duration = Duration::from_secs(10);

/// Repositories listed in the summary
pub const DEFAULT_MAX_REPOS: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubProfile {
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub public_repos: Option<u64>,
    pub followers: Option<u64>,
    pub following: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubRepo {
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u64,
}

pub struct GithubClient {
    client: Client,
    base_url: String,
}

impl GithubClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(GITHUB_API)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(TIMEOUT).user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// `None` on any failure
    pub async fn fetch_profile(&self, login: &str) -> Option<GithubProfile> {
        let url = format!("{}/users/{login}", self.base_url);
        match self.get_json(&url, &[]).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(login, error = %e, "GitHub profile unavailable");
                None
            }
        }
    }

    /// Most recently updated repositories; empty on any failure
    pub async fn fetch_repos(&self, login: &str) -> Vec<GithubRepo> {
        let url = format!("{}/users/{login}/repos", self.base_url);
        match self.get_json(&url, &[("per_page", "100"), ("sort", "updated")]).await {
            Ok(repos) => repos,
            Err(e) => {
                tracing::warn!(login, error = %e, "GitHub repositories unavailable");
                Vec::new()
            }
        }
    }

    /// Fetch and format in one step
    pub async fn summary(&self, login: &str) -> String {
        let (profile, repos) = tokio::join!(self.fetch_profile(login), self.fetch_repos(login));
        format_github_info(profile.as_ref(), &repos, DEFAULT_MAX_REPOS)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

fn present(field: Option<&String>) -> Option<&str> {
    field.map(String::as_str).filter(|s| !s.is_empty())
}

/// Plain-text summary; empty when there is nothing to say
pub fn format_github_info(profile: Option<&GithubProfile>, repos: &[GithubRepo], max_repos: usize) -> String {
    let mut lines = Vec::new();

    if let Some(p) = profile {
        let name = present(p.name.as_ref()).unwrap_or(&p.login);
        lines.push(format!("GitHub profile for {name} (@{}):", p.login));
        if let Some(bio) = present(p.bio.as_ref()) {
            lines.push(format!("Bio: {bio}"));
        }
        if let Some(location) = present(p.location.as_ref()) {
            lines.push(format!("Location: {location}"));
        }
        if let Some(company) = present(p.company.as_ref()) {
            lines.push(format!("Company: {company}"));
        }
        if let Some(blog) = present(p.blog.as_ref()) {
            lines.push(format!("Website: {blog}"));
        }
        if let Some(count) = p.public_repos {
            lines.push(format!("Public repos: {count}"));
        }
        if let (Some(followers), Some(following)) = (p.followers, p.following) {
            lines.push(format!("Followers: {followers}, Following: {following}"));
        }
    }

    let mut top: Vec<&GithubRepo> = repos.iter().collect();
    // Stable, so ties keep the API's most-recently-updated order
    top.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));
    top.truncate(max_repos);

    if !top.is_empty() {
        lines.push("Top repositories by stars:".into());
        for repo in top {
            lines.push(format!(
                "- {} ({}) - {}. URL: {}",
                repo.name,
                present(repo.language.as_ref()).unwrap_or("Unknown language"),
                present(repo.description.as_ref()).unwrap_or("No description"),
                repo.html_url
            ));
        }
    }

    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn repo(name: &str, stars: u64) -> GithubRepo {
        GithubRepo {
            name: name.into(),
            html_url: format!("https://github.com/ada/{name}"),
            stargazers_count: stars,
            ..GithubRepo::default()
        }
    }

    #[test]
    fn test_format_profile_and_repos() {
        let profile = GithubProfile {
            login: "ada".into(),
            name: Some("Ada Lovelace".into()),
            bio: Some("Analyst".into()),
            blog: Some(String::new()),
            public_repos: Some(3),
            followers: Some(10),
            following: Some(2),
            ..GithubProfile::default()
        };
        let mut engine = repo("engine", 50);
        engine.language = Some("Rust".into());
        engine.description = Some("Difference engine".into());
        let repos = vec![repo("notes", 1), engine, repo("tables", 7)];

        let text = format_github_info(Some(&profile), &repos, 2);
        assert_eq!(
            text,
            "GitHub profile for Ada Lovelace (@ada):\n\
             Bio: Analyst\n\
             Public repos: 3\n\
             Followers: 10, Following: 2\n\
             Top repositories by stars:\n\
             - engine (Rust) - Difference engine. URL: https://github.com/ada/engine\n\
             - tables (Unknown language) - No description. URL: https://github.com/ada/tables"
        );
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_github_info(None, &[], DEFAULT_MAX_REPOS), "");
    }

    #[test]
    fn test_name_falls_back_to_login() {
        let profile = GithubProfile {
            login: "ada".into(),
            ..GithubProfile::default()
        };
        assert_eq!(format_github_info(Some(&profile), &[], 5), "GitHub profile for ada (@ada):");
    }

    #[tokio::test]
    async fn test_summary_from_api() {
        let mut server = mockito::Server::new_async().await;
        let _profile = server
            .mock("GET", "/users/ada")
            .match_header("user-agent", "career-chatbot")
            .match_header("accept", "application/vnd.github+json")
            .with_body(r#"{"login":"ada","name":null,"public_repos":1,"blog":""}"#)
            .create_async()
            .await;
        let _repos = server
            .mock("GET", "/users/ada/repos")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("sort".into(), "updated".into()),
            ]))
            .with_body(r#"[{"name":"engine","description":null,"language":"Rust","html_url":"https://github.com/ada/engine","stargazers_count":4}]"#)
            .create_async()
            .await;

        let client = GithubClient::with_base_url(server.url()).unwrap();
        let text = client.summary("ada").await;
        assert!(text.starts_with("GitHub profile for ada (@ada):\nPublic repos: 1"));
        assert!(text.ends_with("- engine (Rust) - No description. URL: https://github.com/ada/engine"));
    }

    #[tokio::test]
    async fn test_api_failure_degrades_to_empty() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server.mock("GET", Matcher::Any).with_status(404).create_async().await;

        let client = GithubClient::with_base_url(server.url()).unwrap();
        assert!(client.fetch_profile("ghost").await.is_none());
        assert!(client.fetch_repos("ghost").await.is_empty());
        assert_eq!(client.summary("ghost").await, "");
    }
}
