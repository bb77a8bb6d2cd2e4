//! Persona
//!
//! The person the bot speaks for: name, biography text and GitHub summary,
//! assembled once at startup and shared read-only by every conversation.

use std::path::{Path, PathBuf};

use crate::error::{CareerError, Result};
use crate::github::GithubClient;

/// Where the persona's source material lives
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    pub name: String,
    pub summary_path: PathBuf,
    pub linkedin_path: PathBuf,
    pub github_username: Option<String>,
}

impl ProfileConfig {
    /// `PERSONA_NAME` is required; paths default to `me/summary.txt` and
    /// `me/linkedin.txt`; `GITHUB_USERNAME` is optional.
    pub fn from_env() -> Result<Self> {
        let name = std::env::var("PERSONA_NAME")
            .ok()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| CareerError::Config("PERSONA_NAME not set".into()))?;

        Ok(Self {
            name,
            summary_path: std::env::var("PROFILE_SUMMARY_PATH")
                .unwrap_or_else(|_| "me/summary.txt".into())
                .into(),
            linkedin_path: std::env::var("PROFILE_LINKEDIN_PATH")
                .unwrap_or_else(|_| "me/linkedin.txt".into())
                .into(),
            github_username: std::env::var("GITHUB_USERNAME").ok().filter(|u| !u.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    pub summary: String,
    pub linkedin: String,
    pub github_info: String,
}

impl Persona {
    pub fn new(
        name: impl Into<String>,
        summary: impl Into<String>,
        linkedin: impl Into<String>,
        github_info: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
            linkedin: linkedin.into(),
            github_info: github_info.into(),
        }
    }

    /// Read the profile files and fetch the GitHub summary
    pub async fn load(config: &ProfileConfig, github: &GithubClient) -> Result<Self> {
        let summary = read_text(&config.summary_path).await?;
        let linkedin = read_text(&config.linkedin_path).await?;

        let github_info = match &config.github_username {
            Some(login) => github.summary(login).await,
            None => String::new(),
        };

        tracing::info!(
            persona = %config.name,
            summary_chars = summary.len(),
            linkedin_chars = linkedin.len(),
            github = !github_info.is_empty(),
            "Persona loaded"
        );

        Ok(Self::new(config.name.clone(), summary, linkedin, github_info))
    }

    pub fn system_prompt(&self) -> String {
        let name = &self.name;
        let intro = format!(
            "You are acting as {name}. You are answering questions on {name}'s website, \
particularly questions related to {name}'s career, background, skills and experience. \
Your responsibility is to represent {name} for interactions on the website as faithfully as possible. \
You are given a summary of {name}'s background and LinkedIn profile which you can use to answer questions. \
Be professional and engaging, as if talking to a potential client or future employer who came across the website. \
If you don't know the answer to any question, use your record_unknown_question tool to record the question that you couldn't answer, even if it's about something trivial or unrelated to career. \
If the user is engaging in discussion, try to steer them towards getting in touch via email; ask for their email and record it using your record_user_details tool. "
        );

        format!(
            "{intro}\n\n## Summary:\n{}\n\n## LinkedIn Profile:\n{}\n\n## GitHub:\n{}\n\n\
With this context, please chat with the user, always staying in character as {name}.",
            self.summary, self.linkedin, self.github_info
        )
    }
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|source| CareerError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_sections() {
        let persona = Persona::new("Ada Lovelace", "Mathematician.", "Analyst at Babbage & Co.", "");
        let prompt = persona.system_prompt();

        assert!(prompt.starts_with("You are acting as Ada Lovelace. You are answering questions on Ada Lovelace's website"));
        assert!(prompt.contains("record_unknown_question"));
        assert!(prompt.contains("record_user_details"));
        assert!(prompt.contains("\n\n## Summary:\nMathematician.\n\n## LinkedIn Profile:\nAnalyst at Babbage & Co.\n\n## GitHub:\n\n\n"));
        assert!(prompt.ends_with("always staying in character as Ada Lovelace."));
    }

    #[tokio::test]
    async fn test_load_from_files_without_github() {
        let dir = std::env::temp_dir().join(format!("career-bot-persona-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("summary.txt"), "Builds engines.").await.unwrap();
        tokio::fs::write(dir.join("linkedin.txt"), "Engineer").await.unwrap();

        let config = ProfileConfig {
            name: "Ada".into(),
            summary_path: dir.join("summary.txt"),
            linkedin_path: dir.join("linkedin.txt"),
            github_username: None,
        };
        let persona = Persona::load(&config, &GithubClient::new().unwrap()).await.unwrap();
        assert_eq!(persona, Persona::new("Ada", "Builds engines.", "Engineer", ""));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_names_the_path() {
        let config = ProfileConfig {
            name: "Ada".into(),
            summary_path: "/nonexistent/summary.txt".into(),
            linkedin_path: "/nonexistent/linkedin.txt".into(),
            github_username: None,
        };
        let err = Persona::load(&config, &GithubClient::new().unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/summary.txt"));
    }
}
