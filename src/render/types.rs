use serde::Deserialize;

use crate::config::OutputConfig;

/// Output document format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Controls what ends up in the rendered document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Append reaction counts to the body and each comment
    pub enable_reactions: bool,
    /// Turn `@login` mentions and author names into profile links
    pub enable_user_links: bool,
    pub format: OutputFormat,
}

impl From<&OutputConfig> for RenderOptions {
    fn from(config: &OutputConfig) -> Self {
        RenderOptions {
            enable_reactions: config.enable_reactions,
            enable_user_links: config.enable_user_links,
            format: config.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_output_config() {
        let config = OutputConfig {
            enable_reactions: true,
            enable_user_links: false,
            format: OutputFormat::Json,
        };
        let options = RenderOptions::from(&config);
        assert!(options.enable_reactions);
        assert!(!options.enable_user_links);
        assert_eq!(options.format, OutputFormat::Json);
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Markdown.to_string(), "markdown");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
