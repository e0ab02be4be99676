use crate::config::Config;

/// Opaque user identifier issued by the external identity provider. The
/// client never inspects it; it only scopes chat persistence requests.
/// Without one, chats are neither listed nor saved (streaming still works).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

/// Resolve the identity: `QIRO_USER_ID` env var wins, then the `--user`
/// flag, then the config file.
pub fn resolve(config: &Config, cli_user: Option<&str>) -> Option<Identity> {
    from_sources(std::env::var("QIRO_USER_ID").ok(), cli_user, config)
}

fn from_sources(
    env_user: Option<String>,
    cli_user: Option<&str>,
    config: &Config,
) -> Option<Identity> {
    env_user
        .filter(|id| !id.trim().is_empty())
        .or_else(|| cli_user.map(str::to_string))
        .or_else(|| config.user_id.clone())
        .filter(|id| !id.trim().is_empty())
        .map(|user_id| Identity { user_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_wins_over_flag_and_config() {
        let config = Config {
            server_url: None,
            user_id: Some("from_config".into()),
        };
        let identity = from_sources(Some("from_env".into()), Some("from_flag"), &config);
        assert_eq!(identity.unwrap().user_id, "from_env");
    }

    #[test]
    fn test_flag_wins_over_config() {
        let config = Config {
            server_url: None,
            user_id: Some("from_config".into()),
        };
        let identity = from_sources(None, Some("from_flag"), &config);
        assert_eq!(identity.unwrap().user_id, "from_flag");
    }

    #[test]
    fn test_config_fallback() {
        let config = Config {
            server_url: None,
            user_id: Some("from_config".into()),
        };
        let identity = from_sources(None, None, &config);
        assert_eq!(identity.unwrap().user_id, "from_config");
    }

    #[test]
    fn test_signed_out_when_nothing_set() {
        assert!(from_sources(None, None, &Config::new()).is_none());
    }

    #[test]
    fn test_blank_env_value_ignored() {
        let identity = from_sources(Some("  ".into()), None, &Config::new());
        assert!(identity.is_none());
    }
}
