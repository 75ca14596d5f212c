use super::schema::Config;
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use std::path::Path;

const ENV_PREFIX: &str = "TRIVIA_OFFLINE_";

pub async fn load_from_env_or_file() -> Result<Config> {
    let config: Config = Figment::new()
        .merge(Toml::file("trivia-offline.toml"))
        .merge(Json::file("trivia-offline.json"))
        .merge(Yaml::file("trivia-offline.yaml"))
        .merge(Yaml::file("trivia-offline.yml"))
        .merge(env_provider())
        .extract()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    let config = apply_env_substitutions(config)?;
    validate(&config)?;

    Ok(config)
}

pub async fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    let figment = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Figment::new().merge(Toml::file(path)),
        Some("json") => Figment::new().merge(Json::file(path)),
        Some("yaml") | Some("yml") => Figment::new().merge(Yaml::file(path)),
        _ => {
            return Err(ConfigError::Parse(
                "Unsupported config file format. Use .toml, .json, .yaml, or .yml".into(),
            )
            .into());
        }
    };

    let config: Config = figment
        .merge(env_provider())
        .extract()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    let config = apply_env_substitutions(config)?;
    validate(&config)?;

    Ok(config)
}

/// `TRIVIA_OFFLINE_SYNC__DEBOUNCE_MS` -> `sync.debounceMs`
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX)
        .map(|key| env_key_to_path(key.as_str()).into())
        .lowercase(false)
}

/// `__` separates nesting levels, `_` separates words of one field
fn env_key_to_path(key: &str) -> String {
    key.split("__")
        .map(|segment| {
            let mut field = String::with_capacity(segment.len());
            for (i, word) in segment.split('_').filter(|w| !w.is_empty()).enumerate() {
                let word = word.to_ascii_lowercase();
                if i == 0 {
                    field.push_str(&word);
                    continue;
                }
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    field.push(first.to_ascii_uppercase());
                    field.push_str(chars.as_str());
                }
            }
            field
        })
        .collect::<Vec<_>>()
        .join(".")
}

pub fn validate(config: &Config) -> Result<()> {
    if config.store.history_limit == 0 {
        return Err(
            ConfigError::Validation("store.historyLimit must be greater than 0".into()).into(),
        );
    }

    if let Some(url) = &config.remote.url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "remote.url '{}' must be an http(s) URL",
                url
            ))
            .into());
        }
    }

    let worker = &config.worker;
    if worker.version.trim().is_empty() {
        return Err(ConfigError::Validation("worker.version must not be empty".into()).into());
    }

    if worker.shell_cache_name() == worker.offline_cache_name() {
        return Err(ConfigError::Validation(
            "App-shell and offline cache names must be different".into(),
        )
        .into());
    }

    if !worker.origin.starts_with("http://") && !worker.origin.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "worker.origin '{}' must be an http(s) URL",
            worker.origin
        ))
        .into());
    }

    if worker.essential_resources.is_empty() {
        return Err(
            ConfigError::Validation("worker.essentialResources must not be empty".into()).into(),
        );
    }

    for resource in &worker.essential_resources {
        if !resource.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "Essential resource '{}' must be an absolute path",
                resource
            ))
            .into());
        }
    }

    if !worker.essential_resources.contains(&worker.fallback_page) {
        return Err(ConfigError::Validation(format!(
            "Fallback page '{}' must be one of the essential resources",
            worker.fallback_page
        ))
        .into());
    }

    Ok(())
}

fn apply_env_substitutions(mut config: Config) -> Result<Config> {
    if let Some(url) = &mut config.remote.url {
        *url = substitute_env_vars(url)?;
    }

    if let Some(api_key) = &mut config.remote.api_key {
        *api_key = substitute_env_vars(api_key)?;
    }

    config.worker.origin = substitute_env_vars(&config.worker.origin)?;

    Ok(config)
}

fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(value) => {
                result = result.replace(&cap[0], &value);
            }
            Err(_) => {
                // ${VAR:-default}
                if let Some((name, default)) = var_name.split_once(":-") {
                    match std::env::var(name) {
                        Ok(value) => result = result.replace(&cap[0], &value),
                        Err(_) => result = result.replace(&cap[0], default),
                    }
                } else {
                    return Err(ConfigError::EnvVar(format!(
                        "Environment variable '{}' not found",
                        var_name
                    ))
                    .into());
                }
            }
        }
    }

    Ok(result)
}
