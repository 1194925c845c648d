use aiterm_core::Config;
use anyhow::Result;

pub async fn execute(key: Option<&str>, value: Option<&str>) -> Result<()> {
    let mut config = Config::load()?;

    match (key, value) {
        // Show all config
        (None, None) => {
            println!("Configuration file: {:?}\n", Config::config_path()?);
            println!("[model]");
            println!("  default_path = {:?}", config.model.default_path.display().to_string());
            println!("  search_dir = {:?}", config.model.search_dir.display().to_string());
            println!("  extension = \"{}\"", config.model.extension);
            println!(
                "  tokenizer_path = {}",
                config
                    .model
                    .tokenizer_path
                    .as_ref()
                    .map(|p| format!("{:?}", p.display().to_string()))
                    .unwrap_or_else(|| "(next to model)".to_string())
            );
            println!("  mode = \"{}\"", config.model.mode);
            println!();
            println!("[inference]");
            println!("  max_tokens = {}", config.inference.max_tokens);
            println!("  context_size = {}", config.inference.context_size);
            println!("  temperature = {}", config.inference.temperature);
            println!("  top_p = {}", config.inference.top_p);
            println!("  seed = {}", config.inference.seed);
            println!("  use_gpu = {}", config.inference.use_gpu);
            println!();
            println!("[interface]");
            println!("  farewell = {:?}", config.interface.farewell);
            println!("  prompt = {:?}", config.interface.prompt);
        }

        // Get a specific key
        (Some(key), None) => {
            let value = get_config_value(&config, key)?;
            println!("{}", value);
        }

        // Set a specific key
        (Some(key), Some(value)) => {
            set_config_value(&mut config, key, value)?;
            config.save()?;
            println!("Set {} = {}", key, value);
        }

        _ => unreachable!(),
    }

    Ok(())
}

fn get_config_value(config: &Config, key: &str) -> Result<String> {
    match key {
        "model.default_path" => Ok(config.model.default_path.display().to_string()),
        "model.search_dir" => Ok(config.model.search_dir.display().to_string()),
        "model.extension" => Ok(config.model.extension.clone()),
        "model.tokenizer_path" => Ok(config
            .model
            .tokenizer_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()),
        "model.mode" => Ok(config.model.mode.to_string()),
        "inference.max_tokens" => Ok(config.inference.max_tokens.to_string()),
        "inference.context_size" => Ok(config.inference.context_size.to_string()),
        "inference.temperature" => Ok(config.inference.temperature.to_string()),
        "inference.top_p" => Ok(config.inference.top_p.to_string()),
        "inference.seed" => Ok(config.inference.seed.to_string()),
        "inference.use_gpu" => Ok(config.inference.use_gpu.to_string()),
        "interface.farewell" => Ok(config.interface.farewell.clone()),
        "interface.prompt" => Ok(config.interface.prompt.clone()),
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
}

fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "model.default_path" => config.model.default_path = value.into(),
        "model.search_dir" => config.model.search_dir = value.into(),
        "model.extension" => {
            config.model.extension = value.trim_start_matches('.').to_string()
        }
        "model.tokenizer_path" => {
            config.model.tokenizer_path = if value.is_empty() {
                None
            } else {
                Some(value.into())
            }
        }
        "model.mode" => config.model.mode = value.parse()?,
        "inference.max_tokens" => config.inference.max_tokens = value.parse()?,
        "inference.context_size" => config.inference.context_size = value.parse()?,
        "inference.temperature" => config.inference.temperature = value.parse()?,
        "inference.top_p" => config.inference.top_p = value.parse()?,
        "inference.seed" => config.inference.seed = value.parse()?,
        "inference.use_gpu" => config.inference.use_gpu = value.parse()?,
        "interface.farewell" => config.interface.farewell = value.to_string(),
        "interface.prompt" => config.interface.prompt = value.to_string(),
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
    Ok(())
}
